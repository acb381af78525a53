//! Session statistics: per-batch results, deck-wide stage histograms and
//! their trend, and the end-of-session summary.

use serde::{Deserialize, Serialize};

use crate::evaluator::Outcome;
use crate::session::Phase;
use crate::stage::Stage;
use crate::types::Deck;

/// Count of cards per stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageHistogram {
    counts: [usize; 5],
}

impl StageHistogram {
    /// Classify every card in the deck.
    pub fn from_deck(deck: &Deck) -> Self {
        let mut counts = [0; 5];
        for card in deck.iter() {
            counts[Stage::classify(card).index()] += 1;
        }
        Self { counts }
    }

    pub fn count(&self, stage: Stage) -> usize {
        self.counts[stage.index()]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    pub fn percentage(&self, stage: Stage) -> f64 {
        percent(self.count(stage), self.total())
    }

    /// `Σ stage × count`; higher means the deck sits in later stages.
    pub fn weighted_score(&self) -> usize {
        Stage::ALL
            .iter()
            .map(|s| usize::from(s.number()) * self.count(*s))
            .sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Stage, usize)> + '_ {
        Stage::ALL.iter().map(move |s| (*s, self.count(*s)))
    }
}

/// Direction the deck moved between two histograms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Advancing,
    Regressing,
    Steady,
}

/// Change in the stage histogram since the previous batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTrend {
    /// Per-stage change in card count, stage 1 first.
    pub deltas: [i64; 5],
    pub previous_score: usize,
    pub current_score: usize,
    pub direction: TrendDirection,
}

impl StageTrend {
    pub fn between(previous: &StageHistogram, current: &StageHistogram) -> Self {
        let mut deltas = [0i64; 5];
        for stage in Stage::ALL {
            deltas[stage.index()] = current.count(stage) as i64 - previous.count(stage) as i64;
        }
        let previous_score = previous.weighted_score();
        let current_score = current.weighted_score();
        let direction = match current_score.cmp(&previous_score) {
            std::cmp::Ordering::Greater => TrendDirection::Advancing,
            std::cmp::Ordering::Less => TrendDirection::Regressing,
            std::cmp::Ordering::Equal => TrendDirection::Steady,
        };

        Self {
            deltas,
            previous_score,
            current_score,
            direction,
        }
    }

    pub fn delta(&self, stage: Stage) -> i64 {
        self.deltas[stage.index()]
    }
}

/// Running counts for the batch being studied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchTally {
    pub total: usize,
    pub correct: usize,
    pub incorrect: usize,
    pub hinted: usize,
}

impl BatchTally {
    pub fn record(&mut self, outcome: Outcome) {
        self.total += 1;
        if outcome.is_correct() {
            self.correct += 1;
            if outcome.used_hint() {
                self.hinted += 1;
            }
        } else {
            self.incorrect += 1;
        }
    }
}

/// Statistics for one completed batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchStatistics {
    pub number: usize,
    pub phase: Phase,
    pub total: usize,
    pub correct: usize,
    pub incorrect: usize,
    pub hinted: usize,
    pub percent_correct: f64,
    pub percent_incorrect: f64,
    pub percent_with_hint: f64,
    /// Histogram over the whole deck after this batch.
    pub histogram: StageHistogram,
}

/// Totals across a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub batches: usize,
    pub cards_practiced: usize,
    pub correct: usize,
    pub incorrect: usize,
    pub hints_used: usize,
    pub overall_accuracy: f64,
    pub batch_accuracies: Vec<f64>,
    /// Last batch accuracy minus first, when there was more than one batch.
    pub first_to_last_delta: Option<f64>,
    pub final_histogram: StageHistogram,
}

/// Collects batch statistics over a session.
#[derive(Debug, Clone, Default)]
pub struct SessionStatistics {
    batches: Vec<BatchStatistics>,
    previous_histogram: Option<StageHistogram>,
}

impl SessionStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Close a batch: compute its percentages, a fresh deck-wide histogram,
    /// and the trend against the previous batch.
    pub fn record_batch(
        &mut self,
        phase: Phase,
        tally: BatchTally,
        deck: &Deck,
    ) -> (BatchStatistics, Option<StageTrend>) {
        let histogram = StageHistogram::from_deck(deck);
        let trend = self
            .previous_histogram
            .as_ref()
            .map(|previous| StageTrend::between(previous, &histogram));

        let stats = BatchStatistics {
            number: self.batches.len() + 1,
            phase,
            total: tally.total,
            correct: tally.correct,
            incorrect: tally.incorrect,
            hinted: tally.hinted,
            percent_correct: percent(tally.correct, tally.total),
            percent_incorrect: percent(tally.incorrect, tally.total),
            percent_with_hint: percent(tally.hinted, tally.total),
            histogram,
        };

        self.previous_histogram = Some(histogram);
        self.batches.push(stats.clone());
        (stats, trend)
    }

    pub fn batches(&self) -> &[BatchStatistics] {
        &self.batches
    }

    /// `None` until at least one batch has completed.
    pub fn summary(&self) -> Option<SessionSummary> {
        let last = self.batches.last()?;
        let first = self.batches.first()?;

        let cards_practiced = self.batches.iter().map(|b| b.total).sum();
        let correct = self.batches.iter().map(|b| b.correct).sum();
        let incorrect = self.batches.iter().map(|b| b.incorrect).sum();
        let hints_used = self.batches.iter().map(|b| b.hinted).sum();
        let first_to_last_delta =
            (self.batches.len() > 1).then(|| last.percent_correct - first.percent_correct);

        Some(SessionSummary {
            batches: self.batches.len(),
            cards_practiced,
            correct,
            incorrect,
            hints_used,
            overall_accuracy: percent(correct, cards_practiced),
            batch_accuracies: self.batches.iter().map(|b| b.percent_correct).collect(),
            first_to_last_delta,
            final_histogram: last.histogram,
        })
    }
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Card, CardContent, CardId, VocabularyCard};
    use pretty_assertions::assert_eq;

    fn deck(states: &[(f64, u32)]) -> Deck {
        let cards = states
            .iter()
            .enumerate()
            .map(|(i, (ease, reps))| {
                Card::new(
                    CardId(i as u64 + 1),
                    CardContent::Vocabulary(VocabularyCard::new(format!("t{i}"), format!("d{i}"))),
                )
                .with_progress(*ease, *reps, None)
            })
            .collect();
        Deck::new(cards).unwrap()
    }

    #[test]
    fn histogram_covers_whole_deck() {
        let deck = deck(&[(2.5, 0), (2.5, 1), (3.5, 2), (4.2, 3), (5.5, 4), (1.5, 9)]);
        let histogram = StageHistogram::from_deck(&deck);
        assert_eq!(histogram.count(Stage::Review), 2);
        assert_eq!(histogram.count(Stage::Basic), 1);
        assert_eq!(histogram.count(Stage::Intermediate), 1);
        assert_eq!(histogram.count(Stage::Advanced), 1);
        assert_eq!(histogram.count(Stage::Expert), 1);
        assert_eq!(histogram.total(), 6);
        assert_eq!(histogram.weighted_score(), 2 + 2 + 3 + 4 + 5);
    }

    #[test]
    fn trend_reports_advancing() {
        let before = StageHistogram::from_deck(&deck(&[(2.5, 0), (2.5, 0)]));
        let after = StageHistogram::from_deck(&deck(&[(3.0, 1), (2.5, 0)]));
        let trend = StageTrend::between(&before, &after);
        assert_eq!(trend.delta(Stage::Review), -1);
        assert_eq!(trend.delta(Stage::Intermediate), 1);
        assert_eq!(trend.direction, TrendDirection::Advancing);

        let back = StageTrend::between(&after, &before);
        assert_eq!(back.direction, TrendDirection::Regressing);
        assert_eq!(StageTrend::between(&after, &after).direction, TrendDirection::Steady);
    }

    #[test]
    fn tally_counts_hints_as_correct() {
        let mut tally = BatchTally::default();
        tally.record(Outcome::Correct);
        tally.record(Outcome::HintCorrect);
        tally.record(Outcome::Incorrect);
        tally.record(Outcome::Partial(0.25));
        tally.record(Outcome::Partial(0.75));
        assert_eq!(
            tally,
            BatchTally {
                total: 5,
                correct: 3,
                incorrect: 2,
                hinted: 1,
            }
        );
    }

    #[test]
    fn first_batch_has_no_trend() {
        let deck = deck(&[(2.5, 0)]);
        let mut stats = SessionStatistics::new();
        let tally = BatchTally {
            total: 4,
            correct: 3,
            incorrect: 1,
            hinted: 1,
        };
        let (batch, trend) = stats.record_batch(Phase::InitialReview, tally, &deck);
        assert!(trend.is_none());
        assert_eq!(batch.number, 1);
        assert_eq!(batch.percent_correct, 75.0);
        assert_eq!(batch.percent_with_hint, 25.0);

        let (_, trend) = stats.record_batch(Phase::InitialReview, tally, &deck);
        assert_eq!(trend.map(|t| t.direction), Some(TrendDirection::Steady));
    }

    #[test]
    fn summary_aggregates_batches() {
        let deck = deck(&[(2.5, 0)]);
        let mut stats = SessionStatistics::new();
        assert!(stats.summary().is_none());

        stats.record_batch(
            Phase::InitialReview,
            BatchTally {
                total: 4,
                correct: 2,
                incorrect: 2,
                hinted: 0,
            },
            &deck,
        );
        stats.record_batch(
            Phase::RandomizedReview,
            BatchTally {
                total: 4,
                correct: 4,
                incorrect: 0,
                hinted: 1,
            },
            &deck,
        );

        let summary = stats.summary().unwrap();
        assert_eq!(summary.batches, 2);
        assert_eq!(summary.cards_practiced, 8);
        assert_eq!(summary.correct, 6);
        assert_eq!(summary.hints_used, 1);
        assert_eq!(summary.overall_accuracy, 75.0);
        assert_eq!(summary.batch_accuracies, vec![50.0, 100.0]);
        assert_eq!(summary.first_to_last_delta, Some(50.0));
        assert_eq!(summary.final_histogram.count(Stage::Review), 1);
    }
}
