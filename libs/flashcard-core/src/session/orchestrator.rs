use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::selection::{InitialReviewPlan, RandomizedReviewPlan};
use super::{
    BatchPlan, ContinueChoice, DeckStore, Phase, PromptRequest, PromptResult, Presenter,
    StatisticsSink,
};
use crate::algorithm::sm2::Sm2;
use crate::algorithm::SpacedRepetitionAlgorithm;
use crate::error::{Result, StudyError};
use crate::evaluator::Question;
use crate::settings::EffectiveSettings;
use crate::stage::{PresentationMode, Stage};
use crate::stats::{BatchTally, SessionStatistics};
use crate::types::{CardId, Deck};

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOutcome {
    /// The learner declined to continue, or there was nothing left to pick.
    Completed,
    /// The learner interrupted a prompt, including the "continue?" prompt.
    Cancelled,
    /// The deck had no cards.
    NothingToStudy,
}

enum BatchResult {
    Completed { incorrect: Vec<CardId> },
    Cancelled,
}

/// Runs a study session over one deck.
///
/// The orchestrator owns the deck for the whole session. Phases refer to
/// cards by id only, so every scheduler update lands on the one copy that
/// is eventually saved.
pub struct SessionOrchestrator<R> {
    deck: Deck,
    settings: EffectiveSettings,
    algorithm: Box<dyn SpacedRepetitionAlgorithm>,
    statistics: SessionStatistics,
    rng: R,
}

impl<R: Rng> SessionOrchestrator<R> {
    pub fn new(deck: Deck, settings: EffectiveSettings, rng: R) -> Self {
        let algorithm = Box::new(Sm2::from_settings(&settings));
        Self {
            deck,
            settings,
            algorithm,
            statistics: SessionStatistics::new(),
            rng,
        }
    }

    pub fn with_algorithm(mut self, algorithm: Box<dyn SpacedRepetitionAlgorithm>) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn into_deck(self) -> Deck {
        self.deck
    }

    pub fn settings(&self) -> &EffectiveSettings {
        &self.settings
    }

    pub fn statistics(&self) -> &SessionStatistics {
        &self.statistics
    }

    /// Run both phases, then save the deck once and emit the summary.
    ///
    /// Cancellation still saves. If a collaborator fails mid-session the
    /// deck is saved on a best-effort basis before the error is returned.
    pub fn run<S, P, K>(
        &mut self,
        store: &S,
        presenter: &mut P,
        sink: &mut K,
    ) -> Result<SessionOutcome>
    where
        S: DeckStore + ?Sized,
        P: Presenter + ?Sized,
        K: StatisticsSink + ?Sized,
    {
        if self.deck.is_empty() {
            info!("Deck is empty, nothing to study");
            return Ok(SessionOutcome::NothingToStudy);
        }

        info!(
            cards = self.deck.len(),
            algorithm = self.algorithm.name(),
            "Starting study session"
        );

        let outcome = match self.study(presenter, sink) {
            Ok(outcome) => outcome,
            Err(err) => {
                if let Err(save_err) = store.save(&self.deck) {
                    warn!(error = %save_err, "Failed to save deck after session error");
                }
                return Err(err);
            }
        };

        if let Some(summary) = self.statistics.summary() {
            sink.session_completed(&summary);
        }

        store.save(&self.deck)?;
        info!(?outcome, batches = self.statistics.batches().len(), "Session saved");
        Ok(outcome)
    }

    fn study<P, K>(&mut self, presenter: &mut P, sink: &mut K) -> Result<SessionOutcome>
    where
        P: Presenter + ?Sized,
        K: StatisticsSink + ?Sized,
    {
        let needs_review = self
            .deck
            .iter()
            .any(|card| Stage::classify(card) == Stage::Review);

        if needs_review {
            if let BatchResult::Cancelled = self.initial_review(presenter, sink)? {
                return Ok(SessionOutcome::Cancelled);
            }
        }

        self.randomized_review(presenter, sink)
    }

    fn initial_review<P, K>(&mut self, presenter: &mut P, sink: &mut K) -> Result<BatchResult>
    where
        P: Presenter + ?Sized,
        K: StatisticsSink + ?Sized,
    {
        info!("Starting initial review");
        presenter.phase_started(Phase::InitialReview);

        let mut plan = InitialReviewPlan::new(&self.deck, self.settings.batch_size);
        while let Some(batch) = plan.next_batch() {
            let order = batch.presentation_order();
            let batch_plan = BatchPlan {
                phase: Phase::InitialReview,
                cards: batch.cards.len(),
                presentations: order.len(),
                carried_forward: batch.carried_forward,
                hardest: 0,
                recently_practiced: 0,
            };
            debug!(?batch_plan, remaining = plan.remaining(), "Initial review batch");
            presenter.batch_started(&batch_plan);

            match self.study_batch(Phase::InitialReview, &order, presenter, sink)? {
                BatchResult::Cancelled => return Ok(BatchResult::Cancelled),
                BatchResult::Completed { incorrect } => {
                    plan.carry_forward(&batch.cards, &incorrect);
                }
            }
        }

        Ok(BatchResult::Completed {
            incorrect: Vec::new(),
        })
    }

    fn randomized_review<P, K>(&mut self, presenter: &mut P, sink: &mut K) -> Result<SessionOutcome>
    where
        P: Presenter + ?Sized,
        K: StatisticsSink + ?Sized,
    {
        info!("Starting randomized review");
        presenter.phase_started(Phase::RandomizedReview);

        let mut plan = RandomizedReviewPlan::new(
            self.settings.batch_size,
            self.settings.hardest_count,
            self.settings.recent_decay_fraction,
        );

        loop {
            let batch = plan.next_batch(&self.deck, &mut self.rng);
            if batch.cards.is_empty() {
                info!("No cards left to select");
                return Ok(SessionOutcome::Completed);
            }

            let batch_plan = BatchPlan {
                phase: Phase::RandomizedReview,
                cards: batch.cards.len(),
                presentations: batch.cards.len(),
                carried_forward: 0,
                hardest: batch.hardest.len(),
                recently_practiced: batch.recently_practiced,
            };
            debug!(?batch_plan, "Randomized review batch");
            presenter.batch_started(&batch_plan);

            if let BatchResult::Cancelled =
                self.study_batch(Phase::RandomizedReview, &batch.cards, presenter, sink)?
            {
                return Ok(SessionOutcome::Cancelled);
            }

            plan.record_practiced(&batch.cards, self.deck.len(), &mut self.rng);

            match presenter.continue_review()? {
                ContinueChoice::Continue => {}
                ContinueChoice::Stop => return Ok(SessionOutcome::Completed),
                ContinueChoice::Cancel => {
                    info!("Session cancelled between batches");
                    return Ok(SessionOutcome::Cancelled);
                }
            }
        }
    }

    /// Present each card in `order`, update it, and close the batch.
    fn study_batch<P, K>(
        &mut self,
        phase: Phase,
        order: &[CardId],
        presenter: &mut P,
        sink: &mut K,
    ) -> Result<BatchResult>
    where
        P: Presenter + ?Sized,
        K: StatisticsSink + ?Sized,
    {
        let mut tally = BatchTally::default();
        let mut incorrect = Vec::new();

        for (i, id) in order.iter().copied().enumerate() {
            let card = self.deck.get(id).ok_or(StudyError::UnknownCard(id))?;
            let stage = Stage::classify(card);
            let mode = PresentationMode::for_card(card, stage);
            let mut question = Question::build(card, mode, &self.deck, &self.settings, &mut self.rng);

            let request = PromptRequest {
                card,
                stage,
                mode,
                phase,
                position: i + 1,
                batch_len: order.len(),
            };

            let (outcome, elapsed_secs) = match presenter.present(&request, &mut question)? {
                PromptResult::Cancelled => {
                    info!(card = %id, "Session cancelled");
                    return Ok(BatchResult::Cancelled);
                }
                PromptResult::Answered {
                    outcome,
                    elapsed_secs,
                } => (outcome, elapsed_secs),
            };

            let now = Utc::now();
            let card = self.deck.get_mut(id).ok_or(StudyError::UnknownCard(id))?;
            self.algorithm
                .update(card, outcome.quality(), elapsed_secs, now);
            debug!(
                card = %id,
                stage = stage.number(),
                ?outcome,
                ease = card.ease,
                repetitions = card.repetitions,
                next_due = %card.next_due(now),
                "Card reviewed"
            );

            tally.record(outcome);
            if !outcome.is_correct() {
                incorrect.push(id);
            }
        }

        let (stats, trend) = self.statistics.record_batch(phase, tally, &self.deck);
        info!(
            batch = stats.number,
            correct = stats.correct,
            total = stats.total,
            "Batch completed"
        );
        sink.batch_completed(&stats, trend.as_ref());

        Ok(BatchResult::Completed { incorrect })
    }
}
