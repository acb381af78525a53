//! SM-2 spaced repetition algorithm.
//!
//! Based on SuperMemo 2, with the ease change scaled by a response-time
//! modifier and a configurable lapse policy.

use super::{time_modifier, Quality, SpacedRepetitionAlgorithm};
use crate::settings::{EffectiveSettings, LapsePolicy};
use crate::types::{Card, MINIMUM_EASE};
use chrono::{DateTime, Utc};

/// SM-2 algorithm with configurable parameters.
#[derive(Debug, Clone)]
pub struct Sm2 {
    pub minimum_ease: f64,
    pub lapse_policy: LapsePolicy,
}

impl Default for Sm2 {
    fn default() -> Self {
        Self {
            minimum_ease: MINIMUM_EASE,
            lapse_policy: LapsePolicy::Halve,
        }
    }
}

impl Sm2 {
    pub fn from_settings(settings: &EffectiveSettings) -> Self {
        Self {
            lapse_policy: settings.lapse_policy,
            ..Self::default()
        }
    }
}

impl SpacedRepetitionAlgorithm for Sm2 {
    fn name(&self) -> &'static str {
        "sm2"
    }

    fn update(
        &self,
        card: &mut Card,
        quality: Quality,
        response_secs: Option<f64>,
        now: DateTime<Utc>,
    ) {
        let q = quality.value();

        if quality.is_passing() {
            card.repetitions += 1;
            card.interval_days = match card.repetitions {
                1 => 1,
                2 => 6,
                _ => (f64::from(card.interval_days) * card.ease).floor() as u32,
            };
        } else {
            card.repetitions = match self.lapse_policy {
                LapsePolicy::Halve => card.repetitions / 2,
                LapsePolicy::Reset => 0,
            };
            card.interval_days = 1;
        }

        // EF' = EF + 5 * (0.1 - (5 - q) * (0.08 + (5 - q) * 0.02)) * time modifier
        let miss = 5.0 - q;
        let base_change = 0.1 - miss * (0.08 + miss * 0.02);
        let modifier = time_modifier(response_secs);
        card.ease = (card.ease + 5.0 * base_change * modifier).max(self.minimum_ease);
        card.last_reviewed = Some(now);

        tracing::debug!(
            card = %card.id,
            quality = q,
            repetitions = card.repetitions,
            interval = card.interval_days,
            ease = card.ease,
            "scheduled card"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CardContent, CardId, VocabularyCard};

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn card(ease: f64, repetitions: u32) -> Card {
        Card::new(
            CardId(1),
            CardContent::Vocabulary(VocabularyCard::new("term", "definition")),
        )
        .with_progress(ease, repetitions, None)
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn perfect_recall_raises_ease_by_half() {
        let sm2 = Sm2::default();
        let mut c = card(2.5, 0);
        sm2.update(&mut c, Quality::PERFECT, None, now());
        assert!(approx(c.ease, 3.0));
        assert_eq!(c.repetitions, 1);
        assert_eq!(c.interval_days, 1);
        assert!(c.last_reviewed.is_some());
    }

    #[test]
    fn hinted_recall_lowers_ease() {
        let sm2 = Sm2::default();
        let mut c = card(2.5, 0);
        sm2.update(&mut c, Quality::HINTED, None, now());
        // 0.1 - 2 * (0.08 + 0.04) = -0.14, times 5
        assert!(approx(c.ease, 1.8));
        assert_eq!(c.repetitions, 1);
    }

    #[test]
    fn fast_answers_amplify_the_change() {
        let sm2 = Sm2::default();
        let mut fast = card(2.5, 0);
        let mut slow = card(2.5, 0);
        sm2.update(&mut fast, Quality::PERFECT, Some(2.0), now());
        sm2.update(&mut slow, Quality::PERFECT, Some(30.0), now());
        assert!(approx(fast.ease, 2.5 + 0.5 * 1.2));
        assert!(approx(slow.ease, 2.5 + 0.5 * 0.8));
    }

    #[test]
    fn intervals_follow_one_six_then_ease() {
        let sm2 = Sm2::default();
        let mut c = card(2.5, 0);
        let mut expected_interval = 0;
        for step in 1..=5u32 {
            let ease_before = c.ease;
            let interval_before = c.interval_days;
            sm2.update(&mut c, Quality::PERFECT, None, now());
            expected_interval = match step {
                1 => 1,
                2 => 6,
                _ => (f64::from(interval_before) * ease_before).floor() as u32,
            };
            assert_eq!(c.repetitions, step);
            assert_eq!(c.interval_days, expected_interval);
        }
        assert!(expected_interval > 6);
    }

    #[test]
    fn long_perfect_streak_keeps_a_due_date() {
        let sm2 = Sm2::default();
        let mut c = card(2.5, 0);
        let start = now();
        for _ in 0..40 {
            sm2.update(&mut c, Quality::PERFECT, Some(2.0), start);
            assert!(c.next_due(start) >= start);
        }
        assert_eq!(c.next_due(start), DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn failure_halves_repetitions() {
        let sm2 = Sm2::default();
        for reps in [0u32, 1, 2, 5, 9] {
            let mut c = card(2.5, reps);
            c.interval_days = 15;
            sm2.update(&mut c, Quality::FAILED, None, now());
            assert_eq!(c.repetitions, reps / 2);
            assert_eq!(c.interval_days, 1);
        }
    }

    #[test]
    fn reset_policy_zeroes_repetitions() {
        let sm2 = Sm2 {
            lapse_policy: LapsePolicy::Reset,
            ..Sm2::default()
        };
        let mut c = card(2.5, 6);
        sm2.update(&mut c, Quality::FAILED, None, now());
        assert_eq!(c.repetitions, 0);
    }

    #[test]
    fn ease_factor_never_below_minimum() {
        let sm2 = Sm2::default();
        for quality in [0.0, 1.0, 2.0, 2.9] {
            let mut c = card(1.4, 3);
            let quality = Quality::new(quality).unwrap();
            sm2.update(&mut c, quality, Some(1.0), now());
            assert!(c.ease >= sm2.minimum_ease);
        }
    }

    #[test]
    fn partial_credit_below_half_is_a_lapse() {
        let sm2 = Sm2::default();
        let mut c = card(3.0, 4);
        sm2.update(&mut c, Quality::from_partial(0.25), None, now());
        assert_eq!(c.repetitions, 2);
        assert_eq!(c.interval_days, 1);
    }
}
