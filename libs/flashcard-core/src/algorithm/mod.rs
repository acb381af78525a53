//! Spaced repetition scheduling.

pub mod sm2;

use crate::types::Card;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Review quality on the 0-5 SM-2 scale.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quality(f64);

impl Quality {
    /// Correct without a hint.
    pub const PERFECT: Quality = Quality(5.0);
    /// Correct after a hint, or an "almost" typed answer.
    pub const HINTED: Quality = Quality(3.0);
    /// Incorrect.
    pub const FAILED: Quality = Quality(1.0);

    /// Returns `None` outside `0..=5`.
    pub fn new(value: f64) -> Option<Self> {
        (0.0..=5.0).contains(&value).then_some(Self(value))
    }

    /// Map a partial-credit score in `[0, 1]` to `1 + 4p`.
    pub fn from_partial(score: f64) -> Self {
        let score = if score.is_finite() {
            score.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self(1.0 + 4.0 * score)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn is_passing(self) -> bool {
        self.0 >= 3.0
    }
}

/// Ease multiplier from how long the learner took to answer.
pub fn time_modifier(response_secs: Option<f64>) -> f64 {
    match response_secs {
        None => 1.0,
        Some(t) if t <= 3.0 => 1.2,
        Some(t) if t <= 6.0 => 1.1,
        Some(t) if t <= 12.0 => 1.0,
        Some(t) if t <= 20.0 => 0.9,
        Some(_) => 0.8,
    }
}

/// Trait for spaced repetition algorithms.
pub trait SpacedRepetitionAlgorithm: Send + Sync {
    /// Algorithm identifier.
    fn name(&self) -> &'static str;

    /// Apply one review to the card in place.
    fn update(
        &self,
        card: &mut Card,
        quality: Quality,
        response_secs: Option<f64>,
        now: DateTime<Utc>,
    );
}
