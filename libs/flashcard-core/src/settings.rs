//! Study settings: global defaults, per-deck overrides, and their merge.

use serde::{Deserialize, Serialize};

/// What a failed review does to the repetition count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LapsePolicy {
    /// `repetitions := floor(repetitions / 2)`.
    Halve,
    /// `repetitions := 0`.
    Reset,
}

impl Default for LapsePolicy {
    fn default() -> Self {
        Self::Halve
    }
}

/// Global settings configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalSettings {
    pub lapse_policy: LapsePolicy,
    /// Similarity above which a typed answer is correct.
    pub fuzzy_correct_threshold: f64,
    /// Similarity above which a typed answer counts as "almost".
    pub fuzzy_almost_threshold: f64,
    /// Cards per batch in both phases (before repeats and hardest cards).
    pub batch_size: usize,
    /// Lowest-ease cards added to every randomized batch.
    pub hardest_count: usize,
    /// Fraction of the deck the recently-practiced pool may reach before it decays.
    pub recent_decay_fraction: f64,
    /// Options shown on vocabulary choice questions, correct one included.
    pub choice_count: usize,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            lapse_policy: LapsePolicy::default(),
            fuzzy_correct_threshold: 0.7,
            fuzzy_almost_threshold: 0.3,
            batch_size: 7,
            hardest_count: 8,
            recent_decay_fraction: 0.6,
            choice_count: 5,
        }
    }
}

/// Per-deck settings (all fields optional for overrides).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lapse_policy: Option<LapsePolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fuzzy_correct_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fuzzy_almost_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hardest_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choice_count: Option<usize>,
}

/// Effective settings (global merged with deck overrides).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectiveSettings {
    pub lapse_policy: LapsePolicy,
    pub fuzzy_correct_threshold: f64,
    pub fuzzy_almost_threshold: f64,
    pub batch_size: usize,
    pub hardest_count: usize,
    pub recent_decay_fraction: f64,
    pub choice_count: usize,
}

impl EffectiveSettings {
    /// Merge global settings with optional deck settings.
    ///
    /// Batch size and choice count are floored at 1 and 2 so a session can
    /// always make progress.
    pub fn merge(global: &GlobalSettings, deck: Option<&DeckSettings>) -> Self {
        let deck = deck.cloned().unwrap_or_default();
        Self {
            lapse_policy: deck.lapse_policy.unwrap_or(global.lapse_policy),
            fuzzy_correct_threshold: deck
                .fuzzy_correct_threshold
                .unwrap_or(global.fuzzy_correct_threshold),
            fuzzy_almost_threshold: deck
                .fuzzy_almost_threshold
                .unwrap_or(global.fuzzy_almost_threshold),
            batch_size: deck.batch_size.unwrap_or(global.batch_size).max(1),
            hardest_count: deck.hardest_count.unwrap_or(global.hardest_count),
            recent_decay_fraction: global.recent_decay_fraction,
            choice_count: deck.choice_count.unwrap_or(global.choice_count).max(2),
        }
    }
}

impl Default for EffectiveSettings {
    fn default() -> Self {
        Self::merge(&GlobalSettings::default(), None)
    }
}
