//! Learning stages and the presentation mode each one selects.
//!
//! A stage is never stored. It is derived from `(repetitions, ease)` every
//! time a card comes up, so it can't go stale after a scheduler update.

use crate::types::{Card, CardContent};
use serde::{Deserialize, Serialize};

/// Learning stage, ordered from least to most mastered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Review = 1,
    Basic = 2,
    Intermediate = 3,
    Advanced = 4,
    Expert = 5,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Self::Review,
        Self::Basic,
        Self::Intermediate,
        Self::Advanced,
        Self::Expert,
    ];

    /// Stage for a card's current state.
    pub fn classify(card: &Card) -> Self {
        Self::from_state(card.repetitions, card.ease)
    }

    pub fn from_state(repetitions: u32, ease: f64) -> Self {
        if repetitions == 0 || ease < 2.0 {
            Self::Review
        } else if ease < 3.0 {
            Self::Basic
        } else if ease < 4.0 {
            Self::Intermediate
        } else if ease < 5.0 {
            Self::Advanced
        } else {
            Self::Expert
        }
    }

    /// 1-based stage number.
    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn index(self) -> usize {
        self as usize - 1
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Review => "Review",
            Self::Basic => "Basic",
            Self::Intermediate => "Intermediate",
            Self::Advanced => "Advanced",
            Self::Expert => "Expert",
        }
    }
}

/// Which side of a vocabulary card is shown and which is asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    TermToDefinition,
    DefinitionToTerm,
}

/// How a card is put in front of the learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresentationMode {
    /// Full answer shown; acknowledging it scores as perfect recall.
    Review,
    /// The card's own options.
    McqChoice { hints_allowed: bool },
    /// Pick the matching side from a list; hints allowed.
    VocabularyChoice(Direction),
    /// Type the matching side; fuzzy matched.
    VocabularyTyped(Direction),
}

impl PresentationMode {
    pub fn for_card(card: &Card, stage: Stage) -> Self {
        match (&card.content, stage) {
            (_, Stage::Review) => Self::Review,
            (CardContent::Mcq(_), Stage::Basic | Stage::Intermediate) => {
                Self::McqChoice { hints_allowed: true }
            }
            (CardContent::Mcq(_), Stage::Advanced | Stage::Expert) => {
                Self::McqChoice {
                    hints_allowed: false,
                }
            }
            (CardContent::Vocabulary(_), Stage::Basic) => {
                Self::VocabularyChoice(Direction::DefinitionToTerm)
            }
            (CardContent::Vocabulary(_), Stage::Intermediate) => {
                Self::VocabularyChoice(Direction::TermToDefinition)
            }
            (CardContent::Vocabulary(_), Stage::Advanced) => {
                Self::VocabularyTyped(Direction::TermToDefinition)
            }
            (CardContent::Vocabulary(_), Stage::Expert) => {
                Self::VocabularyTyped(Direction::DefinitionToTerm)
            }
        }
    }
}
