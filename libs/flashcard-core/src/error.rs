//! Error types for flashcard-core.

use crate::types::CardId;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using StudyError.
pub type Result<T> = std::result::Result<T, StudyError>;

/// Errors that can stop a study session or a deck load/save.
#[derive(Debug, Error)]
pub enum StudyError {
    #[error("deck not found: {}", .0.display())]
    DeckNotFound(PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed deck at line {line}: {reason}")]
    MalformedDeck { line: usize, reason: String },

    #[error("invalid card: {0}")]
    InvalidCard(String),

    #[error("duplicate card id {0}")]
    DuplicateId(CardId),

    #[error("unknown card id {0}")]
    UnknownCard(CardId),

    #[error("failed to save deck: {0}")]
    Save(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_deck_not_found() {
        let error = StudyError::DeckNotFound(PathBuf::from("practice_decks/deck.csv"));
        assert_eq!(error.to_string(), "deck not found: practice_decks/deck.csv");
    }

    #[test]
    fn display_malformed_deck() {
        let error = StudyError::MalformedDeck {
            line: 3,
            reason: "missing term".to_string(),
        };
        assert_eq!(error.to_string(), "malformed deck at line 3: missing term");
    }

    #[test]
    fn display_duplicate_id() {
        let error = StudyError::DuplicateId(CardId(7));
        assert_eq!(error.to_string(), "duplicate card id 7");
    }
}
