//! Core of the adaptive flashcard study engine.
//!
//! Provides:
//! - Card and deck types for vocabulary and multiple-choice cards
//! - SM-2 scheduling with a response-time modifier
//! - Stage classification and the presentation mode for each stage
//! - Answer evaluation (choice questions, hints, partial credit, fuzzy typed answers)
//! - The two-phase session orchestrator and its statistics

pub mod algorithm;
pub mod error;
pub mod evaluator;
pub mod matching;
pub mod session;
pub mod settings;
pub mod stage;
pub mod stats;
pub mod types;

pub use algorithm::{sm2::Sm2, time_modifier, Quality, SpacedRepetitionAlgorithm};
pub use error::{Result, StudyError};
pub use evaluator::{
    ChoiceOption, ChoiceQuestion, InputError, MultiAnswer, Outcome, PartialScore, Question,
    ReviewPrompt, TypedQuestion,
};
pub use matching::{
    compare_answers, normalized_similarity, word_diff, DiffSegment, DiffType, FuzzyThresholds,
    MatchResult, Verdict,
};
pub use session::{
    BatchPlan, ContinueChoice, DeckStore, Phase, Presenter, PromptRequest, PromptResult,
    SessionOrchestrator, SessionOutcome, StatisticsSink,
};
pub use settings::{DeckSettings, EffectiveSettings, GlobalSettings, LapsePolicy};
pub use stage::{Direction, PresentationMode, Stage};
pub use stats::{
    BatchStatistics, BatchTally, SessionStatistics, SessionSummary, StageHistogram, StageTrend,
    TrendDirection,
};
pub use types::{
    Card, CardContent, CardId, Deck, McqCard, OptionLetter, QuestionKind, VocabularyCard,
    DEFAULT_EASE, MINIMUM_EASE,
};
