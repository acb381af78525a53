//! Study sessions and the collaborators they talk to.
//!
//! A session owns the deck for its whole duration. It loads nothing and
//! renders nothing itself: the deck comes from a [`DeckStore`], questions
//! go out through a [`Presenter`], and statistics go to a
//! [`StatisticsSink`].

mod orchestrator;
pub mod selection;

pub use orchestrator::{SessionOrchestrator, SessionOutcome};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::evaluator::{Outcome, Question};
use crate::stage::{PresentationMode, Stage};
use crate::stats::{BatchStatistics, SessionSummary, StageTrend};
use crate::types::{Card, Deck};

/// Session phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Batches of new/weak cards, each shown twice.
    InitialReview,
    /// Random batches plus the hardest cards, until the learner stops.
    RandomizedReview,
}

/// Loads and persists a deck.
pub trait DeckStore {
    fn load(&self) -> Result<Deck>;
    fn save(&self, deck: &Deck) -> Result<()>;
}

/// Everything the presenter needs to show one card.
#[derive(Debug, Clone, Copy)]
pub struct PromptRequest<'a> {
    pub card: &'a Card,
    pub stage: Stage,
    pub mode: PresentationMode,
    pub phase: Phase,
    /// 1-based position in the batch.
    pub position: usize,
    pub batch_len: usize,
}

/// What the presenter got back from the learner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PromptResult {
    Answered {
        outcome: Outcome,
        elapsed_secs: Option<f64>,
    },
    Cancelled,
}

/// Summary of a batch about to be studied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchPlan {
    pub phase: Phase,
    /// Distinct cards in the batch.
    pub cards: usize,
    /// Cards shown, repeats included.
    pub presentations: usize,
    pub carried_forward: usize,
    pub hardest: usize,
    pub recently_practiced: usize,
}

/// The learner's answer to "another batch?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinueChoice {
    Continue,
    /// Declined. The session ends normally.
    Stop,
    /// Interrupted at the prompt. The session ends as cancelled.
    Cancel,
}

/// Shows questions to the learner and collects answers.
pub trait Presenter {
    /// Present one card. The presenter drives `question` (hints, input
    /// validation, re-prompts) and reports the final outcome, or
    /// cancellation.
    fn present(&mut self, request: &PromptRequest<'_>, question: &mut Question)
        -> Result<PromptResult>;

    /// Asked after each randomized batch.
    fn continue_review(&mut self) -> Result<ContinueChoice>;

    fn phase_started(&mut self, _phase: Phase) {}

    fn batch_started(&mut self, _plan: &BatchPlan) {}
}

/// Receives statistics for display. Never feeds back into scheduling.
pub trait StatisticsSink {
    fn batch_completed(&mut self, stats: &BatchStatistics, trend: Option<&StageTrend>);

    fn session_completed(&mut self, summary: &SessionSummary);
}
