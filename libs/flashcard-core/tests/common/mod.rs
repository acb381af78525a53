//! Common test collaborators for session integration tests.
//!
//! This module provides:
//! - ScriptedPresenter, which answers from a fixed script
//! - CountingStore, which records every save
//! - RecordingSink, which keeps every statistic it is handed

#![allow(dead_code)]

pub mod fixtures;

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;

use flashcard_core::{
    BatchPlan, BatchStatistics, Card, CardId, ContinueChoice, Deck, DeckStore, Outcome, Phase,
    PresentationMode, Presenter, PromptRequest, PromptResult, Question, Result, SessionSummary,
    Stage, StageTrend, StatisticsSink,
};

/// One scripted learner action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// Pick the right answer.
    Correct,
    /// Pick a wrong answer where the question has one.
    Wrong,
    /// Take a hint, then pick the right answer.
    Hint,
    /// Interrupt the session.
    Cancel,
    /// Lose the terminal mid-prompt.
    Fail,
}

/// What the presenter saw for one card.
#[derive(Debug, Clone)]
pub struct Presented {
    pub card: Card,
    pub stage: Stage,
    pub mode: PresentationMode,
    pub phase: Phase,
    pub outcome: Option<Outcome>,
}

/// Answers from a script, then `Correct` once the script runs out.
pub struct ScriptedPresenter {
    replies: VecDeque<Reply>,
    continues: VecDeque<ContinueChoice>,
    pub presented: Vec<Presented>,
    pub phases: Vec<Phase>,
    pub batches: Vec<BatchPlan>,
    pub elapsed_secs: Option<f64>,
}

impl ScriptedPresenter {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: replies.into_iter().collect(),
            continues: VecDeque::new(),
            presented: Vec::new(),
            phases: Vec::new(),
            batches: Vec::new(),
            elapsed_secs: None,
        }
    }

    pub fn always_correct() -> Self {
        Self::new([])
    }

    /// Answers to "continue?", in order. Stops once exhausted.
    pub fn with_continues(mut self, continues: impl IntoIterator<Item = ContinueChoice>) -> Self {
        self.continues = continues.into_iter().collect();
        self
    }

    pub fn presented_ids(&self) -> Vec<CardId> {
        self.presented.iter().map(|p| p.card.id).collect()
    }

    fn answer(reply: Reply, question: &mut Question) -> Outcome {
        match question {
            Question::Review(_) => match reply {
                Reply::Wrong => Outcome::Incorrect,
                _ => Outcome::Correct,
            },
            Question::Choice(choice) => {
                if reply == Reply::Hint {
                    choice.use_hint().unwrap();
                }
                let correct = choice.correct_numbers();
                if reply == Reply::Wrong {
                    let wrong = choice
                        .visible_options()
                        .into_iter()
                        .map(|(n, _)| n)
                        .find(|n| !correct.contains(n))
                        .unwrap();
                    return choice.answer(wrong).unwrap();
                }
                if choice.is_multi() {
                    choice.answer_many(&correct).unwrap().outcome
                } else {
                    choice.answer(correct[0]).unwrap()
                }
            }
            Question::Typed(typed) => {
                let text = match reply {
                    Reply::Wrong => "zzzzzzzzzzzzzzzzzzzz".to_string(),
                    _ => typed.expected().to_string(),
                };
                typed.answer(&text).unwrap().verdict.outcome()
            }
        }
    }
}

impl Presenter for ScriptedPresenter {
    fn present(
        &mut self,
        request: &PromptRequest<'_>,
        question: &mut Question,
    ) -> Result<PromptResult> {
        let reply = self.replies.pop_front().unwrap_or(Reply::Correct);
        let mut presented = Presented {
            card: request.card.clone(),
            stage: request.stage,
            mode: request.mode,
            phase: request.phase,
            outcome: None,
        };

        match reply {
            Reply::Cancel => {
                self.presented.push(presented);
                return Ok(PromptResult::Cancelled);
            }
            Reply::Fail => {
                self.presented.push(presented);
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "terminal closed").into());
            }
            _ => {}
        }

        let outcome = Self::answer(reply, question);
        presented.outcome = Some(outcome);
        self.presented.push(presented);
        Ok(PromptResult::Answered {
            outcome,
            elapsed_secs: self.elapsed_secs,
        })
    }

    fn continue_review(&mut self) -> Result<ContinueChoice> {
        Ok(self.continues.pop_front().unwrap_or(ContinueChoice::Stop))
    }

    fn phase_started(&mut self, phase: Phase) {
        self.phases.push(phase);
    }

    fn batch_started(&mut self, plan: &BatchPlan) {
        self.batches.push(plan.clone());
    }
}

/// Keeps a copy of every saved deck.
#[derive(Default)]
pub struct CountingStore {
    pub saved: RefCell<Vec<Deck>>,
}

impl CountingStore {
    pub fn saves(&self) -> usize {
        self.saved.borrow().len()
    }
}

impl DeckStore for CountingStore {
    fn load(&self) -> Result<Deck> {
        Ok(self
            .saved
            .borrow()
            .last()
            .cloned()
            .unwrap_or_else(|| Deck::new(Vec::new()).unwrap()))
    }

    fn save(&self, deck: &Deck) -> Result<()> {
        self.saved.borrow_mut().push(deck.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub batches: Vec<BatchStatistics>,
    pub trends: Vec<Option<StageTrend>>,
    pub summaries: Vec<SessionSummary>,
}

impl StatisticsSink for RecordingSink {
    fn batch_completed(&mut self, stats: &BatchStatistics, trend: Option<&StageTrend>) {
        self.batches.push(stats.clone());
        self.trends.push(trend.cloned());
    }

    fn session_completed(&mut self, summary: &SessionSummary) {
        self.summaries.push(summary.clone());
    }
}
