//! Answer evaluation.
//!
//! Builds the question a presentation mode calls for and scores the
//! learner's response to it:
//! - single-answer choice (true/false, single MCQ, vocabulary choice), with a
//!   one-shot hint that eliminates about half of the wrong options
//! - multi-answer MCQ with partial credit
//! - typed vocabulary answers, fuzzy matched
//!
//! Invalid input is reported as [`InputError`] and never changes question state.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::algorithm::Quality;
use crate::matching::{compare_answers, FuzzyThresholds, MatchResult};
use crate::settings::EffectiveSettings;
use crate::stage::{Direction, PresentationMode};
use crate::types::{Card, CardContent, Deck, McqCard, OptionLetter, QuestionKind, VocabularyCard};

/// What a single presentation produced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", content = "score", rename_all = "snake_case")]
pub enum Outcome {
    Correct,
    HintCorrect,
    Incorrect,
    /// Multi-answer partial credit in `(0, 1)`.
    Partial(f64),
}

impl Outcome {
    pub fn quality(self) -> Quality {
        match self {
            Self::Correct => Quality::PERFECT,
            Self::HintCorrect => Quality::HINTED,
            Self::Incorrect => Quality::FAILED,
            Self::Partial(score) => Quality::from_partial(score),
        }
    }

    /// Counted as correct in statistics and kept out of carry-forward.
    pub fn is_correct(self) -> bool {
        self.quality().is_passing()
    }

    pub fn used_hint(self) -> bool {
        matches!(self, Self::HintCorrect)
    }
}

/// Learner input that can't be scored. The presenter re-prompts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("option {choice} is out of range (1-{max})")]
    OutOfRange { choice: usize, max: usize },

    #[error("option {0} is not available")]
    Eliminated(usize),

    #[error("select at least one option")]
    EmptySelection,

    #[error("could not read selection {0:?}")]
    Unparseable(String),

    #[error("hints are not available at this level")]
    HintsDisabled,

    #[error("hint already used for this question")]
    HintAlreadyUsed,

    #[error("answer cannot be empty")]
    EmptyAnswer,
}

/// Partial-credit breakdown for a multi-answer selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialScore<T> {
    pub score: f64,
    pub is_perfect: bool,
    pub correctly_selected: Vec<T>,
    pub wrongly_selected: Vec<T>,
    pub missed: Vec<T>,
}

/// Score a selection against the correct set with set semantics:
/// `max(0, |C∩S|/|C| - 0.25 * |S\C|)`.
pub fn score_selection<T: Ord + Copy>(correct: &BTreeSet<T>, selected: &[T]) -> PartialScore<T> {
    let selected: BTreeSet<T> = selected.iter().copied().collect();
    let correctly_selected: Vec<T> = correct.intersection(&selected).copied().collect();
    let wrongly_selected: Vec<T> = selected.difference(correct).copied().collect();
    let missed: Vec<T> = correct.difference(&selected).copied().collect();

    let score = if correct.is_empty() {
        0.0
    } else {
        let hit_ratio = correctly_selected.len() as f64 / correct.len() as f64;
        (hit_ratio - 0.25 * wrongly_selected.len() as f64).max(0.0)
    };

    PartialScore {
        score,
        is_perfect: missed.is_empty() && wrongly_selected.is_empty(),
        correctly_selected,
        wrongly_selected,
        missed,
    }
}

/// Score an MCQ card by option letters.
pub fn score_mcq(card: &McqCard, selected: &[OptionLetter]) -> PartialScore<OptionLetter> {
    score_selection(card.correct_answers(), selected)
}

/// Parse `"1,3"`, `"1 3"` or `"1, 3"` into option numbers.
pub fn parse_selection(input: &str) -> Result<Vec<usize>, InputError> {
    let mut numbers = Vec::new();
    for part in input.split(|c: char| c == ',' || c.is_whitespace()) {
        if part.is_empty() {
            continue;
        }
        let number = part
            .parse::<usize>()
            .map_err(|_| InputError::Unparseable(input.trim().to_string()))?;
        if !numbers.contains(&number) {
            numbers.push(number);
        }
    }
    if numbers.is_empty() {
        return Err(InputError::EmptySelection);
    }
    Ok(numbers)
}

/// One option as displayed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChoiceOption {
    pub text: String,
    pub letter: Option<OptionLetter>,
    correct: bool,
    available: bool,
}

impl ChoiceOption {
    pub fn is_available(&self) -> bool {
        self.available
    }
}

/// Result of a multi-answer selection, with display-number feedback.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiAnswer {
    pub outcome: Outcome,
    pub partial: PartialScore<usize>,
}

/// A numbered choice question. Option numbers are 1-based display positions.
#[derive(Debug, Clone)]
pub struct ChoiceQuestion {
    prompt: String,
    note: Option<String>,
    options: Vec<ChoiceOption>,
    hints_allowed: bool,
    hint_used: bool,
    // Wrong option indices in the order a hint eliminates them.
    hint_order: Vec<usize>,
}

impl ChoiceQuestion {
    fn new<R: Rng + ?Sized>(
        prompt: String,
        note: Option<String>,
        options: Vec<ChoiceOption>,
        hints_allowed: bool,
        rng: &mut R,
    ) -> Self {
        let mut hint_order: Vec<usize> = options
            .iter()
            .enumerate()
            .filter(|(_, o)| !o.correct)
            .map(|(i, _)| i)
            .collect();
        hint_order.shuffle(rng);

        Self {
            prompt,
            note,
            options,
            hints_allowed,
            hint_used: false,
            hint_order,
        }
    }

    /// Options of an MCQ card, shuffled. True/false keeps its a/b order.
    pub fn from_mcq<R: Rng + ?Sized>(card: &McqCard, hints_allowed: bool, rng: &mut R) -> Self {
        let mut letters: Vec<OptionLetter> = card.options().keys().copied().collect();
        if card.kind() != QuestionKind::TrueFalse {
            letters.shuffle(rng);
        }

        let options = letters
            .into_iter()
            .map(|letter| ChoiceOption {
                text: card.options()[&letter].clone(),
                letter: Some(letter),
                correct: card.is_correct(letter),
                available: true,
            })
            .collect();

        Self::new(card.question().to_string(), None, options, hints_allowed, rng)
    }

    /// Vocabulary choice: the correct text among `choice_count - 1`
    /// distractors drawn from `pool`, padded with placeholders when the pool
    /// runs short. Hints are always allowed.
    pub fn vocabulary<R: Rng + ?Sized>(
        prompt: &str,
        note: Option<&str>,
        correct: &str,
        pool: Vec<String>,
        choice_count: usize,
        rng: &mut R,
    ) -> Self {
        let mut distinct: Vec<String> = Vec::new();
        for text in pool {
            if text != correct && !distinct.contains(&text) {
                distinct.push(text);
            }
        }
        let wanted = choice_count.saturating_sub(1).max(1);
        let mut distractors: Vec<String> = distinct
            .choose_multiple(rng, wanted)
            .cloned()
            .collect();
        while distractors.len() < wanted {
            distractors.push(format!("[Option {}]", distractors.len() + 1));
        }

        let mut options: Vec<ChoiceOption> = distractors
            .into_iter()
            .map(|text| ChoiceOption {
                text,
                letter: None,
                correct: false,
                available: true,
            })
            .collect();
        let position = rng.gen_range(0..=options.len());
        options.insert(
            position,
            ChoiceOption {
                text: correct.to_string(),
                letter: None,
                correct: true,
                available: true,
            },
        );

        Self::new(
            prompt.to_string(),
            note.map(str::to_string),
            options,
            true,
            rng,
        )
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn option_count(&self) -> usize {
        self.options.len()
    }

    pub fn is_multi(&self) -> bool {
        self.options.iter().filter(|o| o.correct).count() > 1
    }

    pub fn hints_allowed(&self) -> bool {
        self.hints_allowed
    }

    pub fn hint_used(&self) -> bool {
        self.hint_used
    }

    pub fn hint_available(&self) -> bool {
        self.hints_allowed && !self.hint_used
    }

    /// Options still on offer, with their display numbers.
    pub fn visible_options(&self) -> Vec<(usize, &ChoiceOption)> {
        self.options
            .iter()
            .enumerate()
            .filter(|(_, o)| o.available)
            .map(|(i, o)| (i + 1, o))
            .collect()
    }

    /// Display numbers of the correct options.
    pub fn correct_numbers(&self) -> Vec<usize> {
        self.options
            .iter()
            .enumerate()
            .filter(|(_, o)| o.correct)
            .map(|(i, _)| i + 1)
            .collect()
    }

    pub fn option(&self, number: usize) -> Option<&ChoiceOption> {
        number.checked_sub(1).and_then(|i| self.options.get(i))
    }

    /// Eliminate ⌈wrong/2⌉ (at least one) of the wrong options still on
    /// offer. Returns the eliminated display numbers.
    pub fn use_hint(&mut self) -> Result<Vec<usize>, InputError> {
        if !self.hints_allowed {
            return Err(InputError::HintsDisabled);
        }
        if self.hint_used {
            return Err(InputError::HintAlreadyUsed);
        }

        let wrong: Vec<usize> = self
            .hint_order
            .iter()
            .copied()
            .filter(|&i| self.options[i].available)
            .collect();
        let count = ((wrong.len() + 1) / 2).max(1).min(wrong.len());
        let removed: Vec<usize> = wrong.into_iter().take(count).collect();
        for &i in &removed {
            self.options[i].available = false;
        }
        self.hint_used = true;

        Ok(removed.into_iter().map(|i| i + 1).collect())
    }

    fn check_choice(&self, choice: usize) -> Result<usize, InputError> {
        let max = self.options.len();
        if choice == 0 || choice > max {
            return Err(InputError::OutOfRange { choice, max });
        }
        let index = choice - 1;
        if !self.options[index].available {
            return Err(InputError::Eliminated(choice));
        }
        Ok(index)
    }

    /// Score a single selection.
    pub fn answer(&self, choice: usize) -> Result<Outcome, InputError> {
        let index = self.check_choice(choice)?;
        if self.is_multi() {
            return self.answer_many(&[choice]).map(|m| m.outcome);
        }

        Ok(match (self.options[index].correct, self.hint_used) {
            (true, true) => Outcome::HintCorrect,
            (true, false) => Outcome::Correct,
            (false, _) => Outcome::Incorrect,
        })
    }

    /// Score a multi-answer selection. Order and repeats don't matter.
    pub fn answer_many(&self, choices: &[usize]) -> Result<MultiAnswer, InputError> {
        if choices.is_empty() {
            return Err(InputError::EmptySelection);
        }
        for &choice in choices {
            self.check_choice(choice)?;
        }

        let correct: BTreeSet<usize> = self.correct_numbers().into_iter().collect();
        let partial = score_selection(&correct, choices);
        let outcome = if partial.is_perfect {
            if self.hint_used {
                Outcome::HintCorrect
            } else {
                Outcome::Correct
            }
        } else if partial.score > 0.0 {
            Outcome::Partial(partial.score)
        } else {
            Outcome::Incorrect
        };

        Ok(MultiAnswer { outcome, partial })
    }
}

/// Free-text question on a vocabulary card.
#[derive(Debug, Clone)]
pub struct TypedQuestion {
    prompt: String,
    note: Option<String>,
    expected: String,
    direction: Direction,
    thresholds: FuzzyThresholds,
}

impl TypedQuestion {
    pub fn new(
        card: &VocabularyCard,
        direction: Direction,
        thresholds: FuzzyThresholds,
    ) -> Self {
        let (prompt, expected) = sides(card, direction);
        Self {
            prompt: prompt.to_string(),
            note: card.formula.clone(),
            expected: expected.to_string(),
            direction,
            thresholds,
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn expected(&self) -> &str {
        &self.expected
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn answer(&self, typed: &str) -> Result<MatchResult, InputError> {
        if typed.trim().is_empty() {
            return Err(InputError::EmptyAnswer);
        }
        Ok(compare_answers(typed, &self.expected, self.thresholds))
    }
}

/// Front and back of a card shown in review mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewPrompt {
    pub front: String,
    pub back: String,
    /// Formula or explanation, when the card has one.
    pub note: Option<String>,
}

impl ReviewPrompt {
    pub fn for_content(content: &CardContent) -> Self {
        match content {
            CardContent::Vocabulary(v) => Self {
                front: v.term.clone(),
                back: v.definition.clone(),
                note: v.formula.clone(),
            },
            CardContent::Mcq(m) => Self {
                front: m.question().to_string(),
                back: m.correct_texts().join("; "),
                note: m.explanation().map(str::to_string),
            },
        }
    }
}

/// A question ready for the presenter.
#[derive(Debug, Clone)]
pub enum Question {
    Review(ReviewPrompt),
    Choice(ChoiceQuestion),
    Typed(TypedQuestion),
}

impl Question {
    /// Build the question `mode` calls for. Distractors for vocabulary
    /// choice questions come from the other vocabulary cards in `deck`.
    pub fn build<R: Rng + ?Sized>(
        card: &Card,
        mode: PresentationMode,
        deck: &Deck,
        settings: &EffectiveSettings,
        rng: &mut R,
    ) -> Self {
        match (mode, &card.content) {
            (PresentationMode::McqChoice { hints_allowed }, CardContent::Mcq(mcq)) => {
                Self::Choice(ChoiceQuestion::from_mcq(mcq, hints_allowed, rng))
            }
            (PresentationMode::VocabularyChoice(direction), CardContent::Vocabulary(vocab)) => {
                let (prompt, correct) = sides(vocab, direction);
                let pool = deck
                    .iter()
                    .filter(|other| other.id != card.id)
                    .filter_map(|other| match &other.content {
                        CardContent::Vocabulary(v) => Some(sides(v, direction).1.to_string()),
                        CardContent::Mcq(_) => None,
                    })
                    .collect();
                Self::Choice(ChoiceQuestion::vocabulary(
                    prompt,
                    vocab.formula.as_deref(),
                    correct,
                    pool,
                    settings.choice_count,
                    rng,
                ))
            }
            (PresentationMode::VocabularyTyped(direction), CardContent::Vocabulary(vocab)) => {
                Self::Typed(TypedQuestion::new(
                    vocab,
                    direction,
                    FuzzyThresholds::from_settings(settings),
                ))
            }
            // Review, or a mode that doesn't fit the card family.
            (_, content) => Self::Review(ReviewPrompt::for_content(content)),
        }
    }
}

/// (shown, asked-for) text for a direction.
fn sides(card: &VocabularyCard, direction: Direction) -> (&str, &str) {
    match direction {
        Direction::TermToDefinition => (&card.term, &card.definition),
        Direction::DefinitionToTerm => (&card.definition, &card.term),
    }
}
