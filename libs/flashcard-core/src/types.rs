//! Core types: cards, their learning state, and the deck that owns them.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use crate::error::{Result, StudyError};

/// Ease assigned to new cards and to cards whose stored ease is unreadable.
pub const DEFAULT_EASE: f64 = 2.5;

/// Lower bound for ease; the scheduler never goes below it.
pub const MINIMUM_EASE: f64 = 1.3;

/// Stable card identifier, unique within a deck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(pub u64);

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Letter of a multiple-choice option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionLetter {
    A,
    B,
    C,
    D,
}

impl OptionLetter {
    pub const ALL: [OptionLetter; 4] = [Self::A, Self::B, Self::C, Self::D];

    pub fn as_char(self) -> char {
        match self {
            Self::A => 'a',
            Self::B => 'b',
            Self::C => 'c',
            Self::D => 'd',
        }
    }

    /// Parse a letter, ignoring case.
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'a' => Some(Self::A),
            'b' => Some(Self::B),
            'c' => Some(Self::C),
            'd' => Some(Self::D),
            _ => None,
        }
    }
}

impl fmt::Display for OptionLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Shape of a multiple-choice question, derived from its options and answer key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    TrueFalse,
    McqSingle,
    McqMulti,
}

/// Term/definition card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularyCard {
    pub term: String,
    pub definition: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
}

impl VocabularyCard {
    pub fn new(term: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            definition: definition.into(),
            formula: None,
        }
    }

    pub fn with_formula(mut self, formula: impl Into<String>) -> Self {
        let formula = formula.into();
        self.formula = (!formula.trim().is_empty()).then_some(formula);
        self
    }
}

/// Multiple-choice card. Options and answer key are validated on construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McqCard {
    question: String,
    options: BTreeMap<OptionLetter, String>,
    correct_answers: BTreeSet<OptionLetter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    explanation: Option<String>,
}

impl McqCard {
    /// Build an MCQ card. Requires 2-4 options and a non-empty answer key
    /// drawn from the option letters.
    pub fn new(
        question: impl Into<String>,
        options: BTreeMap<OptionLetter, String>,
        correct_answers: BTreeSet<OptionLetter>,
        explanation: Option<String>,
    ) -> Result<Self> {
        let question = question.into();
        if !(2..=4).contains(&options.len()) {
            return Err(StudyError::InvalidCard(format!(
                "question {:?} has {} options, expected 2-4",
                question,
                options.len()
            )));
        }
        if correct_answers.is_empty() {
            return Err(StudyError::InvalidCard(format!(
                "question {:?} has no correct answer",
                question
            )));
        }
        if let Some(missing) = correct_answers.iter().find(|l| !options.contains_key(l)) {
            return Err(StudyError::InvalidCard(format!(
                "question {:?} marks option {} correct but has no such option",
                question, missing
            )));
        }

        Ok(Self {
            question,
            options,
            correct_answers,
            explanation: explanation.filter(|e| !e.trim().is_empty()),
        })
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn options(&self) -> &BTreeMap<OptionLetter, String> {
        &self.options
    }

    pub fn correct_answers(&self) -> &BTreeSet<OptionLetter> {
        &self.correct_answers
    }

    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    pub fn is_correct(&self, letter: OptionLetter) -> bool {
        self.correct_answers.contains(&letter)
    }

    pub fn kind(&self) -> QuestionKind {
        if self.correct_answers.len() > 1 {
            QuestionKind::McqMulti
        } else if self.options.len() == 2 {
            QuestionKind::TrueFalse
        } else {
            QuestionKind::McqSingle
        }
    }

    /// Text of every correct option, in letter order.
    pub fn correct_texts(&self) -> Vec<&str> {
        self.correct_answers
            .iter()
            .filter_map(|l| self.options.get(l).map(String::as_str))
            .collect()
    }
}

/// Card content, one variant per card family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CardContent {
    Vocabulary(VocabularyCard),
    Mcq(McqCard),
}

/// A flashcard with its scheduling state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub ease: f64,
    pub repetitions: u32,
    /// Days until the next review. Kept in memory only.
    #[serde(skip)]
    pub interval_days: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reviewed: Option<DateTime<Utc>>,
    pub content: CardContent,
}

impl Card {
    /// New, never-reviewed card.
    pub fn new(id: CardId, content: CardContent) -> Self {
        Self {
            id,
            ease: DEFAULT_EASE,
            repetitions: 0,
            interval_days: 1,
            last_reviewed: None,
            content,
        }
    }

    /// Restore stored progress. Ease is clamped to the minimum.
    pub fn with_progress(
        mut self,
        ease: f64,
        repetitions: u32,
        last_reviewed: Option<DateTime<Utc>>,
    ) -> Self {
        self.ease = if ease.is_finite() {
            ease.max(MINIMUM_EASE)
        } else {
            DEFAULT_EASE
        };
        self.repetitions = repetitions;
        self.last_reviewed = last_reviewed;
        self
    }

    pub fn question_kind(&self) -> Option<QuestionKind> {
        match &self.content {
            CardContent::Mcq(mcq) => Some(mcq.kind()),
            CardContent::Vocabulary(_) => None,
        }
    }

    /// Text shown on the front of the card.
    pub fn front(&self) -> &str {
        match &self.content {
            CardContent::Vocabulary(v) => &v.term,
            CardContent::Mcq(m) => m.question(),
        }
    }

    /// When the card is next due. Unreviewed cards are due `now`; intervals
    /// past chrono's range saturate at the latest representable instant.
    pub fn next_due(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.last_reviewed {
            Some(reviewed) => reviewed
                .checked_add_signed(Duration::days(i64::from(self.interval_days)))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            None => now,
        }
    }
}

/// Ordered collection of cards. Insertion order is the tie-break for every
/// ordering the scheduler applies.
#[derive(Debug, Clone, Default)]
pub struct Deck {
    cards: Vec<Card>,
    index: HashMap<CardId, usize>,
}

impl Deck {
    pub fn new(cards: Vec<Card>) -> Result<Self> {
        let mut index = HashMap::with_capacity(cards.len());
        for (position, card) in cards.iter().enumerate() {
            if index.insert(card.id, position).is_some() {
                return Err(StudyError::DuplicateId(card.id));
            }
        }
        Ok(Self { cards, index })
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn iter(&self) -> impl Iterator<Item = &Card> {
        self.cards.iter()
    }

    /// Card ids in insertion order.
    pub fn ids(&self) -> Vec<CardId> {
        self.cards.iter().map(|c| c.id).collect()
    }

    pub fn position(&self, id: CardId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn get(&self, id: CardId) -> Option<&Card> {
        self.position(id).map(|i| &self.cards[i])
    }

    pub fn get_mut(&mut self, id: CardId) -> Option<&mut Card> {
        match self.position(id) {
            Some(i) => Some(&mut self.cards[i]),
            None => None,
        }
    }

    pub fn into_cards(self) -> Vec<Card> {
        self.cards
    }
}
