//! Deck factories for integration tests.

use std::collections::{BTreeMap, BTreeSet};

use flashcard_core::{Card, CardContent, CardId, Deck, McqCard, OptionLetter, VocabularyCard};

/// A vocabulary card with distinct term and definition.
pub fn vocabulary_card(id: u64, ease: f64, repetitions: u32) -> Card {
    Card::new(
        CardId(id),
        CardContent::Vocabulary(VocabularyCard::new(
            format!("term {id}"),
            format!("definition {id}"),
        )),
    )
    .with_progress(ease, repetitions, None)
}

/// `n` fresh vocabulary cards, ids 1..=n.
pub fn fresh_vocabulary_deck(n: u64) -> Deck {
    Deck::new((1..=n).map(|id| vocabulary_card(id, 2.5, 0)).collect()).unwrap()
}

/// Vocabulary deck from `(ease, repetitions)` pairs, ids from position.
pub fn vocabulary_deck(states: &[(f64, u32)]) -> Deck {
    let cards = states
        .iter()
        .enumerate()
        .map(|(i, (ease, reps))| vocabulary_card(i as u64 + 1, *ease, *reps))
        .collect();
    Deck::new(cards).unwrap()
}

/// Four-option MCQ card with the given correct letters.
pub fn mcq_card(id: u64, correct: &[OptionLetter], ease: f64, repetitions: u32) -> Card {
    let options: BTreeMap<_, _> = OptionLetter::ALL
        .iter()
        .map(|l| (*l, format!("option {l}")))
        .collect();
    let correct: BTreeSet<_> = correct.iter().copied().collect();
    let mcq = McqCard::new(format!("Question {id}?"), options, correct, None).unwrap();
    Card::new(CardId(id), CardContent::Mcq(mcq)).with_progress(ease, repetitions, None)
}
