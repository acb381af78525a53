//! Batch selection for the two session phases. Everything works on card
//! ids, never on card values, so duplicate-content cards stay distinct.

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{BTreeSet, HashSet, VecDeque};

use crate::types::{CardId, Deck};

/// Initial review: walk the deck by ascending repetitions, re-queueing
/// cards the learner got wrong.
#[derive(Debug, Clone)]
pub struct InitialReviewPlan {
    order: Vec<CardId>,
    cursor: usize,
    carry_forward: VecDeque<CardId>,
    batch_size: usize,
}

impl InitialReviewPlan {
    pub fn new(deck: &Deck, batch_size: usize) -> Self {
        let mut cards: Vec<_> = deck.iter().collect();
        // stable: equal repetitions keep deck order
        cards.sort_by_key(|c| c.repetitions);

        Self {
            order: cards.into_iter().map(|c| c.id).collect(),
            cursor: 0,
            carry_forward: VecDeque::new(),
            batch_size: batch_size.max(1),
        }
    }

    /// Up to `batch_size` carried-forward cards, topped up from the deck.
    /// Returns `None` once the deck is exhausted and nothing is carried.
    pub fn next_batch(&mut self) -> Option<InitialBatch> {
        let mut cards = Vec::with_capacity(self.batch_size);
        while cards.len() < self.batch_size {
            match self.carry_forward.pop_front() {
                Some(id) => cards.push(id),
                None => break,
            }
        }
        let carried_forward = cards.len();

        while cards.len() < self.batch_size && self.cursor < self.order.len() {
            cards.push(self.order[self.cursor]);
            self.cursor += 1;
        }

        (!cards.is_empty()).then_some(InitialBatch {
            cards,
            carried_forward,
        })
    }

    /// Queue the cards of `batch` answered incorrectly, once each.
    pub fn carry_forward(&mut self, batch: &[CardId], incorrect: &[CardId]) {
        let members: HashSet<CardId> = batch.iter().copied().collect();
        for id in incorrect {
            if members.contains(id) && !self.carry_forward.contains(id) {
                self.carry_forward.push_back(*id);
            }
        }
    }

    pub fn carried(&self) -> usize {
        self.carry_forward.len()
    }

    pub fn remaining(&self) -> usize {
        self.order.len() - self.cursor
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.order.len() && self.carry_forward.is_empty()
    }
}

/// One initial-review batch, before repetition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialBatch {
    pub cards: Vec<CardId>,
    pub carried_forward: usize,
}

impl InitialBatch {
    /// The batch followed by the same cards again.
    pub fn presentation_order(&self) -> Vec<CardId> {
        self.cards.iter().chain(self.cards.iter()).copied().collect()
    }
}

/// Randomized review: fresh cards plus the deck's hardest cards, with a
/// decaying memory of what was practiced recently.
#[derive(Debug, Clone)]
pub struct RandomizedReviewPlan {
    recently_practiced: BTreeSet<CardId>,
    batch_size: usize,
    hardest_count: usize,
    decay_fraction: f64,
}

/// One randomized batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandomizedBatch {
    /// Selected cards first, then the hardest ones; no duplicates.
    pub cards: Vec<CardId>,
    pub hardest: Vec<CardId>,
    pub recently_practiced: usize,
}

impl RandomizedReviewPlan {
    pub fn new(batch_size: usize, hardest_count: usize, decay_fraction: f64) -> Self {
        Self {
            recently_practiced: BTreeSet::new(),
            batch_size: batch_size.max(1),
            hardest_count,
            decay_fraction,
        }
    }

    pub fn recently_practiced(&self) -> &BTreeSet<CardId> {
        &self.recently_practiced
    }

    /// The `hardest_count` lowest-ease cards, ties in deck order.
    pub fn hardest(&self, deck: &Deck) -> Vec<CardId> {
        let mut cards: Vec<_> = deck.iter().collect();
        cards.sort_by(|a, b| a.ease.total_cmp(&b.ease));
        cards
            .into_iter()
            .take(self.hardest_count)
            .map(|c| c.id)
            .collect()
    }

    pub fn next_batch<R: Rng + ?Sized>(&mut self, deck: &Deck, rng: &mut R) -> RandomizedBatch {
        let hardest = self.hardest(deck);
        let hardest_set: HashSet<CardId> = hardest.iter().copied().collect();
        let candidates: Vec<CardId> = deck
            .ids()
            .into_iter()
            .filter(|id| !hardest_set.contains(id))
            .collect();

        let (mut unpracticed, mut practiced): (Vec<CardId>, Vec<CardId>) = candidates
            .iter()
            .partition(|id| !self.recently_practiced.contains(id));

        let selected: Vec<CardId> = if candidates.is_empty() {
            Vec::new()
        } else if unpracticed.len() >= self.batch_size {
            unpracticed.shuffle(rng);
            unpracticed.truncate(self.batch_size);
            unpracticed
        } else if !unpracticed.is_empty() {
            unpracticed.shuffle(rng);
            practiced.shuffle(rng);
            let needed = self.batch_size - unpracticed.len();
            unpracticed.extend(practiced.into_iter().take(needed));
            unpracticed
        } else {
            self.recently_practiced.clear();
            let mut pool = candidates;
            pool.shuffle(rng);
            pool.truncate(self.batch_size);
            pool
        };

        let recently_practiced = selected
            .iter()
            .filter(|id| self.recently_practiced.contains(id))
            .count();

        let mut seen = HashSet::new();
        let cards = selected
            .into_iter()
            .chain(hardest.iter().copied())
            .filter(|id| seen.insert(*id))
            .collect();

        RandomizedBatch {
            cards,
            hardest,
            recently_practiced,
        }
    }

    /// Remember a studied batch. Past `decay_fraction` of the deck, the
    /// pool shrinks to a random half.
    pub fn record_practiced<R: Rng + ?Sized>(
        &mut self,
        batch: &[CardId],
        deck_len: usize,
        rng: &mut R,
    ) {
        self.recently_practiced.extend(batch.iter().copied());

        if self.recently_practiced.len() as f64 > deck_len as f64 * self.decay_fraction {
            let mut kept: Vec<CardId> = self.recently_practiced.iter().copied().collect();
            let half = kept.len() / 2;
            kept.shuffle(rng);
            kept.truncate(half);
            self.recently_practiced = kept.into_iter().collect();
        }
    }
}
