//! Fuzzy matching for typed answers.

use serde::{Deserialize, Serialize};

use crate::evaluator::Outcome;
use crate::settings::EffectiveSettings;

/// How close a typed answer came.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Correct,
    Almost,
    Incorrect,
}

impl Verdict {
    /// "Almost" scores like a hinted answer.
    pub fn outcome(self) -> Outcome {
        match self {
            Self::Correct => Outcome::Correct,
            Self::Almost => Outcome::HintCorrect,
            Self::Incorrect => Outcome::Incorrect,
        }
    }
}

/// Similarity cut-offs. Scores strictly above `correct` pass, strictly
/// above `almost` are close, anything else fails.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FuzzyThresholds {
    pub correct: f64,
    pub almost: f64,
}

impl Default for FuzzyThresholds {
    fn default() -> Self {
        Self {
            correct: 0.7,
            almost: 0.3,
        }
    }
}

impl FuzzyThresholds {
    pub fn from_settings(settings: &EffectiveSettings) -> Self {
        Self {
            correct: settings.fuzzy_correct_threshold,
            almost: settings.fuzzy_almost_threshold,
        }
    }

    pub fn verdict(&self, similarity: f64) -> Verdict {
        if similarity > self.correct {
            Verdict::Correct
        } else if similarity > self.almost {
            Verdict::Almost
        } else {
            Verdict::Incorrect
        }
    }
}

/// Result of comparing a typed answer to the correct answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub verdict: Verdict,
    /// Similarity score between 0.0 and 1.0.
    pub similarity: f64,
    /// Normalized typed answer (for display).
    pub typed_normalized: String,
    /// Normalized correct answer (for display).
    pub correct_normalized: String,
}

impl MatchResult {
    pub fn is_exact(&self) -> bool {
        self.similarity >= 1.0
    }
}

/// Compare a typed answer to the correct answer, ignoring case and
/// surrounding/repeated whitespace.
pub fn compare_answers(typed: &str, correct: &str, thresholds: FuzzyThresholds) -> MatchResult {
    let typed_normalized = normalize_whitespace(typed);
    let correct_normalized = normalize_whitespace(correct);

    let similarity = normalized_similarity(
        &typed_normalized.to_lowercase(),
        &correct_normalized.to_lowercase(),
    );

    MatchResult {
        verdict: thresholds.verdict(similarity),
        similarity,
        typed_normalized,
        correct_normalized,
    }
}

/// Normalize whitespace in a string (trim and collapse multiple spaces).
fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Ratcliff/Obershelp similarity (0.0 to 1.0): twice the matched
/// characters over the combined length of both strings.
pub fn normalized_similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_characters(&a, &b) as f64 / total as f64
}

/// Characters matched by repeatedly taking the longest common run and
/// recursing on the pieces either side of it.
fn matching_characters(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];
    while let Some((a_lo, a_hi, b_lo, b_hi)) = pending.pop() {
        let (i, j, len) = longest_common_run(&a[a_lo..a_hi], &b[b_lo..b_hi]);
        if len == 0 {
            continue;
        }
        matched += len;
        let (i, j) = (a_lo + i, b_lo + j);
        pending.push((a_lo, i, b_lo, j));
        pending.push((i + len, a_hi, j + len, b_hi));
    }
    matched
}

/// Start in `a`, start in `b` and length of the longest common run. Ties go
/// to the run starting earliest in `a`.
fn longest_common_run(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    // run[j + 1]: length of the common run ending at a[i] and b[j]
    let mut prev = vec![0usize; b.len() + 1];
    let mut run = vec![0usize; b.len() + 1];
    for i in 0..a.len() {
        for j in 0..b.len() {
            run[j + 1] = if a[i] == b[j] { prev[j] + 1 } else { 0 };
            let len = run[j + 1];
            if len > best.2 {
                best = (i + 1 - len, j + 1 - len, len);
            }
        }
        std::mem::swap(&mut prev, &mut run);
    }
    best
}

/// Kind of a word in a diff.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiffType {
    /// In both answers.
    Same,
    /// Only in the correct answer.
    Added,
    /// Only in the typed answer.
    Removed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiffSegment {
    pub text: String,
    pub diff_type: DiffType,
}

impl DiffSegment {
    fn new(text: &str, diff_type: DiffType) -> Self {
        Self {
            text: text.to_string(),
            diff_type,
        }
    }
}

/// Word-level diff of a typed answer against the correct one, aligned on
/// the longest common subsequence of words. Case is ignored.
pub fn word_diff(typed: &str, correct: &str) -> Vec<DiffSegment> {
    let typed: Vec<&str> = typed.split_whitespace().collect();
    let correct: Vec<&str> = correct.split_whitespace().collect();
    let same = |a: &str, b: &str| a.to_lowercase() == b.to_lowercase();

    // common[i][j]: LCS length of typed[i..] and correct[j..]
    let mut common = vec![vec![0usize; correct.len() + 1]; typed.len() + 1];
    for i in (0..typed.len()).rev() {
        for j in (0..correct.len()).rev() {
            common[i][j] = if same(typed[i], correct[j]) {
                common[i + 1][j + 1] + 1
            } else {
                common[i + 1][j].max(common[i][j + 1])
            };
        }
    }

    let mut segments = Vec::with_capacity(typed.len().max(correct.len()));
    let (mut i, mut j) = (0, 0);
    while i < typed.len() && j < correct.len() {
        if same(typed[i], correct[j]) {
            segments.push(DiffSegment::new(typed[i], DiffType::Same));
            i += 1;
            j += 1;
        } else if common[i + 1][j] >= common[i][j + 1] {
            segments.push(DiffSegment::new(typed[i], DiffType::Removed));
            i += 1;
        } else {
            segments.push(DiffSegment::new(correct[j], DiffType::Added));
            j += 1;
        }
    }
    segments.extend(typed[i..].iter().map(|w| DiffSegment::new(w, DiffType::Removed)));
    segments.extend(correct[j..].iter().map(|w| DiffSegment::new(w, DiffType::Added)));
    segments
}
