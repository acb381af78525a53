//! Line-oriented terminal front end.
//!
//! Every prompt reads one line. `:q` or end of input cancels the session
//! from any prompt. A bare `q` also cancels, except where the learner types
//! a free-text answer and `q` may be the answer itself.

mod report;

pub use report::ReportSink;

use std::io::{BufRead, Write};
use std::time::Instant;

use flashcard_core::evaluator::parse_selection;
use flashcard_core::{
    word_diff, BatchPlan, Card, CardContent, ChoiceQuestion, ContinueChoice, DiffType, Direction,
    MatchResult, MultiAnswer, Outcome, Phase, PresentationMode, Presenter, PromptRequest,
    PromptResult, Question, Result, ReviewPrompt, TypedQuestion, Verdict,
};

const RULE: &str = "--------------------------------------------------";
const DOUBLE_RULE: &str = "========================================";

enum Line {
    Text(String),
    Cancel,
}

/// Field labels for a card family.
struct Labels {
    front: &'static str,
    back: &'static str,
    note: &'static str,
}

impl Labels {
    fn for_card(card: &Card) -> Self {
        match card.content {
            CardContent::Vocabulary(_) => Self {
                front: "Term",
                back: "Definition",
                note: "Formula",
            },
            CardContent::Mcq(_) => Self {
                front: "Question",
                back: "Answer",
                note: "Explanation",
            },
        }
    }
}

/// [`Presenter`] reading answers from `input` and writing prompts to `output`.
pub struct TerminalPresenter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> TerminalPresenter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn read_line(&mut self) -> Result<Line> {
        Ok(match self.read_answer()? {
            Line::Text(text) if text.eq_ignore_ascii_case("q") => Line::Cancel,
            line => line,
        })
    }

    /// Like `read_line`, but only `:q` cancels.
    fn read_answer(&mut self) -> Result<Line> {
        self.output.flush()?;
        let mut buf = String::new();
        if self.input.read_line(&mut buf)? == 0 {
            return Ok(Line::Cancel);
        }

        let text = buf.trim();
        if text == ":q" {
            return Ok(Line::Cancel);
        }
        Ok(Line::Text(text.to_string()))
    }

    fn show_review(&mut self, labels: &Labels, prompt: &ReviewPrompt) -> Result<()> {
        writeln!(self.output, "{}: {}", labels.front, prompt.front)?;
        writeln!(self.output, "{}: {}", labels.back, prompt.back)?;
        if let Some(note) = &prompt.note {
            writeln!(self.output, "{}: {}", labels.note, note)?;
        }
        writeln!(self.output)?;
        Ok(())
    }

    fn review(&mut self, card: &Card, prompt: &ReviewPrompt) -> Result<PromptResult> {
        let labels = Labels::for_card(card);
        self.show_review(&labels, prompt)?;

        loop {
            writeln!(
                self.output,
                "Press Enter to continue, 'r' to repeat, or 'q' to stop:"
            )?;
            match self.read_line()? {
                Line::Cancel => return Ok(PromptResult::Cancelled),
                Line::Text(text) if text.is_empty() => {
                    writeln!(self.output, "✓ Reviewed!")?;
                    return Ok(PromptResult::Answered {
                        outcome: Outcome::Correct,
                        elapsed_secs: None,
                    });
                }
                Line::Text(text) if text.eq_ignore_ascii_case("r") => {
                    writeln!(self.output, "{DOUBLE_RULE}")?;
                    self.show_review(&labels, prompt)?;
                    writeln!(self.output, "{DOUBLE_RULE}")?;
                }
                Line::Text(_) => writeln!(self.output, "Invalid input.")?,
            }
        }
    }

    fn show_options(&mut self, question: &ChoiceQuestion) -> Result<()> {
        for (number, option) in question.visible_options() {
            writeln!(self.output, "{number}. {}", option.text)?;
        }
        Ok(())
    }

    fn choice(
        &mut self,
        request: &PromptRequest<'_>,
        question: &mut ChoiceQuestion,
    ) -> Result<PromptResult> {
        let (label, instruction) = match request.mode {
            PresentationMode::VocabularyChoice(Direction::TermToDefinition) => {
                ("Term", Some("Choose the correct definition:"))
            }
            PresentationMode::VocabularyChoice(Direction::DefinitionToTerm) => {
                ("Definition", Some("Choose the correct term:"))
            }
            _ => ("Question", None),
        };

        writeln!(self.output, "{label}: {}", question.prompt())?;
        if let Some(note) = question.note() {
            writeln!(self.output, "Formula: {note}")?;
        }
        if let Some(instruction) = instruction {
            writeln!(self.output, "{instruction}")?;
        }
        self.show_options(question)?;

        let mut started = Instant::now();
        loop {
            let hint = if question.hint_available() {
                ", 'h' for hint"
            } else {
                ""
            };
            if question.is_multi() {
                writeln!(
                    self.output,
                    "Select all that apply (e.g. 1,3){hint}, or 'q' to stop:"
                )?;
            } else {
                writeln!(
                    self.output,
                    "Enter choice (1-{}){hint}, or 'q' to stop:",
                    question.option_count()
                )?;
            }

            let text = match self.read_line()? {
                Line::Cancel => return Ok(PromptResult::Cancelled),
                Line::Text(text) => text,
            };

            if text.eq_ignore_ascii_case("h") {
                match question.use_hint() {
                    Ok(_) => {
                        writeln!(self.output, "\nHint used! Here are the remaining options:")?;
                        self.show_options(question)?;
                        started = Instant::now();
                    }
                    Err(err) => writeln!(self.output, "{err}")?,
                }
                continue;
            }

            let numbers = match parse_selection(&text) {
                Ok(numbers) => numbers,
                Err(err) => {
                    writeln!(self.output, "{err}")?;
                    continue;
                }
            };

            let outcome = if question.is_multi() {
                match question.answer_many(&numbers) {
                    Ok(answer) => {
                        self.show_multi_feedback(question, &answer)?;
                        answer.outcome
                    }
                    Err(err) => {
                        writeln!(self.output, "{err}")?;
                        continue;
                    }
                }
            } else {
                let &[number] = numbers.as_slice() else {
                    writeln!(self.output, "Enter a single option number.")?;
                    continue;
                };
                match question.answer(number) {
                    Ok(outcome) => {
                        self.show_single_feedback(question, number, outcome)?;
                        outcome
                    }
                    Err(err) => {
                        writeln!(self.output, "{err}")?;
                        continue;
                    }
                }
            };

            let elapsed_secs = started.elapsed().as_secs_f64();
            if let CardContent::Mcq(mcq) = &request.card.content {
                if let Some(explanation) = mcq.explanation() {
                    writeln!(self.output, "Explanation: {explanation}")?;
                }
            }
            return Ok(PromptResult::Answered {
                outcome,
                elapsed_secs: Some(elapsed_secs),
            });
        }
    }

    fn option_text<'q>(question: &'q ChoiceQuestion, number: usize) -> &'q str {
        question.option(number).map(|o| o.text.as_str()).unwrap_or("")
    }

    fn show_single_feedback(
        &mut self,
        question: &ChoiceQuestion,
        number: usize,
        outcome: Outcome,
    ) -> Result<()> {
        let selected = Self::option_text(question, number);
        match outcome {
            Outcome::Correct => writeln!(self.output, "✓ Correct: {number}. {selected}")?,
            Outcome::HintCorrect => {
                writeln!(self.output, "✓ Correct (with hint): {number}. {selected}")?
            }
            _ => {
                writeln!(self.output, "✗ Incorrect! You selected: {number}. {selected}")?;
                for correct in question.correct_numbers() {
                    writeln!(
                        self.output,
                        "The correct answer was: {correct}. {}",
                        Self::option_text(question, correct)
                    )?;
                }
            }
        }
        Ok(())
    }

    fn show_multi_feedback(&mut self, question: &ChoiceQuestion, answer: &MultiAnswer) -> Result<()> {
        match answer.outcome {
            Outcome::Correct => writeln!(self.output, "✓ All correct!")?,
            Outcome::HintCorrect => writeln!(self.output, "✓ All correct (with hint)!")?,
            Outcome::Partial(score) => writeln!(
                self.output,
                "◐ Partially correct ({:.0}% credit)",
                score * 100.0
            )?,
            Outcome::Incorrect => writeln!(self.output, "✗ Incorrect!")?,
        }

        if answer.partial.is_perfect {
            return Ok(());
        }
        let groups = [
            ("Correctly selected", &answer.partial.correctly_selected),
            ("Wrongly selected", &answer.partial.wrongly_selected),
            ("Missed", &answer.partial.missed),
        ];
        for (label, numbers) in groups {
            if numbers.is_empty() {
                continue;
            }
            writeln!(self.output, "{label}:")?;
            for &number in numbers {
                writeln!(self.output, "  {number}. {}", Self::option_text(question, number))?;
            }
        }
        Ok(())
    }

    fn typed(&mut self, question: &TypedQuestion) -> Result<PromptResult> {
        let (shown, asked) = match question.direction() {
            Direction::TermToDefinition => ("Term", "definition"),
            Direction::DefinitionToTerm => ("Definition", "term"),
        };
        writeln!(self.output, "{shown}: {}", question.prompt())?;
        if let Some(note) = question.note() {
            writeln!(self.output, "Formula: {note}")?;
        }

        let started = Instant::now();
        loop {
            writeln!(self.output, "Type the {asked}, or ':q' to stop:")?;
            let text = match self.read_answer()? {
                Line::Cancel => return Ok(PromptResult::Cancelled),
                Line::Text(text) => text,
            };

            match question.answer(&text) {
                Ok(result) => {
                    let elapsed_secs = started.elapsed().as_secs_f64();
                    self.show_match(&result, &text, question.expected())?;
                    return Ok(PromptResult::Answered {
                        outcome: result.verdict.outcome(),
                        elapsed_secs: Some(elapsed_secs),
                    });
                }
                Err(err) => writeln!(self.output, "{err}")?,
            }
        }
    }

    fn show_match(&mut self, result: &MatchResult, typed: &str, expected: &str) -> Result<()> {
        let percent = result.similarity * 100.0;
        match result.verdict {
            Verdict::Correct if result.is_exact() => writeln!(self.output, "✓ Correct!")?,
            Verdict::Correct => writeln!(
                self.output,
                "✓ Correct ({percent:.0}% match). The answer was: {expected}"
            )?,
            Verdict::Almost => writeln!(
                self.output,
                "≈ Almost ({percent:.0}% match). The answer was: {expected}"
            )?,
            Verdict::Incorrect => {
                writeln!(self.output, "✗ Incorrect. The answer was: {expected}")?
            }
        }

        if !result.is_exact() {
            writeln!(self.output, "Diff: {}", render_diff(typed, expected))?;
        }
        Ok(())
    }

    fn write_or_warn(&mut self, text: std::fmt::Arguments<'_>) {
        if let Err(err) = writeln!(self.output, "{text}") {
            tracing::warn!(error = %err, "Failed to write to terminal");
        }
    }
}

/// Word diff with removed words as `[-word-]` and missing ones as `{+word+}`.
pub fn render_diff(typed: &str, expected: &str) -> String {
    word_diff(typed, expected)
        .into_iter()
        .map(|segment| match segment.diff_type {
            DiffType::Same => segment.text,
            DiffType::Removed => format!("[-{}-]", segment.text),
            DiffType::Added => format!("{{+{}+}}", segment.text),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

impl<R: BufRead, W: Write> Presenter for TerminalPresenter<R, W> {
    fn present(
        &mut self,
        request: &PromptRequest<'_>,
        question: &mut Question,
    ) -> Result<PromptResult> {
        writeln!(self.output, "{RULE}")?;
        writeln!(
            self.output,
            "Card {}/{}  [STAGE {} - {}]",
            request.position,
            request.batch_len,
            request.stage.number(),
            request.stage.label().to_uppercase()
        )?;

        match question {
            Question::Review(prompt) => self.review(request.card, prompt),
            Question::Choice(choice) => self.choice(request, choice),
            Question::Typed(typed) => self.typed(typed),
        }
    }

    fn continue_review(&mut self) -> Result<ContinueChoice> {
        writeln!(self.output, "\nSet completed!")?;
        writeln!(self.output, "Continue with another randomized set? (y/n):")?;
        Ok(match self.read_line()? {
            Line::Cancel => ContinueChoice::Cancel,
            Line::Text(text) if matches!(text.to_lowercase().as_str(), "y" | "yes") => {
                ContinueChoice::Continue
            }
            Line::Text(_) => ContinueChoice::Stop,
        })
    }

    fn phase_started(&mut self, phase: Phase) {
        let title = match phase {
            Phase::InitialReview => "INITIAL REVIEW",
            Phase::RandomizedReview => "RANDOMIZED REVIEW",
        };
        self.write_or_warn(format_args!("\n{DOUBLE_RULE}\n{title}\n{DOUBLE_RULE}"));
    }

    fn batch_started(&mut self, plan: &BatchPlan) {
        match plan.phase {
            Phase::InitialReview => self.write_or_warn(format_args!(
                "\nReview set: {} cards, each shown twice ({} carried forward)",
                plan.cards, plan.carried_forward
            )),
            Phase::RandomizedReview => {
                let fresh = plan
                    .cards
                    .saturating_sub(plan.hardest)
                    .saturating_sub(plan.recently_practiced);
                self.write_or_warn(format_args!(
                    "\nRandomized set: {} cards\n- New/unpracticed cards: {}\n- Recently practiced: {}\n- Most difficult cards included: {}",
                    plan.cards, fresh, plan.recently_practiced, plan.hardest
                ));
            }
        }
    }
}
