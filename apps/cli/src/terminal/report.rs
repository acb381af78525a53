//! Statistics rendering.

use std::io::{self, Write};

use flashcard_core::{
    BatchStatistics, SessionSummary, Stage, StageHistogram, StageTrend, StatisticsSink,
    TrendDirection,
};

const RULE: &str = "============================================================";

/// [`StatisticsSink`] that prints batch and session reports.
pub struct ReportSink<W> {
    output: W,
}

impl<W: Write> ReportSink<W> {
    pub fn new(output: W) -> Self {
        Self { output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn write_batch(&mut self, stats: &BatchStatistics, trend: Option<&StageTrend>) -> io::Result<()> {
        let out = &mut self.output;
        writeln!(out, "\n{RULE}")?;
        writeln!(out, "SET {} STATISTICS", stats.number)?;
        writeln!(out, "{RULE}")?;
        writeln!(out, "Set performance:")?;
        writeln!(out, "   Cards in set: {}", stats.total)?;
        writeln!(
            out,
            "   ✓ Correct: {} ({:.1}%)",
            stats.correct, stats.percent_correct
        )?;
        writeln!(
            out,
            "   ✗ Incorrect: {} ({:.1}%)",
            stats.incorrect, stats.percent_incorrect
        )?;
        if stats.hinted > 0 {
            writeln!(
                out,
                "   Correct with hint: {} ({:.1}%)",
                stats.hinted, stats.percent_with_hint
            )?;
        }

        writeln!(out, "\nDeck progress:")?;
        write_histogram(out, &stats.histogram)?;

        if let Some(trend) = trend {
            writeln!(out, "\nProgress trends:")?;
            for stage in Stage::ALL {
                let change = trend.delta(stage);
                let name = format!("Stage {} ({})", stage.number(), stage.label());
                match change {
                    0 => writeln!(out, "   {name}: no change")?,
                    c if c > 0 => writeln!(out, "   {name}: +{c} cards")?,
                    c => writeln!(out, "   {name}: {c} cards")?,
                }
            }
            let overall = match trend.direction {
                TrendDirection::Advancing => "advancing to higher stages",
                TrendDirection::Regressing => "some cards moved to lower stages",
                TrendDirection::Steady => "maintaining current level",
            };
            writeln!(out, "   Overall trend: {overall}")?;
        }

        writeln!(out, "{RULE}")?;
        out.flush()
    }

    fn write_summary(&mut self, summary: &SessionSummary) -> io::Result<()> {
        let out = &mut self.output;
        writeln!(out, "\n{RULE}")?;
        writeln!(out, "SESSION SUMMARY")?;
        writeln!(out, "{RULE}")?;
        writeln!(out, "Sets completed: {}", summary.batches)?;
        writeln!(out, "Cards practiced: {}", summary.cards_practiced)?;
        writeln!(out, "Overall accuracy: {:.1}%", summary.overall_accuracy)?;
        writeln!(out, "Hints used: {}", summary.hints_used)?;

        if let Some(delta) = summary.first_to_last_delta {
            writeln!(out, "\nProgress over time:")?;
            for (i, accuracy) in summary.batch_accuracies.iter().enumerate() {
                writeln!(out, "   Set {}: {accuracy:.1}% correct", i + 1)?;
            }
            if delta > 0.0 {
                writeln!(out, "   Improvement: +{delta:.1}% from first to last set")?;
            } else if delta < 0.0 {
                writeln!(out, "   Accuracy decreased by {:.1}%", -delta)?;
            } else {
                writeln!(out, "   Consistent performance maintained")?;
            }
        }

        writeln!(out, "\nFinal deck status:")?;
        write_histogram(out, &summary.final_histogram)?;
        writeln!(out, "{RULE}")?;
        out.flush()
    }
}

fn write_histogram<W: Write>(out: &mut W, histogram: &StageHistogram) -> io::Result<()> {
    writeln!(out, "   Cards in deck: {}", histogram.total())?;
    for (stage, count) in histogram.iter() {
        writeln!(
            out,
            "   Stage {} ({}): {} cards ({:.1}%)",
            stage.number(),
            stage.label(),
            count,
            histogram.percentage(stage)
        )?;
    }
    Ok(())
}

impl<W: Write> StatisticsSink for ReportSink<W> {
    fn batch_completed(&mut self, stats: &BatchStatistics, trend: Option<&StageTrend>) {
        if let Err(err) = self.write_batch(stats, trend) {
            tracing::warn!(error = %err, "Failed to write batch statistics");
        }
    }

    fn session_completed(&mut self, summary: &SessionSummary) {
        if let Err(err) = self.write_summary(summary) {
            tracing::warn!(error = %err, "Failed to write session summary");
        }
    }
}
