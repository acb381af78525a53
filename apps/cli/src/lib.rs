//! Terminal study tool on top of `flashcard-core`.

pub mod config;
pub mod csv_store;
pub mod terminal;

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use flashcard_core::{DeckStore, SessionOrchestrator, SessionOutcome, SessionSummary};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::StudyConfig;
use crate::csv_store::CsvDeckStore;
use crate::terminal::{ReportSink, TerminalPresenter};

#[derive(Debug, Parser)]
#[command(name = "study", about = "Adaptive flashcard study sessions")]
#[command(version)]
pub struct Args {
    /// Deck CSV file
    pub deck: PathBuf,

    /// Config file (defaults to the platform config directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Copy this CSV to the deck path if the deck doesn't exist
    #[arg(short, long)]
    pub template: Option<PathBuf>,

    /// Seed for reproducible shuffles
    #[arg(long)]
    pub seed: Option<u64>,

    /// Write the session summary as JSON
    #[arg(long)]
    pub summary_json: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Machine-readable end-of-session report.
#[derive(Debug, Serialize)]
pub struct SessionReport<'a> {
    pub deck: &'a Path,
    pub outcome: SessionOutcome,
    pub summary: Option<SessionSummary>,
}

pub fn run(args: Args) -> Result<()> {
    let default_filter = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let config = StudyConfig::load(args.config.as_deref())?;
    let settings = config.effective_for(&args.deck);
    tracing::debug!(?settings, "Effective settings");

    let store = CsvDeckStore::new(&args.deck);
    if let Some(template) = &args.template {
        if store.create_from_template(template)? {
            println!(
                "Created {} from {}",
                args.deck.display(),
                template.display()
            );
        }
    }

    let deck = store
        .load()
        .with_context(|| format!("failed to load deck {}", args.deck.display()))?;

    let rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut session = SessionOrchestrator::new(deck, settings, rng);
    let mut presenter = TerminalPresenter::new(io::stdin().lock(), io::stdout());
    let mut sink = ReportSink::new(io::stdout());

    let outcome = session.run(&store, &mut presenter, &mut sink)?;
    match outcome {
        SessionOutcome::Completed => println!("Session complete. Progress saved."),
        SessionOutcome::Cancelled => println!("\nSession stopped early. Progress saved."),
        SessionOutcome::NothingToStudy => {
            println!("No cards to study in {}", args.deck.display())
        }
    }

    if let Some(path) = &args.summary_json {
        write_summary(path, &args.deck, outcome, session.statistics().summary())?;
    }

    Ok(())
}

fn write_summary(
    path: &Path,
    deck: &Path,
    outcome: SessionOutcome,
    summary: Option<SessionSummary>,
) -> Result<()> {
    let report = SessionReport {
        deck,
        outcome,
        summary,
    };
    let json = serde_json::to_string_pretty(&report)?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write summary {}", path.display()))?;
    tracing::info!(path = %path.display(), "Wrote session summary");
    Ok(())
}
