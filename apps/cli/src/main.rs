use clap::Parser;
use flashcard_study::Args;

fn main() -> anyhow::Result<()> {
    flashcard_study::run(Args::parse())
}
