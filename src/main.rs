use std::path::PathBuf;
use clap::Parser;
use lda_probs::{init_tracing, Run};

/// Prints the most likely topic of every document in an LDA model.
#[derive(Parser)]
#[command(name = "lda_probs", version, about)]
struct Cli {
    /// JSON file with the model locations
    #[arg(long)]
    config: PathBuf,

    /// Ignore the inference section of the config and load the estimated model
    #[arg(long)]
    estimator_only: bool,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    Run::run(&cli.config, cli.estimator_only)?;
    Ok(())
}
