// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
//   `train` — trains a model on a byte corpus and prints a
//             summary of why and when the run stopped
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "seqtrain",
    version,
    about = "Train small transformer sequence models with gradient accumulation and step profiling."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching use case; this layer only routes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args) => run_train(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on corpus: {}", args.data);

    let summary = TrainUseCase::new(args.into()).execute()?;

    println!(
        "Training stopped ({:?}): {} steps, {} tokens in {:.1}s",
        summary.stop_reason, summary.steps, summary.tokens, summary.elapsed_secs
    );
    Ok(())
}
