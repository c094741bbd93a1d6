// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Everything the user touches: `clap` parses the arguments,
// the subcommand is routed to its Layer 2 use case, and the
// result is printed. No business logic lives here.
//
// Two commands:
//   `train`   — trains the model on .jsonl post streams
//   `predict` — loads a checkpoint and scores a ticker
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, PredictArgs, TrainArgs};

/// Top-level parser; clap derives the argument handling from
/// the field layout.
#[derive(Parser, Debug)]
#[command(
    name = "tweet-stock-han",
    version = "0.1.0",
    about = "Train a hierarchical attention model on daily post streams, then score tickers."
)]
pub struct Cli {
    /// The subcommand to run (train or predict)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Route the parsed subcommand to its use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)   => Self::run_train(args),
            Commands::Predict(args) => Self::run_predict(args),
        }
    }

    /// `train`: convert the args into a TrainConfig and hand off
    /// to Layer 2, so the application layer never sees clap types.
    fn run_train(args: TrainArgs) -> Result<()> {
        use crate::application::train_use_case::TrainUseCase;

        tracing::info!("Starting training on post streams in: {}", args.data_dir);

        let use_case = TrainUseCase::new(args.into());
        use_case.execute()?;

        println!("Training complete. Checkpoint saved.");
        Ok(())
    }

    /// `predict`: restore the checkpointed stack, score the
    /// ticker's latest window, print score and direction.
    fn run_predict(args: PredictArgs) -> Result<()> {
        use crate::application::predict_use_case::PredictUseCase;
        use crate::domain::traits::MovementScorer;

        let use_case = PredictUseCase::new(
            args.checkpoint_dir.clone(),
            args.data_dir.clone(),
        )?;

        let score = use_case.score(&args.ticker)?;

        let direction = if score > 0.0 {
            "UP"
        } else if score < 0.0 {
            "DOWN"
        } else {
            "FLAT"
        };
        println!(
            "\n{}: predicted movement {:+.5} ({})",
            args.ticker.to_uppercase(),
            score,
            direction,
        );
        Ok(())
    }
}
