//! gridtune CLI
//!
//! # Usage
//!
//! ```bash
//! # List every combination of a parameter space
//! gridtune expand space.json
//!
//! # Reproducible sample of 100 rows
//! gridtune sample rows.json -k 100 --seed 7
//!
//! # Keep the five best {item, score} records
//! gridtune top scored.json -n 5
//!
//! # Score each combination with a training script, four at a time
//! gridtune search space.json --command "python train.py" --workers 4 --top 3
//! ```
//!
//! Log verbosity is read from `GRIDTUNE_LOG` (default `info`); logs go to
//! stderr so stdout stays machine-readable.

mod cli;
mod commands;

use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = match cli::parse_args(std::env::args_os()) {
        Ok(cli) => cli,
        Err(e) => e.exit(),
    };

    match commands::run_command(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("GRIDTUNE_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
