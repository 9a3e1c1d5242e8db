//! Command-line argument types

use clap::{Args, Parser, Subcommand};
use std::ffi::OsString;
use std::path::PathBuf;

/// Grid search, top-N selection and reservoir sampling over JSON inputs
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "gridtune", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Print every combination of a parameter space, one JSON object per line
    Expand(ExpandArgs),

    /// Draw a uniform random sample from a JSON array
    Sample(SampleArgs),

    /// Keep the N highest-scoring records of a JSON array of {item, score}
    Top(TopArgs),

    /// Score every combination with an external command and report the best
    Search(SearchArgs),
}

/// How to read a parameter space file
#[derive(Args, Debug, Clone, PartialEq)]
pub struct SpaceArgs {
    /// Parameter space JSON (`-` for stdin)
    pub space: PathBuf,

    /// Treat the file as range definitions instead of candidate lists
    #[arg(long)]
    pub ranges: bool,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct ExpandArgs {
    #[command(flatten)]
    pub space: SpaceArgs,

    /// Stop after this many combinations
    #[arg(long)]
    pub limit: Option<usize>,

    /// Grid points per continuous range
    #[arg(long, default_value_t = 5)]
    pub steps: usize,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct SampleArgs {
    /// JSON array to sample from (`-` for stdin)
    pub input: PathBuf,

    /// Sample size
    #[arg(short)]
    pub k: usize,

    /// Seed for a reproducible sample
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct TopArgs {
    /// JSON array of {"item": ..., "score": number} (`-` for stdin)
    pub input: PathBuf,

    /// Number of records to keep
    #[arg(short)]
    pub n: usize,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct SearchArgs {
    #[command(flatten)]
    pub space: SpaceArgs,

    /// Shell command that prints a score for the combination on its stdin
    #[arg(long)]
    pub command: String,

    /// Tuner config JSON
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Also report this many best combinations
    #[arg(long)]
    pub top: Option<usize>,

    /// Commands to run at once
    #[arg(long)]
    pub workers: Option<usize>,

    /// Evaluate at most this many combinations
    #[arg(long)]
    pub max_trials: Option<usize>,

    /// Record failing combinations instead of aborting
    #[arg(long)]
    pub skip_failures: bool,

    /// Lower scores are better
    #[arg(long)]
    pub minimize: bool,
}

pub fn parse_args<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Cli::try_parse_from(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_expand() {
        let cli = parse_args(["gridtune", "expand", "space.json", "--limit", "3"]).unwrap();
        match cli.command {
            Command::Expand(args) => {
                assert_eq!(args.space.space, PathBuf::from("space.json"));
                assert!(!args.space.ranges);
                assert_eq!(args.limit, Some(3));
                assert_eq!(args.steps, 5);
            }
            other => panic!("Expected Expand command, got {other:?}"),
        }
    }

    #[test]
    fn parse_sample() {
        let cli = parse_args(["gridtune", "sample", "rows.json", "-k", "10", "--seed", "7"]).unwrap();
        match cli.command {
            Command::Sample(args) => {
                assert_eq!(args.k, 10);
                assert_eq!(args.seed, Some(7));
            }
            other => panic!("Expected Sample command, got {other:?}"),
        }
    }

    #[test]
    fn parse_top() {
        let cli = parse_args(["gridtune", "top", "-", "-n", "2"]).unwrap();
        assert!(matches!(cli.command, Command::Top(TopArgs { n: 2, .. })));
    }

    #[test]
    fn parse_search_flags() {
        let cli = parse_args([
            "gridtune",
            "search",
            "space.json",
            "--ranges",
            "--command",
            "python train.py",
            "--top",
            "5",
            "--workers",
            "2",
            "--skip-failures",
            "--minimize",
        ])
        .unwrap();
        match cli.command {
            Command::Search(args) => {
                assert!(args.space.ranges);
                assert_eq!(args.command, "python train.py");
                assert_eq!(args.top, Some(5));
                assert_eq!(args.workers, Some(2));
                assert!(args.skip_failures);
                assert!(args.minimize);
                assert!(args.config.is_none());
            }
            other => panic!("Expected Search command, got {other:?}"),
        }
    }

    #[test]
    fn search_requires_command() {
        assert!(parse_args(["gridtune", "search", "space.json"]).is_err());
    }

    #[test]
    fn negative_sample_size_is_rejected() {
        assert!(parse_args(["gridtune", "sample", "rows.json", "-k", "-1"]).is_err());
    }
}
