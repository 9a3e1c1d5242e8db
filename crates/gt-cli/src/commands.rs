//! Command handlers

use anyhow::{anyhow, bail, Context};
use gt_core::{Combination, ObjectiveDirection, ParameterSpace, SearchSpace};
use gt_search::{
    reservoir_sample, reservoir_sample_seeded, top_n, CancellationToken, FailurePolicy,
    GridSearchTuner, ParameterGridExpander, TunerConfig,
};
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::process::Command as ProcessCommand;
use tracing::{debug, info, warn};

use crate::cli::{Cli, Command, ExpandArgs, SampleArgs, SearchArgs, SpaceArgs, TopArgs};

/// Environment variable carrying the combination to the scoring command.
pub const PARAMS_ENV: &str = "GRIDTUNE_PARAMS";

/// A record of the `top` command's input and output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredItem {
    pub item: serde_json::Value,
    pub score: f64,
}

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.command {
        Command::Expand(args) => expand(&args, &mut out),
        Command::Sample(args) => sample(&args, &mut out),
        Command::Top(args) => top(&args, &mut out),
        Command::Search(args) => search(&args, &mut out).await,
    }
}

pub fn expand(args: &ExpandArgs, out: &mut impl Write) -> anyhow::Result<()> {
    let space = load_space(&args.space, args.steps)?;
    let expander = ParameterGridExpander::new(&space);
    match expander.len() {
        Some(total) => info!("Expanding {} combinations", total),
        None => warn!("Parameter space is too large to count; printing until --limit"),
    }

    for combination in expander.iter().take(args.limit.unwrap_or(usize::MAX)) {
        serde_json::to_writer(&mut *out, &combination)?;
        writeln!(out)?;
    }
    Ok(())
}

pub fn sample(args: &SampleArgs, out: &mut impl Write) -> anyhow::Result<()> {
    let items: Vec<serde_json::Value> = serde_json::from_str(&read_input(&args.input)?)
        .context("sample input must be a JSON array")?;
    let seen = items.len();

    let picked = match args.seed {
        Some(seed) => reservoir_sample_seeded(items, args.k, seed),
        None => reservoir_sample(items, args.k, &mut rand::thread_rng()),
    };
    info!("Sampled {} of {} items", picked.len(), seen);

    serde_json::to_writer_pretty(&mut *out, &picked)?;
    writeln!(out)?;
    Ok(())
}

pub fn top(args: &TopArgs, out: &mut impl Write) -> anyhow::Result<()> {
    let records: Vec<ScoredItem> = serde_json::from_str(&read_input(&args.input)?)
        .context("top input must be a JSON array of {\"item\", \"score\"} records")?;
    let (items, scores): (Vec<_>, Vec<_>) =
        records.into_iter().map(|r| (r.item, r.score)).unzip();

    let ranked: Vec<ScoredItem> = top_n(items, &scores, args.n)?
        .into_iter()
        .map(|(item, score)| ScoredItem { item, score })
        .collect();

    serde_json::to_writer_pretty(&mut *out, &ranked)?;
    writeln!(out)?;
    Ok(())
}

pub async fn search(args: &SearchArgs, out: &mut impl Write) -> anyhow::Result<()> {
    let config = build_config(args)?;
    let space = load_space(&args.space, config.grid_steps)?;

    let token = CancellationToken::new();
    let on_interrupt = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, waiting for running commands to finish");
            on_interrupt.cancel();
        }
    });

    let tuner = GridSearchTuner::new(config).with_cancellation(token);
    let command: Arc<str> = Arc::from(args.command.as_str());
    let status = tuner
        .search_concurrent(&space, move |combination| {
            let command = Arc::clone(&command);
            async move { run_scorer(&command, &combination).await }
        })
        .await?;

    serde_json::to_writer_pretty(&mut *out, &status)?;
    writeln!(out)?;
    Ok(())
}

fn build_config(args: &SearchArgs) -> anyhow::Result<TunerConfig> {
    let mut config = match &args.config {
        Some(path) => TunerConfig::from_json_str(&read_input(path)?)
            .with_context(|| format!("loading {}", path.display()))?,
        None => TunerConfig::new("gridtune"),
    };

    if let Some(n) = args.top {
        config.keep_top = Some(n);
    }
    if let Some(n) = args.workers {
        config.workers = n;
    }
    if let Some(n) = args.max_trials {
        config.max_trials = Some(n);
    }
    if args.skip_failures {
        config.failure_policy = FailurePolicy::Skip;
    }
    if args.minimize {
        config.direction = ObjectiveDirection::Minimize;
    }

    config.validate()?;
    Ok(config)
}

fn load_space(args: &SpaceArgs, steps: usize) -> anyhow::Result<ParameterSpace> {
    let text = read_input(&args.space)?;
    if args.ranges {
        let ranges: SearchSpace =
            serde_json::from_str(&text).context("malformed range definitions")?;
        Ok(ranges.discretize(steps)?)
    } else {
        Ok(ParameterSpace::from_json_str(&text)?)
    }
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text).context("reading stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

/// Run the scoring command for one combination and parse its last
/// non-empty stdout line as the score.
async fn run_scorer(command: &str, combination: &Combination) -> anyhow::Result<f64> {
    let params = serde_json::to_string(combination)?;
    debug!("Scoring {}", params);

    let mut child = ProcessCommand::new("sh")
        .arg("-c")
        .arg(command)
        .env(PARAMS_ENV, &params)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("spawning `{command}`"))?;

    if let Some(mut stdin) = child.stdin.take() {
        // Commands that ignore stdin may exit before reading it.
        if let Err(e) = stdin.write_all(params.as_bytes()).await {
            if e.kind() != io::ErrorKind::BrokenPipe {
                return Err(e.into());
            }
        }
    }

    let output = child.wait_with_output().await?;
    if !output.status.success() {
        bail!("`{command}` exited with {}", output.status);
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .ok_or_else(|| anyhow!("`{command}` printed no score"))?;
    line.parse::<f64>()
        .with_context(|| format!("`{command}` printed {line:?}, expected a number"))
}
