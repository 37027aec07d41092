//! newcular-selfplay - generate self-play training data
//!
//! Plays games against the newcular rules service with MCTS guided by an
//! evaluator, then writes the examples to `{output}_{states,policies,values}.npy`.

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use clap::Parser;
use newcular_core::{BoardCache, HttpRulesService};
use newcular_mcts::{BatchingEvaluator, CancelToken, Evaluator, UniformEvaluator};
use newcular_selfplay::{run_games, save_training_data, TrainingExample};
use tracing::{info, warn};

mod config;

use crate::config::{load_config, NewcularConfig};

#[derive(Parser, Debug)]
#[command(name = "newcular-selfplay")]
#[command(about = "Generate newcular self-play training data with MCTS")]
struct Cli {
    /// Config file (defaults to ./newcular.toml when present)
    #[arg(long, env = "NEWCULAR_CONFIG")]
    config: Option<PathBuf>,

    /// Base URL of the rules service
    #[arg(long)]
    rules_url: Option<String>,

    /// Number of games to play
    #[arg(short = 'n', long)]
    games: Option<usize>,

    /// Worker threads playing games concurrently
    #[arg(short, long)]
    workers: Option<usize>,

    /// MCTS simulations per move
    #[arg(short, long)]
    simulations: Option<u32>,

    /// PUCT exploration constant
    #[arg(long)]
    c_puct: Option<f32>,

    /// Move sampling temperature
    #[arg(long)]
    temperature: Option<f32>,

    /// Base RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// Adjudicate games as draws after this many plies
    #[arg(long)]
    max_plies: Option<usize>,

    /// Base path of the NPY output files
    #[arg(short, long)]
    output: Option<String>,

    /// TorchScript model (requires the `torch` feature)
    #[arg(long)]
    model: Option<String>,

    /// Stop outstanding games after this many seconds
    #[arg(long)]
    max_duration_secs: Option<u64>,

    /// Log level (RUST_LOG takes precedence)
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    /// Command-line flags take priority over file and environment settings
    fn apply(&self, config: &mut NewcularConfig) {
        if let Some(url) = &self.rules_url {
            config.rules.base_url = url.clone();
        }
        if let Some(games) = self.games {
            config.run.games = games;
        }
        if let Some(workers) = self.workers {
            config.run.workers = workers;
        }
        if let Some(simulations) = self.simulations {
            config.selfplay.mcts.num_simulations = simulations;
        }
        if let Some(c_puct) = self.c_puct {
            config.selfplay.mcts.c_puct = c_puct;
        }
        if let Some(temperature) = self.temperature {
            config.selfplay.mcts.temperature = temperature;
        }
        if let Some(seed) = self.seed {
            config.selfplay.seed = Some(seed);
        }
        if let Some(max_plies) = self.max_plies {
            config.selfplay.max_plies = Some(max_plies);
        }
        if let Some(output) = &self.output {
            config.run.output = output.clone();
        }
        if let Some(model) = &self.model {
            config.run.model = Some(model.clone());
        }
        if let Some(secs) = self.max_duration_secs {
            config.run.max_duration_secs = Some(secs);
        }
        if let Some(level) = &self.log_level {
            config.run.log_level = level.clone();
        }
    }
}

fn init_tracing(level: &str) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .try_init()?;

    Ok(())
}

#[cfg(feature = "torch")]
fn load_model(path: &str) -> Result<Box<dyn Evaluator>> {
    let device = tch::Device::cuda_if_available();
    info!(path, ?device, "loading TorchScript model");
    Ok(Box::new(newcular_mcts::TorchModel::load(path, device)?))
}

#[cfg(not(feature = "torch"))]
fn load_model(path: &str) -> Result<Box<dyn Evaluator>> {
    bail!("cannot load {path}: built without the `torch` feature")
}

fn build_evaluator(config: &NewcularConfig) -> Result<Box<dyn Evaluator>> {
    let evaluator = match &config.run.model {
        Some(path) => load_model(path)?,
        None => {
            warn!("no model configured, searching with uniform priors");
            Box::new(UniformEvaluator::new())
        }
    };

    let mcts = &config.selfplay.mcts;
    if mcts.batch_size > 1 && config.run.workers > 1 {
        info!(
            batch_size = mcts.batch_size,
            timeout_ms = mcts.batch_timeout_ms,
            "batching evaluations across workers"
        );
        return Ok(Box::new(BatchingEvaluator::new(
            evaluator,
            mcts.batch_size as usize,
            Duration::from_millis(mcts.batch_timeout_ms),
        )));
    }
    Ok(evaluator)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, source) = load_config(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;

    init_tracing(&config.run.log_level)?;
    match &source {
        Some(path) => info!(path = %path.display(), "loaded config"),
        None => info!("no config file found, using defaults"),
    }

    let rules = HttpRulesService::new(
        config.rules.base_url.as_str(),
        Duration::from_secs(config.rules.timeout_secs),
    )?;
    let cache = BoardCache::new(rules, config.selfplay.cache_capacity);
    let evaluator = build_evaluator(&config)?;

    let cancel = CancelToken::new();
    if let Some(secs) = config.run.max_duration_secs {
        let cancel = cancel.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_secs(secs));
            warn!(secs, "time limit reached, cancelling outstanding games");
            cancel.cancel();
        });
    }

    info!(
        games = config.run.games,
        workers = config.run.workers,
        simulations = config.selfplay.mcts.num_simulations,
        rules = %config.rules.base_url,
        "starting self-play"
    );

    let started = Instant::now();
    let summary = run_games(
        &cache,
        evaluator.as_ref(),
        &config.selfplay,
        config.run.games,
        config.run.workers,
        &cancel,
    );

    let stats = cache.stats();
    info!(
        finished = summary.records.len(),
        failed = summary.failed,
        cancelled = summary.cancelled,
        examples = summary.total_examples(),
        cache_hits = stats.hits,
        cache_misses = stats.misses,
        elapsed_secs = started.elapsed().as_secs_f64(),
        "self-play finished"
    );

    let examples: Vec<TrainingExample> = summary
        .records
        .into_iter()
        .flat_map(|record| record.examples)
        .collect();
    if examples.is_empty() {
        bail!("no game finished; nothing to save");
    }

    save_training_data(&examples, &config.run.output)?;
    info!(
        output = %config.run.output,
        examples = examples.len(),
        "training data saved"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_flags_override_config() {
        let cli = Cli::parse_from([
            "newcular-selfplay",
            "-n",
            "8",
            "--simulations",
            "50",
            "--rules-url",
            "http://rules:1234",
            "--seed",
            "3",
        ]);
        let mut config = NewcularConfig::default();
        cli.apply(&mut config);

        assert_eq!(config.run.games, 8);
        assert_eq!(config.selfplay.mcts.num_simulations, 50);
        assert_eq!(config.rules.base_url, "http://rules:1234");
        assert_eq!(config.selfplay.seed, Some(3));
        assert_eq!(config.run.workers, 1);
    }

    #[test]
    fn test_uniform_evaluator_without_model() {
        let config = NewcularConfig::default();
        assert!(build_evaluator(&config).is_ok());
    }
}
