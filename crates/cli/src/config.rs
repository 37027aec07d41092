//! Configuration for the self-play binary
//!
//! Loaded from `newcular.toml`, then `NEWCULAR_<SECTION>_<KEY>` environment
//! overrides, then command-line flags (applied by `main`).

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use newcular_selfplay::SelfPlayConfig;
use serde::{Deserialize, Serialize};

/// Standard locations to search for newcular.toml
pub const CONFIG_SEARCH_PATHS: &[&str] = &["newcular.toml", "../newcular.toml"];

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "NEWCULAR_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct NewcularConfig {
    pub rules: RulesConfig,
    pub selfplay: SelfPlayConfig,
    pub run: RunConfig,
}

/// Where the rules service lives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8181".into(),
            timeout_secs: 10,
        }
    }
}

/// How many games to play and where the results go
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub games: usize,
    pub workers: usize,
    /// Base path of the NPY output files
    pub output: String,
    pub log_level: String,
    /// TorchScript model; uniform priors when unset
    pub model: Option<String>,
    /// Cancel outstanding games after this many seconds
    pub max_duration_secs: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            games: 1,
            workers: 1,
            output: "selfplay_data".into(),
            log_level: "info".into(),
            model: None,
            max_duration_secs: None,
        }
    }
}

impl NewcularConfig {
    pub fn validate(&self) -> Result<()> {
        self.selfplay.validate()?;

        if self.rules.base_url.trim().is_empty() {
            bail!("rules.base_url must not be empty");
        }
        if self.rules.timeout_secs == 0 {
            bail!("rules.timeout_secs must be positive");
        }
        if self.run.games == 0 {
            bail!("run.games must be positive");
        }
        if self.run.workers == 0 {
            bail!("run.workers must be positive");
        }
        if self.run.output.is_empty() {
            bail!("run.output must not be empty");
        }
        Ok(())
    }
}

/// Load the configuration and report which file it came from.
///
/// Searches in the following order:
/// 1. `explicit` (the `--config` flag)
/// 2. Path in the NEWCULAR_CONFIG environment variable
/// 3. newcular.toml in the current or parent directory
///
/// Without any file the built-in defaults are used. Environment overrides
/// are applied in every case.
pub fn load_config(explicit: Option<&Path>) -> Result<(NewcularConfig, Option<PathBuf>)> {
    let env_path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);

    let source = match explicit.map(Path::to_path_buf).or(env_path) {
        Some(path) => {
            if !path.exists() {
                bail!("config file {} not found", path.display());
            }
            Some(path)
        }
        None => CONFIG_SEARCH_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|p| p.exists()),
    };

    let config = match &source {
        Some(path) => load_from_path(path)?,
        None => NewcularConfig::default(),
    };

    Ok((apply_env_overrides(config, |key| std::env::var(key).ok()), source))
}

/// Load configuration from a specific path, without env overrides.
pub fn load_from_path(path: &Path) -> Result<NewcularConfig> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

/// Macro to reduce env override boilerplate
macro_rules! env_override {
    // String field
    ($lookup:expr, $target:expr, $key:expr) => {
        if let Some(v) = $lookup($key) {
            $target = v;
        }
    };
    // Parseable field (u32, f32, etc.)
    ($lookup:expr, $target:expr, $key:expr, parse) => {
        if let Some(v) = $lookup($key).and_then(|s| s.parse().ok()) {
            $target = v;
        }
    };
    // Optional string field
    ($lookup:expr, $target:expr, $key:expr, optional) => {
        if let Some(v) = $lookup($key) {
            $target = Some(v);
        }
    };
    // Optional parseable field
    ($lookup:expr, $target:expr, $key:expr, optional_parse) => {
        if let Some(v) = $lookup($key).and_then(|s| s.parse().ok()) {
            $target = Some(v);
        }
    };
}

/// Apply environment overrides to a configuration.
///
/// Variables follow the pattern NEWCULAR_<SECTION>_<KEY>; search settings
/// use the MCTS section. Values that fail to parse are ignored.
pub fn apply_env_overrides<F>(mut config: NewcularConfig, lookup: F) -> NewcularConfig
where
    F: Fn(&str) -> Option<String>,
{
    // Rules
    env_override!(lookup, config.rules.base_url, "NEWCULAR_RULES_BASE_URL");
    env_override!(lookup, config.rules.timeout_secs, "NEWCULAR_RULES_TIMEOUT_SECS", parse);

    // Self-play
    let selfplay = &mut config.selfplay;
    env_override!(lookup, selfplay.cache_capacity, "NEWCULAR_SELFPLAY_CACHE_CAPACITY", parse);
    env_override!(lookup, selfplay.max_plies, "NEWCULAR_SELFPLAY_MAX_PLIES", optional_parse);
    env_override!(lookup, selfplay.seed, "NEWCULAR_SELFPLAY_SEED", optional_parse);

    // MCTS
    let mcts = &mut selfplay.mcts;
    env_override!(lookup, mcts.num_simulations, "NEWCULAR_MCTS_NUM_SIMULATIONS", parse);
    env_override!(lookup, mcts.c_puct, "NEWCULAR_MCTS_C_PUCT", parse);
    env_override!(lookup, mcts.temperature, "NEWCULAR_MCTS_TEMPERATURE", parse);
    env_override!(
        lookup,
        mcts.temperature_moves,
        "NEWCULAR_MCTS_TEMPERATURE_MOVES",
        optional_parse
    );
    env_override!(lookup, mcts.add_dirichlet_noise, "NEWCULAR_MCTS_ADD_DIRICHLET_NOISE", parse);
    env_override!(lookup, mcts.dirichlet_alpha, "NEWCULAR_MCTS_DIRICHLET_ALPHA", parse);
    env_override!(lookup, mcts.dirichlet_epsilon, "NEWCULAR_MCTS_DIRICHLET_EPSILON", parse);
    env_override!(lookup, mcts.batch_size, "NEWCULAR_MCTS_BATCH_SIZE", parse);
    env_override!(lookup, mcts.batch_timeout_ms, "NEWCULAR_MCTS_BATCH_TIMEOUT_MS", parse);

    // Run
    env_override!(lookup, config.run.games, "NEWCULAR_RUN_GAMES", parse);
    env_override!(lookup, config.run.workers, "NEWCULAR_RUN_WORKERS", parse);
    env_override!(lookup, config.run.output, "NEWCULAR_RUN_OUTPUT");
    env_override!(lookup, config.run.log_level, "NEWCULAR_RUN_LOG_LEVEL");
    env_override!(lookup, config.run.model, "NEWCULAR_RUN_MODEL", optional);
    env_override!(
        lookup,
        config.run.max_duration_secs,
        "NEWCULAR_RUN_MAX_DURATION_SECS",
        optional_parse
    );

    config
}
