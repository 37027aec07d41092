//! Self-play training data generation for newcular
//!
//! This crate provides functionality for:
//! - Playing self-play games using MCTS
//! - Recording positions and search policies
//! - Back-filling value targets once a game ends
//! - Running many games concurrently over one shared board cache
//! - Saving training data to NPY files for Python/PyTorch
//!
//! # Example
//!
//! ```no_run
//! use newcular_core::{BoardCache, HttpRulesService};
//! use newcular_mcts::UniformEvaluator;
//! use newcular_selfplay::{play_game, save_training_data, SelfPlayConfig};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha20Rng;
//! use std::time::Duration;
//!
//! # fn main() -> anyhow::Result<()> {
//! let rules = HttpRulesService::new("http://localhost:8181", Duration::from_secs(5))?;
//! let config = SelfPlayConfig::default().with_seed(1);
//! let cache = BoardCache::new(rules, config.cache_capacity);
//!
//! let mut rng = ChaCha20Rng::seed_from_u64(1);
//! let record = play_game(&cache, &UniformEvaluator, &config, &mut rng, None)?;
//! println!("Game finished after {} plies", record.len());
//!
//! save_training_data(&record.examples, "selfplay_data")?;
//! # Ok(())
//! # }
//! ```

mod config;
mod data;
mod error;
mod game;
mod recorder;
mod runner;
pub mod storage;

// Re-export public API
pub use config::SelfPlayConfig;
pub use data::{GameRecord, TrainingExample};
pub use error::{Result, SelfPlayError};
pub use game::play_game;
pub use recorder::ExampleRecorder;
pub use runner::{game_rng, run_games, RunSummary};
pub use storage::save_training_data;
