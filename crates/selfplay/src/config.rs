use newcular_mcts::MctsConfig;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SelfPlayError};

/// Configuration for self-play games
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelfPlayConfig {
    /// Search settings used for every move
    pub mcts: MctsConfig,

    /// Maximum number of board snapshots kept by the shared cache
    pub cache_capacity: usize,

    /// Games reaching this many plies end as a draw (None = no cap)
    pub max_plies: Option<usize>,

    /// Base seed; game `i` uses `seed + i`. None seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for SelfPlayConfig {
    fn default() -> Self {
        Self {
            mcts: MctsConfig::default()
                .with_temperature(1.0)
                .with_dirichlet_noise(0.3, 0.25),
            cache_capacity: 100_000,
            max_plies: Some(512),
            seed: None,
        }
    }
}

impl SelfPlayConfig {
    pub fn with_mcts(mut self, mcts: MctsConfig) -> Self {
        self.mcts = mcts;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn with_max_plies(mut self, max_plies: Option<usize>) -> Self {
        self.max_plies = max_plies;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.mcts
            .validate()
            .map_err(|e| SelfPlayError::InvalidConfig(e.to_string()))?;

        if self.cache_capacity == 0 {
            return Err(SelfPlayError::InvalidConfig(
                "cache_capacity must be positive".into(),
            ));
        }
        if self.max_plies == Some(0) {
            return Err(SelfPlayError::InvalidConfig(
                "max_plies must be positive when set".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(SelfPlayConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let config = SelfPlayConfig::default().with_cache_capacity(0);
        assert!(matches!(
            config.validate(),
            Err(SelfPlayError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_invalid_search_settings() {
        let config =
            SelfPlayConfig::default().with_mcts(MctsConfig::default().with_simulations(0));
        assert!(config.validate().is_err());

        let config = SelfPlayConfig::default().with_max_plies(Some(0));
        assert!(config.validate().is_err());
    }
}
