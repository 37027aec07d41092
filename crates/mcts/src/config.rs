use serde::{Deserialize, Serialize};

use crate::error::{MctsError, Result};

/// Configuration for MCTS search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MctsConfig {
    /// Number of simulations to run per move
    #[serde(alias = "simulations_per_move")]
    pub num_simulations: u32,

    /// Maximum number of leaf evaluations to batch per evaluator call
    pub batch_size: u32,

    /// Maximum time (ms) to wait before flushing a partial batch
    pub batch_timeout_ms: u64,

    /// PUCT exploration constant (typically 1.0-5.0)
    pub c_puct: f32,

    /// Whether to add Dirichlet noise to root (for self-play)
    pub add_dirichlet_noise: bool,

    /// Dirichlet alpha parameter
    pub dirichlet_alpha: f32,

    /// Dirichlet epsilon for mixing noise (typically 0.25)
    pub dirichlet_epsilon: f32,

    /// Temperature for move selection (1.0 = proportional to visits, 0.0 = argmax)
    pub temperature: f32,

    /// Plies played with `temperature` before switching to argmax (None = never switch)
    pub temperature_moves: Option<u32>,
}

impl MctsConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set number of simulations
    pub fn with_simulations(mut self, n: u32) -> Self {
        self.num_simulations = n;
        self
    }

    /// Set maximum batch size for evaluator calls
    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Set maximum wait time for forming a batch (milliseconds)
    pub fn with_batch_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.batch_timeout_ms = timeout_ms;
        self
    }

    /// Set PUCT exploration constant
    pub fn with_c_puct(mut self, c: f32) -> Self {
        self.c_puct = c;
        self
    }

    /// Set temperature for move selection
    pub fn with_temperature(mut self, t: f32) -> Self {
        self.temperature = t;
        self
    }

    /// Play greedily once `plies` moves have been made
    pub fn with_temperature_moves(mut self, plies: u32) -> Self {
        self.temperature_moves = Some(plies);
        self
    }

    /// Enable Dirichlet noise with given parameters
    pub fn with_dirichlet_noise(mut self, alpha: f32, epsilon: f32) -> Self {
        self.add_dirichlet_noise = true;
        self.dirichlet_alpha = alpha;
        self.dirichlet_epsilon = epsilon;
        self
    }

    /// Disable Dirichlet noise
    pub fn without_dirichlet_noise(mut self) -> Self {
        self.add_dirichlet_noise = false;
        self
    }

    /// Temperature in effect at `ply`
    pub fn temperature_at(&self, ply: usize) -> f32 {
        match self.temperature_moves {
            Some(limit) if ply >= limit as usize => 0.0,
            _ => self.temperature,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_simulations == 0 {
            return Err(MctsError::InvalidConfig(
                "num_simulations must be positive".into(),
            ));
        }
        if !(self.c_puct > 0.0) {
            return Err(MctsError::InvalidConfig(format!(
                "c_puct must be positive, got {}",
                self.c_puct
            )));
        }
        if !(self.temperature >= 0.0) {
            return Err(MctsError::InvalidConfig(format!(
                "temperature must be non-negative, got {}",
                self.temperature
            )));
        }
        if self.add_dirichlet_noise
            && (!(self.dirichlet_alpha > 0.0) || !(0.0..=1.0).contains(&self.dirichlet_epsilon))
        {
            return Err(MctsError::InvalidConfig(format!(
                "invalid Dirichlet parameters alpha={} epsilon={}",
                self.dirichlet_alpha, self.dirichlet_epsilon
            )));
        }
        Ok(())
    }
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            num_simulations: 800,
            batch_size: 1,
            batch_timeout_ms: 2,
            c_puct: 1.5,
            add_dirichlet_noise: false,
            dirichlet_alpha: 0.3,
            dirichlet_epsilon: 0.25,
            temperature: 1.0,
            temperature_moves: None,
        }
    }
}
