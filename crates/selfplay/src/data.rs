use newcular_core::{Move, Outcome};

/// Training example for the policy/value network
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingExample {
    /// Board representation oriented for the side to move (7*9*7 = 441 elements)
    pub state: Vec<f32>,
    /// Target policy over the oriented action space (3969 elements)
    pub policy: Vec<f32>,
    /// Final outcome from the side to move's perspective (-1.0, 0.0 or 1.0)
    pub value: f32,
}

impl TrainingExample {
    /// Create a new training example
    pub fn new(state: Vec<f32>, policy: Vec<f32>, value: f32) -> Self {
        Self {
            state,
            policy,
            value,
        }
    }
}

/// Record of a single finished game
#[derive(Debug, Clone)]
pub struct GameRecord {
    /// Moves actually played
    pub moves: Vec<Move>,
    /// How the game ended
    pub outcome: Outcome,
    /// Whether the outcome was imposed by the ply cap
    pub adjudicated: bool,
    /// One finalized example per ply
    pub examples: Vec<TrainingExample>,
}

impl GameRecord {
    /// Get the number of plies in this game
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    /// Check if the record is empty
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }
}
