use newcular_core::{BoardState, Outcome, Side};

use crate::data::TrainingExample;

struct PendingExample {
    state: Vec<f32>,
    policy: Vec<f32>,
    side: Side,
}

/// Collects one example per ply and fills in value targets once the game
/// outcome is known.
#[derive(Default)]
pub struct ExampleRecorder {
    pending: Vec<PendingExample>,
}

impl ExampleRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the position before a move together with its search policy
    pub fn record(&mut self, position: &BoardState, policy: Vec<f32>) {
        self.pending.push(PendingExample {
            state: position.oriented_representation(),
            policy,
            side: position.side_to_move(),
        });
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Attach the outcome, seen from each example's side to move
    pub fn finalize(self, outcome: Outcome) -> Vec<TrainingExample> {
        self.pending
            .into_iter()
            .map(|p| TrainingExample::new(p.state, p.policy, outcome.value_for(p.side)))
            .collect()
    }
}
