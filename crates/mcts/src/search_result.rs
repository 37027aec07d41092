use newcular_core::Move;

/// Result of MCTS search
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// Move chosen for the side to move
    pub best_move: Move,

    /// Normalized root visit counts over the full oriented action space
    pub policy_distribution: Vec<f32>,

    /// Mean backed-up value at the root, from the side to move's perspective
    pub root_value: f32,

    /// Number of simulations that completed a backup
    pub num_simulations_run: u32,

    /// Visit counts for each legal move from root: (move, visit_count)
    pub root_visit_counts: Vec<(Move, u32)>,

    /// Root moves dropped because their expansion failed
    pub excluded_moves: Vec<Move>,

    /// Whether the search stopped early on cancellation
    pub cancelled: bool,
}

impl SearchResult {
    /// Get the visit count for a specific move
    pub fn visit_count_for_move(&self, mv: Move) -> u32 {
        self.root_visit_counts
            .iter()
            .find(|(m, _)| *m == mv)
            .map(|(_, v)| *v)
            .unwrap_or(0)
    }

    /// Get the total number of visits to root
    pub fn total_visits(&self) -> u32 {
        self.root_visit_counts.iter().map(|(_, v)| v).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visit_lookup() {
        let a: Move = "B2B3".parse().unwrap();
        let b: Move = "C2C3".parse().unwrap();
        let result = SearchResult {
            best_move: a,
            policy_distribution: Vec::new(),
            root_value: 0.0,
            num_simulations_run: 7,
            root_visit_counts: vec![(a, 5), (b, 2)],
            excluded_moves: Vec::new(),
            cancelled: false,
        };

        assert_eq!(result.visit_count_for_move(a), 5);
        assert_eq!(result.visit_count_for_move("A1A2".parse().unwrap()), 0);
        assert_eq!(result.total_visits(), 7);
    }
}
