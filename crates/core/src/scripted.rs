use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::board::{Outcome, PLANES};
use crate::error::RulesError;
use crate::moves::{format_history, Move, COLS, ROWS};
use crate::rules::{PlaneStack, RulesService, Summary};

/// Deterministic two-choice game: at every ply both moves lead on, and the
/// game ends with a fixed outcome after a fixed number of plies.
#[derive(Debug, Clone, Copy)]
struct LineGame {
    plies: usize,
    outcome: Outcome,
}

impl LineGame {
    fn moves_at(ply: usize) -> [Move; 2] {
        let row = ply % ROWS;
        [
            Move::decode(row, 0, row, 1).expect("line move is on the board"),
            Move::decode(row, 2, row, 3).expect("line move is on the board"),
        ]
    }

    fn summary(&self, history: &[Move]) -> Option<Summary> {
        let ply = history.len();
        if ply > self.plies {
            return None;
        }
        let followed_line = history
            .iter()
            .enumerate()
            .all(|(i, mv)| Self::moves_at(i).contains(mv));
        if !followed_line {
            return None;
        }

        let mut representation: PlaneStack = [[[0; COLS]; ROWS]; PLANES];
        representation[0][ply % ROWS][ply % COLS] = 1;

        if ply == self.plies {
            Some(ScriptedRules::position(&[], Some(self.outcome), representation))
        } else {
            Some(ScriptedRules::position(
                &Self::moves_at(ply),
                None,
                representation,
            ))
        }
    }
}

/// In-memory rules service driven by a fixed table of positions.
///
/// Useful offline and in tests: every query is counted, and individual
/// histories can be made to fail like an unreachable remote service.
#[derive(Debug, Default)]
pub struct ScriptedRules {
    positions: HashMap<Vec<Move>, Summary>,
    failing: HashSet<Vec<Move>>,
    line: Option<LineGame>,
    queries: AtomicUsize,
}

impl ScriptedRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// A game that always lasts exactly `plies` moves and ends with `outcome`.
    ///
    /// Each non-terminal position offers two legal moves.
    pub fn line(plies: usize, outcome: Outcome) -> Self {
        Self {
            line: Some(LineGame { plies, outcome }),
            ..Self::default()
        }
    }

    /// Legal moves of the line game at `ply`.
    pub fn line_moves(ply: usize) -> [Move; 2] {
        LineGame::moves_at(ply)
    }

    /// Build a summary for an arbitrary synthetic position.
    pub fn position(
        legal_moves: &[Move],
        outcome: Option<Outcome>,
        representation: PlaneStack,
    ) -> Summary {
        let winner = outcome.map(|o| match o {
            Outcome::Winner(side) => side.ord(),
            Outcome::Draw => 0,
        });
        Summary {
            valid_moves: legal_moves.iter().map(Move::to_string).collect(),
            render: format!("scripted position, {} legal moves", legal_moves.len()),
            winner,
            representation,
        }
    }

    /// Register (or override) the position reached by `history`.
    pub fn insert(&mut self, history: Vec<Move>, summary: Summary) {
        self.positions.insert(history, summary);
    }

    /// Make every query for `history` fail.
    pub fn fail_on(&mut self, history: Vec<Move>) {
        self.failing.insert(history);
    }

    /// Number of queries served so far, including failed ones.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

impl RulesService for ScriptedRules {
    fn summary(&self, history: &[Move]) -> Result<Summary, RulesError> {
        self.queries.fetch_add(1, Ordering::SeqCst);

        if self.failing.contains(history) {
            return Err(RulesError::Status {
                status: 503,
                body: "scripted failure".into(),
            });
        }

        if let Some(summary) = self.positions.get(history) {
            return Ok(summary.clone());
        }

        self.line
            .and_then(|line| line.summary(history))
            .ok_or_else(|| RulesError::UnknownPosition(format_history(history)))
    }
}
