use std::fmt;

use crate::error::RulesError;
use crate::moves::{Move, COLS, ROWS};

/// Planes in the board representation: occupied, player one, bishop, king,
/// knight, pawn, rook.
pub const PLANES: usize = 7;

/// Length of a flattened (7, 9, 7) board representation.
pub const REPRESENTATION_LEN: usize = PLANES * ROWS * COLS;

const PLANE_LEN: usize = ROWS * COLS;
const OCCUPIED_PLANE: usize = 0;
const PLAYER_ONE_PLANE: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    PlayerOne,
    PlayerTwo,
}

impl Side {
    /// Side to move after `ply` moves have been played.
    pub fn to_move(ply: usize) -> Self {
        if ply % 2 == 0 {
            Side::PlayerOne
        } else {
            Side::PlayerTwo
        }
    }

    pub fn other(self) -> Self {
        match self {
            Side::PlayerOne => Side::PlayerTwo,
            Side::PlayerTwo => Side::PlayerOne,
        }
    }

    /// Wire ordinal used by the rules service (1 or 2).
    pub fn ord(self) -> i8 {
        match self {
            Side::PlayerOne => 1,
            Side::PlayerTwo => 2,
        }
    }

    /// Express a move from this side's point of view.
    pub fn orient_move(self, mv: Move) -> Move {
        match self {
            Side::PlayerOne => mv,
            Side::PlayerTwo => mv.invert(),
        }
    }

    /// Express a representation from this side's point of view.
    ///
    /// For player two every plane is row-reflected and the player-one plane
    /// is replaced by the mover's own pieces. Values past the last whole
    /// plane are copied unchanged.
    pub fn orient_representation(self, representation: &[f32]) -> Vec<f32> {
        match self {
            Side::PlayerOne => representation.to_vec(),
            Side::PlayerTwo => {
                let mut oriented = representation.to_vec();
                let planes = representation
                    .chunks_exact(PLANE_LEN)
                    .zip(oriented.chunks_exact_mut(PLANE_LEN));
                for (src, dst) in planes {
                    for (src_row, dst_row) in src
                        .chunks_exact(COLS)
                        .zip(dst.chunks_exact_mut(COLS).rev())
                    {
                        dst_row.copy_from_slice(src_row);
                    }
                }
                if oriented.len() >= (PLAYER_ONE_PLANE + 1) * PLANE_LEN {
                    for i in 0..PLANE_LEN {
                        let occupied = oriented[OCCUPIED_PLANE * PLANE_LEN + i] > 0.5;
                        let player_one = oriented[PLAYER_ONE_PLANE * PLANE_LEN + i] > 0.5;
                        oriented[PLAYER_ONE_PLANE * PLANE_LEN + i] =
                            if occupied && !player_one { 1.0 } else { 0.0 };
                    }
                }
                oriented
            }
        }
    }
}

/// How a finished game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Winner(Side),
    Draw,
}

impl Outcome {
    /// Signed result for `side`: +1 win, -1 loss, 0 draw.
    pub fn value_for(self, side: Side) -> f32 {
        match self {
            Outcome::Winner(winner) if winner == side => 1.0,
            Outcome::Winner(_) => -1.0,
            Outcome::Draw => 0.0,
        }
    }
}

/// Materialized position for one move history. Never mutated after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardState {
    history: Vec<Move>,
    legal_moves: Vec<Move>,
    representation: Vec<f32>,
    render: String,
    outcome: Option<Outcome>,
}

impl BoardState {
    /// Fails if `representation` is not a flattened (7, 9, 7) stack.
    pub fn new(
        history: Vec<Move>,
        legal_moves: Vec<Move>,
        representation: Vec<f32>,
        render: String,
        outcome: Option<Outcome>,
    ) -> Result<Self, RulesError> {
        if representation.len() != REPRESENTATION_LEN {
            return Err(RulesError::Malformed(format!(
                "representation has {} values, expected {REPRESENTATION_LEN}",
                representation.len()
            )));
        }
        Ok(Self {
            history,
            legal_moves,
            representation,
            render,
            outcome,
        })
    }

    pub fn history(&self) -> &[Move] {
        &self.history
    }

    pub fn legal_moves(&self) -> &[Move] {
        &self.legal_moves
    }

    pub fn representation(&self) -> &[f32] {
        &self.representation
    }

    pub fn render(&self) -> &str {
        &self.render
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn is_terminal(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn ply(&self) -> usize {
        self.history.len()
    }

    pub fn side_to_move(&self) -> Side {
        Side::to_move(self.ply())
    }

    /// Representation as seen by the side to move.
    pub fn oriented_representation(&self) -> Vec<f32> {
        self.side_to_move()
            .orient_representation(&self.representation)
    }

    /// History of the position reached by playing `mv` here.
    pub fn child_history(&self, mv: Move) -> Vec<Move> {
        let mut history = Vec::with_capacity(self.history.len() + 1);
        history.extend_from_slice(&self.history);
        history.push(mv);
        history
    }
}

impl fmt::Display for BoardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render)
    }
}
