use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::board::{BoardState, Outcome, Side, PLANES};
use crate::error::RulesError;
use crate::moves::{format_history, Move, COLS, ROWS};

/// Per-plane 0/1 board layout as served by the rules service.
pub type PlaneStack = [[[u8; COLS]; ROWS]; PLANES];

/// Source of truth for legal moves, rendering and game results.
///
/// Identical histories must produce identical summaries, the board cache
/// relies on it.
pub trait RulesService: Send + Sync {
    fn summary(&self, history: &[Move]) -> Result<Summary, RulesError>;
}

impl<R: RulesService + ?Sized> RulesService for &R {
    fn summary(&self, history: &[Move]) -> Result<Summary, RulesError> {
        (**self).summary(history)
    }
}

impl<R: RulesService + ?Sized> RulesService for Box<R> {
    fn summary(&self, history: &[Move]) -> Result<Summary, RulesError> {
        (**self).summary(history)
    }
}

/// Wire form of a position summary.
///
/// `winner` is `None` while the game is running, the side ordinal (1 or 2)
/// once someone has won, and 0 for a drawn game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub valid_moves: Vec<String>,
    pub render: String,
    pub winner: Option<i8>,
    pub representation: PlaneStack,
}

impl Summary {
    /// Validate and convert into a board snapshot for `history`.
    pub fn into_board_state(self, history: Vec<Move>) -> Result<BoardState, RulesError> {
        let legal_moves = self
            .valid_moves
            .iter()
            .map(|token| token.parse::<Move>())
            .collect::<Result<Vec<_>, _>>()?;

        let outcome = match self.winner {
            None => None,
            Some(0) => Some(Outcome::Draw),
            Some(1) => Some(Outcome::Winner(Side::PlayerOne)),
            Some(2) => Some(Outcome::Winner(Side::PlayerTwo)),
            Some(other) => {
                return Err(RulesError::Malformed(format!(
                    "unknown winner designation {other}"
                )))
            }
        };

        let representation = self
            .representation
            .iter()
            .flatten()
            .flatten()
            .map(|&v| f32::from(v))
            .collect();

        BoardState::new(history, legal_moves, representation, self.render, outcome)
    }
}

/// Blocking HTTP client for the board service's summary endpoint.
#[derive(Debug, Clone)]
pub struct HttpRulesService {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpRulesService {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RulesError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn summary_url(&self, history: &[Move]) -> String {
        format!(
            "{}/gameType/newcular/summary/{}",
            self.base_url,
            format_history(history)
        )
    }
}

impl RulesService for HttpRulesService {
    fn summary(&self, history: &[Move]) -> Result<Summary, RulesError> {
        let url = self.summary_url(history);
        debug!(%url, "Querying rules service");

        let response = self.client.get(&url).send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(RulesError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text()?;
        serde_json::from_str(&body).map_err(|e| RulesError::Malformed(e.to_string()))
    }
}
