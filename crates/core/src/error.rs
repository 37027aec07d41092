use thiserror::Error;

/// Malformed move text or coordinates, rejected before reaching the search.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MoveError {
    #[error("Invalid move: {0}")]
    InvalidMove(String),
}

/// Failure talking to (or interpreting) the rules service.
#[derive(Error, Debug)]
pub enum RulesError {
    #[error("Rules service request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Rules service returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed rules service response: {0}")]
    Malformed(String),

    #[error("Unknown position: [{0}]")]
    UnknownPosition(String),
}

impl From<MoveError> for RulesError {
    fn from(err: MoveError) -> Self {
        RulesError::Malformed(err.to_string())
    }
}

/// A history could not be materialized into a board snapshot.
///
/// Cloneable so a single failed remote query can be handed to every caller
/// that was waiting on the same key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Board lookup failed for [{history}]: {reason}")]
pub struct BoardLookupFailure {
    pub history: String,
    pub reason: String,
}
