use newcular_core::BoardLookupFailure;
use newcular_mcts::MctsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SelfPlayError {
    #[error("Search failed at ply {ply}: {source}")]
    Search {
        ply: usize,
        #[source]
        source: MctsError,
    },

    #[error("Board lookup failed: {0}")]
    BoardLookup(#[from] BoardLookupFailure),

    #[error("Game cancelled after {plies} plies")]
    Cancelled { plies: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, SelfPlayError>;
