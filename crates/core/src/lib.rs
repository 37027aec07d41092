//! Board-side building blocks for newcular self-play.
//!
//! - [`Move`] codec: text form, (row, col) coordinates, flat action index,
//!   legal-move masks and perspective inversion
//! - [`BoardState`]: immutable snapshot of one move history
//! - [`RulesService`]: the external rules engine, with an HTTP client and an
//!   in-memory [`ScriptedRules`] implementation
//! - [`BoardCache`]: LRU memoization of rules-service lookups with
//!   coalescing of concurrent identical requests

mod board;
mod cache;
mod error;
mod moves;
mod rules;
mod scripted;

pub use board::{BoardState, Outcome, Side, PLANES, REPRESENTATION_LEN};
pub use cache::{BoardCache, CacheStats};
pub use error::{BoardLookupFailure, MoveError, RulesError};
pub use moves::{format_history, mask, Cell, Move, ACTION_SPACE, COLS, ROWS};
pub use rules::{HttpRulesService, PlaneStack, RulesService, Summary};
pub use scripted::ScriptedRules;
