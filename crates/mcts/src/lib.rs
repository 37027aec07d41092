//! Monte Carlo Tree Search over positions served by a [`newcular_core::BoardCache`].
//!
//! Leaves are evaluated by an [`Evaluator`]; with the `torch` feature a
//! TorchScript network can be loaded as one.

// Module declarations
mod backup;
mod batching;
mod cancel;
mod config;
mod dirichlet;
mod error;
mod evaluation;
mod expansion;
mod mcts;
mod search_result;
mod selection;
#[cfg(feature = "torch")]
mod torch;
mod tree;

// Public exports
pub use batching::BatchingEvaluator;
pub use cancel::CancelToken;
pub use config::MctsConfig;
pub use error::{EvaluatorError, MctsError, Result};
pub use evaluation::{
    evaluate_position, legal_action_indices, legal_priors, mask_policy, softmax, Evaluation,
    Evaluator, UniformEvaluator,
};
pub use mcts::{Mcts, SearchContext};
pub use search_result::SearchResult;
pub use selection::{puct_score, select_edge};
#[cfg(feature = "torch")]
pub use torch::TorchModel;
pub use tree::{BranchFailure, Edge, MctsNode, MctsTree, NodeId};
