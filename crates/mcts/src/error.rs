use newcular_core::BoardLookupFailure;
use thiserror::Error;

/// Failure of the external policy/value evaluator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluatorError {
    #[error("Evaluation failed: {0}")]
    EvaluationFailed(String),

    #[error("Expected {what} of length {expected}, got {actual}")]
    Shape {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Model error: {0}")]
    Model(String),

    #[error("Batching worker stopped")]
    WorkerStopped,
}

#[derive(Error, Debug)]
pub enum MctsError {
    #[error("Board lookup failed: {0}")]
    BoardLookup(#[from] BoardLookupFailure),

    #[error("Evaluator failed: {0}")]
    Evaluator(#[from] EvaluatorError),

    #[error("No legal moves at non-terminal position [{history}]")]
    DegenerateMask { history: String },

    #[error("Terminal position cannot be searched")]
    TerminalPosition,

    #[error(
        "Position [{history}] is unplayable: all {edges} root moves failed \
         ({lookup_failures} board lookups, {evaluator_failures} evaluations, \
         {degenerate} degenerate masks)"
    )]
    UnplayablePosition {
        history: String,
        edges: usize,
        lookup_failures: usize,
        evaluator_failures: usize,
        degenerate: usize,
    },

    #[error("Root node not initialized")]
    RootNotInitialized,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Dirichlet sampling error: {0}")]
    DirichletError(String),
}

pub type Result<T> = std::result::Result<T, MctsError>;
