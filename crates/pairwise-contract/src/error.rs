//! Contract and planning errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors loading contract or snapshot documents.
#[derive(Error, Debug)]
pub enum ContractError {
    /// Document could not be read from disk.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// Path that failed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Document is not valid JSON of the expected shape.
    #[error("invalid document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors returned by the planner.
///
/// `NotFound` is an expected outcome, not a failure of the planner itself:
/// it means no witness chain exists within the depth bound under the
/// add-only availability model.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// No chain of at most `max_depth` operations enables the target.
    #[error("no chain of at most {max_depth} operations enables '{target}'")]
    NotFound {
        /// Target operation name
        target: String,
        /// Depth bound that was searched
        max_depth: usize,
    },

    /// Target operation is not part of the graph.
    #[error("unknown operation: {0}")]
    UnknownOperation(String),
}
