//! Coordinator errors.
//!
//! Reading inputs never fails a round: missing or malformed update documents
//! and previous views degrade to empty. Only publishing can fail.

use std::{io, path::PathBuf};

use thiserror::Error;

/// Errors surfaced by a coordination round.
#[derive(Error, Debug)]
pub enum CoordinatorError {
    /// Writing or renaming a view file failed.
    #[error("failed to publish {}: {source}", path.display())]
    Publish {
        /// View file being published.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Encoding a view document failed.
    #[error("failed to encode view: {0}")]
    Encode(#[from] serde_json::Error),
}
