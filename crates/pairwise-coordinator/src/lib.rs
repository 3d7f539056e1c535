//! View coordinator.
//!
//! Two peers each publish an update document describing their local
//! resources and the pairs they are working on. The coordinator merges the
//! two into a per-peer view: the peer's own state, the other peer's state
//! with an index of its resource ids, and the merged pair list with
//! per-view epochs that advance whenever a pair's published state changes.
//!
//! # Architecture
//!
//! - [`pair`]: lifecycle states, merge rule and epoch assignment
//! - [`document`]: update/view document shapes
//! - [`publish`]: lenient reads, change detection, atomic writes
//! - [`Coordinator`]: rounds over the configured files and the polling loop
//!
//! Rounds are pure apart from file I/O: [`merge_round`] takes parsed inputs
//! and the timestamp, and returns both views.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod coordinator;
pub mod document;
mod error;
pub mod pair;
pub mod publish;

pub use coordinator::{Coordinator, CoordinatorConfig, Views, merge_round, wall_clock_ms};
pub use document::{UpdateDocument, ViewDocument, ViewMetadata};
pub use error::CoordinatorError;
pub use pair::{Pair, PairReport, PairState, Published};
