//! Test harness for the pairwise rendezvous stack.
//!
//! # Test Peers
//!
//! [`PeerClient`] speaks the rendezvous protocol over real TCP, so tests can
//! drive a running controller the way a server or client peer would.
//!
//! # Invariant Testing
//!
//! The `invariants` module checks properties of a sequence of published
//! views rather than specific scenarios. Record each round's views into a
//! [`ViewHistory`] and run [`InvariantRegistry::standard()`] against it.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod peer;

pub use invariants::{
    EpochMonotonicity, EpochTracksStateChange, Invariant, InvariantRegistry, InvariantResult,
    PairStateMonotonicity, ViewHistory, ViewLineage, ViewMetadataConsistency, Violation,
};
pub use peer::{Handshake, PeerClient};
