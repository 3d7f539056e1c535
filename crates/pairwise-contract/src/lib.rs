//! Operation contracts and witness-chain planning.
//!
//! Each operation against the resource-state machine declares what it
//! requires and what it produces as `(resource type, state)` nodes. This
//! crate builds the bipartite [`ContractGraph`] over those declarations and
//! searches it for a short chain of operations that enables a target.
//!
//! # Components
//!
//! - [`ResourceStateNode`]: one `(type, state)` fact, wildcard-capable
//! - [`OperationSpec`]: normalized requires/produces contract
//! - [`ContractGraph`]: operations plus requires/produces reverse indices
//! - [`plan_chain_to_enable`]: BFS over add-only availability sets
//! - [`ResourceSnapshot`]: `(type, instance) → state` peer snapshot
//!
//! The planner is pure and synchronous. It never consumes states, so its
//! answer is an optimistic witness rather than an exact reachability proof.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod graph;
mod node;
mod planner;
mod snapshot;
mod spec;

pub use error::{ContractError, PlanError};
pub use graph::ContractGraph;
pub use node::{Availability, NodeState, ResourceStateNode, WILDCARD};
pub use planner::{plan_chain_to_enable, plan_chain_to_enable_named};
pub use snapshot::ResourceSnapshot;
pub use spec::{OperationContract, OperationSpec, Transition, requirements_satisfied};
