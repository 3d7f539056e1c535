//! Resource-state nodes.
//!
//! A node is one fact about system state: "some resource of type `QP` is in
//! state `RTS`". Requirement nodes may use the wildcard state, which matches
//! any concrete state of the same resource type. Produced nodes are always
//! concrete.

use std::{collections::BTreeSet, fmt};

use serde::{Deserialize, Serialize};

/// Literal used for the wildcard state in contract documents.
pub const WILDCARD: &str = "*";

/// Set of concrete resource-state nodes known to be present.
///
/// `BTreeSet` keeps a canonical ordering, so two availability sets with the
/// same contents compare and hash identically regardless of insertion order.
pub type Availability = BTreeSet<ResourceStateNode>;

/// State half of a [`ResourceStateNode`].
///
/// `Any` sorts before every named state, which lets a wildcard lookup start a
/// range scan at `(type, Any)` and find the first concrete state of that type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeState {
    /// Wildcard. Matches any state of the same resource type in requirement
    /// checks.
    Any,
    /// A concrete state name.
    Named(String),
}

impl NodeState {
    /// Concrete state name, `None` for the wildcard.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Any => None,
            Self::Named(name) => Some(name),
        }
    }
}

impl From<String> for NodeState {
    fn from(value: String) -> Self {
        if value == WILDCARD { Self::Any } else { Self::Named(value) }
    }
}

impl From<&str> for NodeState {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<NodeState> for String {
    fn from(value: NodeState) -> Self {
        match value {
            NodeState::Any => WILDCARD.to_string(),
            NodeState::Named(name) => name,
        }
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str(WILDCARD),
            Self::Named(name) => f.write_str(name),
        }
    }
}

/// A `(resource type, state)` pair.
///
/// Equality covers both fields. Field order matters for `Ord`: nodes sort by
/// resource type first, so all states of one type are contiguous in an
/// [`Availability`] set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceStateNode {
    /// Resource type, e.g. `QP`, `CQ`, `MR`.
    #[serde(alias = "type")]
    pub resource_type: String,
    /// Concrete state or wildcard.
    pub state: NodeState,
}

impl ResourceStateNode {
    /// Node with a concrete or wildcard state.
    pub fn new(resource_type: impl Into<String>, state: impl Into<NodeState>) -> Self {
        Self { resource_type: resource_type.into(), state: state.into() }
    }

    /// Wildcard node for `resource_type`.
    pub fn any(resource_type: impl Into<String>) -> Self {
        Self { resource_type: resource_type.into(), state: NodeState::Any }
    }

    /// Whether the state is the wildcard.
    pub fn is_wildcard(&self) -> bool {
        matches!(self.state, NodeState::Any)
    }

    /// Whether this requirement node is met by `available`.
    ///
    /// A wildcard is met by any node of the same resource type; a concrete
    /// node only by an exact match.
    pub fn is_met_by(&self, available: &Availability) -> bool {
        match self.state {
            NodeState::Any => available
                .range(Self::any(self.resource_type.clone())..)
                .next()
                .is_some_and(|node| node.resource_type == self.resource_type),
            NodeState::Named(_) => available.contains(self),
        }
    }
}

impl fmt::Display for ResourceStateNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource_type, self.state)
    }
}
