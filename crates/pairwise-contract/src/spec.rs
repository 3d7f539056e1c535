//! Operation contracts.
//!
//! [`OperationContract`] is the document form handed to us by the operation
//! library: explicit `requires`/`produces` lists plus `(type, from, to)`
//! transitions. [`OperationSpec`] is the normalized form the graph and the
//! planner work on, where every transition has been split into one required
//! node and one produced node.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::node::{Availability, NodeState, ResourceStateNode};

/// A declared state transition of one resource type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// Resource type the transition applies to.
    #[serde(alias = "type")]
    pub resource_type: String,
    /// State the resource must be in. May be the wildcard.
    pub from: NodeState,
    /// State the resource ends up in.
    pub to: NodeState,
}

/// Operation contract as it appears in a contract document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationContract {
    /// Operation name, unique within a graph.
    pub name: String,
    /// Explicit preconditions.
    #[serde(default)]
    pub requires: Vec<ResourceStateNode>,
    /// Explicit postconditions.
    #[serde(default)]
    pub produces: Vec<ResourceStateNode>,
    /// Transitions, each contributing one precondition and one postcondition.
    #[serde(default)]
    pub transitions: Vec<Transition>,
}

/// Normalized operation: a name, the nodes it requires and the nodes it
/// produces.
///
/// # Invariants
///
/// - `produces` never contains a wildcard node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationSpec {
    /// Operation name.
    pub name: String,
    /// Preconditions, all of which must hold (AND semantics).
    pub requires: BTreeSet<ResourceStateNode>,
    /// Postconditions added to the availability set once applied.
    pub produces: BTreeSet<ResourceStateNode>,
}

impl OperationSpec {
    /// Operation with no requirements and no effects.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), requires: BTreeSet::new(), produces: BTreeSet::new() }
    }

    /// Add a precondition.
    pub fn with_requires(mut self, node: ResourceStateNode) -> Self {
        self.requires.insert(node);
        self
    }

    /// Add a postcondition. Wildcard nodes are ignored.
    pub fn with_produces(mut self, node: ResourceStateNode) -> Self {
        if !node.is_wildcard() {
            self.produces.insert(node);
        }
        self
    }

    /// Add a transition: `from` becomes a precondition, `to` a postcondition.
    pub fn with_transition(
        self,
        resource_type: &str,
        from: impl Into<NodeState>,
        to: impl Into<NodeState>,
    ) -> Self {
        self.with_requires(ResourceStateNode::new(resource_type, from))
            .with_produces(ResourceStateNode::new(resource_type, to))
    }

    /// Whether the operation neither requires nor produces anything.
    pub fn is_noop(&self) -> bool {
        self.requires.is_empty() && self.produces.is_empty()
    }

    /// Whether applying the operation to `available` would add at least one
    /// node not already present.
    pub fn contributes_to(&self, available: &Availability) -> bool {
        !self.produces.is_subset(available)
    }
}

impl From<OperationContract> for OperationSpec {
    fn from(contract: OperationContract) -> Self {
        let mut spec = Self::new(contract.name);

        for node in contract.requires {
            spec.requires.insert(node);
        }

        for node in contract.produces {
            if node.is_wildcard() {
                tracing::warn!(operation = %spec.name, %node, "dropping wildcard postcondition");
                continue;
            }
            spec.produces.insert(node);
        }

        for transition in contract.transitions {
            spec.requires
                .insert(ResourceStateNode::new(transition.resource_type.clone(), transition.from));

            if matches!(transition.to, NodeState::Any) {
                tracing::warn!(
                    operation = %spec.name,
                    resource_type = %transition.resource_type,
                    "dropping wildcard transition target"
                );
                continue;
            }
            spec.produces.insert(ResourceStateNode::new(transition.resource_type, transition.to));
        }

        spec
    }
}

/// Whether every precondition of `spec` holds in `available`.
///
/// Wildcard requirements are met by any node of the same resource type,
/// concrete requirements only by an exact match. An operation with no
/// requirements is always satisfied.
pub fn requirements_satisfied(spec: &OperationSpec, available: &Availability) -> bool {
    spec.requires.iter().all(|node| node.is_met_by(available))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(t: &str, s: &str) -> ResourceStateNode {
        ResourceStateNode::new(t, s)
    }

    #[test]
    fn transition_splits_into_requires_and_produces() {
        let contract = OperationContract {
            name: "modify_qp_rtr".to_string(),
            transitions: vec![Transition {
                resource_type: "QP".to_string(),
                from: "INIT".into(),
                to: "RTR".into(),
            }],
            ..Default::default()
        };

        let spec = OperationSpec::from(contract);
        assert!(spec.requires.contains(&node("QP", "INIT")));
        assert!(spec.produces.contains(&node("QP", "RTR")));
    }

    #[test]
    fn wildcard_postconditions_are_dropped() {
        let contract = OperationContract {
            name: "destroy_qp".to_string(),
            requires: vec![ResourceStateNode::any("QP")],
            produces: vec![ResourceStateNode::any("QP"), node("QP", "DESTROYED")],
            ..Default::default()
        };

        let spec = OperationSpec::from(contract);
        assert_eq!(spec.produces.len(), 1);
        assert!(spec.produces.iter().all(|n| !n.is_wildcard()));
    }

    #[test]
    fn requirements_use_and_semantics() {
        let spec = OperationSpec::new("post_send")
            .with_requires(node("QP", "RTS"))
            .with_requires(node("MR", "REGISTERED"));

        let partial: Availability = [node("QP", "RTS")].into_iter().collect();
        let full: Availability =
            [node("QP", "RTS"), node("MR", "REGISTERED")].into_iter().collect();

        assert!(!requirements_satisfied(&spec, &partial));
        assert!(requirements_satisfied(&spec, &full));
    }

    #[test]
    fn empty_requirements_always_satisfied() {
        let spec = OperationSpec::new("alloc_pd").with_produces(node("PD", "ALLOCATED"));
        assert!(requirements_satisfied(&spec, &Availability::new()));
    }
}
