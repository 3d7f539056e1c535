//! Resource-state snapshots.
//!
//! Peers describe their local resources as `(resource type, instance name) →
//! state`. The planner only cares which `(type, state)` facts exist, so the
//! instance names collapse away when converting to an [`Availability`] set.

use std::{collections::BTreeMap, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    error::ContractError,
    node::{Availability, ResourceStateNode},
};

/// Snapshot of local resources, keyed by type then instance name.
///
/// Serialized as `{"QP": {"qp0": "RTS", "qp1": "INIT"}, "CQ": {...}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceSnapshot {
    resources: BTreeMap<String, BTreeMap<String, String>>,
}

impl ResourceSnapshot {
    /// Empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a snapshot document.
    pub fn from_json(json: &str) -> Result<Self, ContractError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a snapshot document from disk.
    pub fn from_path(path: &Path) -> Result<Self, ContractError> {
        let json = std::fs::read_to_string(path)
            .map_err(|source| ContractError::Io { path: path.to_path_buf(), source })?;
        Self::from_json(&json)
    }

    /// Record (or overwrite) the state of one instance.
    pub fn insert(
        &mut self,
        resource_type: impl Into<String>,
        instance: impl Into<String>,
        state: impl Into<String>,
    ) {
        self.resources
            .entry(resource_type.into())
            .or_default()
            .insert(instance.into(), state.into());
    }

    /// State of one instance.
    pub fn state_of(&self, resource_type: &str, instance: &str) -> Option<&str> {
        self.resources.get(resource_type)?.get(instance).map(String::as_str)
    }

    /// Instance names of one resource type, in sorted order.
    pub fn instances(&self, resource_type: &str) -> impl Iterator<Item = &str> {
        self.resources.get(resource_type).into_iter().flat_map(|m| m.keys().map(String::as_str))
    }

    /// Total number of instances across all types.
    pub fn len(&self) -> usize {
        self.resources.values().map(BTreeMap::len).sum()
    }

    /// Whether the snapshot has no instances.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Availability set: one node per distinct `(type, state)`.
    pub fn availability(&self) -> Availability {
        self.resources
            .iter()
            .flat_map(|(resource_type, instances)| {
                instances
                    .values()
                    .map(move |state| ResourceStateNode::new(resource_type, state.as_str()))
            })
            .collect()
    }
}

impl FromIterator<((String, String), String)> for ResourceSnapshot {
    fn from_iter<T: IntoIterator<Item = ((String, String), String)>>(iter: T) -> Self {
        let mut snapshot = Self::new();
        for ((resource_type, instance), state) in iter {
            snapshot.insert(resource_type, instance, state);
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn availability_collapses_instances() {
        let mut snapshot = ResourceSnapshot::new();
        snapshot.insert("QP", "qp0", "RTS");
        snapshot.insert("QP", "qp1", "RTS");
        snapshot.insert("QP", "qp2", "INIT");
        snapshot.insert("CQ", "cq0", "CREATED");

        let available = snapshot.availability();
        assert_eq!(available.len(), 3);
        assert!(available.contains(&ResourceStateNode::new("QP", "RTS")));
        assert!(available.contains(&ResourceStateNode::new("QP", "INIT")));
        assert!(available.contains(&ResourceStateNode::new("CQ", "CREATED")));
        assert_eq!(snapshot.len(), 4);
    }

    #[test]
    fn parses_nested_document() {
        let snapshot =
            ResourceSnapshot::from_json(r#"{"QP": {"qp0": "RTR"}, "PD": {"pd0": "ALLOCATED"}}"#)
                .unwrap();

        assert_eq!(snapshot.state_of("QP", "qp0"), Some("RTR"));
        assert_eq!(snapshot.state_of("QP", "qp1"), None);
        assert_eq!(snapshot.instances("PD").collect::<Vec<_>>(), ["pd0"]);
    }

    #[test]
    fn collects_from_keyed_entries() {
        let snapshot: ResourceSnapshot = [
            (("QP".to_string(), "qp0".to_string()), "INIT".to_string()),
            (("QP".to_string(), "qp0".to_string()), "RTR".to_string()),
        ]
        .into_iter()
        .collect();

        assert_eq!(snapshot.state_of("QP", "qp0"), Some("RTR"));
        assert_eq!(snapshot.len(), 1);
    }
}
