//! Contract graph.
//!
//! Bipartite structure linking operations to the resource-state nodes they
//! require and produce. The graph keeps reverse indices in both directions:
//! node → operations requiring it (to find consumers once a state appears)
//! and node → operations producing it (to find ways of reaching a state).
//!
//! Operations with neither requirements nor effects carry no information for
//! planning and are dropped at build time.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    path::Path,
};

use crate::{
    error::ContractError,
    node::{Availability, ResourceStateNode},
    spec::{OperationContract, OperationSpec, requirements_satisfied},
};

/// Operations indexed by name, plus requires/produces reverse indices.
#[derive(Debug, Clone, Default)]
pub struct ContractGraph {
    /// Operation name → normalized spec. Ordered so iteration (and therefore
    /// planning) is deterministic.
    operations: BTreeMap<String, OperationSpec>,
    /// Required node → names of operations requiring it
    requires_index: HashMap<ResourceStateNode, BTreeSet<String>>,
    /// Produced node → names of operations producing it
    produces_index: HashMap<ResourceStateNode, BTreeSet<String>>,
}

impl ContractGraph {
    /// Build a graph from contract documents.
    ///
    /// Transitions are normalized into requires/produces nodes. When two
    /// contracts share a name the later one wins.
    pub fn build(contracts: impl IntoIterator<Item = OperationContract>) -> Self {
        Self::from_specs(contracts.into_iter().map(OperationSpec::from))
    }

    /// Build a graph from already-normalized specs.
    pub fn from_specs(specs: impl IntoIterator<Item = OperationSpec>) -> Self {
        let mut operations = BTreeMap::new();

        for spec in specs {
            if spec.is_noop() {
                tracing::debug!(operation = %spec.name, "dropping no-op contract");
                continue;
            }
            if let Some(previous) = operations.insert(spec.name.clone(), spec) {
                tracing::warn!(operation = %previous.name, "duplicate contract replaced");
            }
        }

        let mut requires_index: HashMap<ResourceStateNode, BTreeSet<String>> = HashMap::new();
        let mut produces_index: HashMap<ResourceStateNode, BTreeSet<String>> = HashMap::new();

        for (name, spec) in &operations {
            for node in &spec.requires {
                requires_index.entry(node.clone()).or_default().insert(name.clone());
            }
            for node in &spec.produces {
                produces_index.entry(node.clone()).or_default().insert(name.clone());
            }
        }

        Self { operations, requires_index, produces_index }
    }

    /// Parse a JSON array of contracts.
    pub fn from_json(json: &str) -> Result<Self, ContractError> {
        let contracts: Vec<OperationContract> = serde_json::from_str(json)?;
        Ok(Self::build(contracts))
    }

    /// Load a JSON array of contracts from disk.
    pub fn from_path(path: &Path) -> Result<Self, ContractError> {
        let json = std::fs::read_to_string(path)
            .map_err(|source| ContractError::Io { path: path.to_path_buf(), source })?;
        Self::from_json(&json)
    }

    /// Operation by name.
    pub fn get(&self, name: &str) -> Option<&OperationSpec> {
        self.operations.get(name)
    }

    /// All operations in name order.
    pub fn operations(&self) -> impl Iterator<Item = &OperationSpec> {
        self.operations.values()
    }

    /// Number of operations.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether the graph has no operations.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Operations listing exactly `node` as a requirement.
    pub fn operations_requiring(&self, node: &ResourceStateNode) -> impl Iterator<Item = &str> {
        self.requires_index.get(node).into_iter().flat_map(|names| names.iter().map(String::as_str))
    }

    /// Operations producing exactly `node`.
    pub fn operations_producing(&self, node: &ResourceStateNode) -> impl Iterator<Item = &str> {
        self.produces_index.get(node).into_iter().flat_map(|names| names.iter().map(String::as_str))
    }

    /// Operations that would accept the concrete `node` as input, either by
    /// exact requirement or through a wildcard on the same resource type.
    pub fn consumers_of(&self, node: &ResourceStateNode) -> BTreeSet<&str> {
        let wildcard = ResourceStateNode::any(node.resource_type.clone());
        self.operations_requiring(node).chain(self.operations_requiring(&wildcard)).collect()
    }

    /// Operations whose requirements all hold in `available`.
    pub fn enabled_operations(&self, available: &Availability) -> Vec<&OperationSpec> {
        self.operations().filter(|spec| requirements_satisfied(spec, available)).collect()
    }
}
