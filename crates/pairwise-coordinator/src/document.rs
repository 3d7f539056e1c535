//! Update and view documents.
//!
//! An update document is what a peer writes about itself:
//!
//! ```json
//! {"local": {"resources": {"QP": {"qp0": {...}}}, "pairs": [{"id": "p0", "state": "CLAIMED"}]}}
//! ```
//!
//! A view document is what the coordinator writes back to that peer: its own
//! `local` section echoed, the other peer's `local` as `remote` with an `ids`
//! index attached, the merged `pairs`, and a `_coordinator` metadata block.
//!
//! Update parsing is lenient throughout. Anything unrecognised degrades to
//! empty rather than failing the round.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::pair::{PairReport, PairReports, PairState, Published};

/// Resource type whose instance list is always present in the `ids` index.
pub const QUEUE_TYPE: &str = "QP";

/// Instance names per resource type, each list sorted.
pub type ResourceIds = BTreeMap<String, Vec<String>>;

/// The parts of a peer's update document the coordinator uses.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateDocument {
    /// The peer's `local` section, echoed verbatim. Empty object when absent.
    pub local: Value,
    /// The peer's pair reports, keyed by id.
    pub pairs: PairReports,
}

impl Default for UpdateDocument {
    fn default() -> Self {
        Self { local: Value::Object(Map::new()), pairs: PairReports::new() }
    }
}

impl UpdateDocument {
    /// Extract from a parsed update document.
    ///
    /// Pairs are read from `local.pairs`, falling back to a top-level
    /// `pairs` list. Entries that do not decode are skipped. A repeated id
    /// keeps its last entry.
    pub fn from_value(doc: &Value) -> Self {
        let local = match doc.get("local") {
            Some(local @ Value::Object(_)) => local.clone(),
            _ => Value::Object(Map::new()),
        };

        let entries = local
            .get("pairs")
            .and_then(Value::as_array)
            .or_else(|| doc.get("pairs").and_then(Value::as_array));

        let mut pairs = PairReports::new();
        for entry in entries.into_iter().flatten() {
            match PairReport::deserialize(entry) {
                Ok(report) => {
                    pairs.insert(report.id.clone(), report);
                },
                Err(e) => tracing::warn!(error = %e, "skipping pair entry"),
            }
        }

        Self { local, pairs }
    }

    /// Instance names per resource type under `local.resources`.
    pub fn resource_ids(&self) -> ResourceIds {
        resource_ids(&self.local)
    }

    /// Number of queue instances under `local.resources`.
    pub fn queue_count(&self) -> usize {
        self.resource_ids().get(QUEUE_TYPE).map_or(0, Vec::len)
    }
}

/// Build the `ids` index from a `local` section's `resources` map.
///
/// Only types whose value is an object contribute. The queue type is always
/// present, possibly empty.
pub fn resource_ids(local: &Value) -> ResourceIds {
    let mut ids = ResourceIds::new();

    if let Some(resources) = local.get("resources").and_then(Value::as_object) {
        for (resource_type, instances) in resources {
            if let Some(instances) = instances.as_object() {
                let mut names: Vec<String> = instances.keys().cloned().collect();
                names.sort();
                ids.insert(resource_type.clone(), names);
            }
        }
    }

    ids.entry(QUEUE_TYPE.to_string()).or_default();
    ids
}

/// The peer's `local` section with an `ids` index attached.
pub fn remote_section(peer: &UpdateDocument) -> Value {
    let mut remote = match &peer.local {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };

    let ids = peer
        .resource_ids()
        .into_iter()
        .map(|(resource_type, names)| {
            (resource_type, Value::Array(names.into_iter().map(Value::String).collect()))
        })
        .collect();
    remote.insert("ids".to_string(), Value::Object(ids));

    Value::Object(remote)
}

/// Coordinator bookkeeping attached to every view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewMetadata {
    /// Wall-clock time the view was generated, milliseconds since the epoch.
    pub generated_at_ms: u64,
    /// Queue instances in the view's own `local` section.
    pub local_qp_count: usize,
    /// Queue instances in the view's `remote` section.
    pub remote_qp_count: usize,
    /// Number of entries in `pairs`.
    pub pair_count: usize,
}

/// A per-peer view as written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewDocument {
    /// The peer's own `local` section.
    pub local: Value,
    /// The other peer's `local` section plus `ids`.
    pub remote: Value,
    /// Merged pairs with this view's epochs.
    pub pairs: Vec<crate::pair::Pair>,
    /// Coordinator bookkeeping.
    #[serde(rename = "_coordinator")]
    pub metadata: ViewMetadata,
}

impl ViewDocument {
    /// What this view published per pair id.
    pub fn published(&self) -> Published {
        self.pairs.iter().map(|p| (p.id.clone(), (p.state, p.epoch))).collect()
    }
}

/// What a previously written view published, read leniently.
///
/// Only `pairs[].id`, `pairs[].state` and `pairs[].epoch` are consulted.
/// Anything that does not decode contributes nothing.
pub fn published_from_value(view: &Value) -> Published {
    #[derive(Deserialize)]
    struct Entry {
        id: String,
        state: PairState,
        #[serde(default)]
        epoch: u64,
    }

    view.get("pairs")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|entry| Entry::deserialize(entry).ok())
        .map(|e| (e.id, (e.state, e.epoch)))
        .collect()
}
