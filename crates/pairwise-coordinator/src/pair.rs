//! Pair lifecycle and merge rules.
//!
//! Each peer reports the pairs it knows about with its own view of their
//! lifecycle state. Merging takes the more advanced state per id. Publishing
//! into a view additionally folds in what that view last published, so a
//! view's state for an id never moves backwards while the id is still
//! reported, and bumps the id's epoch whenever the published state changes.

use std::{
    cmp::Ordering,
    collections::{BTreeMap, BTreeSet},
};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};

/// Lifecycle state of a pair, totally ordered by rank.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PairState {
    /// Known but nothing done yet.
    #[default]
    Init,
    /// A queue on one side has been claimed for this pair.
    Claimed,
    /// Remote parameters (queue number, keys) bound locally.
    ParamsBound,
    /// Both sides' queues reached ready-to-send.
    BothRts,
    /// Pair usable for traffic.
    Ready,
}

impl PairState {
    /// All states in rank order.
    pub const ALL: [Self; 5] =
        [Self::Init, Self::Claimed, Self::ParamsBound, Self::BothRts, Self::Ready];

    /// Position in the total order, `INIT` = 0.
    pub fn rank(self) -> u8 {
        self as u8
    }

    /// The higher-ranked of two states.
    pub fn merge(self, other: Self) -> Self {
        self.max(other)
    }
}

/// One pair entry as reported in a peer's update document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PairReport {
    /// Pair id. Integers are accepted and normalized to their decimal form.
    #[serde(deserialize_with = "pair_id")]
    pub id: String,
    /// Reporting side's view of the state.
    pub state: PairState,
    /// Timestamp of the report, kept in the number form the peer wrote.
    #[serde(default = "zero_ts")]
    pub ts: Number,
    /// Client-side queue id.
    #[serde(default, alias = "cliId")]
    pub cli_id: Option<Value>,
    /// Server-side queue id, or the client's hint of it.
    #[serde(default, alias = "srvId")]
    pub srv_id: Option<Value>,
}

fn pair_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(id) => id,
        RawId::Number(id) => id.to_string(),
    })
}

fn zero_ts() -> Number {
    Number::from(0)
}

/// Numeric order over timestamps. Integers compare exactly; anything else
/// compares as `f64`.
fn ts_order(a: &Number, b: &Number) -> Ordering {
    match (a.as_i64(), b.as_i64(), a.as_u64(), b.as_u64()) {
        (Some(a), Some(b), ..) => a.cmp(&b),
        (.., Some(a), Some(b)) => a.cmp(&b),
        _ => {
            let (a, b) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
            a.total_cmp(&b)
        },
    }
}

/// Pair reports keyed by id.
pub type PairReports = BTreeMap<String, PairReport>;

/// Result of merging both sides' reports for one id.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedPair {
    /// Pair id.
    pub id: String,
    /// Client-side queue id.
    pub cli_id: Option<Value>,
    /// Server-side queue id.
    pub srv_id: Option<Value>,
    /// Higher-ranked of the two reported states.
    pub state: PairState,
    /// Latest timestamp among the sides that reported the id.
    pub ts: Number,
}

/// Merge both sides' reports.
///
/// Every id reported by either side appears once, in id order. A side that
/// does not report an id counts as `INIT` for that id. `cli_id` comes from
/// the client; `srv_id` from the server, falling back to the client's hint.
pub fn merge_reports(client: &PairReports, server: &PairReports) -> Vec<MergedPair> {
    let ids: BTreeSet<&String> = client.keys().chain(server.keys()).collect();

    ids.into_iter()
        .map(|id| {
            let cli = client.get(id);
            let srv = server.get(id);

            let state = cli
                .map_or(PairState::Init, |r| r.state)
                .merge(srv.map_or(PairState::Init, |r| r.state));
            let ts = cli
                .iter()
                .chain(srv.iter())
                .map(|r| &r.ts)
                .max_by(|a, b| ts_order(a, b))
                .cloned()
                .unwrap_or_else(zero_ts);

            MergedPair {
                id: id.clone(),
                cli_id: cli.and_then(|r| r.cli_id.clone()),
                srv_id: srv
                    .and_then(|r| r.srv_id.clone())
                    .or_else(|| cli.and_then(|r| r.srv_id.clone())),
                state,
                ts,
            }
        })
        .collect()
}

/// A pair as published in a view document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pair {
    /// Pair id.
    pub id: String,
    /// Client-side queue id.
    #[serde(default)]
    pub cli_id: Option<Value>,
    /// Server-side queue id.
    #[serde(default)]
    pub srv_id: Option<Value>,
    /// Published state.
    pub state: PairState,
    /// Number of times this view's published state for the id has changed.
    #[serde(default)]
    pub epoch: u64,
    /// Latest report timestamp.
    #[serde(default = "zero_ts")]
    pub ts: Number,
}

/// What a view last published per id: `(state, epoch)`.
pub type Published = BTreeMap<String, (PairState, u64)>;

/// Fold merged pairs into one view's lineage.
///
/// The published state is the merged state or the view's previous state for
/// the id, whichever ranks higher. The epoch starts at 1 for an id the view
/// has not published before and increments by exactly 1 whenever the
/// published state differs from the previous one.
pub fn publish_into_view(merged: &[MergedPair], previous: &Published) -> Vec<Pair> {
    merged
        .iter()
        .map(|m| {
            let (state, epoch) = match previous.get(&m.id) {
                None => (m.state, 1),
                Some(&(prev_state, prev_epoch)) => {
                    let state = m.state.merge(prev_state);
                    let epoch = if state == prev_state { prev_epoch } else { prev_epoch + 1 };
                    (state, epoch)
                },
            };

            Pair {
                id: m.id.clone(),
                cli_id: m.cli_id.clone(),
                srv_id: m.srv_id.clone(),
                state,
                epoch,
                ts: m.ts.clone(),
            }
        })
        .collect()
}
