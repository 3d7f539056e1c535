//! Standard view invariants.
//!
//! Each check walks every lineage and compares consecutive views, so a
//! history must be recorded in round order.

use std::collections::BTreeMap;

use pairwise_coordinator::{PairState, ViewDocument};

use super::{Invariant, InvariantResult, ViewHistory, Violation};

/// `(state, epoch)` per pair id in one view.
fn pairs_by_id(view: &ViewDocument) -> BTreeMap<&str, (PairState, u64)> {
    view.pairs.iter().map(|p| (p.id.as_str(), (p.state, p.epoch))).collect()
}

/// Run `f` on every consecutive pair of views in every lineage.
fn each_transition(
    history: &ViewHistory,
    mut f: impl FnMut(&str, usize, &ViewDocument, &ViewDocument) -> Result<(), String>,
) -> Result<(), String> {
    for lineage in &history.lineages {
        for (round, window) in lineage.views.windows(2).enumerate() {
            f(lineage.role.as_str(), round + 1, &window[0], &window[1])?;
        }
    }
    Ok(())
}

/// A view's epoch for a pair id never decreases while the id stays present.
pub struct EpochMonotonicity;

impl Invariant for EpochMonotonicity {
    fn name(&self) -> &'static str {
        "epoch_monotonicity"
    }

    fn check(&self, history: &ViewHistory) -> InvariantResult {
        each_transition(history, |role, round, before, after| {
            let before = pairs_by_id(before);
            for (id, (_, epoch)) in pairs_by_id(after) {
                if let Some(&(_, prev)) = before.get(id)
                    && epoch < prev
                {
                    return Err(format!(
                        "{role} view round {round} pair {id}: \
                         epoch decreased {prev} → {epoch}"
                    ));
                }
            }
            Ok(())
        })
        .map_err(|message| Violation { invariant: self.name(), message })
    }
}

/// A view's published state for a pair id never ranks lower than before.
pub struct PairStateMonotonicity;

impl Invariant for PairStateMonotonicity {
    fn name(&self) -> &'static str {
        "pair_state_monotonicity"
    }

    fn check(&self, history: &ViewHistory) -> InvariantResult {
        each_transition(history, |role, round, before, after| {
            let before = pairs_by_id(before);
            for (id, (state, _)) in pairs_by_id(after) {
                if let Some(&(prev, _)) = before.get(id)
                    && state < prev
                {
                    return Err(format!(
                        "{role} view round {round} pair {id}: \
                         state regressed {prev:?} → {state:?}"
                    ));
                }
            }
            Ok(())
        })
        .map_err(|message| Violation { invariant: self.name(), message })
    }
}

/// Epochs count state changes.
///
/// A pair id new to a view starts at epoch 1. Between consecutive views the
/// epoch rises by exactly 1 if the state changed and stays put otherwise.
pub struct EpochTracksStateChange;

impl Invariant for EpochTracksStateChange {
    fn name(&self) -> &'static str {
        "epoch_tracks_state_change"
    }

    fn check(&self, history: &ViewHistory) -> InvariantResult {
        for lineage in &history.lineages {
            if let Some(first) = lineage.views.first()
                && let Some(p) = first.pairs.iter().find(|p| p.epoch != 1)
            {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "{} view round 0 pair {}: first epoch is {}",
                        lineage.role, p.id, p.epoch
                    ),
                });
            }
        }

        each_transition(history, |role, round, before, after| {
            let before = pairs_by_id(before);
            for (id, (state, epoch)) in pairs_by_id(after) {
                let expected = match before.get(id) {
                    None => 1,
                    Some(&(prev_state, prev_epoch)) if prev_state == state => prev_epoch,
                    Some(&(_, prev_epoch)) => prev_epoch + 1,
                };
                if epoch != expected {
                    return Err(format!(
                        "{role} view round {round} pair {id}: epoch {epoch}, expected {expected}"
                    ));
                }
            }
            Ok(())
        })
        .map_err(|message| Violation { invariant: self.name(), message })
    }
}

/// The `_coordinator` block agrees with the view body, and the remote `ids`
/// index is sorted, duplicate-free and always lists queues.
pub struct ViewMetadataConsistency;

impl ViewMetadataConsistency {
    fn check_view(view: &ViewDocument) -> Result<(), String> {
        if view.metadata.pair_count != view.pairs.len() {
            return Err(format!(
                "pair_count {} but {} pairs",
                view.metadata.pair_count,
                view.pairs.len()
            ));
        }

        let Some(ids) = view.remote.get("ids").and_then(|ids| ids.as_object()) else {
            return Err("remote section has no ids index".to_string());
        };

        for (resource_type, names) in ids {
            let names: Vec<&str> = names
                .as_array()
                .map(|names| names.iter().filter_map(|n| n.as_str()).collect())
                .unwrap_or_default();
            if names.windows(2).any(|w| w[0] >= w[1]) {
                return Err(format!("ids.{resource_type} not strictly sorted: {names:?}"));
            }
        }

        let queues = ids.get("QP").and_then(|q| q.as_array()).map(Vec::len);
        if queues != Some(view.metadata.remote_qp_count) {
            return Err(format!(
                "remote_qp_count {} but ids.QP has {:?} entries",
                view.metadata.remote_qp_count, queues
            ));
        }

        Ok(())
    }
}

impl Invariant for ViewMetadataConsistency {
    fn name(&self) -> &'static str {
        "view_metadata_consistency"
    }

    fn check(&self, history: &ViewHistory) -> InvariantResult {
        for lineage in &history.lineages {
            for (round, view) in lineage.views.iter().enumerate() {
                Self::check_view(view).map_err(|e| Violation {
                    invariant: self.name(),
                    message: format!("{} view round {round}: {e}", lineage.role),
                })?;
            }
        }
        Ok(())
    }
}
