//! Recorded view history.

use pairwise_coordinator::ViewDocument;
use pairwise_proto::Role;

/// Views one peer received, oldest first.
#[derive(Debug, Clone)]
pub struct ViewLineage {
    /// Peer the views were published for.
    pub role: Role,
    /// Views in round order.
    pub views: Vec<ViewDocument>,
}

/// View lineages for one or both peers.
#[derive(Debug, Clone, Default)]
pub struct ViewHistory {
    /// One lineage per recorded role.
    pub lineages: Vec<ViewLineage>,
}

impl ViewHistory {
    /// Append `view` to `role`'s lineage.
    pub fn record(&mut self, role: Role, view: ViewDocument) {
        match self.lineages.iter_mut().find(|l| l.role == role) {
            Some(lineage) => lineage.views.push(view),
            None => self.lineages.push(ViewLineage { role, views: vec![view] }),
        }
    }

    /// Total views recorded across lineages.
    pub fn len(&self) -> usize {
        self.lineages.iter().map(|l| l.views.len()).sum()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
