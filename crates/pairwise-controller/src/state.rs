//! Shared endpoint state with change notification.
//!
//! Connection handlers mutate the [`EndpointTable`] under one mutex. Every
//! mutation goes through [`SharedState::update`], which wakes all tasks
//! blocked in [`SharedState::wait_until`] so they can re-check their
//! condition. This replaces sleep-polling for the readiness gate and the
//! disconnect monitor.

use tokio::sync::{Mutex, Notify};

use crate::endpoint::EndpointTable;

/// Endpoint table plus a change signal.
#[derive(Debug, Default)]
pub struct SharedState {
    table: Mutex<EndpointTable>,
    changed: Notify,
}

impl SharedState {
    /// Fresh state with both endpoints empty.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutate the table and wake every waiter.
    pub async fn update<T>(&self, f: impl FnOnce(&mut EndpointTable) -> T) -> T {
        let out = {
            let mut table = self.table.lock().await;
            f(&mut table)
        };
        self.changed.notify_waiters();
        out
    }

    /// Read from the table.
    pub async fn read<T>(&self, f: impl FnOnce(&EndpointTable) -> T) -> T {
        let table = self.table.lock().await;
        f(&table)
    }

    /// Block until `condition` holds.
    ///
    /// The notification future is created before the condition is checked,
    /// so an update landing between the check and the await is not missed.
    pub async fn wait_until(&self, mut condition: impl FnMut(&EndpointTable) -> bool) {
        loop {
            let notified = self.changed.notified();
            if self.read(&mut condition).await {
                return;
            }
            notified.await;
        }
    }
}
