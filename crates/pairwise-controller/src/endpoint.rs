//! Endpoint table.
//!
//! The controller knows exactly two endpoints, one per [`Role`]. Each holds
//! what its peer declared during intake plus the lifecycle flags the
//! handlers gate on. Both records exist from controller start; connections
//! attach to and detach from them, they are never removed.
//!
//! Queue records may repeat a queue pair number (one record per memory
//! region). The parallel `qpns` list holds each number once, in first-seen
//! order, and is what pairing indices refer to.

use std::sync::Arc;

use pairwise_proto::{GlobalMetadata, MrMetadata, QpMetadata, Qpn, Role};
use tokio::{io::AsyncWrite, sync::Mutex};

/// Write half of a peer connection, shareable across handlers.
pub type PeerWriter = Arc<Mutex<Box<dyn AsyncWrite + Send + Unpin>>>;

/// One peer's connection-setup metadata.
pub struct Endpoint {
    role: Role,
    global: Option<GlobalMetadata>,
    qp_records: Vec<QpMetadata>,
    qpns: Vec<Qpn>,
    ready: bool,
    disconnected: bool,
    connection: Option<PeerWriter>,
}

impl Endpoint {
    fn new(role: Role) -> Self {
        Self {
            role,
            global: None,
            qp_records: Vec::new(),
            qpns: Vec::new(),
            ready: false,
            disconnected: false,
            connection: None,
        }
    }

    /// Role this endpoint represents.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Declared global metadata, once received.
    pub fn global(&self) -> Option<&GlobalMetadata> {
        self.global.as_ref()
    }

    /// All queue records in arrival order, duplicates included.
    pub fn qp_records(&self) -> &[QpMetadata] {
        &self.qp_records
    }

    /// Distinct queue pair numbers in first-seen order.
    pub fn qpns(&self) -> &[Qpn] {
        &self.qpns
    }

    /// Whether intake has completed.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Whether the last connection for this role has gone away.
    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }

    /// Write half of the live connection, if any.
    pub fn connection(&self) -> Option<PeerWriter> {
        self.connection.clone()
    }

    /// Bind a new connection to this endpoint.
    ///
    /// Replaces the global metadata and clears `disconnected`. Queue records
    /// from an earlier connection are kept.
    pub fn attach(&mut self, global: GlobalMetadata, connection: PeerWriter) {
        self.global = Some(global);
        self.connection = Some(connection);
        self.disconnected = false;
    }

    /// Refresh the global metadata without touching the connection.
    pub fn set_global(&mut self, global: GlobalMetadata) {
        self.global = Some(global);
    }

    /// Append a queue record. Returns `true` if its queue pair number was
    /// not seen before.
    pub fn record_qp(&mut self, record: QpMetadata) -> bool {
        self.qp_records.push(record);
        if self.qpns.contains(&record.qpn) {
            return false;
        }
        self.qpns.push(record.qpn);
        true
    }

    /// Mark intake complete.
    pub fn mark_ready(&mut self) {
        self.ready = true;
    }

    /// Drop `connection` and mark the endpoint disconnected.
    ///
    /// Does nothing if a newer connection has since attached to this role.
    /// Returns whether the endpoint was detached.
    pub fn detach(&mut self, connection: &PeerWriter) -> bool {
        if self.connection.as_ref().is_some_and(|current| !Arc::ptr_eq(current, connection)) {
            return false;
        }
        self.connection = None;
        self.disconnected = true;
        true
    }

    /// Queue pair number at `index` in the deduplicated list.
    pub fn qpn_at(&self, index: usize) -> Option<Qpn> {
        self.qpns.get(index).copied()
    }

    /// One memory-region descriptor per queue record.
    pub fn memory_regions(&self) -> Vec<MrMetadata> {
        self.qp_records.iter().map(|r| MrMetadata { addr: r.addr, rkey: r.rkey }).collect()
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("role", &self.role)
            .field("global", &self.global)
            .field("qp_records", &self.qp_records)
            .field("qpns", &self.qpns)
            .field("ready", &self.ready)
            .field("disconnected", &self.disconnected)
            .field("connected", &self.connection.is_some())
            .finish()
    }
}

/// The two endpoints, keyed by role.
#[derive(Debug)]
pub struct EndpointTable {
    server: Endpoint,
    client: Endpoint,
}

impl Default for EndpointTable {
    fn default() -> Self {
        Self::new()
    }
}

impl EndpointTable {
    /// Fresh table with both endpoints empty.
    pub fn new() -> Self {
        Self { server: Endpoint::new(Role::Server), client: Endpoint::new(Role::Client) }
    }

    /// Endpoint for `role`.
    pub fn get(&self, role: Role) -> &Endpoint {
        match role {
            Role::Server => &self.server,
            Role::Client => &self.client,
        }
    }

    /// Mutable endpoint for `role`.
    pub fn get_mut(&mut self, role: Role) -> &mut Endpoint {
        match role {
            Role::Server => &mut self.server,
            Role::Client => &mut self.client,
        }
    }

    /// Whether both endpoints have completed intake.
    pub fn both_ready(&self) -> bool {
        self.server.ready && self.client.ready
    }

    /// Whether both endpoints have disconnected.
    pub fn both_disconnected(&self) -> bool {
        self.server.disconnected && self.client.disconnected
    }
}
