//! Rendezvous controller.
//!
//! Brokers out-of-band connection-setup metadata between exactly two peers,
//! a "server" and a "client". Each peer connects over TCP, declares its
//! role, addressing and queue records, and is held at a readiness gate until
//! the other peer has done the same. The controller then hands each peer the
//! other's metadata and, for the client, keeps brokering pairing requests
//! against the server's queue list.
//!
//! # Architecture
//!
//! - [`Controller`]: accept loop plus disconnect monitor
//! - [`handle_connection`]: one task per inbound connection
//! - [`EndpointTable`]: the two role-keyed [`Endpoint`] records
//! - [`SharedState`]: mutex-guarded table with change notification
//!
//! The controller stops once both endpoints report disconnected. There is
//! no graceful drain: in-flight handler tasks are dropped with the runtime.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod endpoint;
mod error;
mod handler;
mod state;

use std::{net::SocketAddr, sync::Arc};

pub use endpoint::{Endpoint, EndpointTable, PeerWriter};
pub use error::ControllerError;
pub use handler::handle_connection;
pub use state::SharedState;
use tokio::net::TcpListener;

/// Controller configuration.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Address to bind to (e.g., "0.0.0.0:12345")
    pub bind_address: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self { bind_address: "0.0.0.0:12345".to_string() }
    }
}

/// Rendezvous controller bound to a TCP listener.
pub struct Controller {
    listener: TcpListener,
    state: Arc<SharedState>,
}

impl Controller {
    /// Bind the listener.
    pub async fn bind(config: ControllerConfig) -> Result<Self, ControllerError> {
        let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
            ControllerError::Config(format!("invalid bind address '{}': {e}", config.bind_address))
        })?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ControllerError::Transport(format!("failed to bind {addr}: {e}")))?;

        Ok(Self { listener, state: Arc::new(SharedState::new()) })
    }

    /// Local address the controller is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ControllerError> {
        self.listener
            .local_addr()
            .map_err(|e| ControllerError::Transport(format!("failed to get local address: {e}")))
    }

    /// Shared endpoint state, for inspection.
    pub fn state(&self) -> Arc<SharedState> {
        Arc::clone(&self.state)
    }

    /// Accept connections until both endpoints have disconnected.
    pub async fn run(self) -> Result<(), ControllerError> {
        tracing::info!("Controller listening on {}", self.local_addr()?);

        let state = Arc::clone(&self.state);
        let monitor = state.wait_until(EndpointTable::both_disconnected);
        tokio::pin!(monitor);

        loop {
            tokio::select! {
                () = &mut monitor => {
                    tracing::info!("both endpoints disconnected, shutting down");
                    return Ok(());
                },
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer_addr)) => {
                        tracing::debug!(%peer_addr, "connection accepted");
                        if let Err(e) = stream.set_nodelay(true) {
                            tracing::debug!(%peer_addr, "set_nodelay failed: {}", e);
                        }

                        let (reader, writer) = stream.into_split();
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(reader, writer, state).await {
                                tracing::warn!(%peer_addr, "connection ended: {}", e);
                            }
                        });
                    },
                    Err(e) => {
                        tracing::error!("Accept error: {}", e);
                    },
                },
            }
        }
    }
}
