//! Rendezvous wire protocol.
//!
//! Two peers exchange the raw identifiers they need before any operation can
//! target the remote side: link-layer addressing, queue pair numbers and
//! memory-region keys. The exchange runs over TCP as newline-delimited JSON,
//! grouped into bursts closed by an `END` line.
//!
//! # Messages
//!
//! - Inbound ([`PeerMessage`]): `global_metadata`, `qp_metadata`,
//!   `pair_request`
//! - Outbound ([`ControllerMessage`]): `global_metadata`, `mr_metadata`,
//!   `pair`
//!
//! # Invariants
//!
//! Both directions are closed enums. A line with an unknown `type` is a
//! decode error, never silently dropped.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
mod error;
mod messages;

pub use codec::{Line, LineReader, SENTINEL, decode_line, encode_line, write_burst};
pub use error::ProtocolError;
pub use messages::{
    ControllerMessage, GlobalMetadata, MrMetadata, PairRequest, Pairing, PeerMessage, QpMetadata,
    Qpn, Role,
};
