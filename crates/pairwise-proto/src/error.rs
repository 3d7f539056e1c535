//! Protocol errors.

use thiserror::Error;

/// Errors decoding or exchanging rendezvous messages.
///
/// All of these are fatal for the connection they occur on and never for the
/// controller as a whole.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Line is not a JSON object of a known message type.
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),

    /// Message decoded but is not valid at this point of the exchange.
    #[error("unexpected {kind} message during {phase}")]
    UnexpectedMessage {
        /// Wire name of the offending message
        kind: &'static str,
        /// Exchange phase it arrived in
        phase: &'static str,
    },

    /// Queue metadata arrived before any `global_metadata` fixed the role.
    #[error("role not declared before {0}")]
    RoleNotDeclared(&'static str),

    /// Peer closed the connection before the end of a burst.
    #[error("connection closed mid-burst")]
    ConnectionClosed,

    /// Socket I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
