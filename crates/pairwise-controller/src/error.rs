//! Controller error types.

use std::fmt;

use pairwise_proto::ProtocolError;

/// Errors that can occur in the controller.
#[derive(Debug)]
pub enum ControllerError {
    /// Configuration error (invalid bind address).
    ///
    /// Fatal at startup. Fix configuration and restart.
    Config(String),

    /// Transport/network error (bind failure, accept failure).
    ///
    /// Bind failures are fatal; accept failures are logged and the accept
    /// loop continues.
    Transport(String),

    /// Protocol error on one connection (malformed line, unexpected message,
    /// peer hung up mid-burst).
    ///
    /// Fatal for that connection only. The controller keeps serving the
    /// other peer.
    Protocol(ProtocolError),

    /// Internal error (endpoint table in an impossible state).
    ///
    /// Indicates a bug.
    Internal(String),
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
            Self::Protocol(err) => write!(f, "protocol error: {err}"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for ControllerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Protocol(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ProtocolError> for ControllerError {
    fn from(err: ProtocolError) -> Self {
        Self::Protocol(err)
    }
}

impl From<std::io::Error> for ControllerError {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
