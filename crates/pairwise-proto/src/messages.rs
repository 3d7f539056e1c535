//! Rendezvous messages.
//!
//! Every message is one JSON object on one line with a `type` field naming
//! the variant. Inbound and outbound directions are separate closed enums:
//! a peer can only send [`PeerMessage`] variants and only ever receives
//! [`ControllerMessage`] variants. An unknown `type` fails to decode instead
//! of being skipped, so protocol drift surfaces immediately.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Queue pair number.
pub type Qpn = u32;

/// Which side of the connection a peer plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Passive side; its queue records are handed to the client.
    Server,
    /// Active side; issues pairing requests against the server's queues.
    Client,
}

impl Role {
    /// The other role.
    pub fn peer(self) -> Self {
        match self {
            Self::Server => Self::Client,
            Self::Client => Self::Server,
        }
    }

    /// Lowercase wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Server => "server",
            Self::Client => "client",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Link-layer addressing of one peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalMetadata {
    /// Role the peer claims.
    pub role: Role,
    /// Local identifier (link-layer id).
    pub lid: u32,
    /// Global identifier, textual form.
    pub gid: String,
}

/// One queue record: a queue pair plus the remote-access key and address of
/// a memory region registered alongside it.
///
/// A queue pair with several memory regions is reported once per region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QpMetadata {
    /// Queue pair number.
    pub qpn: Qpn,
    /// Memory region base address.
    pub addr: u64,
    /// Memory region remote key.
    pub rkey: u32,
}

/// Request to pair one of the client's queues with one of the server's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairRequest {
    /// Requesting peer's own queue pair.
    pub local_qpn: Qpn,
    /// Index into the server's deduplicated queue list.
    pub remote_qp_index: usize,
}

/// Memory region the client may target on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MrMetadata {
    /// Memory region base address.
    pub addr: u64,
    /// Memory region remote key.
    pub rkey: u32,
}

/// A brokered pairing, from the receiver's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pairing {
    /// Receiver's queue pair.
    pub local_qpn: Qpn,
    /// Queue pair on the other peer.
    pub remote_qpn: Qpn,
}

impl Pairing {
    /// The same pairing as seen from the other peer.
    pub fn mirrored(self) -> Self {
        Self { local_qpn: self.remote_qpn, remote_qpn: self.local_qpn }
    }
}

/// Messages a peer sends to the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PeerMessage {
    /// Declares the peer's role and addressing. The first one on a
    /// connection fixes the role for the connection's lifetime.
    GlobalMetadata(GlobalMetadata),
    /// Adds one queue record.
    QpMetadata(QpMetadata),
    /// Asks for a pairing (client role, after the handshake).
    PairRequest(PairRequest),
}

impl PeerMessage {
    /// Wire name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GlobalMetadata(_) => "global_metadata",
            Self::QpMetadata(_) => "qp_metadata",
            Self::PairRequest(_) => "pair_request",
        }
    }
}

/// Messages the controller sends to a peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControllerMessage {
    /// The other peer's addressing.
    GlobalMetadata(GlobalMetadata),
    /// One of the server's memory regions (client role only).
    MrMetadata(MrMetadata),
    /// A brokered pairing.
    Pair(Pairing),
}

impl ControllerMessage {
    /// Wire name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GlobalMetadata(_) => "global_metadata",
            Self::MrMetadata(_) => "mr_metadata",
            Self::Pair(_) => "pair",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_messages_decode_by_type_tag() {
        let line = r#"{"type":"global_metadata","role":"client","lid":7,"gid":"fe80::1"}"#;
        let msg: PeerMessage = serde_json::from_str(line).unwrap();
        assert_eq!(
            msg,
            PeerMessage::GlobalMetadata(GlobalMetadata {
                role: Role::Client,
                lid: 7,
                gid: "fe80::1".to_string()
            })
        );

        let line = r#"{"type":"qp_metadata","qpn":17,"addr":4096,"rkey":99}"#;
        let msg: PeerMessage = serde_json::from_str(line).unwrap();
        assert_eq!(msg, PeerMessage::QpMetadata(QpMetadata { qpn: 17, addr: 4096, rkey: 99 }));

        let msg: PeerMessage =
            serde_json::from_str(r#"{"type":"pair_request","local_qpn":5,"remote_qp_index":1}"#)
                .unwrap();
        assert_eq!(msg.kind(), "pair_request");
    }

    #[test]
    fn unknown_type_is_rejected() {
        let result = serde_json::from_str::<PeerMessage>(r#"{"type":"bye","qpn":1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn outbound_kinds_do_not_decode_as_inbound() {
        let line = r#"{"type":"mr_metadata","addr":1,"rkey":2}"#;
        let result = serde_json::from_str::<PeerMessage>(line);
        assert!(result.is_err());
    }

    #[test]
    fn pair_encodes_with_type_tag() {
        let json =
            serde_json::to_string(&ControllerMessage::Pair(Pairing { local_qpn: 5, remote_qpn: 9 }))
                .unwrap();
        assert_eq!(json, r#"{"type":"pair","local_qpn":5,"remote_qpn":9}"#);
    }

    #[test]
    fn mirrored_pairing_swaps_sides() {
        let pairing = Pairing { local_qpn: 5, remote_qpn: 9 };
        assert_eq!(pairing.mirrored(), Pairing { local_qpn: 9, remote_qpn: 5 });
        assert_eq!(pairing.mirrored().mirrored(), pairing);
    }

    #[test]
    fn role_peer_is_involution() {
        assert_eq!(Role::Server.peer(), Role::Client);
        assert_eq!(Role::Client.peer().peer(), Role::Client);
    }
}
