//! TCP test peer.

use std::net::SocketAddr;

use pairwise_proto::{
    ControllerMessage, GlobalMetadata, LineReader, MrMetadata, PairRequest, Pairing, PeerMessage,
    ProtocolError, QpMetadata, Qpn, Role, write_burst,
};
use tokio::{
    io::{AsyncWriteExt, BufReader},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
};

/// What the controller hands a peer at the end of the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    /// The other peer's addressing.
    pub peer: GlobalMetadata,
    /// Server memory regions, one per server queue record. Empty for the
    /// server role.
    pub regions: Vec<MrMetadata>,
}

/// A peer connection to a rendezvous controller.
pub struct PeerClient {
    reader: LineReader<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl PeerClient {
    /// Connect to the controller at `addr`.
    pub async fn connect(addr: SocketAddr) -> Result<Self, ProtocolError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let (reader, writer) = stream.into_split();
        Ok(Self { reader: LineReader::new(BufReader::new(reader)), writer })
    }

    /// Send `messages` as one burst.
    pub async fn send_burst(&mut self, messages: &[PeerMessage]) -> Result<(), ProtocolError> {
        write_burst(&mut self.writer, messages).await
    }

    /// Send bytes as-is, bypassing the codec.
    pub async fn send_raw(&mut self, bytes: &[u8]) -> Result<(), ProtocolError> {
        self.writer.write_all(bytes).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Receive one burst from the controller.
    pub async fn recv_burst(&mut self) -> Result<Vec<ControllerMessage>, ProtocolError> {
        self.reader.read_burst().await
    }

    /// Declare `global` and `qps`, then wait for the controller's reply.
    ///
    /// Blocks until the other peer has also completed intake. A client
    /// receives two bursts (peer addressing, then memory regions), a server
    /// one.
    pub async fn handshake(
        &mut self,
        global: GlobalMetadata,
        qps: &[QpMetadata],
    ) -> Result<Handshake, ProtocolError> {
        let role = global.role;
        let mut intake = vec![PeerMessage::GlobalMetadata(global)];
        intake.extend(qps.iter().copied().map(PeerMessage::QpMetadata));
        self.send_burst(&intake).await?;

        let peer = match self.recv_burst().await?.as_slice() {
            [ControllerMessage::GlobalMetadata(peer)] => peer.clone(),
            [other, ..] => return Err(unexpected(other, "handshake")),
            [] => return Err(ProtocolError::UnexpectedMessage { kind: "END", phase: "handshake" }),
        };

        let regions = match role {
            Role::Server => Vec::new(),
            Role::Client => self
                .recv_burst()
                .await?
                .iter()
                .map(|msg| match msg {
                    ControllerMessage::MrMetadata(region) => Ok(*region),
                    other => Err(unexpected(other, "handshake")),
                })
                .collect::<Result<_, _>>()?,
        };

        tracing::debug!(%role, peer_role = %peer.role, regions = regions.len(), "handshake done");
        Ok(Handshake { peer, regions })
    }

    /// Ask for the server queue at `remote_qp_index` to be paired with
    /// `local_qpn`. Does not wait for a reply.
    pub async fn request_pair(
        &mut self,
        local_qpn: Qpn,
        remote_qp_index: usize,
    ) -> Result<(), ProtocolError> {
        let request = PeerMessage::PairRequest(PairRequest { local_qpn, remote_qp_index });
        self.send_burst(&[request]).await
    }

    /// Receive one brokered pairing.
    pub async fn recv_pairing(&mut self) -> Result<Pairing, ProtocolError> {
        match self.recv_burst().await?.as_slice() {
            [ControllerMessage::Pair(pairing)] => Ok(*pairing),
            [other, ..] => Err(unexpected(other, "pairing")),
            [] => Err(ProtocolError::UnexpectedMessage { kind: "END", phase: "pairing" }),
        }
    }

    /// Half-close the connection and drop it.
    pub async fn close(mut self) -> Result<(), ProtocolError> {
        self.writer.shutdown().await?;
        Ok(())
    }
}

fn unexpected(msg: &ControllerMessage, phase: &'static str) -> ProtocolError {
    ProtocolError::UnexpectedMessage { kind: msg.kind(), phase }
}
