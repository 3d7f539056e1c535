//! Per-connection handler.
//!
//! Flow for one connection:
//!
//! 1. Intake: read peer messages until `END`. The first `global_metadata`
//!    fixes the connection's role; `qp_metadata` lines add queue records.
//! 2. Mark the endpoint ready and wait for the other endpoint to be ready.
//! 3. Send the other peer's global metadata. A client additionally gets one
//!    `mr_metadata` per server queue record.
//! 4. Client: serve `pair_request`s until the peer hangs up. Server: read
//!    and discard until the peer hangs up.
//! 5. Detach the endpoint, marking it disconnected.
//!
//! Any protocol error ends this connection only.

use std::{sync::Arc, time::Duration};

use pairwise_proto::{
    ControllerMessage, Line, LineReader, PairRequest, Pairing, PeerMessage, ProtocolError, Role,
    write_burst,
};
use tokio::{
    io::{AsyncBufRead, AsyncRead, AsyncWrite, BufReader},
    sync::Mutex,
    time::timeout,
};

use crate::{endpoint::PeerWriter, error::ControllerError, state::SharedState};

/// Upper bound on pushing a mirrored pairing to a server that is not reading.
const MIRROR_TIMEOUT: Duration = Duration::from_secs(1);

/// Drive one peer connection to completion.
pub async fn handle_connection<R, W>(
    reader: R,
    writer: W,
    state: Arc<SharedState>,
) -> Result<(), ControllerError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Send + Unpin + 'static,
{
    let writer: PeerWriter = Arc::new(Mutex::new(Box::new(writer)));
    let mut lines = LineReader::new(BufReader::new(reader));

    let mut fixed_role = None;
    let role = match intake(&mut lines, &state, &writer, &mut fixed_role).await {
        Ok(role) => role,
        Err(e) => {
            if let Some(role) = fixed_role {
                state.update(|t| t.get_mut(role).detach(&writer)).await;
            }
            return Err(e.into());
        },
    };

    let result = serve(role, &mut lines, &state, &writer).await;

    if state.update(|t| t.get_mut(role).detach(&writer)).await {
        tracing::info!(%role, "endpoint disconnected");
    } else {
        tracing::info!(%role, "superseded connection closed");
    }

    result
}

/// Read the intake burst. Returns the connection's role.
///
/// `fixed_role` is set as soon as the role is known so the caller can clean
/// up if intake fails part way.
async fn intake<R: AsyncBufRead + Unpin>(
    lines: &mut LineReader<R>,
    state: &SharedState,
    writer: &PeerWriter,
    fixed_role: &mut Option<Role>,
) -> Result<Role, ProtocolError> {
    loop {
        let line = lines.next_line::<PeerMessage>().await?.ok_or(ProtocolError::ConnectionClosed)?;

        match line {
            Line::End => break,
            Line::Message(PeerMessage::GlobalMetadata(global)) => match *fixed_role {
                None => {
                    let role = global.role;
                    *fixed_role = Some(role);
                    tracing::info!(%role, lid = global.lid, gid = %global.gid, "role declared");
                    state.update(|t| t.get_mut(role).attach(global, Arc::clone(writer))).await;
                },
                Some(role) if role == global.role => {
                    state.update(|t| t.get_mut(role).set_global(global)).await;
                },
                Some(role) => {
                    tracing::warn!(
                        %role,
                        claimed = %global.role,
                        "ignoring global_metadata for another role"
                    );
                },
            },
            Line::Message(PeerMessage::QpMetadata(record)) => {
                let role = fixed_role.ok_or(ProtocolError::RoleNotDeclared("qp_metadata"))?;
                let fresh = state.update(|t| t.get_mut(role).record_qp(record)).await;
                tracing::debug!(%role, qpn = record.qpn, rkey = record.rkey, fresh, "queue record");
            },
            Line::Message(msg @ PeerMessage::PairRequest(_)) => {
                return Err(ProtocolError::UnexpectedMessage { kind: msg.kind(), phase: "intake" });
            },
        }
    }

    fixed_role.ok_or(ProtocolError::RoleNotDeclared("end of intake"))
}

/// Everything after intake: readiness gate, metadata forwarding, then the
/// role-specific read loop.
async fn serve<R: AsyncBufRead + Unpin>(
    role: Role,
    lines: &mut LineReader<R>,
    state: &SharedState,
    writer: &PeerWriter,
) -> Result<(), ControllerError> {
    state.update(|t| t.get_mut(role).mark_ready()).await;
    tracing::info!(%role, "endpoint ready, waiting for {}", role.peer());

    state.wait_until(|t| t.get(role.peer()).is_ready()).await;

    let (peer_global, regions) = state
        .read(|t| {
            let regions = match role {
                Role::Client => Some(t.get(Role::Server).memory_regions()),
                Role::Server => None,
            };
            (t.get(role.peer()).global().cloned(), regions)
        })
        .await;

    let peer_global = peer_global.ok_or_else(|| {
        ControllerError::Internal(format!("{} ready without global metadata", role.peer()))
    })?;

    {
        let mut out = writer.lock().await;
        write_burst(&mut *out, &[ControllerMessage::GlobalMetadata(peer_global)]).await?;

        if let Some(regions) = regions {
            let messages: Vec<_> = regions.into_iter().map(ControllerMessage::MrMetadata).collect();
            write_burst(&mut *out, &messages).await?;
            tracing::debug!(%role, regions = messages.len(), "memory regions forwarded");
        }
    }

    tracing::info!(%role, "peer metadata forwarded");

    match role {
        Role::Client => serve_pair_requests(lines, state, writer).await,
        Role::Server => drain(role, lines).await,
    }
}

/// Client service loop: resolve pairing requests until the peer hangs up.
async fn serve_pair_requests<R: AsyncBufRead + Unpin>(
    lines: &mut LineReader<R>,
    state: &SharedState,
    writer: &PeerWriter,
) -> Result<(), ControllerError> {
    loop {
        match lines.next_line::<PeerMessage>().await? {
            None => return Ok(()),
            Some(Line::End) => {},
            Some(Line::Message(PeerMessage::PairRequest(request))) => {
                broker_pairing(request, state, writer).await?;
            },
            Some(Line::Message(msg)) => {
                tracing::warn!(kind = msg.kind(), "unexpected message from client after handshake");
                return Err(
                    ProtocolError::UnexpectedMessage { kind: msg.kind(), phase: "pairing" }.into()
                );
            },
        }
    }
}

/// Resolve one pairing request against the server's queue list.
///
/// Out-of-range indices are dropped without a reply. On success the client
/// gets the pairing, and the server, if still connected, gets the mirrored
/// pairing with no acknowledgment or retry. A push that does not complete
/// within [`MIRROR_TIMEOUT`] is abandoned.
async fn broker_pairing(
    request: PairRequest,
    state: &SharedState,
    writer: &PeerWriter,
) -> Result<(), ControllerError> {
    let (remote_qpn, known, server_connection) = state
        .read(|t| {
            let server = t.get(Role::Server);
            (server.qpn_at(request.remote_qp_index), server.qpns().len(), server.connection())
        })
        .await;

    let Some(remote_qpn) = remote_qpn else {
        tracing::warn!(
            local_qpn = request.local_qpn,
            index = request.remote_qp_index,
            known,
            "dropping pair request: remote index out of range"
        );
        return Ok(());
    };

    let pairing = Pairing { local_qpn: request.local_qpn, remote_qpn };
    write_burst(&mut *writer.lock().await, &[ControllerMessage::Pair(pairing)]).await?;

    if let Some(server) = server_connection {
        let mirrored = ControllerMessage::Pair(pairing.mirrored());
        let push = async { write_burst(&mut *server.lock().await, &[mirrored]).await };
        match timeout(MIRROR_TIMEOUT, push).await {
            Ok(Ok(())) => {},
            Ok(Err(e)) => tracing::warn!(error = %e, "failed to push mirrored pairing to server"),
            Err(_) => tracing::warn!(
                timeout_ms = MIRROR_TIMEOUT.as_millis() as u64,
                "mirrored pairing push timed out"
            ),
        }
    }

    tracing::info!(
        client_qpn = pairing.local_qpn,
        server_qpn = pairing.remote_qpn,
        "pair brokered"
    );
    Ok(())
}

/// Read and discard until the peer hangs up.
async fn drain<R: AsyncBufRead + Unpin>(
    role: Role,
    lines: &mut LineReader<R>,
) -> Result<(), ControllerError> {
    while let Some(line) = lines.next_line::<PeerMessage>().await? {
        if let Line::Message(msg) = line {
            tracing::warn!(%role, kind = msg.kind(), "discarding message after handshake");
        }
    }
    Ok(())
}
