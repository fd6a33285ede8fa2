//! Per-vehicle connection task.
//!
//! [`serve_session`] owns one bidirectional byte stream. It registers a fresh
//! [`VehicleSession`], spawns a writer that drains the session's outbound
//! queue onto the stream, then reads newline-delimited messages until the
//! vehicle hangs up. On exit the session is unregistered before anything
//! else, so no later match can select it. The writer then flushes every
//! message queued before that point and closes its half of the stream.
//! A vehicle that half-closes right after pipelining still gets every reply.
//!
//! The stream type is generic. Production hands in QUIC stream halves, tests
//! use `tokio::io::duplex`.

use std::{sync::Arc, time::Duration};

use fleetline_core::Environment;
use fleetline_proto::{MAX_MESSAGE_LEN, OutboundMessage, ProtocolError};
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader},
    sync::{mpsc, oneshot},
};

use crate::{error::ServerError, handler, registry::FleetRegistry, session::VehicleSession};

/// Longest the writer may spend flushing queued messages after the vehicle
/// hangs up.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Serve one vehicle until it disconnects.
///
/// Returns `Ok` on a clean hang-up. Registry refusals, oversized lines and
/// read failures end the session with an error after cleanup.
pub async fn serve_session<R, W, E>(
    reader: R,
    writer: W,
    fleet: Arc<FleetRegistry>,
    env: E,
) -> Result<(), ServerError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
    E: Environment,
{
    let (session, outbound) = VehicleSession::new(env.session_id(), env.wall_clock_secs());
    let session = Arc::new(session);
    let session_id = session.id();

    if let Err(e) = fleet.register(Arc::clone(&session)) {
        tracing::warn!(session_id, error = %e, "refusing vehicle session");
        return Err(e.into());
    }
    tracing::info!(session_id, fleet_size = fleet.len(), "vehicle connected");

    let (close_tx, close_rx) = oneshot::channel();
    let mut writer_task = tokio::spawn(write_outbound(writer, outbound, close_rx, session_id));
    let result = read_inbound(reader, &session).await;

    fleet.unregister(session_id);
    let _ = close_tx.send(());
    if tokio::time::timeout(DRAIN_TIMEOUT, &mut writer_task).await.is_err() {
        tracing::warn!(session_id, "vehicle not reading, dropping unsent messages");
        writer_task.abort();
    }

    match &result {
        Ok(()) => tracing::info!(session_id, fleet_size = fleet.len(), "vehicle disconnected"),
        Err(e) => tracing::warn!(session_id, error = %e, "vehicle session ended"),
    }
    result
}

/// Read lines and answer each one through the session's queue.
async fn read_inbound<R: AsyncRead + Unpin>(
    reader: R,
    session: &VehicleSession,
) -> Result<(), ServerError> {
    let mut reader = BufReader::new(reader);
    let mut line = Vec::with_capacity(256);

    loop {
        line.clear();
        let read = (&mut reader)
            .take(MAX_MESSAGE_LEN as u64 + 1)
            .read_until(b'\n', &mut line)
            .await?;
        if read == 0 {
            return Ok(());
        }
        if line.last() != Some(&b'\n') && line.len() > MAX_MESSAGE_LEN {
            return Err(ProtocolError::MessageTooLarge { size: line.len(), max: MAX_MESSAGE_LEN }
                .into());
        }

        let raw = String::from_utf8_lossy(&line);
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        let reply = handler::handle_message(session, raw);
        if session.reply(reply).await.is_err() {
            // Writer is gone, the vehicle can no longer hear us.
            return Ok(());
        }
    }
}

/// Drain the outbound queue onto the stream, one line per message.
///
/// Once `closing` fires the queue stops accepting messages, whatever is
/// already in it is written, and the stream is shut down.
async fn write_outbound<W: AsyncWrite + Unpin>(
    mut writer: W,
    mut outbound: mpsc::Receiver<OutboundMessage>,
    mut closing: oneshot::Receiver<()>,
    session_id: u64,
) {
    loop {
        let next = tokio::select! {
            biased;
            next = outbound.recv() => next,
            _ = &mut closing => break,
        };
        let Some(message) = next else { break };
        if let Err(e) = write_line(&mut writer, &message, session_id).await {
            tracing::debug!(session_id, error = %e, "write failed, closing outbound queue");
            return;
        }
    }

    outbound.close();
    while let Some(message) = outbound.recv().await {
        if let Err(e) = write_line(&mut writer, &message, session_id).await {
            tracing::debug!(session_id, error = %e, "write failed while draining");
            return;
        }
    }

    let _ = writer.shutdown().await;
}

async fn write_line<W: AsyncWrite + Unpin>(
    writer: &mut W,
    message: &OutboundMessage,
    session_id: u64,
) -> std::io::Result<()> {
    match message.encode_line() {
        Ok(line) => {
            writer.write_all(line.as_bytes()).await?;
            writer.flush().await
        },
        Err(e) => {
            tracing::error!(session_id, error = %e, "failed to encode outbound message");
            Ok(())
        },
    }
}
