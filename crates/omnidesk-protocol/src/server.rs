// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! TCP accept loop and per-connection tasks.

use std::sync::atomic::{AtomicU64, Ordering};

use omnidesk_config::model::ProtocolConfig;
use omnidesk_core::OmnideskError;
use omnidesk_routing::{ConnectionId, RoutingEngine, SessionHandle};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::handler::CommandHandler;

static NEXT_CONNECTION: AtomicU64 = AtomicU64::new(1);

/// Binds the configured address and serves until `cancel` fires.
pub async fn start_server(
    config: &ProtocolConfig,
    engine: RoutingEngine,
    cancel: CancellationToken,
) -> Result<(), OmnideskError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| OmnideskError::Internal(format!("failed to bind agent protocol to {addr}: {e}")))?;
    info!("agent protocol listening on {addr}");
    serve(listener, engine, cancel).await
}

/// Accepts agent connections on `listener`.
pub async fn serve(
    listener: TcpListener,
    engine: RoutingEngine,
    cancel: CancellationToken,
) -> Result<(), OmnideskError> {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let connection = NEXT_CONNECTION.fetch_add(1, Ordering::Relaxed);
                    debug!(connection, %peer, "agent connection accepted");
                    tokio::spawn(handle_connection(stream, connection, engine.clone(), cancel.clone()));
                }
                Err(e) => warn!(error = %e, "accept failed"),
            },
        }
    }
    debug!("agent protocol server stopped");
    Ok(())
}

async fn handle_connection(
    stream: TcpStream,
    connection: ConnectionId,
    engine: RoutingEngine,
    cancel: CancellationToken,
) {
    let (read_half, write_half) = stream.into_split();
    let (session, outbound) = SessionHandle::channel(connection);
    let writer = tokio::spawn(write_loop(write_half, outbound));

    let mut handler = CommandHandler::new(engine.clone(), session.clone());
    let mut reader = BufReader::new(read_half);
    let mut line = String::new();

    loop {
        line.clear();
        tokio::select! {
            _ = cancel.cancelled() => break,
            read = reader.read_line(&mut line) => match read {
                Ok(0) => break,
                Ok(_) => {
                    let command = line.trim();
                    if command.is_empty() {
                        continue;
                    }
                    let reply = handler.handle_line(command).await;
                    session.send_json(&reply);
                }
                Err(e) => {
                    debug!(connection, error = %e, "agent connection read failed");
                    break;
                }
            },
        }
    }

    if let Some(agent) = handler.agent() {
        engine.disconnect(agent, connection).await;
    }
    debug!(connection, "agent connection closed");
    // Lines still queued are for a connection that is going away.
    writer.abort();
}

/// Writes queued lines (replies and pushes) in order.
async fn write_loop(mut writer: OwnedWriteHalf, mut outbound: mpsc::UnboundedReceiver<String>) {
    while let Some(line) = outbound.recv().await {
        if let Err(e) = write_line(&mut writer, &line).await {
            debug!(error = %e, "agent connection write failed");
            break;
        }
    }
}

async fn write_line(writer: &mut OwnedWriteHalf, line: &str) -> std::io::Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}
