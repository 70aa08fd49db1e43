// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound half of an agent connection.

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::events::PushEvent;

/// Identifies one accepted connection.
pub type ConnectionId = u64;

/// Sends serialized lines to one agent connection's writer task.
///
/// Pushes are fire-and-forget: a closed connection just drops them.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    connection: ConnectionId,
    tx: mpsc::UnboundedSender<String>,
}

impl SessionHandle {
    pub fn new(connection: ConnectionId, tx: mpsc::UnboundedSender<String>) -> Self {
        Self { connection, tx }
    }

    /// A handle plus the receiver its writer task drains.
    pub fn channel(connection: ConnectionId) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(connection, tx), rx)
    }

    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    pub fn push(&self, event: &PushEvent) {
        self.send_json(event);
    }

    /// Serializes `value` as one line and queues it for the writer.
    pub fn send_json<T: Serialize>(&self, value: &T) {
        match serde_json::to_string(value) {
            Ok(line) => {
                if self.tx.send(line).is_err() {
                    debug!(connection = self.connection, "dropping push to closed connection");
                }
            }
            Err(e) => error!(error = %e, "failed to serialize outbound line"),
        }
    }
}
