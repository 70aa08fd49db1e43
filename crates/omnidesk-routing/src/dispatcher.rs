// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook payload dispatch.

use omnidesk_core::{ChannelType, OmnideskError};
use tracing::{debug, warn};

use crate::engine::{IngestOutcome, RoutingEngine};

/// Result of dispatching one webhook. Never surfaced to the provider: every
/// outcome is acknowledged the same way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Ingested(IngestOutcome),
    /// The payload parsed but carried nothing routable.
    Ignored,
    UnknownChannel,
    Malformed,
    /// Ingestion started but a storage or channel call failed.
    Failed,
}

/// Routes raw webhook bodies to the matching channel adapter and the engine.
#[derive(Clone)]
pub struct ChannelDispatcher {
    engine: RoutingEngine,
}

impl ChannelDispatcher {
    pub fn new(engine: RoutingEngine) -> Self {
        Self { engine }
    }

    pub async fn dispatch(&self, path: &str, body: &[u8]) -> DispatchOutcome {
        let Some(channel) = ChannelType::from_path_prefix(path) else {
            debug!(path, "webhook for unknown channel prefix");
            return DispatchOutcome::UnknownChannel;
        };
        let Some(adapter) = self.engine.channel(channel) else {
            debug!(%channel, "webhook for channel without adapter");
            return DispatchOutcome::UnknownChannel;
        };

        let event = match adapter.parse_inbound(body) {
            Ok(Some(event)) => event,
            Ok(None) => return DispatchOutcome::Ignored,
            Err(e) => {
                debug!(%channel, error = %e, "dropping malformed webhook");
                return DispatchOutcome::Malformed;
            }
        };

        match self.engine.ingest(channel, event).await {
            Ok(outcome) => DispatchOutcome::Ingested(outcome),
            Err(e) => {
                log_failure(channel, &e);
                DispatchOutcome::Failed
            }
        }
    }
}

fn log_failure(channel: ChannelType, err: &OmnideskError) {
    warn!(%channel, error = %err, "webhook ingestion abandoned");
}
