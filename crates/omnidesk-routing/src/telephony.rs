// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bridge from PBX manager events to the routing engine.

use std::sync::Arc;
use std::time::Duration;

use omnidesk_core::{ManagerEvent, OmnideskError, TelephonyConnector, TelephonySession};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::RoutingEngine;

/// Consumes one manager session at a time and reconnects forever at a
/// fixed interval when the transport drops.
pub struct TelephonyBridge {
    engine: RoutingEngine,
    connector: Arc<dyn TelephonyConnector>,
    reconnect_interval: Duration,
}

impl TelephonyBridge {
    pub fn new(
        engine: RoutingEngine,
        connector: Arc<dyn TelephonyConnector>,
        reconnect_interval: Duration,
    ) -> Self {
        Self {
            engine,
            connector,
            reconnect_interval,
        }
    }

    /// Connects once and spawns the event loop.
    ///
    /// A failure here (including a refused login) is returned to the caller,
    /// which treats it as fatal. Later transport failures are retried.
    pub async fn start(self, cancel: CancellationToken) -> Result<JoinHandle<()>, OmnideskError> {
        let session = self.connector.connect().await?;
        self.engine
            .set_telephony(Some(Arc::clone(&session.actions)))
            .await;
        info!(connector = self.connector.name(), "telephony connected");
        Ok(tokio::spawn(self.run(session, cancel)))
    }

    async fn run(self, mut session: TelephonySession, cancel: CancellationToken) {
        loop {
            let Some(reason) = self.pump(&mut session, &cancel).await else {
                break;
            };
            warn!(reason = %reason, "telephony connection lost");
            self.engine.set_telephony(None).await;

            match self.reconnect(&cancel).await {
                Some(fresh) => {
                    self.engine
                        .set_telephony(Some(Arc::clone(&fresh.actions)))
                        .await;
                    session = fresh;
                }
                None => break,
            }
        }
        self.engine.set_telephony(None).await;
        debug!("telephony bridge stopped");
    }

    /// Handles events until the session fails (`Some(reason)`) or shutdown
    /// is requested (`None`).
    async fn pump(
        &self,
        session: &mut TelephonySession,
        cancel: &CancellationToken,
    ) -> Option<String> {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return None,
                event = session.events.recv() => match event {
                    Some(event) => self.handle_event(&event).await,
                    None => return Some("event stream closed".to_string()),
                },
                err = session.errors.recv() => match err {
                    Some(e) if e.is_telephony_transport() => return Some(e.to_string()),
                    Some(e) => warn!(error = %e, "telephony error"),
                    None => return Some("error stream closed".to_string()),
                },
            }
        }
    }

    async fn reconnect(&self, cancel: &CancellationToken) -> Option<TelephonySession> {
        let mut attempt: u64 = 0;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return None,
                _ = tokio::time::sleep(self.reconnect_interval) => {}
            }
            attempt += 1;
            match self.connector.connect().await {
                Ok(session) => {
                    info!(attempt, "telephony reconnected");
                    return Some(session);
                }
                Err(e) => warn!(attempt, error = %e, "telephony reconnect failed"),
            }
        }
    }

    /// Applies one manager event. Unknown events are ignored.
    pub async fn handle_event(&self, event: &ManagerEvent) {
        let prefix = &self.engine.settings().interface_prefix;
        let agent = extension_from_interface(event.field("Interface"), prefix);
        let caller = event.field("CallerIDNum");

        let result = match event.name.as_str() {
            "AgentCalled" => {
                self.engine
                    .call_ringing(agent, caller, event.field("Uniqueid"))
                    .await
            }
            "AgentConnect" => self.engine.call_connected(agent, caller).await,
            "AgentComplete" => {
                self.engine
                    .call_completed(
                        agent,
                        caller,
                        event.field("Uniqueid"),
                        parse_timestamp_millis(event.field("Timestamp")),
                        parse_number(event.field("TalkTime")),
                    )
                    .await
            }
            _ => return,
        };

        if let Err(e) = result {
            warn!(event = %event.name, agent, error = %e, "telephony event not applied");
        }
    }
}

/// `PJSIP/101` becomes `101`. Interfaces with another technology keep the
/// part after the last `/`.
pub fn extension_from_interface<'a>(interface: &'a str, prefix: &str) -> &'a str {
    interface
        .strip_prefix(prefix)
        .or_else(|| interface.rsplit('/').next())
        .unwrap_or(interface)
}

/// Integer field, 0 when missing or not a number.
fn parse_number(raw: &str) -> i64 {
    raw.trim().parse().unwrap_or(0)
}

/// PBX timestamps are seconds with a fractional part; 0 when unparseable.
fn parse_timestamp_millis(raw: &str) -> i64 {
    raw.trim()
        .parse::<f64>()
        .map(|secs| (secs * 1000.0) as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interface_prefix_is_stripped() {
        assert_eq!(extension_from_interface("PJSIP/101", "PJSIP/"), "101");
        assert_eq!(extension_from_interface("SIP/202", "PJSIP/"), "202");
        assert_eq!(extension_from_interface("303", "PJSIP/"), "303");
    }

    #[test]
    fn numeric_fields_default_to_zero() {
        assert_eq!(parse_number("42"), 42);
        assert_eq!(parse_number(""), 0);
        assert_eq!(parse_number("abc"), 0);
        assert_eq!(parse_timestamp_millis("1700000000.250"), 1_700_000_000_250);
        assert_eq!(parse_timestamp_millis("n/a"), 0);
    }
}
