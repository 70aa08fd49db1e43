// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AMI connector and action handle.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use omnidesk_config::model::TelephonyConfig;
use omnidesk_core::{
    ActionOutcome, AdapterType, HealthStatus, ManagerActions, ManagerEvent, OmnideskError,
    PluginAdapter, TelephonyConnector, TelephonySession,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::packet::{Packet, encode_action, read_packet};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const ACTION_TIMEOUT: Duration = Duration::from_secs(10);
const LOGIN_ACTION_ID: &str = "omnidesk-login";
const EVENT_BUFFER: usize = 256;

type Pending = Arc<DashMap<String, oneshot::Sender<Packet>>>;

/// Connects to one Asterisk manager endpoint.
pub struct AmiConnector {
    address: String,
    username: String,
    secret: String,
    action_timeout: Duration,
}

impl AmiConnector {
    pub fn new(config: &TelephonyConfig) -> Result<Self, OmnideskError> {
        let (Some(username), Some(secret)) = (&config.username, &config.secret) else {
            return Err(OmnideskError::Config(
                "telephony.username and telephony.secret are required".into(),
            ));
        };
        Ok(Self {
            address: format!("{}:{}", config.host, config.port),
            username: username.clone(),
            secret: secret.clone(),
            action_timeout: ACTION_TIMEOUT,
        })
    }

    pub fn with_action_timeout(mut self, timeout: Duration) -> Self {
        self.action_timeout = timeout;
        self
    }

    async fn open(&self) -> Result<(BufReader<OwnedReadHalf>, OwnedWriteHalf), OmnideskError> {
        let stream = tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(&self.address))
            .await
            .map_err(|_| OmnideskError::telephony(format!("connect to {} timed out", self.address)))?
            .map_err(|e| transport(format!("connect to {} failed", self.address), e))?;
        let (read_half, write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        let mut banner = String::new();
        if reader
            .read_line(&mut banner)
            .await
            .map_err(|e| transport("reading banner failed", e))?
            == 0
        {
            return Err(OmnideskError::telephony("manager closed before banner"));
        }
        debug!(banner = banner.trim_end(), "manager banner");
        Ok((reader, write_half))
    }

    async fn login(
        &self,
        reader: &mut BufReader<OwnedReadHalf>,
        writer: &mut OwnedWriteHalf,
    ) -> Result<(), OmnideskError> {
        let request = encode_action(
            "Login",
            LOGIN_ACTION_ID,
            &[("Username", &self.username), ("Secret", &self.secret)],
        );
        writer
            .write_all(request.as_bytes())
            .await
            .map_err(|e| transport("sending login failed", e))?;

        loop {
            let packet = read_packet(reader)
                .await
                .map_err(|e| transport("reading login response failed", e))?
                .ok_or_else(|| OmnideskError::telephony("manager closed during login"))?;
            if packet.action_id() != Some(LOGIN_ACTION_ID) {
                continue;
            }
            if packet.is_success() {
                return Ok(());
            }
            return Err(OmnideskError::TelephonyLogin(
                packet.get("Message").unwrap_or("login refused").to_string(),
            ));
        }
    }
}

fn transport(context: impl Into<String>, err: std::io::Error) -> OmnideskError {
    let context = context.into();
    OmnideskError::Telephony {
        message: format!("{context}: {err}"),
        source: Some(Box::new(err)),
    }
}

#[async_trait]
impl PluginAdapter for AmiConnector {
    fn name(&self) -> &str {
        "asterisk-ami"
    }

    fn version(&self) -> semver::Version {
        semver::Version::parse(env!("CARGO_PKG_VERSION")).unwrap_or(semver::Version::new(0, 1, 0))
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Telephony
    }

    async fn health_check(&self) -> Result<HealthStatus, OmnideskError> {
        match TcpStream::connect(&self.address).await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), OmnideskError> {
        Ok(())
    }
}

#[async_trait]
impl TelephonyConnector for AmiConnector {
    async fn connect(&self) -> Result<TelephonySession, OmnideskError> {
        let (mut reader, mut writer) = self.open().await?;
        self.login(&mut reader, &mut writer).await?;
        info!(address = %self.address, user = %self.username, "manager login accepted");

        let pending: Pending = Arc::new(DashMap::new());
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        let (error_tx, error_rx) = mpsc::channel(4);
        let (outgoing_tx, outgoing_rx) = mpsc::channel(32);

        tokio::spawn(read_loop(
            reader,
            Arc::clone(&pending),
            event_tx,
            error_tx.clone(),
        ));
        tokio::spawn(write_loop(writer, outgoing_rx, error_tx));

        let actions = Arc::new(AmiActions {
            outgoing: outgoing_tx,
            pending,
            next_id: AtomicU64::new(1),
            timeout: self.action_timeout,
        });

        let subscribed = actions.action("Events", &[("EventMask", "on")]).await?;
        if !subscribed.ok {
            warn!(status = %subscribed.status, "manager refused event subscription");
        }

        Ok(TelephonySession {
            actions,
            events: event_rx,
            errors: error_rx,
        })
    }
}

/// Dispatches responses to waiting actions and events to the session.
async fn read_loop(
    mut reader: BufReader<OwnedReadHalf>,
    pending: Pending,
    events: mpsc::Sender<ManagerEvent>,
    errors: mpsc::Sender<OmnideskError>,
) {
    let reason = loop {
        match read_packet(&mut reader).await {
            Ok(Some(packet)) => {
                if let Some(name) = packet.event_name() {
                    let event = ManagerEvent::new(name, packet.fields.iter().map(|(k, v)| (k, v.clone())));
                    if events.send(event).await.is_err() {
                        // Session dropped by its consumer.
                        return;
                    }
                } else if let Some((_, waiter)) =
                    packet.action_id().and_then(|id| pending.remove(id))
                {
                    let _ = waiter.send(packet);
                }
            }
            Ok(None) => break OmnideskError::telephony("manager closed the connection"),
            Err(e) => break transport("manager read failed", e),
        }
    };
    pending.clear();
    let _ = errors.send(reason).await;
}

async fn write_loop(
    mut writer: OwnedWriteHalf,
    mut outgoing: mpsc::Receiver<String>,
    errors: mpsc::Sender<OmnideskError>,
) {
    while let Some(frame) = outgoing.recv().await {
        if let Err(e) = writer.write_all(frame.as_bytes()).await {
            let _ = errors.send(transport("manager write failed", e)).await;
            return;
        }
    }
    let _ = writer.shutdown().await;
}

/// Action handle for one live manager session.
pub struct AmiActions {
    outgoing: mpsc::Sender<String>,
    pending: Pending,
    next_id: AtomicU64,
    timeout: Duration,
}

#[async_trait]
impl ManagerActions for AmiActions {
    async fn action(
        &self,
        name: &str,
        params: &[(&str, &str)],
    ) -> Result<ActionOutcome, OmnideskError> {
        let id = format!("omnidesk-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id.clone(), tx);

        if self
            .outgoing
            .send(encode_action(name, &id, params))
            .await
            .is_err()
        {
            self.pending.remove(&id);
            return Err(OmnideskError::telephony("manager connection closed"));
        }

        let packet = match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(packet)) => packet,
            Ok(Err(_)) => {
                return Err(OmnideskError::telephony(format!(
                    "connection lost before {name} response"
                )));
            }
            Err(_) => {
                self.pending.remove(&id);
                return Err(OmnideskError::telephony(format!("{name} timed out")));
            }
        };

        let outcome = ActionOutcome {
            ok: packet.is_success(),
            status: packet.get("Message").unwrap_or_default().to_string(),
        };
        debug!(action = name, ok = outcome.ok, status = %outcome.status, "manager action answered");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    /// Fake manager: greets, answers login with `login_ok`, acks every other
    /// action, and runs `script` after the event subscription.
    async fn fake_manager<F, Fut>(login_ok: bool, script: F) -> TelephonyConfig
    where
        F: FnOnce(OwnedWriteHalf, BufReader<OwnedReadHalf>) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (read_half, mut writer) = stream.into_split();
            let mut reader = BufReader::new(read_half);
            writer.write_all(b"Asterisk Call Manager/5.0.1\r\n").await.unwrap();

            let login = read_packet(&mut reader).await.unwrap().unwrap();
            let reply = if login_ok {
                "Response: Success\r\nActionID: omnidesk-login\r\nMessage: Authentication accepted\r\n\r\n"
            } else {
                "Response: Error\r\nActionID: omnidesk-login\r\nMessage: Authentication failed\r\n\r\n"
            };
            writer.write_all(reply.as_bytes()).await.unwrap();
            if !login_ok {
                return;
            }

            let events = read_packet(&mut reader).await.unwrap().unwrap();
            assert_eq!(events.get("Action"), Some("Events"));
            let ack = format!(
                "Response: Success\r\nActionID: {}\r\nEvents: On\r\n\r\n",
                events.action_id().unwrap()
            );
            writer.write_all(ack.as_bytes()).await.unwrap();
            script(writer, reader).await;
        });

        TelephonyConfig {
            enabled: true,
            host: "127.0.0.1".into(),
            port,
            username: Some("admin".into()),
            secret: Some("secret".into()),
            ..TelephonyConfig::default()
        }
    }

    #[test]
    fn credentials_are_required() {
        let err = AmiConnector::new(&TelephonyConfig::default()).err().unwrap();
        assert!(matches!(err, OmnideskError::Config(_)));
    }

    #[tokio::test]
    async fn refused_login_is_reported() {
        let config = fake_manager(false, |_, _| async {}).await;
        let err = AmiConnector::new(&config).unwrap().connect().await.unwrap_err();
        assert!(matches!(err, OmnideskError::TelephonyLogin(ref m) if m == "Authentication failed"));
    }

    #[tokio::test]
    async fn unreachable_manager_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let config = TelephonyConfig {
            port,
            username: Some("admin".into()),
            secret: Some("secret".into()),
            ..TelephonyConfig::default()
        };
        let err = AmiConnector::new(&config).unwrap().connect().await.unwrap_err();
        assert!(err.is_telephony_transport());
    }

    #[tokio::test]
    async fn actions_are_correlated_and_events_delivered() {
        let config = fake_manager(true, |mut writer, mut reader| async move {
            writer
                .write_all(b"Event: AgentCalled\r\nInterface: PJSIP/101\r\nCallerIDNum: 061222333\r\n\r\n")
                .await
                .unwrap();
            let action = read_packet(&mut reader).await.unwrap().unwrap();
            assert_eq!(action.get("Action"), Some("QueueAdd"));
            assert_eq!(action.get("Interface"), Some("PJSIP/101"));
            let reply = format!(
                "Response: Error\r\nActionID: {}\r\nMessage: Unable to add interface: Already there\r\n\r\n",
                action.action_id().unwrap()
            );
            writer.write_all(reply.as_bytes()).await.unwrap();
            // Keep the connection open until the client is done.
            let _ = read_packet(&mut reader).await;
        })
        .await;

        let mut session = AmiConnector::new(&config).unwrap().connect().await.unwrap();

        let event = session.events.recv().await.unwrap();
        assert_eq!(event.name, "AgentCalled");
        assert_eq!(event.field("calleridnum"), "061222333");

        let outcome = session
            .actions
            .action("QueueAdd", &[("Queue", "SalesQueue"), ("Interface", "PJSIP/101")])
            .await
            .unwrap();
        assert!(!outcome.ok);
        assert!(outcome.status.contains("Already there"));
    }

    #[tokio::test]
    async fn unanswered_action_times_out() {
        let config = fake_manager(true, |_writer, mut reader| async move {
            let _ = read_packet(&mut reader).await;
            let _ = read_packet(&mut reader).await;
        })
        .await;

        let session = AmiConnector::new(&config)
            .unwrap()
            .with_action_timeout(Duration::from_millis(200))
            .connect()
            .await
            .unwrap();
        let err = session
            .actions
            .action("QueuePause", &[("Paused", "true")])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("QueuePause timed out"));
    }

    #[tokio::test]
    async fn closed_connection_surfaces_on_error_channel() {
        let config = fake_manager(true, |writer, _reader| async move {
            drop(writer);
        })
        .await;

        let mut session = AmiConnector::new(&config).unwrap().connect().await.unwrap();
        let err = session.errors.recv().await.unwrap();
        assert!(err.is_telephony_transport());
    }
}
