// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Desk harness for routing integration tests.
//!
//! `TestDesk` wires a [`RoutingEngine`] to a temp SQLite database, seeds an
//! agent roster and registers mock channels. Agents log in through
//! [`TestDesk::login`] and receive pushes on an [`AgentClient`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use omnidesk_config::model::StorageConfig;
use omnidesk_core::{AgentRecord, ChannelAdapter, ChannelType, OmnideskError, StorageAdapter};
use omnidesk_routing::{IngestOutcome, LoginSnapshot, RoutingEngine, RoutingSettings, SessionHandle};
use omnidesk_storage::SqliteStorage;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::mock_channel::MockChannel;

/// Builder for [`TestDesk`].
pub struct TestDeskBuilder {
    settle_delay: Duration,
    agents: Vec<AgentRecord>,
    channels: Vec<ChannelType>,
}

impl TestDeskBuilder {
    fn new() -> Self {
        Self {
            settle_delay: Duration::from_millis(5000),
            agents: vec![agent("101", "Ana", 2), agent("102", "Marko", 2)],
            channels: vec![ChannelType::WhatsApp, ChannelType::Viber],
        }
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Replaces the roster. Secrets are `secret-{extension}`.
    pub fn with_agents(mut self, agents: &[(&str, u32)]) -> Self {
        self.agents = agents
            .iter()
            .map(|(ext, capacity)| agent(ext, &format!("Agent {ext}"), *capacity))
            .collect();
        self
    }

    pub async fn build(self) -> Result<TestDesk, OmnideskError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| OmnideskError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("desk.db");

        let storage = SqliteStorage::new(StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        });
        storage.initialize().await?;
        for record in &self.agents {
            storage.upsert_agent(record).await?;
        }
        let storage: Arc<dyn StorageAdapter> = Arc::new(storage);

        let channels: Vec<Arc<MockChannel>> = self
            .channels
            .iter()
            .map(|channel| Arc::new(MockChannel::new(*channel)))
            .collect();
        let adapters = channels
            .iter()
            .map(|c| Arc::clone(c) as Arc<dyn ChannelAdapter>)
            .collect();

        let settings = RoutingSettings {
            settle_delay: self.settle_delay,
            ..RoutingSettings::default()
        };
        let engine = RoutingEngine::new(settings, Arc::clone(&storage), adapters);
        engine.restore().await?;

        Ok(TestDesk {
            engine,
            storage,
            channels,
            next_connection: AtomicU64::new(1),
            _temp_dir: temp_dir,
        })
    }
}

fn agent(extension: &str, name: &str, capacity: u32) -> AgentRecord {
    AgentRecord {
        extension: extension.to_string(),
        name: name.to_string(),
        secret: format!("secret-{extension}"),
        capacity,
    }
}

/// A routing engine over temp storage with mock channels.
pub struct TestDesk {
    pub engine: RoutingEngine,
    pub storage: Arc<dyn StorageAdapter>,
    channels: Vec<Arc<MockChannel>>,
    next_connection: AtomicU64,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestDesk {
    pub fn builder() -> TestDeskBuilder {
        TestDeskBuilder::new()
    }

    /// The mock adapter registered for `channel`.
    pub fn channel(&self, channel: ChannelType) -> Arc<MockChannel> {
        self.channels
            .iter()
            .find(|c| c.channel_type() == channel)
            .cloned()
            .unwrap_or_else(|| panic!("no mock channel for {channel}"))
    }

    /// Logs `extension` in on a fresh connection.
    pub async fn login(&self, extension: &str) -> (AgentClient, LoginSnapshot) {
        let connection = self.next_connection.fetch_add(1, Ordering::SeqCst);
        let (session, rx) = SessionHandle::channel(connection);
        let snapshot = self
            .engine
            .login(extension, &format!("secret-{extension}"), session)
            .await
            .unwrap_or_else(|e| panic!("login of {extension} failed: {e}"));
        (
            AgentClient {
                extension: extension.to_string(),
                connection,
                rx,
            },
            snapshot,
        )
    }

    /// Feeds a customer message through the matching mock channel.
    pub async fn customer_says(&self, channel: ChannelType, from: &str, text: &str) -> IngestOutcome {
        self.webhook(channel, &MockChannel::message_body(from, from, text))
            .await
    }

    /// Feeds a delivery receipt through the matching mock channel.
    pub async fn customer_receipt(
        &self,
        channel: ChannelType,
        from: &str,
        status: &str,
    ) -> IngestOutcome {
        self.webhook(channel, &MockChannel::status_body(from, status))
            .await
    }

    async fn webhook(&self, channel: ChannelType, body: &[u8]) -> IngestOutcome {
        let event = self
            .channel(channel)
            .parse_inbound(body)
            .and_then(|e| e.ok_or_else(|| OmnideskError::MalformedPayload("empty".into())))
            .unwrap_or_else(|e| panic!("bad mock payload: {e}"));
        self.engine
            .ingest(channel, event)
            .await
            .unwrap_or_else(|e| panic!("ingest failed: {e}"))
    }
}

/// Receiving end of one agent connection.
pub struct AgentClient {
    pub extension: String,
    pub connection: u64,
    rx: mpsc::UnboundedReceiver<String>,
}

impl AgentClient {
    /// Drains every push received so far.
    pub fn drain(&mut self) -> Vec<Value> {
        let mut events = Vec::new();
        while let Ok(line) = self.rx.try_recv() {
            if let Ok(value) = serde_json::from_str(&line) {
                events.push(value);
            }
        }
        events
    }

    /// Drains pushes and keeps those named `event`.
    pub fn drain_named(&mut self, event: &str) -> Vec<Value> {
        self.drain()
            .into_iter()
            .filter(|v| v["event"] == event)
            .collect()
    }
}
