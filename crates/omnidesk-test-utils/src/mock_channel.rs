// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock channel adapter for deterministic testing.
//!
//! `MockChannel` decodes a small JSON payload instead of a provider format
//! and captures every outbound send for assertions.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;

use omnidesk_core::{
    AdapterType, ChannelAdapter, ChannelType, HealthStatus, InboundEvent, MessageStatus,
    OmnideskError, PluginAdapter, SenderIdentity,
};

/// One captured call to `send_outbound`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub external_id: String,
    pub text: String,
    pub auto_reply: bool,
}

/// Webhook body understood by the mock:
/// `{"from": "...", "name": "...", "text": "..."}` for a message or
/// `{"from": "...", "status": "delivered"}` for a receipt.
#[derive(Debug, Deserialize)]
struct MockPayload {
    from: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    status: Option<MessageStatus>,
    #[serde(default)]
    timestamp: i64,
}

pub struct MockChannel {
    channel: ChannelType,
    sent: Arc<Mutex<Vec<SentMessage>>>,
    fail_sends: AtomicBool,
}

impl MockChannel {
    pub fn new(channel: ChannelType) -> Self {
        Self {
            channel,
            sent: Arc::new(Mutex::new(Vec::new())),
            fail_sends: AtomicBool::new(false),
        }
    }

    /// Builds a message payload in the mock's wire format.
    pub fn message_body(from: &str, name: &str, text: &str) -> Vec<u8> {
        serde_json::json!({ "from": from, "name": name, "text": text })
            .to_string()
            .into_bytes()
    }

    /// Builds a receipt payload in the mock's wire format.
    pub fn status_body(from: &str, status: &str) -> Vec<u8> {
        serde_json::json!({ "from": from, "status": status })
            .to_string()
            .into_bytes()
    }

    /// Makes subsequent sends fail with a channel error.
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub async fn sent_messages(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Number of captured auto-replies.
    pub async fn auto_reply_count(&self) -> usize {
        self.sent.lock().await.iter().filter(|m| m.auto_reply).count()
    }
}

#[async_trait]
impl PluginAdapter for MockChannel {
    fn name(&self) -> &str {
        "mock-channel"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, OmnideskError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), OmnideskError> {
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for MockChannel {
    fn channel_type(&self) -> ChannelType {
        self.channel
    }

    fn parse_inbound(&self, body: &[u8]) -> Result<Option<InboundEvent>, OmnideskError> {
        let payload: MockPayload = serde_json::from_slice(body)
            .map_err(|e| OmnideskError::MalformedPayload(e.to_string()))?;
        let sender = SenderIdentity {
            external_id: payload.from,
            display_name: payload.name,
        };
        Ok(match (payload.text, payload.status) {
            (Some(text), _) => Some(InboundEvent::Message {
                sender,
                text,
                timestamp: payload.timestamp,
            }),
            (None, Some(status)) => Some(InboundEvent::Status { sender, status }),
            (None, None) => None,
        })
    }

    async fn send_outbound(
        &self,
        external_id: &str,
        text: &str,
        auto_reply: bool,
    ) -> Result<(), OmnideskError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(OmnideskError::channel("mock send failure"));
        }
        self.sent.lock().await.push(SentMessage {
            external_id: external_id.to_string(),
            text: text.to_string(),
            auto_reply,
        });
        Ok(())
    }
}
