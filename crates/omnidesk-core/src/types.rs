// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the routing engine, adapters and storage.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Lifecycle tag appended as the first message of every conversation.
pub const EVENT_CONVERSATION_STARTED: &str = "event_conversation_started";

/// Lifecycle tag appended when an agent closes a conversation.
pub const EVENT_CONVERSATION_FINISHED: &str = "event_conversation_finished";

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Channel,
    Storage,
    Telephony,
}

/// The channel a conversation arrived on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ChannelType {
    Viber,
    #[serde(rename = "whatsapp")]
    #[strum(serialize = "whatsapp")]
    WhatsApp,
    PhoneCall,
}

impl ChannelType {
    /// Selects the messaging channel for a webhook path such as `/viber` or
    /// `/whatsapp/inbound`. Phone calls never arrive over webhooks.
    pub fn from_path_prefix(path: &str) -> Option<Self> {
        let first = path.trim_start_matches('/').split('/').next().unwrap_or("");
        match first {
            "viber" => Some(Self::Viber),
            "whatsapp" => Some(Self::WhatsApp),
            _ => None,
        }
    }

    /// Channels whose external identity is a phone number.
    pub fn is_phone_based(self) -> bool {
        matches!(self, Self::WhatsApp | Self::PhoneCall)
    }
}

/// Conversation lifecycle. `Created` is transient and never observable
/// outside the operation that creates a conversation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConversationState {
    Created,
    Queued,
    Assigned,
    Finished,
}

/// Delivery status of a message. Ordered: a status only ever moves forward.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MessageStatus {
    Sent,
    Delivered,
    Seen,
}

impl MessageStatus {
    pub fn as_i64(self) -> i64 {
        match self {
            Self::Sent => 0,
            Self::Delivered => 1,
            Self::Seen => 2,
        }
    }

    pub fn from_i64(value: i64) -> Self {
        match value {
            2 => Self::Seen,
            1 => Self::Delivered,
            _ => Self::Sent,
        }
    }
}

/// Whether a message carries customer/agent text or a lifecycle tag.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MessageKind {
    Text,
    Event,
}

/// One entry in a conversation's append-only message log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Text body, or the lifecycle tag for event messages.
    pub body: String,
    pub timestamp: i64,
    pub status: MessageStatus,
    pub from_agent: bool,
}

impl Message {
    pub fn from_customer(body: impl Into<String>, timestamp: i64) -> Self {
        Self {
            kind: MessageKind::Text,
            body: body.into(),
            timestamp,
            status: MessageStatus::Sent,
            from_agent: false,
        }
    }

    pub fn from_agent(body: impl Into<String>, timestamp: i64) -> Self {
        Self {
            kind: MessageKind::Text,
            body: body.into(),
            timestamp,
            status: MessageStatus::Sent,
            from_agent: true,
        }
    }

    pub fn event(tag: &str, timestamp: i64) -> Self {
        Self {
            kind: MessageKind::Event,
            body: tag.to_string(),
            timestamp,
            status: MessageStatus::Sent,
            from_agent: false,
        }
    }
}

/// A unified customer record spanning every channel identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub name: String,
    /// Empty when no number is known.
    pub number: String,
}

/// An active (or historical) conversation with one customer on one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    #[serde(rename = "type")]
    pub channel: ChannelType,
    pub state: ConversationState,
    pub customer: Contact,
    /// Channel-specific sender identity used for outbound replies.
    pub external_id: String,
    pub agent: Option<String>,
    pub created_at: i64,
    pub messages: Vec<Message>,
}

/// Public view of an agent, safe to send over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub extension: String,
    pub name: String,
    pub capacity: u32,
}

/// A roster entry as persisted, including the login secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentRecord {
    pub extension: String,
    pub name: String,
    pub secret: String,
    pub capacity: u32,
}

impl AgentRecord {
    pub fn profile(&self) -> AgentProfile {
        AgentProfile {
            extension: self.extension.clone(),
            name: self.name.clone(),
            capacity: self.capacity,
        }
    }
}

/// Number of finished conversations for one `(channel, external_id)` slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotEpoch {
    pub channel: ChannelType,
    pub external_id: String,
    pub finished: u64,
}

/// One completed phone call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRecord {
    pub id: String,
    pub contact_id: String,
    pub agent: String,
    pub timestamp: i64,
    pub duration: i64,
}

/// Sender identity extracted from an inbound channel payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderIdentity {
    pub external_id: String,
    /// May be empty when the provider omits it (e.g. delivery receipts).
    pub display_name: String,
}

/// What a channel adapter understood from one webhook payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Message {
        sender: SenderIdentity,
        text: String,
        timestamp: i64,
    },
    Status {
        sender: SenderIdentity,
        status: MessageStatus,
    },
}

impl InboundEvent {
    pub fn sender(&self) -> &SenderIdentity {
        match self {
            Self::Message { sender, .. } | Self::Status { sender, .. } => sender,
        }
    }
}

/// An unsolicited event from the PBX manager interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerEvent {
    pub name: String,
    fields: HashMap<String, String>,
}

impl ManagerEvent {
    pub fn new<I, K, V>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.as_ref().to_ascii_lowercase(), v.into()))
                .collect(),
        }
    }

    /// Field lookup; keys are matched case-insensitively.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Field lookup returning an empty string when absent.
    pub fn field(&self, key: &str) -> &str {
        self.get(key).unwrap_or("")
    }
}

/// Result of a manager action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub ok: bool,
    /// Response message text, useful for diagnostics.
    pub status: String,
}
