// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command decoding and reply encoding.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Every action the server understands.
pub const ACTIONS: &[&str] = &[
    "agent_login",
    "agent_logoff",
    "agent_pause",
    "accept_conversation",
    "reject_conversation",
    "finish_conversation",
    "get_messages",
    "get_customer_history",
    "update_contact",
    "send_message",
];

/// A decoded agent command.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Command {
    AgentLogin {
        username: String,
        secret: String,
    },
    AgentLogoff,
    AgentPause {
        paused: bool,
    },
    AcceptConversation {
        conversation_id: String,
    },
    RejectConversation {
        conversation_id: String,
    },
    FinishConversation {
        conversation_id: String,
    },
    GetMessages {
        conversation_id: String,
    },
    GetCustomerHistory {
        contact_id: String,
    },
    UpdateContact {
        contact_id: String,
        #[serde(default)]
        name: String,
        #[serde(default)]
        number: String,
    },
    SendMessage {
        conversation_id: String,
        text: String,
    },
}

impl Command {
    pub fn action(&self) -> &'static str {
        match self {
            Self::AgentLogin { .. } => "agent_login",
            Self::AgentLogoff => "agent_logoff",
            Self::AgentPause { .. } => "agent_pause",
            Self::AcceptConversation { .. } => "accept_conversation",
            Self::RejectConversation { .. } => "reject_conversation",
            Self::FinishConversation { .. } => "finish_conversation",
            Self::GetMessages { .. } => "get_messages",
            Self::GetCustomerHistory { .. } => "get_customer_history",
            Self::UpdateContact { .. } => "update_contact",
            Self::SendMessage { .. } => "send_message",
        }
    }
}

/// A line that could not be turned into a [`Command`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("malformed command: {0}")]
    Malformed(String),
}

/// Decodes one line. Known actions with bad fields are `Malformed`; an
/// action name the server does not implement is `UnknownAction`.
pub fn decode_command(line: &str) -> Result<Command, ProtocolError> {
    let value: Value =
        serde_json::from_str(line).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
    let action = value
        .get("action")
        .and_then(Value::as_str)
        .ok_or_else(|| ProtocolError::Malformed("missing \"action\"".into()))?;
    if !ACTIONS.contains(&action) {
        return Err(ProtocolError::UnknownAction(action.to_string()));
    }
    serde_json::from_value(value).map_err(|e| ProtocolError::Malformed(e.to_string()))
}

/// Best-effort action name of an undecodable line, for the error reply.
pub fn action_of(line: &str) -> String {
    serde_json::from_str::<Value>(line)
        .ok()
        .and_then(|v| v.get("action").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Response to one command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply {
    pub action: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Reply {
    pub fn ok(action: impl Into<String>, payload: Map<String, Value>) -> Self {
        Self {
            action: action.into(),
            success: true,
            error: None,
            payload,
        }
    }

    pub fn failed(action: impl Into<String>, error: impl ToString) -> Self {
        Self {
            action: action.into(),
            success: false,
            error: Some(error.to_string()),
            payload: Map::new(),
        }
    }
}
