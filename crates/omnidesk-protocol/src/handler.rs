// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-connection command handling.

use omnidesk_core::OmnideskError;
use omnidesk_routing::{RoutingEngine, SessionHandle};
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use crate::codec::{Command, ProtocolError, Reply, action_of, decode_command};

/// Decodes and executes commands for one agent connection.
///
/// The connection is bound to an agent by a successful `agent_login`; every
/// other command requires that binding.
pub struct CommandHandler {
    engine: RoutingEngine,
    session: SessionHandle,
    agent: Option<String>,
}

impl CommandHandler {
    pub fn new(engine: RoutingEngine, session: SessionHandle) -> Self {
        Self {
            engine,
            session,
            agent: None,
        }
    }

    /// The agent logged in on this connection, if any.
    pub fn agent(&self) -> Option<&str> {
        self.agent.as_deref()
    }

    /// Handles one inbound line and returns the reply to write back.
    pub async fn handle_line(&mut self, line: &str) -> Reply {
        let command = match decode_command(line) {
            Ok(command) => command,
            Err(e) => {
                debug!(connection = self.session.connection(), error = %e, "rejected command line");
                let action = match &e {
                    ProtocolError::UnknownAction(name) => name.clone(),
                    ProtocolError::Malformed(_) => action_of(line),
                };
                return Reply::failed(action, e);
            }
        };

        let action = command.action();
        match self.dispatch(command).await {
            Ok(payload) => Reply::ok(action, payload),
            Err(e) => {
                debug!(action, agent = ?self.agent, error = %e, "command failed");
                Reply::failed(action, e)
            }
        }
    }

    async fn dispatch(&mut self, command: Command) -> Result<Map<String, Value>, OmnideskError> {
        match command {
            Command::AgentLogin { username, secret } => self.login(&username, &secret).await,
            other => {
                let agent = self
                    .agent
                    .clone()
                    .ok_or_else(|| OmnideskError::Rejected("not logged in".into()))?;
                let connection = self.session.connection();
                if !self.engine.owns_session(&agent, connection).await {
                    info!(agent, connection, "command on superseded session rejected");
                    self.agent = None;
                    return Err(OmnideskError::Rejected(
                        "session superseded by a newer login".into(),
                    ));
                }
                self.run(&agent, other).await
            }
        }
    }

    async fn run(&mut self, agent: &str, command: Command) -> Result<Map<String, Value>, OmnideskError> {
        let engine = &self.engine;
        match command {
            Command::AgentLogin { .. } => Err(OmnideskError::Rejected(format!(
                "connection already logged in as {agent}"
            ))),
            Command::AgentLogoff => {
                engine.logoff(agent).await?;
                self.agent = None;
                Ok(Map::new())
            }
            Command::AgentPause { paused } => {
                engine.pause(agent, paused).await?;
                payload(json!({ "paused": paused }))
            }
            Command::AcceptConversation { conversation_id } => {
                let conversation = engine.accept(agent, &conversation_id).await?;
                payload(json!({ "conversation": conversation }))
            }
            Command::RejectConversation { conversation_id } => {
                engine.reject(agent, &conversation_id).await?;
                payload(json!({ "conversationId": conversation_id }))
            }
            Command::FinishConversation { conversation_id } => {
                engine.finish(agent, &conversation_id).await?;
                payload(json!({ "conversationId": conversation_id }))
            }
            Command::GetMessages { conversation_id } => {
                let messages = engine.messages(&conversation_id).await?;
                payload(json!({ "conversationId": conversation_id, "messages": messages }))
            }
            Command::GetCustomerHistory { contact_id } => {
                let history = engine.customer_history(&contact_id).await?;
                payload(&history)
            }
            Command::UpdateContact {
                contact_id,
                name,
                number,
            } => {
                let contact = engine.update_contact(&contact_id, &name, &number).await?;
                payload(json!({ "contact": contact }))
            }
            Command::SendMessage {
                conversation_id,
                text,
            } => {
                let message = engine.send_message(agent, &conversation_id, &text).await?;
                payload(json!({ "conversationId": conversation_id, "message": message }))
            }
        }
    }

    async fn login(&mut self, username: &str, secret: &str) -> Result<Map<String, Value>, OmnideskError> {
        if let Some(current) = &self.agent {
            return Err(OmnideskError::Rejected(format!(
                "connection already logged in as {current}"
            )));
        }
        let snapshot = self
            .engine
            .login(username, secret, self.session.clone())
            .await?;
        self.agent = Some(username.to_string());
        info!(agent = username, connection = self.session.connection(), "connection bound to agent");
        payload(&snapshot)
    }
}

/// Serializes a payload object for flattening into a [`Reply`].
fn payload<T: Serialize>(value: T) -> Result<Map<String, Value>, OmnideskError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(OmnideskError::Internal(format!(
            "reply payload is not an object: {other}"
        ))),
        Err(e) => Err(OmnideskError::Internal(format!(
            "failed to encode reply payload: {e}"
        ))),
    }
}
