// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound channel messages, delivery receipts and PBX call events.

use omnidesk_core::types::{EVENT_CONVERSATION_STARTED, now_millis};
use omnidesk_core::{
    CallRecord, ChannelType, Conversation, ConversationState, InboundEvent, Message,
    MessageStatus, OmnideskError, SenderIdentity,
};
use tracing::{debug, info, warn};

use super::RoutingEngine;
use crate::events::PushEvent;

/// What ingesting one inbound event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// A new conversation was created and queued.
    Queued { conversation_id: String },
    /// The message was appended to a live conversation.
    Appended { conversation_id: String },
    /// Agent message statuses were raised.
    StatusRaised { conversation_id: String, changed: u64 },
    /// Nothing to do (no live conversation, or a repeated receipt).
    Ignored,
}

impl RoutingEngine {
    /// Applies one decoded webhook event.
    pub async fn ingest(
        &self,
        channel: ChannelType,
        event: InboundEvent,
    ) -> Result<IngestOutcome, OmnideskError> {
        match event {
            InboundEvent::Message {
                sender,
                text,
                timestamp,
            } => self.ingest_message(channel, &sender, text, timestamp).await,
            InboundEvent::Status { sender, status } => {
                self.ingest_status(channel, &sender, status).await
            }
        }
    }

    async fn ingest_message(
        &self,
        channel: ChannelType,
        sender: &SenderIdentity,
        text: String,
        timestamp: i64,
    ) -> Result<IngestOutcome, OmnideskError> {
        let message = Message::from_customer(text, timestamp);
        let storage = &self.shared.storage;

        let mut desk = self.shared.desk.lock().await;
        let live = desk
            .store
            .live_id(channel, &sender.external_id)
            .map(str::to_string);

        let outcome = match live {
            Some(conversation_id) => {
                let mut relay_to = None;
                if let Some(conversation) = desk.store.get_mut(&conversation_id) {
                    conversation.messages.push(message.clone());
                    if conversation.state == ConversationState::Assigned {
                        relay_to = conversation.agent.clone();
                    }
                }
                if let Some(agent) = relay_to {
                    desk.push_to(
                        &agent,
                        &PushEvent::NewMessage {
                            conversation_id: conversation_id.clone(),
                            message: message.clone(),
                        },
                    );
                }
                storage.append_message(&conversation_id, &message).await?;
                IngestOutcome::Appended { conversation_id }
            }
            None => {
                let customer = self.shared.directory.resolve(channel, sender).await?;
                let started = Message::event(EVENT_CONVERSATION_STARTED, timestamp);
                let mut conversation = Conversation {
                    id: desk.store.current_id(channel, &sender.external_id),
                    channel,
                    state: ConversationState::Created,
                    customer,
                    external_id: sender.external_id.clone(),
                    agent: None,
                    created_at: now_millis(),
                    messages: vec![started.clone(), message.clone()],
                };
                conversation.state = ConversationState::Queued;
                let conversation_id = conversation.id.clone();

                desk.store.insert(conversation.clone());
                let depth = desk.queue.push(conversation_id.clone());
                desk.broadcast(&PushEvent::ConversationStarted {
                    conversation: conversation.clone(),
                });
                if depth == 1 {
                    desk.offer_head_to_idle();
                }

                storage.upsert_conversation(&conversation).await?;
                storage.append_message(&conversation_id, &started).await?;
                storage.append_message(&conversation_id, &message).await?;
                info!(conversation = %conversation_id, %channel, depth, "conversation queued");
                IngestOutcome::Queued { conversation_id }
            }
        };
        drop(desk);

        if matches!(outcome, IngestOutcome::Queued { .. }) {
            self.send_auto_reply(channel, &sender.external_id).await;
        }
        Ok(outcome)
    }

    async fn send_auto_reply(&self, channel: ChannelType, external_id: &str) {
        let Some(adapter) = self.channel(channel) else {
            warn!(%channel, "no adapter registered for auto-reply");
            return;
        };
        let text = &self.shared.settings.auto_reply;
        if let Err(e) = adapter.send_outbound(external_id, text, true).await {
            warn!(%channel, error = %e, "auto-reply failed");
        }
    }

    async fn ingest_status(
        &self,
        channel: ChannelType,
        sender: &SenderIdentity,
        status: MessageStatus,
    ) -> Result<IngestOutcome, OmnideskError> {
        let mut desk = self.shared.desk.lock().await;
        let Some(conversation_id) = desk
            .store
            .live_id(channel, &sender.external_id)
            .map(str::to_string)
        else {
            debug!(%channel, "receipt for sender without live conversation");
            return Ok(IngestOutcome::Ignored);
        };

        let mut changed = 0u64;
        let mut relay_to = None;
        if let Some(conversation) = desk.store.get_mut(&conversation_id) {
            for message in conversation
                .messages
                .iter_mut()
                .filter(|m| m.from_agent && m.status < status)
            {
                message.status = status;
                changed += 1;
            }
            if conversation.state == ConversationState::Assigned {
                relay_to = conversation.agent.clone();
            }
        }
        if changed == 0 {
            return Ok(IngestOutcome::Ignored);
        }
        if let Some(agent) = relay_to {
            desk.push_to(
                &agent,
                &PushEvent::MessageStatusUpdated {
                    conversation_id: conversation_id.clone(),
                    status,
                },
            );
        }
        self.shared
            .storage
            .raise_agent_message_status(&conversation_id, status)
            .await?;
        Ok(IngestOutcome::StatusRaised {
            conversation_id,
            changed,
        })
    }

    /// A queue call is ringing `agent`: offer it directly, never via the
    /// waiting queue.
    pub async fn call_ringing(
        &self,
        agent: &str,
        caller: &str,
        call_id: &str,
    ) -> Result<(), OmnideskError> {
        let desk = self.shared.desk.lock().await;
        let sender = SenderIdentity {
            external_id: caller.to_string(),
            display_name: String::new(),
        };
        let customer = self
            .shared
            .directory
            .resolve(ChannelType::PhoneCall, &sender)
            .await?;
        let conversation_id = desk.store.current_id(ChannelType::PhoneCall, caller);
        let offer = PushEvent::call_offer(conversation_id, customer, call_id.to_string());
        if !desk.push_to(agent, &offer) {
            debug!(agent, "ringing agent has no live session");
        }
        Ok(())
    }

    /// The agent picked up a call.
    pub async fn call_connected(&self, agent: &str, caller: &str) -> Result<(), OmnideskError> {
        let mut desk = self.shared.desk.lock().await;
        let entry = desk
            .registry
            .get_mut(agent)
            .ok_or_else(|| OmnideskError::not_found("agent", agent))?;
        entry.on_call = true;
        let conversation_id = desk.store.current_id(ChannelType::PhoneCall, caller);
        desk.push_to(
            agent,
            &PushEvent::ConversationAccepted {
                conversation_id,
                agent: agent.to_string(),
            },
        );
        debug!(agent, "agent on call");
        Ok(())
    }

    /// The call ended: record it, then free the agent and recheck after the
    /// settle delay. The record is written even for extensions outside the
    /// roster; a call without a PBX unique id gets a generated one.
    pub async fn call_completed(
        &self,
        agent: &str,
        caller: &str,
        call_id: &str,
        timestamp: i64,
        duration: i64,
    ) -> Result<(), OmnideskError> {
        let mut desk = self.shared.desk.lock().await;

        let sender = SenderIdentity {
            external_id: caller.to_string(),
            display_name: String::new(),
        };
        let customer = self
            .shared
            .directory
            .resolve(ChannelType::PhoneCall, &sender)
            .await?;
        let id = if call_id.is_empty() {
            let generated = uuid::Uuid::new_v4().to_string();
            warn!(agent, call = %generated, "AgentComplete without Uniqueid, generated call id");
            generated
        } else {
            call_id.to_string()
        };
        let record = CallRecord {
            id,
            contact_id: customer.id,
            agent: agent.to_string(),
            timestamp,
            duration,
        };
        self.shared.storage.insert_call(&record).await?;
        info!(agent, call = %record.id, duration, "call recorded");

        let known = match desk.registry.get_mut(agent) {
            Some(entry) => {
                entry.on_call = false;
                true
            }
            None => false,
        };
        drop(desk);

        if known {
            self.schedule_recheck(agent);
        } else {
            debug!(agent, "completed call for extension outside the roster");
        }
        Ok(())
    }
}
