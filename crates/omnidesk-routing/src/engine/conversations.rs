// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agent commands acting on conversations and contacts.

use omnidesk_core::types::{EVENT_CONVERSATION_FINISHED, now_millis};
use omnidesk_core::{
    Contact, Conversation, ConversationState, Message, OmnideskError,
};
use tracing::{debug, info};

use super::{CustomerHistory, RoutingEngine};
use crate::events::PushEvent;

impl RoutingEngine {
    /// Claims the queue head for `agent`.
    ///
    /// Fails without side effects when `conversation_id` is no longer the
    /// head (another agent won, or it was never queued) or the agent has no
    /// free capacity. On success every logged-in agent is told, and the new
    /// head (if any) is offered to idle agents.
    pub async fn accept(
        &self,
        agent: &str,
        conversation_id: &str,
    ) -> Result<Conversation, OmnideskError> {
        let mut desk = self.shared.desk.lock().await;
        let entry = desk
            .registry
            .get(agent)
            .ok_or_else(|| OmnideskError::not_found("agent", agent))?;
        if !entry.is_logged_in() {
            return Err(OmnideskError::Rejected(format!(
                "agent {agent} is not logged in"
            )));
        }
        if entry.at_capacity() {
            return Err(OmnideskError::Rejected(format!(
                "agent {agent} is at capacity"
            )));
        }
        if !desk.queue.claim_head(conversation_id) {
            debug!(agent, conversation = conversation_id, "accept lost: not the queue head");
            return Err(OmnideskError::Rejected(
                "conversation is no longer available".into(),
            ));
        }

        let conversation = {
            let conversation = desk
                .store
                .get_mut(conversation_id)
                .ok_or_else(|| OmnideskError::not_found("conversation", conversation_id))?;
            conversation.state = ConversationState::Assigned;
            conversation.agent = Some(agent.to_string());
            conversation.clone()
        };
        if let Some(entry) = desk.registry.get_mut(agent) {
            entry.active += 1;
        }

        desk.broadcast(&PushEvent::ConversationAccepted {
            conversation_id: conversation_id.to_string(),
            agent: agent.to_string(),
        });
        desk.offer_head_to_idle();

        self.shared.storage.upsert_conversation(&conversation).await?;
        info!(agent, conversation = conversation_id, "conversation accepted");
        Ok(conversation)
    }

    /// An agent declined an offer; re-offer after the settle delay.
    pub async fn reject(&self, agent: &str, conversation_id: &str) -> Result<(), OmnideskError> {
        self.ensure_known(agent).await?;
        debug!(agent, conversation = conversation_id, "offer rejected");
        self.schedule_recheck(agent);
        Ok(())
    }

    /// Closes a conversation assigned to `agent`.
    pub async fn finish(&self, agent: &str, conversation_id: &str) -> Result<(), OmnideskError> {
        let mut desk = self.shared.desk.lock().await;
        let owned = desk
            .store
            .get(conversation_id)
            .ok_or_else(|| OmnideskError::not_found("conversation", conversation_id))?;
        if owned.state != ConversationState::Assigned || owned.agent.as_deref() != Some(agent) {
            return Err(OmnideskError::Rejected(format!(
                "conversation {conversation_id} is not assigned to {agent}"
            )));
        }

        let event = Message::event(EVENT_CONVERSATION_FINISHED, now_millis());
        if let Some(conversation) = desk.store.get_mut(conversation_id) {
            conversation.messages.push(event.clone());
        }
        let finished = desk
            .store
            .finish(conversation_id)
            .ok_or_else(|| OmnideskError::not_found("conversation", conversation_id))?;
        if let Some(entry) = desk.registry.get_mut(agent) {
            entry.active = entry.active.saturating_sub(1);
        }
        desk.push_to(
            agent,
            &PushEvent::ConversationFinished {
                conversation_id: conversation_id.to_string(),
            },
        );

        let storage = &self.shared.storage;
        storage.append_message(conversation_id, &event).await?;
        storage.upsert_conversation(&finished).await?;
        drop(desk);

        info!(agent, conversation = conversation_id, "conversation finished");
        self.schedule_recheck(agent);
        Ok(())
    }

    /// Records an agent reply and delivers it through the conversation's channel.
    pub async fn send_message(
        &self,
        agent: &str,
        conversation_id: &str,
        text: &str,
    ) -> Result<Message, OmnideskError> {
        let message = Message::from_agent(text, now_millis());
        let (channel, external_id) = {
            let mut desk = self.shared.desk.lock().await;
            let conversation = desk
                .store
                .get_mut(conversation_id)
                .ok_or_else(|| OmnideskError::not_found("conversation", conversation_id))?;
            if conversation.state != ConversationState::Assigned
                || conversation.agent.as_deref() != Some(agent)
            {
                return Err(OmnideskError::Rejected(format!(
                    "conversation {conversation_id} is not assigned to {agent}"
                )));
            }
            conversation.messages.push(message.clone());
            let target = (conversation.channel, conversation.external_id.clone());
            self.shared
                .storage
                .append_message(conversation_id, &message)
                .await?;
            target
        };

        let adapter = self
            .channel(channel)
            .ok_or_else(|| OmnideskError::UnknownChannel(channel.to_string()))?;
        adapter.send_outbound(&external_id, text, false).await?;
        debug!(agent, conversation = conversation_id, %channel, "agent message sent");
        Ok(message)
    }

    /// Messages of a live conversation, or of a finished one from history.
    pub async fn messages(&self, conversation_id: &str) -> Result<Vec<Message>, OmnideskError> {
        if let Some(conversation) = self.conversation(conversation_id).await {
            return Ok(conversation.messages);
        }
        let messages = self
            .shared
            .storage
            .messages_for_conversation(conversation_id)
            .await?;
        if messages.is_empty() {
            return Err(OmnideskError::not_found("conversation", conversation_id));
        }
        Ok(messages)
    }

    pub async fn customer_history(&self, contact_id: &str) -> Result<CustomerHistory, OmnideskError> {
        let customer = self.shared.directory.get(contact_id).await?;
        let storage = &self.shared.storage;
        Ok(CustomerHistory {
            conversations: storage.conversations_for_contact(contact_id).await?,
            calls: storage.calls_for_contact(contact_id).await?,
            customer,
        })
    }

    /// Edits a contact; a number already owned by other contacts merges them
    /// into this one. Live conversations pick up the new customer snapshot.
    pub async fn update_contact(
        &self,
        contact_id: &str,
        name: &str,
        number: &str,
    ) -> Result<Contact, OmnideskError> {
        let mut desk = self.shared.desk.lock().await;
        let (contact, merged) = self
            .shared
            .directory
            .update(contact_id, name, number)
            .await?;
        for duplicate in &merged {
            desk.store.retarget_contact(duplicate, &contact);
        }
        desk.store.retarget_contact(&contact.id, &contact);
        info!(contact = contact_id, merged = merged.len(), "contact updated");
        Ok(contact)
    }

    async fn ensure_known(&self, agent: &str) -> Result<(), OmnideskError> {
        let desk = self.shared.desk.lock().await;
        desk.registry
            .get(agent)
            .map(|_| ())
            .ok_or_else(|| OmnideskError::not_found("agent", agent))
    }
}
