// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Live conversation table.

use std::collections::HashMap;

use omnidesk_core::{ChannelType, Contact, Conversation, ConversationState, conversation_id};

type Slot = (ChannelType, String);

/// Active conversations keyed by their deterministic id.
///
/// Each `(channel, external_id)` slot maps to at most one live conversation.
/// Finishing a conversation purges the slot and bumps its epoch, so the next
/// message from the same sender derives a fresh id.
#[derive(Debug, Default)]
pub struct ConversationStore {
    live: HashMap<String, Conversation>,
    slots: HashMap<Slot, String>,
    epochs: HashMap<Slot, u64>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_epoch(&mut self, channel: ChannelType, external_id: &str, epoch: u64) {
        self.epochs.insert((channel, external_id.to_string()), epoch);
    }

    /// The id a conversation in this slot has (or would have) right now.
    pub fn current_id(&self, channel: ChannelType, external_id: &str) -> String {
        let epoch = self
            .epochs
            .get(&(channel, external_id.to_string()))
            .copied()
            .unwrap_or(0);
        conversation_id(channel, external_id, epoch)
    }

    /// Id of the live conversation for this sender, if any.
    pub fn live_id(&self, channel: ChannelType, external_id: &str) -> Option<&str> {
        self.slots
            .get(&(channel, external_id.to_string()))
            .map(String::as_str)
    }

    pub fn insert(&mut self, conversation: Conversation) {
        self.slots.insert(
            (conversation.channel, conversation.external_id.clone()),
            conversation.id.clone(),
        );
        self.live.insert(conversation.id.clone(), conversation);
    }

    pub fn get(&self, id: &str) -> Option<&Conversation> {
        self.live.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Conversation> {
        self.live.get_mut(id)
    }

    /// Removes a conversation from the live table, marking it `Finished`.
    pub fn finish(&mut self, id: &str) -> Option<Conversation> {
        let mut conversation = self.live.remove(id)?;
        let slot = (conversation.channel, conversation.external_id.clone());
        if self.slots.get(&slot).is_some_and(|live| live == id) {
            self.slots.remove(&slot);
        }
        *self.epochs.entry(slot).or_insert(0) += 1;
        conversation.state = ConversationState::Finished;
        Some(conversation)
    }

    /// Conversations assigned to `agent`, oldest first.
    pub fn assigned_to(&self, agent: &str) -> Vec<&Conversation> {
        let mut assigned: Vec<_> = self
            .live
            .values()
            .filter(|c| c.state == ConversationState::Assigned && c.agent.as_deref() == Some(agent))
            .collect();
        assigned.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        assigned
    }

    /// Replaces the customer snapshot of every live conversation owned by
    /// `contact_id` (or by a contact merged into it).
    pub fn retarget_contact(&mut self, from: &str, to: &Contact) {
        for conversation in self.live.values_mut() {
            if conversation.customer.id == from || conversation.customer.id == to.id {
                conversation.customer = to.clone();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}
