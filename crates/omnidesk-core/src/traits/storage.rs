// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for the persisted history log.

use async_trait::async_trait;

use crate::error::OmnideskError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    AgentRecord, CallRecord, ChannelType, Contact, Conversation, Message, MessageStatus,
    SlotEpoch,
};

/// Adapter for persistence backends.
///
/// Storage is a history log: the routing engine keeps live state in memory
/// and mirrors every mutation here. `initialize` creates the database if it
/// is missing and brings the schema up to date.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    async fn initialize(&self) -> Result<(), OmnideskError>;

    /// Flushes pending writes.
    async fn close(&self) -> Result<(), OmnideskError>;

    // --- Agents ---

    /// Inserts or replaces a roster entry.
    async fn upsert_agent(&self, agent: &AgentRecord) -> Result<(), OmnideskError>;

    async fn list_agents(&self) -> Result<Vec<AgentRecord>, OmnideskError>;

    // --- Contacts ---

    async fn insert_contact(&self, contact: &Contact) -> Result<(), OmnideskError>;

    async fn get_contact(&self, id: &str) -> Result<Option<Contact>, OmnideskError>;

    async fn find_contact_by_identity(
        &self,
        channel: ChannelType,
        external_id: &str,
    ) -> Result<Option<Contact>, OmnideskError>;

    async fn find_contact_by_number(&self, number: &str)
    -> Result<Option<Contact>, OmnideskError>;

    /// Associates a channel identity with a contact, replacing any prior link.
    async fn link_identity(
        &self,
        channel: ChannelType,
        external_id: &str,
        contact_id: &str,
    ) -> Result<(), OmnideskError>;

    async fn update_contact_name(&self, id: &str, name: &str) -> Result<(), OmnideskError>;

    async fn update_contact_number(&self, id: &str, number: &str) -> Result<(), OmnideskError>;

    /// Moves calls, conversations and identities of `duplicate` onto `keep`
    /// and deletes `duplicate`, atomically.
    async fn merge_contacts(&self, keep: &str, duplicate: &str) -> Result<(), OmnideskError>;

    // --- Conversations ---

    /// Writes the conversation header (state, agent, contact). Messages are
    /// appended separately.
    async fn upsert_conversation(&self, conversation: &Conversation)
    -> Result<(), OmnideskError>;

    /// Queued and assigned conversations, oldest first, with messages.
    async fn list_active_conversations(&self) -> Result<Vec<Conversation>, OmnideskError>;

    /// Every conversation of a contact, newest first, with messages.
    async fn conversations_for_contact(
        &self,
        contact_id: &str,
    ) -> Result<Vec<Conversation>, OmnideskError>;

    /// Finished-conversation counts per sender slot.
    async fn finished_epochs(&self) -> Result<Vec<SlotEpoch>, OmnideskError>;

    // --- Messages ---

    async fn append_message(
        &self,
        conversation_id: &str,
        message: &Message,
    ) -> Result<(), OmnideskError>;

    async fn messages_for_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<Message>, OmnideskError>;

    /// Raises every agent-sent message below `status` to `status`.
    /// Returns the number of rows changed.
    async fn raise_agent_message_status(
        &self,
        conversation_id: &str,
        status: MessageStatus,
    ) -> Result<u64, OmnideskError>;

    // --- Calls ---

    /// Appends a call record. Re-inserting an existing call id is a no-op.
    async fn insert_call(&self, call: &CallRecord) -> Result<(), OmnideskError>;

    async fn calls_for_contact(&self, contact_id: &str) -> Result<Vec<CallRecord>, OmnideskError>;
}
