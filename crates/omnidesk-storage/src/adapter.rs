// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use omnidesk_config::model::StorageConfig;
use omnidesk_core::{
    AdapterType, AgentRecord, CallRecord, ChannelType, Contact, Conversation, HealthStatus,
    Message, MessageStatus, OmnideskError, PluginAdapter, SlotEpoch, StorageAdapter,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed history store.
///
/// The database is opened by [`StorageAdapter::initialize`]; every other
/// call fails until then.
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, OmnideskError> {
        self.db.get().ok_or_else(|| OmnideskError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, OmnideskError> {
        self.db()?
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), OmnideskError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), OmnideskError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| OmnideskError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), OmnideskError> {
        self.db()?.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    // --- Agents ---

    async fn upsert_agent(&self, agent: &AgentRecord) -> Result<(), OmnideskError> {
        queries::agents::upsert_agent(self.db()?, agent).await
    }

    async fn list_agents(&self) -> Result<Vec<AgentRecord>, OmnideskError> {
        queries::agents::list_agents(self.db()?).await
    }

    // --- Contacts ---

    async fn insert_contact(&self, contact: &Contact) -> Result<(), OmnideskError> {
        queries::contacts::insert_contact(self.db()?, contact).await
    }

    async fn get_contact(&self, id: &str) -> Result<Option<Contact>, OmnideskError> {
        queries::contacts::get_contact(self.db()?, id).await
    }

    async fn find_contact_by_identity(
        &self,
        channel: ChannelType,
        external_id: &str,
    ) -> Result<Option<Contact>, OmnideskError> {
        queries::contacts::find_by_identity(self.db()?, channel, external_id).await
    }

    async fn find_contact_by_number(
        &self,
        number: &str,
    ) -> Result<Option<Contact>, OmnideskError> {
        queries::contacts::find_by_number(self.db()?, number).await
    }

    async fn link_identity(
        &self,
        channel: ChannelType,
        external_id: &str,
        contact_id: &str,
    ) -> Result<(), OmnideskError> {
        queries::contacts::link_identity(self.db()?, channel, external_id, contact_id).await
    }

    async fn update_contact_name(&self, id: &str, name: &str) -> Result<(), OmnideskError> {
        queries::contacts::update_name(self.db()?, id, name).await
    }

    async fn update_contact_number(&self, id: &str, number: &str) -> Result<(), OmnideskError> {
        queries::contacts::update_number(self.db()?, id, number).await
    }

    async fn merge_contacts(&self, keep: &str, duplicate: &str) -> Result<(), OmnideskError> {
        queries::contacts::merge(self.db()?, keep, duplicate).await
    }

    // --- Conversations ---

    async fn upsert_conversation(
        &self,
        conversation: &Conversation,
    ) -> Result<(), OmnideskError> {
        queries::conversations::upsert_conversation(self.db()?, conversation).await
    }

    async fn list_active_conversations(&self) -> Result<Vec<Conversation>, OmnideskError> {
        queries::conversations::list_active(self.db()?).await
    }

    async fn conversations_for_contact(
        &self,
        contact_id: &str,
    ) -> Result<Vec<Conversation>, OmnideskError> {
        queries::conversations::for_contact(self.db()?, contact_id).await
    }

    async fn finished_epochs(&self) -> Result<Vec<SlotEpoch>, OmnideskError> {
        queries::conversations::finished_epochs(self.db()?).await
    }

    // --- Messages ---

    async fn append_message(
        &self,
        conversation_id: &str,
        message: &Message,
    ) -> Result<(), OmnideskError> {
        queries::messages::append_message(self.db()?, conversation_id, message).await
    }

    async fn messages_for_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<Message>, OmnideskError> {
        queries::messages::messages_for_conversation(self.db()?, conversation_id).await
    }

    async fn raise_agent_message_status(
        &self,
        conversation_id: &str,
        status: MessageStatus,
    ) -> Result<u64, OmnideskError> {
        queries::messages::raise_agent_status(self.db()?, conversation_id, status).await
    }

    // --- Calls ---

    async fn insert_call(&self, call: &CallRecord) -> Result<(), OmnideskError> {
        queries::calls::insert_call(self.db()?, call).await
    }

    async fn calls_for_contact(&self, contact_id: &str) -> Result<Vec<CallRecord>, OmnideskError> {
        queries::calls::calls_for_contact(self.db()?, contact_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn implements_plugin_adapter() {
        let storage = SqliteStorage::new(make_config("unused.db"));
        assert_eq!(storage.name(), "sqlite");
        assert_eq!(storage.adapter_type(), AdapterType::Storage);
    }

    #[tokio::test]
    async fn calls_before_initialize_fail() {
        let storage = SqliteStorage::new(make_config("unused.db"));
        let err = storage.list_agents().await.unwrap_err();
        assert!(matches!(err, OmnideskError::Storage { .. }));
    }

    #[tokio::test]
    async fn double_initialize_is_rejected() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("twice.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));
        storage.initialize().await.unwrap();
        assert!(storage.initialize().await.is_err());
    }

    #[tokio::test]
    async fn history_survives_reopen() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("history.db");
        let path = db_path.to_str().unwrap();

        let storage = SqliteStorage::new(make_config(path));
        storage.initialize().await.unwrap();
        let contact = Contact {
            id: "c1".into(),
            name: "Ana".into(),
            number: "061000111".into(),
        };
        storage.insert_contact(&contact).await.unwrap();
        storage
            .link_identity(ChannelType::WhatsApp, "061000111", "c1")
            .await
            .unwrap();
        assert_eq!(storage.health_check().await.unwrap(), HealthStatus::Healthy);
        storage.close().await.unwrap();
        drop(storage);

        let reopened = SqliteStorage::new(make_config(path));
        reopened.initialize().await.unwrap();
        let found = reopened
            .find_contact_by_identity(ChannelType::WhatsApp, "061000111")
            .await
            .unwrap();
        assert_eq!(found, Some(contact));
        reopened.shutdown().await.unwrap();
    }
}
