// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resolution of channel identities to unified contacts.

use std::sync::Arc;

use omnidesk_core::{ChannelType, Contact, OmnideskError, SenderIdentity, StorageAdapter};
use tracing::{debug, info};

/// Contact lookup and maintenance backed by storage.
///
/// Callers serialize access (the engine holds its desk lock) so concurrent
/// first messages from one sender cannot create two contacts.
#[derive(Clone)]
pub struct ContactDirectory {
    storage: Arc<dyn StorageAdapter>,
}

impl ContactDirectory {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self { storage }
    }

    /// Finds the contact for `sender` on `channel`, creating one on first contact.
    ///
    /// Phone-based channels also match an existing contact by number, so a
    /// WhatsApp customer who previously called lands on the same record.
    pub async fn resolve(
        &self,
        channel: ChannelType,
        sender: &SenderIdentity,
    ) -> Result<Contact, OmnideskError> {
        if let Some(contact) = self
            .storage
            .find_contact_by_identity(channel, &sender.external_id)
            .await?
        {
            return Ok(contact);
        }

        let number = if channel.is_phone_based() {
            sender.external_id.clone()
        } else {
            String::new()
        };

        if let Some(contact) = self.storage.find_contact_by_number(&number).await? {
            self.storage
                .link_identity(channel, &sender.external_id, &contact.id)
                .await?;
            debug!(contact = %contact.id, %channel, "linked identity to contact by number");
            return Ok(contact);
        }

        let name = if sender.display_name.is_empty() {
            number.clone()
        } else {
            sender.display_name.clone()
        };
        let contact = Contact {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            number,
        };
        self.storage.insert_contact(&contact).await?;
        self.storage
            .link_identity(channel, &sender.external_id, &contact.id)
            .await?;
        info!(contact = %contact.id, %channel, "created contact");
        Ok(contact)
    }

    pub async fn get(&self, id: &str) -> Result<Contact, OmnideskError> {
        self.storage
            .get_contact(id)
            .await?
            .ok_or_else(|| OmnideskError::not_found("contact", id))
    }

    /// Applies an agent edit.
    ///
    /// An empty `name` or `number` leaves that field unchanged. Setting a
    /// number owned by other contacts folds them into this one first.
    /// Returns the updated contact and the ids of merged duplicates.
    pub async fn update(
        &self,
        id: &str,
        name: &str,
        number: &str,
    ) -> Result<(Contact, Vec<String>), OmnideskError> {
        let current = self.get(id).await?;
        let mut merged = Vec::new();

        if !name.is_empty() && name != current.name {
            self.storage.update_contact_name(id, name).await?;
        }

        if !number.is_empty() && number != current.number {
            while let Some(duplicate) = self
                .storage
                .find_contact_by_number(number)
                .await?
                .filter(|c| c.id != id)
            {
                self.storage.merge_contacts(id, &duplicate.id).await?;
                info!(keep = %id, duplicate = %duplicate.id, "merged duplicate contact");
                merged.push(duplicate.id);
            }
            self.storage.update_contact_number(id, number).await?;
        }

        Ok((self.get(id).await?, merged))
    }
}
