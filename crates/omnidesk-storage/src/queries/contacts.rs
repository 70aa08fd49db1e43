// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contacts and their channel identities.

use omnidesk_core::{ChannelType, Contact, OmnideskError, types::now_millis};
use rusqlite::{OptionalExtension, params};

use crate::database::Database;

fn row_to_contact(row: &rusqlite::Row<'_>) -> rusqlite::Result<Contact> {
    Ok(Contact {
        id: row.get(0)?,
        name: row.get(1)?,
        number: row.get(2)?,
    })
}

pub async fn insert_contact(db: &Database, contact: &Contact) -> Result<(), OmnideskError> {
    let contact = contact.clone();
    let created_at = now_millis();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO contacts (id, name, number, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![contact.id, contact.name, contact.number, created_at],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn get_contact(db: &Database, id: &str) -> Result<Option<Contact>, OmnideskError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, name, number FROM contacts WHERE id = ?1",
                params![id],
                row_to_contact,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn find_by_identity(
    db: &Database,
    channel: ChannelType,
    external_id: &str,
) -> Result<Option<Contact>, OmnideskError> {
    let channel = channel.to_string();
    let external_id = external_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT c.id, c.name, c.number
                 FROM contact_identities i JOIN contacts c ON c.id = i.contact_id
                 WHERE i.channel = ?1 AND i.external_id = ?2",
                params![channel, external_id],
                row_to_contact,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Oldest contact carrying `number`. Empty numbers never match.
pub async fn find_by_number(db: &Database, number: &str) -> Result<Option<Contact>, OmnideskError> {
    if number.is_empty() {
        return Ok(None);
    }
    let number = number.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, name, number FROM contacts WHERE number = ?1
                 ORDER BY created_at, id LIMIT 1",
                params![number],
                row_to_contact,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn link_identity(
    db: &Database,
    channel: ChannelType,
    external_id: &str,
    contact_id: &str,
) -> Result<(), OmnideskError> {
    let channel = channel.to_string();
    let external_id = external_id.to_string();
    let contact_id = contact_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO contact_identities (channel, external_id, contact_id)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(channel, external_id) DO UPDATE SET contact_id = excluded.contact_id",
                params![channel, external_id, contact_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn update_name(db: &Database, id: &str, name: &str) -> Result<(), OmnideskError> {
    update_column(db, "UPDATE contacts SET name = ?2 WHERE id = ?1", id, name).await
}

pub async fn update_number(db: &Database, id: &str, number: &str) -> Result<(), OmnideskError> {
    update_column(db, "UPDATE contacts SET number = ?2 WHERE id = ?1", id, number).await
}

async fn update_column(
    db: &Database,
    sql: &'static str,
    id: &str,
    value: &str,
) -> Result<(), OmnideskError> {
    let key = id.to_string();
    let value = value.to_string();
    let changed = db
        .connection()
        .call(move |conn| conn.execute(sql, params![key, value]))
        .await
        .map_err(crate::database::map_tr_err)?;
    if changed == 0 {
        return Err(OmnideskError::not_found("contact", id));
    }
    Ok(())
}

/// Folds `duplicate` into `keep` in one transaction.
pub async fn merge(db: &Database, keep: &str, duplicate: &str) -> Result<(), OmnideskError> {
    let keep = keep.to_string();
    let duplicate = duplicate.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "UPDATE calls SET contact_id = ?1 WHERE contact_id = ?2",
                params![keep, duplicate],
            )?;
            tx.execute(
                "UPDATE conversations SET contact_id = ?1 WHERE contact_id = ?2",
                params![keep, duplicate],
            )?;
            tx.execute(
                "UPDATE contact_identities SET contact_id = ?1 WHERE contact_id = ?2",
                params![keep, duplicate],
            )?;
            tx.execute("DELETE FROM contacts WHERE id = ?1", params![duplicate])?;
            tx.commit()
        })
        .await
        .map_err(crate::database::map_tr_err)
}
