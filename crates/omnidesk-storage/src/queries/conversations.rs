// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation headers.

use omnidesk_core::{Contact, Conversation, OmnideskError, SlotEpoch};
use rusqlite::params;

use crate::database::Database;
use crate::queries::messages::load_messages;
use crate::queries::parse_column;

const SELECT_WITH_CONTACT: &str = "SELECT v.id, v.channel, v.external_id, v.agent, v.state,
        v.created_at, c.id, c.name, c.number
     FROM conversations v LEFT JOIN contacts c ON c.id = v.contact_id";

pub async fn upsert_conversation(
    db: &Database,
    conversation: &Conversation,
) -> Result<(), OmnideskError> {
    let id = conversation.id.clone();
    let channel = conversation.channel.to_string();
    let external_id = conversation.external_id.clone();
    let contact_id = conversation.customer.id.clone();
    let agent = conversation.agent.clone();
    let state = conversation.state.to_string();
    let created_at = conversation.created_at;
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO conversations
                    (id, channel, external_id, contact_id, agent, state, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(id) DO UPDATE SET
                    contact_id = excluded.contact_id,
                    agent = excluded.agent,
                    state = excluded.state",
                params![id, channel, external_id, contact_id, agent, state, created_at],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

fn row_to_header(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    let contact_id: Option<String> = row.get(6)?;
    Ok(Conversation {
        id: row.get(0)?,
        channel: parse_column(row, 1)?,
        external_id: row.get(2)?,
        agent: row.get(3)?,
        state: parse_column(row, 4)?,
        created_at: row.get(5)?,
        customer: Contact {
            id: contact_id.unwrap_or_default(),
            name: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
            number: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
        },
        messages: Vec::new(),
    })
}

fn load_with_messages(
    conn: &rusqlite::Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> rusqlite::Result<Vec<Conversation>> {
    let mut stmt = conn.prepare(sql)?;
    let headers = stmt
        .query_map(params, row_to_header)?
        .collect::<Result<Vec<_>, _>>()?;
    headers
        .into_iter()
        .map(|mut conversation| {
            conversation.messages = load_messages(conn, &conversation.id)?;
            Ok(conversation)
        })
        .collect()
}

/// Queued and assigned conversations, oldest first.
pub async fn list_active(db: &Database) -> Result<Vec<Conversation>, OmnideskError> {
    db.connection()
        .call(|conn| {
            let sql = format!(
                "{SELECT_WITH_CONTACT}
                 WHERE v.state IN ('queued', 'assigned')
                 ORDER BY v.created_at ASC, v.rowid ASC"
            );
            load_with_messages(conn, &sql, [])
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Every conversation of a contact, newest first.
pub async fn for_contact(
    db: &Database,
    contact_id: &str,
) -> Result<Vec<Conversation>, OmnideskError> {
    let contact_id = contact_id.to_string();
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "{SELECT_WITH_CONTACT}
                 WHERE v.contact_id = ?1
                 ORDER BY v.created_at DESC, v.rowid DESC"
            );
            load_with_messages(conn, &sql, params![contact_id])
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn finished_epochs(db: &Database) -> Result<Vec<SlotEpoch>, OmnideskError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT channel, external_id, COUNT(*) FROM conversations
                 WHERE state = 'finished' GROUP BY channel, external_id",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(SlotEpoch {
                    channel: parse_column(row, 0)?,
                    external_id: row.get(1)?,
                    finished: row.get::<_, i64>(2)? as u64,
                })
            })?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}
