// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only message log.

use omnidesk_core::{Message, MessageStatus, OmnideskError};
use rusqlite::params;

use crate::database::Database;
use crate::queries::parse_column;

pub async fn append_message(
    db: &Database,
    conversation_id: &str,
    message: &Message,
) -> Result<(), OmnideskError> {
    let conversation_id = conversation_id.to_string();
    let msg = message.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO messages (conversation_id, kind, body, timestamp, status, from_agent)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    conversation_id,
                    msg.kind.to_string(),
                    msg.body,
                    msg.timestamp,
                    msg.status.as_i64(),
                    msg.from_agent,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Messages of one conversation in append order.
pub async fn messages_for_conversation(
    db: &Database,
    conversation_id: &str,
) -> Result<Vec<Message>, OmnideskError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| load_messages(conn, &conversation_id))
        .await
        .map_err(crate::database::map_tr_err)
}

pub(crate) fn load_messages(
    conn: &rusqlite::Connection,
    conversation_id: &str,
) -> rusqlite::Result<Vec<Message>> {
    let mut stmt = conn.prepare_cached(
        "SELECT kind, body, timestamp, status, from_agent
         FROM messages WHERE conversation_id = ?1 ORDER BY id ASC",
    )?;
    let rows = stmt.query_map(params![conversation_id], |row| {
        Ok(Message {
            kind: parse_column(row, 0)?,
            body: row.get(1)?,
            timestamp: row.get(2)?,
            status: MessageStatus::from_i64(row.get(3)?),
            from_agent: row.get(4)?,
        })
    })?;
    rows.collect()
}

/// Raises the status of agent-sent messages that are still below `status`.
pub async fn raise_agent_status(
    db: &Database,
    conversation_id: &str,
    status: MessageStatus,
) -> Result<u64, OmnideskError> {
    let conversation_id = conversation_id.to_string();
    let level = status.as_i64();
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE messages SET status = ?2
                 WHERE conversation_id = ?1 AND from_agent = 1 AND status < ?2",
                params![conversation_id, level],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    Ok(changed as u64)
}
