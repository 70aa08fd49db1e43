// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Phone call history.

use omnidesk_core::{CallRecord, OmnideskError};
use rusqlite::params;

use crate::database::Database;

pub async fn insert_call(db: &Database, call: &CallRecord) -> Result<(), OmnideskError> {
    let call = call.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO calls (id, contact_id, agent, timestamp, duration)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![call.id, call.contact_id, call.agent, call.timestamp, call.duration],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Calls of a contact, newest first.
pub async fn calls_for_contact(
    db: &Database,
    contact_id: &str,
) -> Result<Vec<CallRecord>, OmnideskError> {
    let contact_id = contact_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, contact_id, agent, timestamp, duration FROM calls
                 WHERE contact_id = ?1 ORDER BY timestamp DESC",
            )?;
            let rows = stmt.query_map(params![contact_id], |row| {
                Ok(CallRecord {
                    id: row.get(0)?,
                    contact_id: row.get(1)?,
                    agent: row.get(2)?,
                    timestamp: row.get(3)?,
                    duration: row.get(4)?,
                })
            })?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_call_id_is_ignored() {
        let db = Database::open_in_memory().await.unwrap();
        let call = CallRecord {
            id: "1700000000.12".into(),
            contact_id: "c1".into(),
            agent: "101".into(),
            timestamp: 1_700_000_000,
            duration: 42,
        };
        insert_call(&db, &call).await.unwrap();
        insert_call(&db, &call).await.unwrap();

        let calls = calls_for_contact(&db, "c1").await.unwrap();
        assert_eq!(calls, vec![call]);
    }
}
