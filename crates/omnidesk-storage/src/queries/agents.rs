// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agent roster.

use omnidesk_core::{AgentRecord, OmnideskError};
use rusqlite::params;

use crate::database::Database;

pub async fn upsert_agent(db: &Database, agent: &AgentRecord) -> Result<(), OmnideskError> {
    let agent = agent.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO agents (extension, name, secret, capacity)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(extension) DO UPDATE SET
                    name = excluded.name,
                    secret = excluded.secret,
                    capacity = excluded.capacity",
                params![agent.extension, agent.name, agent.secret, agent.capacity],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The whole roster ordered by extension.
pub async fn list_agents(db: &Database) -> Result<Vec<AgentRecord>, OmnideskError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT extension, name, secret, capacity FROM agents ORDER BY extension",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(AgentRecord {
                    extension: row.get(0)?,
                    name: row.get(1)?,
                    secret: row.get(2)?,
                    capacity: row.get(3)?,
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

    fn agent(ext: &str, capacity: u32) -> AgentRecord {
        AgentRecord {
            extension: ext.into(),
            name: format!("Agent {ext}"),
            secret: format!("pw-{ext}"),
            capacity,
        }
    }

    #[tokio::test]
    async fn upsert_replaces_existing_entry() {
        let db = Database::open_in_memory().await.unwrap();
        upsert_agent(&db, &agent("102", 2)).await.unwrap();
        upsert_agent(&db, &agent("101", 2)).await.unwrap();
        upsert_agent(&db, &agent("101", 4)).await.unwrap();

        let roster = list_agents(&db).await.unwrap();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0].extension, "101");
        assert_eq!(roster[0].capacity, 4);
        assert_eq!(roster[1].secret, "pw-102");
    }
}
