use rusqlite::Connection;
use crate::models::{StageValue, StatusHistoryEntry};
use anyhow::{Context, Result};

/// Status history repository
///
/// Entries are append-only. There is deliberately no update or delete here, and
/// the schema triggers reject both.
pub struct HistoryRepo;

impl HistoryRepo {
    /// Append one history entry and return it with its ID
    pub fn append(conn: &Connection, entry: &StatusHistoryEntry) -> Result<StatusHistoryEntry> {
        conn.execute(
            "INSERT INTO status_history (deal_id, previous_stage, new_stage, note, actor, created_ts)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                entry.deal_id,
                entry.previous_stage.as_ref().map(|s| s.as_stored().to_string()),
                entry.new_stage.as_stored(),
                entry.note,
                entry.actor,
                entry.created_ts,
            ],
        )
        .with_context(|| format!("Failed to append status history for deal {}", entry.deal_id))?;

        Ok(StatusHistoryEntry {
            id: Some(conn.last_insert_rowid()),
            ..entry.clone()
        })
    }

    /// All entries for a deal, oldest first
    pub fn get_by_deal(conn: &Connection, deal_id: i64) -> Result<Vec<StatusHistoryEntry>> {
        let mut stmt = conn.prepare(
            "SELECT id, deal_id, previous_stage, new_stage, note, actor, created_ts
             FROM status_history
             WHERE deal_id = ?1
             ORDER BY created_ts ASC, id ASC"
        )?;
        let rows = stmt.query_map([deal_id], |row| {
            let previous: Option<String> = row.get(2)?;
            let new_stage: String = row.get(3)?;
            Ok(StatusHistoryEntry {
                id: Some(row.get(0)?),
                deal_id: row.get(1)?,
                previous_stage: previous.as_deref().map(StageValue::parse),
                new_stage: StageValue::parse(&new_stage),
                note: row.get(4)?,
                actor: row.get(5)?,
                created_ts: row.get(6)?,
            })
        })?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    pub fn count_for_deal(conn: &Connection, deal_id: i64) -> Result<i64> {
        conn.query_row(
            "SELECT COUNT(*) FROM status_history WHERE deal_id = ?1",
            [deal_id],
            |row| row.get(0),
        )
        .context("Failed to count status history")
    }

    /// Timestamps of all transitions since `since_ts` (creation entries excluded)
    pub fn transition_timestamps_since(conn: &Connection, since_ts: i64) -> Result<Vec<i64>> {
        let mut stmt = conn.prepare(
            "SELECT created_ts FROM status_history
             WHERE created_ts >= ?1 AND previous_stage IS NOT NULL
             ORDER BY created_ts"
        )?;
        let rows = stmt.query_map([since_ts], |row| row.get::<_, i64>(0))?;

        let mut stamps = Vec::new();
        for row in rows {
            stamps.push(row?);
        }
        Ok(stamps)
    }
}
