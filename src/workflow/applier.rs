use rusqlite::Connection;
use thiserror::Error;
use crate::models::{StageCode, StatusHistoryEntry};
use crate::repo::{DealRepo, HistoryRepo};

/// Failure of a stage transition write
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransitionError {
    #[error("Deal {0} not found")]
    NotFound(i64),
    #[error("Transition note cannot be empty")]
    EmptyNote,
    #[error("Failed to record transition: {0}")]
    Store(String),
}

/// Write path for stage transitions
///
/// On success the deal's current stage equals `new_stage` and exactly one
/// history entry has been appended. Implementations do not coordinate
/// concurrent writers: the last write wins.
pub trait TransitionApplier {
    fn apply_transition(
        &mut self,
        deal_id: i64,
        new_stage: StageCode,
        note: &str,
    ) -> Result<StatusHistoryEntry, TransitionError>;
}

/// SQLite-backed applier: stage update and history append share one transaction
pub struct SqliteTransitionApplier<'a> {
    conn: &'a Connection,
    actor: Option<String>,
}

impl<'a> SqliteTransitionApplier<'a> {
    pub fn new(conn: &'a Connection, actor: Option<String>) -> Self {
        Self { conn, actor }
    }
}

fn store_error(e: anyhow::Error) -> TransitionError {
    TransitionError::Store(format!("{:#}", e))
}

impl TransitionApplier for SqliteTransitionApplier<'_> {
    fn apply_transition(
        &mut self,
        deal_id: i64,
        new_stage: StageCode,
        note: &str,
    ) -> Result<StatusHistoryEntry, TransitionError> {
        let note = note.trim();
        if note.is_empty() {
            return Err(TransitionError::EmptyNote);
        }

        // Dropping the transaction without commit rolls back both writes
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| TransitionError::Store(e.to_string()))?;

        let previous = DealRepo::get_by_id(&tx, deal_id)
            .map_err(store_error)?
            .ok_or(TransitionError::NotFound(deal_id))?
            .current_stage;

        let entry = StatusHistoryEntry::new(
            deal_id,
            Some(previous),
            new_stage,
            note.to_string(),
            self.actor.clone(),
        );
        let updated = DealRepo::set_stage(&tx, deal_id, new_stage, entry.created_ts).map_err(store_error)?;
        if updated == 0 {
            return Err(TransitionError::NotFound(deal_id));
        }
        let stored = HistoryRepo::append(&tx, &entry).map_err(store_error)?;

        tx.commit().map_err(|e| TransitionError::Store(e.to_string()))?;
        log::debug!("Deal {} moved to {}", deal_id, new_stage);
        Ok(stored)
    }
}
