use serde::{Deserialize, Serialize};
use crate::models::stage::{StageCode, StageValue};

/// One recorded stage transition
///
/// Rows are append-only: the store rejects UPDATE and DELETE on `status_history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub id: Option<i64>,
    pub deal_id: i64,
    pub previous_stage: Option<StageValue>,
    pub new_stage: StageValue,
    pub note: String,
    pub actor: Option<String>,
    pub created_ts: i64,
}

impl StatusHistoryEntry {
    pub fn new(
        deal_id: i64,
        previous_stage: Option<StageValue>,
        new_stage: StageCode,
        note: String,
        actor: Option<String>,
    ) -> Self {
        Self {
            id: None,
            deal_id,
            previous_stage,
            new_stage: StageValue::Canonical(new_stage),
            note,
            actor,
            created_ts: chrono::Utc::now().timestamp(),
        }
    }
}
