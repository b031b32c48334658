use thiserror::Error;
use crate::models::{StageCode, StageValue, StatusHistoryEntry};
use crate::workflow::applier::{TransitionApplier, TransitionError};

/// One entry of the stage selection control
#[derive(Debug, Clone, PartialEq)]
pub struct StageOption {
    pub code: StageCode,
    pub label: &'static str,
    pub selected: bool,
}

/// A transition request handed to the applier
#[derive(Debug, Clone, PartialEq)]
pub struct PendingChange {
    pub deal_id: i64,
    pub new_stage: StageCode,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChangerState {
    Idle,
    /// Input is disabled until the request resolves
    InFlight(StageCode),
    /// Last request failed; it can be retried as-is
    Failed { pending: PendingChange, error: TransitionError },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChangerError {
    #[error("A status change is already in progress")]
    Busy,
    #[error("Deal is already at {0}")]
    Unchanged(StageCode),
    #[error("No failed status change to retry")]
    NothingToRetry,
    #[error("No status change to {0} is in progress")]
    NotInFlight(StageCode),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChangeOutcome {
    /// The caller should reload deal data
    Applied { entry: StatusHistoryEntry, refresh: bool },
    Failed { error: TransitionError, retry: StageCode },
}

/// Default history note for a stage change
pub fn default_note(stage: StageCode) -> String {
    format!("Status changed to {}", stage.label())
}

/// Stage selection control for one deal
///
/// Holds the interaction-local loading state: at most one transition is in
/// flight per changer.
#[derive(Debug, Clone)]
pub struct StatusChanger {
    deal_id: i64,
    current: StageValue,
    state: ChangerState,
}

impl StatusChanger {
    pub fn new(deal_id: i64, current: StageValue) -> Self {
        Self {
            deal_id,
            current,
            state: ChangerState::Idle,
        }
    }

    pub fn deal_id(&self) -> i64 {
        self.deal_id
    }

    pub fn current(&self) -> &StageValue {
        &self.current
    }

    pub fn state(&self) -> &ChangerState {
        &self.state
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self.state, ChangerState::InFlight(_))
    }

    /// All stages in canonical order; a legacy current value selects nothing
    pub fn options(&self) -> Vec<StageOption> {
        let current = self.current.code();
        StageCode::ALL
            .iter()
            .map(|code| StageOption {
                code: *code,
                label: code.label(),
                selected: current == Some(*code),
            })
            .collect()
    }

    /// Start a change; blank notes are replaced by the default note
    pub fn begin(&mut self, new_stage: StageCode, note: Option<&str>) -> Result<PendingChange, ChangerError> {
        if self.is_disabled() {
            return Err(ChangerError::Busy);
        }
        if self.current.code() == Some(new_stage) {
            return Err(ChangerError::Unchanged(new_stage));
        }

        let note = match note.map(str::trim) {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => default_note(new_stage),
        };
        self.state = ChangerState::InFlight(new_stage);
        Ok(PendingChange {
            deal_id: self.deal_id,
            new_stage,
            note,
        })
    }

    /// Finish a change started with `begin`
    pub fn resolve(
        &mut self,
        pending: PendingChange,
        result: Result<StatusHistoryEntry, TransitionError>,
    ) -> Result<ChangeOutcome, ChangerError> {
        if self.state != ChangerState::InFlight(pending.new_stage) || pending.deal_id != self.deal_id {
            return Err(ChangerError::NotInFlight(pending.new_stage));
        }
        Ok(match result {
            Ok(entry) => {
                self.current = StageValue::Canonical(pending.new_stage);
                self.state = ChangerState::Idle;
                ChangeOutcome::Applied { entry, refresh: true }
            }
            Err(error) => {
                log::warn!(
                    "Status change for deal {} to {} failed: {}",
                    pending.deal_id, pending.new_stage, error
                );
                let retry = pending.new_stage;
                self.state = ChangerState::Failed { pending, error: error.clone() };
                ChangeOutcome::Failed { error, retry }
            }
        })
    }

    /// Pick a new stage and apply it
    pub fn change<A: TransitionApplier + ?Sized>(
        &mut self,
        applier: &mut A,
        new_stage: StageCode,
        note: Option<&str>,
    ) -> Result<ChangeOutcome, ChangerError> {
        let pending = self.begin(new_stage, note)?;
        self.submit(applier, pending)
    }

    /// Re-submit the last failed change
    pub fn retry<A: TransitionApplier + ?Sized>(&mut self, applier: &mut A) -> Result<ChangeOutcome, ChangerError> {
        let pending = match &self.state {
            ChangerState::Failed { pending, .. } => pending.clone(),
            ChangerState::InFlight(_) => return Err(ChangerError::Busy),
            ChangerState::Idle => return Err(ChangerError::NothingToRetry),
        };
        self.state = ChangerState::InFlight(pending.new_stage);
        self.submit(applier, pending)
    }

    fn submit<A: TransitionApplier + ?Sized>(
        &mut self,
        applier: &mut A,
        pending: PendingChange,
    ) -> Result<ChangeOutcome, ChangerError> {
        let result = applier.apply_transition(pending.deal_id, pending.new_stage, &pending.note);
        self.resolve(pending, result)
    }
}
