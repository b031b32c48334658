// Transaction and Atomicity Tests
// Verify that stage writes are atomic and history is append-only

use acceptance_framework::*;
use baoflow::models::{StageCode, StageValue};
use baoflow::repo::{DealRepo, HistoryRepo};
use baoflow::workflow::{
    ChangeOutcome, ChangerState, SqliteTransitionApplier, StatusChanger, TransitionApplier, TransitionError,
};

// ============================================================================
// Atomic Operations Tests
// ============================================================================

#[test]
fn test_failed_history_write_rolls_back_stage() {
    // Make the history insert fail inside the transition transaction;
    // the stage update must not survive it
    let ctx = AcceptanceTestContext::new();
    let given = GivenBuilder::new(&ctx);
    let deal = given.deal_exists("Display stands", StageCode::M12);

    ctx.db()
        .execute_batch(
            "CREATE TRIGGER fail_history BEFORE INSERT ON status_history
             BEGIN SELECT RAISE(ABORT, 'history unavailable'); END;",
        )
        .unwrap();

    let mut applier = SqliteTransitionApplier::new(ctx.db(), None);
    let result = applier.apply_transition(deal, StageCode::M13, "artwork in");
    assert!(matches!(result, Err(TransitionError::Store(_))));

    let then = ThenBuilder::new(&ctx, None);
    then.deal_stage_is(deal, "M12")
        .history_count_is(deal, 1);
}

#[test]
fn test_changer_failure_keeps_stage_and_retry_succeeds() {
    let ctx = AcceptanceTestContext::new();
    let given = GivenBuilder::new(&ctx);
    let deal = given.deal_exists("Display stands", StageCode::M12);
    let current = DealRepo::get_by_id(ctx.db(), deal).unwrap().unwrap().current_stage;

    ctx.db()
        .execute_batch(
            "CREATE TRIGGER fail_history BEFORE INSERT ON status_history
             BEGIN SELECT RAISE(ABORT, 'history unavailable'); END;",
        )
        .unwrap();

    let mut changer = StatusChanger::new(deal, current);
    let mut applier = SqliteTransitionApplier::new(ctx.db(), None);
    let outcome = changer.change(&mut applier, StageCode::M13, None).unwrap();
    assert!(matches!(outcome, ChangeOutcome::Failed { retry: StageCode::M13, .. }));
    assert!(matches!(changer.state(), ChangerState::Failed { .. }));
    assert_eq!(changer.current(), &StageValue::Canonical(StageCode::M12));

    ctx.db().execute_batch("DROP TRIGGER fail_history;").unwrap();

    let outcome = changer.retry(&mut applier).unwrap();
    assert!(matches!(outcome, ChangeOutcome::Applied { refresh: true, .. }));
    assert_eq!(changer.state(), &ChangerState::Idle);

    let then = ThenBuilder::new(&ctx, None);
    then.deal_stage_is(deal, "M13")
        .history_count_is(deal, 2)
        .last_transition_is(deal, Some("M12"), StageCode::M13, "Status changed to Artwork preparation");
}

// ============================================================================
// History Immutability Tests
// ============================================================================

#[test]
fn test_history_rows_cannot_be_updated() {
    let ctx = AcceptanceTestContext::new();
    let given = GivenBuilder::new(&ctx);
    let deal = given.deal_exists("Tubes", StageCode::M01);

    let result = ctx.db().execute(
        "UPDATE status_history SET note = 'rewritten' WHERE deal_id = ?1",
        [deal],
    );
    assert!(result.is_err());

    let entries = HistoryRepo::get_by_deal(ctx.db(), deal).unwrap();
    assert_eq!(entries[0].note, "Deal created");
}

#[test]
fn test_history_rows_cannot_be_deleted() {
    let ctx = AcceptanceTestContext::new();
    let given = GivenBuilder::new(&ctx);
    let deal = given.deal_exists("Tubes", StageCode::M01);

    let result = ctx.db().execute("DELETE FROM status_history WHERE deal_id = ?1", [deal]);
    assert!(result.is_err());

    let then = ThenBuilder::new(&ctx, None);
    then.history_count_is(deal, 1);
}
