// Acceptance tests for BAO Flow status changes
// Given/When/Then scenarios for the status changer and transition applier

use acceptance_framework::*;
use baoflow::models::StageCode;

#[test]
fn acceptance_status_change_updates_stage_and_appends_history() {
    // Given deal "Tea tins" at M05
    // When `bao status 1 M06`
    // Then the deal is at M06
    // And one entry M05 -> M06 with the default note was appended

    let ctx = AcceptanceTestContext::new();
    let given = GivenBuilder::new(&ctx);
    let deal = given.deal_exists("Tea tins", StageCode::M05);

    let mut when = WhenBuilder::new(&ctx);
    when.execute_success(&["status", &deal.to_string(), "M06"]);

    let then = ThenBuilder::new(&ctx, when.result());
    then.message_contains("M06 (Sample approved)")
        .deal_stage_is(deal, "M06")
        .history_count_is(deal, 2)
        .last_transition_is(deal, Some("M05"), StageCode::M06, "Status changed to Sample approved");
}

#[test]
fn acceptance_status_change_records_custom_note() {
    let ctx = AcceptanceTestContext::new();
    let given = GivenBuilder::new(&ctx);
    let deal = given.deal_exists("Rigid boxes", StageCode::M16);

    let mut when = WhenBuilder::new(&ctx);
    when.execute_success(&["status", &deal.to_string(), "m17", "--note", "QC booked for Friday"]);

    let then = ThenBuilder::new(&ctx, when.result());
    then.deal_stage_is(deal, "M17")
        .last_transition_is(deal, Some("M16"), StageCode::M17, "QC booked for Friday");
}

#[test]
fn acceptance_status_change_may_skip_and_go_backwards() {
    let ctx = AcceptanceTestContext::new();
    let given = GivenBuilder::new(&ctx);
    let deal = given.deal_exists("Paper bags", StageCode::M10);

    let mut when = WhenBuilder::new(&ctx);
    when.execute_success(&["status", &deal.to_string(), "M03"]);
    when.execute_success(&["status", &deal.to_string(), "M25"]);

    let then = ThenBuilder::new(&ctx, when.result());
    then.deal_stage_is(deal, "M25")
        .history_count_is(deal, 3)
        .last_transition_is(deal, Some("M03"), StageCode::M25, "Status changed to Closed");
}

#[test]
fn acceptance_same_stage_is_a_no_op() {
    // Given deal at M08
    // When `bao status 1 M08`
    // Then nothing is written

    let ctx = AcceptanceTestContext::new();
    let given = GivenBuilder::new(&ctx);
    let deal = given.deal_exists("Labels", StageCode::M08);

    let mut when = WhenBuilder::new(&ctx);
    when.execute_success(&["status", &deal.to_string(), "M08"]);

    let then = ThenBuilder::new(&ctx, when.result());
    then.message_contains("already at M08")
        .deal_stage_is(deal, "M08")
        .history_count_is(deal, 1);
}

#[test]
fn acceptance_failed_transition_is_reported_with_retry_hint() {
    // Given deal at M12 and a store that rejects history writes
    // When `bao status 1 M13`
    // Then the command fails with a retry hint
    // And the deal stays at M12

    let ctx = AcceptanceTestContext::new();
    let given = GivenBuilder::new(&ctx);
    let deal = given.deal_exists("Display stands", StageCode::M12);
    ctx.db()
        .execute_batch(
            "CREATE TRIGGER fail_history BEFORE INSERT ON status_history
             BEGIN SELECT RAISE(ABORT, 'history unavailable'); END;",
        )
        .unwrap();

    let mut when = WhenBuilder::new(&ctx);
    when.execute_failure(&["status", &deal.to_string(), "M13"]);

    let then = ThenBuilder::new(&ctx, when.result());
    then.exit_code_is(1)
        .stderr_contains("Error: ")
        .stderr_contains(&format!("Retry with: bao status {} M13", deal))
        .deal_stage_is(deal, "M12")
        .history_count_is(deal, 1);
}

#[test]
fn acceptance_legacy_stage_transitions_to_canonical() {
    // Given deal whose stored stage is the legacy value "sampling"
    // When `bao status 1 M06`
    // Then previous stage is recorded as "sampling"

    let ctx = AcceptanceTestContext::new();
    let given = GivenBuilder::new(&ctx);
    let deal = given.legacy_deal_exists("Old tube order", "sampling");

    let mut when = WhenBuilder::new(&ctx);
    when.execute_success(&["status", &deal.to_string(), "M06"]);

    let then = ThenBuilder::new(&ctx, when.result());
    then.message_contains("sampling (Sampling)")
        .deal_stage_is(deal, "M06")
        .last_transition_is(deal, Some("sampling"), StageCode::M06, "Status changed to Sample approved");
}

#[test]
fn acceptance_status_change_for_missing_deal_fails() {
    let ctx = AcceptanceTestContext::new();

    let mut when = WhenBuilder::new(&ctx);
    when.execute_failure(&["status", "42", "M02"]);

    let then = ThenBuilder::new(&ctx, when.result());
    then.exit_code_is(1)
        .message_contains("Deal 42 not found");
}

#[test]
fn acceptance_invalid_stage_is_rejected() {
    let ctx = AcceptanceTestContext::new();
    let given = GivenBuilder::new(&ctx);
    let deal = given.deal_exists("Tins", StageCode::M01);

    let mut when = WhenBuilder::new(&ctx);
    when.execute_failure(&["status", &deal.to_string(), "M26"]);

    let then = ThenBuilder::new(&ctx, when.result());
    then.exit_code_is(1)
        .message_contains("Stage must be one of M01 through M25")
        .deal_stage_is(deal, "M01")
        .history_count_is(deal, 1);
}

#[test]
fn acceptance_unreachable_mail_endpoint_does_not_fail_transition() {
    // Given email is configured against an endpoint nothing listens on
    // When a status change is applied
    // Then the change succeeds and the send failure is only logged

    let ctx = AcceptanceTestContext::with_config(
        "email.endpoint=http://127.0.0.1:9/emails\nemail.api_key=test\nemail.from=flow@bao.jp\nemail.notify=factory@bao.jp\n",
    );
    let given = GivenBuilder::new(&ctx);
    let deal = given.deal_exists("Cosmetic boxes", StageCode::M14);

    let mut when = WhenBuilder::new(&ctx);
    when.execute_success(&["status", &deal.to_string(), "M15"]);

    let then = ThenBuilder::new(&ctx, when.result());
    then.exit_code_is(0)
        .deal_stage_is(deal, "M15")
        .history_count_is(deal, 2);
}

#[test]
fn acceptance_actor_comes_from_config() {
    let ctx = AcceptanceTestContext::with_config("user.email=mori@bao.jp\n");
    let given = GivenBuilder::new(&ctx);
    let deal = given.deal_exists("Shipping cartons", StageCode::M21);

    let mut when = WhenBuilder::new(&ctx);
    when.execute_success(&["status", &deal.to_string(), "M22"]);
    when.execute_success(&["history", &deal.to_string()]);

    let then = ThenBuilder::new(&ctx, when.result());
    then.message_contains("(mori@bao.jp)")
        .message_contains("In transit");
}
