//   Copyright 2024 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

mod support;

use chrono::Duration;
use support::{error_result, verification_result, Harness};
use tari_escrow_common_types::{optional::Optional, DealId};
use tari_escrow_storage::{
    models::{Deal, DealStatus, Payout, Refund, ReviewReason, ReviewStatus, SettlementStatus},
    DealStore,
    DealStoreReadTransaction,
};
use tari_escrow_storage_sqlite::SqliteDealStore;

fn deal_status(store: &SqliteDealStore, deal_id: DealId) -> DealStatus {
    store.with_read_tx(|tx| Deal::get(tx, deal_id)).unwrap().status
}

fn count_settlements(store: &SqliteDealStore) -> (usize, usize) {
    store
        .with_read_tx(|tx| {
            let mut payouts = 0;
            let mut refunds = 0;
            for status in [
                SettlementStatus::PendingSettlement,
                SettlementStatus::AwaitingConnection,
                SettlementStatus::Completed,
                SettlementStatus::Failed,
            ] {
                payouts += tx.payouts_fetch_all_by_status(status, 100)?.len();
                refunds += tx.refunds_fetch_all_by_status(status, 100)?.len();
            }
            Ok::<_, tari_escrow_storage::StorageError>((payouts, refunds))
        })
        .unwrap()
}

// Deal created (amount=50, 24h window) -> accepted -> funded -> posted at T0,
// a passing verdict at T0+1h keeps it Verifying, and the sweep at T0+25h
// completes it with exactly one payout.
#[tokio::test]
async fn a_passing_verification_completes_only_after_the_window() {
    let harness = Harness::new();
    let (deal_id, t0) = harness.deal_in_verifying();

    let ack = harness
        .lifecycle
        .process_verification_result(verification_result(deal_id, 85, 95, vec![]), t0 + Duration::hours(1))
        .await
        .unwrap();
    assert!(ack.changed);
    assert_eq!(ack.deal_status, DealStatus::Verifying);
    assert_eq!(deal_status(&harness.store, deal_id), DealStatus::Verifying);
    assert_eq!(count_settlements(&harness.store), (0, 0));

    // Sweep before the window closes: nothing happens
    let finalised = harness
        .lifecycle
        .run_duration_checks(t0 + Duration::hours(23), 20)
        .await
        .unwrap();
    assert_eq!(finalised, 0);
    assert_eq!(deal_status(&harness.store, deal_id), DealStatus::Verifying);

    // Sweep after: final completion and a single payout
    let finalised = harness
        .lifecycle
        .run_duration_checks(t0 + Duration::hours(25), 20)
        .await
        .unwrap();
    assert_eq!(finalised, 1);
    assert_eq!(deal_status(&harness.store, deal_id), DealStatus::Completed);

    let payout = harness
        .store
        .with_read_tx(|tx| Payout::get_active(tx, deal_id))
        .unwrap();
    assert_eq!(payout.status, SettlementStatus::Completed);
    assert_eq!(count_settlements(&harness.store), (1, 0));
    assert_eq!(harness.backend.transfer_count(), 1);
}

// A confidently-low score fails the deal immediately with exactly one refund,
// not waiting for the window.
#[tokio::test]
async fn a_confident_low_score_fails_and_refunds_immediately() {
    let harness = Harness::new();
    let (deal_id, t0) = harness.deal_in_verifying();

    let ack = harness
        .lifecycle
        .process_verification_result(verification_result(deal_id, 40, 90, vec![]), t0 + Duration::hours(1))
        .await
        .unwrap();
    assert!(ack.changed);
    assert_eq!(ack.deal_status, DealStatus::Failed);
    assert_eq!(deal_status(&harness.store, deal_id), DealStatus::Failed);

    let refund = harness
        .store
        .with_read_tx(|tx| Refund::get_active(tx, deal_id))
        .unwrap();
    assert_eq!(refund.status, SettlementStatus::Completed);
    assert_eq!(count_settlements(&harness.store), (0, 1));
}

// The same low score at low confidence goes to a human instead.
#[tokio::test]
async fn a_low_confidence_verdict_goes_to_review_not_refund() {
    let harness = Harness::new();
    let (deal_id, t0) = harness.deal_in_verifying();

    let ack = harness
        .lifecycle
        .process_verification_result(verification_result(deal_id, 40, 50, vec![]), t0 + Duration::hours(1))
        .await
        .unwrap();
    assert!(ack.changed);
    assert_eq!(deal_status(&harness.store, deal_id), DealStatus::Verifying);
    assert_eq!(count_settlements(&harness.store), (0, 0));

    let reviews = harness.lifecycle.reviews().fetch_open(10).unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0].reason_code, ReviewReason::InferenceAmbiguous);
}

// A requirement failure dominates even a 95 score.
#[tokio::test]
async fn a_failed_requirement_dominates_the_score() {
    let harness = Harness::new();
    let (deal_id, t0) = harness.deal_in_verifying();

    harness
        .lifecycle
        .process_verification_result(
            verification_result(deal_id, 95, 99, vec!["required link missing"]),
            t0 + Duration::hours(1),
        )
        .await
        .unwrap();

    assert_eq!(deal_status(&harness.store, deal_id), DealStatus::Failed);
    let deal = harness.store.with_read_tx(|tx| Deal::get(tx, deal_id)).unwrap();
    assert!(deal.failure_reason.unwrap().contains("required link missing"));
    assert_eq!(count_settlements(&harness.store), (0, 1));
}

// An orchestrator error keeps the deal Verifying, opens one high-priority
// review and settles nothing.
#[tokio::test]
async fn an_orchestrator_error_opens_a_review_and_settles_nothing() {
    let harness = Harness::new();
    let (deal_id, t0) = harness.deal_in_verifying();

    let ack = harness
        .lifecycle
        .process_verification_result(error_result(deal_id, None), t0 + Duration::hours(1))
        .await
        .unwrap();
    assert!(ack.changed);
    assert_eq!(deal_status(&harness.store, deal_id), DealStatus::Verifying);

    let reviews = harness.lifecycle.reviews().fetch_open(10).unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0].reason_code, ReviewReason::OrchestratorError);
    assert_eq!(reviews[0].status, ReviewStatus::Open);
    assert_eq!(count_settlements(&harness.store), (0, 0));
}

// A duplicate callback after the deal already failed is acknowledged as a
// no-op: no state change, no second refund.
#[tokio::test]
async fn a_duplicate_callback_after_failure_is_a_no_op() {
    let harness = Harness::new();
    let (deal_id, t0) = harness.deal_in_verifying();

    let result = verification_result(deal_id, 40, 90, vec![]);
    harness
        .lifecycle
        .process_verification_result(result.clone(), t0 + Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(deal_status(&harness.store, deal_id), DealStatus::Failed);

    let ack = harness
        .lifecycle
        .process_verification_result(result, t0 + Duration::hours(1))
        .await
        .unwrap();
    assert!(!ack.changed);
    assert_eq!(ack.deal_status, DealStatus::Failed);
    assert_eq!(count_settlements(&harness.store), (0, 1));
}

// The window elapsing without any passing verdict fails the deal with a
// refund.
#[tokio::test]
async fn an_elapsed_window_without_success_fails_with_refund() {
    let harness = Harness::new();
    let (deal_id, t0) = harness.deal_in_verifying();

    harness
        .lifecycle
        .process_verification_result(verification_result(deal_id, 70, 90, vec![]), t0 + Duration::hours(1))
        .await
        .unwrap();
    // 70 is in the ambiguous band: still Verifying, review open
    assert_eq!(deal_status(&harness.store, deal_id), DealStatus::Verifying);

    harness
        .lifecycle
        .run_duration_checks(t0 + Duration::hours(25), 20)
        .await
        .unwrap();

    let deal = harness.store.with_read_tx(|tx| Deal::get(tx, deal_id)).unwrap();
    assert_eq!(deal.status, DealStatus::Failed);
    assert_eq!(
        deal.failure_reason.as_deref(),
        Some("duration completed without successful verification")
    );
    assert_eq!(count_settlements(&harness.store), (0, 1));
}

// A reviewer releasing an ambiguous deal records a success that is still
// duration-gated.
#[tokio::test]
async fn a_release_decision_is_still_duration_gated() {
    let harness = Harness::new();
    let (deal_id, t0) = harness.deal_in_verifying();

    harness
        .lifecycle
        .process_verification_result(verification_result(deal_id, 65, 90, vec![]), t0 + Duration::hours(1))
        .await
        .unwrap();
    let review = harness.lifecycle.reviews().fetch_open(10).unwrap().remove(0);

    let reviewer = tari_escrow_common_types::ActorId::from("reviewer-1");
    harness.lifecycle.reviews().assign(review.id, reviewer.clone()).unwrap();
    harness
        .lifecycle
        .process_review_decision(
            review.id,
            reviewer,
            false,
            tari_escrow_storage::models::ReviewDecision::Release,
            None,
            t0 + Duration::hours(2),
        )
        .await
        .unwrap();

    // Released, but the window has not elapsed: no payout yet
    assert_eq!(deal_status(&harness.store, deal_id), DealStatus::Verifying);
    assert_eq!(count_settlements(&harness.store), (0, 0));

    harness
        .lifecycle
        .run_duration_checks(t0 + Duration::hours(25), 20)
        .await
        .unwrap();
    assert_eq!(deal_status(&harness.store, deal_id), DealStatus::Completed);
    assert_eq!(count_settlements(&harness.store), (1, 0));
}

// A refund decision fails the deal and refunds exactly once; deciding a
// closed review is rejected.
#[tokio::test]
async fn a_refund_decision_fails_the_deal_once() {
    let harness = Harness::new();
    let (deal_id, t0) = harness.deal_in_verifying();

    harness
        .lifecycle
        .process_verification_result(error_result(deal_id, None), t0 + Duration::hours(1))
        .await
        .unwrap();
    let review = harness.lifecycle.reviews().fetch_open(10).unwrap().remove(0);

    harness
        .lifecycle
        .process_review_decision(
            review.id,
            "admin-1".into(),
            true,
            tari_escrow_storage::models::ReviewDecision::Refund,
            Some("post was deleted".to_string()),
            t0 + Duration::hours(2),
        )
        .await
        .unwrap();

    assert_eq!(deal_status(&harness.store, deal_id), DealStatus::Failed);
    assert_eq!(count_settlements(&harness.store), (0, 1));

    // Deciding again fails cleanly and changes nothing
    let err = harness
        .lifecycle
        .process_review_decision(
            review.id,
            "admin-1".into(),
            true,
            tari_escrow_storage::models::ReviewDecision::Release,
            None,
            t0 + Duration::hours(3),
        )
        .await
        .unwrap_err();
    assert!(err.is_caller_error());
    assert_eq!(count_settlements(&harness.store), (0, 1));
}

// A callback for a deal that was never posted / does not exist.
#[tokio::test]
async fn a_callback_for_an_unknown_deal_is_an_error() {
    let harness = Harness::new();

    let err = harness
        .lifecycle
        .process_verification_result(
            verification_result(DealId::new_random(), 85, 95, vec![]),
            chrono::Utc::now().naive_utc(),
        )
        .await
        .unwrap_err();
    assert!(err.is_caller_error());
}

// Status-guarded transitions: replaying accept and fund is rejected without
// side effects.
#[tokio::test]
async fn replayed_party_actions_are_rejected() {
    let harness = Harness::new();
    let (deal_id, t0) = harness.deal_in_verifying();

    let err = harness.deals.accept(deal_id, Harness::creator(), t0).unwrap_err();
    assert!(err.is_caller_error());

    let err = harness
        .deals
        .mark_funded(deal_id, Default::default(), t0)
        .unwrap_err();
    assert!(err.is_caller_error());

    // Only the single original funding event exists
    let events = harness
        .store
        .with_read_tx(|tx| tx.escrow_events_fetch_by_deal(deal_id))
        .unwrap();
    assert_eq!(events.len(), 1);

    let missing = harness
        .store
        .with_read_tx(|tx| Deal::get(tx, DealId::new_random()).optional())
        .unwrap();
    assert!(missing.is_none());
}
