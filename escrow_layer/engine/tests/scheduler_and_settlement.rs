//   Copyright 2024 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

mod support;

use std::sync::Arc;

use chrono::{Duration, Utc};
use support::{error_result, verification_result, Harness, MockAnalysisClient};
use tari_escrow_common_types::{Amount, Currency, DealId};
use tari_escrow_engine::{verification::VerificationDispatcher, SchedulerConfig, VerificationScheduler};
use tari_escrow_storage::{
    models::{Deal, DealPatch, DealStatus, EscrowEventType, NewDeal, NewEscrowEvent, SettlementStatus},
    DealStore,
    DealStoreReadTransaction,
    DealStoreWriteTransaction,
};
use tari_escrow_storage_sqlite::SqliteDealStore;

type Scheduler = VerificationScheduler<
    SqliteDealStore,
    MockAnalysisClient,
    support::MockPaymentBackend,
    support::MockNotifier,
>;

fn build_scheduler(harness: &Harness, client: MockAnalysisClient) -> Scheduler {
    let dispatcher = VerificationDispatcher::new(
        harness.store.clone(),
        client,
        "https://escrowd.example/webhooks/verification".to_string(),
    );
    VerificationScheduler::new(
        SchedulerConfig::default(),
        harness.store.clone(),
        dispatcher,
        Arc::clone(&harness.lifecycle),
    )
}

#[tokio::test]
async fn the_initial_check_is_dispatched_once() {
    let harness = Harness::new();
    let client = MockAnalysisClient::new();
    let scheduler = build_scheduler(&harness, client.clone());
    let (deal_id, t0) = harness.deal_in_verifying();

    let summary = scheduler.tick(t0).await.unwrap();
    assert_eq!(summary.dispatched, 1);
    assert_eq!(client.submitted(), 1);

    let request = client.requests.lock().unwrap()[0].clone();
    assert_eq!(request.metadata.deal_id, deal_id);
    assert_eq!(request.url, "https://x.com/creator/status/1");
    assert_eq!(request.metadata.proof_spec.text_proof, "Post must mention the brand");

    // The claimed schedule is not re-dispatched by an overlapping tick
    let summary = scheduler.tick(t0).await.unwrap();
    assert_eq!(summary.dispatched, 0);
    assert_eq!(client.submitted(), 1);
}

#[tokio::test]
async fn a_dispatch_failure_marks_the_schedule_failed_but_not_the_deal() {
    let harness = Harness::new();
    let client = MockAnalysisClient::new();
    let scheduler = build_scheduler(&harness, client.clone());
    let (deal_id, t0) = harness.deal_in_verifying();

    client.set_failing(true);
    let summary = scheduler.tick(t0).await.unwrap();
    assert_eq!(summary.dispatch_failures, 1);
    assert_eq!(summary.dispatched, 0);

    // A single dispatch failure is not a verification failure
    let deal = harness.store.with_read_tx(|tx| Deal::get(tx, deal_id)).unwrap();
    assert_eq!(deal.status, DealStatus::Verifying);
}

#[tokio::test]
async fn overdue_schedules_expire_and_the_sweep_finalises_the_deal() {
    let harness = Harness::new();
    let client = MockAnalysisClient::new();
    let scheduler = build_scheduler(&harness, client.clone());
    let (deal_id, t0) = harness.deal_in_verifying();

    harness
        .lifecycle
        .process_verification_result(verification_result(deal_id, 85, 95, vec![]), t0 + Duration::hours(1))
        .await
        .unwrap();

    // Well past the 26h deadline: due rows expire instead of dispatching, and
    // the duration sweep performs the final completion
    let summary = scheduler.tick(t0 + Duration::hours(27)).await.unwrap();
    assert!(summary.expired >= 1);
    assert_eq!(summary.dispatched, 0);
    assert_eq!(summary.finalised, 1);

    let deal = harness.store.with_read_tx(|tx| Deal::get(tx, deal_id)).unwrap();
    assert_eq!(deal.status, DealStatus::Completed);
    assert_eq!(harness.backend.transfer_count(), 1);
}

/// Sets up a funded, completed deal without going through settlement, so the
/// settlement race can be tested in isolation.
fn completed_deal_without_payout(store: &SqliteDealStore) -> DealId {
    let deal_id = DealId::new_random();
    let now = Utc::now().naive_utc();
    store
        .with_write_tx(|tx| {
            Deal::insert(tx, NewDeal {
                id: deal_id,
                advertiser_id: "advertiser-1".into(),
                platform: "twitter".to_string(),
                amount: Amount(50),
                currency: Currency::Usdc,
                deadline: now + Duration::hours(24),
                public_opt_in: false,
            })?;
            tx.deals_update(deal_id, DealPatch {
                status: Some(DealStatus::Completed),
                creator_id: Some("creator-1".into()),
                ..Default::default()
            })?;
            tx.escrow_events_insert(NewEscrowEvent {
                deal_id,
                event_type: EscrowEventType::Created,
                amount: Amount(50),
                payment_method: Currency::Usdc,
                tx_ref: Some("funding-tx".to_string()),
            })
        })
        .unwrap();
    deal_id
}

#[tokio::test]
async fn concurrent_release_calls_produce_exactly_one_payout() {
    let harness = Harness::new();
    let deal_id = completed_deal_without_payout(&harness.store);
    let settlement = harness.lifecycle.settlement();

    let (a, b) = tokio::join!(settlement.release_escrow(deal_id), settlement.release_escrow(deal_id));
    let a = a.unwrap();
    let b = b.unwrap();
    assert_eq!(a.id, b.id);

    assert_eq!(harness.backend.transfer_count(), 1);
    let active = harness
        .store
        .with_read_tx(|tx| tx.payouts_get_active(deal_id))
        .unwrap();
    assert_eq!(active.status, SettlementStatus::Completed);
    assert_eq!(active.provider_tx_ref.as_deref(), Some("backend-tx-1"));
}

#[tokio::test]
async fn a_missing_destination_parks_the_payout_until_connected() {
    let harness = Harness::new();
    harness.backend.disconnect("creator-1");
    let deal_id = completed_deal_without_payout(&harness.store);
    let settlement = harness.lifecycle.settlement();

    let payout = settlement.release_escrow(deal_id).await.unwrap();
    assert_eq!(payout.status, SettlementStatus::AwaitingConnection);
    assert_eq!(harness.backend.transfer_count(), 0);

    // Nothing to do while still disconnected
    assert_eq!(settlement.retry_awaiting_connection(10).await.unwrap(), 0);

    harness.backend.connect("creator-1", "creator-wallet");
    assert_eq!(settlement.retry_awaiting_connection(10).await.unwrap(), 1);
    assert_eq!(harness.backend.transfer_count(), 1);

    let payout = harness
        .store
        .with_read_tx(|tx| tx.payouts_get_active(deal_id))
        .unwrap();
    assert_eq!(payout.status, SettlementStatus::Completed);
}

#[tokio::test]
async fn a_backend_rejection_is_recorded_and_retryable() {
    let harness = Harness::new();
    let (deal_id, t0) = harness.deal_in_verifying();

    harness.backend.set_failing(true);
    harness
        .lifecycle
        .process_verification_result(verification_result(deal_id, 40, 90, vec![]), t0 + Duration::hours(1))
        .await
        .unwrap();

    // The refund attempt was recorded as failed, the deal state is intact
    let deal = harness.store.with_read_tx(|tx| Deal::get(tx, deal_id)).unwrap();
    assert_eq!(deal.status, DealStatus::Failed);
    let failed = harness
        .store
        .with_read_tx(|tx| tx.refunds_fetch_all_by_status(SettlementStatus::Failed, 10))
        .unwrap();
    assert_eq!(failed.len(), 1);

    // A manual retry succeeds once the backend recovers
    harness.backend.set_failing(false);
    let refund = harness
        .lifecycle
        .settlement()
        .refund_escrow(deal_id, Some("retry".to_string()))
        .await
        .unwrap();
    assert_eq!(refund.status, SettlementStatus::Completed);
    assert_eq!(harness.backend.transfer_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn review_notifications_retry_with_backoff_and_never_block_creation() {
    let harness = Harness::new();
    let (deal_id, t0) = harness.deal_in_verifying();

    harness.notifier.fail_first(2);
    harness
        .lifecycle
        .process_verification_result(error_result(deal_id, None), t0 + Duration::hours(1))
        .await
        .unwrap();

    // The review exists regardless of delivery problems
    assert_eq!(harness.lifecycle.reviews().fetch_open(10).unwrap().len(), 1);

    // Let the background retries play out (paused time auto-advances)
    tokio::time::sleep(std::time::Duration::from_secs(30)).await;
    assert_eq!(harness.notifier.attempts(), 3);
}
