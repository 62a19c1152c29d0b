//   Copyright 2024 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use chrono::{Duration, Utc};
use tari_escrow_common_types::{optional::Optional, Amount, Currency, DealId, DurationHours};
use tari_escrow_storage::{
    models::{
        CheckType,
        Deal,
        DealPatch,
        DealStatus,
        EscrowEvent,
        EscrowEventType,
        NewDeal,
        NewEscrowEvent,
        NewPayout,
        NewProofSpec,
        NewReview,
        NewVerificationSchedule,
        Payout,
        ProofSpec,
        ReviewDecision,
        ReviewPatch,
        ReviewPriority,
        ReviewReason,
        ReviewStatus,
        SchedulePatch,
        ScheduleStatus,
        SettlementStatus,
        VerificationSchedule,
    },
    DealStore,
    DealStoreReadTransaction,
    DealStoreWriteTransaction,
};
use tari_escrow_storage_sqlite::SqliteDealStore;

fn build_store() -> (SqliteDealStore, tempfile::TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let store = SqliteDealStore::try_open(temp_dir.path().join("escrow.sqlite")).unwrap();
    store.run_migrations().unwrap();
    (store, temp_dir)
}

fn insert_deal(store: &SqliteDealStore) -> DealId {
    let deal_id = DealId::new_random();
    let deadline = Utc::now().naive_utc() + Duration::hours(24);
    store
        .with_write_tx(|tx| {
            Deal::insert(tx, NewDeal {
                id: deal_id,
                advertiser_id: "advertiser-1".into(),
                platform: "twitter".to_string(),
                amount: Amount(50),
                currency: Currency::Usdc,
                deadline,
                public_opt_in: false,
            })?;
            ProofSpec::insert(tx, NewProofSpec {
                deal_id,
                text_proof: "Post must mention the brand".to_string(),
                duration_hours: DurationHours::new(24).unwrap(),
                visual_markers: vec!["logo".to_string()],
                video_markers: vec![],
                link_markers: vec!["https://brand.example".to_string()],
            })
        })
        .unwrap();
    deal_id
}

#[test]
fn it_round_trips_a_deal_and_its_proof_spec() {
    let (store, _temp_dir) = build_store();
    let deal_id = insert_deal(&store);

    let deal = store.with_read_tx(|tx| Deal::get(tx, deal_id)).unwrap();
    assert_eq!(deal.id, deal_id);
    assert_eq!(deal.status, DealStatus::PendingAcceptance);
    assert_eq!(deal.amount, Amount(50));
    assert_eq!(deal.currency, Currency::Usdc);
    assert!(deal.creator_id.is_none());

    let spec = store.with_read_tx(|tx| ProofSpec::get(tx, deal_id)).unwrap();
    assert_eq!(spec.duration_hours.as_hours(), 24);
    assert_eq!(spec.visual_markers, vec!["logo".to_string()]);
    assert_eq!(spec.revision, 0);
}

#[test]
fn it_reports_missing_deals_as_not_found() {
    let (store, _temp_dir) = build_store();
    let missing = store
        .with_read_tx(|tx| Deal::get(tx, DealId::new_random()).optional())
        .unwrap();
    assert!(missing.is_none());
}

#[test]
fn update_if_status_only_applies_from_the_expected_status() {
    let (store, _temp_dir) = build_store();
    let deal_id = insert_deal(&store);

    // Wrong expected status: dropped, not an error
    let updated = store
        .with_write_tx(|tx| {
            tx.deals_update_if_status(deal_id, DealStatus::Verifying, DealPatch {
                status: Some(DealStatus::Failed),
                ..Default::default()
            })
        })
        .unwrap();
    assert!(!updated);

    let updated = store
        .with_write_tx(|tx| {
            tx.deals_update_if_status(deal_id, DealStatus::PendingAcceptance, DealPatch {
                status: Some(DealStatus::PendingFunding),
                creator_id: Some("creator-1".into()),
                ..Default::default()
            })
        })
        .unwrap();
    assert!(updated);

    let deal = store.with_read_tx(|tx| Deal::get(tx, deal_id)).unwrap();
    assert_eq!(deal.status, DealStatus::PendingFunding);
    assert_eq!(deal.creator_id, Some("creator-1".into()));

    // Replaying the same trigger is a no-op
    let replay = store
        .with_write_tx(|tx| {
            tx.deals_update_if_status(deal_id, DealStatus::PendingAcceptance, DealPatch {
                status: Some(DealStatus::PendingFunding),
                ..Default::default()
            })
        })
        .unwrap();
    assert!(!replay);
}

#[test]
fn a_funding_retry_clears_the_failure_reason() {
    let (store, _temp_dir) = build_store();
    let deal_id = insert_deal(&store);

    store
        .with_write_tx(|tx| {
            tx.deals_update(deal_id, DealPatch {
                status: Some(DealStatus::Failed),
                failure_reason: Some(Some("backend rejected".to_string())),
                ..Default::default()
            })
        })
        .unwrap();

    store
        .with_write_tx(|tx| {
            tx.deals_update_if_status(deal_id, DealStatus::Failed, DealPatch {
                status: Some(DealStatus::PendingVerification),
                failure_reason: Some(None),
                ..Default::default()
            })
        })
        .unwrap();

    let deal = store.with_read_tx(|tx| Deal::get(tx, deal_id)).unwrap();
    assert_eq!(deal.status, DealStatus::PendingVerification);
    assert!(deal.failure_reason.is_none());
}

#[test]
fn schedules_are_fetched_due_in_order_and_claimed_once() {
    let (store, _temp_dir) = build_store();
    let deal_id = insert_deal(&store);
    let now = Utc::now().naive_utc();

    let (early, late) = store
        .with_write_tx(|tx| {
            let early = VerificationSchedule::insert(tx, NewVerificationSchedule {
                deal_id,
                scheduled_at: now - Duration::hours(1),
                check_type: CheckType::Initial,
            })?;
            let late = VerificationSchedule::insert(tx, NewVerificationSchedule {
                deal_id,
                scheduled_at: now + Duration::hours(8),
                check_type: CheckType::Periodic,
            })?;
            Ok::<_, tari_escrow_storage::StorageError>((early, late))
        })
        .unwrap();

    let due = store
        .with_read_tx(|tx| VerificationSchedule::fetch_due(tx, now + Duration::minutes(5), 10))
        .unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].id, early);
    assert_eq!(due[0].check_type, CheckType::Initial);

    // First claim wins, second claim sees the row is no longer pending
    let claimed = store
        .with_write_tx(|tx| {
            tx.verification_schedules_update_if_status(early, ScheduleStatus::Pending, SchedulePatch {
                status: Some(ScheduleStatus::Running),
                executed_at: Some(now),
                ..Default::default()
            })
        })
        .unwrap();
    assert!(claimed);

    let claimed_again = store
        .with_write_tx(|tx| {
            tx.verification_schedules_update_if_status(early, ScheduleStatus::Pending, SchedulePatch {
                status: Some(ScheduleStatus::Running),
                ..Default::default()
            })
        })
        .unwrap();
    assert!(!claimed_again);

    let closed = store
        .with_write_tx(|tx| tx.verification_schedules_close_all_pending(deal_id, ScheduleStatus::Cancelled))
        .unwrap();
    assert_eq!(closed, 1);

    let late_row = store
        .with_read_tx(|tx| VerificationSchedule::get(tx, late))
        .unwrap();
    assert_eq!(late_row.status, ScheduleStatus::Cancelled);
}

#[test]
fn at_most_one_non_failed_payout_can_exist_per_deal() {
    let (store, _temp_dir) = build_store();
    let deal_id = insert_deal(&store);

    let first = store
        .with_write_tx(|tx| {
            Payout::try_insert(tx, NewPayout {
                deal_id,
                method: Currency::Usdc,
                status: SettlementStatus::PendingSettlement,
                amount: Amount(50),
            })
        })
        .unwrap();
    assert!(first.is_inserted());

    let second = store
        .with_write_tx(|tx| {
            Payout::try_insert(tx, NewPayout {
                deal_id,
                method: Currency::Usdc,
                status: SettlementStatus::PendingSettlement,
                amount: Amount(50),
            })
        })
        .unwrap();
    assert!(!second.is_inserted());
    assert_eq!(second.record().id, first.record().id);

    // A failed attempt frees the slot for a retry
    store
        .with_write_tx(|tx| {
            tx.payouts_update(first.record().id, tari_escrow_storage::models::SettlementPatch {
                status: Some(SettlementStatus::Failed),
                failure_reason: Some("backend down".to_string()),
                ..Default::default()
            })
        })
        .unwrap();

    let retry = store
        .with_write_tx(|tx| {
            Payout::try_insert(tx, NewPayout {
                deal_id,
                method: Currency::Usdc,
                status: SettlementStatus::PendingSettlement,
                amount: Amount(50),
            })
        })
        .unwrap();
    assert!(retry.is_inserted());
}

#[test]
fn escrow_events_record_the_funding_source_of_truth() {
    let (store, _temp_dir) = build_store();
    let deal_id = insert_deal(&store);

    store
        .with_write_tx(|tx| {
            EscrowEvent::insert(tx, NewEscrowEvent {
                deal_id,
                event_type: EscrowEventType::Created,
                amount: Amount(50),
                payment_method: Currency::Usdc,
                tx_ref: Some("funding-tx-1".to_string()),
            })
        })
        .unwrap();

    let funding = store
        .with_read_tx(|tx| EscrowEvent::get_funding(tx, deal_id))
        .unwrap();
    assert_eq!(funding.event_type, EscrowEventType::Created);
    assert_eq!(funding.amount, Amount(50));
    assert_eq!(funding.tx_ref.as_deref(), Some("funding-tx-1"));
}

#[test]
fn a_closed_review_cannot_be_updated_again() {
    let (store, _temp_dir) = build_store();
    let deal_id = insert_deal(&store);
    let now = Utc::now().naive_utc();

    let review = store
        .with_write_tx(|tx| {
            tx.reviews_insert(NewReview {
                deal_id,
                run_id: None,
                reason_code: ReviewReason::ManualReviewNeeded,
                priority: ReviewPriority::Medium,
                notes: None,
                evidence: Some(serde_json::json!({"score": 65})),
            })
        })
        .unwrap();
    assert_eq!(review.status, ReviewStatus::Open);

    let closed = store
        .with_write_tx(|tx| {
            tx.reviews_update_if_open(review.id, ReviewPatch {
                status: Some(ReviewStatus::Closed),
                decision: Some(ReviewDecision::Release),
                closed_at: Some(now),
                ..Default::default()
            })
        })
        .unwrap();
    assert!(closed);

    let closed_again = store
        .with_write_tx(|tx| {
            tx.reviews_update_if_open(review.id, ReviewPatch {
                status: Some(ReviewStatus::Closed),
                decision: Some(ReviewDecision::Refund),
                closed_at: Some(now),
                ..Default::default()
            })
        })
        .unwrap();
    assert!(!closed_again);

    let review = store.with_read_tx(|tx| tx.reviews_get(review.id)).unwrap();
    assert_eq!(review.decision, Some(ReviewDecision::Release));
}
