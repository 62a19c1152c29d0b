//   Copyright 2024 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::{
    ops::{Deref, DerefMut},
    sync::MutexGuard,
};

use chrono::Utc;
use diesel::{result::DatabaseErrorKind, RunQueryDsl, SqliteConnection};
use tari_escrow_common_types::DealId;
use tari_escrow_storage::{
    models::{
        DealPatch,
        DealStatus,
        NewDeal,
        NewEscrowEvent,
        NewPayout,
        NewProofSpec,
        NewRefund,
        NewReview,
        NewVerificationSchedule,
        Payout,
        PayoutId,
        ProofSpecPatch,
        Refund,
        RefundId,
        Review,
        ReviewId,
        ReviewPatch,
        ReviewStatus,
        ScheduleId,
        SchedulePatch,
        ScheduleStatus,
        SettlementInsert,
        SettlementPatch,
    },
    DealStoreReadTransaction,
    DealStoreWriteTransaction,
    StorageError,
};

use crate::{diesel::ExpressionMethods, reader::ReadTransaction, serialization::serialize_json};

pub struct WriteTransaction<'a> {
    /// In SQLite any transaction is writable. We keep a ReadTransaction to satisfy the Deref requirement of the
    /// DealStore.
    transaction: ReadTransaction<'a>,
}

impl<'a> WriteTransaction<'a> {
    pub fn new(connection: MutexGuard<'a, SqliteConnection>) -> Self {
        Self {
            transaction: ReadTransaction::new(connection),
        }
    }

    fn connection(&mut self) -> &mut SqliteConnection {
        self.transaction.connection()
    }

    fn last_insert_id(&mut self, operation: &'static str) -> Result<i32, StorageError> {
        diesel::select(diesel::dsl::sql::<diesel::sql_types::Integer>("last_insert_rowid()"))
            .get_result(self.connection())
            .map_err(|e| StorageError::query(operation, e))
    }
}

impl DealStoreWriteTransaction for WriteTransaction<'_> {
    fn commit(mut self) -> Result<(), StorageError> {
        self.transaction.commit()?;
        Ok(())
    }

    fn rollback(mut self) -> Result<(), StorageError> {
        self.transaction.rollback()?;
        Ok(())
    }

    // -------------------------------- Deals -------------------------------- //

    fn deals_insert(&mut self, deal: NewDeal) -> Result<(), StorageError> {
        use crate::schema::deals;

        diesel::insert_into(deals::table)
            .values((
                deals::deal_id.eq(deal.id.to_string()),
                deals::advertiser_id.eq(deal.advertiser_id.to_string()),
                deals::platform.eq(deal.platform),
                deals::amount.eq(i64::try_from(deal.amount.as_u64()).map_err(|_| StorageError::EncodingError {
                    operation: "deals_insert",
                    item: "amount",
                    details: "amount exceeds the storable range".to_string(),
                })?),
                deals::currency.eq(deal.currency.to_string()),
                deals::deadline.eq(deal.deadline),
                deals::status.eq(DealStatus::PendingAcceptance.as_str()),
                deals::public_opt_in.eq(deal.public_opt_in),
            ))
            .execute(self.connection())
            .map_err(|e| StorageError::query("deals_insert", e))?;
        Ok(())
    }

    fn deals_update(&mut self, deal_id: DealId, patch: DealPatch) -> Result<(), StorageError> {
        use crate::schema::deals;

        diesel::update(deals::table)
            .filter(deals::deal_id.eq(deal_id.to_string()))
            .set(deal_changeset(patch)?)
            .execute(self.connection())
            .map_err(|e| StorageError::query("deals_update", e))?;
        Ok(())
    }

    fn deals_update_if_status(
        &mut self,
        deal_id: DealId,
        expected: DealStatus,
        patch: DealPatch,
    ) -> Result<bool, StorageError> {
        use crate::schema::deals;

        let rows = diesel::update(deals::table)
            .filter(deals::deal_id.eq(deal_id.to_string()))
            .filter(deals::status.eq(expected.as_str()))
            .set(deal_changeset(patch)?)
            .execute(self.connection())
            .map_err(|e| StorageError::query("deals_update_if_status", e))?;
        Ok(rows > 0)
    }

    // -------------------------------- Proof specs -------------------------------- //

    fn proof_specs_insert(&mut self, spec: NewProofSpec) -> Result<(), StorageError> {
        use crate::schema::proof_specs;

        diesel::insert_into(proof_specs::table)
            .values((
                proof_specs::deal_id.eq(spec.deal_id.to_string()),
                proof_specs::text_proof.eq(spec.text_proof),
                proof_specs::duration_hours.eq(spec.duration_hours.as_hours() as i32),
                proof_specs::visual_markers.eq(serialize_json(&spec.visual_markers)?),
                proof_specs::video_markers.eq(serialize_json(&spec.video_markers)?),
                proof_specs::link_markers.eq(serialize_json(&spec.link_markers)?),
            ))
            .execute(self.connection())
            .map_err(|e| StorageError::query("proof_specs_insert", e))?;
        Ok(())
    }

    fn proof_specs_update(&mut self, deal_id: DealId, patch: ProofSpecPatch) -> Result<(), StorageError> {
        use crate::schema::proof_specs;

        let rows = diesel::update(proof_specs::table)
            .filter(proof_specs::deal_id.eq(deal_id.to_string()))
            .set((
                patch.text_proof.map(|t| proof_specs::text_proof.eq(t)),
                patch
                    .duration_hours
                    .map(|d| proof_specs::duration_hours.eq(d.as_hours() as i32)),
                patch
                    .visual_markers
                    .map(|m| serialize_json(&m).map(|m| proof_specs::visual_markers.eq(m)))
                    .transpose()?,
                patch
                    .video_markers
                    .map(|m| serialize_json(&m).map(|m| proof_specs::video_markers.eq(m)))
                    .transpose()?,
                patch
                    .link_markers
                    .map(|m| serialize_json(&m).map(|m| proof_specs::link_markers.eq(m)))
                    .transpose()?,
                proof_specs::revision.eq(proof_specs::revision + 1),
                proof_specs::updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(self.connection())
            .map_err(|e| StorageError::query("proof_specs_update", e))?;
        if rows == 0 {
            return Err(StorageError::not_found(
                "proof_specs_update",
                "proof_spec",
                deal_id.to_string(),
            ));
        }
        Ok(())
    }

    // -------------------------------- Verification schedules -------------------------------- //

    fn verification_schedules_insert(
        &mut self,
        schedule: NewVerificationSchedule,
    ) -> Result<ScheduleId, StorageError> {
        use crate::schema::verification_schedules;

        diesel::insert_into(verification_schedules::table)
            .values((
                verification_schedules::deal_id.eq(schedule.deal_id.to_string()),
                verification_schedules::scheduled_at.eq(schedule.scheduled_at),
                verification_schedules::check_type.eq(schedule.check_type.as_str()),
                verification_schedules::status.eq(ScheduleStatus::Pending.as_str()),
            ))
            .execute(self.connection())
            .map_err(|e| StorageError::query("verification_schedules_insert", e))?;

        let id = self.last_insert_id("verification_schedules_insert")?;
        Ok(id as u64)
    }

    fn verification_schedules_update(
        &mut self,
        schedule_id: ScheduleId,
        patch: SchedulePatch,
    ) -> Result<(), StorageError> {
        use crate::schema::verification_schedules;

        diesel::update(verification_schedules::table)
            .filter(verification_schedules::id.eq(schedule_id as i32))
            .set(schedule_changeset(patch)?)
            .execute(self.connection())
            .map_err(|e| StorageError::query("verification_schedules_update", e))?;
        Ok(())
    }

    fn verification_schedules_update_if_status(
        &mut self,
        schedule_id: ScheduleId,
        expected: ScheduleStatus,
        patch: SchedulePatch,
    ) -> Result<bool, StorageError> {
        use crate::schema::verification_schedules;

        let rows = diesel::update(verification_schedules::table)
            .filter(verification_schedules::id.eq(schedule_id as i32))
            .filter(verification_schedules::status.eq(expected.as_str()))
            .set(schedule_changeset(patch)?)
            .execute(self.connection())
            .map_err(|e| StorageError::query("verification_schedules_update_if_status", e))?;
        Ok(rows > 0)
    }

    fn verification_schedules_close_all_pending(
        &mut self,
        deal_id: DealId,
        to_status: ScheduleStatus,
    ) -> Result<usize, StorageError> {
        use crate::schema::verification_schedules;

        let rows = diesel::update(verification_schedules::table)
            .filter(verification_schedules::deal_id.eq(deal_id.to_string()))
            .filter(verification_schedules::status.eq(ScheduleStatus::Pending.as_str()))
            .set(verification_schedules::status.eq(to_status.as_str()))
            .execute(self.connection())
            .map_err(|e| StorageError::query("verification_schedules_close_all_pending", e))?;
        Ok(rows)
    }

    // -------------------------------- Escrow events -------------------------------- //

    fn escrow_events_insert(&mut self, event: NewEscrowEvent) -> Result<(), StorageError> {
        use crate::schema::escrow_events;

        diesel::insert_into(escrow_events::table)
            .values((
                escrow_events::deal_id.eq(event.deal_id.to_string()),
                escrow_events::event_type.eq(event.event_type.as_str()),
                escrow_events::amount.eq(i64::try_from(event.amount.as_u64()).map_err(|_| {
                    StorageError::EncodingError {
                        operation: "escrow_events_insert",
                        item: "amount",
                        details: "amount exceeds the storable range".to_string(),
                    }
                })?),
                escrow_events::payment_method.eq(event.payment_method.to_string()),
                escrow_events::tx_ref.eq(event.tx_ref),
            ))
            .execute(self.connection())
            .map_err(|e| StorageError::query("escrow_events_insert", e))?;
        Ok(())
    }

    // -------------------------------- Payouts / Refunds -------------------------------- //

    fn payouts_try_insert(&mut self, payout: NewPayout) -> Result<SettlementInsert<Payout>, StorageError> {
        use crate::schema::payouts;

        let deal_id = payout.deal_id;
        let insert = diesel::insert_into(payouts::table)
            .values((
                payouts::deal_id.eq(deal_id.to_string()),
                payouts::method.eq(payout.method.to_string()),
                payouts::status.eq(payout.status.as_str()),
                payouts::amount.eq(i64::try_from(payout.amount.as_u64()).map_err(|_| {
                    StorageError::EncodingError {
                        operation: "payouts_try_insert",
                        item: "amount",
                        details: "amount exceeds the storable range".to_string(),
                    }
                })?),
            ))
            .execute(self.connection());

        match insert {
            Ok(_) => {
                let payout = self.transaction.payouts_get_active(deal_id)?;
                Ok(SettlementInsert::Inserted(payout))
            },
            // The partial unique index on (deal_id) where status != 'Failed':
            // someone else holds the active record
            Err(diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                let existing = self.transaction.payouts_get_active(deal_id)?;
                Ok(SettlementInsert::Existing(existing))
            },
            Err(e) => Err(StorageError::query("payouts_try_insert", e)),
        }
    }

    fn payouts_update(&mut self, payout_id: PayoutId, patch: SettlementPatch) -> Result<(), StorageError> {
        use crate::schema::payouts;

        diesel::update(payouts::table)
            .filter(payouts::id.eq(payout_id as i32))
            .set((
                patch.status.map(|s| payouts::status.eq(s.as_str())),
                patch.provider_tx_ref.map(|r| payouts::provider_tx_ref.eq(r)),
                patch.failure_reason.map(|r| payouts::failure_reason.eq(r)),
                payouts::updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(self.connection())
            .map_err(|e| StorageError::query("payouts_update", e))?;
        Ok(())
    }

    fn refunds_try_insert(&mut self, refund: NewRefund) -> Result<SettlementInsert<Refund>, StorageError> {
        use crate::schema::refunds;

        let deal_id = refund.deal_id;
        let insert = diesel::insert_into(refunds::table)
            .values((
                refunds::deal_id.eq(deal_id.to_string()),
                refunds::method.eq(refund.method.to_string()),
                refunds::status.eq(refund.status.as_str()),
                refunds::amount.eq(i64::try_from(refund.amount.as_u64()).map_err(|_| {
                    StorageError::EncodingError {
                        operation: "refunds_try_insert",
                        item: "amount",
                        details: "amount exceeds the storable range".to_string(),
                    }
                })?),
                refunds::reason.eq(refund.reason),
            ))
            .execute(self.connection());

        match insert {
            Ok(_) => {
                let refund = self.transaction.refunds_get_active(deal_id)?;
                Ok(SettlementInsert::Inserted(refund))
            },
            Err(diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                let existing = self.transaction.refunds_get_active(deal_id)?;
                Ok(SettlementInsert::Existing(existing))
            },
            Err(e) => Err(StorageError::query("refunds_try_insert", e)),
        }
    }

    fn refunds_update(&mut self, refund_id: RefundId, patch: SettlementPatch) -> Result<(), StorageError> {
        use crate::schema::refunds;

        diesel::update(refunds::table)
            .filter(refunds::id.eq(refund_id as i32))
            .set((
                patch.status.map(|s| refunds::status.eq(s.as_str())),
                patch.provider_tx_ref.map(|r| refunds::provider_tx_ref.eq(r)),
                patch.failure_reason.map(|r| refunds::failure_reason.eq(r)),
                refunds::updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(self.connection())
            .map_err(|e| StorageError::query("refunds_update", e))?;
        Ok(())
    }

    // -------------------------------- Reviews -------------------------------- //

    fn reviews_insert(&mut self, review: NewReview) -> Result<Review, StorageError> {
        use crate::schema::reviews;

        diesel::insert_into(reviews::table)
            .values((
                reviews::deal_id.eq(review.deal_id.to_string()),
                reviews::run_id.eq(review.run_id.map(|id| id.to_string())),
                reviews::reason_code.eq(review.reason_code.as_str()),
                reviews::priority.eq(review.priority.as_str()),
                reviews::status.eq(ReviewStatus::Open.as_str()),
                reviews::notes.eq(review.notes),
                reviews::evidence.eq(review.evidence.as_ref().map(serialize_json).transpose()?),
            ))
            .execute(self.connection())
            .map_err(|e| StorageError::query("reviews_insert", e))?;

        let id = self.last_insert_id("reviews_insert")?;
        self.transaction.reviews_get(id as u64)
    }

    fn reviews_update_if_open(&mut self, review_id: ReviewId, patch: ReviewPatch) -> Result<bool, StorageError> {
        use crate::schema::reviews;

        let rows = diesel::update(reviews::table)
            .filter(reviews::id.eq(review_id as i32))
            .filter(reviews::status.ne(ReviewStatus::Closed.as_str()))
            .set((
                patch.status.map(|s| reviews::status.eq(s.as_str())),
                patch.decision.map(|d| reviews::decision.eq(d.as_str())),
                patch.assigned_to.map(|a| reviews::assigned_to.eq(a.to_string())),
                patch.notes.map(|n| reviews::notes.eq(n)),
                patch.closed_at.map(|t| reviews::closed_at.eq(t)),
                reviews::updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(self.connection())
            .map_err(|e| StorageError::query("reviews_update_if_open", e))?;
        Ok(rows > 0)
    }
}

fn deal_changeset(
    patch: DealPatch,
) -> Result<
    (
        Option<diesel::dsl::Eq<crate::schema::deals::status, &'static str>>,
        Option<diesel::dsl::Eq<crate::schema::deals::creator_id, String>>,
        Option<diesel::dsl::Eq<crate::schema::deals::posted_at, chrono::NaiveDateTime>>,
        Option<diesel::dsl::Eq<crate::schema::deals::post_url, String>>,
        Option<diesel::dsl::Eq<crate::schema::deals::failure_reason, Option<String>>>,
        Option<diesel::dsl::Eq<crate::schema::deals::verification_score, i32>>,
        Option<diesel::dsl::Eq<crate::schema::deals::last_verification_at, chrono::NaiveDateTime>>,
        Option<diesel::dsl::Eq<crate::schema::deals::orchestrator_result, String>>,
        diesel::dsl::Eq<crate::schema::deals::updated_at, chrono::NaiveDateTime>,
    ),
    StorageError,
> {
    use crate::schema::deals;

    Ok((
        patch.status.map(|s| deals::status.eq(s.as_str())),
        patch.creator_id.map(|c| deals::creator_id.eq(c.to_string())),
        patch.posted_at.map(|t| deals::posted_at.eq(t)),
        patch.post_url.map(|u| deals::post_url.eq(u)),
        patch.failure_reason.map(|r| deals::failure_reason.eq(r)),
        patch.verification_score.map(|s| deals::verification_score.eq(s as i32)),
        patch.last_verification_at.map(|t| deals::last_verification_at.eq(t)),
        patch
            .orchestrator_result
            .as_ref()
            .map(serialize_json)
            .transpose()?
            .map(|r| deals::orchestrator_result.eq(r)),
        deals::updated_at.eq(Utc::now().naive_utc()),
    ))
}

fn schedule_changeset(
    patch: SchedulePatch,
) -> Result<
    (
        Option<diesel::dsl::Eq<crate::schema::verification_schedules::status, &'static str>>,
        Option<diesel::dsl::Eq<crate::schema::verification_schedules::executed_at, chrono::NaiveDateTime>>,
        Option<diesel::dsl::Eq<crate::schema::verification_schedules::completed_at, chrono::NaiveDateTime>>,
        Option<diesel::dsl::Eq<crate::schema::verification_schedules::request_id, String>>,
        Option<diesel::dsl::Eq<crate::schema::verification_schedules::confidence_score, i32>>,
        Option<diesel::dsl::Eq<crate::schema::verification_schedules::result, String>>,
    ),
    StorageError,
> {
    use crate::schema::verification_schedules;

    Ok((
        patch.status.map(|s| verification_schedules::status.eq(s.as_str())),
        patch.executed_at.map(|t| verification_schedules::executed_at.eq(t)),
        patch.completed_at.map(|t| verification_schedules::completed_at.eq(t)),
        patch.request_id.map(|id| verification_schedules::request_id.eq(id.to_string())),
        patch
            .confidence_score
            .map(|s| verification_schedules::confidence_score.eq(s as i32)),
        patch
            .result
            .as_ref()
            .map(serialize_json)
            .transpose()?
            .map(|r| verification_schedules::result.eq(r)),
    ))
}

impl<'a> Deref for WriteTransaction<'a> {
    type Target = ReadTransaction<'a>;

    fn deref(&self) -> &Self::Target {
        &self.transaction
    }
}

impl<'a> DerefMut for WriteTransaction<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.transaction
    }
}
