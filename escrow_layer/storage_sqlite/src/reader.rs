//   Copyright 2024 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::sync::MutexGuard;

use chrono::NaiveDateTime;
use diesel::{sql_query, OptionalExtension, QueryDsl, RunQueryDsl, SqliteConnection};
use tari_escrow_common_types::{DealId, RequestId};
use tari_escrow_storage::{
    models::{
        Deal,
        DealStatus,
        EscrowEvent,
        EscrowEventType,
        Payout,
        ProofSpec,
        Refund,
        Review,
        ReviewId,
        ReviewStatus,
        ScheduleId,
        ScheduleStatus,
        SettlementStatus,
        VerificationSchedule,
    },
    DealStoreReadTransaction,
    StorageError,
};

use crate::{diesel::ExpressionMethods, models};

const LOG_TARGET: &str = "tari::escrow::storage_sqlite::reader";

pub struct ReadTransaction<'a> {
    connection: MutexGuard<'a, SqliteConnection>,
    is_done: bool,
}

impl<'a> ReadTransaction<'a> {
    pub fn new(connection: MutexGuard<'a, SqliteConnection>) -> Self {
        Self {
            connection,
            is_done: false,
        }
    }

    pub(super) fn is_done(&self) -> bool {
        self.is_done
    }

    pub(super) fn connection(&mut self) -> &mut SqliteConnection {
        &mut self.connection
    }

    /// Internal commit
    pub(super) fn commit(&mut self) -> Result<(), StorageError> {
        sql_query("COMMIT")
            .execute(self.connection())
            .map_err(|e| StorageError::general("commit", e))?;
        self.is_done = true;
        Ok(())
    }

    /// Internal rollback
    pub(super) fn rollback(&mut self) -> Result<(), StorageError> {
        sql_query("ROLLBACK")
            .execute(self.connection())
            .map_err(|e| StorageError::general("rollback", e))?;
        self.is_done = true;
        Ok(())
    }
}

impl Drop for ReadTransaction<'_> {
    fn drop(&mut self) {
        if !self.is_done {
            if let Err(err) = self.rollback() {
                log::error!(target: LOG_TARGET, "Failed to rollback transaction: {}", err);
            }
        }
    }
}

impl DealStoreReadTransaction for ReadTransaction<'_> {
    // -------------------------------- Deals -------------------------------- //

    fn deals_get(&mut self, deal_id: DealId) -> Result<Deal, StorageError> {
        use crate::schema::deals;

        deals::table
            .filter(deals::deal_id.eq(deal_id.to_string()))
            .first::<models::Deal>(self.connection())
            .optional()
            .map_err(|e| StorageError::query("deals_get", e))?
            .ok_or_else(|| StorageError::not_found("deals_get", "deal", deal_id.to_string()))?
            .try_into_deal()
    }

    fn deals_exists(&mut self, deal_id: DealId) -> Result<bool, StorageError> {
        use crate::schema::deals;

        let count: i64 = deals::table
            .filter(deals::deal_id.eq(deal_id.to_string()))
            .count()
            .first(self.connection())
            .map_err(|e| StorageError::query("deals_exists", e))?;
        Ok(count > 0)
    }

    fn deals_fetch_all_by_status(&mut self, status: DealStatus, limit: u64) -> Result<Vec<Deal>, StorageError> {
        use crate::schema::deals;

        deals::table
            .filter(deals::status.eq(status.as_str()))
            .order_by(deals::created_at.asc())
            .limit(limit as i64)
            .load::<models::Deal>(self.connection())
            .map_err(|e| StorageError::query("deals_fetch_all_by_status", e))?
            .into_iter()
            .map(|deal| deal.try_into_deal())
            .collect()
    }

    fn deals_fetch_completion_candidates(&mut self, limit: u64) -> Result<Vec<Deal>, StorageError> {
        use crate::schema::deals;

        deals::table
            .filter(deals::status.eq(DealStatus::Verifying.as_str()))
            .filter(deals::posted_at.is_not_null())
            .filter(deals::last_verification_at.is_not_null())
            .order_by(deals::posted_at.asc())
            .limit(limit as i64)
            .load::<models::Deal>(self.connection())
            .map_err(|e| StorageError::query("deals_fetch_completion_candidates", e))?
            .into_iter()
            .map(|deal| deal.try_into_deal())
            .collect()
    }

    // -------------------------------- Proof specs -------------------------------- //

    fn proof_specs_get(&mut self, deal_id: DealId) -> Result<ProofSpec, StorageError> {
        use crate::schema::proof_specs;

        proof_specs::table
            .filter(proof_specs::deal_id.eq(deal_id.to_string()))
            .first::<models::ProofSpec>(self.connection())
            .optional()
            .map_err(|e| StorageError::query("proof_specs_get", e))?
            .ok_or_else(|| StorageError::not_found("proof_specs_get", "proof_spec", deal_id.to_string()))?
            .try_into_proof_spec()
    }

    // -------------------------------- Verification schedules -------------------------------- //

    fn verification_schedules_get(&mut self, schedule_id: ScheduleId) -> Result<VerificationSchedule, StorageError> {
        use crate::schema::verification_schedules;

        verification_schedules::table
            .filter(verification_schedules::id.eq(schedule_id as i32))
            .first::<models::VerificationSchedule>(self.connection())
            .optional()
            .map_err(|e| StorageError::query("verification_schedules_get", e))?
            .ok_or_else(|| {
                StorageError::not_found("verification_schedules_get", "verification_schedule", schedule_id.to_string())
            })?
            .try_into_schedule()
    }

    fn verification_schedules_get_by_request_id(
        &mut self,
        request_id: RequestId,
    ) -> Result<VerificationSchedule, StorageError> {
        use crate::schema::verification_schedules;

        verification_schedules::table
            .filter(verification_schedules::request_id.eq(request_id.to_string()))
            .first::<models::VerificationSchedule>(self.connection())
            .optional()
            .map_err(|e| StorageError::query("verification_schedules_get_by_request_id", e))?
            .ok_or_else(|| {
                StorageError::not_found(
                    "verification_schedules_get_by_request_id",
                    "verification_schedule",
                    request_id.to_string(),
                )
            })?
            .try_into_schedule()
    }

    fn verification_schedules_fetch_due(
        &mut self,
        due_by: NaiveDateTime,
        limit: u64,
    ) -> Result<Vec<VerificationSchedule>, StorageError> {
        use crate::schema::verification_schedules;

        verification_schedules::table
            .filter(verification_schedules::status.eq(ScheduleStatus::Pending.as_str()))
            .filter(verification_schedules::scheduled_at.le(due_by))
            .order_by(verification_schedules::scheduled_at.asc())
            .limit(limit as i64)
            .load::<models::VerificationSchedule>(self.connection())
            .map_err(|e| StorageError::query("verification_schedules_fetch_due", e))?
            .into_iter()
            .map(|schedule| schedule.try_into_schedule())
            .collect()
    }

    // -------------------------------- Escrow events -------------------------------- //

    fn escrow_events_fetch_by_deal(&mut self, deal_id: DealId) -> Result<Vec<EscrowEvent>, StorageError> {
        use crate::schema::escrow_events;

        escrow_events::table
            .filter(escrow_events::deal_id.eq(deal_id.to_string()))
            .order_by(escrow_events::id.asc())
            .load::<models::EscrowEvent>(self.connection())
            .map_err(|e| StorageError::query("escrow_events_fetch_by_deal", e))?
            .into_iter()
            .map(|event| event.try_into_event())
            .collect()
    }

    fn escrow_events_get_funding(&mut self, deal_id: DealId) -> Result<EscrowEvent, StorageError> {
        use crate::schema::escrow_events;

        escrow_events::table
            .filter(escrow_events::deal_id.eq(deal_id.to_string()))
            .filter(escrow_events::event_type.eq(EscrowEventType::Created.as_str()))
            .order_by(escrow_events::id.desc())
            .first::<models::EscrowEvent>(self.connection())
            .optional()
            .map_err(|e| StorageError::query("escrow_events_get_funding", e))?
            .ok_or_else(|| StorageError::not_found("escrow_events_get_funding", "escrow_event", deal_id.to_string()))?
            .try_into_event()
    }

    // -------------------------------- Payouts / Refunds -------------------------------- //

    fn payouts_get_active(&mut self, deal_id: DealId) -> Result<Payout, StorageError> {
        use crate::schema::payouts;

        payouts::table
            .filter(payouts::deal_id.eq(deal_id.to_string()))
            .filter(payouts::status.ne(SettlementStatus::Failed.as_str()))
            .first::<models::Payout>(self.connection())
            .optional()
            .map_err(|e| StorageError::query("payouts_get_active", e))?
            .ok_or_else(|| StorageError::not_found("payouts_get_active", "payout", deal_id.to_string()))?
            .try_into_payout()
    }

    fn payouts_fetch_all_by_status(
        &mut self,
        status: SettlementStatus,
        limit: u64,
    ) -> Result<Vec<Payout>, StorageError> {
        use crate::schema::payouts;

        payouts::table
            .filter(payouts::status.eq(status.as_str()))
            .order_by(payouts::created_at.asc())
            .limit(limit as i64)
            .load::<models::Payout>(self.connection())
            .map_err(|e| StorageError::query("payouts_fetch_all_by_status", e))?
            .into_iter()
            .map(|payout| payout.try_into_payout())
            .collect()
    }

    fn refunds_get_active(&mut self, deal_id: DealId) -> Result<Refund, StorageError> {
        use crate::schema::refunds;

        refunds::table
            .filter(refunds::deal_id.eq(deal_id.to_string()))
            .filter(refunds::status.ne(SettlementStatus::Failed.as_str()))
            .first::<models::Refund>(self.connection())
            .optional()
            .map_err(|e| StorageError::query("refunds_get_active", e))?
            .ok_or_else(|| StorageError::not_found("refunds_get_active", "refund", deal_id.to_string()))?
            .try_into_refund()
    }

    fn refunds_fetch_all_by_status(
        &mut self,
        status: SettlementStatus,
        limit: u64,
    ) -> Result<Vec<Refund>, StorageError> {
        use crate::schema::refunds;

        refunds::table
            .filter(refunds::status.eq(status.as_str()))
            .order_by(refunds::created_at.asc())
            .limit(limit as i64)
            .load::<models::Refund>(self.connection())
            .map_err(|e| StorageError::query("refunds_fetch_all_by_status", e))?
            .into_iter()
            .map(|refund| refund.try_into_refund())
            .collect()
    }

    // -------------------------------- Reviews -------------------------------- //

    fn reviews_get(&mut self, review_id: ReviewId) -> Result<Review, StorageError> {
        use crate::schema::reviews;

        reviews::table
            .filter(reviews::id.eq(review_id as i32))
            .first::<models::Review>(self.connection())
            .optional()
            .map_err(|e| StorageError::query("reviews_get", e))?
            .ok_or_else(|| StorageError::not_found("reviews_get", "review", review_id.to_string()))?
            .try_into_review()
    }

    fn reviews_fetch_open(&mut self, limit: u64) -> Result<Vec<Review>, StorageError> {
        use crate::schema::reviews;

        reviews::table
            .filter(reviews::status.ne(ReviewStatus::Closed.as_str()))
            .order_by(reviews::created_at.asc())
            .limit(limit as i64)
            .load::<models::Review>(self.connection())
            .map_err(|e| StorageError::query("reviews_fetch_open", e))?
            .into_iter()
            .map(|review| review.try_into_review())
            .collect()
    }
}
