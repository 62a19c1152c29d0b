//   Copyright 2024 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::ops::{Deref, DerefMut};

use chrono::NaiveDateTime;
use tari_escrow_common_types::{DealId, RequestId};

use crate::{
    models::{
        Deal,
        DealPatch,
        DealStatus,
        EscrowEvent,
        NewDeal,
        NewEscrowEvent,
        NewPayout,
        NewProofSpec,
        NewRefund,
        NewReview,
        NewVerificationSchedule,
        Payout,
        PayoutId,
        ProofSpec,
        ProofSpecPatch,
        Refund,
        RefundId,
        Review,
        ReviewId,
        ReviewPatch,
        ScheduleId,
        SchedulePatch,
        ScheduleStatus,
        SettlementInsert,
        SettlementPatch,
        SettlementStatus,
        VerificationSchedule,
    },
    StorageError,
};

const LOG_TARGET: &str = "tari::escrow::storage";

pub trait DealStore {
    type ReadTransaction<'a>: DealStoreReadTransaction
    where Self: 'a;
    type WriteTransaction<'a>: DealStoreWriteTransaction + Deref<Target = Self::ReadTransaction<'a>> + DerefMut
    where Self: 'a;

    fn create_read_tx(&self) -> Result<Self::ReadTransaction<'_>, StorageError>;
    fn create_write_tx(&self) -> Result<Self::WriteTransaction<'_>, StorageError>;

    fn with_write_tx<F: FnOnce(&mut Self::WriteTransaction<'_>) -> Result<R, E>, R, E>(&self, f: F) -> Result<R, E>
    where E: From<StorageError> {
        let mut tx = self.create_write_tx()?;
        match f(&mut tx) {
            Ok(r) => {
                tx.commit()?;
                Ok(r)
            },
            Err(e) => {
                if let Err(err) = tx.rollback() {
                    log::error!(target: LOG_TARGET, "Failed to rollback transaction: {}", err);
                }
                Err(e)
            },
        }
    }

    fn with_read_tx<F: FnOnce(&mut Self::ReadTransaction<'_>) -> Result<R, E>, R, E>(&self, f: F) -> Result<R, E>
    where E: From<StorageError> {
        let mut tx = self.create_read_tx()?;
        let ret = f(&mut tx)?;
        Ok(ret)
    }
}

pub trait DealStoreReadTransaction {
    // -------------------------------- Deals -------------------------------- //
    fn deals_get(&mut self, deal_id: DealId) -> Result<Deal, StorageError>;
    fn deals_exists(&mut self, deal_id: DealId) -> Result<bool, StorageError>;
    fn deals_fetch_all_by_status(&mut self, status: DealStatus, limit: u64) -> Result<Vec<Deal>, StorageError>;
    /// Deals in Verifying that have both a recorded verification attempt and a
    /// posting time, i.e. the candidates for the duration-completion sweep.
    fn deals_fetch_completion_candidates(&mut self, limit: u64) -> Result<Vec<Deal>, StorageError>;

    // -------------------------------- Proof specs -------------------------------- //
    fn proof_specs_get(&mut self, deal_id: DealId) -> Result<ProofSpec, StorageError>;

    // -------------------------------- Verification schedules -------------------------------- //
    fn verification_schedules_get(&mut self, schedule_id: ScheduleId) -> Result<VerificationSchedule, StorageError>;
    fn verification_schedules_get_by_request_id(
        &mut self,
        request_id: RequestId,
    ) -> Result<VerificationSchedule, StorageError>;
    /// Pending schedules whose scheduled time is at or before `due_by`,
    /// oldest first.
    fn verification_schedules_fetch_due(
        &mut self,
        due_by: NaiveDateTime,
        limit: u64,
    ) -> Result<Vec<VerificationSchedule>, StorageError>;

    // -------------------------------- Escrow events -------------------------------- //
    fn escrow_events_fetch_by_deal(&mut self, deal_id: DealId) -> Result<Vec<EscrowEvent>, StorageError>;
    /// The most recent funding event for the deal. This is the source of truth
    /// for the funded amount and payment method.
    fn escrow_events_get_funding(&mut self, deal_id: DealId) -> Result<EscrowEvent, StorageError>;

    // -------------------------------- Payouts / Refunds -------------------------------- //
    /// The non-failed payout for the deal, if any.
    fn payouts_get_active(&mut self, deal_id: DealId) -> Result<Payout, StorageError>;
    fn payouts_fetch_all_by_status(&mut self, status: SettlementStatus, limit: u64)
        -> Result<Vec<Payout>, StorageError>;
    /// The non-failed refund for the deal, if any.
    fn refunds_get_active(&mut self, deal_id: DealId) -> Result<Refund, StorageError>;
    fn refunds_fetch_all_by_status(&mut self, status: SettlementStatus, limit: u64)
        -> Result<Vec<Refund>, StorageError>;

    // -------------------------------- Reviews -------------------------------- //
    fn reviews_get(&mut self, review_id: ReviewId) -> Result<Review, StorageError>;
    fn reviews_fetch_open(&mut self, limit: u64) -> Result<Vec<Review>, StorageError>;
}

pub trait DealStoreWriteTransaction {
    fn commit(self) -> Result<(), StorageError>;
    fn rollback(self) -> Result<(), StorageError>;

    // -------------------------------- Deals -------------------------------- //
    fn deals_insert(&mut self, deal: NewDeal) -> Result<(), StorageError>;
    /// Unconditional update. Used only for audit fields that are safe to write
    /// regardless of status (e.g. recording a stale verification result).
    fn deals_update(&mut self, deal_id: DealId, patch: DealPatch) -> Result<(), StorageError>;
    /// Compare-and-swap: applies the patch only if the deal is currently in
    /// `expected` status. Returns false (without error) if another writer has
    /// already moved the deal on.
    fn deals_update_if_status(
        &mut self,
        deal_id: DealId,
        expected: DealStatus,
        patch: DealPatch,
    ) -> Result<bool, StorageError>;

    // -------------------------------- Proof specs -------------------------------- //
    fn proof_specs_insert(&mut self, spec: NewProofSpec) -> Result<(), StorageError>;
    /// Applies the patch and bumps the revision counter.
    fn proof_specs_update(&mut self, deal_id: DealId, patch: ProofSpecPatch) -> Result<(), StorageError>;

    // -------------------------------- Verification schedules -------------------------------- //
    fn verification_schedules_insert(&mut self, schedule: NewVerificationSchedule)
        -> Result<ScheduleId, StorageError>;
    fn verification_schedules_update(&mut self, schedule_id: ScheduleId, patch: SchedulePatch)
        -> Result<(), StorageError>;
    /// Compare-and-swap on the schedule status. The pending -> running
    /// transition routes through this so concurrent ticks cannot both dispatch
    /// the same row.
    fn verification_schedules_update_if_status(
        &mut self,
        schedule_id: ScheduleId,
        expected: ScheduleStatus,
        patch: SchedulePatch,
    ) -> Result<bool, StorageError>;
    /// Moves every pending schedule for the deal to `to_status`. Returns the
    /// number of rows affected.
    fn verification_schedules_close_all_pending(
        &mut self,
        deal_id: DealId,
        to_status: ScheduleStatus,
    ) -> Result<usize, StorageError>;

    // -------------------------------- Escrow events -------------------------------- //
    fn escrow_events_insert(&mut self, event: NewEscrowEvent) -> Result<(), StorageError>;

    // -------------------------------- Payouts / Refunds -------------------------------- //
    /// Conditional insert: creates the payout only if the deal has no
    /// non-failed payout already, otherwise returns the existing record. This
    /// is the primary double-payment guard and must be enforced by the
    /// underlying store (e.g. a partial unique index), not by a prior read.
    fn payouts_try_insert(&mut self, payout: NewPayout) -> Result<SettlementInsert<Payout>, StorageError>;
    fn payouts_update(&mut self, payout_id: PayoutId, patch: SettlementPatch) -> Result<(), StorageError>;
    /// Conditional insert for refunds; see [Self::payouts_try_insert].
    fn refunds_try_insert(&mut self, refund: NewRefund) -> Result<SettlementInsert<Refund>, StorageError>;
    fn refunds_update(&mut self, refund_id: RefundId, patch: SettlementPatch) -> Result<(), StorageError>;

    // -------------------------------- Reviews -------------------------------- //
    fn reviews_insert(&mut self, review: NewReview) -> Result<Review, StorageError>;
    /// Applies the patch only while the review is not closed. Returns false if
    /// the review was already closed.
    fn reviews_update_if_open(&mut self, review_id: ReviewId, patch: ReviewPatch) -> Result<bool, StorageError>;
}
