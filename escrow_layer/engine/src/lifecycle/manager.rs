//   Copyright 2024 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::ops::DerefMut;

use chrono::NaiveDateTime;
use log::*;
use serde::Serialize;
use tari_escrow_common_types::{optional::Optional, ActorId, DealId, RequestId};
use tari_escrow_storage::{
    models::{
        Deal,
        DealStatus,
        NewReview,
        ProofSpec,
        Review,
        ReviewDecision,
        ReviewId,
        SchedulePatch,
        ScheduleStatus,
        VerificationSchedule,
    },
    DealStore,
    DealStoreReadTransaction,
    DealStoreWriteTransaction,
    StorageError,
};

use crate::{
    lifecycle::{on_duration_check, on_review_decision, on_verification_result, SideEffect, Transition},
    traits::{PaymentBackend, ReviewNotifier},
    verification::VerificationResult,
    ReviewApi,
    ReviewApiError,
    SettlementError,
    SettlementExecutor,
};

const LOG_TARGET: &str = "tari::escrow::engine::lifecycle";

/// The acknowledgment returned to the webhook boundary. Stale and duplicate
/// triggers still produce a successful ack (`changed: false`) so the sender
/// stops retrying.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationAck {
    pub deal_id: DealId,
    pub deal_status: DealStatus,
    pub verification_score: Option<u8>,
    pub changed: bool,
}

/// Applies lifecycle triggers (verification verdicts, duration checks,
/// reviewer decisions) to deals. Every status write goes through the store's
/// compare-and-swap; a lost race means another trigger advanced the deal and
/// this one is dropped as a logged no-op.
pub struct DealLifecycle<TStore, TBackend, TNotifier> {
    store: TStore,
    settlement: SettlementExecutor<TStore, TBackend>,
    reviews: ReviewApi<TStore, TNotifier>,
}

impl<TStore, TBackend, TNotifier> DealLifecycle<TStore, TBackend, TNotifier>
where
    TStore: DealStore + Clone,
    TBackend: PaymentBackend,
    TNotifier: ReviewNotifier + Clone + Send + Sync + 'static,
{
    pub fn new(store: TStore, backend: TBackend, notifier: TNotifier) -> Self {
        Self {
            settlement: SettlementExecutor::new(store.clone(), backend),
            reviews: ReviewApi::new(store.clone(), notifier),
            store,
        }
    }

    pub fn settlement(&self) -> &SettlementExecutor<TStore, TBackend> {
        &self.settlement
    }

    pub fn reviews(&self) -> &ReviewApi<TStore, TNotifier> {
        &self.reviews
    }

    /// Handles a normalized verification verdict arriving from the callback
    /// endpoint or a poll. Idempotent: verdicts for deals that are no longer
    /// `Verifying` only close the matching schedule row for audit.
    pub async fn process_verification_result(
        &self,
        result: VerificationResult,
        now: NaiveDateTime,
    ) -> Result<VerificationAck, LifecycleError> {
        let deal_id = result.deal_id.ok_or(LifecycleError::MissingDealId)?;
        let deal = self
            .store
            .with_read_tx(|tx| Deal::get(tx, deal_id).optional())?
            .ok_or(LifecycleError::DealNotFound { deal_id })?;

        self.complete_schedule_row(&result, now)?;

        if deal.status != DealStatus::Verifying {
            info!(
                target: LOG_TARGET,
                "Ignoring verification result for deal {} in status {} (stale trigger)", deal_id, deal.status
            );
            return Ok(VerificationAck {
                deal_id,
                deal_status: deal.status,
                verification_score: deal.verification_score,
                changed: false,
            });
        }

        let transition = on_verification_result(&deal, &result, now);
        let next_status = transition.next_status().unwrap_or(deal.status);
        let applied = self
            .apply(deal_id, transition, result.request_id, Some(result.raw.clone()))
            .await?;

        Ok(VerificationAck {
            deal_id,
            deal_status: if applied { next_status } else { deal.status },
            verification_score: Some(result.overall_score),
            changed: applied,
        })
    }

    /// The duration-completion sweep: applies the duration gate to a bounded
    /// batch of `Verifying` deals. Returns the number of deals that reached a
    /// terminal state.
    pub async fn run_duration_checks(&self, now: NaiveDateTime, limit: u64) -> Result<usize, LifecycleError> {
        let candidates = self.store.with_read_tx(|tx| tx.deals_fetch_completion_candidates(limit))?;

        let mut transitioned = 0;
        for deal in candidates {
            let spec = self.store.with_read_tx(|tx| ProofSpec::get(tx, deal.id))?;
            let Some(transition) = on_duration_check(&deal, &spec, now) else {
                continue;
            };
            let status = transition.next_status();
            if self.apply(deal.id, transition, None, None).await? {
                info!(
                    target: LOG_TARGET,
                    "Deal {} finalised as {:?} by duration check", deal.id, status
                );
                transitioned += 1;
            }
        }
        Ok(transitioned)
    }

    /// Processes a reviewer's decision on an open review. Only the assigned
    /// reviewer (or an elevated role) may decide. `Escalate` re-queues the
    /// review; every other decision closes it and re-enters the deal
    /// lifecycle.
    pub async fn process_review_decision(
        &self,
        review_id: ReviewId,
        reviewer: ActorId,
        elevated: bool,
        decision: ReviewDecision,
        notes: Option<String>,
        now: NaiveDateTime,
    ) -> Result<Review, LifecycleError> {
        let review = self.reviews.get(review_id)?;
        if review.is_closed() {
            return Err(ReviewApiError::ReviewClosed { review_id }.into());
        }
        if !elevated && review.assigned_to.as_ref() != Some(&reviewer) {
            return Err(ReviewApiError::NotAuthorized { review_id, reviewer }.into());
        }

        if decision == ReviewDecision::Escalate {
            return Ok(self.reviews.escalate(review_id, notes)?);
        }

        if !self.reviews.close(review_id, decision, notes, now)? {
            return Err(ReviewApiError::ReviewClosed { review_id }.into());
        }

        if let Some(transition) = on_review_decision(decision, now) {
            self.apply(review.deal_id, transition, review.run_id, None).await?;
        }

        Ok(self.reviews.get(review_id)?)
    }

    /// Applies a transition: the CAS status write and schedule bookkeeping in
    /// one store transaction, then the settlement/review side effects. Returns
    /// false (dropping the effects too) if the CAS found the deal already
    /// moved on.
    async fn apply(
        &self,
        deal_id: DealId,
        transition: Transition,
        run_id: Option<RequestId>,
        evidence: Option<serde_json::Value>,
    ) -> Result<bool, LifecycleError> {
        let Transition {
            expected_status,
            patch,
            effects,
        } = transition;

        let applied = self.store.with_write_tx(|tx| {
            let updated = tx.deals_update_if_status(deal_id, expected_status, patch)?;
            if updated {
                for effect in &effects {
                    match effect {
                        SideEffect::CompletePendingSchedules => {
                            tx.verification_schedules_close_all_pending(deal_id, ScheduleStatus::Completed)?;
                        },
                        SideEffect::CancelPendingSchedules => {
                            tx.verification_schedules_close_all_pending(deal_id, ScheduleStatus::Cancelled)?;
                        },
                        _ => {},
                    }
                }
            }
            Ok::<_, StorageError>(updated)
        })?;

        if !applied {
            info!(
                target: LOG_TARGET,
                "Transition for deal {} dropped: deal no longer in {}", deal_id, expected_status
            );
            return Ok(false);
        }

        for effect in effects {
            match effect {
                SideEffect::CreateReview { reason, priority } => {
                    self.reviews.create_review(NewReview {
                        deal_id,
                        run_id,
                        reason_code: reason,
                        priority,
                        notes: None,
                        evidence: evidence.clone(),
                    })?;
                },
                // Settlement failures are recorded on the settlement record
                // itself and retried by a later trigger or sweep; they must
                // not bubble into the webhook response
                SideEffect::TriggerPayout => {
                    if let Err(e) = self.settlement.release_escrow(deal_id).await {
                        error!(target: LOG_TARGET, "Payout trigger for deal {} failed: {}", deal_id, e);
                    }
                },
                SideEffect::TriggerRefund { reason } => {
                    if let Err(e) = self.settlement.refund_escrow(deal_id, Some(reason)).await {
                        error!(target: LOG_TARGET, "Refund trigger for deal {} failed: {}", deal_id, e);
                    }
                },
                SideEffect::CompletePendingSchedules | SideEffect::CancelPendingSchedules => {},
            }
        }

        Ok(true)
    }

    /// Closes the schedule row a verdict answers, keeping the raw verdict on
    /// it for audit. Runs for stale verdicts too.
    fn complete_schedule_row(&self, result: &VerificationResult, now: NaiveDateTime) -> Result<(), LifecycleError> {
        let Some(request_id) = result.request_id else {
            return Ok(());
        };
        self.store.with_write_tx(|tx| {
            let Some(schedule) = VerificationSchedule::get_by_request_id(tx.deref_mut(), request_id).optional()? else {
                return Ok(());
            };
            if schedule.status.is_terminal() {
                // Duplicate delivery for an already-settled schedule
                return Ok(());
            }
            tx.verification_schedules_update(schedule.id, SchedulePatch {
                status: Some(ScheduleStatus::Completed),
                completed_at: Some(now),
                confidence_score: Some(result.confidence),
                result: Some(result.raw.clone()),
                ..Default::default()
            })
        })?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),
    #[error("Verification result carried no deal id")]
    MissingDealId,
    #[error("Deal {deal_id} not found")]
    DealNotFound { deal_id: DealId },
    #[error("Settlement error: {0}")]
    SettlementError(#[from] SettlementError),
    #[error("Review error: {0}")]
    ReviewError(#[from] ReviewApiError),
}

impl LifecycleError {
    /// Errors the caller caused (as opposed to internal failures), reported
    /// with a 4xx-class signal at the boundary.
    pub fn is_caller_error(&self) -> bool {
        match self {
            LifecycleError::MissingDealId | LifecycleError::DealNotFound { .. } => true,
            LifecycleError::ReviewError(ReviewApiError::ReviewClosed { .. }) |
            LifecycleError::ReviewError(ReviewApiError::NotAuthorized { .. }) => true,
            _ => false,
        }
    }
}
