//   Copyright 2024 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};
use log::*;
use tari_escrow_common_types::optional::Optional;
use tari_escrow_storage::{
    models::{Deal, DealStatus, ProofSpec, SchedulePatch, ScheduleStatus, VerificationSchedule},
    DealStore,
    DealStoreWriteTransaction,
    StorageError,
};

use crate::{
    deals::is_valid_post_url,
    lifecycle::{DealLifecycle, LifecycleError},
    traits::{AnalysisClient, PaymentBackend, ReviewNotifier},
    verification::{DispatchError, DispatchOutcome, VerificationDispatcher},
};

const LOG_TARGET: &str = "tari::escrow::engine::scheduler";

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Schedules due within this window of the tick are dispatched early, so
    /// the final check still fires before the deadline passes. Must exceed
    /// the tick interval.
    pub lookahead: Duration,
    pub dispatch_batch_size: u64,
    /// Bounds the duration-completion sweep per tick; remaining candidates
    /// are picked up next tick.
    pub completion_batch_size: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            lookahead: Duration::minutes(5),
            dispatch_batch_size: 50,
            completion_batch_size: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TickSummary {
    pub dispatched: usize,
    pub expired: usize,
    pub dispatch_failures: usize,
    pub skipped: usize,
    pub finalised: usize,
}

impl TickSummary {
    pub fn is_empty(&self) -> bool {
        self.dispatched == 0 &&
            self.expired == 0 &&
            self.dispatch_failures == 0 &&
            self.skipped == 0 &&
            self.finalised == 0
    }
}

/// The periodic driver: dispatches due verification checks and applies the
/// duration gate. Stateless per tick; overlapping ticks, webhook callbacks
/// and manual triggers are reconciled through the store's compare-and-swap
/// operations, never through in-process locking.
pub struct VerificationScheduler<TStore, TClient, TBackend, TNotifier> {
    config: SchedulerConfig,
    store: TStore,
    dispatcher: VerificationDispatcher<TStore, TClient>,
    lifecycle: Arc<DealLifecycle<TStore, TBackend, TNotifier>>,
}

impl<TStore, TClient, TBackend, TNotifier> VerificationScheduler<TStore, TClient, TBackend, TNotifier>
where
    TStore: DealStore + Clone,
    TClient: AnalysisClient,
    TBackend: PaymentBackend,
    TNotifier: ReviewNotifier + Clone + Send + Sync + 'static,
{
    pub fn new(
        config: SchedulerConfig,
        store: TStore,
        dispatcher: VerificationDispatcher<TStore, TClient>,
        lifecycle: Arc<DealLifecycle<TStore, TBackend, TNotifier>>,
    ) -> Self {
        Self {
            config,
            store,
            dispatcher,
            lifecycle,
        }
    }

    pub async fn tick(&self, now: NaiveDateTime) -> Result<TickSummary, SchedulerError> {
        let mut summary = self.dispatch_due(now).await?;
        summary.finalised = self.lifecycle.run_duration_checks(now, self.config.completion_batch_size).await?;

        if !summary.is_empty() {
            info!(
                target: LOG_TARGET,
                "Tick: {} dispatched, {} expired, {} dispatch failures, {} skipped, {} finalised",
                summary.dispatched,
                summary.expired,
                summary.dispatch_failures,
                summary.skipped,
                summary.finalised
            );
        }
        Ok(summary)
    }

    async fn dispatch_due(&self, now: NaiveDateTime) -> Result<TickSummary, SchedulerError> {
        let due_by = now + self.config.lookahead;
        let due = self
            .store
            .with_read_tx(|tx| VerificationSchedule::fetch_due(tx, due_by, self.config.dispatch_batch_size))?;

        let mut summary = TickSummary::default();
        for schedule in due {
            let Some(deal) = self.store.with_read_tx(|tx| Deal::get(tx, schedule.deal_id).optional())? else {
                warn!(
                    target: LOG_TARGET,
                    "Schedule {} references missing deal {}", schedule.id, schedule.deal_id
                );
                continue;
            };

            if deal.status != DealStatus::Verifying {
                // The deal finished while this row was pending; whoever moved
                // it normally closes the ladder, this covers the stragglers
                self.close_pending(&schedule, ScheduleStatus::Cancelled)?;
                summary.skipped += 1;
                continue;
            }

            if deal.deadline < now {
                self.close_pending(&schedule, ScheduleStatus::Expired)?;
                summary.expired += 1;
                continue;
            }

            if !deal.post_url.as_deref().is_some_and(is_valid_post_url) {
                warn!(
                    target: LOG_TARGET,
                    "Deal {} is Verifying without a usable post URL; schedule {} failed", deal.id, schedule.id
                );
                self.close_pending(&schedule, ScheduleStatus::Failed)?;
                summary.dispatch_failures += 1;
                continue;
            }

            let spec = self.store.with_read_tx(|tx| ProofSpec::get(tx, deal.id))?;
            match self.dispatcher.dispatch(&deal, &spec, &schedule, now).await? {
                DispatchOutcome::Dispatched { .. } => summary.dispatched += 1,
                DispatchOutcome::AlreadyClaimed => summary.skipped += 1,
                DispatchOutcome::Failed { .. } => summary.dispatch_failures += 1,
            }
        }

        Ok(summary)
    }

    fn close_pending(&self, schedule: &VerificationSchedule, to_status: ScheduleStatus) -> Result<(), SchedulerError> {
        self.store.with_write_tx(|tx| {
            tx.verification_schedules_update_if_status(schedule.id, ScheduleStatus::Pending, SchedulePatch {
                status: Some(to_status),
                ..Default::default()
            })
        })?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),
    #[error("Dispatch error: {0}")]
    DispatchError(#[from] DispatchError),
    #[error("Lifecycle error: {0}")]
    LifecycleError(#[from] LifecycleError),
}
