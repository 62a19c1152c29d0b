// Copyright 2024 The Tari Project
// SPDX-License-Identifier: BSD-3-Clause

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use log::*;
use tari_escrow_engine::VerificationScheduler;
use tari_escrow_storage_sqlite::SqliteDealStore;
use tokio::{
    sync::{watch, Semaphore},
    time,
    time::MissedTickBehavior,
};

use crate::{
    clients::{HttpAnalysisClient, HttpPaymentGateway, WebhookReviewNotifier},
    notify::Notify,
    services::DealEvent,
    shutdown::ShutdownSignal,
    Lifecycle,
};

const LOG_TARGET: &str = "tari::escrow::daemon::scheduler_service";

type Scheduler = VerificationScheduler<SqliteDealStore, HttpAnalysisClient, HttpPaymentGateway, WebhookReviewNotifier>;

/// Drives the verification scheduler on a fixed tick, with an immediate
/// wake-up when a post is submitted. Ticks never overlap in-process (a
/// semaphore guards the running tick); overlap with webhook handling and
/// other daemon instances is handled by the store's compare-and-swap
/// operations.
pub struct SchedulerService {
    notify: Notify<DealEvent>,
    scheduler: Arc<Scheduler>,
    lifecycle: Arc<Lifecycle>,
    tick_interval: Duration,
    settlement_retry_batch_size: u64,
    trigger_tick: watch::Sender<()>,
    rx_trigger: watch::Receiver<()>,
    tick_semaphore: Arc<Semaphore>,
    shutdown_signal: ShutdownSignal,
}

impl SchedulerService {
    pub fn new(
        notify: Notify<DealEvent>,
        scheduler: Scheduler,
        lifecycle: Arc<Lifecycle>,
        tick_interval: Duration,
        settlement_retry_batch_size: u64,
        shutdown_signal: ShutdownSignal,
    ) -> Self {
        let (trigger, rx_trigger) = watch::channel(());
        Self {
            notify,
            scheduler: Arc::new(scheduler),
            lifecycle,
            tick_interval,
            settlement_retry_batch_size,
            trigger_tick: trigger,
            rx_trigger,
            tick_semaphore: Arc::new(Semaphore::new(1)),
            shutdown_signal,
        }
    }

    pub async fn run(mut self) -> Result<(), anyhow::Error> {
        let mut events_subscription = self.notify.subscribe();
        let mut tick_interval = time::interval(self.tick_interval);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = self.shutdown_signal.wait() => {
                    break Ok(());
                }
                Ok(event) = events_subscription.recv() => {
                    self.on_event(event);
                },

                Ok(_) = self.rx_trigger.changed() => {
                    trace!(target: LOG_TARGET, "Scheduler wake-up triggered");
                    self.on_tick();
                }

                _ = tick_interval.tick() => {
                    trace!(target: LOG_TARGET, "Scheduler tick");
                    self.on_tick();
                }
            }
        }
    }

    fn on_tick(&self) {
        let permit = match self.tick_semaphore.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                debug!(target: LOG_TARGET, "A tick is already in progress");
                return;
            },
        };

        let scheduler = Arc::clone(&self.scheduler);
        let lifecycle = Arc::clone(&self.lifecycle);
        let retry_batch = self.settlement_retry_batch_size;
        tokio::spawn(async move {
            let now = Utc::now().naive_utc();
            if let Err(err) = scheduler.tick(now).await {
                error!(target: LOG_TARGET, "Scheduler tick failed: {}", err);
            }

            match lifecycle.settlement().retry_awaiting_connection(retry_batch).await {
                Ok(0) => {},
                Ok(progressed) => {
                    info!(target: LOG_TARGET, "{} parked settlement(s) progressed", progressed);
                },
                Err(err) => {
                    error!(target: LOG_TARGET, "Settlement retry sweep failed: {}", err);
                },
            }

            drop(permit);
        });
    }

    fn on_event(&mut self, event: DealEvent) {
        match event {
            DealEvent::PostSubmitted { .. } => {
                let _ = self.trigger_tick.send(());
            },
            DealEvent::DealCreated { .. } | DealEvent::DealFunded { .. } | DealEvent::VerificationProcessed { .. } => {
            },
        }
    }
}
