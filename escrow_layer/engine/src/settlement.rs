//   Copyright 2024 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use log::*;
use tari_escrow_common_types::{optional::Optional, DealId};
use tari_escrow_storage::{
    models::{
        Deal,
        DealStatus,
        EscrowEvent,
        EscrowEventType,
        NewEscrowEvent,
        NewPayout,
        NewRefund,
        Payout,
        Refund,
        SettlementInsert,
        SettlementPatch,
        SettlementStatus,
    },
    DealStore,
    DealStoreReadTransaction,
    DealStoreWriteTransaction,
    StorageError,
};

use crate::traits::{PaymentBackend, PaymentDestination};

const LOG_TARGET: &str = "tari::escrow::engine::settlement";

/// Executes payouts and refunds against the payment backend, idempotently at
/// the deal level. A non-failed settlement record short-circuits any further
/// attempt, and creation goes through a conditional insert so two racing
/// triggers (webhook, cron, manual retry) cannot both create one.
pub struct SettlementExecutor<TStore, TBackend> {
    store: TStore,
    backend: TBackend,
}

impl<TStore, TBackend> SettlementExecutor<TStore, TBackend>
where
    TStore: DealStore,
    TBackend: PaymentBackend,
{
    pub fn new(store: TStore, backend: TBackend) -> Self {
        Self { store, backend }
    }

    /// Pays the escrowed amount out to the creator. Requires the deal to be
    /// `Completed`. Safe to call repeatedly and concurrently.
    pub async fn release_escrow(&self, deal_id: DealId) -> Result<Payout, SettlementError> {
        let deal = self.get_deal(deal_id)?;

        if let Some(existing) = self.store.with_read_tx(|tx| Payout::get_active(tx, deal_id).optional())? {
            debug!(
                target: LOG_TARGET,
                "Payout for deal {} already exists ({}), skipping", deal_id, existing.status
            );
            return Ok(existing);
        }

        if deal.status != DealStatus::Completed {
            return Err(SettlementError::InvalidDealState {
                deal_id,
                status: deal.status,
                operation: "release_escrow",
            });
        }

        let funding = self.get_funding(deal_id)?;
        let creator = deal.creator_id.clone().ok_or(SettlementError::MissingCounterparty {
            deal_id,
            role: "creator",
        })?;

        let destination = self
            .backend
            .destination_for(&creator, funding.payment_method)
            .await
            .map_err(|e| SettlementError::BackendError { details: e.to_string() })?;

        let status = if destination.is_some() {
            SettlementStatus::PendingSettlement
        } else {
            SettlementStatus::AwaitingConnection
        };

        let inserted = self.store.with_write_tx(|tx| {
            Payout::try_insert(tx, NewPayout {
                deal_id,
                method: funding.payment_method,
                status,
                amount: funding.amount,
            })
        })?;

        let payout = match inserted {
            SettlementInsert::Inserted(payout) => payout,
            SettlementInsert::Existing(payout) => {
                // Another trigger got here between our read and insert
                debug!(
                    target: LOG_TARGET,
                    "Payout for deal {} created concurrently ({}), skipping", deal_id, payout.status
                );
                return Ok(payout);
            },
        };

        let Some(destination) = destination else {
            info!(
                target: LOG_TARGET,
                "Creator {} has no connected payment destination; payout for deal {} parked", creator, deal_id
            );
            return Ok(payout);
        };

        self.execute_payout(payout, &destination).await
    }

    /// Returns the escrowed amount to the advertiser. Requires the deal to be
    /// `Failed` or `Cancelled`. Safe to call repeatedly and concurrently.
    pub async fn refund_escrow(&self, deal_id: DealId, reason: Option<String>) -> Result<Refund, SettlementError> {
        let deal = self.get_deal(deal_id)?;

        if let Some(existing) = self.store.with_read_tx(|tx| Refund::get_active(tx, deal_id).optional())? {
            debug!(
                target: LOG_TARGET,
                "Refund for deal {} already exists ({}), skipping", deal_id, existing.status
            );
            return Ok(existing);
        }

        if !matches!(deal.status, DealStatus::Failed | DealStatus::Cancelled) {
            return Err(SettlementError::InvalidDealState {
                deal_id,
                status: deal.status,
                operation: "refund_escrow",
            });
        }

        let funding = self.get_funding(deal_id)?;
        let advertiser = deal.advertiser_id.clone();

        let destination = self
            .backend
            .destination_for(&advertiser, funding.payment_method)
            .await
            .map_err(|e| SettlementError::BackendError { details: e.to_string() })?;

        let status = if destination.is_some() {
            SettlementStatus::PendingSettlement
        } else {
            SettlementStatus::AwaitingConnection
        };

        let inserted = self.store.with_write_tx(|tx| {
            Refund::try_insert(tx, NewRefund {
                deal_id,
                method: funding.payment_method,
                status,
                amount: funding.amount,
                reason,
            })
        })?;

        let refund = match inserted {
            SettlementInsert::Inserted(refund) => refund,
            SettlementInsert::Existing(refund) => {
                debug!(
                    target: LOG_TARGET,
                    "Refund for deal {} created concurrently ({}), skipping", deal_id, refund.status
                );
                return Ok(refund);
            },
        };

        let Some(destination) = destination else {
            info!(
                target: LOG_TARGET,
                "Advertiser {} has no connected payment destination; refund for deal {} parked", advertiser, deal_id
            );
            return Ok(refund);
        };

        self.execute_refund(refund, &destination).await
    }

    /// Retries settlements parked on a missing payment destination. Returns
    /// the number of settlements that progressed.
    pub async fn retry_awaiting_connection(&self, limit: u64) -> Result<usize, SettlementError> {
        let mut progressed = 0;

        let payouts = self
            .store
            .with_read_tx(|tx| tx.payouts_fetch_all_by_status(SettlementStatus::AwaitingConnection, limit))?;
        for payout in payouts {
            let deal = self.get_deal(payout.deal_id)?;
            let Some(creator) = deal.creator_id else {
                continue;
            };
            let destination = self
                .backend
                .destination_for(&creator, payout.method)
                .await
                .map_err(|e| SettlementError::BackendError { details: e.to_string() })?;
            if let Some(destination) = destination {
                self.execute_payout(payout, &destination).await?;
                progressed += 1;
            }
        }

        let refunds = self
            .store
            .with_read_tx(|tx| tx.refunds_fetch_all_by_status(SettlementStatus::AwaitingConnection, limit))?;
        for refund in refunds {
            let deal = self.get_deal(refund.deal_id)?;
            let destination = self
                .backend
                .destination_for(&deal.advertiser_id, refund.method)
                .await
                .map_err(|e| SettlementError::BackendError { details: e.to_string() })?;
            if let Some(destination) = destination {
                self.execute_refund(refund, &destination).await?;
                progressed += 1;
            }
        }

        Ok(progressed)
    }

    async fn execute_payout(
        &self,
        mut payout: Payout,
        destination: &PaymentDestination,
    ) -> Result<Payout, SettlementError> {
        match self.backend.transfer(destination, payout.amount, payout.method).await {
            Ok(tx_ref) => {
                info!(
                    target: LOG_TARGET,
                    "Payout of {} {} for deal {} accepted by backend (tx {})",
                    payout.amount,
                    payout.method,
                    payout.deal_id,
                    tx_ref
                );
                self.store.with_write_tx(|tx| {
                    tx.payouts_update(payout.id, SettlementPatch {
                        status: Some(SettlementStatus::Completed),
                        provider_tx_ref: Some(tx_ref.clone()),
                        ..Default::default()
                    })?;
                    EscrowEvent::insert(tx, NewEscrowEvent {
                        deal_id: payout.deal_id,
                        event_type: EscrowEventType::Released,
                        amount: payout.amount,
                        payment_method: payout.method,
                        tx_ref: Some(tx_ref.clone()),
                    })
                })?;
                payout.status = SettlementStatus::Completed;
                payout.provider_tx_ref = Some(tx_ref);
                Ok(payout)
            },
            Err(e) => {
                error!(
                    target: LOG_TARGET,
                    "Payment backend rejected payout for deal {}: {}", payout.deal_id, e
                );
                self.store.with_write_tx(|tx| {
                    tx.payouts_update(payout.id, SettlementPatch {
                        status: Some(SettlementStatus::Failed),
                        failure_reason: Some(e.to_string()),
                        ..Default::default()
                    })
                })?;
                payout.status = SettlementStatus::Failed;
                payout.failure_reason = Some(e.to_string());
                Ok(payout)
            },
        }
    }

    async fn execute_refund(
        &self,
        mut refund: Refund,
        destination: &PaymentDestination,
    ) -> Result<Refund, SettlementError> {
        match self.backend.transfer(destination, refund.amount, refund.method).await {
            Ok(tx_ref) => {
                info!(
                    target: LOG_TARGET,
                    "Refund of {} {} for deal {} accepted by backend (tx {})",
                    refund.amount,
                    refund.method,
                    refund.deal_id,
                    tx_ref
                );
                self.store.with_write_tx(|tx| {
                    tx.refunds_update(refund.id, SettlementPatch {
                        status: Some(SettlementStatus::Completed),
                        provider_tx_ref: Some(tx_ref.clone()),
                        ..Default::default()
                    })?;
                    EscrowEvent::insert(tx, NewEscrowEvent {
                        deal_id: refund.deal_id,
                        event_type: EscrowEventType::Refunded,
                        amount: refund.amount,
                        payment_method: refund.method,
                        tx_ref: Some(tx_ref.clone()),
                    })
                })?;
                refund.status = SettlementStatus::Completed;
                refund.provider_tx_ref = Some(tx_ref);
                Ok(refund)
            },
            Err(e) => {
                error!(
                    target: LOG_TARGET,
                    "Payment backend rejected refund for deal {}: {}", refund.deal_id, e
                );
                self.store.with_write_tx(|tx| {
                    tx.refunds_update(refund.id, SettlementPatch {
                        status: Some(SettlementStatus::Failed),
                        failure_reason: Some(e.to_string()),
                        ..Default::default()
                    })
                })?;
                refund.status = SettlementStatus::Failed;
                refund.failure_reason = Some(e.to_string());
                Ok(refund)
            },
        }
    }

    fn get_deal(&self, deal_id: DealId) -> Result<Deal, SettlementError> {
        self.store
            .with_read_tx(|tx| Deal::get(tx, deal_id).optional())?
            .ok_or(SettlementError::DealNotFound { deal_id })
    }

    fn get_funding(&self, deal_id: DealId) -> Result<EscrowEvent, SettlementError> {
        self.store
            .with_read_tx(|tx| EscrowEvent::get_funding(tx, deal_id).optional())?
            .ok_or(SettlementError::NotFunded { deal_id })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SettlementError {
    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),
    #[error("Deal {deal_id} not found")]
    DealNotFound { deal_id: DealId },
    #[error("Deal {deal_id} is {status}, which does not permit {operation}")]
    InvalidDealState {
        deal_id: DealId,
        status: DealStatus,
        operation: &'static str,
    },
    #[error("Deal {deal_id} has no funding escrow event")]
    NotFunded { deal_id: DealId },
    #[error("Deal {deal_id} has no {role} to settle with")]
    MissingCounterparty { deal_id: DealId, role: &'static str },
    #[error("Payment backend error: {details}")]
    BackendError { details: String },
}
