//   Copyright 2024 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tari_escrow_common_types::{Amount, Currency, DealId};

use crate::{DealStoreReadTransaction, DealStoreWriteTransaction, StorageError};

pub type PayoutId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementStatus {
    /// Accepted for settlement, transfer not yet submitted to the backend
    PendingSettlement,
    /// The receiving party has no connected payment destination; retried by
    /// the retry sweep once one is connected
    AwaitingConnection,
    /// The payment backend accepted the transfer
    Completed,
    /// The payment backend rejected the transfer
    Failed,
}

impl SettlementStatus {
    /// A non-failed record blocks any further settlement attempt for the deal.
    pub fn is_active(self) -> bool {
        !matches!(self, SettlementStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SettlementStatus::PendingSettlement => "PendingSettlement",
            SettlementStatus::AwaitingConnection => "AwaitingConnection",
            SettlementStatus::Completed => "Completed",
            SettlementStatus::Failed => "Failed",
        }
    }
}

impl Display for SettlementStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SettlementStatus {
    type Err = InvalidSettlementStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PendingSettlement" => Ok(SettlementStatus::PendingSettlement),
            "AwaitingConnection" => Ok(SettlementStatus::AwaitingConnection),
            "Completed" => Ok(SettlementStatus::Completed),
            "Failed" => Ok(SettlementStatus::Failed),
            _ => Err(InvalidSettlementStatus(s.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Invalid settlement status '{0}'")]
pub struct InvalidSettlementStatus(pub String);

/// Outcome of a conditional settlement insert. `Existing` means another actor
/// already holds the non-failed record for this deal; the caller must treat
/// that record as authoritative and must not retry the transfer.
#[derive(Debug, Clone)]
pub enum SettlementInsert<T> {
    Inserted(T),
    Existing(T),
}

impl<T> SettlementInsert<T> {
    pub fn is_inserted(&self) -> bool {
        matches!(self, SettlementInsert::Inserted(_))
    }

    pub fn record(&self) -> &T {
        match self {
            SettlementInsert::Inserted(t) | SettlementInsert::Existing(t) => t,
        }
    }

    pub fn into_record(self) -> T {
        match self {
            SettlementInsert::Inserted(t) | SettlementInsert::Existing(t) => t,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payout {
    pub id: PayoutId,
    pub deal_id: DealId,
    pub method: Currency,
    pub status: SettlementStatus,
    pub amount: Amount,
    pub provider_tx_ref: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Payout {
    pub fn get_active<TTx: DealStoreReadTransaction>(tx: &mut TTx, deal_id: DealId) -> Result<Self, StorageError> {
        tx.payouts_get_active(deal_id)
    }

    pub fn try_insert<TTx: DealStoreWriteTransaction>(
        tx: &mut TTx,
        payout: NewPayout,
    ) -> Result<SettlementInsert<Self>, StorageError> {
        tx.payouts_try_insert(payout)
    }
}

#[derive(Debug, Clone)]
pub struct NewPayout {
    pub deal_id: DealId,
    pub method: Currency,
    pub status: SettlementStatus,
    pub amount: Amount,
}

/// Partial update applied to a payout or refund row.
#[derive(Debug, Clone, Default)]
pub struct SettlementPatch {
    pub status: Option<SettlementStatus>,
    pub provider_tx_ref: Option<String>,
    pub failure_reason: Option<String>,
}
