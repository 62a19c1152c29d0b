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

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscrowEventType {
    /// Funds entered escrow
    Created,
    /// Funds paid out to the creator
    Released,
    /// Funds returned to the advertiser
    Refunded,
}

impl EscrowEventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EscrowEventType::Created => "Created",
            EscrowEventType::Released => "Released",
            EscrowEventType::Refunded => "Refunded",
        }
    }
}

impl Display for EscrowEventType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EscrowEventType {
    type Err = InvalidEscrowEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Created" => Ok(EscrowEventType::Created),
            "Released" => Ok(EscrowEventType::Released),
            "Refunded" => Ok(EscrowEventType::Refunded),
            _ => Err(InvalidEscrowEventType(s.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Invalid escrow event type '{0}'")]
pub struct InvalidEscrowEventType(pub String);

/// Append-only ledger row. Immutable once written; the funding event is the
/// source of truth for the escrowed amount and payment method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscrowEvent {
    pub id: u64,
    pub deal_id: DealId,
    pub event_type: EscrowEventType,
    pub amount: Amount,
    pub payment_method: Currency,
    pub tx_ref: Option<String>,
    pub created_at: NaiveDateTime,
}

impl EscrowEvent {
    pub fn fetch_by_deal<TTx: DealStoreReadTransaction>(
        tx: &mut TTx,
        deal_id: DealId,
    ) -> Result<Vec<Self>, StorageError> {
        tx.escrow_events_fetch_by_deal(deal_id)
    }

    pub fn get_funding<TTx: DealStoreReadTransaction>(tx: &mut TTx, deal_id: DealId) -> Result<Self, StorageError> {
        tx.escrow_events_get_funding(deal_id)
    }

    pub fn insert<TTx: DealStoreWriteTransaction>(tx: &mut TTx, event: NewEscrowEvent) -> Result<(), StorageError> {
        tx.escrow_events_insert(event)
    }
}

#[derive(Debug, Clone)]
pub struct NewEscrowEvent {
    pub deal_id: DealId,
    pub event_type: EscrowEventType,
    pub amount: Amount,
    pub payment_method: Currency,
    pub tx_ref: Option<String>,
}
