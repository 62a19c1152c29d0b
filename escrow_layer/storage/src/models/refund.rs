//   Copyright 2024 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tari_escrow_common_types::{Amount, Currency, DealId};

use crate::{
    models::{SettlementInsert, SettlementStatus},
    DealStoreReadTransaction,
    DealStoreWriteTransaction,
    StorageError,
};

pub type RefundId = u64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Refund {
    pub id: RefundId,
    pub deal_id: DealId,
    pub method: Currency,
    pub status: SettlementStatus,
    pub amount: Amount,
    pub reason: Option<String>,
    pub provider_tx_ref: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Refund {
    pub fn get_active<TTx: DealStoreReadTransaction>(tx: &mut TTx, deal_id: DealId) -> Result<Self, StorageError> {
        tx.refunds_get_active(deal_id)
    }

    pub fn try_insert<TTx: DealStoreWriteTransaction>(
        tx: &mut TTx,
        refund: NewRefund,
    ) -> Result<SettlementInsert<Self>, StorageError> {
        tx.refunds_try_insert(refund)
    }
}

#[derive(Debug, Clone)]
pub struct NewRefund {
    pub deal_id: DealId,
    pub method: Currency,
    pub status: SettlementStatus,
    pub amount: Amount,
    pub reason: Option<String>,
}
