//   Copyright 2024 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::str::FromStr;

use chrono::NaiveDateTime;
use tari_escrow_common_types::{Amount, Currency, DealId};
use tari_escrow_storage::{models, StorageError};

use crate::schema::payouts;

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = payouts)]
pub struct Payout {
    pub id: i32,
    pub deal_id: String,
    pub method: String,
    pub status: String,
    pub amount: i64,
    pub provider_tx_ref: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Payout {
    pub fn try_into_payout(self) -> Result<models::Payout, StorageError> {
        Ok(models::Payout {
            id: self.id as u64,
            deal_id: DealId::from_hex(&self.deal_id).map_err(|e| StorageError::DecodingError {
                operation: "payouts_get",
                item: "deal_id",
                details: e.to_string(),
            })?,
            method: Currency::from_str(&self.method).map_err(|e| StorageError::DecodingError {
                operation: "payouts_get",
                item: "method",
                details: e.to_string(),
            })?,
            status: self.status.parse().map_err(|_| StorageError::DecodingError {
                operation: "payouts_get",
                item: "status",
                details: format!("unknown status '{}'", self.status),
            })?,
            amount: Amount(u64::try_from(self.amount).map_err(|_| StorageError::DataInconsistency {
                details: format!("payout {} has a negative amount", self.id),
            })?),
            provider_tx_ref: self.provider_tx_ref,
            failure_reason: self.failure_reason,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
