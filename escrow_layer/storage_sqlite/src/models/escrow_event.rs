//   Copyright 2024 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::str::FromStr;

use chrono::NaiveDateTime;
use tari_escrow_common_types::{Amount, Currency, DealId};
use tari_escrow_storage::{models, StorageError};

use crate::schema::escrow_events;

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = escrow_events)]
pub struct EscrowEvent {
    pub id: i32,
    pub deal_id: String,
    pub event_type: String,
    pub amount: i64,
    pub payment_method: String,
    pub tx_ref: Option<String>,
    pub created_at: NaiveDateTime,
}

impl EscrowEvent {
    pub fn try_into_event(self) -> Result<models::EscrowEvent, StorageError> {
        Ok(models::EscrowEvent {
            id: self.id as u64,
            deal_id: DealId::from_hex(&self.deal_id).map_err(|e| StorageError::DecodingError {
                operation: "escrow_events_fetch",
                item: "deal_id",
                details: e.to_string(),
            })?,
            event_type: self.event_type.parse().map_err(|_| StorageError::DecodingError {
                operation: "escrow_events_fetch",
                item: "event_type",
                details: format!("unknown event type '{}'", self.event_type),
            })?,
            amount: Amount(u64::try_from(self.amount).map_err(|_| StorageError::DataInconsistency {
                details: format!("escrow event {} has a negative amount", self.id),
            })?),
            payment_method: Currency::from_str(&self.payment_method).map_err(|e| StorageError::DecodingError {
                operation: "escrow_events_fetch",
                item: "payment_method",
                details: e.to_string(),
            })?,
            tx_ref: self.tx_ref,
            created_at: self.created_at,
        })
    }
}
