//   Copyright 2024 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::str::FromStr;

use chrono::NaiveDateTime;
use tari_escrow_common_types::{Amount, Currency, DealId};
use tari_escrow_storage::{models, StorageError};

use crate::{schema::deals, serialization::deserialize_json};

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = deals)]
pub struct Deal {
    pub id: i32,
    pub deal_id: String,
    pub advertiser_id: String,
    pub creator_id: Option<String>,
    pub platform: String,
    pub amount: i64,
    pub currency: String,
    pub deadline: NaiveDateTime,
    pub posted_at: Option<NaiveDateTime>,
    pub post_url: Option<String>,
    pub status: String,
    pub failure_reason: Option<String>,
    pub verification_score: Option<i32>,
    pub last_verification_at: Option<NaiveDateTime>,
    pub orchestrator_result: Option<String>,
    pub public_opt_in: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Deal {
    pub fn try_into_deal(self) -> Result<models::Deal, StorageError> {
        Ok(models::Deal {
            id: DealId::from_hex(&self.deal_id).map_err(|e| StorageError::DecodingError {
                operation: "deals_get",
                item: "deal_id",
                details: e.to_string(),
            })?,
            advertiser_id: self.advertiser_id.into(),
            creator_id: self.creator_id.map(Into::into),
            platform: self.platform,
            amount: Amount(u64::try_from(self.amount).map_err(|_| StorageError::DataInconsistency {
                details: format!("deal {} has a negative amount", self.deal_id),
            })?),
            currency: Currency::from_str(&self.currency).map_err(|e| StorageError::DecodingError {
                operation: "deals_get",
                item: "currency",
                details: e.to_string(),
            })?,
            deadline: self.deadline,
            posted_at: self.posted_at,
            post_url: self.post_url,
            status: self.status.parse().map_err(|_| StorageError::DecodingError {
                operation: "deals_get",
                item: "status",
                details: format!("unknown status '{}'", self.status),
            })?,
            failure_reason: self.failure_reason,
            verification_score: self.verification_score.map(|s| s.clamp(0, 100) as u8),
            last_verification_at: self.last_verification_at,
            orchestrator_result: self.orchestrator_result.as_deref().map(deserialize_json).transpose()?,
            public_opt_in: self.public_opt_in,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
