//   Copyright 2024 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use chrono::NaiveDateTime;
use tari_escrow_common_types::{DealId, RequestId};
use tari_escrow_storage::{models, StorageError};

use crate::{schema::reviews, serialization::deserialize_json};

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = reviews)]
pub struct Review {
    pub id: i32,
    pub deal_id: String,
    pub run_id: Option<String>,
    pub reason_code: String,
    pub priority: String,
    pub status: String,
    pub decision: Option<String>,
    pub assigned_to: Option<String>,
    pub notes: Option<String>,
    pub evidence: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub closed_at: Option<NaiveDateTime>,
}

impl Review {
    pub fn try_into_review(self) -> Result<models::Review, StorageError> {
        Ok(models::Review {
            id: self.id as u64,
            deal_id: DealId::from_hex(&self.deal_id).map_err(|e| StorageError::DecodingError {
                operation: "reviews_get",
                item: "deal_id",
                details: e.to_string(),
            })?,
            run_id: self
                .run_id
                .as_deref()
                .map(|id| {
                    RequestId::from_hex(id).map_err(|e| StorageError::DecodingError {
                        operation: "reviews_get",
                        item: "run_id",
                        details: e.to_string(),
                    })
                })
                .transpose()?,
            reason_code: self.reason_code.parse().map_err(|_| StorageError::DecodingError {
                operation: "reviews_get",
                item: "reason_code",
                details: format!("unknown reason '{}'", self.reason_code),
            })?,
            priority: self.priority.parse().map_err(|_| StorageError::DecodingError {
                operation: "reviews_get",
                item: "priority",
                details: format!("unknown priority '{}'", self.priority),
            })?,
            status: self.status.parse().map_err(|_| StorageError::DecodingError {
                operation: "reviews_get",
                item: "status",
                details: format!("unknown status '{}'", self.status),
            })?,
            decision: self
                .decision
                .as_deref()
                .map(|d| {
                    d.parse().map_err(|_| StorageError::DecodingError {
                        operation: "reviews_get",
                        item: "decision",
                        details: format!("unknown decision '{}'", d),
                    })
                })
                .transpose()?,
            assigned_to: self.assigned_to.map(Into::into),
            notes: self.notes,
            evidence: self.evidence.as_deref().map(deserialize_json).transpose()?,
            created_at: self.created_at,
            updated_at: self.updated_at,
            closed_at: self.closed_at,
        })
    }
}
