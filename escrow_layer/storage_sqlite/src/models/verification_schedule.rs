//   Copyright 2024 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use chrono::NaiveDateTime;
use tari_escrow_common_types::{DealId, RequestId};
use tari_escrow_storage::{models, StorageError};

use crate::{schema::verification_schedules, serialization::deserialize_json};

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = verification_schedules)]
pub struct VerificationSchedule {
    pub id: i32,
    pub deal_id: String,
    pub scheduled_at: NaiveDateTime,
    pub check_type: String,
    pub status: String,
    pub executed_at: Option<NaiveDateTime>,
    pub completed_at: Option<NaiveDateTime>,
    pub request_id: Option<String>,
    pub confidence_score: Option<i32>,
    pub result: Option<String>,
    pub created_at: NaiveDateTime,
}

impl VerificationSchedule {
    pub fn try_into_schedule(self) -> Result<models::VerificationSchedule, StorageError> {
        Ok(models::VerificationSchedule {
            id: self.id as u64,
            deal_id: DealId::from_hex(&self.deal_id).map_err(|e| StorageError::DecodingError {
                operation: "verification_schedules_get",
                item: "deal_id",
                details: e.to_string(),
            })?,
            scheduled_at: self.scheduled_at,
            check_type: self.check_type.parse().map_err(|_| StorageError::DecodingError {
                operation: "verification_schedules_get",
                item: "check_type",
                details: format!("unknown check type '{}'", self.check_type),
            })?,
            status: self.status.parse().map_err(|_| StorageError::DecodingError {
                operation: "verification_schedules_get",
                item: "status",
                details: format!("unknown status '{}'", self.status),
            })?,
            executed_at: self.executed_at,
            completed_at: self.completed_at,
            request_id: self
                .request_id
                .as_deref()
                .map(|id| {
                    RequestId::from_hex(id).map_err(|e| StorageError::DecodingError {
                        operation: "verification_schedules_get",
                        item: "request_id",
                        details: e.to_string(),
                    })
                })
                .transpose()?,
            confidence_score: self.confidence_score.map(|s| s.clamp(0, 100) as u8),
            result: self.result.as_deref().map(deserialize_json).transpose()?,
            created_at: self.created_at,
        })
    }
}
