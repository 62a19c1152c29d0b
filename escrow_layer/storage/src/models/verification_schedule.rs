//   Copyright 2024 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tari_escrow_common_types::{DealId, RequestId};

use crate::{DealStoreReadTransaction, DealStoreWriteTransaction, StorageError};

pub type ScheduleId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckType {
    /// Dispatched immediately when the post is submitted
    Initial,
    /// Interval checks through the observation window
    Periodic,
    /// The check at the deal deadline
    Final,
}

impl CheckType {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckType::Initial => "Initial",
            CheckType::Periodic => "Periodic",
            CheckType::Final => "Final",
        }
    }
}

impl Display for CheckType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CheckType {
    type Err = InvalidScheduleField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Initial" => Ok(CheckType::Initial),
            "Periodic" => Ok(CheckType::Periodic),
            "Final" => Ok(CheckType::Final),
            _ => Err(InvalidScheduleField("check_type", s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Expired,
    Cancelled,
}

impl ScheduleStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ScheduleStatus::Pending | ScheduleStatus::Running)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScheduleStatus::Pending => "Pending",
            ScheduleStatus::Running => "Running",
            ScheduleStatus::Completed => "Completed",
            ScheduleStatus::Failed => "Failed",
            ScheduleStatus::Expired => "Expired",
            ScheduleStatus::Cancelled => "Cancelled",
        }
    }
}

impl Display for ScheduleStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ScheduleStatus {
    type Err = InvalidScheduleField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(ScheduleStatus::Pending),
            "Running" => Ok(ScheduleStatus::Running),
            "Completed" => Ok(ScheduleStatus::Completed),
            "Failed" => Ok(ScheduleStatus::Failed),
            "Expired" => Ok(ScheduleStatus::Expired),
            "Cancelled" => Ok(ScheduleStatus::Cancelled),
            _ => Err(InvalidScheduleField("status", s.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Invalid verification schedule {0} '{1}'")]
pub struct InvalidScheduleField(pub &'static str, pub String);

/// A planned future check of whether a posted proof still satisfies its
/// proof spec.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationSchedule {
    pub id: ScheduleId,
    pub deal_id: DealId,
    pub scheduled_at: NaiveDateTime,
    pub check_type: CheckType,
    pub status: ScheduleStatus,
    pub executed_at: Option<NaiveDateTime>,
    pub completed_at: Option<NaiveDateTime>,
    pub request_id: Option<RequestId>,
    pub confidence_score: Option<u8>,
    pub result: Option<serde_json::Value>,
    pub created_at: NaiveDateTime,
}

impl VerificationSchedule {
    pub fn get<TTx: DealStoreReadTransaction>(tx: &mut TTx, schedule_id: ScheduleId) -> Result<Self, StorageError> {
        tx.verification_schedules_get(schedule_id)
    }

    pub fn get_by_request_id<TTx: DealStoreReadTransaction>(
        tx: &mut TTx,
        request_id: RequestId,
    ) -> Result<Self, StorageError> {
        tx.verification_schedules_get_by_request_id(request_id)
    }

    pub fn fetch_due<TTx: DealStoreReadTransaction>(
        tx: &mut TTx,
        due_by: NaiveDateTime,
        limit: u64,
    ) -> Result<Vec<Self>, StorageError> {
        tx.verification_schedules_fetch_due(due_by, limit)
    }

    pub fn insert<TTx: DealStoreWriteTransaction>(
        tx: &mut TTx,
        schedule: NewVerificationSchedule,
    ) -> Result<ScheduleId, StorageError> {
        tx.verification_schedules_insert(schedule)
    }
}

#[derive(Debug, Clone)]
pub struct NewVerificationSchedule {
    pub deal_id: DealId,
    pub scheduled_at: NaiveDateTime,
    pub check_type: CheckType,
}

#[derive(Debug, Clone, Default)]
pub struct SchedulePatch {
    pub status: Option<ScheduleStatus>,
    pub executed_at: Option<NaiveDateTime>,
    pub completed_at: Option<NaiveDateTime>,
    pub request_id: Option<RequestId>,
    pub confidence_score: Option<u8>,
    pub result: Option<serde_json::Value>,
}
