//   Copyright 2024 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tari_escrow_common_types::{ActorId, DealId, RequestId};

use crate::{DealStoreReadTransaction, DealStoreWriteTransaction, StorageError};

pub type ReviewId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewReason {
    /// The analysis service returned an error or an unusable payload
    OrchestratorError,
    /// Score in the ambiguous band
    ManualReviewNeeded,
    /// Confidence below the trust floor
    InferenceAmbiguous,
    /// Re-queued by a reviewer
    Escalated,
}

impl ReviewReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewReason::OrchestratorError => "OrchestratorError",
            ReviewReason::ManualReviewNeeded => "ManualReviewNeeded",
            ReviewReason::InferenceAmbiguous => "InferenceAmbiguous",
            ReviewReason::Escalated => "Escalated",
        }
    }
}

impl Display for ReviewReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ReviewReason {
    type Err = InvalidReviewField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OrchestratorError" => Ok(ReviewReason::OrchestratorError),
            "ManualReviewNeeded" => Ok(ReviewReason::ManualReviewNeeded),
            "InferenceAmbiguous" => Ok(ReviewReason::InferenceAmbiguous),
            "Escalated" => Ok(ReviewReason::Escalated),
            _ => Err(InvalidReviewField("reason_code", s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReviewPriority {
    Low,
    Medium,
    High,
}

impl ReviewPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewPriority::Low => "Low",
            ReviewPriority::Medium => "Medium",
            ReviewPriority::High => "High",
        }
    }
}

impl Display for ReviewPriority {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ReviewPriority {
    type Err = InvalidReviewField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Low" => Ok(ReviewPriority::Low),
            "Medium" => Ok(ReviewPriority::Medium),
            "High" => Ok(ReviewPriority::High),
            _ => Err(InvalidReviewField("priority", s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewStatus {
    Open,
    Assigned,
    InProgress,
    Closed,
}

impl ReviewStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewStatus::Open => "Open",
            ReviewStatus::Assigned => "Assigned",
            ReviewStatus::InProgress => "InProgress",
            ReviewStatus::Closed => "Closed",
        }
    }
}

impl Display for ReviewStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ReviewStatus {
    type Err = InvalidReviewField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Open" => Ok(ReviewStatus::Open),
            "Assigned" => Ok(ReviewStatus::Assigned),
            "InProgress" => Ok(ReviewStatus::InProgress),
            "Closed" => Ok(ReviewStatus::Closed),
            _ => Err(InvalidReviewField("status", s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewDecision {
    /// Treat the verification as a recorded success
    Release,
    /// Fail the deal and refund the advertiser
    Refund,
    /// Fail the deal without an automatic refund
    ManualFail,
    /// Re-queue for a more senior reviewer
    Escalate,
}

impl ReviewDecision {
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewDecision::Release => "Release",
            ReviewDecision::Refund => "Refund",
            ReviewDecision::ManualFail => "ManualFail",
            ReviewDecision::Escalate => "Escalate",
        }
    }
}

impl Display for ReviewDecision {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ReviewDecision {
    type Err = InvalidReviewField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Release" => Ok(ReviewDecision::Release),
            "Refund" => Ok(ReviewDecision::Refund),
            "ManualFail" => Ok(ReviewDecision::ManualFail),
            "Escalate" => Ok(ReviewDecision::Escalate),
            _ => Err(InvalidReviewField("decision", s.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Invalid review {0} '{1}'")]
pub struct InvalidReviewField(pub &'static str, pub String);

/// A manual-review task for an ambiguous or erroring verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub deal_id: DealId,
    pub run_id: Option<RequestId>,
    pub reason_code: ReviewReason,
    pub priority: ReviewPriority,
    pub status: ReviewStatus,
    pub decision: Option<ReviewDecision>,
    pub assigned_to: Option<ActorId>,
    pub notes: Option<String>,
    pub evidence: Option<serde_json::Value>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub closed_at: Option<NaiveDateTime>,
}

impl Review {
    pub fn is_closed(&self) -> bool {
        self.status == ReviewStatus::Closed
    }

    pub fn get<TTx: DealStoreReadTransaction>(tx: &mut TTx, review_id: ReviewId) -> Result<Self, StorageError> {
        tx.reviews_get(review_id)
    }

    pub fn fetch_open<TTx: DealStoreReadTransaction>(tx: &mut TTx, limit: u64) -> Result<Vec<Self>, StorageError> {
        tx.reviews_fetch_open(limit)
    }

    pub fn insert<TTx: DealStoreWriteTransaction>(tx: &mut TTx, review: NewReview) -> Result<Self, StorageError> {
        tx.reviews_insert(review)
    }
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub deal_id: DealId,
    pub run_id: Option<RequestId>,
    pub reason_code: ReviewReason,
    pub priority: ReviewPriority,
    pub notes: Option<String>,
    pub evidence: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default)]
pub struct ReviewPatch {
    pub status: Option<ReviewStatus>,
    pub decision: Option<ReviewDecision>,
    pub assigned_to: Option<ActorId>,
    pub notes: Option<String>,
    pub closed_at: Option<NaiveDateTime>,
}
