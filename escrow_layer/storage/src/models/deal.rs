//   Copyright 2024 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tari_escrow_common_types::{ActorId, Amount, Currency, DealId};

use crate::{DealStoreReadTransaction, DealStoreWriteTransaction, StorageError};

/// The deal lifecycle. Variants are ordered in the order of their progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DealStatus {
    /// Created by the advertiser, waiting for a creator to accept
    PendingAcceptance,
    /// Accepted, waiting for the advertiser to fund escrow
    PendingFunding,
    /// Funded, waiting for the creator to submit a post URL
    PendingVerification,
    /// Post submitted, verification checks are running and the observation
    /// window has not yet elapsed
    Verifying,
    /// Verification succeeded and the observation window elapsed
    Completed,
    /// Verification failed, or funding/settlement failed. Re-openable via a
    /// successful re-funding.
    Failed,
    /// Withdrawn by either party before completion
    Cancelled,
}

impl DealStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, DealStatus::Completed | DealStatus::Failed | DealStatus::Cancelled)
    }

    pub fn is_fundable(self) -> bool {
        matches!(self, DealStatus::PendingFunding | DealStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DealStatus::PendingAcceptance => "PendingAcceptance",
            DealStatus::PendingFunding => "PendingFunding",
            DealStatus::PendingVerification => "PendingVerification",
            DealStatus::Verifying => "Verifying",
            DealStatus::Completed => "Completed",
            DealStatus::Failed => "Failed",
            DealStatus::Cancelled => "Cancelled",
        }
    }
}

impl Display for DealStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DealStatus {
    type Err = InvalidDealStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PendingAcceptance" => Ok(DealStatus::PendingAcceptance),
            "PendingFunding" => Ok(DealStatus::PendingFunding),
            "PendingVerification" => Ok(DealStatus::PendingVerification),
            "Verifying" => Ok(DealStatus::Verifying),
            "Completed" => Ok(DealStatus::Completed),
            "Failed" => Ok(DealStatus::Failed),
            "Cancelled" => Ok(DealStatus::Cancelled),
            _ => Err(InvalidDealStatus(s.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Invalid deal status '{0}'")]
pub struct InvalidDealStatus(pub String);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deal {
    pub id: DealId,
    pub advertiser_id: ActorId,
    pub creator_id: Option<ActorId>,
    pub platform: String,
    pub amount: Amount,
    pub currency: Currency,
    pub deadline: NaiveDateTime,
    pub posted_at: Option<NaiveDateTime>,
    pub post_url: Option<String>,
    pub status: DealStatus,
    pub failure_reason: Option<String>,
    pub verification_score: Option<u8>,
    pub last_verification_at: Option<NaiveDateTime>,
    pub orchestrator_result: Option<serde_json::Value>,
    pub public_opt_in: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Deal {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[derive(Debug, Clone)]
pub struct NewDeal {
    pub id: DealId,
    pub advertiser_id: ActorId,
    pub platform: String,
    pub amount: Amount,
    pub currency: Currency,
    pub deadline: NaiveDateTime,
    pub public_opt_in: bool,
}

/// Partial update applied to a deal row. `failure_reason` is doubly-optional
/// so a patch can explicitly clear it (funding retry).
#[derive(Debug, Clone, Default)]
pub struct DealPatch {
    pub status: Option<DealStatus>,
    pub creator_id: Option<ActorId>,
    pub posted_at: Option<NaiveDateTime>,
    pub post_url: Option<String>,
    pub failure_reason: Option<Option<String>>,
    pub verification_score: Option<u8>,
    pub last_verification_at: Option<NaiveDateTime>,
    pub orchestrator_result: Option<serde_json::Value>,
}

impl DealPatch {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() &&
            self.creator_id.is_none() &&
            self.posted_at.is_none() &&
            self.post_url.is_none() &&
            self.failure_reason.is_none() &&
            self.verification_score.is_none() &&
            self.last_verification_at.is_none() &&
            self.orchestrator_result.is_none()
    }
}

impl Deal {
    pub fn get<TTx: DealStoreReadTransaction>(tx: &mut TTx, deal_id: DealId) -> Result<Self, StorageError> {
        tx.deals_get(deal_id)
    }

    pub fn exists<TTx: DealStoreReadTransaction>(tx: &mut TTx, deal_id: DealId) -> Result<bool, StorageError> {
        tx.deals_exists(deal_id)
    }

    pub fn insert<TTx: DealStoreWriteTransaction>(tx: &mut TTx, deal: NewDeal) -> Result<(), StorageError> {
        tx.deals_insert(deal)
    }

    pub fn update_if_status<TTx: DealStoreWriteTransaction>(
        tx: &mut TTx,
        deal_id: DealId,
        expected: DealStatus,
        patch: DealPatch,
    ) -> Result<bool, StorageError> {
        tx.deals_update_if_status(deal_id, expected, patch)
    }
}
