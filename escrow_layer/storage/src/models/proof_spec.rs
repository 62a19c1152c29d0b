//   Copyright 2024 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tari_escrow_common_types::{DealId, DurationHours};

use crate::{DealStoreReadTransaction, DealStoreWriteTransaction, StorageError};

/// The advertiser-defined criteria a creator's post must satisfy. One-to-one
/// with a deal. The creator may revise it until the deal is terminal; each
/// revision bumps the counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofSpec {
    pub deal_id: DealId,
    pub text_proof: String,
    pub duration_hours: DurationHours,
    pub visual_markers: Vec<String>,
    pub video_markers: Vec<String>,
    pub link_markers: Vec<String>,
    pub revision: u32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl ProofSpec {
    /// The moment a recorded verification success becomes eligible for final
    /// completion, measured from when the post was submitted.
    pub fn completion_time(&self, posted_at: NaiveDateTime) -> NaiveDateTime {
        posted_at + self.duration_hours.to_duration()
    }

    pub fn get<TTx: DealStoreReadTransaction>(tx: &mut TTx, deal_id: DealId) -> Result<Self, StorageError> {
        tx.proof_specs_get(deal_id)
    }

    pub fn insert<TTx: DealStoreWriteTransaction>(tx: &mut TTx, spec: NewProofSpec) -> Result<(), StorageError> {
        tx.proof_specs_insert(spec)
    }
}

#[derive(Debug, Clone)]
pub struct NewProofSpec {
    pub deal_id: DealId,
    pub text_proof: String,
    pub duration_hours: DurationHours,
    pub visual_markers: Vec<String>,
    pub video_markers: Vec<String>,
    pub link_markers: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProofSpecPatch {
    pub text_proof: Option<String>,
    pub duration_hours: Option<DurationHours>,
    pub visual_markers: Option<Vec<String>>,
    pub video_markers: Option<Vec<String>>,
    pub link_markers: Option<Vec<String>>,
}
