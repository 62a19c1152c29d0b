//   Copyright 2024 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use chrono::NaiveDateTime;
use tari_escrow_common_types::{DealId, DurationHours};
use tari_escrow_storage::{models, StorageError};

use crate::{schema::proof_specs, serialization::deserialize_json};

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = proof_specs)]
pub struct ProofSpec {
    pub id: i32,
    pub deal_id: String,
    pub text_proof: String,
    pub duration_hours: i32,
    pub visual_markers: String,
    pub video_markers: String,
    pub link_markers: String,
    pub revision: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl ProofSpec {
    pub fn try_into_proof_spec(self) -> Result<models::ProofSpec, StorageError> {
        let duration_hours = u32::try_from(self.duration_hours)
            .ok()
            .and_then(|h| DurationHours::new(h).ok())
            .ok_or_else(|| StorageError::DataInconsistency {
                details: format!(
                    "proof spec for deal {} has duration {} outside the permitted set",
                    self.deal_id, self.duration_hours
                ),
            })?;

        Ok(models::ProofSpec {
            deal_id: DealId::from_hex(&self.deal_id).map_err(|e| StorageError::DecodingError {
                operation: "proof_specs_get",
                item: "deal_id",
                details: e.to_string(),
            })?,
            text_proof: self.text_proof,
            duration_hours,
            visual_markers: deserialize_json(&self.visual_markers)?,
            video_markers: deserialize_json(&self.video_markers)?,
            link_markers: deserialize_json(&self.link_markers)?,
            revision: self.revision as u32,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
