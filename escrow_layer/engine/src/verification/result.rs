//   Copyright 2024 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use tari_escrow_common_types::{DealId, RequestId};

/// The canonical verdict the lifecycle consumes, produced by
/// [normalize](super::normalize) from whatever shape the analysis service sent.
/// Not persisted as-is; the raw payload is kept alongside for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    /// None when the payload carried no recognisable deal id. The webhook
    /// boundary rejects these with a 400; everything downstream requires an id.
    pub deal_id: Option<DealId>,
    /// The dispatch this verdict answers, when the service echoed it back.
    pub request_id: Option<RequestId>,
    pub outcome: VerificationOutcome,
    pub overall_score: u8,
    pub confidence: u8,
    pub requirements_met: Vec<String>,
    pub requirements_failed: Vec<String>,
    pub raw: serde_json::Value,
}

impl VerificationResult {
    pub fn error(deal_id: Option<DealId>, raw: serde_json::Value) -> Self {
        Self {
            deal_id,
            request_id: None,
            outcome: VerificationOutcome::Error,
            overall_score: 0,
            confidence: 0,
            requirements_met: vec![],
            requirements_failed: vec![],
            raw,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationOutcome {
    /// The analysis ran to completion; the verdict fields are meaningful
    Completed,
    /// The analysis service failed or returned an unusable payload
    Error,
    /// The analysis ran and the service itself judged the proof failed
    Failed,
}

impl Display for VerificationOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            VerificationOutcome::Completed => write!(f, "completed"),
            VerificationOutcome::Error => write!(f, "error"),
            VerificationOutcome::Failed => write!(f, "failed"),
        }
    }
}
