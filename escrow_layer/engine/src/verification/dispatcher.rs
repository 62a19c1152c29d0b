//   Copyright 2024 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use chrono::NaiveDateTime;
use log::*;
use serde::Serialize;
use tari_escrow_common_types::{DealId, RequestId};
use tari_escrow_storage::{
    models::{Deal, DealStatus, ProofSpec, SchedulePatch, ScheduleStatus, VerificationSchedule},
    DealStore,
    DealStoreWriteTransaction,
    StorageError,
};

use crate::traits::AnalysisClient;

const LOG_TARGET: &str = "tari::escrow::engine::dispatcher";

const DEFAULT_ANALYSIS_TYPE: &str = "proof_verification";

/// The request submitted to the external analysis service. Field names follow
/// the service's wire contract.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRequest {
    pub url: String,
    #[serde(rename = "callbackUrl")]
    pub callback_url: String,
    #[serde(rename = "requestId")]
    pub request_id: RequestId,
    pub metadata: AnalysisMetadata,
    pub options: AnalysisOptions,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisMetadata {
    pub deal_id: DealId,
    pub proof_spec: AnalysisProofSpec,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisProofSpec {
    pub text_proof: String,
    pub platform: String,
    pub account_handle: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOptions {
    #[serde(rename = "analysisType")]
    pub analysis_type: String,
}

#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    Dispatched { request_id: RequestId },
    /// Another tick claimed the schedule first
    AlreadyClaimed,
    /// Submission to the analysis service failed; the schedule is marked
    /// failed and the next ladder row serves as the retry
    Failed { error: String },
}

/// Formats verification requests and submits them to the analysis service,
/// claiming the schedule row on the way so overlapping drivers cannot dispatch
/// the same check twice.
pub struct VerificationDispatcher<TStore, TClient> {
    store: TStore,
    client: TClient,
    callback_url: String,
}

impl<TStore, TClient> VerificationDispatcher<TStore, TClient>
where
    TStore: DealStore,
    TClient: AnalysisClient,
{
    pub fn new(store: TStore, client: TClient, callback_url: String) -> Self {
        Self {
            store,
            client,
            callback_url,
        }
    }

    /// Claims the pending schedule and submits the analysis request.
    /// Fire-and-forget: the verdict arrives later via the callback or a poll.
    pub async fn dispatch(
        &self,
        deal: &Deal,
        spec: &ProofSpec,
        schedule: &VerificationSchedule,
        now: NaiveDateTime,
    ) -> Result<DispatchOutcome, DispatchError> {
        let request_id = RequestId::new_random();
        let claimed = self.claim_schedule(schedule, request_id, now)?;
        if !claimed {
            debug!(
                target: LOG_TARGET,
                "Schedule {} for deal {} already claimed by another driver", schedule.id, deal.id
            );
            return Ok(DispatchOutcome::AlreadyClaimed);
        }

        let request = self.build_request(deal, spec, request_id)?;
        match self.client.submit_analysis(&request).await {
            Ok(()) => {
                info!(
                    target: LOG_TARGET,
                    "Dispatched {} verification for deal {} (request {})", schedule.check_type, deal.id, request_id
                );
                Ok(DispatchOutcome::Dispatched { request_id })
            },
            Err(e) => {
                warn!(
                    target: LOG_TARGET,
                    "Failed to dispatch verification for deal {}: {}", deal.id, e
                );
                self.store.with_write_tx(|tx| {
                    tx.verification_schedules_update(schedule.id, SchedulePatch {
                        status: Some(ScheduleStatus::Failed),
                        completed_at: Some(now),
                        result: Some(serde_json::json!({ "dispatch_error": e.to_string() })),
                        ..Default::default()
                    })
                })?;
                Ok(DispatchOutcome::Failed { error: e.to_string() })
            },
        }
    }

    /// The pull path: claims due schedules and returns the formatted requests
    /// for an analysis service that polls instead of being pushed to.
    pub fn poll_pending(
        &self,
        now: NaiveDateTime,
        limit: u64,
    ) -> Result<Vec<AnalysisRequest>, DispatchError> {
        let due = self
            .store
            .with_read_tx(|tx| VerificationSchedule::fetch_due(tx, now, limit))?;

        let mut requests = Vec::with_capacity(due.len());
        for schedule in due {
            let deal = self.store.with_read_tx(|tx| Deal::get(tx, schedule.deal_id))?;
            if deal.status != DealStatus::Verifying || deal.post_url.is_none() {
                continue;
            }
            let spec = self.store.with_read_tx(|tx| ProofSpec::get(tx, deal.id))?;

            let request_id = RequestId::new_random();
            if !self.claim_schedule(&schedule, request_id, now)? {
                continue;
            }
            requests.push(self.build_request(&deal, &spec, request_id)?);
        }
        Ok(requests)
    }

    fn claim_schedule(
        &self,
        schedule: &VerificationSchedule,
        request_id: RequestId,
        now: NaiveDateTime,
    ) -> Result<bool, DispatchError> {
        let claimed = self.store.with_write_tx(|tx| {
            tx.verification_schedules_update_if_status(schedule.id, ScheduleStatus::Pending, SchedulePatch {
                status: Some(ScheduleStatus::Running),
                executed_at: Some(now),
                request_id: Some(request_id),
                ..Default::default()
            })
        })?;
        Ok(claimed)
    }

    fn build_request(
        &self,
        deal: &Deal,
        spec: &ProofSpec,
        request_id: RequestId,
    ) -> Result<AnalysisRequest, DispatchError> {
        let url = deal
            .post_url
            .clone()
            .ok_or(DispatchError::MissingPostUrl { deal_id: deal.id })?;

        Ok(AnalysisRequest {
            url,
            callback_url: self.callback_url.clone(),
            request_id,
            metadata: AnalysisMetadata {
                deal_id: deal.id,
                proof_spec: AnalysisProofSpec {
                    text_proof: effective_proof_text(spec, &deal.platform),
                    platform: deal.platform.clone(),
                    account_handle: deal.creator_id.as_ref().map(|id| id.to_string()),
                },
            },
            options: AnalysisOptions {
                analysis_type: DEFAULT_ANALYSIS_TYPE.to_string(),
            },
        })
    }
}

/// The stored proof text, or a deterministic generic prompt when the
/// advertiser left it empty.
fn effective_proof_text(spec: &ProofSpec, platform: &str) -> String {
    if spec.text_proof.trim().is_empty() {
        format!(
            "Verify that the submitted {} post is live, publicly visible and consistent with the agreed deal brief",
            platform
        )
    } else {
        spec.text_proof.clone()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),
    #[error("Deal {deal_id} has no post URL to verify")]
    MissingPostUrl { deal_id: DealId },
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tari_escrow_common_types::DurationHours;

    use super::*;

    #[test]
    fn it_falls_back_to_a_generic_prompt_for_an_empty_proof_text() {
        let spec = ProofSpec {
            deal_id: DealId::new([3u8; 32]),
            text_proof: "  ".to_string(),
            duration_hours: DurationHours::new(24).unwrap(),
            visual_markers: vec![],
            video_markers: vec![],
            link_markers: vec![],
            revision: 0,
            created_at: Utc::now().naive_utc(),
            updated_at: Utc::now().naive_utc(),
        };

        let text = effective_proof_text(&spec, "instagram");
        assert!(text.contains("instagram"));

        let spec = ProofSpec {
            text_proof: "Post must show the product".to_string(),
            ..spec
        };
        assert_eq!(effective_proof_text(&spec, "instagram"), "Post must show the product");
    }
}
