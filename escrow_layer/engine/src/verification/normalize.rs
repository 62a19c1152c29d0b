//   Copyright 2024 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use serde::Deserialize;
use tari_escrow_common_types::{DealId, RequestId};

use crate::verification::{VerificationOutcome, VerificationResult};

/// The shapes the analysis service has historically sent to the callback
/// endpoint. The current shape nests the verdict under `data.analysis`; the
/// legacy shape is flat.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawCallbackPayload {
    Current(CurrentPayload),
    Legacy(LegacyPayload),
}

#[derive(Debug, Clone, Deserialize)]
struct CurrentPayload {
    #[serde(default)]
    status: Option<String>,
    #[serde(default, alias = "requestId")]
    request_id: Option<String>,
    data: CurrentData,
}

#[derive(Debug, Clone, Deserialize)]
struct CurrentData {
    deal_id: String,
    #[serde(default)]
    analysis: Option<Analysis>,
}

#[derive(Debug, Clone, Deserialize)]
struct Analysis {
    #[serde(default)]
    overall_score: Option<f64>,
    #[serde(default)]
    proof_verification: Option<ProofVerification>,
}

#[derive(Debug, Clone, Deserialize)]
struct ProofVerification {
    #[serde(default)]
    requirements_met: Vec<String>,
    #[serde(default)]
    requirements_failed: Vec<String>,
    #[serde(default)]
    overall_confidence: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
struct LegacyPayload {
    deal_id: String,
    #[serde(default)]
    verification_status: Option<String>,
    #[serde(default)]
    overall_score: Option<f64>,
}

/// Normalizes a raw callback payload into the canonical [VerificationResult].
/// Total: malformed input becomes `outcome: Error` rather than an `Err`, so a
/// bad payload can never prevent the webhook boundary from acknowledging the
/// delivery.
pub fn normalize(raw: serde_json::Value) -> VerificationResult {
    match serde_json::from_value::<RawCallbackPayload>(raw.clone()) {
        Ok(RawCallbackPayload::Current(payload)) => normalize_current(payload, raw),
        Ok(RawCallbackPayload::Legacy(payload)) => normalize_legacy(payload, raw),
        Err(_) => VerificationResult::error(extract_deal_id(&raw), raw),
    }
}

fn normalize_current(payload: CurrentPayload, raw: serde_json::Value) -> VerificationResult {
    let deal_id = DealId::from_hex(&payload.data.deal_id).ok();
    let request_id = payload.request_id.as_deref().and_then(|s| RequestId::from_hex(s).ok());

    let Some(analysis) = payload.data.analysis else {
        // A "completed" callback without a verdict is unusable
        return VerificationResult {
            request_id,
            ..VerificationResult::error(deal_id, raw)
        };
    };

    let outcome = match payload.status.as_deref() {
        Some("completed") | None => VerificationOutcome::Completed,
        Some("failed") => VerificationOutcome::Failed,
        _ => VerificationOutcome::Error,
    };

    let proof = analysis.proof_verification.unwrap_or(ProofVerification {
        requirements_met: vec![],
        requirements_failed: vec![],
        overall_confidence: None,
    });

    VerificationResult {
        deal_id,
        request_id,
        outcome,
        overall_score: clamp_score(analysis.overall_score),
        confidence: clamp_score(proof.overall_confidence),
        requirements_met: proof.requirements_met,
        requirements_failed: proof.requirements_failed,
        raw,
    }
}

fn normalize_legacy(payload: LegacyPayload, raw: serde_json::Value) -> VerificationResult {
    let deal_id = DealId::from_hex(&payload.deal_id).ok();
    let outcome = match payload.verification_status.as_deref() {
        Some("completed") => VerificationOutcome::Completed,
        Some("failed") => VerificationOutcome::Failed,
        _ => VerificationOutcome::Error,
    };

    VerificationResult {
        deal_id,
        request_id: None,
        outcome,
        overall_score: clamp_score(payload.overall_score),
        // The legacy shape carries no confidence; its verdicts were always
        // taken at face value
        confidence: 100,
        requirements_met: vec![],
        requirements_failed: vec![],
        raw,
    }
}

fn clamp_score(score: Option<f64>) -> u8 {
    score.map(|s| s.clamp(0.0, 100.0) as u8).unwrap_or(0)
}

fn extract_deal_id(raw: &serde_json::Value) -> Option<DealId> {
    raw.get("data")
        .and_then(|data| data.get("deal_id"))
        .or_else(|| raw.get("deal_id"))
        .and_then(|id| id.as_str())
        .and_then(|id| DealId::from_hex(id).ok())
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tari_escrow_common_types::DealId;

    use super::*;

    fn some_deal_id() -> DealId {
        DealId::new([7u8; 32])
    }

    #[test]
    fn it_normalizes_the_current_shape() {
        let deal_id = some_deal_id();
        let raw = json!({
            "status": "completed",
            "data": {
                "deal_id": deal_id.to_string(),
                "analysis": {
                    "overall_score": 85.4,
                    "proof_verification": {
                        "requirements_met": ["link"],
                        "requirements_failed": [],
                        "overall_confidence": 92.0,
                    }
                }
            }
        });

        let result = normalize(raw);
        assert_eq!(result.deal_id, Some(deal_id));
        assert_eq!(result.outcome, VerificationOutcome::Completed);
        assert_eq!(result.overall_score, 85);
        assert_eq!(result.confidence, 92);
        assert_eq!(result.requirements_met, vec!["link".to_string()]);
        assert!(result.requirements_failed.is_empty());
    }

    #[test]
    fn it_normalizes_the_legacy_shape() {
        let deal_id = some_deal_id();
        let raw = json!({
            "deal_id": deal_id.to_string(),
            "verification_status": "completed",
            "overall_score": 70,
        });

        let result = normalize(raw);
        assert_eq!(result.deal_id, Some(deal_id));
        assert_eq!(result.outcome, VerificationOutcome::Completed);
        assert_eq!(result.overall_score, 70);
        assert_eq!(result.confidence, 100);
    }

    #[test]
    fn it_never_fails_on_a_payload_missing_all_expected_keys() {
        let result = normalize(json!({}));
        assert_eq!(result.outcome, VerificationOutcome::Error);
        assert_eq!(result.overall_score, 0);
        assert!(result.deal_id.is_none());

        let result = normalize(json!("not even an object"));
        assert_eq!(result.outcome, VerificationOutcome::Error);

        let result = normalize(json!({ "data": { "deal_id": "not-hex" } }));
        assert_eq!(result.outcome, VerificationOutcome::Error);
        assert!(result.deal_id.is_none());
    }

    #[test]
    fn it_treats_a_completed_callback_without_analysis_as_an_error() {
        let deal_id = some_deal_id();
        let raw = json!({
            "status": "completed",
            "data": { "deal_id": deal_id.to_string() }
        });

        let result = normalize(raw);
        assert_eq!(result.deal_id, Some(deal_id));
        assert_eq!(result.outcome, VerificationOutcome::Error);
    }

    #[test]
    fn it_clamps_out_of_range_scores() {
        let deal_id = some_deal_id();
        let raw = json!({
            "deal_id": deal_id.to_string(),
            "verification_status": "completed",
            "overall_score": 250.0,
        });

        assert_eq!(normalize(raw).overall_score, 100);
    }
}
