//   Copyright 2024 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use chrono::NaiveDateTime;
use tari_escrow_storage::models::{Deal, DealPatch, DealStatus, ReviewPriority, ReviewReason};

use crate::{
    lifecycle::{SideEffect, Transition, AMBIGUOUS_SCORE_FLOOR, CONFIDENCE_FLOOR, SUCCESS_SCORE_THRESHOLD},
    verification::{VerificationOutcome, VerificationResult},
};

/// Decides the next state for a deal in `Verifying` given a fresh
/// verification verdict. Pure; callers handle staleness (terminal or
/// pre-verification deals) before getting here.
///
/// A failed named requirement always dominates the score: a 95-score result
/// that misses a required artifact still fails the deal.
pub fn on_verification_result(deal: &Deal, result: &VerificationResult, now: NaiveDateTime) -> Transition {
    debug_assert_eq!(deal.status, DealStatus::Verifying);

    let audit = DealPatch {
        verification_score: Some(result.overall_score),
        last_verification_at: Some(now),
        orchestrator_result: Some(result.raw.clone()),
        ..Default::default()
    };

    if result.outcome == VerificationOutcome::Error {
        // Not a verification failure: the service broke. A human decides.
        return Transition::new(DealStatus::Verifying, DealPatch {
            verification_score: Some(0),
            ..audit
        })
        .with_effect(SideEffect::CreateReview {
            reason: ReviewReason::OrchestratorError,
            priority: ReviewPriority::High,
        });
    }

    if !result.requirements_failed.is_empty() {
        let reason = format!("Missing requirements: {}", result.requirements_failed.join(", "));
        return fail(audit, reason);
    }

    if result.outcome == VerificationOutcome::Failed {
        return fail(audit, "Verification reported failed by the analysis service".to_string());
    }

    if result.overall_score >= SUCCESS_SCORE_THRESHOLD {
        // Success recorded; completion still waits for the observation window
        return Transition::new(DealStatus::Verifying, audit);
    }

    if result.overall_score >= AMBIGUOUS_SCORE_FLOOR || result.confidence < CONFIDENCE_FLOOR {
        let reason = if result.overall_score >= AMBIGUOUS_SCORE_FLOOR {
            ReviewReason::ManualReviewNeeded
        } else {
            ReviewReason::InferenceAmbiguous
        };
        return Transition::new(DealStatus::Verifying, audit).with_effect(SideEffect::CreateReview {
            reason,
            priority: ReviewPriority::Medium,
        });
    }

    let reason = format!(
        "Verification score {} below threshold at confidence {}",
        result.overall_score, result.confidence
    );
    fail(audit, reason)
}

fn fail(audit: DealPatch, reason: String) -> Transition {
    Transition::new(DealStatus::Verifying, DealPatch {
        status: Some(DealStatus::Failed),
        failure_reason: Some(Some(reason.clone())),
        ..audit
    })
    .with_effect(SideEffect::TriggerRefund { reason })
    .with_effect(SideEffect::CancelPendingSchedules)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tari_escrow_common_types::{Amount, Currency, DealId};

    use super::*;

    fn verifying_deal() -> Deal {
        let now = Utc::now().naive_utc();
        Deal {
            id: DealId::new([9u8; 32]),
            advertiser_id: "advertiser-1".into(),
            creator_id: Some("creator-1".into()),
            platform: "twitter".to_string(),
            amount: Amount(50),
            currency: Currency::Usdc,
            deadline: now + chrono::Duration::hours(24),
            posted_at: Some(now),
            post_url: Some("https://example.com/post/1".to_string()),
            status: DealStatus::Verifying,
            failure_reason: None,
            verification_score: None,
            last_verification_at: None,
            orchestrator_result: None,
            public_opt_in: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn result(outcome: VerificationOutcome, score: u8, confidence: u8, failed: Vec<&str>) -> VerificationResult {
        VerificationResult {
            deal_id: Some(DealId::new([9u8; 32])),
            request_id: None,
            outcome,
            overall_score: score,
            confidence,
            requirements_met: vec![],
            requirements_failed: failed.into_iter().map(|s| s.to_string()).collect(),
            raw: serde_json::json!({}),
        }
    }

    #[test]
    fn an_error_outcome_keeps_verifying_and_opens_a_high_priority_review() {
        let deal = verifying_deal();
        let t = on_verification_result(&deal, &result(VerificationOutcome::Error, 0, 0, vec![]), deal.created_at);

        assert!(t.next_status().is_none());
        assert_eq!(t.patch.verification_score, Some(0));
        assert_eq!(t.effects, vec![SideEffect::CreateReview {
            reason: ReviewReason::OrchestratorError,
            priority: ReviewPriority::High,
        }]);
    }

    #[test]
    fn a_failed_requirement_dominates_a_high_score() {
        let deal = verifying_deal();
        let t = on_verification_result(
            &deal,
            &result(VerificationOutcome::Completed, 95, 99, vec!["brand hashtag"]),
            deal.created_at,
        );

        assert_eq!(t.next_status(), Some(DealStatus::Failed));
        assert!(t
            .patch
            .failure_reason
            .clone()
            .flatten()
            .unwrap()
            .contains("brand hashtag"));
        assert!(t.effects.iter().any(|e| matches!(e, SideEffect::TriggerRefund { .. })));
        assert!(t.effects.contains(&SideEffect::CancelPendingSchedules));
    }

    #[test]
    fn a_passing_score_stays_verifying_without_side_effects() {
        let deal = verifying_deal();
        let t = on_verification_result(
            &deal,
            &result(VerificationOutcome::Completed, 85, 90, vec![]),
            deal.created_at,
        );

        assert!(t.next_status().is_none());
        assert_eq!(t.patch.verification_score, Some(85));
        assert!(t.effects.is_empty());
    }

    #[test]
    fn an_ambiguous_score_routes_to_review() {
        let deal = verifying_deal();
        let t = on_verification_result(
            &deal,
            &result(VerificationOutcome::Completed, 65, 90, vec![]),
            deal.created_at,
        );

        assert!(t.next_status().is_none());
        assert_eq!(t.effects, vec![SideEffect::CreateReview {
            reason: ReviewReason::ManualReviewNeeded,
            priority: ReviewPriority::Medium,
        }]);
    }

    #[test]
    fn a_low_score_at_low_confidence_routes_to_review_not_failure() {
        let deal = verifying_deal();
        let t = on_verification_result(
            &deal,
            &result(VerificationOutcome::Completed, 40, 50, vec![]),
            deal.created_at,
        );

        assert!(t.next_status().is_none());
        assert_eq!(t.effects, vec![SideEffect::CreateReview {
            reason: ReviewReason::InferenceAmbiguous,
            priority: ReviewPriority::Medium,
        }]);
    }

    #[test]
    fn a_confident_low_score_fails_the_deal_and_triggers_a_refund() {
        let deal = verifying_deal();
        let t = on_verification_result(
            &deal,
            &result(VerificationOutcome::Completed, 40, 90, vec![]),
            deal.created_at,
        );

        assert_eq!(t.next_status(), Some(DealStatus::Failed));
        assert!(t.effects.iter().any(|e| matches!(e, SideEffect::TriggerRefund { .. })));
    }
}
