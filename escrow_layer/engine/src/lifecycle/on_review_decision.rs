//   Copyright 2024 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use chrono::NaiveDateTime;
use tari_escrow_storage::models::{DealPatch, DealStatus, ReviewDecision};

use crate::lifecycle::{SideEffect, Transition, SUCCESS_SCORE_THRESHOLD};

/// Turns a closed review's decision into a deal transition.
///
/// `Release` records a success at the acceptance threshold but does not skip
/// the observation window: the duration sweep still performs the payout once
/// the window elapses. `Escalate` produces no transition (the review is
/// re-queued instead).
pub fn on_review_decision(decision: ReviewDecision, now: NaiveDateTime) -> Option<Transition> {
    match decision {
        ReviewDecision::Release => Some(Transition::new(DealStatus::Verifying, DealPatch {
            verification_score: Some(SUCCESS_SCORE_THRESHOLD),
            last_verification_at: Some(now),
            ..Default::default()
        })),
        ReviewDecision::Refund | ReviewDecision::ManualFail => {
            let reason = match decision {
                ReviewDecision::Refund => "Refunded by manual review".to_string(),
                _ => "Failed by manual review".to_string(),
            };
            let transition = Transition::new(DealStatus::Verifying, DealPatch {
                status: Some(DealStatus::Failed),
                failure_reason: Some(Some(reason.clone())),
                ..Default::default()
            })
            .with_effect(SideEffect::TriggerRefund { reason })
            .with_effect(SideEffect::CancelPendingSchedules);
            Some(transition)
        },
        ReviewDecision::Escalate => None,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn release_records_a_success_but_does_not_complete_the_deal() {
        let t = on_review_decision(ReviewDecision::Release, Utc::now().naive_utc()).unwrap();
        assert!(t.next_status().is_none());
        assert_eq!(t.patch.verification_score, Some(SUCCESS_SCORE_THRESHOLD));
        assert!(t.effects.is_empty());
    }

    #[test]
    fn refund_and_manual_fail_both_fail_the_deal_with_a_refund() {
        for decision in [ReviewDecision::Refund, ReviewDecision::ManualFail] {
            let t = on_review_decision(decision, Utc::now().naive_utc()).unwrap();
            assert_eq!(t.next_status(), Some(DealStatus::Failed));
            assert!(t.effects.iter().any(|e| matches!(e, SideEffect::TriggerRefund { .. })));
        }
    }

    #[test]
    fn escalate_does_not_transition_the_deal() {
        assert!(on_review_decision(ReviewDecision::Escalate, Utc::now().naive_utc()).is_none());
    }
}
