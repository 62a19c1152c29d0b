//   Copyright 2024 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use chrono::NaiveDateTime;
use tari_escrow_storage::models::{Deal, DealPatch, DealStatus, ProofSpec};

use crate::lifecycle::{SideEffect, Transition, SUCCESS_SCORE_THRESHOLD};

/// Applies the duration gate to a deal in `Verifying`: nothing happens before
/// `posted_at + duration_hours`; at or after it, a recorded success becomes
/// the final completion (payout) and anything else becomes a failure
/// (refund). Returns None while the window is still open or when the deal has
/// not seen a verification attempt yet.
pub fn on_duration_check(deal: &Deal, spec: &ProofSpec, now: NaiveDateTime) -> Option<Transition> {
    if deal.status != DealStatus::Verifying {
        return None;
    }
    // Both set once the deal is Verifying and at least one check ran; the
    // sweep only selects such deals, but a direct caller may not
    let posted_at = deal.posted_at?;
    deal.last_verification_at?;

    let completion_time = spec.completion_time(posted_at);
    if now < completion_time {
        return None;
    }

    if deal.verification_score.is_some_and(|score| score >= SUCCESS_SCORE_THRESHOLD) {
        let transition = Transition::new(DealStatus::Verifying, DealPatch {
            status: Some(DealStatus::Completed),
            ..Default::default()
        })
        .with_effect(SideEffect::TriggerPayout)
        .with_effect(SideEffect::CompletePendingSchedules);
        return Some(transition);
    }

    let reason = "duration completed without successful verification".to_string();
    let transition = Transition::new(DealStatus::Verifying, DealPatch {
        status: Some(DealStatus::Failed),
        failure_reason: Some(Some(reason.clone())),
        ..Default::default()
    })
    .with_effect(SideEffect::TriggerRefund { reason })
    .with_effect(SideEffect::CancelPendingSchedules);
    Some(transition)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use tari_escrow_common_types::{Amount, Currency, DealId, DurationHours};

    use super::*;

    fn fixtures(score: Option<u8>) -> (Deal, ProofSpec) {
        let now = Utc::now().naive_utc();
        let deal = Deal {
            id: DealId::new([4u8; 32]),
            advertiser_id: "advertiser-1".into(),
            creator_id: Some("creator-1".into()),
            platform: "twitter".to_string(),
            amount: Amount(50),
            currency: Currency::Usdc,
            deadline: now + Duration::hours(24),
            posted_at: Some(now),
            post_url: Some("https://example.com/post/1".to_string()),
            status: DealStatus::Verifying,
            failure_reason: None,
            verification_score: score,
            last_verification_at: score.map(|_| now + Duration::hours(1)),
            orchestrator_result: None,
            public_opt_in: false,
            created_at: now,
            updated_at: now,
        };
        let spec = ProofSpec {
            deal_id: deal.id,
            text_proof: "Post stays live".to_string(),
            duration_hours: DurationHours::new(24).unwrap(),
            visual_markers: vec![],
            video_markers: vec![],
            link_markers: vec![],
            revision: 0,
            created_at: now,
            updated_at: now,
        };
        (deal, spec)
    }

    #[test]
    fn a_recorded_success_is_gated_until_the_window_elapses() {
        let (deal, spec) = fixtures(Some(90));
        let posted_at = deal.posted_at.unwrap();

        assert!(on_duration_check(&deal, &spec, posted_at + Duration::hours(23)).is_none());

        let t = on_duration_check(&deal, &spec, posted_at + Duration::hours(25)).unwrap();
        assert_eq!(t.next_status(), Some(DealStatus::Completed));
        assert!(t.effects.contains(&SideEffect::TriggerPayout));
        assert!(t.effects.contains(&SideEffect::CompletePendingSchedules));
    }

    #[test]
    fn an_elapsed_window_without_a_success_fails_the_deal() {
        let (deal, spec) = fixtures(Some(70));
        let posted_at = deal.posted_at.unwrap();

        let t = on_duration_check(&deal, &spec, posted_at + Duration::hours(25)).unwrap();
        assert_eq!(t.next_status(), Some(DealStatus::Failed));
        assert!(t.effects.iter().any(|e| matches!(e, SideEffect::TriggerRefund { .. })));
        assert!(t.effects.contains(&SideEffect::CancelPendingSchedules));
    }

    #[test]
    fn deals_without_a_verification_attempt_are_not_swept() {
        let (deal, spec) = fixtures(None);
        let posted_at = deal.posted_at.unwrap();
        assert!(on_duration_check(&deal, &spec, posted_at + Duration::hours(25)).is_none());
    }

    #[test]
    fn completion_fires_exactly_at_the_boundary() {
        let (deal, spec) = fixtures(Some(80));
        let completion = spec.completion_time(deal.posted_at.unwrap());
        let t = on_duration_check(&deal, &spec, completion).unwrap();
        assert_eq!(t.next_status(), Some(DealStatus::Completed));
    }
}
