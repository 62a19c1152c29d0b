//   Copyright 2024 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

mod deal;
mod escrow_event;
mod payout;
mod proof_spec;
mod refund;
mod review;
mod verification_schedule;

pub use deal::{Deal, DealPatch, DealStatus, InvalidDealStatus, NewDeal};
pub use escrow_event::{EscrowEvent, EscrowEventType, InvalidEscrowEventType, NewEscrowEvent};
pub use payout::{
    InvalidSettlementStatus,
    NewPayout,
    Payout,
    PayoutId,
    SettlementInsert,
    SettlementPatch,
    SettlementStatus,
};
pub use proof_spec::{NewProofSpec, ProofSpec, ProofSpecPatch};
pub use refund::{NewRefund, Refund, RefundId};
pub use review::{
    InvalidReviewField,
    NewReview,
    Review,
    ReviewDecision,
    ReviewId,
    ReviewPatch,
    ReviewPriority,
    ReviewReason,
    ReviewStatus,
};
pub use verification_schedule::{
    CheckType,
    InvalidScheduleField,
    NewVerificationSchedule,
    SchedulePatch,
    ScheduleId,
    ScheduleStatus,
    VerificationSchedule,
};
