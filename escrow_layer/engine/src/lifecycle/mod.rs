//   Copyright 2024 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

mod manager;
mod on_duration_check;
mod on_review_decision;
mod on_verification_result;
mod transition;

pub use manager::{DealLifecycle, LifecycleError, VerificationAck};
pub use on_duration_check::on_duration_check;
pub use on_review_decision::on_review_decision;
pub use on_verification_result::on_verification_result;
pub use transition::{SideEffect, Transition};

/// A score at or above this records a verification success. Completion is
/// additionally gated on the observation window.
pub const SUCCESS_SCORE_THRESHOLD: u8 = 80;
/// Scores in [AMBIGUOUS_SCORE_FLOOR, SUCCESS_SCORE_THRESHOLD) are routed to a
/// human rather than auto-failed.
pub const AMBIGUOUS_SCORE_FLOOR: u8 = 60;
/// Below this confidence the automated verdict is not trusted either way.
pub const CONFIDENCE_FLOOR: u8 = 70;
