//   Copyright 2024 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

mod deal;
mod escrow_event;
mod payout;
mod proof_spec;
mod refund;
mod review;
mod verification_schedule;

pub use deal::Deal;
pub use escrow_event::EscrowEvent;
pub use payout::Payout;
pub use proof_spec::ProofSpec;
pub use refund::Refund;
pub use review::Review;
pub use verification_schedule::VerificationSchedule;
