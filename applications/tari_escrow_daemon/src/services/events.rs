// Copyright 2024 The Tari Project
// SPDX-License-Identifier: BSD-3-Clause

use tari_escrow_common_types::DealId;

/// Events fanned out over [Notify](crate::notify::Notify) so services can
/// react to handler activity without coupling to the webserver.
#[derive(Debug, Clone)]
pub enum DealEvent {
    DealCreated { deal_id: DealId },
    DealFunded { deal_id: DealId },
    /// A creator submitted a post; the initial verification check is due
    /// immediately and the scheduler should wake up
    PostSubmitted { deal_id: DealId },
    VerificationProcessed { deal_id: DealId },
}
