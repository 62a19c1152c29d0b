//   Copyright 2024 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use tari_escrow_storage::models::{DealPatch, DealStatus, ReviewPriority, ReviewReason};

/// The outcome of a lifecycle decision: a status-guarded patch plus the side
/// effects to run once the patch lands. The patch is only applied if the deal
/// is still in `expected_status` when the write happens; losing that race
/// means another trigger already moved the deal on, and the whole transition
/// (effects included) is dropped.
#[derive(Debug, Clone)]
pub struct Transition {
    pub expected_status: DealStatus,
    pub patch: DealPatch,
    pub effects: Vec<SideEffect>,
}

impl Transition {
    pub fn new(expected_status: DealStatus, patch: DealPatch) -> Self {
        Self {
            expected_status,
            patch,
            effects: Vec::new(),
        }
    }

    pub fn with_effect(mut self, effect: SideEffect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn next_status(&self) -> Option<DealStatus> {
        self.patch.status
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEffect {
    CreateReview {
        reason: ReviewReason,
        priority: ReviewPriority,
    },
    TriggerPayout,
    TriggerRefund {
        reason: String,
    },
    /// Close every pending schedule as completed (the deal finished)
    CompletePendingSchedules,
    /// Close every pending schedule as cancelled (the deal failed or was
    /// withdrawn)
    CancelPendingSchedules,
}
