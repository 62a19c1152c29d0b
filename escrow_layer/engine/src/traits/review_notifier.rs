//   Copyright 2024 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::fmt::Display;

use async_trait::async_trait;
use tari_escrow_storage::models::Review;

/// Delivers "a review needs human attention" notifications to the reviewer
/// channel. Delivery is best-effort; the review queue retries with backoff and
/// never fails review creation over a notification error.
#[async_trait]
pub trait ReviewNotifier {
    type Error: Display + Send + Sync;

    async fn notify_review(&self, review: &Review) -> Result<(), Self::Error>;
}
