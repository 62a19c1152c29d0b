//   Copyright 2024 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::time::Duration;

use chrono::NaiveDateTime;
use log::*;
use tari_escrow_common_types::ActorId;
use tari_escrow_storage::{
    models::{NewReview, Review, ReviewDecision, ReviewId, ReviewPatch, ReviewStatus},
    DealStore,
    DealStoreWriteTransaction,
    StorageError,
};
use tokio::time;

use crate::traits::ReviewNotifier;

const LOG_TARGET: &str = "tari::escrow::engine::hitl";

const MAX_NOTIFY_ATTEMPTS: u32 = 3;
const NOTIFY_BASE_DELAY: Duration = Duration::from_secs(2);

/// The manual-review queue. Review creation always succeeds if the row can be
/// written; notifying the reviewer channel is best-effort with bounded
/// retries in the background.
pub struct ReviewApi<TStore, TNotifier> {
    store: TStore,
    notifier: TNotifier,
}

impl<TStore, TNotifier> ReviewApi<TStore, TNotifier>
where
    TStore: DealStore,
    TNotifier: ReviewNotifier + Clone + Send + Sync + 'static,
{
    pub fn new(store: TStore, notifier: TNotifier) -> Self {
        Self { store, notifier }
    }

    pub fn create_review(&self, review: NewReview) -> Result<Review, ReviewApiError> {
        let review = self.store.with_write_tx(|tx| Review::insert(tx, review))?;
        info!(
            target: LOG_TARGET,
            "Created {} review {} for deal {}", review.priority, review.id, review.deal_id
        );
        self.spawn_notification(review.clone());
        Ok(review)
    }

    pub fn get(&self, review_id: ReviewId) -> Result<Review, ReviewApiError> {
        let review = self.store.with_read_tx(|tx| Review::get(tx, review_id))?;
        Ok(review)
    }

    pub fn fetch_open(&self, limit: u64) -> Result<Vec<Review>, ReviewApiError> {
        let reviews = self.store.with_read_tx(|tx| Review::fetch_open(tx, limit))?;
        Ok(reviews)
    }

    pub fn assign(&self, review_id: ReviewId, reviewer: ActorId) -> Result<(), ReviewApiError> {
        let updated = self.store.with_write_tx(|tx| {
            tx.reviews_update_if_open(review_id, ReviewPatch {
                status: Some(ReviewStatus::Assigned),
                assigned_to: Some(reviewer),
                ..Default::default()
            })
        })?;
        if !updated {
            return Err(ReviewApiError::ReviewClosed { review_id });
        }
        Ok(())
    }

    /// Closes the review with the reviewer's decision. Returns false if the
    /// review was closed concurrently, so a decision is only ever recorded
    /// once.
    pub fn close(
        &self,
        review_id: ReviewId,
        decision: ReviewDecision,
        notes: Option<String>,
        now: NaiveDateTime,
    ) -> Result<bool, ReviewApiError> {
        let closed = self.store.with_write_tx(|tx| {
            tx.reviews_update_if_open(review_id, ReviewPatch {
                status: Some(ReviewStatus::Closed),
                decision: Some(decision),
                notes,
                closed_at: Some(now),
                ..Default::default()
            })
        })?;
        Ok(closed)
    }

    /// Re-queues the review for more senior attention: back to open,
    /// unassigned, and re-notified. The deal is untouched.
    pub fn escalate(&self, review_id: ReviewId, notes: Option<String>) -> Result<Review, ReviewApiError> {
        let updated = self.store.with_write_tx(|tx| {
            tx.reviews_update_if_open(review_id, ReviewPatch {
                status: Some(ReviewStatus::Open),
                notes,
                ..Default::default()
            })
        })?;
        if !updated {
            return Err(ReviewApiError::ReviewClosed { review_id });
        }
        let review = self.get(review_id)?;
        self.spawn_notification(review.clone());
        Ok(review)
    }

    fn spawn_notification(&self, review: Review) {
        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            let mut delay = NOTIFY_BASE_DELAY;
            for attempt in 1..=MAX_NOTIFY_ATTEMPTS {
                match notifier.notify_review(&review).await {
                    Ok(()) => return,
                    Err(e) => {
                        warn!(
                            target: LOG_TARGET,
                            "Failed to deliver notification for review {} (attempt {}/{}): {}",
                            review.id,
                            attempt,
                            MAX_NOTIFY_ATTEMPTS,
                            e
                        );
                        if attempt < MAX_NOTIFY_ATTEMPTS {
                            time::sleep(delay).await;
                            delay *= 2;
                        }
                    },
                }
            }
            error!(
                target: LOG_TARGET,
                "Giving up on notification for review {} after {} attempts", review.id, MAX_NOTIFY_ATTEMPTS
            );
        });
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReviewApiError {
    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),
    #[error("Review {review_id} is already closed")]
    ReviewClosed { review_id: ReviewId },
    #[error("Reviewer {reviewer} is not assigned to review {review_id}")]
    NotAuthorized { review_id: ReviewId, reviewer: ActorId },
}
