//   Copyright 2024 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::ops::DerefMut;

use chrono::NaiveDateTime;
use log::*;
use tari_escrow_common_types::{optional::Optional, ActorId, Amount, Currency, DealId, DurationHours};
use tari_escrow_storage::{
    models::{
        Deal,
        DealPatch,
        DealStatus,
        EscrowEvent,
        EscrowEventType,
        NewDeal,
        NewEscrowEvent,
        NewProofSpec,
        ProofSpec,
        ProofSpecPatch,
        ScheduleStatus,
        VerificationSchedule,
    },
    DealStore,
    DealStoreReadTransaction,
    DealStoreWriteTransaction,
    StorageError,
};
use url::Url;

use crate::verification::build_schedule_ladder;

const LOG_TARGET: &str = "tari::escrow::engine::deals";

pub(crate) fn is_valid_post_url(url: &str) -> bool {
    Url::parse(url)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host().is_some())
        .unwrap_or(false)
}

#[derive(Debug, Clone)]
pub struct NewDealRequest {
    pub advertiser_id: ActorId,
    pub platform: String,
    pub amount: Amount,
    pub currency: Currency,
    pub deadline: NaiveDateTime,
    pub public_opt_in: bool,
    pub text_proof: String,
    pub duration_hours: DurationHours,
    pub visual_markers: Vec<String>,
    pub video_markers: Vec<String>,
    pub link_markers: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FundingConfirmation {
    pub tx_ref: Option<String>,
}

/// Party-facing deal operations. Every status change routes through the
/// store's compare-and-swap so a concurrent trigger cannot be overwritten;
/// a lost race surfaces as [DealApiError::ConcurrentUpdate] for the caller to
/// retry.
pub struct DealApi<TStore> {
    store: TStore,
}

impl<TStore: DealStore> DealApi<TStore> {
    pub fn new(store: TStore) -> Self {
        Self { store }
    }

    pub fn get(&self, deal_id: DealId) -> Result<Deal, DealApiError> {
        self.store
            .with_read_tx(|tx| Deal::get(tx, deal_id).optional())?
            .ok_or(DealApiError::NotFound { deal_id })
    }

    pub fn get_proof_spec(&self, deal_id: DealId) -> Result<ProofSpec, DealApiError> {
        let spec = self.store.with_read_tx(|tx| ProofSpec::get(tx, deal_id))?;
        Ok(spec)
    }

    pub fn fetch_all_by_status(&self, status: DealStatus, limit: u64) -> Result<Vec<Deal>, DealApiError> {
        let deals = self.store.with_read_tx(|tx| tx.deals_fetch_all_by_status(status, limit))?;
        Ok(deals)
    }

    pub fn create(&self, request: NewDealRequest, now: NaiveDateTime) -> Result<Deal, DealApiError> {
        if request.platform.trim().is_empty() {
            return Err(DealApiError::InvalidArgument {
                details: "platform must not be empty".to_string(),
            });
        }
        if request.amount.is_zero() {
            return Err(DealApiError::InvalidArgument {
                details: "amount must be greater than zero".to_string(),
            });
        }
        if request.deadline <= now {
            return Err(DealApiError::InvalidArgument {
                details: "deadline must be in the future".to_string(),
            });
        }

        let deal_id = DealId::new_random();
        let deal = self.store.with_write_tx(|tx| {
            Deal::insert(tx, NewDeal {
                id: deal_id,
                advertiser_id: request.advertiser_id,
                platform: request.platform,
                amount: request.amount,
                currency: request.currency,
                deadline: request.deadline,
                public_opt_in: request.public_opt_in,
            })?;
            ProofSpec::insert(tx, NewProofSpec {
                deal_id,
                text_proof: request.text_proof,
                duration_hours: request.duration_hours,
                visual_markers: request.visual_markers,
                video_markers: request.video_markers,
                link_markers: request.link_markers,
            })?;
            Deal::get(tx.deref_mut(), deal_id)
        })?;
        info!(target: LOG_TARGET, "Created deal {} on {}", deal.id, deal.platform);
        Ok(deal)
    }

    /// A creator takes the deal. Advertisers cannot accept their own deals.
    pub fn accept(&self, deal_id: DealId, actor: ActorId, _now: NaiveDateTime) -> Result<Deal, DealApiError> {
        let deal = self.get(deal_id)?;
        if deal.status != DealStatus::PendingAcceptance {
            return Err(DealApiError::InvalidState {
                deal_id,
                status: deal.status,
                operation: "accept",
            });
        }
        if deal.advertiser_id == actor {
            return Err(DealApiError::CannotAcceptOwnDeal { deal_id });
        }

        self.update_checked(deal_id, DealStatus::PendingAcceptance, DealPatch {
            status: Some(DealStatus::PendingFunding),
            creator_id: Some(actor),
            ..Default::default()
        })?;
        self.get(deal_id)
    }

    /// Confirms funds entered escrow. Permitted from `PendingFunding` and,
    /// as the funding-retry path, from `Failed` (clearing the old failure).
    pub fn mark_funded(
        &self,
        deal_id: DealId,
        funding: FundingConfirmation,
        _now: NaiveDateTime,
    ) -> Result<Deal, DealApiError> {
        let deal = self.get(deal_id)?;
        if !deal.status.is_fundable() {
            return Err(DealApiError::InvalidState {
                deal_id,
                status: deal.status,
                operation: "mark_funded",
            });
        }

        let expected = deal.status;
        self.store.with_write_tx(|tx| {
            let updated = tx.deals_update_if_status(deal_id, expected, DealPatch {
                status: Some(DealStatus::PendingVerification),
                failure_reason: Some(None),
                ..Default::default()
            })?;
            if !updated {
                return Ok(false);
            }
            EscrowEvent::insert(tx, NewEscrowEvent {
                deal_id,
                event_type: EscrowEventType::Created,
                amount: deal.amount,
                payment_method: deal.currency,
                tx_ref: funding.tx_ref.clone(),
            })?;
            Ok::<_, StorageError>(true)
        })?
        .then_some(())
        .ok_or(DealApiError::ConcurrentUpdate { deal_id })?;

        info!(target: LOG_TARGET, "Deal {} funded with {} {}", deal_id, deal.amount, deal.currency);
        self.get(deal_id)
    }

    /// The creator submits the post to verify. Moves the deal to `Verifying`
    /// and creates the full check ladder; the initial check is due
    /// immediately and dispatched by the next scheduler wake-up.
    pub fn submit_post(
        &self,
        deal_id: DealId,
        actor: ActorId,
        post_url: &str,
        now: NaiveDateTime,
    ) -> Result<Deal, DealApiError> {
        if !is_valid_post_url(post_url) {
            return Err(DealApiError::InvalidPostUrl {
                details: post_url.to_string(),
            });
        }

        let deal = self.get(deal_id)?;
        if deal.status != DealStatus::PendingVerification {
            return Err(DealApiError::InvalidState {
                deal_id,
                status: deal.status,
                operation: "submit_post",
            });
        }
        if deal.creator_id.as_ref() != Some(&actor) {
            return Err(DealApiError::NotTheCreator { deal_id });
        }

        let spec = self.get_proof_spec(deal_id)?;
        let ladder = build_schedule_ladder(deal_id, now, spec.duration_hours, deal.deadline);

        self.store.with_write_tx(|tx| {
            let updated = tx.deals_update_if_status(deal_id, DealStatus::PendingVerification, DealPatch {
                status: Some(DealStatus::Verifying),
                posted_at: Some(now),
                post_url: Some(post_url.to_string()),
                ..Default::default()
            })?;
            if !updated {
                return Ok(false);
            }
            for schedule in ladder {
                VerificationSchedule::insert(tx, schedule)?;
            }
            Ok::<_, StorageError>(true)
        })?
        .then_some(())
        .ok_or(DealApiError::ConcurrentUpdate { deal_id })?;

        info!(target: LOG_TARGET, "Deal {} moved to Verifying with post {}", deal_id, post_url);
        self.get(deal_id)
    }

    /// Withdraws a non-terminal deal. Cancellation alone does not refund;
    /// returning escrowed funds is an explicit settlement action.
    pub fn cancel(&self, deal_id: DealId, actor: ActorId, _now: NaiveDateTime) -> Result<Deal, DealApiError> {
        let deal = self.get(deal_id)?;
        if deal.is_terminal() {
            return Err(DealApiError::InvalidState {
                deal_id,
                status: deal.status,
                operation: "cancel",
            });
        }
        if deal.advertiser_id != actor && deal.creator_id.as_ref() != Some(&actor) {
            return Err(DealApiError::NotAParty { deal_id });
        }

        let expected = deal.status;
        self.store.with_write_tx(|tx| {
            let updated = tx.deals_update_if_status(deal_id, expected, DealPatch {
                status: Some(DealStatus::Cancelled),
                ..Default::default()
            })?;
            if updated {
                tx.verification_schedules_close_all_pending(deal_id, ScheduleStatus::Cancelled)?;
            }
            Ok::<_, StorageError>(updated)
        })?
        .then_some(())
        .ok_or(DealApiError::ConcurrentUpdate { deal_id })?;

        info!(target: LOG_TARGET, "Deal {} cancelled by {}", deal_id, actor);
        self.get(deal_id)
    }

    /// Revises the proof spec. Creator-only, and only while the deal is not
    /// terminal; each revision bumps the revision counter.
    pub fn update_proof_spec(
        &self,
        deal_id: DealId,
        actor: ActorId,
        patch: ProofSpecPatch,
        _now: NaiveDateTime,
    ) -> Result<ProofSpec, DealApiError> {
        let deal = self.get(deal_id)?;
        if deal.is_terminal() {
            return Err(DealApiError::InvalidState {
                deal_id,
                status: deal.status,
                operation: "update_proof_spec",
            });
        }
        if deal.creator_id.as_ref() != Some(&actor) {
            return Err(DealApiError::NotTheCreator { deal_id });
        }

        self.store.with_write_tx(|tx| tx.proof_specs_update(deal_id, patch))?;
        self.get_proof_spec(deal_id)
    }

    fn update_checked(&self, deal_id: DealId, expected: DealStatus, patch: DealPatch) -> Result<(), DealApiError> {
        let updated = self
            .store
            .with_write_tx(|tx| tx.deals_update_if_status(deal_id, expected, patch))?;
        if !updated {
            return Err(DealApiError::ConcurrentUpdate { deal_id });
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DealApiError {
    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),
    #[error("Deal {deal_id} not found")]
    NotFound { deal_id: DealId },
    #[error("Deal {deal_id} is {status}, which does not permit {operation}")]
    InvalidState {
        deal_id: DealId,
        status: DealStatus,
        operation: &'static str,
    },
    #[error("Cannot accept your own deal {deal_id}")]
    CannotAcceptOwnDeal { deal_id: DealId },
    #[error("Only the creator of deal {deal_id} may do this")]
    NotTheCreator { deal_id: DealId },
    #[error("Only a party to deal {deal_id} may do this")]
    NotAParty { deal_id: DealId },
    #[error("'{details}' is not a valid post URL")]
    InvalidPostUrl { details: String },
    #[error("Invalid argument: {details}")]
    InvalidArgument { details: String },
    #[error("Deal {deal_id} was modified concurrently, try again")]
    ConcurrentUpdate { deal_id: DealId },
}

impl DealApiError {
    pub fn is_caller_error(&self) -> bool {
        !matches!(self, DealApiError::StorageError(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_validates_post_url_syntax() {
        assert!(is_valid_post_url("https://x.com/user/status/1"));
        assert!(is_valid_post_url("http://instagram.com/p/abc"));
        assert!(!is_valid_post_url("not a url"));
        assert!(!is_valid_post_url("ftp://example.com/file"));
        assert!(!is_valid_post_url("https://"));
        assert!(!is_valid_post_url(""));
    }
}
