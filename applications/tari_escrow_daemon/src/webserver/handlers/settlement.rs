// Copyright 2024 The Tari Project
// SPDX-License-Identifier: BSD-3-Clause

use std::sync::Arc;

use axum::{http::HeaderMap, Extension, Json};
use log::*;
use serde::Deserialize;
use tari_escrow_common_types::DealId;
use tari_escrow_storage::models::{Payout, Refund};

use crate::webserver::{
    handlers::helpers::{check_internal_key, ApiError},
    HandlerContext,
};

const LOG_TARGET: &str = "tari::escrow::daemon::webserver::settlement";

#[derive(Debug, Deserialize)]
pub struct ReleaseRequest {
    pub deal_id: DealId,
}

/// Manually (re-)triggers the payout for a completed deal. Idempotent: if a
/// settlement already exists the existing record is returned.
pub async fn release(
    Extension(context): Extension<Arc<HandlerContext>>,
    headers: HeaderMap,
    Json(request): Json<ReleaseRequest>,
) -> Result<Json<Payout>, ApiError> {
    check_internal_key(&headers, &context.config().internal_api_token)?;

    info!(target: LOG_TARGET, "Manual payout trigger for deal {}", request.deal_id);
    let payout = context.lifecycle().settlement().release_escrow(request.deal_id).await?;
    Ok(Json(payout))
}

#[derive(Debug, Deserialize)]
pub struct RefundRequest {
    pub deal_id: DealId,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Manually (re-)triggers the refund for a failed or cancelled deal.
/// Idempotent in the same way as [release].
pub async fn refund(
    Extension(context): Extension<Arc<HandlerContext>>,
    headers: HeaderMap,
    Json(request): Json<RefundRequest>,
) -> Result<Json<Refund>, ApiError> {
    check_internal_key(&headers, &context.config().internal_api_token)?;

    info!(target: LOG_TARGET, "Manual refund trigger for deal {}", request.deal_id);
    let refund = context
        .lifecycle()
        .settlement()
        .refund_escrow(request.deal_id, request.reason)
        .await?;
    Ok(Json(refund))
}
