// Copyright 2024 The Tari Project
// SPDX-License-Identifier: BSD-3-Clause

use std::sync::Arc;

use axum::{http::HeaderMap, Extension, Json};
use chrono::Utc;
use log::*;
use serde::Serialize;
use tari_escrow_engine::verification::{normalize, AnalysisRequest};

use crate::{
    services::DealEvent,
    webserver::{
        handlers::helpers::{check_bearer, ApiError},
        HandlerContext,
    },
};

const LOG_TARGET: &str = "tari::escrow::daemon::webserver::verification";

#[derive(Debug, Serialize)]
pub struct CallbackResponse {
    pub success: bool,
    pub deal_status: String,
    pub verification_score: Option<u8>,
}

/// The analysis service reports its verdict here. Credential failures are
/// rejected before any parsing; everything else is acknowledged with a 200 so
/// the sender stops retrying, including stale and duplicate deliveries.
pub async fn callback(
    Extension(context): Extension<Arc<HandlerContext>>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<CallbackResponse>, ApiError> {
    check_bearer(&headers, &context.config().webhook_auth_token)?;

    let raw = serde_json::from_str::<serde_json::Value>(&body).unwrap_or(serde_json::Value::Null);
    let result = normalize(raw);

    let ack = context
        .lifecycle()
        .process_verification_result(result, Utc::now().naive_utc())
        .await?;

    debug!(
        target: LOG_TARGET,
        "Verification callback for deal {} acknowledged (changed: {})", ack.deal_id, ack.changed
    );
    context.notify().notify(DealEvent::VerificationProcessed { deal_id: ack.deal_id });

    Ok(Json(CallbackResponse {
        success: true,
        deal_status: ack.deal_status.to_string(),
        verification_score: ack.verification_score,
    }))
}

/// The pull path for analysis services that poll instead of being pushed to:
/// returns (and claims) the batch of due verification requests.
pub async fn poll(
    Extension(context): Extension<Arc<HandlerContext>>,
    headers: HeaderMap,
) -> Result<Json<Vec<AnalysisRequest>>, ApiError> {
    check_bearer(&headers, &context.config().webhook_auth_token)?;

    let requests = context
        .dispatcher()
        .poll_pending(
            Utc::now().naive_utc(),
            context.config().scheduler.dispatch_batch_size,
        )
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(requests))
}
