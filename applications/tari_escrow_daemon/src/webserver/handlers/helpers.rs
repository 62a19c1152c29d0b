// Copyright 2024 The Tari Project
// SPDX-License-Identifier: BSD-3-Clause

use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use log::*;
use serde_json::json;
use tari_escrow_common_types::ActorId;
use tari_escrow_engine::{lifecycle::LifecycleError, DealApiError, SettlementError};

const LOG_TARGET: &str = "tari::escrow::daemon::webserver";

/// The header an authenticating gateway uses to convey the acting party. The
/// daemon does not manage identities itself.
pub const ACTOR_ID_HEADER: &str = "x-actor-id";
/// The secret header for internal (operator) endpoints.
pub const INTERNAL_API_KEY_HEADER: &str = "x-internal-api-key";

#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Internal(message) => {
                error!(target: LOG_TARGET, "Internal error: {}", message);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            },
        };
        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}

pub fn check_bearer(headers: &HeaderMap, expected: &str) -> Result<(), ApiError> {
    let presented = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    match presented {
        Some(token) if !expected.is_empty() && token == expected => Ok(()),
        _ => Err(ApiError::Unauthorized),
    }
}

pub fn check_internal_key(headers: &HeaderMap, expected: &str) -> Result<(), ApiError> {
    let presented = headers.get(INTERNAL_API_KEY_HEADER).and_then(|v| v.to_str().ok());
    match presented {
        Some(key) if !expected.is_empty() && key == expected => Ok(()),
        _ => Err(ApiError::Unauthorized),
    }
}

pub fn has_internal_key(headers: &HeaderMap, expected: &str) -> bool {
    check_internal_key(headers, expected).is_ok()
}

pub fn actor_from_headers(headers: &HeaderMap) -> Result<ActorId, ApiError> {
    headers
        .get(ACTOR_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(ActorId::from)
        .ok_or_else(|| ApiError::BadRequest(format!("missing {} header", ACTOR_ID_HEADER)))
}

impl From<DealApiError> for ApiError {
    fn from(e: DealApiError) -> Self {
        match e {
            DealApiError::NotFound { .. } => ApiError::NotFound(e.to_string()),
            e if e.is_caller_error() => ApiError::BadRequest(e.to_string()),
            e => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<LifecycleError> for ApiError {
    fn from(e: LifecycleError) -> Self {
        match e {
            LifecycleError::DealNotFound { .. } => ApiError::NotFound(e.to_string()),
            e if e.is_caller_error() => ApiError::BadRequest(e.to_string()),
            e => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<SettlementError> for ApiError {
    fn from(e: SettlementError) -> Self {
        match e {
            SettlementError::DealNotFound { .. } => ApiError::NotFound(e.to_string()),
            SettlementError::InvalidDealState { .. } |
            SettlementError::NotFunded { .. } |
            SettlementError::MissingCounterparty { .. } => ApiError::BadRequest(e.to_string()),
            e => ApiError::Internal(e.to_string()),
        }
    }
}
