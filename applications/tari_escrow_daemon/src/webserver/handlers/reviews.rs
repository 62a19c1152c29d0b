// Copyright 2024 The Tari Project
// SPDX-License-Identifier: BSD-3-Clause

use std::sync::Arc;

use axum::{extract::Path, http::HeaderMap, Extension, Json};
use chrono::Utc;
use serde::Deserialize;
use tari_escrow_common_types::ActorId;
use tari_escrow_storage::models::{Review, ReviewDecision, ReviewId};

use crate::webserver::{
    handlers::helpers::{actor_from_headers, check_internal_key, has_internal_key, ApiError},
    HandlerContext,
};

pub async fn list_open(
    Extension(context): Extension<Arc<HandlerContext>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Review>>, ApiError> {
    check_internal_key(&headers, &context.config().internal_api_token)?;

    let reviews = context
        .lifecycle()
        .reviews()
        .fetch_open(100)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(reviews))
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub reviewer: ActorId,
}

pub async fn assign(
    Extension(context): Extension<Arc<HandlerContext>>,
    headers: HeaderMap,
    Path(review_id): Path<ReviewId>,
    Json(request): Json<AssignRequest>,
) -> Result<Json<Review>, ApiError> {
    check_internal_key(&headers, &context.config().internal_api_token)?;

    context
        .lifecycle()
        .reviews()
        .assign(review_id, request.reviewer)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let review = context
        .lifecycle()
        .reviews()
        .get(review_id)
        .map_err(|e| ApiError::NotFound(e.to_string()))?;
    Ok(Json(review))
}

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub decision: ReviewDecision,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Applies a reviewer's decision. The assigned reviewer presents their actor
/// id; operators with the internal key act as the elevated role.
pub async fn decide(
    Extension(context): Extension<Arc<HandlerContext>>,
    headers: HeaderMap,
    Path(review_id): Path<ReviewId>,
    Json(request): Json<DecisionRequest>,
) -> Result<Json<Review>, ApiError> {
    let elevated = has_internal_key(&headers, &context.config().internal_api_token);
    let reviewer = if elevated {
        actor_from_headers(&headers).unwrap_or_else(|_| ActorId::from("operator"))
    } else {
        actor_from_headers(&headers)?
    };

    let review = context
        .lifecycle()
        .process_review_decision(
            review_id,
            reviewer,
            elevated,
            request.decision,
            request.notes,
            Utc::now().naive_utc(),
        )
        .await?;
    Ok(Json(review))
}
