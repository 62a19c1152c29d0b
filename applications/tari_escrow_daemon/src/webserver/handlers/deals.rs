// Copyright 2024 The Tari Project
// SPDX-License-Identifier: BSD-3-Clause

use std::sync::Arc;

use axum::{extract::Path, http::HeaderMap, Extension, Json};
use chrono::{NaiveDateTime, Utc};
use serde::Deserialize;
use tari_escrow_common_types::{Amount, Currency, DealId, DurationHours};
use tari_escrow_engine::{FundingConfirmation, NewDealRequest};
use tari_escrow_storage::models::{Deal, ProofSpec, ProofSpecPatch};

use crate::{
    services::DealEvent,
    webserver::{
        handlers::helpers::{actor_from_headers, ApiError},
        HandlerContext,
    },
};

#[derive(Debug, Deserialize)]
pub struct CreateDealRequest {
    pub platform: String,
    pub amount: u64,
    pub currency: Currency,
    pub deadline: NaiveDateTime,
    #[serde(default)]
    pub public_opt_in: bool,
    #[serde(default)]
    pub text_proof: String,
    pub duration_hours: u32,
    #[serde(default)]
    pub visual_markers: Vec<String>,
    #[serde(default)]
    pub video_markers: Vec<String>,
    #[serde(default)]
    pub link_markers: Vec<String>,
}

pub async fn create(
    Extension(context): Extension<Arc<HandlerContext>>,
    headers: HeaderMap,
    Json(request): Json<CreateDealRequest>,
) -> Result<Json<Deal>, ApiError> {
    let advertiser = actor_from_headers(&headers)?;
    let duration_hours = DurationHours::new(request.duration_hours).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let deal = context.deals().create(
        NewDealRequest {
            advertiser_id: advertiser,
            platform: request.platform,
            amount: Amount(request.amount),
            currency: request.currency,
            deadline: request.deadline,
            public_opt_in: request.public_opt_in,
            text_proof: request.text_proof,
            duration_hours,
            visual_markers: request.visual_markers,
            video_markers: request.video_markers,
            link_markers: request.link_markers,
        },
        Utc::now().naive_utc(),
    )?;

    context.notify().notify(DealEvent::DealCreated { deal_id: deal.id });
    Ok(Json(deal))
}

pub async fn get(
    Extension(context): Extension<Arc<HandlerContext>>,
    Path(deal_id): Path<DealId>,
) -> Result<Json<Deal>, ApiError> {
    let deal = context.deals().get(deal_id)?;
    Ok(Json(deal))
}

pub async fn accept(
    Extension(context): Extension<Arc<HandlerContext>>,
    headers: HeaderMap,
    Path(deal_id): Path<DealId>,
) -> Result<Json<Deal>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let deal = context.deals().accept(deal_id, actor, Utc::now().naive_utc())?;
    Ok(Json(deal))
}

#[derive(Debug, Deserialize, Default)]
pub struct FundRequest {
    #[serde(default)]
    pub tx_ref: Option<String>,
}

pub async fn fund(
    Extension(context): Extension<Arc<HandlerContext>>,
    Path(deal_id): Path<DealId>,
    Json(request): Json<FundRequest>,
) -> Result<Json<Deal>, ApiError> {
    let deal = context.deals().mark_funded(
        deal_id,
        FundingConfirmation {
            tx_ref: request.tx_ref,
        },
        Utc::now().naive_utc(),
    )?;
    context.notify().notify(DealEvent::DealFunded { deal_id });
    Ok(Json(deal))
}

#[derive(Debug, Deserialize)]
pub struct SubmitPostRequest {
    pub post_url: String,
}

pub async fn submit_post(
    Extension(context): Extension<Arc<HandlerContext>>,
    headers: HeaderMap,
    Path(deal_id): Path<DealId>,
    Json(request): Json<SubmitPostRequest>,
) -> Result<Json<Deal>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let deal = context
        .deals()
        .submit_post(deal_id, actor, &request.post_url, Utc::now().naive_utc())?;
    // Wake the scheduler so the initial check dispatches immediately
    context.notify().notify(DealEvent::PostSubmitted { deal_id });
    Ok(Json(deal))
}

pub async fn cancel(
    Extension(context): Extension<Arc<HandlerContext>>,
    headers: HeaderMap,
    Path(deal_id): Path<DealId>,
) -> Result<Json<Deal>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let deal = context.deals().cancel(deal_id, actor, Utc::now().naive_utc())?;
    Ok(Json(deal))
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateProofSpecRequest {
    #[serde(default)]
    pub text_proof: Option<String>,
    #[serde(default)]
    pub duration_hours: Option<u32>,
    #[serde(default)]
    pub visual_markers: Option<Vec<String>>,
    #[serde(default)]
    pub video_markers: Option<Vec<String>>,
    #[serde(default)]
    pub link_markers: Option<Vec<String>>,
}

pub async fn update_proof_spec(
    Extension(context): Extension<Arc<HandlerContext>>,
    headers: HeaderMap,
    Path(deal_id): Path<DealId>,
    Json(request): Json<UpdateProofSpecRequest>,
) -> Result<Json<ProofSpec>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let duration_hours = request
        .duration_hours
        .map(DurationHours::new)
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let spec = context.deals().update_proof_spec(
        deal_id,
        actor,
        ProofSpecPatch {
            text_proof: request.text_proof,
            duration_hours,
            visual_markers: request.visual_markers,
            video_markers: request.video_markers,
            link_markers: request.link_markers,
        },
        Utc::now().naive_utc(),
    )?;
    Ok(Json(spec))
}
