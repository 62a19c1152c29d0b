//   Copyright 2024 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Extension,
    Router,
};
use log::*;
use tower_http::cors::CorsLayer;

use crate::{
    shutdown::ShutdownSignal,
    webserver::{
        handlers::{deals, health, reviews, settlement, verification},
        HandlerContext,
    },
};

const LOG_TARGET: &str = "tari::escrow::daemon::webserver";

pub async fn run_webserver(context: HandlerContext, mut shutdown_signal: ShutdownSignal) -> anyhow::Result<()> {
    let bind_address = context.config().listen_address;

    let router = Router::new()
        .route("/webhooks/verification", post(verification::callback))
        .route("/verifications/pending", get(verification::poll))
        .route("/deals", post(deals::create))
        .route("/deals/:deal_id", get(deals::get))
        .route("/deals/:deal_id/accept", post(deals::accept))
        .route("/deals/:deal_id/fund", post(deals::fund))
        .route("/deals/:deal_id/post", post(deals::submit_post))
        .route("/deals/:deal_id/cancel", post(deals::cancel))
        .route("/deals/:deal_id/proof-spec", put(deals::update_proof_spec))
        .route("/reviews", get(reviews::list_open))
        .route("/reviews/:review_id/assign", post(reviews::assign))
        .route("/reviews/:review_id/decision", post(reviews::decide))
        .route("/internal/settlement/release", post(settlement::release))
        .route("/internal/settlement/refund", post(settlement::refund))
        .route("/health", get(health::health))
        .layer(Extension(Arc::new(context)))
        .layer(CorsLayer::permissive());

    let server = axum::Server::try_bind(&bind_address)?;
    let server = server.serve(router.into_make_service());
    info!(target: LOG_TARGET, "Webserver listening on {}", server.local_addr());
    server
        .with_graceful_shutdown(async move { shutdown_signal.wait().await })
        .await?;

    Ok(())
}
