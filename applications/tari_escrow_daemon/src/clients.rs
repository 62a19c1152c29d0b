// Copyright 2024 The Tari Project
// SPDX-License-Identifier: BSD-3-Clause

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tari_escrow_common_types::{ActorId, Amount, Currency};
use tari_escrow_engine::{
    traits::{AnalysisClient, PaymentBackend, PaymentDestination, ReviewNotifier},
    verification::AnalysisRequest,
};
use tari_escrow_storage::models::Review;

use crate::config::{AnalysisConfig, NotificationConfig, PaymentGatewayConfig};

#[derive(Debug, thiserror::Error)]
pub enum HttpClientError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Unexpected response {status}: {body}")]
    UnexpectedResponse { status: StatusCode, body: String },
}

async fn unexpected_response(resp: reqwest::Response) -> HttpClientError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    HttpClientError::UnexpectedResponse { status, body }
}

/// Submits verification requests to the external analysis service. The
/// verdict arrives later on the callback endpoint; the generous timeout only
/// bounds the submission round-trip.
#[derive(Debug, Clone)]
pub struct HttpAnalysisClient {
    config: AnalysisConfig,
    client: reqwest::Client,
}

impl HttpAnalysisClient {
    pub fn new(config: AnalysisConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("Failed to build HTTP client");
        Self { config, client }
    }
}

#[async_trait]
impl AnalysisClient for HttpAnalysisClient {
    type Error = HttpClientError;

    async fn submit_analysis(&self, request: &AnalysisRequest) -> Result<(), Self::Error> {
        let resp = self
            .client
            .post(&self.config.endpoint)
            .header("Authorization", format!("Bearer {}", self.config.auth_token))
            .json(request)
            .send()
            .await?;

        if resp.status() != StatusCode::OK && resp.status() != StatusCode::ACCEPTED {
            return Err(unexpected_response(resp).await);
        }
        Ok(())
    }
}

/// The payment gateway fronting the actual rails. Transfers are
/// fire-and-forget-confirmed: an accepted request is recorded as settled with
/// the returned transaction reference.
#[derive(Debug, Clone)]
pub struct HttpPaymentGateway {
    config: PaymentGatewayConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct DestinationResponse {
    destination: String,
}

#[derive(Debug, Deserialize)]
struct TransferResponse {
    tx_ref: String,
}

impl HttpPaymentGateway {
    pub fn new(config: PaymentGatewayConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl PaymentBackend for HttpPaymentGateway {
    type Error = HttpClientError;

    async fn destination_for(
        &self,
        actor: &ActorId,
        method: Currency,
    ) -> Result<Option<PaymentDestination>, Self::Error> {
        let url = format!("{}/destinations/{}", self.config.endpoint.trim_end_matches('/'), actor);
        let resp = self
            .client
            .get(url)
            .query(&[("method", method.to_string())])
            .header("Authorization", format!("Bearer {}", self.config.auth_token))
            .send()
            .await?;

        match resp.status() {
            StatusCode::OK => {
                let body = resp.json::<DestinationResponse>().await?;
                Ok(Some(PaymentDestination::new(body.destination)))
            },
            StatusCode::NOT_FOUND => Ok(None),
            _ => Err(unexpected_response(resp).await),
        }
    }

    async fn transfer(
        &self,
        destination: &PaymentDestination,
        amount: Amount,
        method: Currency,
    ) -> Result<String, Self::Error> {
        let url = format!("{}/transfers", self.config.endpoint.trim_end_matches('/'));
        let resp = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.config.auth_token))
            .json(&json!({
                "destination": destination.as_str(),
                "amount": amount.as_u64(),
                "method": method.to_string(),
            }))
            .send()
            .await?;

        if resp.status() != StatusCode::OK && resp.status() != StatusCode::CREATED {
            return Err(unexpected_response(resp).await);
        }
        let body = resp.json::<TransferResponse>().await?;
        Ok(body.tx_ref)
    }
}

/// Posts review notifications to the reviewer channel webhook. A disabled
/// channel accepts everything silently.
#[derive(Debug, Clone)]
pub struct WebhookReviewNotifier {
    config: NotificationConfig,
    client: reqwest::Client,
}

impl WebhookReviewNotifier {
    pub fn new(config: NotificationConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ReviewNotifier for WebhookReviewNotifier {
    type Error = HttpClientError;

    async fn notify_review(&self, review: &Review) -> Result<(), Self::Error> {
        if !self.config.enabled {
            return Ok(());
        }

        let message = format!(
            "[{}] Review #{} for deal {}: {}",
            review.priority, review.id, review.deal_id, review.reason_code
        );
        let resp = self
            .client
            .post(&self.config.webhook_url)
            .header("Authorization", format!("Bearer {}", self.config.auth_token))
            .json(&json!({
                "message": message,
                "review_id": review.id,
                "deal_id": review.deal_id.to_string(),
                "priority": review.priority.to_string(),
            }))
            .send()
            .await?;

        if resp.status() != StatusCode::OK && resp.status() != StatusCode::CREATED {
            return Err(unexpected_response(resp).await);
        }
        Ok(())
    }
}
