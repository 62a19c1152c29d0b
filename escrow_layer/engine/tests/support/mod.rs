//   Copyright 2024 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
        Mutex,
    },
};

use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime, Utc};
use tari_escrow_common_types::{ActorId, Amount, Currency, DealId, DurationHours, RequestId};
use tari_escrow_engine::{
    lifecycle::DealLifecycle,
    traits::{AnalysisClient, PaymentBackend, PaymentDestination, ReviewNotifier},
    verification::{AnalysisRequest, VerificationResult},
    DealApi,
    FundingConfirmation,
    NewDealRequest,
};
use tari_escrow_storage::models::Review;
use tari_escrow_storage_sqlite::SqliteDealStore;

pub type Lifecycle = DealLifecycle<SqliteDealStore, MockPaymentBackend, MockNotifier>;

pub struct Harness {
    pub store: SqliteDealStore,
    pub deals: DealApi<SqliteDealStore>,
    pub lifecycle: Arc<Lifecycle>,
    pub backend: MockPaymentBackend,
    pub notifier: MockNotifier,
    _temp_dir: tempfile::TempDir,
}

impl Harness {
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = SqliteDealStore::try_open(temp_dir.path().join("escrow.sqlite")).unwrap();
        store.run_migrations().unwrap();

        let backend = MockPaymentBackend::new();
        let notifier = MockNotifier::new();
        let lifecycle = Arc::new(DealLifecycle::new(store.clone(), backend.clone(), notifier.clone()));

        Self {
            deals: DealApi::new(store.clone()),
            store,
            lifecycle,
            backend,
            notifier,
            _temp_dir: temp_dir,
        }
    }

    pub fn advertiser() -> ActorId {
        "advertiser-1".into()
    }

    pub fn creator() -> ActorId {
        "creator-1".into()
    }

    /// Creates, accepts, funds and posts a deal with a 24h observation
    /// window. Returns the deal id and the posting time.
    pub fn deal_in_verifying(&self) -> (DealId, NaiveDateTime) {
        let now = Utc::now().naive_utc();
        let deal = self
            .deals
            .create(
                NewDealRequest {
                    advertiser_id: Self::advertiser(),
                    platform: "twitter".to_string(),
                    amount: Amount(50),
                    currency: Currency::Usdc,
                    deadline: now + Duration::hours(26),
                    public_opt_in: false,
                    text_proof: "Post must mention the brand".to_string(),
                    duration_hours: DurationHours::new(24).unwrap(),
                    visual_markers: vec![],
                    video_markers: vec![],
                    link_markers: vec![],
                },
                now,
            )
            .unwrap();
        self.deals.accept(deal.id, Self::creator(), now).unwrap();
        self.deals
            .mark_funded(deal.id, FundingConfirmation {
                tx_ref: Some("funding-tx".to_string()),
            }, now)
            .unwrap();
        self.deals
            .submit_post(deal.id, Self::creator(), "https://x.com/creator/status/1", now)
            .unwrap();
        (deal.id, now)
    }
}

pub fn verification_result(
    deal_id: DealId,
    score: u8,
    confidence: u8,
    requirements_failed: Vec<&str>,
) -> VerificationResult {
    VerificationResult {
        deal_id: Some(deal_id),
        request_id: None,
        outcome: tari_escrow_engine::verification::VerificationOutcome::Completed,
        overall_score: score,
        confidence,
        requirements_met: vec![],
        requirements_failed: requirements_failed.into_iter().map(|s| s.to_string()).collect(),
        raw: serde_json::json!({ "deal_id": deal_id.to_string(), "overall_score": score }),
    }
}

pub fn error_result(deal_id: DealId, request_id: Option<RequestId>) -> VerificationResult {
    VerificationResult {
        request_id,
        ..VerificationResult::error(Some(deal_id), serde_json::json!({ "status": "error" }))
    }
}

// -------------------------------- Mock collaborators -------------------------------- //

#[derive(Debug, Clone)]
pub struct MockAnalysisClient {
    pub requests: Arc<Mutex<Vec<AnalysisRequest>>>,
    pub fail: Arc<Mutex<bool>>,
}

impl MockAnalysisClient {
    pub fn new() -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            fail: Arc::new(Mutex::new(false)),
        }
    }

    pub fn submitted(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }
}

#[async_trait]
impl AnalysisClient for MockAnalysisClient {
    type Error = MockError;

    async fn submit_analysis(&self, request: &AnalysisRequest) -> Result<(), Self::Error> {
        if *self.fail.lock().unwrap() {
            return Err(MockError("analysis service unavailable".to_string()));
        }
        self.requests.lock().unwrap().push(request.clone());
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct MockPaymentBackend {
    destinations: Arc<Mutex<HashMap<String, PaymentDestination>>>,
    transfers: Arc<AtomicU64>,
    fail: Arc<Mutex<bool>>,
}

impl MockPaymentBackend {
    pub fn new() -> Self {
        let backend = Self {
            destinations: Arc::new(Mutex::new(HashMap::new())),
            transfers: Arc::new(AtomicU64::new(0)),
            fail: Arc::new(Mutex::new(false)),
        };
        backend.connect("advertiser-1", "adv-wallet");
        backend.connect("creator-1", "creator-wallet");
        backend
    }

    pub fn connect(&self, actor: &str, destination: &str) {
        self.destinations
            .lock()
            .unwrap()
            .insert(actor.to_string(), PaymentDestination::new(destination));
    }

    pub fn disconnect(&self, actor: &str) {
        self.destinations.lock().unwrap().remove(actor);
    }

    pub fn transfer_count(&self) -> u64 {
        self.transfers.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }
}

#[async_trait]
impl PaymentBackend for MockPaymentBackend {
    type Error = MockError;

    async fn destination_for(
        &self,
        actor: &ActorId,
        _method: Currency,
    ) -> Result<Option<PaymentDestination>, Self::Error> {
        Ok(self.destinations.lock().unwrap().get(actor.as_str()).cloned())
    }

    async fn transfer(
        &self,
        _destination: &PaymentDestination,
        _amount: Amount,
        _method: Currency,
    ) -> Result<String, Self::Error> {
        if *self.fail.lock().unwrap() {
            return Err(MockError("backend rejected the transfer".to_string()));
        }
        let n = self.transfers.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("backend-tx-{}", n))
    }
}

#[derive(Debug, Clone)]
pub struct MockNotifier {
    pub attempts: Arc<AtomicU64>,
    pub failures_before_success: Arc<AtomicU64>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self {
            attempts: Arc::new(AtomicU64::new(0)),
            failures_before_success: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn fail_first(&self, failures: u64) {
        self.failures_before_success.store(failures, Ordering::SeqCst);
    }

    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReviewNotifier for MockNotifier {
    type Error = MockError;

    async fn notify_review(&self, _review: &Review) -> Result<(), Self::Error> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.failures_before_success.load(Ordering::SeqCst) {
            return Err(MockError("channel unavailable".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct MockError(pub String);
