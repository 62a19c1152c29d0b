//   Copyright 2024 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::fmt::Display;

use async_trait::async_trait;
use tari_escrow_common_types::{ActorId, Amount, Currency};

/// An address the payment backend can transfer to. Opaque to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentDestination(String);

impl PaymentDestination {
    pub fn new<S: Into<String>>(destination: S) -> Self {
        Self(destination.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The payment rail executing transfers out of escrow. Treated as a black box:
/// once it accepts a transfer request the settlement is recorded as completed,
/// with the returned transaction reference kept for audit. Reconciliation of
/// the backend's own confirmation is delegated to the backend.
#[async_trait]
pub trait PaymentBackend {
    type Error: Display + Send + Sync;

    /// The connected payment destination for the actor, if any. A missing
    /// destination is not an error: settlement is parked and retried later.
    async fn destination_for(&self, actor: &ActorId, method: Currency) -> Result<Option<PaymentDestination>, Self::Error>;

    /// Transfer escrowed funds to the destination. Returns the backend's
    /// transaction reference.
    async fn transfer(
        &self,
        destination: &PaymentDestination,
        amount: Amount,
        method: Currency,
    ) -> Result<String, Self::Error>;
}
