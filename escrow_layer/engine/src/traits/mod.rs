//   Copyright 2024 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

mod analysis_client;
mod payment_backend;
mod review_notifier;

pub use analysis_client::AnalysisClient;
pub use payment_backend::{PaymentBackend, PaymentDestination};
pub use review_notifier::ReviewNotifier;
