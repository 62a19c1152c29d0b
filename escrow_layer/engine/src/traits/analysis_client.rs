//   Copyright 2024 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::fmt::Display;

use async_trait::async_trait;

use crate::verification::AnalysisRequest;

/// The external content-analysis service. Submission is asynchronous: the
/// service acknowledges the request and delivers its verdict later via the
/// callback URL (or is polled). Implementations own the transport timeout,
/// which is on the order of minutes because analysis is slow.
#[async_trait]
pub trait AnalysisClient {
    type Error: Display + Send + Sync;

    async fn submit_analysis(&self, request: &AnalysisRequest) -> Result<(), Self::Error>;
}
