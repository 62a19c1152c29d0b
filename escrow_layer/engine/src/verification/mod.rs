//   Copyright 2024 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

mod dispatcher;
mod ladder;
mod normalize;
mod result;

pub use dispatcher::{
    AnalysisMetadata,
    AnalysisOptions,
    AnalysisProofSpec,
    AnalysisRequest,
    DispatchError,
    DispatchOutcome,
    VerificationDispatcher,
};
pub use ladder::build_schedule_ladder;
pub use normalize::normalize;
pub use result::{VerificationOutcome, VerificationResult};
