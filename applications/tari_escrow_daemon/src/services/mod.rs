// Copyright 2024 The Tari Project
// SPDX-License-Identifier: BSD-3-Clause

mod events;
mod scheduler_service;

pub use events::DealEvent;
pub use scheduler_service::SchedulerService;
