// Copyright 2024 The Tari Project
// SPDX-License-Identifier: BSD-3-Clause

use std::sync::Arc;

use tari_escrow_engine::{verification::VerificationDispatcher, DealApi};
use tari_escrow_storage_sqlite::SqliteDealStore;

use crate::{clients::HttpAnalysisClient, config::Config, notify::Notify, services::DealEvent, Lifecycle};

pub type Dispatcher = VerificationDispatcher<SqliteDealStore, HttpAnalysisClient>;

pub struct HandlerContext {
    config: Config,
    deals: DealApi<SqliteDealStore>,
    lifecycle: Arc<Lifecycle>,
    dispatcher: Dispatcher,
    notify: Notify<DealEvent>,
}

impl HandlerContext {
    pub fn new(
        config: Config,
        deals: DealApi<SqliteDealStore>,
        lifecycle: Arc<Lifecycle>,
        dispatcher: Dispatcher,
        notify: Notify<DealEvent>,
    ) -> Self {
        Self {
            config,
            deals,
            lifecycle,
            dispatcher,
            notify,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn deals(&self) -> &DealApi<SqliteDealStore> {
        &self.deals
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn notify(&self) -> &Notify<DealEvent> {
        &self.notify
    }
}
