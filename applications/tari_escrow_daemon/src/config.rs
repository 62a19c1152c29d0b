// Copyright 2024 The Tari Project
// SPDX-License-Identifier: BSD-3-Clause

use std::{net::SocketAddr, path::PathBuf, time::Duration};

use tokio::io::{self, AsyncWriteExt};

use crate::{
    constants::{DEFAULT_DATABASE_FILE, DEFAULT_LISTEN_ADDRESS},
    Cli,
};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Config {
    /// The address the webserver (webhook callback, polling and settlement
    /// endpoints) listens on
    pub listen_address: SocketAddr,

    /// The base directory of the daemon with configuration and data files
    pub base_dir: PathBuf,

    /// The SQLite database file, relative to the base directory unless
    /// absolute
    pub database_file: PathBuf,

    /// The externally reachable base URL of this daemon, used to build the
    /// analysis callback URL
    pub public_base_url: String,

    /// The bearer token the analysis service must present on the callback and
    /// polling endpoints
    pub webhook_auth_token: String,

    /// The secret header value required on the internal settlement endpoints
    pub internal_api_token: String,

    /// The external analysis service
    pub analysis: AnalysisConfig,

    /// The payment gateway executing transfers out of escrow
    pub payment_gateway: PaymentGatewayConfig,

    /// The reviewer notification channel
    pub notifications: NotificationConfig,

    /// The verification scheduler
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AnalysisConfig {
    pub endpoint: String,
    pub auth_token: String,
    /// Analysis is slow; this bounds the submission round-trip, not the
    /// analysis itself (which completes via the callback)
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PaymentGatewayConfig {
    pub endpoint: String,
    pub auth_token: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct NotificationConfig {
    pub enabled: bool,
    pub webhook_url: String,
    pub auth_token: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SchedulerConfig {
    #[serde(with = "humantime_serde")]
    pub tick_interval: Duration,
    /// Must exceed the tick interval so the final check before a deadline is
    /// never missed
    #[serde(with = "humantime_serde")]
    pub lookahead: Duration,
    pub dispatch_batch_size: u64,
    pub completion_batch_size: u64,
    pub settlement_retry_batch_size: u64,
}

impl Config {
    pub(crate) async fn write<W: io::AsyncWrite + Unpin>(&self, mut writer: W) -> anyhow::Result<()> {
        let toml = toml::to_string_pretty(self)?;
        writer.write_all(toml.as_bytes()).await?;
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        if self.database_file.is_absolute() {
            self.database_file.clone()
        } else {
            self.base_dir.join(&self.database_file)
        }
    }

    pub fn callback_url(&self) -> String {
        format!("{}/webhooks/verification", self.public_base_url.trim_end_matches('/'))
    }

    pub fn missing_conf(&self) -> Option<Vec<&str>> {
        let mut v: Vec<&str> = Vec::new();
        if self.public_base_url.is_empty() {
            v.push("public_base_url");
        }
        if self.webhook_auth_token.is_empty() {
            v.push("webhook_auth_token");
        }
        if self.internal_api_token.is_empty() {
            v.push("internal_api_token");
        }
        if self.analysis.endpoint.is_empty() {
            v.push("analysis.endpoint");
        }
        if self.payment_gateway.endpoint.is_empty() {
            v.push("payment_gateway.endpoint");
        }
        if self.notifications.enabled && self.notifications.webhook_url.is_empty() {
            v.push("notifications.webhook_url");
        }
        if self.scheduler.lookahead < self.scheduler.tick_interval {
            v.push("scheduler.lookahead (must be at least the tick interval)");
        }
        if v.is_empty() {
            None
        } else {
            Some(v)
        }
    }
}

pub fn get_base_config(cli: &Cli) -> anyhow::Result<Config> {
    let base_dir = cli.common.base_dir.clone();

    Ok(Config {
        listen_address: DEFAULT_LISTEN_ADDRESS.parse()?,
        base_dir,
        database_file: DEFAULT_DATABASE_FILE.into(),
        public_base_url: String::new(),
        webhook_auth_token: String::new(),
        internal_api_token: String::new(),
        analysis: AnalysisConfig {
            endpoint: String::new(),
            auth_token: String::new(),
            request_timeout: Duration::from_secs(5 * 60),
        },
        payment_gateway: PaymentGatewayConfig {
            endpoint: String::new(),
            auth_token: String::new(),
        },
        notifications: NotificationConfig {
            enabled: true,
            webhook_url: String::new(),
            auth_token: String::new(),
        },
        scheduler: SchedulerConfig {
            tick_interval: Duration::from_secs(2 * 60),
            lookahead: Duration::from_secs(5 * 60),
            dispatch_batch_size: 50,
            completion_batch_size: 20,
            settlement_retry_batch_size: 20,
        },
    })
}
