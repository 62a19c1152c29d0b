// Copyright 2024 The Tari Project
// SPDX-License-Identifier: BSD-3-Clause

use std::path::PathBuf;

use clap::Parser;

use crate::{
    config::Config,
    constants::{DEFAULT_ESCROWD_BASE_PATH, DEFAULT_ESCROWD_CONFIG_PATH},
};

#[derive(Clone, Debug, Parser)]
pub struct Cli {
    #[clap(flatten)]
    pub common: CommonCli,
    #[clap(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn init() -> Self {
        Self::parse()
    }

    pub fn get_config_path(&self) -> PathBuf {
        self.common.config_path.clone()
    }
}

#[derive(Debug, Clone, clap::Args)]
pub struct CommonCli {
    #[clap(short = 'b', long, parse(from_os_str), default_value = DEFAULT_ESCROWD_BASE_PATH)]
    pub base_dir: PathBuf,
    #[clap(short = 'c', long, parse(from_os_str), default_value = DEFAULT_ESCROWD_CONFIG_PATH)]
    pub config_path: PathBuf,
}

#[derive(Clone, Debug, clap::Subcommand)]
pub enum Commands {
    Init(InitArgs),
    Start(Overrides),
}

#[derive(Clone, Debug, clap::Args)]
pub struct InitArgs {
    /// Disable delivery of review notifications to the reviewer channel
    #[clap(long)]
    pub no_notifications: bool,
}

impl InitArgs {
    pub fn apply(&self, config: &mut Config) {
        config.notifications.enabled = !self.no_notifications;
    }
}

#[derive(Clone, Debug, clap::Args)]
pub struct Overrides {
    /// The address the webserver listens on (optional)
    #[clap(long)]
    pub listen_address: Option<std::net::SocketAddr>,
}

impl Overrides {
    pub fn apply(&self, config: &mut Config) {
        if let Some(addr) = self.listen_address {
            log::info!("Overriding listen address to {}", addr);
            config.listen_address = addr;
        }
    }
}
