// Copyright 2024 The Tari Project
// SPDX-License-Identifier: BSD-3-Clause

use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use tari_escrow_engine::{
    lifecycle::DealLifecycle,
    verification::VerificationDispatcher,
    DealApi,
    SchedulerConfig,
    VerificationScheduler,
};
use tari_escrow_storage_sqlite::SqliteDealStore;
use tokio::fs;

use crate::{
    cli::{Cli, Commands},
    clients::{HttpAnalysisClient, HttpPaymentGateway, WebhookReviewNotifier},
    config::{get_base_config, Config},
    logger::init_logger,
    notify::Notify,
    services::SchedulerService,
    shutdown::{exit_signal, Shutdown},
    webserver::{run_webserver, HandlerContext},
};

mod cli;
mod clients;
mod config;
mod constants;
mod logger;
mod notify;
mod services;
mod shutdown;
mod webserver;

pub(crate) type Lifecycle = DealLifecycle<SqliteDealStore, HttpPaymentGateway, WebhookReviewNotifier>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::init();
    let config_path = cli.get_config_path();

    init_logger()?;

    match cli.command {
        Commands::Init(ref args) => {
            let parent = config_path.parent().unwrap();
            fs::create_dir_all(parent).await?;

            let mut config = get_base_config(&cli)?;
            args.apply(&mut config);

            let file = fs::File::create(&config_path)
                .await
                .with_context(|| anyhow!("Failed to open config path {}", config_path.display()))?;
            config.write(file).await.context("Writing config failed")?;

            let config_path = config_path
                .canonicalize()
                .context("Failed to canonicalize config path")?;

            log::info!("Config file created at {}", config_path.display());
        },
        Commands::Start(ref args) => {
            let content = fs::read_to_string(&config_path)
                .await
                .with_context(|| anyhow!("Failed to read config path {}", config_path.display()))?;
            let mut cfg: Config = toml::from_str(&content)?;
            if let Some(conf) = cfg.missing_conf() {
                bail!("Missing configuration values: {:?}", conf);
            }

            args.apply(&mut cfg);
            start(cfg).await?;
        },
    }

    Ok(())
}

async fn start(config: Config) -> anyhow::Result<()> {
    let store = SqliteDealStore::try_open(config.database_path())?;
    store.run_migrations()?;

    let analysis_client = HttpAnalysisClient::new(config.analysis.clone());
    let payment_gateway = HttpPaymentGateway::new(config.payment_gateway.clone());
    let notifier = WebhookReviewNotifier::new(config.notifications.clone());

    let lifecycle = Arc::new(DealLifecycle::new(store.clone(), payment_gateway, notifier));
    let deals = DealApi::new(store.clone());
    let notify = Notify::new(100);

    let scheduler = VerificationScheduler::new(
        SchedulerConfig {
            lookahead: chrono::Duration::from_std(config.scheduler.lookahead)?,
            dispatch_batch_size: config.scheduler.dispatch_batch_size,
            completion_batch_size: config.scheduler.completion_batch_size,
        },
        store.clone(),
        VerificationDispatcher::new(store.clone(), analysis_client.clone(), config.callback_url()),
        Arc::clone(&lifecycle),
    );

    let shutdown = Shutdown::new();
    let scheduler_service = SchedulerService::new(
        notify.clone(),
        scheduler,
        Arc::clone(&lifecycle),
        config.scheduler.tick_interval,
        config.scheduler.settlement_retry_batch_size,
        shutdown.to_signal(),
    );
    let scheduler_handle = tokio::spawn(scheduler_service.run());

    let context = HandlerContext::new(
        config.clone(),
        deals,
        lifecycle,
        VerificationDispatcher::new(store.clone(), analysis_client, config.callback_url()),
        notify,
    );
    let webserver_handle = tokio::spawn(run_webserver(context, shutdown.to_signal()));

    let signal = exit_signal()?;
    tokio::select! {
        _ = signal => {
            log::info!("Shutting down");
            shutdown.trigger();
        },
        result = scheduler_handle => {
            result??;
            log::info!("Scheduler service exited");
        },
        result = webserver_handle => {
            result??;
            log::info!("Webserver exited");
        },
    }

    Ok(())
}
