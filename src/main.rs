use std::{sync::Arc, time::Duration};

use anyhow::{Error, Result, anyhow};
use notification_engine::{
    api::run_api_server,
    clients::{database::DatabaseClient, health::HealthChecker, registry::ProviderRegistry},
    config::Config,
    jobs::{SchedulerSettings, run_scheduler},
    service::NotificationService,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let _ = rustls::crypto::ring::default_provider().install_default();

    let config = Config::load()?;
    init_tracing(config.log_json);

    let database = DatabaseClient::connect(&config.database_url).await?;
    if config.run_migrations {
        database.migrate().await?;
    }

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_seconds))
        .build()
        .map_err(|_| anyhow!("Failed to create HTTP client"))?;

    let registry = Arc::new(ProviderRegistry::from_config(&config, http_client));
    let store = Arc::new(database.clone());

    let service = NotificationService::new(registry.clone(), store.clone(), store.clone(), store)
        .with_retry_config(config.retry_config())
        .with_bulk_concurrency(config.bulk_concurrency);

    let health_checker = HealthChecker::new(database, registry.clone());
    let server_port = config.server_port;
    tokio::spawn(async move {
        if let Err(e) = run_api_server(server_port, health_checker).await {
            error!(error = %e, "Health check server stopped");
        }
    });

    info!("Notification engine started");

    run_scheduler(service, SchedulerSettings::from(&config), shutdown_signal()).await;

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
