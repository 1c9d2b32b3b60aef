mod config;
mod consumer;
mod csv_parser;
mod events;
mod presign;
mod s3_store;

use anyhow::{Context, Result};
use config::Config;
use consumer::ImportConsumer;
use presign::AppState;
use s3_store::ImportStore;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    init_tracing(&config.service.log_level);

    info!(service = %config.service.name, "Starting import service");

    init_metrics(config.service.metrics_port)?;

    let store = Arc::new(
        ImportStore::new(&config.s3)
            .await
            .context("Failed to initialize import store")?,
    );

    let import_consumer = ImportConsumer::new(&config.queue, &config.s3, store.clone())
        .await
        .context("Failed to initialize import consumer")?;

    let api_state = AppState {
        store: store.clone(),
        uploaded_prefix: config.s3.uploaded_prefix.clone(),
        url_expiry: config.presigned_url_expiry(),
    };

    let consumer_handle = tokio::spawn(async move {
        if let Err(e) = import_consumer.run().await {
            error!(error = %e, "Import consumer error");
        }
    });

    let api_config = config.api.clone();
    let api_handle = tokio::spawn(async move {
        if let Err(e) = start_api_server(api_state, &api_config).await {
            error!(error = %e, "API server error");
        }
    });

    info!("Import service started successfully");

    shutdown_signal().await;

    info!("Shutting down import service");

    consumer_handle.abort();
    api_handle.abort();

    info!("Import service stopped");

    Ok(())
}

/// Start the presigned upload API server.
async fn start_api_server(state: AppState, config: &config::ApiConfig) -> Result<()> {
    let router = presign::create_router(state, config);
    let addr = format!("{}:{}", config.host, config.port);

    info!(address = %addr, "Starting presigned upload API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, router)
        .await
        .context("API server error")?;

    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().json())
        .init();
}

/// Initialize Prometheus metrics exporter
fn init_metrics(port: u16) -> Result<()> {
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new();

    builder
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus metrics exporter")?;

    info!(port = port, "Prometheus metrics exporter started");

    Ok(())
}

/// Wait for shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }
}
