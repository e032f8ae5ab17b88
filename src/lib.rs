pub mod api; // HTTP surface: router, endpoints, error mapping, server lifecycle
pub mod config;
pub mod pipeline; // Image analysis pipeline + vision inference clients

use std::sync::Arc;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::api::{start_server, ApiContext, ServerError};
use crate::config::{AppConfig, ConfigError};
use crate::pipeline::analysis::AnalysisService;
use crate::pipeline::inference::{GeminiClient, InferenceError};

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Inference client error: {0}")]
    Inference(#[from] InferenceError),

    #[error("Server error: {0}")]
    Server(#[from] ServerError),

    #[error("Failed to listen for shutdown signal: {0}")]
    Signal(std::io::Error),
}

/// Initialise logging, build the service from the environment, and serve
/// until Ctrl-C.
pub async fn run() -> Result<(), StartupError> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = AppConfig::from_env()?;
    tracing::info!(
        bind_addr = %config.bind_addr,
        model = %config.gemini.model,
        max_upload_bytes = config.max_upload_bytes,
        "Configuration loaded"
    );

    // Provider client and service are built once and shared read-only.
    let client = GeminiClient::new(&config.gemini)?;
    let service = Arc::new(AnalysisService::new(Arc::new(client)));
    let ctx = ApiContext::new(service, config.max_upload_bytes);

    let mut server = start_server(ctx, config.bind_addr).await?;
    tracing::info!(addr = %server.session.server_addr, "Ready for uploads");

    tokio::signal::ctrl_c().await.map_err(StartupError::Signal)?;
    server.shutdown();
    server.stopped().await;

    Ok(())
}
