//! borderline-ai - Cross-border compliance analysis service
//!
//! Accepts product submissions, runs them through the inference pipeline and
//! serves the persisted results and administrator configurations over HTTP + SSE.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use borderline_ai::services::{
    AnalysisOrchestrator, ConfigResolver, HttpInferenceClient, ImageHandler, LocalObjectStore,
    OrchestratorSettings, SharedApiKey,
};
use borderline_ai::AppState;
use borderline_common::config::{self, TomlConfig};
use borderline_common::events::EventBus;

/// Command-line arguments for borderline-ai
#[derive(Parser, Debug)]
#[command(name = "borderline-ai")]
#[command(about = "Cross-border compliance analysis service")]
#[command(version)]
struct Args {
    /// Data folder holding the database and uploaded images
    #[arg(short, long, env = "BORDERLINE_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Socket address to listen on
    #[arg(short, long, env = "BORDERLINE_BIND")]
    bind: Option<SocketAddr>,

    /// TOML config file
    #[arg(short, long, env = "BORDERLINE_CONFIG")]
    config: Option<PathBuf>,

    /// Inference endpoint URL
    #[arg(long, env = "BORDERLINE_INFERENCE_URL")]
    inference_url: Option<String>,

    /// Model name sent with every inference request
    #[arg(long, env = "BORDERLINE_MODEL")]
    model: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_path = args.config.clone().unwrap_or_else(config::default_config_path);
    let toml_result = config::load_toml_config(&toml_path);
    let log_level = toml_result
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| TomlConfig::default().logging.level);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting borderline-ai (Compliance Analysis) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let toml_config = match toml_result {
        Ok(c) => c,
        Err(e) => {
            warn!("Ignoring config file {}: {}", toml_path.display(), e);
            TomlConfig::default()
        }
    };

    // Root folder: CLI/ENV → TOML → OS default
    let root_folder = config::resolve_root_folder(args.root_folder.as_deref(), &toml_config);
    std::fs::create_dir_all(&root_folder)
        .with_context(|| format!("Failed to create root folder {}", root_folder.display()))?;
    info!("Root folder: {}", root_folder.display());

    let db_path = root_folder.join("borderline.db");
    info!("Database: {}", db_path.display());
    let db_pool = borderline_ai::db::init_database_pool(&db_path)
        .await
        .context("Failed to open database")?;
    info!("Database connection established");

    let event_bus = EventBus::new(100);

    let bind = match args.bind {
        Some(addr) => addr,
        None => toml_config
            .server
            .bind
            .parse()
            .with_context(|| format!("Invalid [server] bind address: {}", toml_config.server.bind))?,
    };
    let mut server_config = toml_config.server.clone();
    server_config.bind = bind.to_string();
    let public_base_url = server_config.public_base_url();

    // Object store under {root}/storage, published at {public_base_url}/storage
    let storage_root = root_folder.join("storage");
    let object_store = Arc::new(LocalObjectStore::new(&storage_root, &public_base_url));
    let images = ImageHandler::new(object_store, toml_config.storage.bucket.clone());

    let api_key = SharedApiKey::new(
        borderline_ai::config::resolve_inference_api_key(&db_pool, &toml_config).await?,
    );
    let endpoint_url = args
        .inference_url
        .unwrap_or_else(|| toml_config.inference.endpoint_url.clone());
    info!("Inference endpoint: {}", endpoint_url);
    let inference = Arc::new(
        HttpInferenceClient::new(
            endpoint_url,
            api_key.clone(),
            Duration::from_secs(toml_config.inference.timeout_secs),
        )
        .context("Failed to build inference client")?,
    );

    let settings = OrchestratorSettings {
        model: args
            .model
            .unwrap_or_else(|| toml_config.inference.model.clone()),
    };
    info!("Model: {}", settings.model);

    let orchestrator = Arc::new(AnalysisOrchestrator::new(
        db_pool.clone(),
        event_bus.clone(),
        ConfigResolver::new(db_pool.clone()),
        inference,
        images,
        settings,
    ));

    let state = AppState::new(db_pool, event_bus, orchestrator, api_key)
        .with_toml_path(toml_path)
        .with_storage_root(storage_root);

    let app = borderline_ai::build_router(state);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind to {}", bind))?;
    info!("Listening on http://{}", bind);
    info!("Health check: http://{}/health", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
