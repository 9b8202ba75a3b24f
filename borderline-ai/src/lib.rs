//! borderline-ai library interface
//!
//! Cross-border compliance analysis service: pipeline services, persistence
//! and the HTTP API, exposed for the binary and for integration testing.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use borderline_common::events::EventBus;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::services::{AnalysisOrchestrator, ConfigResolver, SharedApiKey};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    pub orchestrator: Arc<AnalysisOrchestrator>,
    pub config_resolver: ConfigResolver,
    /// Key used by the inference client, updated by the settings endpoint
    pub api_key: SharedApiKey,
    /// TOML file receiving best-effort settings backups
    pub toml_path: Option<PathBuf>,
    /// Object store root served under `/storage`
    pub storage_root: Option<PathBuf>,
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        event_bus: EventBus,
        orchestrator: Arc<AnalysisOrchestrator>,
        api_key: SharedApiKey,
    ) -> Self {
        Self {
            config_resolver: ConfigResolver::new(db.clone()),
            db,
            event_bus,
            orchestrator,
            api_key,
            toml_path: None,
            storage_root: None,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    pub fn with_toml_path(mut self, path: PathBuf) -> Self {
        self.toml_path = Some(path);
        self
    }

    pub fn with_storage_root(mut self, root: PathBuf) -> Self {
        self.storage_root = Some(root);
        self
    }

    pub async fn record_error(&self, message: String) {
        *self.last_error.write().await = Some(message);
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    let storage_root = state.storage_root.clone();

    let mut router = Router::new()
        .merge(api::analysis_routes())
        .merge(api::configuration_routes())
        .merge(api::settings_routes())
        .merge(api::health_routes())
        .route("/events", get(api::event_stream))
        .with_state(state);

    if let Some(root) = storage_root {
        router = router.nest_service("/storage", ServeDir::new(root));
    }

    router
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
