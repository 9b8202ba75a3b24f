//! Analysis configuration administration
//!
//! CRUD over `ai_configurations` plus activation. At most one configuration is
//! active; with none active the built-in default applies.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use borderline_common::events::BorderlineEvent;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::db::configurations;
use crate::error::{ApiError, ApiResult};
use crate::models::{AnalysisConfiguration, ConfigurationDraft};
use crate::services::ResolvedConfiguration;
use crate::AppState;

/// POST /api/configurations request
#[derive(Debug, Deserialize)]
pub struct CreateConfigurationRequest {
    #[serde(flatten)]
    pub draft: ConfigurationDraft,
    #[serde(default)]
    pub created_by: Option<String>,
}

fn validated(draft: &ConfigurationDraft) -> ApiResult<()> {
    draft.validate().map_err(ApiError::Unprocessable)
}

/// GET /api/configurations
pub async fn list_configurations(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<AnalysisConfiguration>>> {
    Ok(Json(configurations::list_configurations(&state.db).await?))
}

/// POST /api/configurations
///
/// New configurations start inactive.
pub async fn create_configuration(
    State(state): State<AppState>,
    Json(request): Json<CreateConfigurationRequest>,
) -> ApiResult<(StatusCode, Json<AnalysisConfiguration>)> {
    validated(&request.draft)?;

    let config = AnalysisConfiguration::from_draft(request.draft, request.created_by);
    configurations::insert_configuration(&state.db, &config).await?;

    tracing::info!(configuration_id = %config.id, name = %config.name, "Configuration created");
    Ok((StatusCode::CREATED, Json(config)))
}

/// GET /api/configurations/:id
pub async fn get_configuration(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<AnalysisConfiguration>> {
    configurations::load_configuration(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Configuration not found: {}", id)))
}

/// PUT /api/configurations/:id
///
/// Replaces the editable fields; activation state is unchanged.
pub async fn update_configuration(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(draft): Json<ConfigurationDraft>,
) -> ApiResult<Json<AnalysisConfiguration>> {
    validated(&draft)?;

    let mut config = configurations::load_configuration(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Configuration not found: {}", id)))?;

    config.apply_draft(draft);
    configurations::update_configuration(&state.db, &config).await?;

    tracing::info!(configuration_id = %id, name = %config.name, "Configuration updated");
    Ok(Json(config))
}

/// DELETE /api/configurations/:id
pub async fn delete_configuration(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !configurations::delete_configuration(&state.db, id).await? {
        return Err(ApiError::NotFound(format!("Configuration not found: {}", id)));
    }
    tracing::info!(configuration_id = %id, "Configuration deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/configurations/:id/activate
pub async fn activate_configuration(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<AnalysisConfiguration>> {
    let config = state.config_resolver.set_active(id).await?;

    state.event_bus.emit_lossy(BorderlineEvent::ConfigurationActivated {
        configuration_id: config.id,
        name: config.name.clone(),
        timestamp: Utc::now(),
    });

    Ok(Json(config))
}

/// GET /api/configurations/active
///
/// The configuration the next submission will use, built-in default included.
pub async fn get_active_configuration(State(state): State<AppState>) -> Json<ResolvedConfiguration> {
    Json(state.config_resolver.resolve_active().await)
}

/// DELETE /api/configurations/active
///
/// Deactivates every configuration so the built-in default applies.
pub async fn clear_active_configuration(State(state): State<AppState>) -> ApiResult<StatusCode> {
    state.config_resolver.clear_active().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Build configuration routes
pub fn configuration_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/configurations",
            get(list_configurations).post(create_configuration),
        )
        .route(
            "/api/configurations/active",
            get(get_active_configuration).delete(clear_active_configuration),
        )
        .route(
            "/api/configurations/:id",
            get(get_configuration)
                .put(update_configuration)
                .delete(delete_configuration),
        )
        .route("/api/configurations/:id/activate", post(activate_configuration))
}
