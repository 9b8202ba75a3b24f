//! Settings API endpoint
//!
//! POST /api/settings/inference_api_key

use crate::{ApiError, ApiResult, AppState};
use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct SetApiKeyRequest {
    pub api_key: String,
}

#[derive(Debug, Serialize)]
pub struct SetApiKeyResponse {
    pub success: bool,
    pub message: String,
}

/// POST /api/settings/inference_api_key handler
///
/// **Request:** `{"api_key": "sk-..."}`
///
/// 1. Validate key (non-empty, non-whitespace)
/// 2. Write to database (authoritative)
/// 3. Swap the key used by the running inference client
/// 4. Sync to TOML (best-effort backup)
pub async fn set_inference_api_key(
    State(state): State<AppState>,
    Json(payload): Json<SetApiKeyRequest>,
) -> ApiResult<Json<SetApiKeyResponse>> {
    if !crate::config::is_valid_key(&payload.api_key) {
        return Err(ApiError::BadRequest(
            "API key cannot be empty or whitespace-only".to_string(),
        ));
    }
    let key = payload.api_key.trim().to_string();

    crate::db::settings::set_inference_api_key(&state.db, key.clone())
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to save API key to database: {}", e)))?;

    state.api_key.set(key.clone()).await;
    info!("Inference API key configured via settings API");

    if let Some(toml_path) = &state.toml_path {
        crate::config::sync_api_key_to_toml(&key, toml_path);
    }

    Ok(Json(SetApiKeyResponse {
        success: true,
        message: "Inference API key configured successfully".to_string(),
    }))
}

/// Build settings routes
pub fn settings_routes() -> Router<AppState> {
    Router::new().route("/api/settings/inference_api_key", post(set_inference_api_key))
}
