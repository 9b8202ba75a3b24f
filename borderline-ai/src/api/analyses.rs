//! Analysis API handlers
//!
//! POST /api/analyses, GET /api/analyses/:id, GET /api/users/:user_id/analyses,
//! DELETE /api/users/:user_id/analyses/:id

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{AnalysisRecord, AnalysisRequest, ProductCategory, ProductImage};
use crate::services::{PipelineError, MAX_IMAGE_BYTES};
use crate::AppState;

/// Request body ceiling for submissions
///
/// Larger than the image limit so oversized images reach validation and
/// produce a warning instead of a transport error.
pub const MAX_SUBMISSION_BYTES: usize = 2 * MAX_IMAGE_BYTES + 1024 * 1024;

/// POST /api/analyses response
#[derive(Debug, Serialize)]
pub struct SubmitAnalysisResponse {
    pub analysis: AnalysisRecord,
    /// Why the image was not stored, if it was supplied and rejected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_warning: Option<String>,
}

/// Submission parsed from multipart form fields
#[derive(Debug, Default)]
struct SubmissionForm {
    user_id: Option<String>,
    product_name: Option<String>,
    product_description: Option<String>,
    product_category: Option<String>,
    origin_country: Option<String>,
    destination_country: Option<String>,
    image: Option<ProductImage>,
}

impl SubmissionForm {
    async fn read(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = SubmissionForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
        {
            let name = field.name().unwrap_or_default().to_string();

            if name == "image" {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read image: {}", e)))?;

                // Browsers send an empty, unnamed part when no file is chosen
                let unnamed = file_name.as_deref().map_or(true, str::is_empty);
                if !(bytes.is_empty() && unnamed) {
                    form.image = Some(ProductImage {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
                continue;
            }

            let value = field
                .text()
                .await
                .map_err(|e| ApiError::BadRequest(format!("Failed to read field {}: {}", name, e)))?;

            match name.as_str() {
                "user_id" => form.user_id = Some(value),
                "product_name" => form.product_name = Some(value),
                "product_description" => form.product_description = Some(value),
                "product_category" => form.product_category = Some(value),
                "origin_country" => form.origin_country = Some(value),
                "destination_country" => form.destination_country = Some(value),
                other => tracing::debug!(field = other, "Ignoring unknown form field"),
            }
        }

        Ok(form)
    }

    fn into_request(self) -> ApiResult<(String, AnalysisRequest)> {
        let user_id = required("user_id", self.user_id)?;

        let product_category = match self.product_category.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(value) => Some(ProductCategory::parse(value).ok_or_else(|| {
                let catalog: Vec<&str> = ProductCategory::ALL.iter().map(|c| c.as_str()).collect();
                ApiError::BadRequest(format!(
                    "Unknown product category '{}'; expected one of: {}",
                    value,
                    catalog.join(", ")
                ))
            })?),
        };

        let request = AnalysisRequest {
            product_name: required("product_name", self.product_name)?,
            product_description: self.product_description.unwrap_or_default().trim().to_string(),
            product_category,
            origin_country: required("origin_country", self.origin_country)?,
            destination_country: required("destination_country", self.destination_country)?,
            image: self.image,
        };

        Ok((user_id, request))
    }
}

fn required(field: &str, value: Option<String>) -> ApiResult<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("Missing required field: {}", field)))
}

/// POST /api/analyses
///
/// Runs the pipeline to a terminal state. Returns 200 with the completed
/// record, or 502 carrying the failed record id when the endpoint call failed.
pub async fn submit_analysis(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<SubmitAnalysisResponse>> {
    let (user_id, request) = SubmissionForm::read(multipart).await?.into_request()?;

    match state.orchestrator.submit(&user_id, request).await {
        Ok(submission) => Ok(Json(SubmitAnalysisResponse {
            analysis: submission.record,
            image_warning: submission.image_warning,
        })),
        Err(e) => {
            state.record_error(e.to_string()).await;
            if let PipelineError::Persistence(ref err) = e {
                tracing::error!(user_id = %user_id, error = %err, "Analysis submission aborted");
            }
            Err(e.into())
        }
    }
}

/// GET /api/analyses/:id
pub async fn get_analysis(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<AnalysisRecord>> {
    state
        .orchestrator
        .get_analysis(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Analysis not found: {}", id)))
}

/// GET /api/users/:user_id/analyses
pub async fn list_user_analyses(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<AnalysisRecord>>> {
    Ok(Json(state.orchestrator.list_for_user(&user_id).await?))
}

/// DELETE /api/users/:user_id/analyses/:id
pub async fn delete_analysis(
    State(state): State<AppState>,
    Path((user_id, id)): Path<(String, Uuid)>,
) -> ApiResult<StatusCode> {
    state.orchestrator.delete_analysis(&user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Build analysis routes
pub fn analysis_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/analyses",
            post(submit_analysis).layer(DefaultBodyLimit::max(MAX_SUBMISSION_BYTES)),
        )
        .route("/api/analyses/:id", get(get_analysis))
        .route("/api/users/:user_id/analyses", get(list_user_analyses))
        .route("/api/users/:user_id/analyses/:id", delete(delete_analysis))
}
