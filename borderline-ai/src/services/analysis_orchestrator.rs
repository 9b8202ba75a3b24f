//! Analysis pipeline orchestrator
//!
//! # State Progression
//! PENDING → PROCESSING → {COMPLETED | FAILED}
//!
//! `submit` runs one independent pipeline per call:
//! 1. Insert the pending record (fatal on failure)
//! 2. Validate and upload the optional image (non-fatal)
//! 3. Mark the record processing (non-fatal)
//! 4. Resolve configuration, build prompt, call the endpoint once
//! 5. Parse the reply and persist the completed result, or
//! 6. Persist the failure with a diagnostic note
//!
//! The configuration's `fallback_behavior` is stored but not executed: an
//! endpoint failure marks the record failed without another call.
//!
//! Terminal records are never mutated; the persistence layer guards every
//! status write with the allowed predecessor statuses.

use borderline_common::events::{BorderlineEvent, EventBus};
use borderline_common::AnalysisStatus;
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use super::config_resolver::ConfigResolver;
use super::image_handler::ImageHandler;
use super::inference_client::{ChatRequest, InferenceClient};
use super::{prompt_builder, response_parser};
use crate::db::analyses;
use crate::models::{AnalysisRecord, AnalysisRequest};

/// Outcome of a submission that did not complete
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The record could not be created or its result could not be stored
    #[error("Analysis persistence failed: {0}")]
    Persistence(#[from] borderline_common::Error),

    /// The endpoint call failed; the record is marked failed
    #[error("Analysis {analysis_id} failed: {message}")]
    Inference { analysis_id: Uuid, message: String },
}

/// Completed submission
#[derive(Debug, Clone)]
pub struct Submission {
    pub record: AnalysisRecord,
    /// Image rejection or upload failure, reported without aborting the analysis
    pub image_warning: Option<String>,
}

/// Endpoint settings not carried by the analysis configuration
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub model: String,
}

pub struct AnalysisOrchestrator {
    db: SqlitePool,
    event_bus: EventBus,
    config_resolver: ConfigResolver,
    inference: Arc<dyn InferenceClient>,
    images: ImageHandler,
    settings: OrchestratorSettings,
}

impl AnalysisOrchestrator {
    pub fn new(
        db: SqlitePool,
        event_bus: EventBus,
        config_resolver: ConfigResolver,
        inference: Arc<dyn InferenceClient>,
        images: ImageHandler,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            db,
            event_bus,
            config_resolver,
            inference,
            images,
            settings,
        }
    }

    /// Run the full pipeline for one submission
    ///
    /// Returns once the record is terminal or a fatal persistence step fails.
    pub async fn submit(
        &self,
        user_id: &str,
        request: AnalysisRequest,
    ) -> Result<Submission, PipelineError> {
        let mut record = AnalysisRecord::new(user_id, &request);
        let analysis_id = record.id;

        analyses::insert_analysis(&self.db, &record).await.map_err(|e| {
            tracing::error!(user_id, error = %e, "Failed to create analysis record");
            e
        })?;

        tracing::info!(
            analysis_id = %analysis_id,
            user_id,
            product_name = %record.product_name,
            "Analysis submitted"
        );
        self.event_bus.emit_lossy(BorderlineEvent::AnalysisSubmitted {
            analysis_id,
            user_id: user_id.to_string(),
            product_name: record.product_name.clone(),
            timestamp: Utc::now(),
        });

        let image_warning = self.attach_image(&mut record, &request).await;

        match analyses::mark_processing(&self.db, analysis_id).await {
            Ok(()) => {
                record.status = AnalysisStatus::Processing;
                record.updated_at = Utc::now();
                self.emit_status_change(analysis_id, AnalysisStatus::Pending, AnalysisStatus::Processing);
            }
            Err(e) => {
                tracing::warn!(
                    analysis_id = %analysis_id,
                    error = %e,
                    "Failed to mark analysis processing, continuing"
                );
            }
        }

        let resolved = self.config_resolver.resolve_active().await;
        let configuration = &resolved.configuration;

        let chat_request = ChatRequest {
            model: self.settings.model.clone(),
            messages: prompt_builder::build(&request, &resolved),
            max_tokens: configuration.max_tokens,
            temperature: configuration.temperature,
        };

        tracing::debug!(
            analysis_id = %analysis_id,
            configuration = %configuration.name,
            messages = chat_request.messages.len(),
            "Invoking inference endpoint"
        );

        match self.inference.complete(&chat_request).await {
            Ok(raw) => {
                let result = response_parser::parse(&raw);
                let completed_at = Utc::now();

                if let Err(e) =
                    analyses::complete_analysis(&self.db, analysis_id, &result, completed_at).await
                {
                    tracing::error!(
                        analysis_id = %analysis_id,
                        error = %e,
                        "Failed to persist analysis result"
                    );
                    self.record_failure(
                        analysis_id,
                        record.status,
                        &format!("Failed to store analysis result: {}", e),
                    )
                    .await;
                    return Err(PipelineError::Persistence(e));
                }

                let previous = record.status;
                record.status = AnalysisStatus::Completed;
                record.result = Some(result);
                record.updated_at = completed_at;
                record.completed_at = Some(completed_at);

                if let Some(result) = &record.result {
                    tracing::info!(
                        analysis_id = %analysis_id,
                        hs_code = %result.hs_code,
                        confidence = result.confidence,
                        manual_review = result.is_manual_review(),
                        "Analysis completed"
                    );
                    self.emit_status_change(analysis_id, previous, AnalysisStatus::Completed);
                    self.event_bus.emit_lossy(BorderlineEvent::AnalysisCompleted {
                        analysis_id,
                        hs_code: result.hs_code.clone(),
                        confidence: result.confidence,
                        manual_review: result.is_manual_review(),
                        timestamp: completed_at,
                    });
                }

                Ok(Submission {
                    record,
                    image_warning,
                })
            }
            Err(e) => {
                let message = format!("Inference request failed: {}", e);
                self.record_failure(analysis_id, record.status, &message).await;
                Err(PipelineError::Inference {
                    analysis_id,
                    message,
                })
            }
        }
    }

    pub async fn get_analysis(&self, id: Uuid) -> borderline_common::Result<Option<AnalysisRecord>> {
        analyses::load_analysis(&self.db, id).await
    }

    /// Records owned by `user_id`, newest first
    pub async fn list_for_user(&self, user_id: &str) -> borderline_common::Result<Vec<AnalysisRecord>> {
        analyses::list_analyses_for_user(&self.db, user_id).await
    }

    /// Delete a record owned by `user_id`, removing its image first
    ///
    /// Records owned by other users are reported as not found.
    pub async fn delete_analysis(&self, user_id: &str, id: Uuid) -> borderline_common::Result<()> {
        let record = analyses::load_analysis(&self.db, id)
            .await?
            .filter(|record| record.user_id == user_id)
            .ok_or_else(|| borderline_common::Error::NotFound(format!("Analysis not found: {}", id)))?;

        if let Some(image) = &record.image {
            if let Err(e) = self.images.delete(&image.path).await {
                tracing::warn!(
                    analysis_id = %id,
                    path = %image.path,
                    error = %e,
                    "Failed to delete product image"
                );
            }
        }

        analyses::delete_analysis(&self.db, id).await?;
        tracing::info!(analysis_id = %id, user_id, "Analysis deleted");
        Ok(())
    }

    /// Validate and upload the image, linking it to the record on success
    ///
    /// Returns a warning for the caller when the image was not stored.
    async fn attach_image(&self, record: &mut AnalysisRecord, request: &AnalysisRequest) -> Option<String> {
        let image = request.image.as_ref()?;

        let stored = match self.images.upload(image, &record.user_id, record.id).await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(
                    analysis_id = %record.id,
                    error = %e,
                    "Product image not stored, continuing without it"
                );
                return Some(e.to_string());
            }
        };

        match analyses::set_image(&self.db, record.id, &stored).await {
            Ok(()) => {
                record.image = Some(stored);
                None
            }
            Err(e) => {
                tracing::warn!(
                    analysis_id = %record.id,
                    path = %stored.path,
                    error = %e,
                    "Failed to link product image to analysis, removing upload"
                );
                if let Err(delete_err) = self.images.delete(&stored.path).await {
                    tracing::warn!(
                        analysis_id = %record.id,
                        path = %stored.path,
                        error = %delete_err,
                        "Failed to remove unlinked product image"
                    );
                }
                Some(format!("Product image could not be linked to the analysis: {}", e))
            }
        }
    }

    async fn record_failure(&self, analysis_id: Uuid, previous: AnalysisStatus, diagnostic: &str) {
        match analyses::fail_analysis(&self.db, analysis_id, diagnostic).await {
            Ok(()) => {
                tracing::warn!(analysis_id = %analysis_id, diagnostic, "Analysis marked failed");
                self.emit_status_change(analysis_id, previous, AnalysisStatus::Failed);
                self.event_bus.emit_lossy(BorderlineEvent::AnalysisFailed {
                    analysis_id,
                    error: diagnostic.to_string(),
                    timestamp: Utc::now(),
                });
            }
            Err(e) => {
                tracing::error!(
                    analysis_id = %analysis_id,
                    error = %e,
                    "Failed to mark analysis failed"
                );
            }
        }
    }

    fn emit_status_change(&self, analysis_id: Uuid, old_status: AnalysisStatus, new_status: AnalysisStatus) {
        if !old_status.can_transition_to(new_status) {
            tracing::warn!(
                analysis_id = %analysis_id,
                %old_status,
                %new_status,
                "Suppressing illegal status change event"
            );
            return;
        }
        self.event_bus.emit_lossy(BorderlineEvent::AnalysisStatusChanged {
            analysis_id,
            old_status,
            new_status,
            timestamp: Utc::now(),
        });
    }
}
