//! Test Helper Utilities
//!
//! Fake collaborators and state builders shared by the borderline-ai
//! integration tests.

#![allow(dead_code)]

pub mod fakes;

pub use fakes::{MemoryObjectStore, ScriptedInference};

use borderline_ai::models::{AnalysisRequest, ProductCategory, ProductImage};
use borderline_ai::services::{
    AnalysisOrchestrator, ConfigResolver, ImageHandler, OrchestratorSettings, SharedApiKey,
};
use borderline_ai::AppState;
use borderline_common::events::EventBus;
use sqlx::SqlitePool;
use std::sync::Arc;

pub const BUCKET: &str = "product-images";

/// Everything a test needs to drive the pipeline and inspect its effects
pub struct TestHarness {
    pub db: SqlitePool,
    pub event_bus: EventBus,
    pub inference: Arc<ScriptedInference>,
    pub store: Arc<MemoryObjectStore>,
    pub orchestrator: Arc<AnalysisOrchestrator>,
}

impl TestHarness {
    pub async fn new(inference: ScriptedInference) -> Self {
        Self::with_store(inference, MemoryObjectStore::new()).await
    }

    pub async fn with_store(inference: ScriptedInference, store: MemoryObjectStore) -> Self {
        let db = borderline_ai::db::init_in_memory_pool().await.unwrap();
        let event_bus = EventBus::new(100);
        let inference = Arc::new(inference);
        let store = Arc::new(store);

        let orchestrator = Arc::new(AnalysisOrchestrator::new(
            db.clone(),
            event_bus.clone(),
            ConfigResolver::new(db.clone()),
            inference.clone(),
            ImageHandler::new(store.clone(), BUCKET),
            OrchestratorSettings {
                model: "test-model".to_string(),
            },
        ));

        Self {
            db,
            event_bus,
            inference,
            store,
            orchestrator,
        }
    }

    pub fn app_state(&self) -> AppState {
        AppState::new(
            self.db.clone(),
            self.event_bus.clone(),
            self.orchestrator.clone(),
            SharedApiKey::new(None),
        )
    }

    pub fn router(&self) -> axum::Router {
        borderline_ai::build_router(self.app_state())
    }
}

/// Abort every `analyses` update matching `condition` (a trigger `WHEN` clause)
pub async fn fail_updates_where(db: &SqlitePool, name: &str, condition: &str) {
    sqlx::query(&format!(
        "CREATE TRIGGER {name} BEFORE UPDATE ON analyses FOR EACH ROW WHEN {condition} \
         BEGIN SELECT RAISE(ABORT, 'simulated write failure'); END"
    ))
    .execute(db)
    .await
    .unwrap();
}

/// The LED strip submission used throughout the tests
pub fn led_strip_request() -> AnalysisRequest {
    AnalysisRequest {
        product_name: "LED Strip".to_string(),
        product_description: "5m RGB LED strip with 12V power adapter".to_string(),
        product_category: Some(ProductCategory::Electronics),
        origin_country: "China".to_string(),
        destination_country: "Canada".to_string(),
        image: None,
    }
}

pub fn png_image(size: usize) -> ProductImage {
    ProductImage {
        file_name: Some("strip.png".to_string()),
        content_type: "image/png".to_string(),
        bytes: vec![0x89; size],
    }
}

/// Endpoint reply with every field present
pub const LED_STRIP_REPLY: &str = r#"Based on the description, here is my assessment:
{
  "hsCode": "8539.50",
  "tariffRate": 6.5,
  "requirements": ["CSA or cUL certification", "Bilingual labelling"],
  "restrictions": [],
  "documentation": ["Commercial invoice", "Canada Customs Invoice", "Bill of lading"],
  "estimatedProcessingTime": "3-5 business days",
  "confidence": 0.82,
  "analysis": "LED light sources fall under heading 8539."
}"#;

/// Minimal multipart/form-data body builder
pub struct MultipartBody {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self {
            boundary: "borderline-test-boundary".to_string(),
            body: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                self.boundary, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                self.boundary, name, file_name, content_type
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn finish(mut self) -> (String, Vec<u8>) {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        (self.content_type(), self.body)
    }
}

/// Form fields for the LED strip submission
pub fn led_strip_form(user_id: &str) -> MultipartBody {
    MultipartBody::new()
        .text("user_id", user_id)
        .text("product_name", "LED Strip")
        .text("product_description", "5m RGB LED strip with 12V power adapter")
        .text("product_category", "Electronics")
        .text("origin_country", "China")
        .text("destination_country", "Canada")
}
