//! Analysis pipeline services and external collaborator adapters
//!
//! Control flow: orchestrator → config resolver → prompt builder →
//! inference endpoint → response parser → persistence. Image handling runs
//! alongside and never aborts the pipeline.

pub mod analysis_orchestrator;
pub mod config_resolver;
pub mod image_handler;
pub mod inference_client;
pub mod object_store;
pub mod prompt_builder;
pub mod response_parser;

pub use analysis_orchestrator::{AnalysisOrchestrator, OrchestratorSettings, PipelineError, Submission};
pub use config_resolver::{ConfigResolver, ConfigSource, ResolvedConfiguration};
pub use image_handler::{ImageError, ImageHandler, ImageValidationError, MAX_IMAGE_BYTES};
pub use inference_client::{
    ChatMessage, ChatRequest, ChatRole, HttpInferenceClient, InferenceClient, InferenceError,
    SharedApiKey,
};
pub use object_store::{LocalObjectStore, ObjectStore, StorageError};
