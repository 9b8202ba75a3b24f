//! Data models for borderline-ai
//!
//! - Analysis submission, result and record (status state machine)
//! - Administrator analysis configurations

pub mod analysis;
pub mod configuration;

pub use analysis::{
    AnalysisRecord, AnalysisRequest, AnalysisResult, ProductCategory, ProductImage, StoredImage,
    MANUAL_REVIEW_REQUIRED, UNKNOWN,
};
pub use borderline_common::AnalysisStatus;
pub use configuration::{
    AnalysisConfiguration, AnalysisDepth, ConfigurationDraft, FallbackBehavior, ResponseFormat,
};
