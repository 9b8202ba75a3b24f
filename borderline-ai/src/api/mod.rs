//! HTTP API handlers for borderline-ai
//!
//! REST endpoints for analyses, configurations and settings, plus SSE.

pub mod analyses;
pub mod configurations;
pub mod health;
pub mod settings;
pub mod sse;

pub use analyses::analysis_routes;
pub use configurations::configuration_routes;
pub use health::health_routes;
pub use settings::settings_routes;
pub use sse::event_stream;
