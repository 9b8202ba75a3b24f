//! # Borderline Common Library
//!
//! Shared code for the borderline services:
//! - Error type and result alias
//! - Configuration loading (TOML file, environment, compiled defaults)
//! - Event types and the broadcast EventBus
//! - Timestamp helpers

pub mod config;
pub mod error;
pub mod events;
pub mod time;

pub use error::{Error, Result};
pub use events::{AnalysisStatus, BorderlineEvent, EventBus};
