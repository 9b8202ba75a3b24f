//! Product image validation, upload and removal
//!
//! Images are optional: nothing here aborts an analysis. Validation runs before
//! any upload attempt.

use base64::Engine;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use super::object_store::{ObjectStore, StorageError};
use crate::models::{ProductImage, StoredImage};

/// Upload size ceiling (10 MiB)
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Accepted content types and the file extension stored for each
pub const ALLOWED_CONTENT_TYPES: [(&str, &str); 2] = [("image/jpeg", "jpg"), ("image/png", "png")];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ImageValidationError {
    #[error("Image is empty")]
    Empty,

    #[error("Unsupported image type {0}; expected JPEG or PNG")]
    UnsupportedType(String),

    #[error("Image is {size} bytes; the limit is {limit} bytes")]
    TooLarge { size: usize, limit: usize },
}

#[derive(Debug, Error)]
pub enum ImageError {
    #[error(transparent)]
    Validation(#[from] ImageValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Check type and size, returning the file extension to store under
pub fn validate(image: &ProductImage) -> Result<&'static str, ImageValidationError> {
    let content_type = image
        .content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    let extension = ALLOWED_CONTENT_TYPES
        .iter()
        .find(|(allowed, _)| *allowed == content_type)
        .map(|(_, ext)| *ext)
        .ok_or_else(|| ImageValidationError::UnsupportedType(image.content_type.clone()))?;

    if image.bytes.is_empty() {
        return Err(ImageValidationError::Empty);
    }
    if image.bytes.len() > MAX_IMAGE_BYTES {
        return Err(ImageValidationError::TooLarge {
            size: image.bytes.len(),
            limit: MAX_IMAGE_BYTES,
        });
    }

    Ok(extension)
}

/// `{userId}/{analysisId}/{analysisId}-{millis}.{ext}`
///
/// Characters outside `[A-Za-z0-9_-]` in the user id are replaced with `_`.
pub fn object_path(user_id: &str, analysis_id: Uuid, extension: &str, at: DateTime<Utc>) -> String {
    let user: String = user_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let user = if user.is_empty() { "anonymous".to_string() } else { user };

    format!(
        "{}/{}/{}-{}.{}",
        user,
        analysis_id,
        analysis_id,
        borderline_common::time::unix_millis(at),
        extension
    )
}

/// Embeddable `data:` URL for the image bytes
pub fn to_transfer_encoding(image: &ProductImage) -> String {
    format!(
        "data:{};base64,{}",
        image.content_type,
        base64::engine::general_purpose::STANDARD.encode(&image.bytes)
    )
}

#[derive(Clone)]
pub struct ImageHandler {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl ImageHandler {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }

    /// Validate, then upload under the namespaced path
    pub async fn upload(
        &self,
        image: &ProductImage,
        user_id: &str,
        analysis_id: Uuid,
    ) -> Result<StoredImage, ImageError> {
        let extension = validate(image)?;
        let path = object_path(user_id, analysis_id, extension, Utc::now());

        let url = self
            .store
            .upload(&self.bucket, &path, &image.bytes, &image.content_type)
            .await?;

        tracing::info!(
            analysis_id = %analysis_id,
            path = %path,
            bytes = image.bytes.len(),
            "Product image uploaded"
        );
        Ok(StoredImage { path, url })
    }

    pub async fn delete(&self, path: &str) -> Result<(), StorageError> {
        self.store.delete(&self.bucket, path).await
    }
}
