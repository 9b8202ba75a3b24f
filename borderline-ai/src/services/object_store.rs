//! Binary object store for uploaded product images
//!
//! Only upload, delete and public URL generation are needed. The local
//! implementation writes under `{root}/{bucket}/{path}` and publishes
//! `{public_base_url}/storage/{bucket}/{path}`, served by the router's
//! static file service.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid object path: {0}")]
    InvalidPath(String),

    #[error("Object not found: {0}")]
    NotFound(String),
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` at `bucket/path`, returning a publicly resolvable URL
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, StorageError>;

    async fn delete(&self, bucket: &str, path: &str) -> Result<(), StorageError>;
}

/// Filesystem-backed object store
pub struct LocalObjectStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/{}/{}", self.public_base_url, bucket, path)
    }

    fn object_file(&self, bucket: &str, path: &str) -> Result<PathBuf, StorageError> {
        let bucket = checked_relative(bucket)?;
        let path = checked_relative(path)?;
        Ok(self.root.join(bucket).join(path))
    }
}

/// Reject empty, absolute and parent-traversing paths
fn checked_relative(value: &str) -> Result<&Path, StorageError> {
    let path = Path::new(value);
    let valid = !value.is_empty()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_)));

    if valid {
        Ok(path)
    } else {
        Err(StorageError::InvalidPath(value.to_string()))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, StorageError> {
        let file = self.object_file(bucket, path)?;
        if let Some(parent) = file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&file, bytes).await?;

        tracing::debug!(
            bucket,
            path,
            content_type,
            bytes = bytes.len(),
            "Stored object"
        );
        Ok(self.public_url(bucket, path))
    }

    async fn delete(&self, bucket: &str, path: &str) -> Result<(), StorageError> {
        let file = self.object_file(bucket, path)?;
        match tokio::fs::remove_file(&file).await {
            Ok(()) => {
                tracing::debug!(bucket, path, "Deleted object");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(format!("{}/{}", bucket, path)))
            }
            Err(e) => Err(e.into()),
        }
    }
}
