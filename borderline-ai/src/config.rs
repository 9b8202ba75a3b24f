//! Configuration resolution for borderline-ai
//!
//! Inference API key priority: Database → ENV → TOML.

use borderline_common::config::{load_toml_config, write_toml_config, TomlConfig};
use borderline_common::Result;
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::{info, warn};

/// Environment variable holding the inference endpoint API key
pub const API_KEY_ENV: &str = "BORDERLINE_INFERENCE_API_KEY";

/// Resolve the inference API key from the three configuration tiers
///
/// `None` means no tier holds a usable key; requests are then sent without
/// an `Authorization` header, which suits local endpoints.
pub async fn resolve_inference_api_key(
    db: &Pool<Sqlite>,
    toml_config: &TomlConfig,
) -> Result<Option<String>> {
    let db_key = crate::db::settings::get_inference_api_key(db)
        .await?
        .filter(|k| is_valid_key(k));
    let env_key = std::env::var(API_KEY_ENV).ok().filter(|k| is_valid_key(k));
    let toml_key = toml_config
        .inference
        .api_key
        .clone()
        .filter(|k| is_valid_key(k));

    let sources: Vec<&str> = [
        ("database", db_key.is_some()),
        ("environment", env_key.is_some()),
        ("TOML", toml_key.is_some()),
    ]
    .into_iter()
    .filter_map(|(name, present)| present.then_some(name))
    .collect();

    if sources.len() > 1 {
        warn!(
            "Inference API key found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    if let Some(key) = db_key {
        info!("Inference API key loaded from database");
        return Ok(Some(key));
    }
    if let Some(key) = env_key {
        info!("Inference API key loaded from environment variable");
        return Ok(Some(key));
    }
    if let Some(key) = toml_key {
        info!("Inference API key loaded from TOML config");
        return Ok(Some(key));
    }

    warn!(
        "Inference API key not configured. Set it with POST /api/settings/inference_api_key, \
         {}=..., or [inference] api_key in the TOML config",
        API_KEY_ENV
    );
    Ok(None)
}

/// Non-empty, non-whitespace
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Copy the key into the TOML file as a backup
///
/// Best effort: failures are logged and swallowed, the database stays authoritative.
pub fn sync_api_key_to_toml(key: &str, toml_path: &Path) {
    let mut config = match load_toml_config(toml_path) {
        Ok(config) => config,
        Err(e) => {
            warn!("TOML sync skipped, existing file unreadable: {}", e);
            return;
        }
    };

    config.inference.api_key = Some(key.to_string());

    match write_toml_config(&config, toml_path) {
        Ok(()) => info!("Inference API key synced to TOML: {}", toml_path.display()),
        Err(e) => warn!("TOML write failed (database write succeeded): {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    async fn setup_db() -> sqlx::SqlitePool {
        crate::db::init_in_memory_pool().await.unwrap()
    }

    fn toml_with_key(key: Option<&str>) -> TomlConfig {
        let mut config = TomlConfig::default();
        config.inference.api_key = key.map(str::to_string);
        config
    }

    #[tokio::test]
    #[serial]
    async fn test_database_wins() {
        std::env::set_var(API_KEY_ENV, "env-key");
        let db = setup_db().await;
        crate::db::settings::set_inference_api_key(&db, "db-key".to_string())
            .await
            .unwrap();

        let key = resolve_inference_api_key(&db, &toml_with_key(Some("toml-key")))
            .await
            .unwrap();
        std::env::remove_var(API_KEY_ENV);

        assert_eq!(key.as_deref(), Some("db-key"));
    }

    #[tokio::test]
    #[serial]
    async fn test_env_then_toml() {
        let db = setup_db().await;

        std::env::set_var(API_KEY_ENV, "env-key");
        let key = resolve_inference_api_key(&db, &toml_with_key(Some("toml-key")))
            .await
            .unwrap();
        assert_eq!(key.as_deref(), Some("env-key"));

        std::env::set_var(API_KEY_ENV, "   ");
        let key = resolve_inference_api_key(&db, &toml_with_key(Some("toml-key")))
            .await
            .unwrap();
        std::env::remove_var(API_KEY_ENV);
        assert_eq!(key.as_deref(), Some("toml-key"));
    }

    #[tokio::test]
    #[serial]
    async fn test_no_key_anywhere() {
        std::env::remove_var(API_KEY_ENV);
        let db = setup_db().await;
        let key = resolve_inference_api_key(&db, &toml_with_key(None)).await.unwrap();
        assert!(key.is_none());
    }

    #[test]
    fn test_sync_preserves_other_settings() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("borderline-ai.toml");
        let mut existing = TomlConfig::default();
        existing.storage.bucket = "custom-bucket".to_string();
        write_toml_config(&existing, &path).unwrap();

        sync_api_key_to_toml("sk-new", &path);

        let reloaded = load_toml_config(&path).unwrap();
        assert_eq!(reloaded.inference.api_key.as_deref(), Some("sk-new"));
        assert_eq!(reloaded.storage.bucket, "custom-bucket");
    }
}
