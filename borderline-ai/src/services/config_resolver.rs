//! Active configuration resolution
//!
//! Reads never fail: a missing active configuration or a failed lookup
//! degrades to [`AnalysisConfiguration::builtin_default`].

use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::configurations;
use crate::models::AnalysisConfiguration;

/// Where a resolved configuration came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSource {
    BuiltinDefault,
    Active,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfiguration {
    pub source: ConfigSource,
    pub configuration: AnalysisConfiguration,
}

impl ResolvedConfiguration {
    pub fn builtin_default() -> Self {
        Self {
            source: ConfigSource::BuiltinDefault,
            configuration: AnalysisConfiguration::builtin_default(),
        }
    }

    pub fn is_default(&self) -> bool {
        self.source == ConfigSource::BuiltinDefault
    }
}

#[derive(Clone)]
pub struct ConfigResolver {
    db: SqlitePool,
}

impl ConfigResolver {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Currently active configuration, or the built-in default
    pub async fn resolve_active(&self) -> ResolvedConfiguration {
        match configurations::load_active_configuration(&self.db).await {
            Ok(Some(configuration)) => {
                tracing::debug!(
                    configuration_id = %configuration.id,
                    name = %configuration.name,
                    "Using active analysis configuration"
                );
                ResolvedConfiguration {
                    source: ConfigSource::Active,
                    configuration,
                }
            }
            Ok(None) => {
                tracing::debug!("No active configuration, using built-in default");
                ResolvedConfiguration::builtin_default()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Active configuration lookup failed, using built-in default");
                ResolvedConfiguration::builtin_default()
            }
        }
    }

    /// Make `id` the single active configuration and return it
    pub async fn set_active(&self, id: Uuid) -> borderline_common::Result<AnalysisConfiguration> {
        configurations::set_active_configuration(&self.db, id).await?;

        let configuration = configurations::load_configuration(&self.db, id)
            .await?
            .ok_or_else(|| borderline_common::Error::NotFound(format!("Configuration not found: {}", id)))?;

        tracing::info!(
            configuration_id = %id,
            name = %configuration.name,
            "Analysis configuration activated"
        );
        Ok(configuration)
    }

    /// Deactivate everything so the built-in default applies
    pub async fn clear_active(&self) -> borderline_common::Result<()> {
        let count = configurations::deactivate_all(&self.db).await?;
        tracing::info!(deactivated = count, "Active analysis configuration cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ConfigurationDraft;

    fn config(name: &str) -> AnalysisConfiguration {
        let draft: ConfigurationDraft =
            serde_json::from_value(serde_json::json!({ "name": name })).unwrap();
        AnalysisConfiguration::from_draft(draft, None)
    }

    #[tokio::test]
    async fn test_no_active_configuration_yields_default() {
        let pool = crate::db::init_in_memory_pool().await.unwrap();
        configurations::insert_configuration(&pool, &config("inactive"))
            .await
            .unwrap();

        let resolved = ConfigResolver::new(pool).resolve_active().await;
        assert!(resolved.is_default());
        assert_eq!(resolved.configuration.temperature, 0.3);
        assert_eq!(resolved.configuration.max_tokens, 2000);
    }

    #[tokio::test]
    async fn test_lookup_failure_yields_default() {
        let pool = crate::db::init_in_memory_pool().await.unwrap();
        pool.close().await;

        let resolved = ConfigResolver::new(pool).resolve_active().await;
        assert!(resolved.is_default());
    }

    #[tokio::test]
    async fn test_set_active_then_resolve() {
        let pool = crate::db::init_in_memory_pool().await.unwrap();
        let a = config("a");
        let b = config("b");
        configurations::insert_configuration(&pool, &a).await.unwrap();
        configurations::insert_configuration(&pool, &b).await.unwrap();

        let resolver = ConfigResolver::new(pool);
        let activated = resolver.set_active(b.id).await.unwrap();
        assert!(activated.is_active);

        let resolved = resolver.resolve_active().await;
        assert_eq!(resolved.source, ConfigSource::Active);
        assert_eq!(resolved.configuration.id, b.id);

        resolver.clear_active().await.unwrap();
        assert!(resolver.resolve_active().await.is_default());
    }
}
