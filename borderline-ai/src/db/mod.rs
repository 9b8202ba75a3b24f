//! Database access for borderline-ai
//!
//! SQLite via sqlx. Lists are stored as JSON text, timestamps as RFC 3339 text
//! and identifiers as UUID text.

pub mod analyses;
pub mod configurations;
pub mod settings;

use anyhow::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool
///
/// Creates `borderline.db` (and its parent folder) on first start.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Use proper SQLite URI with mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_tables(&pool).await?;

    Ok(pool)
}

/// Single-connection in-memory pool with all tables created
///
/// Every connection to `sqlite::memory:` is a separate database, so the pool
/// is capped at one connection.
pub async fn init_in_memory_pool() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;
    init_tables(&pool).await?;
    Ok(pool)
}

/// Create borderline-ai tables if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS analyses (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            product_name TEXT NOT NULL,
            product_description TEXT NOT NULL,
            product_category TEXT,
            origin_country TEXT NOT NULL,
            destination_country TEXT NOT NULL,
            product_image_path TEXT,
            product_image_url TEXT,
            hs_code TEXT,
            tariff_rate REAL,
            requirements TEXT,
            restrictions TEXT,
            documentation TEXT,
            estimated_processing_time TEXT,
            confidence_score REAL,
            analysis_text TEXT,
            status TEXT NOT NULL DEFAULT 'pending',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            completed_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_analyses_user_created ON analyses (user_id, created_at DESC)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ai_configurations (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT,
            is_active INTEGER NOT NULL DEFAULT 0,
            system_role TEXT NOT NULL,
            analysis_depth TEXT NOT NULL,
            temperature REAL NOT NULL,
            max_tokens INTEGER NOT NULL,
            category_instructions TEXT NOT NULL DEFAULT '{}',
            focus_areas TEXT NOT NULL DEFAULT '[]',
            custom_instructions TEXT,
            response_format TEXT NOT NULL,
            validation_rules TEXT NOT NULL DEFAULT '[]',
            fallback_behavior TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            created_by TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (settings, analyses, ai_configurations)");

    Ok(())
}

/// Serialize a value into a JSON text column
pub(crate) fn to_json_text<T: serde::Serialize>(value: &T) -> borderline_common::Result<String> {
    serde_json::to_string(value)
        .map_err(|e| borderline_common::Error::Internal(format!("Failed to serialize column: {}", e)))
}

/// Deserialize a JSON text column
pub(crate) fn from_json_text<T: serde::de::DeserializeOwned>(
    column: &str,
    value: &str,
) -> borderline_common::Result<T> {
    serde_json::from_str(value).map_err(|e| {
        borderline_common::Error::Internal(format!("Failed to deserialize {}: {}", column, e))
    })
}
