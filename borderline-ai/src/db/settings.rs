//! Settings database operations
//!
//! Key-value accessors for the settings table.

use borderline_common::{Error, Result};
use sqlx::{Pool, Sqlite};

#[cfg(test)]
use sqlx::SqlitePool;

const INFERENCE_API_KEY: &str = "inference_api_key";

/// Get the inference endpoint API key from database
///
/// **Returns:** Some(key) if exists, None if not set
pub async fn get_inference_api_key(db: &Pool<Sqlite>) -> Result<Option<String>> {
    get_setting::<String>(db, INFERENCE_API_KEY).await
}

/// Set the inference endpoint API key in database
pub async fn set_inference_api_key(db: &Pool<Sqlite>, key: String) -> Result<()> {
    set_setting(db, INFERENCE_API_KEY, key).await
}

/// Generic setting getter (internal)
async fn get_setting<T>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await
        .map_err(Error::Database)?;

    match row {
        Some((value,)) => {
            let parsed = value
                .parse::<T>()
                .map_err(|e| Error::Config(format!("Parse setting failed: {}", e)))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

/// Generic setting setter (internal)
async fn set_setting<T>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()>
where
    T: std::fmt::Display,
{
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await
    .map_err(Error::Database)?;

    Ok(())
}
