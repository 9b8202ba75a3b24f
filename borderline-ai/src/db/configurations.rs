//! Analysis configuration database operations
//!
//! Activation runs as one conditional UPDATE inside a transaction, so readers
//! never observe a window with zero active configurations.

use borderline_common::{time, Error, Result};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::{from_json_text, to_json_text};
use crate::models::{AnalysisConfiguration, AnalysisDepth, FallbackBehavior, ResponseFormat};

const SELECT_COLUMNS: &str = r#"
    SELECT id, name, description, is_active, system_role, analysis_depth,
           temperature, max_tokens, category_instructions, focus_areas,
           custom_instructions, response_format, validation_rules, fallback_behavior,
           created_at, updated_at, created_by
    FROM ai_configurations
"#;

/// Insert a new configuration
pub async fn insert_configuration(pool: &SqlitePool, config: &AnalysisConfiguration) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO ai_configurations (
            id, name, description, is_active, system_role, analysis_depth,
            temperature, max_tokens, category_instructions, focus_areas,
            custom_instructions, response_format, validation_rules, fallback_behavior,
            created_at, updated_at, created_by
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(config.id.to_string())
    .bind(&config.name)
    .bind(&config.description)
    .bind(config.is_active)
    .bind(&config.system_role)
    .bind(config.analysis_depth.as_str())
    .bind(config.temperature)
    .bind(config.max_tokens as i64)
    .bind(to_json_text(&config.category_instructions)?)
    .bind(to_json_text(&config.focus_areas)?)
    .bind(&config.custom_instructions)
    .bind(config.response_format.as_str())
    .bind(to_json_text(&config.validation_rules)?)
    .bind(config.fallback_behavior.as_str())
    .bind(config.created_at.to_rfc3339())
    .bind(config.updated_at.to_rfc3339())
    .bind(&config.created_by)
    .execute(pool)
    .await?;

    Ok(())
}

/// Update the editable fields of an existing configuration
///
/// Activation is not touched here; use [`set_active_configuration`].
pub async fn update_configuration(pool: &SqlitePool, config: &AnalysisConfiguration) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE ai_configurations
        SET name = ?, description = ?, system_role = ?, analysis_depth = ?,
            temperature = ?, max_tokens = ?, category_instructions = ?, focus_areas = ?,
            custom_instructions = ?, response_format = ?, validation_rules = ?,
            fallback_behavior = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&config.name)
    .bind(&config.description)
    .bind(&config.system_role)
    .bind(config.analysis_depth.as_str())
    .bind(config.temperature)
    .bind(config.max_tokens as i64)
    .bind(to_json_text(&config.category_instructions)?)
    .bind(to_json_text(&config.focus_areas)?)
    .bind(&config.custom_instructions)
    .bind(config.response_format.as_str())
    .bind(to_json_text(&config.validation_rules)?)
    .bind(config.fallback_behavior.as_str())
    .bind(config.updated_at.to_rfc3339())
    .bind(config.id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Configuration not found: {}", config.id)));
    }
    Ok(())
}

pub async fn load_configuration(pool: &SqlitePool, id: Uuid) -> Result<Option<AnalysisConfiguration>> {
    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_COLUMNS))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.map(|row| configuration_from_row(&row)).transpose()
}

pub async fn list_configurations(pool: &SqlitePool) -> Result<Vec<AnalysisConfiguration>> {
    let rows = sqlx::query(&format!("{} ORDER BY created_at ASC", SELECT_COLUMNS))
        .fetch_all(pool)
        .await?;

    rows.iter().map(configuration_from_row).collect()
}

/// The active configuration, if any
///
/// Rows written before activation became transactional may leave several
/// active; the most recently updated one wins.
pub async fn load_active_configuration(pool: &SqlitePool) -> Result<Option<AnalysisConfiguration>> {
    let rows = sqlx::query(&format!(
        "{} WHERE is_active = 1 ORDER BY updated_at DESC",
        SELECT_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    if rows.len() > 1 {
        tracing::warn!(
            active_count = rows.len(),
            "Multiple active configurations found, using most recently updated"
        );
    }

    rows.first().map(configuration_from_row).transpose()
}

/// Make `id` the only active configuration
pub async fn set_active_configuration(pool: &SqlitePool, id: Uuid) -> Result<()> {
    let mut tx = pool.begin().await?;

    let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ai_configurations WHERE id = ?")
        .bind(id.to_string())
        .fetch_one(&mut *tx)
        .await?;
    if exists == 0 {
        return Err(Error::NotFound(format!("Configuration not found: {}", id)));
    }

    sqlx::query(
        r#"
        UPDATE ai_configurations
        SET is_active = CASE WHEN id = ?1 THEN 1 ELSE 0 END,
            updated_at = CASE WHEN id = ?1 THEN ?2 ELSE updated_at END
        WHERE is_active = 1 OR id = ?1
        "#,
    )
    .bind(id.to_string())
    .bind(Utc::now().to_rfc3339())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

/// Deactivate every configuration so the built-in default applies
pub async fn deactivate_all(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query("UPDATE ai_configurations SET is_active = 0 WHERE is_active = 1")
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn delete_configuration(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM ai_configurations WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

fn configuration_from_row(row: &SqliteRow) -> Result<AnalysisConfiguration> {
    let id: String = row.get("id");
    let id = Uuid::parse_str(&id)
        .map_err(|e| Error::Internal(format!("Failed to parse configuration id: {}", e)))?;

    let analysis_depth: String = row.get("analysis_depth");
    let analysis_depth = AnalysisDepth::parse(&analysis_depth)
        .ok_or_else(|| Error::Internal(format!("Unknown analysis depth: {}", analysis_depth)))?;

    let response_format: String = row.get("response_format");
    let response_format = ResponseFormat::parse(&response_format)
        .ok_or_else(|| Error::Internal(format!("Unknown response format: {}", response_format)))?;

    let fallback_behavior: String = row.get("fallback_behavior");
    let fallback_behavior = FallbackBehavior::parse(&fallback_behavior).ok_or_else(|| {
        Error::Internal(format!("Unknown fallback behavior: {}", fallback_behavior))
    })?;

    let category_instructions: String = row.get("category_instructions");
    let category_instructions: BTreeMap<String, String> =
        from_json_text("category_instructions", &category_instructions)?;
    let focus_areas: String = row.get("focus_areas");
    let validation_rules: String = row.get("validation_rules");

    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(AnalysisConfiguration {
        id,
        name: row.get("name"),
        description: row.get("description"),
        is_active: row.get::<i64, _>("is_active") != 0,
        system_role: row.get("system_role"),
        analysis_depth,
        temperature: row.get("temperature"),
        max_tokens: row.get::<i64, _>("max_tokens").clamp(0, u32::MAX as i64) as u32,
        category_instructions,
        focus_areas: from_json_text("focus_areas", &focus_areas)?,
        custom_instructions: row.get("custom_instructions"),
        response_format,
        validation_rules: from_json_text("validation_rules", &validation_rules)?,
        fallback_behavior,
        created_at: time::parse_rfc3339(&created_at)?,
        updated_at: time::parse_rfc3339(&updated_at)?,
        created_by: row.get("created_by"),
    })
}
