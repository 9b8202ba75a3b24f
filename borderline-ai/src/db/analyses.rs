//! Analysis record database operations
//!
//! Status writes carry the allowed predecessor statuses in their `WHERE` clause
//! (see [`AnalysisStatus::predecessors`]), so a record that reached `completed`
//! or `failed` is never overwritten.

use borderline_common::{time, AnalysisStatus, Error, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{from_json_text, to_json_text};
use crate::models::{AnalysisRecord, AnalysisResult, ProductCategory, StoredImage};

const SELECT_COLUMNS: &str = r#"
    SELECT id, user_id, product_name, product_description, product_category,
           origin_country, destination_country, product_image_path, product_image_url,
           hs_code, tariff_rate, requirements, restrictions, documentation,
           estimated_processing_time, confidence_score, analysis_text,
           status, created_at, updated_at, completed_at
    FROM analyses
"#;

/// Insert a freshly created (pending) record
pub async fn insert_analysis(pool: &SqlitePool, record: &AnalysisRecord) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO analyses (
            id, user_id, product_name, product_description, product_category,
            origin_country, destination_country, status, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(record.id.to_string())
    .bind(&record.user_id)
    .bind(&record.product_name)
    .bind(&record.product_description)
    .bind(record.product_category.map(|c| c.as_str()))
    .bind(&record.origin_country)
    .bind(&record.destination_country)
    .bind(record.status.as_str())
    .bind(record.created_at.to_rfc3339())
    .bind(record.updated_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Link an uploaded image to the record (independent of status)
pub async fn set_image(pool: &SqlitePool, id: Uuid, image: &StoredImage) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE analyses
        SET product_image_path = ?, product_image_url = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&image.path)
    .bind(&image.url)
    .bind(Utc::now().to_rfc3339())
    .bind(id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Analysis not found: {}", id)));
    }
    Ok(())
}

/// Move `pending → processing`
pub async fn mark_processing(pool: &SqlitePool, id: Uuid) -> Result<()> {
    let result = sqlx::query(&format!(
        "UPDATE analyses SET status = ?, updated_at = ? WHERE id = ? AND {}",
        status_guard(AnalysisStatus::Processing)
    ))
    .bind(AnalysisStatus::Processing.as_str())
    .bind(Utc::now().to_rfc3339())
    .bind(id.to_string())
    .execute(pool)
    .await?;

    ensure_transitioned(result.rows_affected(), id, AnalysisStatus::Processing)
}

/// Persist the result and move to `completed`
///
/// Accepted from `pending` as well: a failed `processing` write is non-fatal.
pub async fn complete_analysis(
    pool: &SqlitePool,
    id: Uuid,
    result: &AnalysisResult,
    completed_at: DateTime<Utc>,
) -> Result<()> {
    let requirements = to_json_text(&result.requirements)?;
    let restrictions = to_json_text(&result.restrictions)?;
    let documentation = to_json_text(&result.documentation)?;

    let outcome = sqlx::query(&format!(
        r#"
        UPDATE analyses
        SET hs_code = ?, tariff_rate = ?, requirements = ?, restrictions = ?,
            documentation = ?, estimated_processing_time = ?, confidence_score = ?,
            analysis_text = ?, status = ?, updated_at = ?, completed_at = ?
        WHERE id = ? AND {}
        "#,
        status_guard(AnalysisStatus::Completed)
    ))
    .bind(&result.hs_code)
    .bind(result.tariff_rate)
    .bind(requirements)
    .bind(restrictions)
    .bind(documentation)
    .bind(&result.estimated_processing_time)
    .bind(result.confidence)
    .bind(&result.analysis_text)
    .bind(AnalysisStatus::Completed.as_str())
    .bind(completed_at.to_rfc3339())
    .bind(completed_at.to_rfc3339())
    .bind(id.to_string())
    .execute(pool)
    .await?;

    ensure_transitioned(outcome.rows_affected(), id, AnalysisStatus::Completed)
}

/// Move to `failed`, storing the diagnostic in the narrative column
///
/// Result columns are left NULL.
pub async fn fail_analysis(pool: &SqlitePool, id: Uuid, diagnostic: &str) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    let outcome = sqlx::query(&format!(
        r#"
        UPDATE analyses
        SET analysis_text = ?, status = ?, updated_at = ?, completed_at = ?
        WHERE id = ? AND {}
        "#,
        status_guard(AnalysisStatus::Failed)
    ))
    .bind(diagnostic)
    .bind(AnalysisStatus::Failed.as_str())
    .bind(&now)
    .bind(&now)
    .bind(id.to_string())
    .execute(pool)
    .await?;

    ensure_transitioned(outcome.rows_affected(), id, AnalysisStatus::Failed)
}

/// `status IN (...)` over the predecessors of `target`
fn status_guard(target: AnalysisStatus) -> String {
    let allowed: Vec<String> = AnalysisStatus::predecessors(target)
        .iter()
        .map(|status| format!("'{}'", status.as_str()))
        .collect();
    format!("status IN ({})", allowed.join(", "))
}

fn ensure_transitioned(rows_affected: u64, id: Uuid, target: AnalysisStatus) -> Result<()> {
    if rows_affected == 0 {
        return Err(Error::InvalidState(format!(
            "Analysis {} cannot transition to {} (missing or already terminal)",
            id, target
        )));
    }
    Ok(())
}

/// Load a record by id
pub async fn load_analysis(pool: &SqlitePool, id: Uuid) -> Result<Option<AnalysisRecord>> {
    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_COLUMNS))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.map(|row| record_from_row(&row)).transpose()
}

/// All records owned by a user, newest first
pub async fn list_analyses_for_user(pool: &SqlitePool, user_id: &str) -> Result<Vec<AnalysisRecord>> {
    let rows = sqlx::query(&format!(
        "{} WHERE user_id = ? ORDER BY created_at DESC",
        SELECT_COLUMNS
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(record_from_row).collect()
}

/// Delete a record, returning whether a row was removed
pub async fn delete_analysis(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM analyses WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

fn record_from_row(row: &SqliteRow) -> Result<AnalysisRecord> {
    let id: String = row.get("id");
    let id = Uuid::parse_str(&id)
        .map_err(|e| Error::Internal(format!("Failed to parse analysis id: {}", e)))?;

    let status: String = row.get("status");
    let status = AnalysisStatus::parse(&status)
        .ok_or_else(|| Error::Internal(format!("Unknown analysis status: {}", status)))?;

    let product_category: Option<String> = row.get("product_category");
    let product_category = product_category.as_deref().and_then(ProductCategory::parse);

    let image_path: Option<String> = row.get("product_image_path");
    let image_url: Option<String> = row.get("product_image_url");
    let image = match (image_path, image_url) {
        (Some(path), Some(url)) => Some(StoredImage { path, url }),
        _ => None,
    };

    let analysis_text: Option<String> = row.get("analysis_text");

    let (result, diagnostic) = match status {
        AnalysisStatus::Completed => (Some(result_from_row(row, analysis_text)?), None),
        AnalysisStatus::Failed => (None, analysis_text),
        AnalysisStatus::Pending | AnalysisStatus::Processing => (None, None),
    };

    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");
    let completed_at: Option<String> = row.get("completed_at");

    Ok(AnalysisRecord {
        id,
        user_id: row.get("user_id"),
        product_name: row.get("product_name"),
        product_description: row.get("product_description"),
        product_category,
        origin_country: row.get("origin_country"),
        destination_country: row.get("destination_country"),
        status,
        result,
        diagnostic,
        image,
        created_at: time::parse_rfc3339(&created_at)?,
        updated_at: time::parse_rfc3339(&updated_at)?,
        completed_at: completed_at.as_deref().map(time::parse_rfc3339).transpose()?,
    })
}

fn result_from_row(row: &SqliteRow, analysis_text: Option<String>) -> Result<AnalysisResult> {
    let list = |column: &str| -> Result<Vec<String>> {
        let value: Option<String> = row.get(column);
        match value {
            Some(text) => from_json_text(column, &text),
            None => Ok(Vec::new()),
        }
    };

    Ok(AnalysisResult {
        hs_code: row
            .get::<Option<String>, _>("hs_code")
            .unwrap_or_else(|| crate::models::UNKNOWN.to_string()),
        tariff_rate: row.get::<Option<f64>, _>("tariff_rate").unwrap_or(0.0),
        requirements: list("requirements")?,
        restrictions: list("restrictions")?,
        documentation: list("documentation")?,
        estimated_processing_time: row
            .get::<Option<String>, _>("estimated_processing_time")
            .unwrap_or_else(|| crate::models::UNKNOWN.to_string()),
        confidence: row.get::<Option<f64>, _>("confidence_score").unwrap_or(0.0),
        analysis_text: analysis_text.unwrap_or_default(),
    })
}
