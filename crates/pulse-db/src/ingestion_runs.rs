//! Database operations for `ingestion_runs`.
//!
//! A run is created in `running` status when a cycle starts and moves exactly
//! once to `succeeded`, `partial`, or `failed`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row and value types
// ---------------------------------------------------------------------------

/// A row from the `ingestion_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct IngestionRunRow {
    pub id: i64,
    pub trigger_source: String,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub fetched: i32,
    pub matched: i32,
    pub admitted: i32,
    pub duplicates: i32,
    pub failed_writes: i32,
    pub links: i32,
    pub alerts: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Terminal status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Succeeded,
    /// Completed with skipped writes or an expired deadline.
    Partial,
    Failed,
}

impl RunStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Succeeded => "succeeded",
            RunStatus::Partial => "partial",
            RunStatus::Failed => "failed",
        }
    }
}

/// Counters written when a run finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestionRunCounts {
    pub fetched: i32,
    pub matched: i32,
    pub admitted: i32,
    pub duplicates: i32,
    pub failed_writes: i32,
    pub links: i32,
    pub alerts: i32,
}

const RUN_COLUMNS: &str = "id, trigger_source, status, started_at, completed_at, fetched, \
     matched, admitted, duplicates, failed_writes, links, alerts, error_message, created_at";

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Creates a run in `running` status and returns its id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_ingestion_run(pool: &PgPool, trigger_source: &str) -> Result<i64, DbError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO ingestion_runs (trigger_source, status) \
         VALUES ($1, 'running') \
         RETURNING id",
    )
    .bind(trigger_source)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Moves a `running` run to its terminal status and records its counters.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is not `running`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn finish_ingestion_run(
    pool: &PgPool,
    id: i64,
    status: RunStatus,
    counts: IngestionRunCounts,
    error_message: Option<&str>,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE ingestion_runs \
         SET status = $1, completed_at = NOW(), fetched = $2, matched = $3, admitted = $4, \
             duplicates = $5, failed_writes = $6, links = $7, alerts = $8, error_message = $9 \
         WHERE id = $10 AND status = 'running'",
    )
    .bind(status.as_str())
    .bind(counts.fetched)
    .bind(counts.matched)
    .bind(counts.admitted)
    .bind(counts.duplicates)
    .bind(counts.failed_writes)
    .bind(counts.links)
    .bind(counts.alerts)
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Fetches a single run by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_ingestion_run(pool: &PgPool, id: i64) -> Result<IngestionRunRow, DbError> {
    let sql = format!("SELECT {RUN_COLUMNS} FROM ingestion_runs WHERE id = $1");
    sqlx::query_as::<_, IngestionRunRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

/// Returns the most recent `limit` runs, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_ingestion_runs(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<IngestionRunRow>, DbError> {
    let sql = format!(
        "SELECT {RUN_COLUMNS} FROM ingestion_runs ORDER BY created_at DESC, id DESC LIMIT $1"
    );
    let rows = sqlx::query_as::<_, IngestionRunRow>(&sql)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}
