//! Read access to the `keywords` registry.

use chrono::{DateTime, Utc};
use pulse_core::Keyword;
use sqlx::PgPool;

use crate::DbError;

/// A row from the `keywords` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct KeywordRow {
    pub id: i64,
    pub word: String,
    pub category: Option<String>,
    pub is_active: bool,
    pub alert_threshold: Option<i32>,
    pub change_percentage: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl From<KeywordRow> for Keyword {
    fn from(row: KeywordRow) -> Self {
        Keyword {
            id: row.id,
            word: row.word,
            category: row.category,
            is_active: row.is_active,
            alert_threshold: row.alert_threshold,
            change_percentage: row.change_percentage,
            created_at: row.created_at,
        }
    }
}

/// Returns all active keywords ordered by `id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_keywords(pool: &PgPool) -> Result<Vec<KeywordRow>, DbError> {
    let rows = sqlx::query_as::<_, KeywordRow>(
        "SELECT id, word, category, is_active, alert_threshold, change_percentage, created_at \
         FROM keywords \
         WHERE is_active = true \
         ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
