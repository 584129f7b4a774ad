//! Database operations for `monitored_entities` and `entity_links`.

use pulse_core::{EntityLink, MonitoredEntity};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `monitored_entities` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MonitoredEntityRow {
    pub id: i64,
    pub name: String,
    pub native_name: Option<String>,
    pub entity_type: String,
    pub aliases: Vec<String>,
    pub is_active: bool,
}

impl From<MonitoredEntityRow> for MonitoredEntity {
    fn from(row: MonitoredEntityRow) -> Self {
        MonitoredEntity {
            id: row.id,
            name: row.name,
            native_name: row.native_name,
            entity_type: row.entity_type,
            aliases: row.aliases,
            is_active: row.is_active,
        }
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Returns all active monitored entities ordered by `id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_entities(pool: &PgPool) -> Result<Vec<MonitoredEntityRow>, DbError> {
    let rows = sqlx::query_as::<_, MonitoredEntityRow>(
        "SELECT id, name, native_name, entity_type, aliases, is_active \
         FROM monitored_entities \
         WHERE is_active = true \
         ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Insert an entity link, ignoring an existing link for the same pair.
///
/// Scores are rounded to the `NUMERIC(6,3)` column scale. Returns `true`
/// when a new row was written.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_entity_link(pool: &PgPool, link: &EntityLink) -> Result<bool, DbError> {
    let to_numeric = |v: Option<f64>| v.and_then(Decimal::from_f64).map(|d| d.round_dp(3));

    let result = sqlx::query(
        "INSERT INTO entity_links \
             (content_item_id, entity_id, mention_type, sentiment_score, sentiment_confidence) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (content_item_id, entity_id) DO NOTHING",
    )
    .bind(link.content_item_id)
    .bind(link.entity_id)
    .bind(link.mention_type.map(pulse_core::MentionType::as_str))
    .bind(to_numeric(link.sentiment_score))
    .bind(to_numeric(link.sentiment_confidence))
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
