//! Database operations for the `keyword_alerts` table.

use chrono::{DateTime, Utc};
use pulse_core::{AlertPriority, AlertTrigger, KeywordAlert, NewKeywordAlert};
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `keyword_alerts` table, joined with the keyword's word.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct KeywordAlertRow {
    pub id: i64,
    pub keyword_id: i64,
    pub keyword: String,
    pub content_item_id: Option<i64>,
    pub detected_at: DateTime<Utc>,
    pub is_read: bool,
    pub alert_sent: bool,
    pub trigger_kind: String,
    pub observed_count: i32,
    pub baseline: Option<f64>,
    pub priority: Option<String>,
}

impl KeywordAlertRow {
    /// Convert into the domain type.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidValue`] if `trigger_kind` or `priority` holds
    /// an unknown value.
    pub fn into_alert(self) -> Result<KeywordAlert, DbError> {
        let trigger = self
            .trigger_kind
            .parse::<AlertTrigger>()
            .map_err(|_| DbError::InvalidValue {
                column: "trigger_kind",
                value: self.trigger_kind.clone(),
            })?;
        let priority = self
            .priority
            .as_deref()
            .map(str::parse::<AlertPriority>)
            .transpose()
            .map_err(|_| DbError::InvalidValue {
                column: "priority",
                value: self.priority.clone().unwrap_or_default(),
            })?;

        Ok(KeywordAlert {
            id: self.id,
            keyword_id: self.keyword_id,
            content_item_id: self.content_item_id,
            detected_at: self.detected_at,
            is_read: self.is_read,
            alert_sent: self.alert_sent,
            trigger,
            observed_count: self.observed_count,
            baseline: self.baseline,
            priority,
        })
    }
}

const ALERT_COLUMNS: &str = "a.id, a.keyword_id, k.word AS keyword, a.content_item_id, \
     a.detected_at, a.is_read, a.alert_sent, a.trigger_kind, a.observed_count, a.baseline, \
     a.priority";

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Insert a new alert and return the stored row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including a dangling
/// `keyword_id`).
pub async fn insert_alert(
    pool: &PgPool,
    alert: &NewKeywordAlert,
) -> Result<KeywordAlertRow, DbError> {
    let sql = format!(
        "WITH inserted AS ( \
             INSERT INTO keyword_alerts \
                 (keyword_id, content_item_id, trigger_kind, observed_count, baseline, \
                  priority) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING * \
         ) \
         SELECT {ALERT_COLUMNS} FROM inserted a JOIN keywords k ON k.id = a.keyword_id"
    );

    let row = sqlx::query_as::<_, KeywordAlertRow>(&sql)
        .bind(alert.keyword_id)
        .bind(alert.content_item_id)
        .bind(alert.trigger.as_str())
        .bind(alert.observed_count)
        .bind(alert.baseline)
        .bind(alert.priority.map(AlertPriority::as_str))
        .fetch_one(pool)
        .await?;

    Ok(row)
}

/// Fetch a single alert by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no alert has this id, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_alert(pool: &PgPool, id: i64) -> Result<KeywordAlertRow, DbError> {
    let sql = format!(
        "SELECT {ALERT_COLUMNS} FROM keyword_alerts a JOIN keywords k ON k.id = a.keyword_id \
         WHERE a.id = $1"
    );

    sqlx::query_as::<_, KeywordAlertRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

/// List alerts newest first, optionally only unread ones.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_alerts(
    pool: &PgPool,
    unread_only: bool,
    limit: i64,
) -> Result<Vec<KeywordAlertRow>, DbError> {
    let sql = format!(
        "SELECT {ALERT_COLUMNS} FROM keyword_alerts a JOIN keywords k ON k.id = a.keyword_id \
         WHERE ($1::boolean = false OR a.is_read = false) \
         ORDER BY a.detected_at DESC, a.id DESC \
         LIMIT $2"
    );

    let rows = sqlx::query_as::<_, KeywordAlertRow>(&sql)
        .bind(unread_only)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Mark an alert as read. Already-read alerts are returned unchanged;
/// there is no path back to unread.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no alert has this id, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn mark_alert_read(pool: &PgPool, id: i64) -> Result<KeywordAlertRow, DbError> {
    let result = sqlx::query("UPDATE keyword_alerts SET is_read = true WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    get_alert(pool, id).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(trigger_kind: &str) -> KeywordAlertRow {
        KeywordAlertRow {
            id: 1,
            keyword_id: 2,
            keyword: "solar".to_string(),
            content_item_id: Some(3),
            detected_at: Utc::now(),
            is_read: false,
            alert_sent: false,
            trigger_kind: trigger_kind.to_string(),
            observed_count: 5,
            baseline: None,
            priority: Some("high".to_string()),
        }
    }

    #[test]
    fn into_alert_parses_trigger_kind() {
        let alert = row("spike").into_alert().unwrap();
        assert_eq!(alert.trigger, AlertTrigger::Spike);
        assert_eq!(alert.content_item_id, Some(3));
        assert_eq!(alert.observed_count, 5);
        assert_eq!(alert.priority, Some(AlertPriority::High));
    }

    #[test]
    fn into_alert_rejects_unknown_trigger_kind() {
        let err = row("surge").into_alert().unwrap_err();
        assert!(matches!(err, DbError::InvalidValue { column: "trigger_kind", .. }));
    }

    #[test]
    fn into_alert_handles_missing_and_unknown_priority() {
        let mut unscored = row("threshold");
        unscored.priority = None;
        assert_eq!(unscored.into_alert().unwrap().priority, None);

        let mut urgent = row("threshold");
        urgent.priority = Some("urgent".to_string());
        let err = urgent.into_alert().unwrap_err();
        assert!(matches!(err, DbError::InvalidValue { column: "priority", .. }));
    }
}
