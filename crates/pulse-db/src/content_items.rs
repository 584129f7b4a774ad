//! Database operations for the `content_items` table.
//!
//! `post_url` is unique; inserts use `ON CONFLICT DO NOTHING` so a racing
//! duplicate resolves to "already admitted" instead of an error.
//!
//! `processed_at` stays NULL until the item has been linked, counted toward
//! alerts, and broadcast. Items left unprocessed by an interrupted cycle are
//! picked up again by the next one.

use chrono::{DateTime, Utc};
use pulse_core::{ContentItem, NewContentItem};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `content_items` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ContentItemRow {
    pub id: i64,
    pub platform_tag: String,
    pub title: String,
    pub content: String,
    pub author_name: Option<String>,
    pub post_url: String,
    pub posted_at: Option<DateTime<Utc>>,
    pub matched_keywords: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<ContentItemRow> for ContentItem {
    fn from(row: ContentItemRow) -> Self {
        ContentItem {
            id: row.id,
            platform_tag: row.platform_tag,
            title: row.title,
            content: row.content,
            author_name: row.author_name,
            post_url: row.post_url,
            posted_at: row.posted_at,
            matched_keywords: row.matched_keywords,
            created_at: row.created_at,
        }
    }
}

/// Optional filters for [`list_content_items`].
#[derive(Debug, Clone, Default)]
pub struct ContentItemFilter {
    pub keyword: Option<String>,
    pub platform: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// Whether an item with this `post_url` has already been admitted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn content_item_exists_by_url(pool: &PgPool, post_url: &str) -> Result<bool, DbError> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM content_items WHERE post_url = $1)")
            .bind(post_url)
            .fetch_one(pool)
            .await?;

    Ok(exists)
}

/// Insert a content item unless its `post_url` already exists.
///
/// Returns `None` when the unique constraint absorbed the insert.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails for any other reason.
pub async fn insert_content_item_if_absent(
    pool: &PgPool,
    item: &NewContentItem,
) -> Result<Option<ContentItemRow>, DbError> {
    let row = sqlx::query_as::<_, ContentItemRow>(
        "INSERT INTO content_items \
             (platform_tag, title, content, author_name, post_url, posted_at, matched_keywords) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         ON CONFLICT (post_url) DO NOTHING \
         RETURNING id, platform_tag, title, content, author_name, post_url, posted_at, \
                   matched_keywords, created_at",
    )
    .bind(&item.platform_tag)
    .bind(&item.title)
    .bind(&item.content)
    .bind(item.author_name.as_deref())
    .bind(&item.post_url)
    .bind(item.posted_at)
    .bind(&item.matched_keywords)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// List admitted items newest first, applying any filters that are set.
///
/// The date range applies to `COALESCE(posted_at, created_at)`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_content_items(
    pool: &PgPool,
    filter: &ContentItemFilter,
    limit: i64,
) -> Result<Vec<ContentItemRow>, DbError> {
    let rows = sqlx::query_as::<_, ContentItemRow>(
        "SELECT id, platform_tag, title, content, author_name, post_url, posted_at, \
                matched_keywords, created_at \
         FROM content_items \
         WHERE ($1::text IS NULL OR $1 = ANY(matched_keywords)) \
           AND ($2::text IS NULL OR platform_tag = $2) \
           AND ($3::timestamptz IS NULL OR COALESCE(posted_at, created_at) >= $3) \
           AND ($4::timestamptz IS NULL OR COALESCE(posted_at, created_at) < $4) \
         ORDER BY COALESCE(posted_at, created_at) DESC, id DESC \
         LIMIT $5",
    )
    .bind(filter.keyword.as_deref())
    .bind(filter.platform.as_deref())
    .bind(filter.from)
    .bind(filter.to)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Admitted items that have not finished linking, alerting, and broadcast,
/// oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_unprocessed_content_items(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<ContentItemRow>, DbError> {
    let rows = sqlx::query_as::<_, ContentItemRow>(
        "SELECT id, platform_tag, title, content, author_name, post_url, posted_at, \
                matched_keywords, created_at \
         FROM content_items \
         WHERE processed_at IS NULL \
         ORDER BY id \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Stamp `processed_at` on the given items. Already-stamped items keep their
/// original timestamp.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn mark_content_items_processed(pool: &PgPool, ids: &[i64]) -> Result<u64, DbError> {
    if ids.is_empty() {
        return Ok(0);
    }
    let result = sqlx::query(
        "UPDATE content_items SET processed_at = NOW() \
         WHERE id = ANY($1) AND processed_at IS NULL",
    )
    .bind(ids)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
