use std::collections::HashMap;

use async_trait::async_trait;
use pulse_core::{
    ContentItem, EntityLink, Keyword, KeywordAlert, MonitoredEntity, NewContentItem,
    NewKeywordAlert,
};
use pulse_db::{IngestionRunCounts, RunStatus};
use sqlx::PgPool;

use super::{ContentStore, InsertOutcome};
use crate::driver::Trigger;
use crate::error::StoreError;

/// [`ContentStore`] backed by the `pulse-db` Postgres operations.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ContentStore for PgStore {
    async fn read_active_keywords(&self) -> Result<Vec<Keyword>, StoreError> {
        let rows = pulse_db::list_active_keywords(&self.pool).await?;
        Ok(rows.into_iter().map(Keyword::from).collect())
    }

    async fn read_active_entities(&self) -> Result<Vec<MonitoredEntity>, StoreError> {
        let rows = pulse_db::list_active_entities(&self.pool).await?;
        Ok(rows.into_iter().map(MonitoredEntity::from).collect())
    }

    async fn exists_by_url(&self, url: &str) -> Result<bool, StoreError> {
        Ok(pulse_db::content_item_exists_by_url(&self.pool, url).await?)
    }

    async fn insert_item(&self, item: &NewContentItem) -> Result<InsertOutcome, StoreError> {
        let row = pulse_db::insert_content_item_if_absent(&self.pool, item).await?;
        Ok(match row {
            Some(row) => InsertOutcome::Inserted(ContentItem::from(row)),
            None => InsertOutcome::Conflict,
        })
    }

    async fn pending_items(&self, limit: usize) -> Result<Vec<ContentItem>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = pulse_db::list_unprocessed_content_items(&self.pool, limit).await?;
        Ok(rows.into_iter().map(ContentItem::from).collect())
    }

    async fn mark_processed(&self, item_ids: &[i64]) -> Result<(), StoreError> {
        pulse_db::mark_content_items_processed(&self.pool, item_ids).await?;
        Ok(())
    }

    async fn insert_entity_link(&self, link: &EntityLink) -> Result<bool, StoreError> {
        Ok(pulse_db::insert_entity_link(&self.pool, link).await?)
    }

    async fn insert_alert(&self, alert: &NewKeywordAlert) -> Result<KeywordAlert, StoreError> {
        let row = pulse_db::insert_alert(&self.pool, alert).await?;
        Ok(row.into_alert()?)
    }

    async fn recent_keyword_counts(
        &self,
        keyword_ids: &[i64],
        cycles: usize,
    ) -> Result<HashMap<i64, Vec<i32>>, StoreError> {
        let cycles = i64::try_from(cycles).unwrap_or(i64::MAX);
        Ok(pulse_db::list_recent_keyword_counts(&self.pool, keyword_ids, cycles).await?)
    }

    async fn record_keyword_counts(
        &self,
        run_id: i64,
        counts: &[(i64, i32)],
    ) -> Result<(), StoreError> {
        Ok(pulse_db::record_keyword_counts(&self.pool, run_id, counts).await?)
    }

    async fn begin_run(&self, trigger: Trigger) -> Result<i64, StoreError> {
        Ok(pulse_db::create_ingestion_run(&self.pool, trigger.as_str()).await?)
    }

    async fn finish_run(
        &self,
        run_id: i64,
        status: RunStatus,
        counts: IngestionRunCounts,
        error_message: Option<&str>,
    ) -> Result<(), StoreError> {
        Ok(pulse_db::finish_ingestion_run(&self.pool, run_id, status, counts, error_message).await?)
    }
}
