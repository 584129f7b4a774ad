//! Persistence boundary consumed by the orchestrator.

mod postgres;

#[cfg(test)]
pub(crate) mod memory;

use std::collections::HashMap;

use async_trait::async_trait;
use pulse_core::{
    ContentItem, EntityLink, Keyword, KeywordAlert, MonitoredEntity, NewContentItem,
    NewKeywordAlert,
};
use pulse_db::{IngestionRunCounts, RunStatus};

use crate::driver::Trigger;
use crate::error::StoreError;

pub use postgres::PgStore;

/// Result of an insert keyed by the unique post URL.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    Inserted(ContentItem),
    /// Another writer stored the URL first.
    Conflict,
}

/// Everything the pipeline reads from or writes to the relational store.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn read_active_keywords(&self) -> Result<Vec<Keyword>, StoreError>;

    async fn read_active_entities(&self) -> Result<Vec<MonitoredEntity>, StoreError>;

    async fn exists_by_url(&self, url: &str) -> Result<bool, StoreError>;

    async fn insert_item(&self, item: &NewContentItem) -> Result<InsertOutcome, StoreError>;

    /// Admitted items whose linking, alerting, or broadcast never finished,
    /// oldest first.
    async fn pending_items(&self, limit: usize) -> Result<Vec<ContentItem>, StoreError>;

    async fn mark_processed(&self, item_ids: &[i64]) -> Result<(), StoreError>;

    /// Returns `false` when the (item, entity) pair was already linked.
    async fn insert_entity_link(&self, link: &EntityLink) -> Result<bool, StoreError>;

    async fn insert_alert(&self, alert: &NewKeywordAlert) -> Result<KeywordAlert, StoreError>;

    /// Up to `cycles` previous per-cycle counts per keyword, newest first.
    async fn recent_keyword_counts(
        &self,
        keyword_ids: &[i64],
        cycles: usize,
    ) -> Result<HashMap<i64, Vec<i32>>, StoreError>;

    async fn record_keyword_counts(
        &self,
        run_id: i64,
        counts: &[(i64, i32)],
    ) -> Result<(), StoreError>;

    async fn begin_run(&self, trigger: Trigger) -> Result<i64, StoreError>;

    async fn finish_run(
        &self,
        run_id: i64,
        status: RunStatus,
        counts: IngestionRunCounts,
        error_message: Option<&str>,
    ) -> Result<(), StoreError>;
}
