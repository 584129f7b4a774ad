//! In-memory [`ContentStore`] for orchestrator tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use pulse_core::{
    ContentItem, EntityLink, Keyword, KeywordAlert, MonitoredEntity, NewContentItem,
    NewKeywordAlert,
};
use pulse_db::{IngestionRunCounts, RunStatus};

use super::{ContentStore, InsertOutcome};
use crate::driver::Trigger;
use crate::error::StoreError;

#[derive(Debug, Clone)]
pub(crate) struct RecordedRun {
    pub trigger: Trigger,
    pub status: Option<RunStatus>,
    pub counts: IngestionRunCounts,
    pub error_message: Option<String>,
}

#[derive(Debug, Default)]
pub(crate) struct MemoryState {
    pub keywords: Vec<Keyword>,
    pub entities: Vec<MonitoredEntity>,
    pub items: Vec<ContentItem>,
    pub processed: HashSet<i64>,
    pub links: Vec<EntityLink>,
    pub alerts: Vec<KeywordAlert>,
    /// (run id, keyword id, count) in insertion order.
    pub counts: Vec<(i64, i64, i32)>,
    pub runs: Vec<RecordedRun>,
    pub exists_calls: usize,
    pub insert_calls: usize,
    pub fail_keyword_reads: bool,
    pub fail_insert_urls: HashSet<String>,
    /// URLs whose existence check lies, simulating a concurrent writer.
    pub stale_exists_urls: HashSet<String>,
    pub insert_delay: Option<Duration>,
}

#[derive(Debug, Default)]
pub(crate) struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn with_keywords(keywords: Vec<Keyword>) -> Self {
        let store = Self::default();
        store.state().keywords = keywords;
        store
    }

    pub fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().expect("memory store lock poisoned")
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn read_active_keywords(&self) -> Result<Vec<Keyword>, StoreError> {
        let state = self.state();
        if state.fail_keyword_reads {
            return Err(StoreError::Unavailable("keywords table unreachable".to_string()));
        }
        Ok(state.keywords.iter().filter(|k| k.is_active).cloned().collect())
    }

    async fn read_active_entities(&self) -> Result<Vec<MonitoredEntity>, StoreError> {
        Ok(self.state().entities.iter().filter(|e| e.is_active).cloned().collect())
    }

    async fn exists_by_url(&self, url: &str) -> Result<bool, StoreError> {
        let mut state = self.state();
        state.exists_calls += 1;
        if state.stale_exists_urls.contains(url) {
            return Ok(false);
        }
        Ok(state.items.iter().any(|i| i.post_url == url))
    }

    async fn insert_item(&self, item: &NewContentItem) -> Result<InsertOutcome, StoreError> {
        let delay = self.state().insert_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        state.insert_calls += 1;
        if state.fail_insert_urls.contains(&item.post_url) {
            return Err(StoreError::Unavailable("write rejected".to_string()));
        }
        if state.items.iter().any(|i| i.post_url == item.post_url) {
            return Ok(InsertOutcome::Conflict);
        }

        let id = i64::try_from(state.items.len()).unwrap_or(i64::MAX) + 1;
        let stored = ContentItem {
            id,
            platform_tag: item.platform_tag.clone(),
            title: item.title.clone(),
            content: item.content.clone(),
            author_name: item.author_name.clone(),
            post_url: item.post_url.clone(),
            posted_at: item.posted_at,
            matched_keywords: item.matched_keywords.clone(),
            created_at: Utc::now(),
        };
        state.items.push(stored.clone());
        Ok(InsertOutcome::Inserted(stored))
    }

    async fn pending_items(&self, limit: usize) -> Result<Vec<ContentItem>, StoreError> {
        let state = self.state();
        Ok(state
            .items
            .iter()
            .filter(|i| !state.processed.contains(&i.id))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn mark_processed(&self, item_ids: &[i64]) -> Result<(), StoreError> {
        self.state().processed.extend(item_ids.iter().copied());
        Ok(())
    }

    async fn insert_entity_link(&self, link: &EntityLink) -> Result<bool, StoreError> {
        let mut state = self.state();
        let exists = state
            .links
            .iter()
            .any(|l| l.content_item_id == link.content_item_id && l.entity_id == link.entity_id);
        if exists {
            return Ok(false);
        }
        state.links.push(link.clone());
        Ok(true)
    }

    async fn insert_alert(&self, alert: &NewKeywordAlert) -> Result<KeywordAlert, StoreError> {
        let mut state = self.state();
        let stored = KeywordAlert {
            id: i64::try_from(state.alerts.len()).unwrap_or(i64::MAX) + 1,
            keyword_id: alert.keyword_id,
            content_item_id: alert.content_item_id,
            detected_at: Utc::now(),
            is_read: false,
            alert_sent: false,
            trigger: alert.trigger,
            observed_count: alert.observed_count,
            baseline: alert.baseline,
            priority: alert.priority,
        };
        state.alerts.push(stored.clone());
        Ok(stored)
    }

    async fn recent_keyword_counts(
        &self,
        keyword_ids: &[i64],
        cycles: usize,
    ) -> Result<HashMap<i64, Vec<i32>>, StoreError> {
        let state = self.state();
        let mut history: HashMap<i64, Vec<i32>> = HashMap::new();
        for (_, keyword_id, count) in state.counts.iter().rev() {
            if !keyword_ids.contains(keyword_id) {
                continue;
            }
            let entry = history.entry(*keyword_id).or_default();
            if entry.len() < cycles {
                entry.push(*count);
            }
        }
        Ok(history)
    }

    async fn record_keyword_counts(
        &self,
        run_id: i64,
        counts: &[(i64, i32)],
    ) -> Result<(), StoreError> {
        let mut state = self.state();
        state
            .counts
            .extend(counts.iter().map(|(keyword_id, count)| (run_id, *keyword_id, *count)));
        Ok(())
    }

    async fn begin_run(&self, trigger: Trigger) -> Result<i64, StoreError> {
        let mut state = self.state();
        state.runs.push(RecordedRun {
            trigger,
            status: None,
            counts: IngestionRunCounts::default(),
            error_message: None,
        });
        Ok(i64::try_from(state.runs.len()).unwrap_or(i64::MAX))
    }

    async fn finish_run(
        &self,
        run_id: i64,
        status: RunStatus,
        counts: IngestionRunCounts,
        error_message: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut state = self.state();
        let index = usize::try_from(run_id - 1)
            .map_err(|_| StoreError::Unavailable(format!("unknown run {run_id}")))?;
        let run = state
            .runs
            .get_mut(index)
            .ok_or_else(|| StoreError::Unavailable(format!("unknown run {run_id}")))?;
        run.status = Some(status);
        run.counts = counts;
        run.error_message = error_message.map(str::to_string);
        Ok(())
    }
}
