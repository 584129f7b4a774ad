//! One ingestion cycle: fetch, match, persist, link, alert, broadcast.
//!
//! States run `Idle → Fetching → Matching → Persisting → Alerting →
//! Broadcasting → Idle`. Only one cycle runs at a time per orchestrator; a
//! second call while one is in flight returns [`CycleOutcome::Skipped`].
//!
//! The whole cycle carries a deadline. When it expires, items already
//! admitted stay committed and the remaining stages are skipped. Such items
//! stay pending in the store until a later cycle links them, counts them
//! toward alerts, and broadcasts them.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::future::join_all;
use pulse_core::{
    AlertPriority, AppConfig, ContentCandidate, ContentItem, Envelope, KeywordAlert,
    KeywordSnapshot,
};
use pulse_db::{IngestionRunCounts, RunStatus};
use pulse_sources::{SourceAdapter, SourceError};
use serde::Serialize;
use tokio::sync::{watch, Mutex};

use crate::alerts::{evaluate, priority_for};
use crate::dedup::{admit, Admission};
use crate::driver::Trigger;
use crate::error::{PipelineError, StoreError};
use crate::hub::BroadcastHub;
use crate::linker::EntityLinker;
use crate::matcher::KeywordMatcher;
use crate::store::ContentStore;

/// Most pending items picked up at the start of one cycle.
const PENDING_BATCH: usize = 500;

/// Observable stage of the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Fetching,
    Matching,
    Persisting,
    Alerting,
    Broadcasting,
}

impl PipelineState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::Fetching => "fetching",
            PipelineState::Matching => "matching",
            PipelineState::Persisting => "persisting",
            PipelineState::Alerting => "alerting",
            PipelineState::Broadcasting => "broadcasting",
        }
    }
}

/// Timing and windowing knobs for a cycle.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// How far back adapters search.
    pub lookback: chrono::Duration,
    pub adapter_timeout: Duration,
    pub cycle_deadline: Duration,
    /// Bound on each individual store call.
    pub store_timeout: Duration,
    /// Number of previous cycles forming the percentage baseline.
    pub baseline_cycles: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            lookback: chrono::Duration::hours(24),
            adapter_timeout: Duration::from_secs(20),
            cycle_deadline: Duration::from_secs(120),
            store_timeout: Duration::from_secs(10),
            baseline_cycles: 6,
        }
    }
}

impl PipelineSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            lookback: chrono::Duration::hours(config.lookback_hours),
            adapter_timeout: Duration::from_secs(config.adapter_timeout_secs),
            cycle_deadline: Duration::from_secs(config.cycle_deadline_secs),
            store_timeout: Duration::from_secs(config.store_timeout_secs),
            baseline_cycles: config.baseline_cycles,
        }
    }
}

/// Counters and notes for one completed cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub trigger: Trigger,
    pub run_id: Option<i64>,
    pub keywords: usize,
    pub fetched: usize,
    /// Unique URLs matching at least one keyword.
    pub matched: usize,
    pub admitted: usize,
    /// Items admitted by an interrupted earlier cycle and finished in this one.
    pub resumed: usize,
    /// In-cycle repeats plus URLs already stored.
    pub duplicates: usize,
    pub failed_writes: usize,
    pub links: usize,
    pub alerts: usize,
    pub failed_adapters: Vec<String>,
    pub deadline_expired: bool,
}

impl CycleReport {
    fn new(trigger: Trigger) -> Self {
        Self {
            trigger,
            run_id: None,
            keywords: 0,
            fetched: 0,
            matched: 0,
            admitted: 0,
            resumed: 0,
            duplicates: 0,
            failed_writes: 0,
            links: 0,
            alerts: 0,
            failed_adapters: Vec::new(),
            deadline_expired: false,
        }
    }

    #[must_use]
    pub fn status(&self) -> RunStatus {
        if self.deadline_expired || self.failed_writes > 0 || !self.failed_adapters.is_empty() {
            RunStatus::Partial
        } else {
            RunStatus::Succeeded
        }
    }

    fn notes(&self) -> Option<String> {
        let mut notes = Vec::new();
        if !self.failed_adapters.is_empty() {
            notes.push(format!("adapters failed: {}", self.failed_adapters.join(", ")));
        }
        if self.failed_writes > 0 {
            notes.push(format!("{} item writes failed", self.failed_writes));
        }
        if self.deadline_expired {
            notes.push("cycle deadline expired".to_string());
        }
        (!notes.is_empty()).then(|| notes.join("; "))
    }

    fn counts(&self) -> IngestionRunCounts {
        let c = |n: usize| i32::try_from(n).unwrap_or(i32::MAX);
        IngestionRunCounts {
            fetched: c(self.fetched),
            matched: c(self.matched),
            admitted: c(self.admitted),
            duplicates: c(self.duplicates),
            failed_writes: c(self.failed_writes),
            links: c(self.links),
            alerts: c(self.alerts),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed(CycleReport),
    /// Another cycle was already in flight.
    Skipped,
}

/// Resets the observable state to `Idle` however the cycle ends.
struct IdleOnDrop<'a>(&'a watch::Sender<PipelineState>);

impl Drop for IdleOnDrop<'_> {
    fn drop(&mut self) {
        self.0.send_replace(PipelineState::Idle);
    }
}

async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or(Err(StoreError::Timeout(limit)))
}

/// Drives ingestion cycles over a fixed set of adapters.
pub struct Orchestrator {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    store: Arc<dyn ContentStore>,
    linker: EntityLinker,
    hub: BroadcastHub,
    settings: PipelineSettings,
    in_flight: Mutex<()>,
    state: watch::Sender<PipelineState>,
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        adapters: Vec<Arc<dyn SourceAdapter>>,
        store: Arc<dyn ContentStore>,
        linker: EntityLinker,
        hub: BroadcastHub,
        settings: PipelineSettings,
    ) -> Self {
        let (state, _) = watch::channel(PipelineState::Idle);
        Self {
            adapters,
            store,
            linker,
            hub,
            settings,
            in_flight: Mutex::new(()),
            state,
        }
    }

    #[must_use]
    pub fn hub(&self) -> &BroadcastHub {
        &self.hub
    }

    #[must_use]
    pub fn state(&self) -> PipelineState {
        *self.state.borrow()
    }

    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn adapter_names(&self) -> Vec<&'static str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }

    fn enter(&self, state: PipelineState) {
        self.state.send_replace(state);
        tracing::debug!(state = state.as_str(), "pipeline state");
    }

    /// Run one cycle, or skip if one is already in flight.
    ///
    /// Provider, persistence, scorer, and broadcast failures are logged and
    /// counted in the report; they never fail the cycle.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::KeywordRegistry`] if the active keywords
    /// cannot be read. The run is recorded as failed.
    pub async fn run_cycle(&self, trigger: Trigger) -> Result<CycleOutcome, PipelineError> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            tracing::info!(%trigger, "ingestion cycle already in flight; skipping");
            return Ok(CycleOutcome::Skipped);
        };
        let _idle = IdleOnDrop(&self.state);

        let started = Instant::now();
        let deadline = tokio::time::Instant::now() + self.settings.cycle_deadline;
        let limit = self.settings.store_timeout;
        let mut report = CycleReport::new(trigger);

        report.run_id = match bounded(limit, self.store.begin_run(trigger)).await {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(%trigger, error = %e, "failed to record ingestion run start");
                None
            }
        };
        tracing::info!(%trigger, run_id = ?report.run_id, "ingestion cycle started");

        let keywords = match bounded(limit, self.store.read_active_keywords()).await {
            Ok(keywords) => keywords,
            Err(e) => {
                tracing::error!(
                    %trigger,
                    error = %e,
                    "failed to read keyword registry; aborting cycle"
                );
                let message = format!("keyword registry unavailable: {e}");
                self.finish_run(&report, RunStatus::Failed, Some(&message)).await;
                return Err(PipelineError::KeywordRegistry(e));
            }
        };

        let snapshot = KeywordSnapshot::new(keywords);
        report.keywords = snapshot.len();

        if snapshot.is_empty() {
            tracing::info!(%trigger, "no active keywords; nothing to match this cycle");
        } else {
            let stages = self.run_stages(&snapshot, &mut report);
            if tokio::time::timeout_at(deadline, stages).await.is_err() {
                report.deadline_expired = true;
                tracing::warn!(
                    %trigger,
                    deadline_secs = self.settings.cycle_deadline.as_secs(),
                    admitted = report.admitted,
                    "cycle deadline expired; remaining stages skipped"
                );
            }
        }

        let notes = report.notes();
        self.finish_run(&report, report.status(), notes.as_deref()).await;

        tracing::info!(
            %trigger,
            run_id = ?report.run_id,
            status = report.status().as_str(),
            fetched = report.fetched,
            matched = report.matched,
            admitted = report.admitted,
            resumed = report.resumed,
            duplicates = report.duplicates,
            failed_writes = report.failed_writes,
            links = report.links,
            alerts = report.alerts,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "ingestion cycle finished"
        );

        Ok(CycleOutcome::Completed(report))
    }

    async fn run_stages(&self, snapshot: &KeywordSnapshot, report: &mut CycleReport) {
        self.enter(PipelineState::Fetching);
        let mut batch = self.load_pending(report).await;
        let since = Utc::now() - self.settings.lookback;
        let candidates = self.fetch_all(&snapshot.words(), since, report).await;
        report.fetched = candidates.len();

        self.enter(PipelineState::Matching);
        let matched = Self::match_unique(snapshot, candidates, report);
        report.matched = matched.len();

        self.enter(PipelineState::Persisting);
        batch.extend(self.persist(matched, report).await);
        let sentiment = self.link_entities(&batch, report).await;

        self.enter(PipelineState::Alerting);
        let alerts = self.evaluate_alerts(snapshot, &batch, &sentiment, report).await;

        self.enter(PipelineState::Broadcasting);
        let ids: Vec<i64> = batch.iter().map(|item| item.id).collect();
        // Items go out before the alerts they may have triggered.
        for item in batch {
            self.hub.publish(Envelope::NewItem { item });
        }
        for (alert, keyword) in alerts {
            self.hub.publish(Envelope::NewAlert { alert, keyword });
        }
        self.mark_processed(&ids).await;
    }

    async fn load_pending(&self, report: &mut CycleReport) -> Vec<ContentItem> {
        let call = self.store.pending_items(PENDING_BATCH);
        match bounded(self.settings.store_timeout, call).await {
            Ok(items) => {
                report.resumed = items.len();
                if !items.is_empty() {
                    tracing::info!(
                        count = items.len(),
                        "resuming items left unprocessed by an earlier cycle"
                    );
                }
                items
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to read pending items; resuming them later");
                Vec::new()
            }
        }
    }

    async fn mark_processed(&self, ids: &[i64]) {
        if ids.is_empty() {
            return;
        }
        let call = self.store.mark_processed(ids);
        if let Err(e) = bounded(self.settings.store_timeout, call).await {
            tracing::warn!(
                count = ids.len(),
                error = %e,
                "failed to mark items processed; they will be replayed next cycle"
            );
        }
    }

    async fn fetch_all(
        &self,
        words: &[String],
        since: chrono::DateTime<Utc>,
        report: &mut CycleReport,
    ) -> Vec<ContentCandidate> {
        let limit = self.settings.adapter_timeout;
        let fetches = self.adapters.iter().map(|adapter| async move {
            let provider = adapter.name();
            let result = tokio::time::timeout(limit, adapter.fetch(words, since))
                .await
                .unwrap_or(Err(SourceError::Timeout {
                    provider,
                    secs: limit.as_secs(),
                }));
            (provider, result)
        });

        let mut candidates = Vec::new();
        for (provider, result) in join_all(fetches).await {
            match result {
                Ok(found) => {
                    tracing::debug!(provider, count = found.len(), "adapter fetch finished");
                    candidates.extend(found);
                }
                Err(e) => {
                    tracing::warn!(
                        provider,
                        error = %e,
                        "adapter fetch failed; continuing without it"
                    );
                    report.failed_adapters.push(provider.to_string());
                }
            }
        }
        candidates
    }

    /// Keep candidates matching at least one keyword, first occurrence per URL.
    fn match_unique(
        snapshot: &KeywordSnapshot,
        candidates: Vec<ContentCandidate>,
        report: &mut CycleReport,
    ) -> Vec<(ContentCandidate, Vec<String>)> {
        let matcher = KeywordMatcher::new(snapshot);
        let mut seen = HashSet::new();
        let mut matched = Vec::new();

        for candidate in candidates {
            let words: Vec<String> = matcher
                .matches(&candidate)
                .into_iter()
                .map(|k| k.word.clone())
                .collect();
            if words.is_empty() {
                continue;
            }
            if !seen.insert(candidate.canonical_url.clone()) {
                report.duplicates += 1;
                continue;
            }
            matched.push((candidate, words));
        }
        matched
    }

    async fn persist(
        &self,
        matched: Vec<(ContentCandidate, Vec<String>)>,
        report: &mut CycleReport,
    ) -> Vec<ContentItem> {
        let limit = self.settings.store_timeout;
        let mut admitted = Vec::new();

        for (candidate, words) in matched {
            match bounded(limit, admit(self.store.as_ref(), &candidate, words)).await {
                Ok(Admission::Admitted(item)) => {
                    report.admitted += 1;
                    admitted.push(item);
                }
                Ok(Admission::Duplicate) => report.duplicates += 1,
                Err(e) => {
                    report.failed_writes += 1;
                    tracing::error!(
                        url = %candidate.canonical_url,
                        error = %e,
                        "failed to persist item; it will be retried next cycle"
                    );
                }
            }
        }
        admitted
    }

    /// Link every item in `batch`, returning the most negative stored
    /// sentiment score per item id.
    async fn link_entities(
        &self,
        batch: &[ContentItem],
        report: &mut CycleReport,
    ) -> HashMap<i64, f64> {
        let mut sentiment = HashMap::new();
        if batch.is_empty() {
            return sentiment;
        }
        let limit = self.settings.store_timeout;
        let entities = match bounded(limit, self.store.read_active_entities()).await {
            Ok(entities) => entities,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read monitored entities; skipping linking");
                return sentiment;
            }
        };
        if entities.is_empty() {
            return sentiment;
        }

        for item in batch {
            for link in self.linker.link(item, &entities).await {
                let stored = match bounded(limit, self.store.insert_entity_link(&link)).await {
                    Ok(inserted) => {
                        if inserted {
                            report.links += 1;
                        }
                        true
                    }
                    Err(e) => {
                        tracing::warn!(
                            item = link.content_item_id,
                            entity = link.entity_id,
                            error = %e,
                            "failed to store entity link"
                        );
                        false
                    }
                };
                if let (true, Some(score)) = (stored, link.sentiment_score) {
                    sentiment
                        .entry(link.content_item_id)
                        .and_modify(|lowest: &mut f64| *lowest = lowest.min(score))
                        .or_insert(score);
                }
            }
        }
        sentiment
    }

    async fn evaluate_alerts(
        &self,
        snapshot: &KeywordSnapshot,
        batch: &[ContentItem],
        sentiment: &HashMap<i64, f64>,
        report: &mut CycleReport,
    ) -> Vec<(KeywordAlert, String)> {
        let limit = self.settings.store_timeout;

        let mut per_keyword: HashMap<&str, Vec<ContentItem>> = HashMap::new();
        for item in batch {
            for word in &item.matched_keywords {
                per_keyword.entry(word.as_str()).or_default().push(item.clone());
            }
        }

        let ids: Vec<i64> = snapshot.iter().map(|k| k.id).collect();
        let lookup = self
            .store
            .recent_keyword_counts(&ids, self.settings.baseline_cycles);
        let history = match bounded(limit, lookup).await {
            Ok(history) => history,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "failed to read keyword baselines; percentage rules skipped"
                );
                HashMap::new()
            }
        };

        let mut alerts = Vec::new();
        let mut counts = Vec::with_capacity(snapshot.len());

        for keyword in snapshot.iter() {
            let items = per_keyword
                .get(keyword.word.as_str())
                .map_or(&[][..], Vec::as_slice);
            counts.push((keyword.id, i32::try_from(items.len()).unwrap_or(i32::MAX)));

            let trailing = history.get(&keyword.id).map_or(&[][..], Vec::as_slice);
            let Some(mut new_alert) = evaluate(keyword, items, trailing) else {
                continue;
            };
            new_alert.priority = priority_for(new_alert.content_item_id, sentiment);

            match bounded(limit, self.store.insert_alert(&new_alert)).await {
                Ok(alert) => {
                    report.alerts += 1;
                    tracing::info!(
                        keyword = %keyword.word,
                        trigger = %alert.trigger,
                        observed = alert.observed_count,
                        baseline = ?alert.baseline,
                        priority = alert.priority.map_or("none", AlertPriority::as_str),
                        "keyword alert raised"
                    );
                    alerts.push((alert, keyword.word.clone()));
                }
                Err(e) => {
                    tracing::error!(
                        keyword = %keyword.word,
                        error = %e,
                        "failed to store keyword alert"
                    );
                }
            }
        }

        // Recorded after evaluation so a cycle never counts toward its own baseline.
        if let Some(run_id) = report.run_id {
            let record = self.store.record_keyword_counts(run_id, &counts);
            if let Err(e) = bounded(limit, record).await {
                tracing::warn!(run_id, error = %e, "failed to record keyword cycle counts");
            }
        }

        alerts
    }

    async fn finish_run(&self, report: &CycleReport, status: RunStatus, message: Option<&str>) {
        let Some(run_id) = report.run_id else {
            return;
        };
        let call = self
            .store
            .finish_run(run_id, status, report.counts(), message);
        if let Err(e) = bounded(self.settings.store_timeout, call).await {
            tracing::warn!(run_id, error = %e, "failed to record ingestion run outcome");
        }
    }
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;
