//! Keyword-driven ingestion and alerting pipeline.
//!
//! Each cycle pulls candidates from every source adapter, keeps those that
//! match the active keyword snapshot, admits new URLs through the dedup gate,
//! links admitted items to monitored entities, evaluates per-keyword alerts,
//! and pushes the results to live subscribers through the broadcast hub.

pub mod alerts;
pub mod dedup;
pub mod driver;
pub mod error;
pub mod hub;
pub mod linker;
pub mod matcher;
pub mod orchestrator;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use pulse_core::AppConfig;
use sqlx::PgPool;

pub use dedup::{admit, Admission};
pub use driver::{spawn_driver, Trigger, TriggerHandle, TriggerStatus};
pub use error::{PipelineError, ScorerError, StoreError};
pub use hub::{BroadcastHub, Subscription};
pub use linker::{EntityLinker, HttpScorer, LexiconScorer, SentimentScore, SentimentScorer};
pub use matcher::{match_keywords, KeywordMatcher};
pub use orchestrator::{CycleOutcome, CycleReport, Orchestrator, PipelineSettings, PipelineState};
pub use store::{ContentStore, InsertOutcome, PgStore};

/// Pick the sentiment scorer: the external HTTP scorer when configured,
/// otherwise the built-in lexicon.
///
/// # Errors
///
/// Returns [`ScorerError::Http`] if the HTTP scorer's client cannot be built.
pub fn build_scorer(config: &AppConfig) -> Result<Arc<dyn SentimentScorer>, ScorerError> {
    match &config.scorer_url {
        Some(url) => {
            tracing::info!(url = %url, "using external sentiment scorer");
            let timeout = Duration::from_secs(config.scorer_timeout_secs);
            Ok(Arc::new(HttpScorer::new(url, timeout)?))
        }
        None => {
            tracing::info!("no scorer configured; using built-in lexicon scorer");
            Ok(Arc::new(LexiconScorer))
        }
    }
}

/// Assemble an orchestrator over Postgres with every configured adapter.
///
/// # Errors
///
/// Returns [`PipelineError::Adapters`] or [`PipelineError::Scorer`] if an
/// HTTP client cannot be built.
pub fn build_orchestrator(
    config: &AppConfig,
    pool: PgPool,
) -> Result<Orchestrator, PipelineError> {
    let adapters = pulse_sources::build_adapters(config)?;
    let scorer = build_scorer(config)?;
    let linker = EntityLinker::new(scorer, Duration::from_secs(config.scorer_timeout_secs));
    let store: Arc<dyn ContentStore> = Arc::new(PgStore::new(pool));

    Ok(Orchestrator::new(
        adapters,
        store,
        linker,
        BroadcastHub::new(config.subscriber_buffer),
        PipelineSettings::from_app_config(config),
    ))
}
