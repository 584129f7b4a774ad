use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pulse_core::{AppConfig, ContentCandidate};
use reqwest::{Client, Url};

use crate::error::SourceError;

/// One external content provider, normalized to [`ContentCandidate`]s.
///
/// Implementations own every provider quirk (auth, paging, date formats) and
/// never let provider field names escape. A failed fetch returns an error the
/// caller logs and skips; it never aborts a cycle.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stable tag stored as the item's platform.
    fn name(&self) -> &'static str;

    /// Fetch candidates mentioning any of `keywords` published since `since`.
    async fn fetch(
        &self,
        keywords: &[String],
        since: DateTime<Utc>,
    ) -> Result<Vec<ContentCandidate>, SourceError>;
}

/// HTTP settings shared by every provider client.
#[derive(Debug, Clone)]
pub struct AdapterSettings {
    pub timeout_secs: u64,
    pub user_agent: String,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub language: Option<String>,
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 20,
            user_agent: "pulse/0.1 (media-monitoring)".to_string(),
            max_retries: 2,
            backoff_base_ms: 500,
            language: None,
        }
    }
}

impl AdapterSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            timeout_secs: config.adapter_timeout_secs,
            user_agent: config.http_user_agent.clone(),
            max_retries: config.adapter_max_retries,
            language: config.news_language.clone(),
            ..Self::default()
        }
    }

    pub(crate) fn build_client(&self) -> Result<Client, SourceError> {
        Ok(Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(self.user_agent.clone())
            .build()?)
    }
}

/// Parse a provider base URL, normalized to end with exactly one slash so
/// relative joins append to it rather than replacing its last segment.
pub(crate) fn parse_base_url(base_url: &str) -> Result<Url, SourceError> {
    let normalised = format!("{}/", base_url.trim_end_matches('/'));
    Url::parse(&normalised).map_err(|e| SourceError::InvalidBaseUrl {
        url: base_url.to_string(),
        reason: e.to_string(),
    })
}

/// Map a non-2xx response to [`SourceError::Api`], keeping the body's message.
pub(crate) async fn ensure_success(
    provider: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, SourceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| {
            ["message", "error"]
                .iter()
                .find_map(|k| v.get(k).and_then(|m| m.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

    Err(SourceError::Api {
        provider,
        status: Some(status.as_u16()),
        message,
    })
}

/// Run one request per keyword batch in sequence and merge the results.
///
/// A failed batch is logged and skipped. The call fails only when every
/// batch failed, returning the first error.
pub(crate) async fn fetch_batched<F, Fut>(
    provider: &'static str,
    batches: Vec<Vec<String>>,
    mut fetch_batch: F,
) -> Result<Vec<ContentCandidate>, SourceError>
where
    F: FnMut(Vec<String>) -> Fut,
    Fut: Future<Output = Result<Vec<ContentCandidate>, SourceError>>,
{
    let total = batches.len();
    let mut candidates = Vec::new();
    let mut first_error = None;
    let mut failed = 0usize;

    for (index, batch) in batches.into_iter().enumerate() {
        match fetch_batch(batch).await {
            Ok(found) => candidates.extend(found),
            Err(e) => {
                failed += 1;
                tracing::warn!(provider, batch = index, error = %e, "keyword batch failed");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }

    match first_error {
        Some(err) if failed == total => Err(err),
        _ => Ok(candidates),
    }
}
