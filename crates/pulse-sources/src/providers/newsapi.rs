//! NewsAPI (`/v2/everything`) adapter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pulse_core::ContentCandidate;
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::adapter::{
    ensure_success, fetch_batched, parse_base_url, AdapterSettings, SourceAdapter,
};
use crate::dates::parse_timestamp;
use crate::error::SourceError;
use crate::html::{clean_optional, strip_html, strip_truncation_marker};
use crate::query::{batch_keywords, QueryBudget};
use crate::retry::retry_with_backoff;
use crate::urls::canonical_url;

pub const PROVIDER: &str = "newsapi";
const DEFAULT_BASE_URL: &str = "https://newsapi.org/";
const PAGE_SIZE: &str = "100";
/// Placeholder NewsAPI substitutes for articles pulled by the publisher.
const REMOVED: &str = "[Removed]";

const BUDGET: QueryBudget = QueryBudget {
    max_encoded_len: Some(500),
    max_terms: 20,
};

#[derive(Debug, Deserialize)]
struct EverythingResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
struct Article {
    #[serde(default)]
    source: Option<ArticleSource>,
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ArticleSource {
    name: Option<String>,
}

/// Client for NewsAPI's full-archive search.
pub struct NewsApiAdapter {
    client: Client,
    api_key: String,
    base_url: Url,
    settings: AdapterSettings,
}

impl NewsApiAdapter {
    /// Creates an adapter pointed at the production API.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be built.
    pub fn new(api_key: &str, settings: AdapterSettings) -> Result<Self, SourceError> {
        Self::with_base_url(api_key, settings, DEFAULT_BASE_URL)
    }

    /// Creates an adapter with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be built, or
    /// [`SourceError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        api_key: &str,
        settings: AdapterSettings,
        base_url: &str,
    ) -> Result<Self, SourceError> {
        Ok(Self {
            client: settings.build_client()?,
            api_key: api_key.to_owned(),
            base_url: parse_base_url(base_url)?,
            settings,
        })
    }

    fn build_url(&self, query: &str, since: DateTime<Utc>) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(&format!("{}v2/everything", self.base_url.path()));
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("q", query);
            pairs.append_pair("from", &since.format("%Y-%m-%dT%H:%M:%S").to_string());
            pairs.append_pair("sortBy", "publishedAt");
            pairs.append_pair("pageSize", PAGE_SIZE);
            if let Some(lang) = &self.settings.language {
                pairs.append_pair("language", lang);
            }
        }
        url
    }

    async fn fetch_query(&self, url: &Url) -> Result<Vec<ContentCandidate>, SourceError> {
        let response = self
            .client
            .get(url.clone())
            .header("X-Api-Key", &self.api_key)
            .send()
            .await?;
        let body = ensure_success(PROVIDER, response).await?.text().await?;

        let parsed: EverythingResponse =
            serde_json::from_str(&body).map_err(|e| SourceError::Deserialize {
                context: "newsapi everything".to_string(),
                source: e,
            })?;

        if parsed.status != "ok" {
            return Err(SourceError::Api {
                provider: PROVIDER,
                status: None,
                message: parsed.message.unwrap_or(parsed.status),
            });
        }

        Ok(parsed.articles.into_iter().filter_map(normalize).collect())
    }
}

fn normalize(article: Article) -> Option<ContentCandidate> {
    let title = article.title.map(|t| strip_html(&t)).unwrap_or_default();
    let raw_url = article.url?;
    if title == REMOVED || raw_url.contains("removed.com") {
        return None;
    }
    let canonical_url = canonical_url(&raw_url)?;

    let body = article
        .content
        .map(|c| strip_truncation_marker(&strip_html(&c)))
        .filter(|c| !c.is_empty() && c != REMOVED);
    let snippet = clean_optional(article.description.as_deref()).filter(|d| d != REMOVED);

    if title.is_empty() && body.is_none() && snippet.is_none() {
        return None;
    }

    Some(ContentCandidate {
        title,
        body,
        snippet,
        canonical_url,
        source_name: article
            .source
            .and_then(|s| s.name)
            .filter(|n| !n.is_empty() && n != REMOVED),
        published_at: article.published_at.as_deref().and_then(parse_timestamp),
        provider_tag: PROVIDER.to_string(),
    })
}

#[async_trait]
impl SourceAdapter for NewsApiAdapter {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn fetch(
        &self,
        keywords: &[String],
        since: DateTime<Utc>,
    ) -> Result<Vec<ContentCandidate>, SourceError> {
        let batches = batch_keywords(keywords, " OR ", BUDGET);
        fetch_batched(PROVIDER, batches, |batch| async move {
            let url = self.build_url(&batch.join(" OR "), since);
            retry_with_backoff(
                PROVIDER,
                self.settings.max_retries,
                self.settings.backoff_base_ms,
                || self.fetch_query(&url),
            )
            .await
        })
        .await
    }
}
