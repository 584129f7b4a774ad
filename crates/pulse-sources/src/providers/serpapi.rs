//! SerpAPI Google News (`tbm=nws`) adapter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pulse_core::ContentCandidate;
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::adapter::{
    ensure_success, fetch_batched, parse_base_url, AdapterSettings, SourceAdapter,
};
use crate::dates::parse_display_date;
use crate::error::SourceError;
use crate::html::{clean_optional, strip_html};
use crate::query::{batch_keywords, QueryBudget};
use crate::retry::retry_with_backoff;
use crate::urls::canonical_url;

pub const PROVIDER: &str = "serpapi";
const DEFAULT_BASE_URL: &str = "https://serpapi.com/";
const NUM_RESULTS: &str = "100";

const BUDGET: QueryBudget = QueryBudget {
    max_encoded_len: Some(1_500),
    max_terms: 10,
};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    news_results: Vec<NewsResult>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewsResult {
    title: Option<String>,
    link: Option<String>,
    #[serde(default)]
    source: Option<ResultSource>,
    source_name: Option<String>,
    date: Option<String>,
    snippet: Option<String>,
}

/// SerpAPI has returned the source both as a plain string and as an object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ResultSource {
    Name(String),
    Detail { name: Option<String> },
}

impl ResultSource {
    fn into_name(self) -> Option<String> {
        match self {
            ResultSource::Name(name) => Some(name),
            ResultSource::Detail { name } => name,
        }
    }
}

/// Client for SerpAPI's Google News search.
pub struct SerpApiAdapter {
    client: Client,
    api_key: String,
    base_url: Url,
    country: String,
    settings: AdapterSettings,
}

impl SerpApiAdapter {
    /// Creates an adapter pointed at the production API.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be built.
    pub fn new(
        api_key: &str,
        country: &str,
        settings: AdapterSettings,
    ) -> Result<Self, SourceError> {
        Self::with_base_url(api_key, country, settings, DEFAULT_BASE_URL)
    }

    /// Creates an adapter with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be built, or
    /// [`SourceError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        api_key: &str,
        country: &str,
        settings: AdapterSettings,
        base_url: &str,
    ) -> Result<Self, SourceError> {
        Ok(Self {
            client: settings.build_client()?,
            api_key: api_key.to_owned(),
            base_url: parse_base_url(base_url)?,
            country: country.to_owned(),
            settings,
        })
    }

    fn build_url(&self, query: &str, since: DateTime<Utc>) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(&format!("{}search.json", self.base_url.path()));
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("engine", "google");
            pairs.append_pair("q", query);
            pairs.append_pair("tbm", "nws");
            pairs.append_pair("gl", &self.country);
            pairs.append_pair("num", NUM_RESULTS);
            pairs.append_pair("tbs", recency_filter(since));
            if let Some(lang) = &self.settings.language {
                pairs.append_pair("hl", lang);
            }
            pairs.append_pair("api_key", &self.api_key);
        }
        url
    }

    async fn fetch_query(&self, url: &Url) -> Result<Vec<ContentCandidate>, SourceError> {
        let response = self.client.get(url.clone()).send().await?;
        let body = ensure_success(PROVIDER, response).await?.text().await?;

        let parsed: SearchResponse =
            serde_json::from_str(&body).map_err(|e| SourceError::Deserialize {
                context: "serpapi google news".to_string(),
                source: e,
            })?;

        if let Some(message) = parsed.error {
            // "no results" is reported through the error field; it is not a failure.
            if message.contains("hasn't returned any results") {
                return Ok(Vec::new());
            }
            return Err(SourceError::Api {
                provider: PROVIDER,
                status: None,
                message,
            });
        }

        let now = Utc::now();
        Ok(parsed
            .news_results
            .into_iter()
            .filter_map(|r| normalize(r, now))
            .collect())
    }
}

/// Google's `qdr` recency buckets; pick the narrowest one covering `since`.
fn recency_filter(since: DateTime<Utc>) -> &'static str {
    let age = Utc::now() - since;
    if age <= chrono::Duration::hours(1) {
        "qdr:h"
    } else if age <= chrono::Duration::days(1) {
        "qdr:d"
    } else if age <= chrono::Duration::weeks(1) {
        "qdr:w"
    } else if age <= chrono::Duration::days(31) {
        "qdr:m"
    } else {
        "qdr:y"
    }
}

fn normalize(result: NewsResult, now: DateTime<Utc>) -> Option<ContentCandidate> {
    let canonical_url = canonical_url(result.link.as_deref()?)?;
    let title = result.title.map(|t| strip_html(&t)).unwrap_or_default();
    let snippet = clean_optional(result.snippet.as_deref());
    if title.is_empty() && snippet.is_none() {
        return None;
    }

    Some(ContentCandidate {
        title,
        body: None,
        snippet,
        canonical_url,
        source_name: result
            .source
            .and_then(ResultSource::into_name)
            .or(result.source_name)
            .filter(|n| !n.is_empty()),
        published_at: result
            .date
            .as_deref()
            .and_then(|d| parse_display_date(d, now)),
        provider_tag: PROVIDER.to_string(),
    })
}

#[async_trait]
impl SourceAdapter for SerpApiAdapter {
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

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    #[test]
    fn build_url_targets_google_news() {
        let adapter =
            SerpApiAdapter::with_base_url("k", "ae", AdapterSettings::default(), "https://s.test")
                .unwrap();
        let url = adapter.build_url("solar OR wind", Utc::now() - Duration::hours(24));
        assert_eq!(url.path(), "/search.json");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("tbm".to_string(), "nws".to_string())));
        assert!(pairs.contains(&("gl".to_string(), "ae".to_string())));
        assert!(pairs.contains(&("tbs".to_string(), "qdr:d".to_string())));
        assert!(pairs.contains(&("api_key".to_string(), "k".to_string())));
    }

    #[test]
    fn recency_filter_widens_with_age() {
        assert_eq!(recency_filter(Utc::now() - Duration::minutes(30)), "qdr:h");
        assert_eq!(recency_filter(Utc::now() - Duration::days(3)), "qdr:w");
        assert_eq!(recency_filter(Utc::now() - Duration::days(90)), "qdr:y");
    }

    #[test]
    fn normalize_accepts_string_or_object_source() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        let as_string: NewsResult = serde_json::from_value(serde_json::json!({
            "title": "Metro line opens",
            "link": "https://khaleejtimes.com/x",
            "source": "Khaleej Times",
            "date": "3 hours ago",
            "snippet": "Riders"
        }))
        .unwrap();
        let as_object: NewsResult = serde_json::from_value(serde_json::json!({
            "title": "Metro line opens",
            "link": "https://khaleejtimes.com/y",
            "source": { "name": "Khaleej Times", "icon": "https://x/icon.png" },
            "date": "Mar 3, 2024"
        }))
        .unwrap();

        let a = normalize(as_string, now).unwrap();
        let b = normalize(as_object, now).unwrap();
        assert_eq!(a.source_name.as_deref(), Some("Khaleej Times"));
        assert_eq!(b.source_name.as_deref(), Some("Khaleej Times"));
        assert_eq!(a.published_at, Some(now - Duration::hours(3)));
        assert_eq!(
            b.published_at,
            Some(Utc.with_ymd_and_hms(2024, 3, 3, 0, 0, 0).unwrap())
        );
        assert_eq!(a.snippet.as_deref(), Some("Riders"));
    }

    #[test]
    fn normalize_keeps_unparseable_date_as_none() {
        let now = Utc::now();
        let result: NewsResult = serde_json::from_value(serde_json::json!({
            "title": "t",
            "link": "https://example.com/z",
            "date": "a while back"
        }))
        .unwrap();
        assert_eq!(normalize(result, now).unwrap().published_at, None);
    }
}
