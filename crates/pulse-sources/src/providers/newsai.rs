//! NewsAPI.ai (Event Registry) `article/getArticles` adapter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pulse_core::ContentCandidate;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::adapter::{
    ensure_success, fetch_batched, parse_base_url, AdapterSettings, SourceAdapter,
};
use crate::dates::combine_date_time;
use crate::error::SourceError;
use crate::html::{clean_optional, strip_html};
use crate::query::{batch_keywords, QueryBudget};
use crate::retry::retry_with_backoff;
use crate::urls::canonical_url;

pub const PROVIDER: &str = "newsapi_ai";
const DEFAULT_BASE_URL: &str = "https://eventregistry.org/";
const ARTICLES_COUNT: u32 = 100;

/// Event Registry accepts a keyword array; the practical limit is the number
/// of terms rather than the encoded length.
const BUDGET: QueryBudget = QueryBudget {
    max_encoded_len: None,
    max_terms: 15,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GetArticlesRequest<'a> {
    action: &'static str,
    keyword: &'a [String],
    keyword_oper: &'static str,
    articles_page: u32,
    articles_count: u32,
    articles_sort_by: &'static str,
    articles_sort_by_asc: bool,
    articles_article_body_len: i32,
    result_type: &'static str,
    data_type: [&'static str; 2],
    api_key: &'a str,
    date_start: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    lang: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct GetArticlesResponse {
    #[serde(default)]
    articles: Option<ArticlePage>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ArticlePage {
    #[serde(default)]
    results: Vec<Article>,
}

#[derive(Debug, Deserialize)]
struct Article {
    url: Option<String>,
    title: Option<String>,
    body: Option<String>,
    #[serde(default)]
    source: Option<ArticleSource>,
    date: Option<String>,
    time: Option<String>,
    #[serde(rename = "dateTime")]
    date_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ArticleSource {
    title: Option<String>,
}

/// Client for the Event Registry article search.
pub struct NewsAiAdapter {
    client: Client,
    api_key: String,
    endpoint: Url,
    settings: AdapterSettings,
}

impl NewsAiAdapter {
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
        let base = parse_base_url(base_url)?;
        let endpoint = base
            .join("api/v1/article/getArticles")
            .map_err(|e| SourceError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client: settings.build_client()?,
            api_key: api_key.to_owned(),
            endpoint,
            settings,
        })
    }

    fn build_request<'a>(
        &'a self,
        keywords: &'a [String],
        since: DateTime<Utc>,
    ) -> GetArticlesRequest<'a> {
        GetArticlesRequest {
            action: "getArticles",
            keyword: keywords,
            keyword_oper: "or",
            articles_page: 1,
            articles_count: ARTICLES_COUNT,
            articles_sort_by: "date",
            articles_sort_by_asc: false,
            articles_article_body_len: -1,
            result_type: "articles",
            data_type: ["news", "blog"],
            api_key: &self.api_key,
            date_start: since.format("%Y-%m-%d").to_string(),
            lang: self.settings.language.as_deref().map(event_registry_lang),
        }
    }

    async fn fetch_query(
        &self,
        request: &GetArticlesRequest<'_>,
    ) -> Result<Vec<ContentCandidate>, SourceError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await?;
        let body = ensure_success(PROVIDER, response).await?.text().await?;

        let parsed: GetArticlesResponse =
            serde_json::from_str(&body).map_err(|e| SourceError::Deserialize {
                context: "event registry getArticles".to_string(),
                source: e,
            })?;

        if let Some(message) = parsed.error {
            return Err(SourceError::Api {
                provider: PROVIDER,
                status: None,
                message,
            });
        }

        Ok(parsed
            .articles
            .map(|page| page.results)
            .unwrap_or_default()
            .into_iter()
            .filter_map(normalize)
            .collect())
    }
}

/// Event Registry wants ISO 639-3 codes; map the common two-letter ones.
fn event_registry_lang(lang: &str) -> &str {
    match lang {
        "en" => "eng",
        "ar" => "ara",
        "fr" => "fra",
        "de" => "deu",
        "es" => "spa",
        other => other,
    }
}

fn normalize(article: Article) -> Option<ContentCandidate> {
    let canonical_url = canonical_url(article.url.as_deref()?)?;
    let title = article.title.map(|t| strip_html(&t)).unwrap_or_default();
    let body = clean_optional(article.body.as_deref());
    if title.is_empty() && body.is_none() {
        return None;
    }

    Some(ContentCandidate {
        title,
        body,
        snippet: None,
        canonical_url,
        source_name: article
            .source
            .and_then(|s| s.title)
            .filter(|t| !t.is_empty()),
        published_at: combine_date_time(
            article.date_time.as_deref(),
            article.date.as_deref(),
            article.time.as_deref(),
        ),
        provider_tag: PROVIDER.to_string(),
    })
}

#[async_trait]
impl SourceAdapter for NewsAiAdapter {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn fetch(
        &self,
        keywords: &[String],
        since: DateTime<Utc>,
    ) -> Result<Vec<ContentCandidate>, SourceError> {
        let batches = batch_keywords(keywords, ",", BUDGET);
        fetch_batched(PROVIDER, batches, |batch| async move {
            // Event Registry matches each array entry as a phrase, so quotes are dropped.
            let terms: Vec<String> = batch
                .iter()
                .map(|t| t.trim_matches('"').to_string())
                .collect();
            let request = self.build_request(&terms, since);
            retry_with_backoff(
                PROVIDER,
                self.settings.max_retries,
                self.settings.backoff_base_ms,
                || self.fetch_query(&request),
            )
            .await
        })
        .await
    }
}
