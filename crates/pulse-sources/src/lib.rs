//! Source adapters: one narrow interface over each external news provider.

mod adapter;
mod dates;
mod error;
mod html;
pub mod providers;
pub mod query;
mod retry;
mod urls;

use std::sync::Arc;

use pulse_core::AppConfig;

pub use adapter::{AdapterSettings, SourceAdapter};
pub use error::SourceError;
pub use providers::{NewsAiAdapter, NewsApiAdapter, SerpApiAdapter};
pub use urls::canonical_url;

/// Build one adapter per provider whose API key is configured.
///
/// # Errors
///
/// Returns [`SourceError`] if an adapter's HTTP client cannot be built.
pub fn build_adapters(config: &AppConfig) -> Result<Vec<Arc<dyn SourceAdapter>>, SourceError> {
    let settings = AdapterSettings::from_app_config(config);
    let mut adapters: Vec<Arc<dyn SourceAdapter>> = Vec::new();

    if let Some(key) = &config.news_api_key {
        adapters.push(Arc::new(NewsApiAdapter::new(key, settings.clone())?));
    }
    if let Some(key) = &config.newsapi_ai_key {
        adapters.push(Arc::new(NewsAiAdapter::new(key, settings.clone())?));
    }
    if let Some(key) = &config.serpapi_key {
        adapters.push(Arc::new(SerpApiAdapter::new(
            key,
            &config.serpapi_country,
            settings,
        )?));
    }

    let names: Vec<&str> = adapters.iter().map(|a| a.name()).collect();
    if adapters.is_empty() {
        tracing::warn!("no provider API keys configured; ingestion cycles will fetch nothing");
    } else {
        tracing::info!(adapters = ?names, "source adapters enabled");
    }

    Ok(adapters)
}
