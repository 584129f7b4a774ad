use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub news_api_key: Option<String>,
    pub newsapi_ai_key: Option<String>,
    pub serpapi_key: Option<String>,
    pub news_language: Option<String>,
    pub serpapi_country: String,
    pub http_user_agent: String,
    pub adapter_timeout_secs: u64,
    pub adapter_max_retries: u32,
    pub lookback_hours: i64,
    pub cycle_deadline_secs: u64,
    pub cycle_cron: String,
    pub store_timeout_secs: u64,
    pub scorer_url: Option<String>,
    pub scorer_timeout_secs: u64,
    pub baseline_cycles: usize,
    pub subscriber_buffer: usize,
}

impl AppConfig {
    /// Whether at least one provider key is configured.
    #[must_use]
    pub fn has_any_provider(&self) -> bool {
        self.news_api_key.is_some() || self.newsapi_ai_key.is_some() || self.serpapi_key.is_some()
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "[redacted]");
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("news_api_key", &redact(&self.news_api_key))
            .field("newsapi_ai_key", &redact(&self.newsapi_ai_key))
            .field("serpapi_key", &redact(&self.serpapi_key))
            .field("news_language", &self.news_language)
            .field("serpapi_country", &self.serpapi_country)
            .field("http_user_agent", &self.http_user_agent)
            .field("adapter_timeout_secs", &self.adapter_timeout_secs)
            .field("adapter_max_retries", &self.adapter_max_retries)
            .field("lookback_hours", &self.lookback_hours)
            .field("cycle_deadline_secs", &self.cycle_deadline_secs)
            .field("cycle_cron", &self.cycle_cron)
            .field("store_timeout_secs", &self.store_timeout_secs)
            .field("scorer_url", &self.scorer_url)
            .field("scorer_timeout_secs", &self.scorer_timeout_secs)
            .field("baseline_cycles", &self.baseline_cycles)
            .field("subscriber_buffer", &self.subscriber_buffer)
            .finish()
    }
}
