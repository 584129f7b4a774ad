use thiserror::Error;

/// Errors returned by a source adapter. None of them are fatal to a cycle.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body could not be deserialized into the expected shape.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The provider rejected the request (bad key, quota, non-2xx status).
    #[error("{provider} API error{}: {message}", status_suffix(.status))]
    Api {
        provider: &'static str,
        status: Option<u16>,
        message: String,
    },

    /// The adapter did not answer within its bound.
    #[error("{provider} timed out after {secs}s")]
    Timeout { provider: &'static str, secs: u64 },

    /// The adapter was constructed with an unusable base URL.
    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

#[allow(clippy::ref_option)]
fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}
