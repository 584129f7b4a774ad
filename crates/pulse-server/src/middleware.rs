//! Request tagging and the guard in front of the `/api/v1` read and trigger
//! routes.
//!
//! The guard authenticates a bearer token against `PULSE_API_KEYS` and then
//! charges the request to that key's per-minute quota. With auth disabled in
//! development every caller shares one quota.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    http::{header, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::ApiError;

const API_KEYS_VAR: &str = "PULSE_API_KEYS";
const RATE_LIMIT_VAR: &str = "PULSE_RATE_LIMIT_PER_MINUTE";
const DEFAULT_REQUESTS_PER_MINUTE: u32 = 120;
const QUOTA_WINDOW: Duration = Duration::from_secs(60);
const MAX_REQUEST_ID_LEN: usize = 128;

static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Identifier attached to every request and echoed on its response.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

impl RequestId {
    /// Reuse a caller-supplied id when it is short printable ASCII.
    fn from_header(value: Option<&HeaderValue>) -> Self {
        let supplied = value
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty() && v.len() <= MAX_REQUEST_ID_LEN)
            .filter(|v| v.bytes().all(|b| b.is_ascii_graphic()));
        match supplied {
            Some(id) => Self(id.to_string()),
            None => Self(Uuid::new_v4().to_string()),
        }
    }
}

/// Tags the request with a [`RequestId`] extension and echoes it back.
pub async fn tag_request(mut req: Request, next: Next) -> Response {
    let id = RequestId::from_header(req.headers().get(&X_REQUEST_ID));
    let echoed = HeaderValue::from_str(&id.0).ok();
    req.extensions_mut().insert(id);

    let mut response = next.run(req).await;
    if let Some(value) = echoed {
        response.headers_mut().insert(X_REQUEST_ID.clone(), value);
    }
    response
}

/// Which quota a request is charged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Caller {
    /// Index into the configured key list.
    Key(usize),
    Open,
}

#[derive(Debug)]
struct Quota {
    window_start: Instant,
    used: u32,
}

/// Bearer auth and per-caller request quotas for the protected routes.
#[derive(Debug, Clone)]
pub struct ApiGuard {
    api_keys: Arc<[String]>,
    per_minute: u32,
    quotas: Arc<Mutex<HashMap<Caller, Quota>>>,
}

impl ApiGuard {
    /// Reads `PULSE_API_KEYS` and `PULSE_RATE_LIMIT_PER_MINUTE`.
    ///
    /// # Errors
    ///
    /// Fails outside development when no API key is configured, or when the
    /// rate limit is not a positive integer.
    pub fn from_env(is_development: bool) -> anyhow::Result<Self> {
        let keys = std::env::var(API_KEYS_VAR).unwrap_or_default();
        let per_minute = match std::env::var(RATE_LIMIT_VAR) {
            Ok(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| anyhow::anyhow!("{RATE_LIMIT_VAR} must be a positive integer"))?,
            Err(_) => DEFAULT_REQUESTS_PER_MINUTE,
        };
        Self::new(&keys, per_minute, is_development)
    }

    /// Builds a guard from a comma-separated key list.
    ///
    /// # Errors
    ///
    /// Fails outside development when `keys` holds no usable token.
    pub fn new(keys: &str, per_minute: u32, is_development: bool) -> anyhow::Result<Self> {
        let mut api_keys: Vec<String> = keys
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect();
        api_keys.sort();
        api_keys.dedup();

        if api_keys.is_empty() {
            anyhow::ensure!(
                is_development,
                "{API_KEYS_VAR} is required outside development; provide comma-separated bearer tokens"
            );
            tracing::warn!("{API_KEYS_VAR} not set; bearer auth disabled in development");
        }

        Ok(Self {
            api_keys: api_keys.into(),
            per_minute,
            quotas: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    #[must_use]
    pub fn auth_enabled(&self) -> bool {
        !self.api_keys.is_empty()
    }

    /// The caller a request authenticates as, or `None` when rejected.
    ///
    /// Every key is compared so timing does not reveal which one was close.
    fn identify(&self, authorization: Option<&HeaderValue>) -> Option<Caller> {
        if !self.auth_enabled() {
            return Some(Caller::Open);
        }
        let token = bearer_token(authorization)?;
        self.api_keys
            .iter()
            .enumerate()
            .fold(None, |found, (index, key)| {
                if bool::from(key.as_bytes().ct_eq(token.as_bytes())) {
                    Some(Caller::Key(index))
                } else {
                    found
                }
            })
    }

    /// Charge one request to `caller`; `Err` carries the wait until the
    /// window resets.
    async fn charge(&self, caller: Caller) -> Result<(), Duration> {
        let now = Instant::now();
        let mut quotas = self.quotas.lock().await;
        let quota = quotas.entry(caller).or_insert(Quota {
            window_start: now,
            used: 0,
        });

        let elapsed = now.duration_since(quota.window_start);
        if elapsed >= QUOTA_WINDOW {
            quota.window_start = now;
            quota.used = 0;
        }
        if quota.used >= self.per_minute {
            return Err(QUOTA_WINDOW.saturating_sub(elapsed));
        }
        quota.used += 1;
        Ok(())
    }
}

/// Authenticates, then charges the caller's quota, before any protected handler.
pub async fn guard_api(State(guard): State<ApiGuard>, req: Request, next: Next) -> Response {
    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();

    let Some(caller) = guard.identify(req.headers().get(header::AUTHORIZATION)) else {
        tracing::debug!(path = %req.uri().path(), "rejected request without a valid api key");
        return ApiError::new(request_id, "unauthorized", "missing or invalid bearer token")
            .into_response();
    };

    if let Err(wait) = guard.charge(caller).await {
        let mut response =
            ApiError::new(request_id, "rate_limited", "rate limit exceeded").into_response();
        let retry_after = wait.as_secs().max(1).to_string();
        if let Ok(value) = HeaderValue::from_str(&retry_after) {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
        return response;
    }

    next.run(req).await
}

fn bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    let (scheme, token) = value?.to_str().ok()?.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_token_parses_scheme_case_insensitively() {
        let header = HeaderValue::from_static("bearer  test-token");
        assert_eq!(bearer_token(Some(&header)), Some("test-token"));
        assert_eq!(bearer_token(Some(&HeaderValue::from_static("Basic abc"))), None);
        assert_eq!(bearer_token(Some(&HeaderValue::from_static("Bearer "))), None);
        assert_eq!(bearer_token(None), None);
    }

    #[test]
    fn missing_keys_disable_auth_only_in_development() {
        let guard = ApiGuard::new("", 10, true).expect("dev allows missing keys");
        assert!(!guard.auth_enabled());
        assert_eq!(guard.identify(None), Some(Caller::Open));
        assert!(ApiGuard::new(" , ", 10, false).is_err());
    }

    #[test]
    fn each_key_is_its_own_caller() {
        let guard = ApiGuard::new("beta, alpha, beta", 10, false).expect("keys parse");
        let alpha = HeaderValue::from_static("Bearer alpha");
        let beta = HeaderValue::from_static("Bearer beta");
        assert_eq!(guard.identify(Some(&alpha)), Some(Caller::Key(0)));
        assert_eq!(guard.identify(Some(&beta)), Some(Caller::Key(1)));
        assert_eq!(guard.identify(Some(&HeaderValue::from_static("Bearer alph"))), None);
        assert_eq!(guard.identify(None), None);
    }

    #[tokio::test]
    async fn quotas_are_charged_per_caller() {
        let guard = ApiGuard::new("alpha,beta", 2, false).expect("keys parse");
        assert!(guard.charge(Caller::Key(0)).await.is_ok());
        assert!(guard.charge(Caller::Key(0)).await.is_ok());
        let wait = guard.charge(Caller::Key(0)).await.expect_err("quota spent");
        assert!(wait <= QUOTA_WINDOW);
        assert!(guard.charge(Caller::Key(1)).await.is_ok());
    }

    #[test]
    fn request_id_rejects_unprintable_or_oversized_values() {
        let kept = RequestId::from_header(Some(&HeaderValue::from_static("req-42")));
        assert_eq!(kept.0, "req-42");

        let long = "x".repeat(MAX_REQUEST_ID_LEN + 1);
        let replaced = RequestId::from_header(HeaderValue::from_str(&long).ok().as_ref());
        assert_ne!(replaced.0, long);
        assert!(Uuid::parse_str(&replaced.0).is_ok());

        let spaced = RequestId::from_header(Some(&HeaderValue::from_static("a b")));
        assert!(Uuid::parse_str(&spaced.0).is_ok());
    }
}
