use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Parsing and validation are decoupled from the process environment so tests
/// can drive them with a plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    // Empty strings count as unset so `.env` templates with blank keys work.
    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_positive_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        match parse_u64(var, default)? {
            0 => Err(invalid(var, "must be greater than zero".to_string())),
            n => Ok(n),
        }
    };

    let parse_positive_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        match or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))?
        {
            0 => Err(invalid(var, "must be greater than zero".to_string())),
            n => Ok(n),
        }
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("PULSE_ENV", "development"))?;
    let bind_addr = parse_addr("PULSE_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("PULSE_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("PULSE_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("PULSE_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("PULSE_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let lookback_hours = {
        let raw = or_default("PULSE_LOOKBACK_HOURS", "24");
        match raw.parse::<i64>() {
            Ok(h) if h > 0 => h,
            Ok(_) => {
                return Err(invalid(
                    "PULSE_LOOKBACK_HOURS",
                    "must be greater than zero".to_string(),
                ))
            }
            Err(e) => return Err(invalid("PULSE_LOOKBACK_HOURS", e.to_string())),
        }
    };

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        news_api_key: optional("NEWS_API_KEY"),
        newsapi_ai_key: optional("NEWSAPI_AI_KEY"),
        serpapi_key: optional("SERPAPI_KEY"),
        news_language: optional("PULSE_NEWS_LANGUAGE"),
        serpapi_country: or_default("PULSE_SERPAPI_COUNTRY", "ae"),
        http_user_agent: or_default("PULSE_HTTP_USER_AGENT", "pulse/0.1 (media-monitoring)"),
        adapter_timeout_secs: parse_positive_u64("PULSE_ADAPTER_TIMEOUT_SECS", "20")?,
        adapter_max_retries: parse_u32("PULSE_ADAPTER_MAX_RETRIES", "2")?,
        lookback_hours,
        cycle_deadline_secs: parse_positive_u64("PULSE_CYCLE_DEADLINE_SECS", "120")?,
        cycle_cron: or_default("PULSE_CYCLE_CRON", "0 */15 * * * *"),
        store_timeout_secs: parse_positive_u64("PULSE_STORE_TIMEOUT_SECS", "10")?,
        scorer_url: optional("PULSE_SCORER_URL"),
        scorer_timeout_secs: parse_positive_u64("PULSE_SCORER_TIMEOUT_SECS", "5")?,
        baseline_cycles: parse_positive_usize("PULSE_BASELINE_CYCLES", "6")?,
        subscriber_buffer: parse_positive_usize("PULSE_SUBSCRIBER_BUFFER", "64")?,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "PULSE_ENV".to_string(),
            reason: format!("expected development, test, or production; got {other:?}"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
