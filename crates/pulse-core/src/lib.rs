//! Shared domain types and configuration for the Pulse ingestion pipeline.

mod app_config;
mod config;
pub mod content;
pub mod envelope;
pub mod keywords;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use content::{
    AlertPriority, AlertTrigger, ContentCandidate, ContentItem, EntityLink, KeywordAlert, MentionType,
    MonitoredEntity, NewContentItem, NewKeywordAlert,
};
pub use envelope::Envelope;
pub use keywords::{Keyword, KeywordSnapshot};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown alert priority: {0}")]
    UnknownAlertPriority(String),
    #[error("unknown alert trigger: {0}")]
    UnknownAlertTrigger(String),
    #[error("unknown mention type: {0}")]
    UnknownMentionType(String),
}
