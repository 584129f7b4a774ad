use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Provider-neutral form of one fetched item. Never persisted directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentCandidate {
    pub title: String,
    pub body: Option<String>,
    pub snippet: Option<String>,
    /// Dedup identity.
    pub canonical_url: String,
    pub source_name: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub provider_tag: String,
}

impl ContentCandidate {
    /// The text stored on an admitted item: title, body, and snippet separated
    /// by blank lines.
    ///
    /// Every field the matcher reads ends up here. A snippet already contained
    /// in the body is not repeated.
    #[must_use]
    pub fn render_content(&self) -> String {
        let title = self.title.trim();
        let body = self.body.as_deref().map(str::trim).unwrap_or_default();
        let snippet = self.snippet.as_deref().map(str::trim).unwrap_or_default();
        let snippet_in_body =
            !body.is_empty() && body.to_lowercase().contains(&snippet.to_lowercase());

        let mut parts = vec![title, body];
        if !snippet_in_body {
            parts.push(snippet);
        }
        parts.retain(|p| !p.is_empty());
        parts.join("\n\n")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: i64,
    pub platform_tag: String,
    pub title: String,
    pub content: String,
    pub author_name: Option<String>,
    pub post_url: String,
    pub posted_at: Option<DateTime<Utc>>,
    pub matched_keywords: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewContentItem {
    pub platform_tag: String,
    pub title: String,
    pub content: String,
    pub author_name: Option<String>,
    pub post_url: String,
    pub posted_at: Option<DateTime<Utc>>,
    pub matched_keywords: Vec<String>,
}

impl NewContentItem {
    #[must_use]
    pub fn from_candidate(candidate: &ContentCandidate, matched_keywords: Vec<String>) -> Self {
        Self {
            platform_tag: candidate.provider_tag.clone(),
            title: candidate.title.clone(),
            content: candidate.render_content(),
            author_name: candidate.source_name.clone(),
            post_url: candidate.canonical_url.clone(),
            posted_at: candidate.published_at,
            matched_keywords,
        }
    }
}

/// A monitored organization that admitted content may mention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoredEntity {
    pub id: i64,
    pub name: String,
    pub native_name: Option<String>,
    pub entity_type: String,
    pub aliases: Vec<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MentionType {
    Direct,
    Alias,
}

impl MentionType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MentionType::Direct => "direct",
            MentionType::Alias => "alias",
        }
    }
}

impl std::str::FromStr for MentionType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" => Ok(MentionType::Direct),
            "alias" => Ok(MentionType::Alias),
            other => Err(CoreError::UnknownMentionType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityLink {
    pub content_item_id: i64,
    pub entity_id: i64,
    pub mention_type: Option<MentionType>,
    pub sentiment_score: Option<f64>,
    pub sentiment_confidence: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertTrigger {
    Threshold,
    Spike,
    Drop,
}

impl AlertTrigger {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AlertTrigger::Threshold => "threshold",
            AlertTrigger::Spike => "spike",
            AlertTrigger::Drop => "drop",
        }
    }
}

impl std::fmt::Display for AlertTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AlertTrigger {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "threshold" => Ok(AlertTrigger::Threshold),
            "spike" => Ok(AlertTrigger::Spike),
            "drop" => Ok(AlertTrigger::Drop),
            other => Err(CoreError::UnknownAlertTrigger(other.to_string())),
        }
    }
}

/// Urgency of an alert, derived from the triggering item's sentiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertPriority {
    High,
    Medium,
    Low,
}

impl AlertPriority {
    /// More negative coverage is more urgent. `score` is in `[-1, 1]`.
    #[must_use]
    pub fn from_sentiment(score: f64) -> Self {
        if score < -0.4 {
            AlertPriority::High
        } else if score < 0.2 {
            AlertPriority::Medium
        } else {
            AlertPriority::Low
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AlertPriority::High => "high",
            AlertPriority::Medium => "medium",
            AlertPriority::Low => "low",
        }
    }
}

impl std::str::FromStr for AlertPriority {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high" => Ok(AlertPriority::High),
            "medium" => Ok(AlertPriority::Medium),
            "low" => Ok(AlertPriority::Low),
            other => Err(CoreError::UnknownAlertPriority(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordAlert {
    pub id: i64,
    pub keyword_id: i64,
    pub content_item_id: Option<i64>,
    pub detected_at: DateTime<Utc>,
    pub is_read: bool,
    pub alert_sent: bool,
    pub trigger: AlertTrigger,
    pub observed_count: i32,
    pub baseline: Option<f64>,
    /// Unset when the triggering item has no sentiment reading.
    pub priority: Option<AlertPriority>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewKeywordAlert {
    pub keyword_id: i64,
    pub content_item_id: Option<i64>,
    pub trigger: AlertTrigger,
    pub observed_count: i32,
    pub baseline: Option<f64>,
    /// Unset when the triggering item has no sentiment reading.
    pub priority: Option<AlertPriority>,
}
