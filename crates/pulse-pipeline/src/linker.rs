//! Entity linking and the sentiment scorer boundary.
//!
//! An admitted item is linked to every active monitored entity whose name,
//! native-script name, or alias occurs in its content. Each link asks a
//! scorer for a sentiment reading; a failed or slow scorer leaves the link
//! without one.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pulse_core::{ContentItem, EntityLink, MentionType, MonitoredEntity};
use serde::{Deserialize, Serialize};

use crate::error::ScorerError;

/// One sentiment reading: `score` in `[-1, 1]`, `confidence` in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SentimentScore {
    pub score: f64,
    pub confidence: f64,
}

/// Black-box sentiment model.
#[async_trait]
pub trait SentimentScorer: Send + Sync {
    async fn score(
        &self,
        text: &str,
        entity: &MonitoredEntity,
    ) -> Result<SentimentScore, ScorerError>;
}

// ---------------------------------------------------------------------------
// HTTP scorer
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ScoreRequest<'a> {
    text: &'a str,
    entity: EntityContext<'a>,
}

#[derive(Serialize)]
struct EntityContext<'a> {
    name: &'a str,
    native_name: Option<&'a str>,
    entity_type: &'a str,
    aliases: &'a [String],
}

/// Scorer served over HTTP: `POST {url}` with the text and entity context,
/// answering `{"score": f64, "confidence": f64}`.
pub struct HttpScorer {
    client: reqwest::Client,
    url: String,
}

impl HttpScorer {
    /// # Errors
    ///
    /// Returns [`ScorerError::Http`] if the HTTP client cannot be built.
    pub fn new(url: &str, timeout: Duration) -> Result<Self, ScorerError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl SentimentScorer for HttpScorer {
    async fn score(
        &self,
        text: &str,
        entity: &MonitoredEntity,
    ) -> Result<SentimentScore, ScorerError> {
        let request = ScoreRequest {
            text,
            entity: EntityContext {
                name: &entity.name,
                native_name: entity.native_name.as_deref(),
                entity_type: &entity.entity_type,
                aliases: &entity.aliases,
            },
        };

        let response = self.client.post(&self.url).json(&request).send().await?;
        if !response.status().is_success() {
            return Err(ScorerError::Status(response.status().as_u16()));
        }

        let reading: SentimentScore = response
            .json()
            .await
            .map_err(|e| ScorerError::InvalidResponse(e.to_string()))?;

        if !reading.score.is_finite()
            || !reading.confidence.is_finite()
            || !(-1.0..=1.0).contains(&reading.score)
            || !(0.0..=1.0).contains(&reading.confidence)
        {
            return Err(ScorerError::InvalidResponse(format!(
                "score {} / confidence {} out of range",
                reading.score, reading.confidence
            )));
        }

        Ok(reading)
    }
}

// ---------------------------------------------------------------------------
// Lexicon scorer
// ---------------------------------------------------------------------------

/// Word weights for news coverage, English and Arabic.
///
/// Keys are lowercase single words. Positive weights in `(0.0, 1.0]`,
/// negative in `[-1.0, 0.0)`.
pub(crate) const LEXICON: &[(&str, f64)] = &[
    // Positive signals
    ("award", 0.4),
    ("awarded", 0.4),
    ("growth", 0.3),
    ("growing", 0.3),
    ("launch", 0.2),
    ("launches", 0.2),
    ("record", 0.3),
    ("success", 0.5),
    ("successful", 0.5),
    ("partnership", 0.3),
    ("expands", 0.3),
    ("profit", 0.4),
    ("innovative", 0.4),
    ("approved", 0.4),
    ("praised", 0.5),
    ("نجاح", 0.5),
    ("ممتاز", 0.5),
    ("نمو", 0.3),
    ("إطلاق", 0.2),
    ("شراكة", 0.3),
    ("جائزة", 0.4),
    ("أرباح", 0.4),
    // Negative signals
    ("crisis", -0.6),
    ("fraud", -0.7),
    ("lawsuit", -0.5),
    ("fine", -0.3),
    ("fined", -0.4),
    ("loss", -0.4),
    ("losses", -0.4),
    ("delay", -0.3),
    ("delayed", -0.3),
    ("scandal", -0.7),
    ("complaint", -0.4),
    ("complaints", -0.4),
    ("investigation", -0.4),
    ("collapse", -0.6),
    ("failure", -0.4),
    ("أزمة", -0.6),
    ("احتيال", -0.7),
    ("غرامة", -0.4),
    ("خسارة", -0.4),
    ("خسائر", -0.4),
    ("تأخير", -0.3),
    ("فضيحة", -0.7),
    ("شكوى", -0.4),
    ("فشل", -0.4),
];

/// Built-in scorer used when no external scorer is configured.
///
/// Sums matching lexicon weights over the text, clamped to `[-1, 1]`.
/// Confidence grows with the number of lexicon hits and is `0` with none.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexiconScorer;

impl LexiconScorer {
    #[must_use]
    pub fn score_text(text: &str) -> SentimentScore {
        let mut score = 0.0_f64;
        let mut hits = 0u32;
        for word in text.split_whitespace() {
            let w = word
                .trim_matches(|c: char| !c.is_alphabetic())
                .to_lowercase();
            if let Some(&(_, weight)) = LEXICON.iter().find(|(lex, _)| *lex == w) {
                score += weight;
                hits += 1;
            }
        }

        let hits = f64::from(hits);
        SentimentScore {
            score: score.clamp(-1.0, 1.0),
            confidence: hits / (hits + 2.0),
        }
    }
}

#[async_trait]
impl SentimentScorer for LexiconScorer {
    async fn score(
        &self,
        text: &str,
        _entity: &MonitoredEntity,
    ) -> Result<SentimentScore, ScorerError> {
        Ok(Self::score_text(text))
    }
}

// ---------------------------------------------------------------------------
// Linker
// ---------------------------------------------------------------------------

/// How `entity` is mentioned in already-lowercased `text`, if at all.
#[must_use]
pub fn detect_mention(text: &str, entity: &MonitoredEntity) -> Option<MentionType> {
    let occurs = |needle: &str| {
        let needle = needle.trim().to_lowercase();
        !needle.is_empty() && text.contains(&needle)
    };

    if occurs(&entity.name) || entity.native_name.as_deref().is_some_and(occurs) {
        Some(MentionType::Direct)
    } else if entity.aliases.iter().any(|a| occurs(a)) {
        Some(MentionType::Alias)
    } else {
        None
    }
}

/// Finds entity mentions in admitted items and attaches sentiment.
#[derive(Clone)]
pub struct EntityLinker {
    scorer: Arc<dyn SentimentScorer>,
    timeout: Duration,
}

impl EntityLinker {
    #[must_use]
    pub fn new(scorer: Arc<dyn SentimentScorer>, timeout: Duration) -> Self {
        Self { scorer, timeout }
    }

    /// Links for `item` against `entities`, at most one per entity.
    pub async fn link(&self, item: &ContentItem, entities: &[MonitoredEntity]) -> Vec<EntityLink> {
        let text = item.content.to_lowercase();
        let mut links = Vec::new();

        for entity in entities.iter().filter(|e| e.is_active) {
            let Some(mention) = detect_mention(&text, entity) else {
                continue;
            };

            let scoring = self.scorer.score(&item.content, entity);
            let scored = tokio::time::timeout(self.timeout, scoring)
                .await
                .unwrap_or(Err(ScorerError::Timeout(self.timeout)));
            let reading = match scored {
                Ok(reading) => Some(reading),
                Err(e) => {
                    tracing::warn!(
                        item = item.id,
                        entity = %entity.name,
                        error = %e,
                        "sentiment scoring failed; linking without score"
                    );
                    None
                }
            };

            links.push(EntityLink {
                content_item_id: item.id,
                entity_id: entity.id,
                mention_type: Some(mention),
                sentiment_score: reading.map(|r| r.score),
                sentiment_confidence: reading.map(|r| r.confidence),
            });
        }

        links
    }
}
