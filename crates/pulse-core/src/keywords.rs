use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyword {
    pub id: i64,
    pub word: String,
    pub category: Option<String>,
    pub is_active: bool,
    pub alert_threshold: Option<i32>,
    pub change_percentage: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl Keyword {
    /// Absolute per-cycle mention threshold, if the rule is enabled.
    #[must_use]
    pub fn effective_threshold(&self) -> Option<usize> {
        self.alert_threshold
            .filter(|t| *t > 0)
            .and_then(|t| usize::try_from(t).ok())
    }

    /// Signed baseline deviation trigger, if the rule is enabled.
    #[must_use]
    pub fn effective_change_percentage(&self) -> Option<i32> {
        self.change_percentage.filter(|p| *p != 0)
    }
}

/// Immutable view of the active keyword registry taken at cycle start.
///
/// Inactive keywords are dropped, and words that collide case-insensitively
/// keep only the entry with the lowest id. Entries are ordered by id.
#[derive(Debug, Clone, Default)]
pub struct KeywordSnapshot {
    keywords: Arc<[Keyword]>,
}

impl KeywordSnapshot {
    #[must_use]
    pub fn new(mut keywords: Vec<Keyword>) -> Self {
        keywords.retain(|k| k.is_active && !k.word.trim().is_empty());
        keywords.sort_by_key(|k| k.id);

        let mut seen = HashSet::new();
        keywords.retain(|k| seen.insert(k.word.trim().to_lowercase()));

        Self {
            keywords: keywords.into(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Keyword> {
        self.keywords.iter()
    }

    /// The snapshot's words, in id order.
    #[must_use]
    pub fn words(&self) -> Vec<String> {
        self.keywords.iter().map(|k| k.word.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kw(id: i64, word: &str, active: bool) -> Keyword {
        Keyword {
            id,
            word: word.to_string(),
            category: None,
            is_active: active,
            alert_threshold: None,
            change_percentage: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn snapshot_drops_inactive_keywords() {
        let snap = KeywordSnapshot::new(vec![kw(1, "solar", true), kw(2, "wind", false)]);
        assert_eq!(snap.words(), vec!["solar"]);
    }

    #[test]
    fn snapshot_dedups_case_insensitively_keeping_lowest_id() {
        let snap = KeywordSnapshot::new(vec![kw(7, "Dubai", true), kw(3, "dubai", true)]);
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.iter().next().map(|k| k.id), Some(3));
    }

    #[test]
    fn snapshot_keeps_non_latin_words() {
        let snap = KeywordSnapshot::new(vec![kw(1, "الاستدامة", true), kw(2, "sustainability", true)]);
        assert_eq!(snap.words(), vec!["الاستدامة", "sustainability"]);
    }

    #[test]
    fn snapshot_ignores_blank_words() {
        let snap = KeywordSnapshot::new(vec![kw(1, "  ", true)]);
        assert!(snap.is_empty());
    }

    #[test]
    fn threshold_zero_or_negative_disables_rule() {
        let mut k = kw(1, "x", true);
        k.alert_threshold = Some(0);
        assert_eq!(k.effective_threshold(), None);
        k.alert_threshold = Some(-3);
        assert_eq!(k.effective_threshold(), None);
        k.alert_threshold = Some(2);
        assert_eq!(k.effective_threshold(), Some(2));
    }

    #[test]
    fn change_percentage_zero_disables_rule() {
        let mut k = kw(1, "x", true);
        k.change_percentage = Some(0);
        assert_eq!(k.effective_change_percentage(), None);
        k.change_percentage = Some(-40);
        assert_eq!(k.effective_change_percentage(), Some(-40));
    }
}
