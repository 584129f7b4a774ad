//! Keyword matcher: a filter, not a scorer.
//!
//! A keyword matches when its lowercased word occurs as a substring of the
//! candidate's lowercased title, body, or snippet. The same rule applies to
//! every script.

use pulse_core::{ContentCandidate, Keyword, KeywordSnapshot};

/// Matcher over one cycle's keyword snapshot, with words lowercased once.
#[derive(Debug, Clone)]
pub struct KeywordMatcher<'a> {
    needles: Vec<(&'a Keyword, String)>,
}

impl<'a> KeywordMatcher<'a> {
    #[must_use]
    pub fn new(snapshot: &'a KeywordSnapshot) -> Self {
        let needles = snapshot
            .iter()
            .map(|k| (k, k.word.trim().to_lowercase()))
            .filter(|(_, needle)| !needle.is_empty())
            .collect();
        Self { needles }
    }

    /// Keywords found in `candidate`, in snapshot order.
    #[must_use]
    pub fn matches(&self, candidate: &ContentCandidate) -> Vec<&'a Keyword> {
        let fields: Vec<String> = [
            Some(candidate.title.as_str()),
            candidate.body.as_deref(),
            candidate.snippet.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::to_lowercase)
        .collect();

        self.needles
            .iter()
            .filter(|(_, needle)| fields.iter().any(|f| f.contains(needle.as_str())))
            .map(|(keyword, _)| *keyword)
            .collect()
    }
}

/// One-shot form of [`KeywordMatcher::matches`], returning matched words.
#[must_use]
pub fn match_keywords(candidate: &ContentCandidate, snapshot: &KeywordSnapshot) -> Vec<String> {
    KeywordMatcher::new(snapshot)
        .matches(candidate)
        .into_iter()
        .map(|k| k.word.clone())
        .collect()
}
