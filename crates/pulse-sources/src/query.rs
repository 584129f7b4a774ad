//! Keyword query batching.
//!
//! Providers cap the length of a search query (NewsAPI: 500 URL-encoded
//! characters) or the number of terms per request. The active keyword list is
//! split into batches that each fit the provider's budget.

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

/// Per-provider limits for one search request.
#[derive(Debug, Clone, Copy)]
pub struct QueryBudget {
    /// Maximum URL-encoded length of the joined query. `None` for no limit.
    pub max_encoded_len: Option<usize>,
    /// Maximum number of keywords per request.
    pub max_terms: usize,
}

/// Quote a keyword that contains whitespace so providers treat it as a phrase.
#[must_use]
pub fn quote_term(word: &str) -> String {
    let trimmed = word.trim();
    if trimmed.contains(char::is_whitespace) {
        format!("\"{}\"", trimmed.replace('"', ""))
    } else {
        trimmed.to_string()
    }
}

fn encoded_len(s: &str) -> usize {
    utf8_percent_encode(s, NON_ALPHANUMERIC).map(str::len).sum()
}

/// Split `words` into batches that respect `budget` once joined with `separator`.
///
/// Order is preserved. A single keyword that alone exceeds the length budget
/// still gets its own batch; the provider decides whether to reject it.
#[must_use]
pub fn batch_keywords(
    words: &[String],
    separator: &str,
    budget: QueryBudget,
) -> Vec<Vec<String>> {
    let max_terms = budget.max_terms.max(1);
    let sep_len = encoded_len(separator);

    let mut batches: Vec<Vec<String>> = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut current_len = 0usize;

    for word in words {
        let term = quote_term(word);
        if term.is_empty() {
            continue;
        }
        let term_len = encoded_len(&term);

        if !current.is_empty() {
            let over_len = budget
                .max_encoded_len
                .is_some_and(|max| current_len + sep_len + term_len > max);
            if over_len || current.len() >= max_terms {
                batches.push(std::mem::take(&mut current));
                current_len = 0;
            }
        }

        if !current.is_empty() {
            current_len += sep_len;
        }
        current_len += term_len;
        current.push(term);
    }

    if !current.is_empty() {
        batches.push(current);
    }

    batches
}
