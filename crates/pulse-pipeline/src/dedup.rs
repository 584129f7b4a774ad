//! Dedup gate: check-then-insert keyed by canonical URL.
//!
//! The check is not atomic with the insert. A concurrent writer that wins the
//! race surfaces as an insert conflict, which is reported as a duplicate.

use pulse_core::{ContentCandidate, ContentItem, NewContentItem};

use crate::error::StoreError;
use crate::store::{ContentStore, InsertOutcome};

/// Outcome of admitting one candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    Admitted(ContentItem),
    /// The URL is already stored. Expected steady state, not an error.
    Duplicate,
}

/// Admit `candidate` carrying `matched_keywords`, unless its URL is already stored.
///
/// # Errors
///
/// Returns [`StoreError`] if the existence check or the insert fails.
pub async fn admit(
    store: &dyn ContentStore,
    candidate: &ContentCandidate,
    matched_keywords: Vec<String>,
) -> Result<Admission, StoreError> {
    if store.exists_by_url(&candidate.canonical_url).await? {
        return Ok(Admission::Duplicate);
    }

    let item = NewContentItem::from_candidate(candidate, matched_keywords);
    match store.insert_item(&item).await? {
        InsertOutcome::Inserted(stored) => Ok(Admission::Admitted(stored)),
        InsertOutcome::Conflict => {
            tracing::debug!(url = %candidate.canonical_url, "insert conflict; already admitted");
            Ok(Admission::Duplicate)
        }
    }
}
