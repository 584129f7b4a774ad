use serde::{Deserialize, Serialize};

use crate::content::{ContentItem, KeywordAlert};

/// Tagged message pushed to realtime subscribers.
///
/// Serializes as `{"type": "new_item", "item": {...}}` or
/// `{"type": "new_alert", "alert": {...}, "keyword": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Envelope {
    NewItem { item: ContentItem },
    NewAlert { alert: KeywordAlert, keyword: String },
}

impl Envelope {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Envelope::NewItem { .. } => "new_item",
            Envelope::NewAlert { .. } => "new_alert",
        }
    }
}
