//! Text cleanup for provider snippets and bodies.

use std::sync::LazyLock;

use regex::Regex;

static TRUNCATION_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*(?:…|\.\.\.)?\s*\[\+\d+ chars\]\s*$").expect("valid truncation regex")
});

/// Strip HTML tags, decode the common entities, and normalize whitespace.
pub(crate) fn strip_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    let decoded = out
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove NewsAPI's trailing `"… [+1234 chars]"` truncation marker.
pub(crate) fn strip_truncation_marker(text: &str) -> String {
    TRUNCATION_MARKER.replace(text, "").trim().to_string()
}

/// Clean an optional provider field, mapping empty results to `None`.
pub(crate) fn clean_optional(raw: Option<&str>) -> Option<String> {
    raw.map(strip_html).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_collapses_whitespace() {
        assert_eq!(
            strip_html("<p>Solar  <b>park</b>\n expands</p>"),
            "Solar park expands"
        );
    }

    #[test]
    fn decodes_common_entities() {
        assert_eq!(strip_html("Q&amp;A &quot;live&quot;"), "Q&A \"live\"");
    }

    #[test]
    fn strips_newsapi_truncation_marker() {
        assert_eq!(
            strip_truncation_marker("The authority said on Monday… [+2345 chars]"),
            "The authority said on Monday"
        );
        assert_eq!(strip_truncation_marker("No marker here"), "No marker here");
    }

    #[test]
    fn clean_optional_drops_empty_markup() {
        assert_eq!(clean_optional(Some("<br/>")), None);
        assert_eq!(clean_optional(None), None);
        assert_eq!(clean_optional(Some(" text ")), Some("text".to_string()));
    }
}
