//! URL canonicalization for the dedup identity.

use reqwest::Url;

const TRACKING_PARAMS: [&str; 5] = ["fbclid", "gclid", "mc_cid", "mc_eid", "ocid"];

/// Canonicalize an article URL so the same story from two providers collapses
/// to one key.
///
/// Drops the fragment and tracking parameters (`utm_*`, `fbclid`, `gclid`,
/// and a few mailer ids), lowercases the host (the parser already does this),
/// and trims a trailing slash from non-root paths. Returns `None` for
/// anything that is not an absolute http(s) URL.
#[must_use]
pub fn canonical_url(raw: &str) -> Option<String> {
    let mut url = Url::parse(raw.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return None;
    }

    url.set_fragment(None);

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| {
            let key = k.to_ascii_lowercase();
            !key.starts_with("utm_") && !TRACKING_PARAMS.contains(&key.as_str())
        })
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }

    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(path.trim_end_matches('/'));
    }

    Some(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fragment_and_trailing_slash() {
        assert_eq!(
            canonical_url("https://example.com/news/story/#comments").as_deref(),
            Some("https://example.com/news/story")
        );
    }

    #[test]
    fn lowercases_host() {
        assert_eq!(
            canonical_url("https://WWW.Example.COM/Story").as_deref(),
            Some("https://www.example.com/Story")
        );
    }

    #[test]
    fn removes_tracking_params_but_keeps_others() {
        assert_eq!(
            canonical_url("https://example.com/a?id=7&utm_source=x&UTM_medium=y&fbclid=z").as_deref(),
            Some("https://example.com/a?id=7")
        );
    }

    #[test]
    fn removes_query_entirely_when_only_tracking() {
        assert_eq!(
            canonical_url("https://example.com/a?utm_campaign=spring&gclid=1").as_deref(),
            Some("https://example.com/a")
        );
    }

    #[test]
    fn root_path_keeps_its_slash() {
        assert_eq!(
            canonical_url("https://example.com/").as_deref(),
            Some("https://example.com/")
        );
    }

    #[test]
    fn rejects_non_http_and_relative_urls() {
        assert!(canonical_url("mailto:desk@example.com").is_none());
        assert!(canonical_url("/relative/path").is_none());
        assert!(canonical_url("").is_none());
    }

    #[test]
    fn same_story_from_two_providers_collapses() {
        let a = canonical_url("https://news.example.ae/2024/03/solar-park/?utm_source=newsapi");
        let b = canonical_url("https://NEWS.example.ae/2024/03/solar-park#top");
        assert_eq!(a, b);
    }
}
