//! Provider date parsing. Anything unparseable becomes `None`.

use std::sync::LazyLock;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use regex::Regex;

static RELATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d+)\s*(s|secs?|seconds?|m|mins?|minutes?|h|hrs?|hours?|d|days?|w|weeks?|mos?|months?|y|years?)\s+ago$")
        .expect("valid relative date regex")
});

/// Parse an RFC 3339 timestamp, or a naive `YYYY-MM-DD HH:MM:SS` taken as UTC.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Combine Event Registry's separate `date` and `time` fields.
///
/// `date_time` wins when present. A date without a time is taken as midnight UTC.
pub(crate) fn combine_date_time(
    date_time: Option<&str>,
    date: Option<&str>,
    time: Option<&str>,
) -> Option<DateTime<Utc>> {
    if let Some(parsed) = date_time.and_then(parse_timestamp) {
        return Some(parsed);
    }
    let day = NaiveDate::parse_from_str(date?.trim(), "%Y-%m-%d").ok()?;
    let clock = time
        .and_then(|t| NaiveTime::parse_from_str(t.trim(), "%H:%M:%S").ok())
        .unwrap_or(NaiveTime::MIN);
    Some(day.and_time(clock).and_utc())
}

/// Parse a search-result date such as `"3 hours ago"`, `"yesterday"`,
/// `"Mar 3, 2024"`, or `"03/03/2024, 10:00 AM, +0000 UTC"`, relative to `now`.
pub(crate) fn parse_display_date(raw: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if raw.eq_ignore_ascii_case("yesterday") {
        return Some(now - Duration::days(1));
    }
    if raw.eq_ignore_ascii_case("just now") || raw.eq_ignore_ascii_case("today") {
        return Some(now);
    }

    if let Some(caps) = RELATIVE.captures(raw) {
        let amount: i64 = caps[1].parse().ok()?;
        let unit = caps[2].to_ascii_lowercase();
        let delta = match unit.as_str() {
            u if u.starts_with('s') => Duration::try_seconds(amount)?,
            u if u.starts_with("mo") => Duration::try_days(amount.checked_mul(30)?)?,
            u if u.starts_with('m') => Duration::try_minutes(amount)?,
            u if u.starts_with('h') => Duration::try_hours(amount)?,
            u if u.starts_with('d') => Duration::try_days(amount)?,
            u if u.starts_with('w') => Duration::try_weeks(amount)?,
            u if u.starts_with('y') => Duration::try_days(amount.checked_mul(365)?)?,
            _ => return None,
        };
        return now.checked_sub_signed(delta);
    }

    let without_utc = raw.trim_end_matches(" UTC");
    if let Ok(dt) = DateTime::parse_from_str(without_utc, "%m/%d/%Y, %I:%M %p, %z") {
        return Some(dt.with_timezone(&Utc));
    }

    if let Some(ts) = parse_timestamp(raw) {
        return Some(ts);
    }

    ["%b %d, %Y", "%B %d, %Y", "%d %b %Y", "%Y-%m-%d", "%m/%d/%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
}
