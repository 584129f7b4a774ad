//! Per-keyword alert evaluation.
//!
//! Windowing policy:
//! - the absolute threshold counts the items admitted for the keyword in the
//!   current cycle;
//! - the percentage rule compares that count with the mean of the keyword's
//!   trailing per-cycle counts. With no history the rule does not fire.
//!
//! At most one alert is produced per keyword per cycle. When both rules fire
//! the alert carries [`AlertTrigger::Threshold`].

use std::collections::HashMap;

use pulse_core::{AlertPriority, AlertTrigger, ContentItem, Keyword, NewKeywordAlert};

/// Percentage change of `current` against `baseline`.
///
/// A zero baseline counts as a 100 % change when anything was seen, 0 % otherwise.
#[must_use]
pub fn percentage_change(current: usize, baseline: f64) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let current = current as f64;
    if baseline <= 0.0 {
        if current > 0.0 {
            100.0
        } else {
            0.0
        }
    } else {
        (current - baseline) / baseline * 100.0
    }
}

/// Mean of the trailing counts, `None` without history.
#[must_use]
pub fn baseline_mean(history: &[i32]) -> Option<f64> {
    if history.is_empty() {
        return None;
    }
    let sum: f64 = history.iter().map(|c| f64::from(*c)).sum();
    #[allow(clippy::cast_precision_loss)]
    let len = history.len() as f64;
    Some(sum / len)
}

/// Evaluate one keyword after all of the cycle's admissions are persisted.
///
/// `new_items` are the items admitted for this keyword in this cycle;
/// `history` holds the keyword's counts from previous cycles, newest first.
#[must_use]
pub fn evaluate(
    keyword: &Keyword,
    new_items: &[ContentItem],
    history: &[i32],
) -> Option<NewKeywordAlert> {
    let count = new_items.len();
    let baseline = baseline_mean(history);

    let threshold_fired = keyword
        .effective_threshold()
        .is_some_and(|threshold| count >= threshold);

    let deviation = match (keyword.effective_change_percentage(), baseline) {
        (Some(pct), Some(base)) => {
            let change = percentage_change(count, base);
            if pct > 0 && change >= f64::from(pct) {
                Some(AlertTrigger::Spike)
            } else if pct < 0 && change <= f64::from(pct) {
                Some(AlertTrigger::Drop)
            } else {
                None
            }
        }
        _ => None,
    };

    let trigger = if threshold_fired {
        AlertTrigger::Threshold
    } else {
        deviation?
    };

    let latest = new_items.iter().max_by_key(|item| (item.created_at, item.id));

    Some(NewKeywordAlert {
        keyword_id: keyword.id,
        content_item_id: latest.map(|item| item.id),
        trigger,
        observed_count: i32::try_from(count).unwrap_or(i32::MAX),
        baseline,
        priority: None,
    })
}

/// Priority for an alert referencing `item_id`, from the most negative
/// sentiment among that item's entity links.
///
/// `sentiment` maps item id to that minimum score. Alerts with no item, or
/// whose item carries no scored link, get no priority.
#[must_use]
pub fn priority_for(
    item_id: Option<i64>,
    sentiment: &HashMap<i64, f64>,
) -> Option<AlertPriority> {
    item_id
        .and_then(|id| sentiment.get(&id))
        .map(|score| AlertPriority::from_sentiment(*score))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    fn keyword(threshold: Option<i32>, change: Option<i32>) -> Keyword {
        Keyword {
            id: 7,
            word: "sustainability".to_string(),
            category: Some("esg".to_string()),
            is_active: true,
            alert_threshold: threshold,
            change_percentage: change,
            created_at: Utc::now(),
        }
    }

    fn items(n: usize) -> Vec<ContentItem> {
        let base = Utc::now();
        (0..n)
            .map(|i| ContentItem {
                id: i64::try_from(i).unwrap() + 100,
                platform_tag: "newsapi".to_string(),
                title: format!("item {i}"),
                content: "sustainability".to_string(),
                author_name: None,
                post_url: format!("https://example.com/{i}"),
                posted_at: None,
                matched_keywords: vec!["sustainability".to_string()],
                created_at: base + Duration::seconds(i64::try_from(i).unwrap()),
            })
            .collect()
    }

    #[test]
    fn threshold_fires_at_exact_count() {
        let alert = evaluate(&keyword(Some(2), None), &items(2), &[]).expect("alert");
        assert_eq!(alert.trigger, AlertTrigger::Threshold);
        assert_eq!(alert.observed_count, 2);
        assert_eq!(alert.content_item_id, Some(101), "latest item is referenced");
        assert_eq!(alert.baseline, None);
    }

    #[test]
    fn threshold_below_count_does_not_fire() {
        assert!(evaluate(&keyword(Some(3), None), &items(2), &[]).is_none());
    }

    #[test]
    fn disabled_rules_never_fire() {
        assert!(evaluate(&keyword(None, None), &items(50), &[1, 1]).is_none());
        assert!(evaluate(&keyword(Some(0), Some(0)), &items(50), &[1, 1]).is_none());
        assert!(evaluate(&keyword(Some(-5), None), &items(1), &[]).is_none());
    }

    #[test]
    fn spike_fires_when_change_reaches_percentage() {
        // baseline 2, current 3 => +50 %
        let alert = evaluate(&keyword(None, Some(50)), &items(3), &[2, 2, 2]).expect("alert");
        assert_eq!(alert.trigger, AlertTrigger::Spike);
        assert_eq!(alert.baseline, Some(2.0));
        assert!(evaluate(&keyword(None, Some(51)), &items(3), &[2, 2, 2]).is_none());
    }

    #[test]
    fn drop_fires_with_no_items_and_no_item_reference() {
        // baseline 4, current 0 => -100 %
        let alert = evaluate(&keyword(None, Some(-40)), &[], &[4, 4]).expect("alert");
        assert_eq!(alert.trigger, AlertTrigger::Drop);
        assert_eq!(alert.content_item_id, None);
        assert_eq!(alert.observed_count, 0);
    }

    #[test]
    fn percentage_rule_needs_history() {
        assert!(evaluate(&keyword(None, Some(10)), &items(5), &[]).is_none());
    }

    #[test]
    fn zero_baseline_counts_as_full_increase() {
        assert!((percentage_change(3, 0.0) - 100.0).abs() < f64::EPSILON);
        assert!(percentage_change(0, 0.0).abs() < f64::EPSILON);
        let alert = evaluate(&keyword(None, Some(100)), &items(1), &[0, 0]).expect("alert");
        assert_eq!(alert.trigger, AlertTrigger::Spike);
    }

    #[test]
    fn both_rules_produce_one_threshold_alert() {
        let alert = evaluate(&keyword(Some(2), Some(20)), &items(4), &[1]).expect("alert");
        assert_eq!(alert.trigger, AlertTrigger::Threshold);
        assert_eq!(alert.baseline, Some(1.0));
    }

    #[test]
    fn priority_comes_from_the_referenced_item() {
        let alert = evaluate(&keyword(Some(2), None), &items(2), &[]).expect("alert");
        assert_eq!(alert.priority, None);

        let sentiment = HashMap::from([(100, 0.6), (101, -0.7)]);
        assert_eq!(
            priority_for(alert.content_item_id, &sentiment),
            Some(AlertPriority::High)
        );
        assert_eq!(priority_for(Some(100), &sentiment), Some(AlertPriority::Low));
        assert_eq!(priority_for(Some(102), &sentiment), None);
        assert_eq!(priority_for(None, &sentiment), None);
    }

    #[test]
    fn baseline_mean_averages_history() {
        assert_eq!(baseline_mean(&[]), None);
        assert_eq!(baseline_mean(&[4, 3, 2]), Some(3.0));
    }
}
