use std::collections::HashMap;
use std::hash::Hash;
use std::sync::OnceLock;

use regex::Regex;

use crate::core::Time;

/// `key` maps to `value` over `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnershipPeriod<K, V> {
    pub start: Time,
    pub end: Time,
    pub key: K,
    pub value: V,
}

impl<K, V> OwnershipPeriod<K, V> {
    pub fn new(start: Time, end: Time, key: K, value: V) -> Self {
        Self { start, end, key, value }
    }
    pub fn contains(&self, t: Time) -> bool {
        self.start <= t && t < self.end
    }
}

pub type OwnershipMap<K, V> = HashMap<K, Vec<OwnershipPeriod<K, V>>>;

/// Closes the gaps between the periods of each key.
///
/// Periods are sorted by start, every end is moved to the next start and the
/// last end is opened to [`Time::MAX`]. Output does not depend on input order.
pub fn merge_ownership_periods<K, V>(periods: impl IntoIterator<Item = OwnershipPeriod<K, V>>) -> OwnershipMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Ord,
{
    let mut grouped: OwnershipMap<K, V> = HashMap::new();
    for period in periods {
        grouped.entry(period.key.clone()).or_default().push(period);
    }
    for group in grouped.values_mut() {
        close_gaps(group);
    }
    grouped
}

/// Merges a list that already belongs to a single key, e.g. histories of one
/// symbol gathered from several countries.
pub fn remerge_periods<K, V: Ord>(mut periods: Vec<OwnershipPeriod<K, V>>) -> Vec<OwnershipPeriod<K, V>> {
    close_gaps(&mut periods);
    periods
}

fn close_gaps<K, V: Ord>(group: &mut [OwnershipPeriod<K, V>]) {
    group.sort_by(|a, b| (a.start, a.end, &a.value).cmp(&(b.start, b.end, &b.value)));
    let len = group.len();
    for i in 0..len {
        group[i].end = if i + 1 < len { group[i + 1].start } else { Time::MAX };
    }
}

fn symbol_delimiter() -> &'static Regex {
    static DELIMITER: OnceLock<Regex> = OnceLock::new();
    DELIMITER.get_or_init(|| Regex::new(r"[./\-_]").expect("static regex"))
}

/// Splits `BRK.A` style symbols into `(company_symbol, share_class_symbol)`.
///
/// Only the first delimiter splits. Missing symbols split into two empty strings.
pub fn split_delimited_symbol(symbol: Option<&str>) -> (String, String) {
    let Some(symbol) = symbol.filter(|s| !s.is_empty()) else {
        return (String::new(), String::new());
    };
    let mut parts = symbol_delimiter().splitn(symbol, 2);
    let company = parts.next().unwrap_or_default().to_string();
    let share_class = parts.next().unwrap_or_default().to_string();
    (company, share_class)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(n: i64) -> Time {
        Time::from_nanos(n)
    }

    #[test]
    fn test_merge_closes_gaps_and_opens_end() {
        let merged = merge_ownership_periods(vec![
            OwnershipPeriod::new(t(20), t(25), "A", 2u64),
            OwnershipPeriod::new(t(0), t(10), "A", 1u64),
            OwnershipPeriod::new(t(5), t(6), "B", 3u64),
        ]);
        let a = &merged["A"];
        assert_eq!(a.len(), 2);
        assert_eq!((a[0].start, a[0].end, a[0].value), (t(0), t(20), 1));
        assert_eq!((a[1].start, a[1].end, a[1].value), (t(20), Time::MAX, 2));
        assert_eq!(merged["B"][0].end, Time::MAX);
    }

    #[test]
    fn test_merge_independent_of_order() {
        let periods = vec![
            OwnershipPeriod::new(t(30), t(40), 1, 9u64),
            OwnershipPeriod::new(t(10), t(20), 1, 7u64),
            OwnershipPeriod::new(t(20), t(30), 1, 8u64),
        ];
        let mut reversed = periods.clone();
        reversed.reverse();
        assert_eq!(merge_ownership_periods(periods), merge_ownership_periods(reversed));
    }

    #[test]
    fn test_merge_idempotent() {
        let once = merge_ownership_periods(vec![
            OwnershipPeriod::new(t(0), t(3), "A", 1u64),
            OwnershipPeriod::new(t(7), t(9), "A", 2u64),
        ]);
        let twice = merge_ownership_periods(once.values().flatten().cloned());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_contains_is_half_open() {
        let p = OwnershipPeriod::new(t(0), t(10), (), 1u64);
        assert!(p.contains(t(0)));
        assert!(!p.contains(t(10)));
    }

    #[test]
    fn test_split_delimited_symbol() {
        let pair = |a: &str, b: &str| (a.to_string(), b.to_string());
        assert_eq!(split_delimited_symbol(Some("BRK.A")), pair("BRK", "A"));
        assert_eq!(split_delimited_symbol(Some("BRK_A")), pair("BRK", "A"));
        assert_eq!(split_delimited_symbol(Some("BRK-A")), pair("BRK", "A"));
        assert_eq!(split_delimited_symbol(Some("BRK/A")), pair("BRK", "A"));
        assert_eq!(split_delimited_symbol(Some("A.B.C")), pair("A", "B.C"));
        assert_eq!(split_delimited_symbol(Some("AAPL")), pair("AAPL", ""));
        assert_eq!(split_delimited_symbol(Some("")), pair("", ""));
        assert_eq!(split_delimited_symbol(None), pair("", ""));
    }
}
