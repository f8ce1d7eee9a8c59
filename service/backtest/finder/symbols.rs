use std::collections::{BTreeSet, HashMap};

use itertools::Itertools;
use trading_model::core::Time;
use trading_model::{
    merge_ownership_periods, remerge_periods, split_delimited_symbol, AssetError, OwnershipMap, OwnershipPeriod, Sid,
};

use crate::db::gluesql::schema::DbRowSymbolMapping;

/// `(company_symbol, share_class_symbol)`
pub type SymbolKey = (String, String);

/// Symbol histories of equities, partitioned by country.
#[derive(Debug, Clone, Default)]
pub struct SymbolOwnership {
    by_country: HashMap<String, OwnershipMap<SymbolKey, Sid>>,
    fuzzy_by_country: HashMap<String, OwnershipMap<SymbolKey, Sid>>,
    all: OwnershipMap<SymbolKey, Sid>,
    fuzzy_all: OwnershipMap<SymbolKey, Sid>,
}

fn fuzzy_key(key: &SymbolKey) -> SymbolKey {
    (format!("{}{}", key.0, key.1), String::new())
}

fn period(m: &DbRowSymbolMapping, key: SymbolKey) -> OwnershipPeriod<SymbolKey, Sid> {
    OwnershipPeriod::new(Time::from_nanos(m.start_date), Time::from_nanos(m.end_date), key, m.sid)
}

/// Concatenates the per-country histories of every key and merges them again.
fn merge_countries<'a>(maps: impl Iterator<Item = &'a OwnershipMap<SymbolKey, Sid>>) -> OwnershipMap<SymbolKey, Sid> {
    let mut concat: HashMap<SymbolKey, Vec<OwnershipPeriod<SymbolKey, Sid>>> = HashMap::new();
    for map in maps {
        for (key, periods) in map {
            concat.entry(key.clone()).or_default().extend(periods.iter().cloned());
        }
    }
    concat.into_iter().map(|(k, v)| (k, remerge_periods(v))).collect()
}

/// Files already merged exact histories under their fuzzy key.
///
/// Spellings that collapse onto one fuzzy key may be held at the same time,
/// so their periods are only sorted, never merged with each other.
fn fuzzy_view(exact: &OwnershipMap<SymbolKey, Sid>) -> OwnershipMap<SymbolKey, Sid> {
    let mut fuzzy: OwnershipMap<SymbolKey, Sid> = HashMap::new();
    for (key, periods) in exact {
        let fkey = fuzzy_key(key);
        fuzzy.entry(fkey.clone()).or_default().extend(
            periods
                .iter()
                .map(|p| OwnershipPeriod::new(p.start, p.end, fkey.clone(), p.value)),
        );
    }
    for periods in fuzzy.values_mut() {
        periods.sort_by_key(|p| (p.start, p.value));
    }
    fuzzy
}

fn is_empty_key(key: &SymbolKey) -> bool {
    key.0.is_empty() && key.1.is_empty()
}

impl SymbolOwnership {
    /// `country_of` gives the country code of the exchange listing a sid.
    /// Mappings without a symbol are skipped.
    pub fn build(mappings: &[DbRowSymbolMapping], country_of: &HashMap<Sid, String>) -> Self {
        let mut grouped: HashMap<&str, Vec<&DbRowSymbolMapping>> = HashMap::new();
        for m in mappings {
            if m.company_symbol.is_empty() && m.share_class_symbol.is_empty() {
                continue;
            }
            if let Some(country) = country_of.get(&m.sid) {
                grouped.entry(country.as_str()).or_default().push(m);
            }
        }
        let mut this = Self::default();
        for (country, rows) in grouped {
            let exact = merge_ownership_periods(rows.iter().map(|m| {
                period(m, (m.company_symbol.clone(), m.share_class_symbol.clone()))
            }));
            this.fuzzy_by_country.insert(country.to_string(), fuzzy_view(&exact));
            this.by_country.insert(country.to_string(), exact);
        }
        this.all = merge_countries(this.by_country.values());
        this.fuzzy_all = fuzzy_view(&this.all);
        this
    }

    fn map(&self, fuzzy: bool, country_code: Option<&str>) -> Option<&OwnershipMap<SymbolKey, Sid>> {
        match (fuzzy, country_code) {
            (false, None) => Some(&self.all),
            (true, None) => Some(&self.fuzzy_all),
            (false, Some(c)) => self.by_country.get(c),
            (true, Some(c)) => self.fuzzy_by_country.get(c),
        }
    }

    /// Sid that held `symbol`, at `as_of` if given, otherwise the only sid that ever held it.
    pub fn lookup(&self, symbol: &str, as_of: Option<Time>, fuzzy: bool, country_code: Option<&str>) -> Result<Sid, AssetError> {
        let exact_key = split_delimited_symbol(Some(symbol));
        let not_found = || AssetError::SymbolNotFound(symbol.to_string());
        if is_empty_key(&exact_key) {
            return Err(not_found());
        }
        let key = if fuzzy { fuzzy_key(&exact_key) } else { exact_key.clone() };
        let periods = self
            .map(fuzzy, country_code)
            .and_then(|m| m.get(&key))
            .filter(|p| !p.is_empty())
            .ok_or_else(not_found)?;

        let candidates: BTreeSet<Sid> = match as_of {
            Some(t) => periods.iter().filter(|p| p.contains(t)).map(|p| p.value).collect(),
            None => periods.iter().map(|p| p.value).collect(),
        };
        match candidates.len() {
            0 => Err(not_found()),
            1 => candidates.into_iter().next().ok_or_else(not_found),
            _ if fuzzy => {
                // several share classes collapse onto one fuzzy key, prefer the exact spelling
                let exact: BTreeSet<Sid> = self
                    .map(false, country_code)
                    .and_then(|m| m.get(&exact_key))
                    .map(|p| {
                        p.iter()
                            .filter(|p| as_of.map_or(true, |t| p.contains(t)))
                            .map(|p| p.value)
                            .filter(|sid| candidates.contains(sid))
                            .collect()
                    })
                    .unwrap_or_default();
                match exact.iter().exactly_one() {
                    Ok(sid) => Ok(*sid),
                    Err(_) => Err(AssetError::MultipleSymbolsFound {
                        symbol: symbol.to_string(),
                        sids: candidates.into_iter().collect(),
                    }),
                }
            }
            _ => Err(AssetError::MultipleSymbolsFound {
                symbol: symbol.to_string(),
                sids: candidates.into_iter().collect(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(id: u64, sid: Sid, symbol: &str, start: i64, end: i64) -> DbRowSymbolMapping {
        let (company_symbol, share_class_symbol) = split_delimited_symbol(Some(symbol));
        DbRowSymbolMapping {
            id,
            sid,
            symbol: symbol.to_string(),
            company_symbol,
            share_class_symbol,
            start_date: start,
            end_date: end,
        }
    }

    fn t(n: i64) -> Time {
        Time::from_nanos(n)
    }

    #[test]
    fn test_point_in_time_lookup() {
        let mappings = vec![mapping(0, 1, "FOO", 0, 10), mapping(1, 2, "FOO", 20, 30)];
        let countries = HashMap::from([(1, "US".to_string()), (2, "US".to_string())]);
        let own = SymbolOwnership::build(&mappings, &countries);
        assert_eq!(own.lookup("FOO", Some(t(5)), false, None), Ok(1));
        // gap closed, first owner keeps the symbol until the next one takes it
        assert_eq!(own.lookup("FOO", Some(t(15)), false, None), Ok(1));
        assert_eq!(own.lookup("FOO", Some(t(25)), false, Some("US")), Ok(2));
        assert_eq!(
            own.lookup("FOO", None, false, None),
            Err(AssetError::MultipleSymbolsFound {
                symbol: "FOO".into(),
                sids: vec![1, 2]
            })
        );
        assert_eq!(
            own.lookup("FOO", Some(t(5)), false, Some("CA")),
            Err(AssetError::SymbolNotFound("FOO".into()))
        );
        assert_eq!(
            own.lookup("BAR", None, false, None),
            Err(AssetError::SymbolNotFound("BAR".into()))
        );
    }

    #[test]
    fn test_countries_merged_for_unqualified_lookup() {
        let mappings = vec![mapping(0, 1, "ABC", 0, 10), mapping(1, 2, "ABC", 10, 30)];
        let countries = HashMap::from([(1, "US".to_string()), (2, "CA".to_string())]);
        let own = SymbolOwnership::build(&mappings, &countries);
        assert_eq!(own.lookup("ABC", Some(t(5)), false, None), Ok(1));
        assert_eq!(own.lookup("ABC", Some(t(15)), false, None), Ok(2));
        assert_eq!(own.lookup("ABC", Some(t(15)), false, Some("US")), Ok(1));
    }

    #[test]
    fn test_fuzzy_lookup() {
        let mappings = vec![mapping(0, 1, "BRK.A", 0, 100), mapping(1, 2, "BRKA", 0, 100)];
        let countries = HashMap::from([(1, "US".to_string()), (2, "US".to_string())]);
        let own = SymbolOwnership::build(&mappings, &countries);
        assert_eq!(own.lookup("BRK_A", None, false, None), Ok(1));
        assert_eq!(own.lookup("BRK/A", Some(t(5)), true, None), Ok(1));
        assert_eq!(own.lookup("BRKA", Some(t(5)), true, None), Ok(2));
        assert_eq!(
            own.lookup("BR.KA", Some(t(5)), true, None),
            Err(AssetError::MultipleSymbolsFound {
                symbol: "BR.KA".into(),
                sids: vec![1, 2]
            })
        );
    }

    #[test]
    fn test_fuzzy_lookup_keeps_concurrent_owners_over_time() {
        let mappings = vec![
            mapping(0, 1, "BRK.A", 0, 50),
            mapping(1, 2, "BRKA", 10, 100),
            mapping(2, 3, "BRK.A", 50, 100),
        ];
        let countries = HashMap::from([(1, "US".to_string()), (2, "US".to_string()), (3, "US".to_string())]);
        let own = SymbolOwnership::build(&mappings, &countries);
        assert_eq!(own.lookup("BRK-A", Some(t(5)), true, None), Ok(1));
        assert_eq!(own.lookup("BRK-A", Some(t(20)), true, Some("US")), Ok(1));
        assert_eq!(own.lookup("BRK-A", Some(t(60)), true, None), Ok(3));
        assert_eq!(own.lookup("BRKA", Some(t(60)), true, None), Ok(2));
        assert_eq!(
            own.lookup("B.RKA", Some(t(60)), true, None),
            Err(AssetError::MultipleSymbolsFound {
                symbol: "B.RKA".into(),
                sids: vec![2, 3]
            })
        );
    }

    #[test]
    fn test_missing_symbols_are_never_owned() {
        let mappings = vec![mapping(0, 9, "", 0, 10), mapping(1, 4, "ABC", 0, 10)];
        let countries = HashMap::from([(9, "US".to_string()), (4, "US".to_string())]);
        let own = SymbolOwnership::build(&mappings, &countries);
        for symbol in ["", ".", "_"] {
            assert_eq!(
                own.lookup(symbol, None, false, None),
                Err(AssetError::SymbolNotFound(symbol.into()))
            );
            assert_eq!(
                own.lookup(symbol, Some(t(5)), true, Some("US")),
                Err(AssetError::SymbolNotFound(symbol.into()))
            );
        }
        assert_eq!(own.lookup("ABC", None, true, None), Ok(4));
    }
}
