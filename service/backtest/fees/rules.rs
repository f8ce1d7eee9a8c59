use std::collections::{BTreeMap, HashSet};
use std::fmt::Debug;

use trading_model::core::Date;

use super::RuleKind;

/// Decides whether a fee is charged on a trading session.
pub trait DateRule: Debug + Send + Sync {
    fn should_trigger(&self, session: Date) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EveryDay;

impl DateRule for EveryDay {
    fn should_trigger(&self, _session: Date) -> bool {
        true
    }
}

/// Fires on the `days_offset`-th session of each group of sessions.
/// Groups without that many sessions never fire.
fn nth_session_of_groups<K: Ord>(sessions: &[Date], days_offset: usize, key: impl Fn(&Date) -> K) -> HashSet<Date> {
    let mut groups: BTreeMap<K, Vec<Date>> = BTreeMap::new();
    for session in sessions {
        groups.entry(key(session)).or_default().push(*session);
    }
    groups
        .into_values()
        .filter_map(|mut group| {
            group.sort_unstable();
            group.get(days_offset).copied()
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct MonthStart {
    triggers: HashSet<Date>,
}

impl MonthStart {
    pub fn new(sessions: &[Date], days_offset: usize) -> Self {
        Self {
            triggers: nth_session_of_groups(sessions, days_offset, |d| (d.year(), d.month())),
        }
    }
}

impl DateRule for MonthStart {
    fn should_trigger(&self, session: Date) -> bool {
        self.triggers.contains(&session)
    }
}

#[derive(Debug, Clone)]
pub struct WeekStart {
    triggers: HashSet<Date>,
}

impl WeekStart {
    pub fn new(sessions: &[Date], days_offset: usize) -> Self {
        Self {
            triggers: nth_session_of_groups(sessions, days_offset, |d| d.iso_week()),
        }
    }
}

impl DateRule for WeekStart {
    fn should_trigger(&self, session: Date) -> bool {
        self.triggers.contains(&session)
    }
}

impl RuleKind {
    pub fn build(&self, sessions: &[Date], days_offset: usize) -> Box<dyn DateRule> {
        match self {
            RuleKind::MonthStart => Box::new(MonthStart::new(sessions, days_offset)),
            RuleKind::WeekStart => Box::new(WeekStart::new(sessions, days_offset)),
            RuleKind::EveryDay => Box::new(EveryDay),
        }
    }
}
