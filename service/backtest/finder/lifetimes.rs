use std::collections::HashMap;

use trading_model::core::Date;
use trading_model::Sid;

/// Raw `(sid, start, end)` columns in epoch nanoseconds, sorted by sid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LifetimeArrays {
    pub sid: Vec<Sid>,
    pub start: Vec<i64>,
    pub end: Vec<i64>,
}

impl LifetimeArrays {
    pub fn from_rows(mut rows: Vec<(Sid, i64, i64)>) -> Self {
        rows.sort_by_key(|r| r.0);
        let mut this = Self::default();
        for (sid, start, end) in rows {
            this.sid.push(sid);
            this.start.push(start);
            this.end.push(end);
        }
        this
    }
}

/// Existence matrix, one row per date and one column per sid.
#[derive(Debug, Clone, PartialEq)]
pub struct Lifetimes {
    dates: Vec<Date>,
    sids: Vec<Sid>,
    alive: Vec<Vec<bool>>,
    date_index: HashMap<Date, usize>,
    sid_index: HashMap<Sid, usize>,
}

impl Lifetimes {
    /// `alive[date][sid]` is `start < date <= end`, or `start <= date <= end`
    /// when `include_start_date`.
    pub fn compute(arrays: &LifetimeArrays, dates: &[Date], include_start_date: bool) -> Self {
        let alive = dates
            .iter()
            .map(|date| {
                let t = date.to_time().nanos();
                arrays
                    .start
                    .iter()
                    .zip(&arrays.end)
                    .map(|(&start, &end)| {
                        let started = if include_start_date { start <= t } else { start < t };
                        started && t <= end
                    })
                    .collect()
            })
            .collect();
        Self {
            date_index: dates.iter().enumerate().map(|(i, d)| (*d, i)).collect(),
            sid_index: arrays.sid.iter().enumerate().map(|(i, s)| (*s, i)).collect(),
            dates: dates.to_vec(),
            sids: arrays.sid.clone(),
            alive,
        }
    }
    pub fn dates(&self) -> &[Date] {
        &self.dates
    }
    pub fn sids(&self) -> &[Sid] {
        &self.sids
    }
    pub fn row(&self, date: Date) -> Option<&[bool]> {
        self.date_index.get(&date).map(|&i| self.alive[i].as_slice())
    }
    /// `None` when either the date or the sid is not part of the matrix.
    pub fn is_alive(&self, date: Date, sid: Sid) -> Option<bool> {
        let row = self.row(date)?;
        self.sid_index.get(&sid).map(|&j| row[j])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_inclusivity() -> eyre::Result<()> {
        let start = Date::from_ymd(2020, 1, 2)?;
        let end = Date::from_ymd(2020, 1, 10)?;
        let arrays = LifetimeArrays::from_rows(vec![(1, start.to_time().nanos(), end.to_time().nanos())]);

        let exclusive = Lifetimes::compute(&arrays, &[start], false);
        assert_eq!(exclusive.is_alive(start, 1), Some(false));
        let inclusive = Lifetimes::compute(&arrays, &[start], true);
        assert_eq!(inclusive.is_alive(start, 1), Some(true));

        let after = Lifetimes::compute(&arrays, &[end, end.succ()], false);
        assert_eq!(after.is_alive(end, 1), Some(true));
        assert_eq!(after.is_alive(end.succ(), 1), Some(false));
        assert_eq!(after.is_alive(end, 2), None);
        Ok(())
    }
}
