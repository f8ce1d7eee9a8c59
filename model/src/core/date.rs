use crate::core::Time;
use chrono::{Datelike, NaiveDate};
use eyre::{bail, eyre, Result};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use std::fmt::{Debug, Display};
use std::str::FromStr;

/// Calendar day, the unit trading sessions and fee accruals are counted in.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, SerializeDisplay, DeserializeFromStr)]
pub struct Date(NaiveDate);

impl Date {
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or_else(|| eyre!("Invalid date: {year:04}-{month:02}-{day:02}"))
    }
    pub fn year(&self) -> i32 {
        self.0.year()
    }
    pub fn month(&self) -> u32 {
        self.0.month()
    }
    /// (iso year, iso week) pair, used to group sessions by week
    pub fn iso_week(&self) -> (i32, u32) {
        let week = self.0.iso_week();
        (week.year(), week.week())
    }
    /// Monday to Friday.
    pub fn is_weekday(&self) -> bool {
        self.0.weekday().number_from_monday() <= 5
    }
    pub fn to_naive_date(&self) -> NaiveDate {
        self.0
    }
    /// Midnight UTC.
    pub fn to_time(&self) -> Time {
        Time::from_secs(self.0.and_time(chrono::NaiveTime::MIN).and_utc().timestamp())
    }
    pub fn add_days(&self, days: i64) -> Self {
        Self(self.0 + chrono::Duration::days(days))
    }
    pub fn succ(&self) -> Self {
        self.add_days(1)
    }
    /// Signed number of calendar days from `self` to `other`.
    pub fn days_until(&self, other: Date) -> i64 {
        (other.0 - self.0).num_days()
    }
    pub fn format(&self, format: &str) -> String {
        self.0.format(format).to_string()
    }
}

impl Display for Date {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl Debug for Date {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl FromStr for Date {
    type Err = eyre::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let date = match s.len() {
            // YYYYMMDD
            8 => NaiveDate::parse_from_str(s, "%Y%m%d")?,
            // YYYY-MM-DD
            10 => NaiveDate::parse_from_str(s, "%Y-%m-%d")?,
            _ => bail!("Invalid date: {}", s),
        };
        Ok(Self(date))
    }
}

impl From<NaiveDate> for Date {
    fn from(date: NaiveDate) -> Self {
        Date(date)
    }
}

impl From<Date> for NaiveDate {
    fn from(date: Date) -> Self {
        date.0
    }
}

/// Inclusive range of calendar days.
pub struct DateRange {
    start: Date,
    end: Date,
}

impl DateRange {
    pub fn new_inclusive(start: Date, end: Date) -> Result<Self> {
        if start > end {
            bail!("Invalid date range: {} > {}", start, end)
        }
        Ok(DateRange { start, end })
    }
    pub fn start(&self) -> Date {
        self.start
    }
    pub fn end(&self) -> Date {
        self.end
    }
}

impl Iterator for DateRange {
    type Item = Date;
    fn next(&mut self) -> Option<Self::Item> {
        if self.start <= self.end {
            let current = self.start;
            self.start = self.start.succ();
            Some(current)
        } else {
            None
        }
    }
}
