use crate::core::Date;
use chrono::{DateTime, TimeZone, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Debug, Display};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeStampError {
    #[error("Could not parse time from string: {0}")]
    Chrono(#[from] chrono::ParseError),
    #[error("Timestamp out of range: {0}")]
    OutOfRange(String),
}

pub type TimeDiffNs = i64;
pub type TimeStampNs = i64;

pub const NANOSECONDS_PER_SECOND: i64 = 1_000_000_000;
pub const NANOSECONDS_PER_MILLISECOND: i64 = 1_000_000;
pub const SECONDS_PER_DAY: i64 = 24 * 60 * 60;
pub const NANOSECONDS_PER_DAY: i64 = SECONDS_PER_DAY * NANOSECONDS_PER_SECOND;

/// Missing timestamp marker.
pub const NAT_TIMESTAMP: TimeStampNs = i64::MIN;

/// Point in time as integer nanoseconds since the Unix epoch.
///
/// This is the representation every date column is persisted with.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Time {
    nanos: TimeStampNs,
}

impl Display for Time {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_nat() {
            return f.write_str("NaT");
        }
        write!(f, "{}", self.to_utc().to_rfc3339())
    }
}

impl Debug for Time {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_nat() {
            return f.write_str("NaT");
        }
        write!(f, "{}ns", self.nanos)
    }
}

impl Time {
    pub const NAT: Self = Self { nanos: NAT_TIMESTAMP };
    pub const MIN: Self = Self { nanos: 0 };
    /// Open end of an ownership period.
    pub const MAX: Self = Self { nanos: i64::MAX };

    pub const fn min() -> Self {
        Self::MIN
    }
    pub const fn max() -> Self {
        Self::MAX
    }
    pub const fn from_nanos(nanos: TimeStampNs) -> Self {
        Self { nanos }
    }
    pub const fn from_secs(secs: i64) -> Self {
        Self {
            nanos: secs * NANOSECONDS_PER_SECOND,
        }
    }
    pub fn nanos(&self) -> TimeStampNs {
        self.nanos
    }
    pub fn is_nat(&self) -> bool {
        self.nanos == NAT_TIMESTAMP
    }
    /// `None` for NaT.
    pub fn valid(self) -> Option<Self> {
        if self.is_nat() {
            None
        } else {
            Some(self)
        }
    }
    pub fn to_utc(&self) -> DateTime<Utc> {
        Utc.timestamp_nanos(self.nanos)
    }
    /// Calendar date (UTC) this instant falls on.
    pub fn date(&self) -> Date {
        Date::from(self.to_utc().date_naive())
    }
    pub fn add_days(&self, days: i64) -> Self {
        if self.is_nat() {
            return *self;
        }
        Self {
            nanos: self.nanos.saturating_add(days.saturating_mul(NANOSECONDS_PER_DAY)),
        }
    }
    pub fn from_rfc3339(s: &str) -> Result<Self, TimeStampError> {
        let dt = DateTime::parse_from_rfc3339(s)?;
        let nanos = dt
            .timestamp_nanos_opt()
            .ok_or_else(|| TimeStampError::OutOfRange(s.to_string()))?;
        Ok(Self { nanos })
    }
}

impl From<DateTime<Utc>> for Time {
    fn from(t: DateTime<Utc>) -> Self {
        // chrono only fails outside 1677..2262, clamp to the open end
        let nanos = t.timestamp_nanos_opt().unwrap_or(i64::MAX);
        Self { nanos }
    }
}

impl From<Date> for Time {
    fn from(d: Date) -> Self {
        d.to_time()
    }
}

impl Serialize for Time {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.nanos)
    }
}

impl<'de> Deserialize<'de> for Time {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // nanosecond integer, RFC3339 string or a plain date
        struct TimeVisitor;
        impl<'de> de::Visitor<'de> for TimeVisitor {
            type Value = Time;
            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("an integer or a string")
            }
            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(Time::from_nanos(v))
            }
            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                i64::try_from(v).map(Time::from_nanos).map_err(de::Error::custom)
            }
            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Time::from_str(v).map_err(de::Error::custom)
            }
        }
        deserializer.deserialize_any(TimeVisitor)
    }
}

impl FromStr for Time {
    type Err = TimeStampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("nat") {
            return Ok(Self::NAT);
        }
        if let Ok(i) = s.parse::<i64>() {
            return Ok(Self::from_nanos(i));
        }
        if let Ok(date) = Date::from_str(s) {
            return Ok(date.to_time());
        }
        Self::from_rfc3339(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_from_date_string() {
        let t: Time = "2020-01-02".parse().unwrap();
        assert_eq!(t.date(), Date::from_ymd(2020, 1, 2).unwrap());
        assert_eq!(t.add_days(1).date(), Date::from_ymd(2020, 1, 3).unwrap());
    }

    #[test]
    fn test_nat_is_sticky() {
        assert!(Time::NAT.add_days(3).is_nat());
        assert_eq!(Time::NAT.valid(), None);
        assert_eq!(Time::NAT.to_string(), "NaT");
        assert!(Time::NAT < Time::MIN);
    }
}
