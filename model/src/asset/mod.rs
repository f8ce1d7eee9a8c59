use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use parse_display::{Display, FromStr};
use serde::{Deserialize, Serialize};

use crate::core::Time;

pub use continuous::*;
pub use details::*;
pub use exchange::*;
pub use sid::*;
pub use style::*;

mod continuous;
mod details;
mod exchange;
mod sid;
mod style;

pub type SharedAsset = Arc<Asset>;

/// Kind of a persisted asset, as stored in the asset router.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Display, FromStr, Serialize, Deserialize)]
#[display(style = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Equity,
    Future,
}

/// Tradable instrument resolved from a sid.
///
/// Two assets are equal when their sids are equal, whatever the variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Asset {
    Equity(Equity),
    Future(Future),
    ContinuousFuture(ContinuousFuture),
}

impl Asset {
    pub fn sid(&self) -> Sid {
        match self {
            Asset::Equity(e) => e.sid,
            Asset::Future(f) => f.sid,
            Asset::ContinuousFuture(c) => c.sid,
        }
    }
    pub fn symbol(&self) -> Option<&str> {
        match self {
            Asset::Equity(e) => e.symbol.as_deref(),
            Asset::Future(f) => f.symbol.as_deref(),
            Asset::ContinuousFuture(c) => Some(c.root_symbol.as_str()),
        }
    }
    pub fn exchange(&self) -> &ExchangeInfo {
        match self {
            Asset::Equity(e) => &e.exchange,
            Asset::Future(f) => &f.exchange,
            Asset::ContinuousFuture(c) => &c.exchange,
        }
    }
    pub fn start_date(&self) -> Time {
        match self {
            Asset::Equity(e) => e.start_date,
            Asset::Future(f) => f.start_date,
            Asset::ContinuousFuture(c) => c.start_date,
        }
    }
    pub fn end_date(&self) -> Time {
        match self {
            Asset::Equity(e) => e.end_date,
            Asset::Future(f) => f.end_date,
            Asset::ContinuousFuture(c) => c.end_date,
        }
    }
    /// Persisted fields, absent for continuous futures.
    pub fn common(&self) -> Option<&AssetCommon> {
        match self {
            Asset::Equity(e) => Some(&e.common),
            Asset::Future(f) => Some(&f.common),
            Asset::ContinuousFuture(_) => None,
        }
    }
    pub fn asset_type(&self) -> Option<AssetType> {
        match self {
            Asset::Equity(_) => Some(AssetType::Equity),
            Asset::Future(_) => Some(AssetType::Future),
            Asset::ContinuousFuture(_) => None,
        }
    }
    pub fn as_equity(&self) -> Option<&Equity> {
        match self {
            Asset::Equity(e) => Some(e),
            _ => None,
        }
    }
    pub fn as_future(&self) -> Option<&Future> {
        match self {
            Asset::Future(f) => Some(f),
            _ => None,
        }
    }
    pub fn as_continuous_future(&self) -> Option<&ContinuousFuture> {
        match self {
            Asset::ContinuousFuture(c) => Some(c),
            _ => None,
        }
    }
    pub fn into_shared(self) -> SharedAsset {
        Arc::new(self)
    }
}

impl From<Equity> for Asset {
    fn from(e: Equity) -> Self {
        Asset::Equity(e)
    }
}
impl From<Future> for Asset {
    fn from(f: Future) -> Self {
        Asset::Future(f)
    }
}
impl From<ContinuousFuture> for Asset {
    fn from(c: ContinuousFuture) -> Self {
        Asset::ContinuousFuture(c)
    }
}

impl PartialEq for Asset {
    fn eq(&self, other: &Self) -> bool {
        self.sid() == other.sid()
    }
}
impl Eq for Asset {}

impl Hash for Asset {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.sid().hash(state)
    }
}

impl PartialOrd for Asset {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Asset {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sid().cmp(&other.sid())
    }
}

// integers outside the sid range compare unequal instead of failing
impl PartialEq<u64> for Asset {
    fn eq(&self, other: &u64) -> bool {
        self.sid() == *other
    }
}
impl PartialEq<i64> for Asset {
    fn eq(&self, other: &i64) -> bool {
        u64::try_from(*other).map_or(false, |v| self.sid() == v)
    }
}
impl PartialEq<i128> for Asset {
    fn eq(&self, other: &i128) -> bool {
        // wider than any native sid
        i64::try_from(*other).map_or(false, |v| *self == v)
    }
}
impl PartialOrd<u64> for Asset {
    fn partial_cmp(&self, other: &u64) -> Option<Ordering> {
        Some(self.sid().cmp(other))
    }
}
impl PartialOrd<i64> for Asset {
    fn partial_cmp(&self, other: &i64) -> Option<Ordering> {
        Some(match u64::try_from(*other) {
            Ok(v) => self.sid().cmp(&v),
            Err(_) => Ordering::Greater,
        })
    }
}
