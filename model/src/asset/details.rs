use crate::core::Time;
use crate::{ExchangeInfo, Sid};
use serde::{Deserialize, Serialize};

/// Fields every persisted asset carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetCommon {
    pub sid: Sid,
    /// Stable identifier from the data vendor.
    pub real_sid: String,
    pub exchange: ExchangeInfo,
    pub currency: String,
    pub symbol: Option<String>,
    pub asset_name: String,
    pub start_date: Time,
    pub end_date: Time,
    pub first_traded: Time,
    pub auto_close_date: Time,
    pub tick_size: f64,
    pub price_magnifier: f64,
}

impl AssetCommon {
    pub fn symbol_str(&self) -> &str {
        self.symbol.as_deref().unwrap_or("")
    }
    /// Alive over `[start_date, end_date]`.
    pub fn is_alive_at(&self, t: Time) -> bool {
        self.start_date <= t && t <= self.end_date
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equity {
    #[serde(flatten)]
    pub common: AssetCommon,
}

impl Equity {
    pub fn new(common: AssetCommon) -> Self {
        Self { common }
    }
}

impl std::ops::Deref for Equity {
    type Target = AssetCommon;
    fn deref(&self) -> &Self::Target {
        &self.common
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Future {
    #[serde(flatten)]
    pub common: AssetCommon,
    pub root_symbol: String,
    pub notice_date: Time,
    pub expiration_date: Time,
    pub multiplier: f64,
    pub rollover_date: Time,
}

impl std::ops::Deref for Future {
    type Target = AssetCommon;
    fn deref(&self) -> &Self::Target {
        &self.common
    }
}
