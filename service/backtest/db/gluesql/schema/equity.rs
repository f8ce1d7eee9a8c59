use gluesql_derive::{FromGlueSqlRow, ReflectGlueSqlRow, ToGlueSqlRow};
use serde::{Deserialize, Serialize};
use trading_model::core::Time;
use trading_model::{AssetCommon, Equity, ExchangeInfo};

pub const EQUITIES: &str = "equities";

/// latest known state of an equity, one row per sid
#[derive(Debug, Clone, FromGlueSqlRow, ReflectGlueSqlRow, ToGlueSqlRow, PartialEq, Serialize, Deserialize)]
pub struct DbRowEquity {
    pub sid: u64,
    pub real_sid: String,
    /// empty when the equity never had a symbol
    pub symbol: String,
    pub asset_name: String,
    pub start_date: i64,
    pub end_date: i64,
    pub first_traded: i64,
    pub auto_close_date: i64,
    pub exchange: String,
    pub currency: String,
    pub tick_size: f64,
    pub price_magnifier: f64,
}

impl DbRowEquity {
    pub fn into_equity(self, exchange: ExchangeInfo) -> Equity {
        Equity::new(AssetCommon {
            sid: self.sid,
            real_sid: self.real_sid,
            exchange,
            currency: self.currency,
            symbol: Some(self.symbol).filter(|s| !s.is_empty()),
            asset_name: self.asset_name,
            start_date: Time::from_nanos(self.start_date),
            end_date: Time::from_nanos(self.end_date),
            first_traded: Time::from_nanos(self.first_traded),
            auto_close_date: Time::from_nanos(self.auto_close_date),
            tick_size: self.tick_size,
            price_magnifier: self.price_magnifier,
        })
    }
}
