use gluesql_derive::{FromGlueSqlRow, ReflectGlueSqlRow, ToGlueSqlRow};
use serde::{Deserialize, Serialize};
use trading_model::core::Time;
use trading_model::{AssetCommon, ExchangeInfo, Future};

pub const FUTURES_CONTRACTS: &str = "futures_contracts";

#[derive(Debug, Clone, FromGlueSqlRow, ReflectGlueSqlRow, ToGlueSqlRow, PartialEq, Serialize, Deserialize)]
pub struct DbRowFuture {
    pub sid: u64,
    pub real_sid: String,
    pub symbol: String,
    pub root_symbol: String,
    pub asset_name: String,
    pub start_date: i64,
    pub end_date: i64,
    pub first_traded: i64,
    pub notice_date: i64,
    pub expiration_date: i64,
    pub auto_close_date: i64,
    pub rollover_date: i64,
    pub exchange: String,
    pub currency: String,
    pub tick_size: f64,
    pub multiplier: f64,
    pub price_magnifier: f64,
}

impl DbRowFuture {
    pub fn into_future(self, exchange: ExchangeInfo) -> Future {
        Future {
            common: AssetCommon {
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
            },
            root_symbol: self.root_symbol,
            notice_date: Time::from_nanos(self.notice_date),
            expiration_date: Time::from_nanos(self.expiration_date),
            multiplier: self.multiplier,
            rollover_date: Time::from_nanos(self.rollover_date),
        }
    }
}
