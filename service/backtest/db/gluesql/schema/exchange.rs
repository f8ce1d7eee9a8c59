use gluesql_derive::{FromGlueSqlRow, ReflectGlueSqlRow, ToGlueSqlRow};
use trading_model::ExchangeInfo;

pub const EXCHANGES: &str = "exchanges";

#[derive(Debug, Clone, FromGlueSqlRow, ReflectGlueSqlRow, ToGlueSqlRow, PartialEq, Eq)]
pub struct DbRowExchange {
    pub exchange: String,
    pub canonical_name: String,
    pub country_code: String,
}

impl From<DbRowExchange> for ExchangeInfo {
    fn from(x: DbRowExchange) -> Self {
        ExchangeInfo {
            name: x.exchange,
            canonical_name: x.canonical_name,
            country_code: x.country_code,
        }
    }
}
