use gluesql_derive::{FromGlueSqlRow, ReflectGlueSqlRow, ToGlueSqlRow};

pub const EQUITY_SYMBOL_MAPPINGS: &str = "equity_symbol_mappings";

/// symbol held by a sid over `[start_date, end_date]`, append only
#[derive(Debug, Clone, FromGlueSqlRow, ReflectGlueSqlRow, ToGlueSqlRow, PartialEq, Eq)]
pub struct DbRowSymbolMapping {
    pub id: u64,
    pub sid: u64,
    pub symbol: String,
    pub company_symbol: String,
    pub share_class_symbol: String,
    pub start_date: i64,
    pub end_date: i64,
}
