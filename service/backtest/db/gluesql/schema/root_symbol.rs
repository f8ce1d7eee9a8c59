use gluesql_derive::{FromGlueSqlRow, ReflectGlueSqlRow, ToGlueSqlRow};

pub const FUTURES_ROOT_SYMBOLS: &str = "futures_root_symbols";

#[derive(Debug, Clone, FromGlueSqlRow, ReflectGlueSqlRow, ToGlueSqlRow, PartialEq, Eq)]
pub struct DbRowRootSymbol {
    pub root_symbol: String,
    pub root_symbol_id: u64,
    pub sector: String,
    pub description: String,
    pub exchange: String,
}
