use thiserror::Error;

use crate::Sid;

/// Failures the asset directory reports with a distinguishable type.
///
/// Services return `eyre::Result` and raise these through `.into()`, so callers
/// recover the kind with `report.downcast_ref::<AssetError>()`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetError {
    #[error("No asset found for sids: {0:?}")]
    SidsNotFound(Vec<Sid>),
    #[error("Symbol {0:?} was not found")]
    SymbolNotFound(String),
    #[error("Root symbol {0:?} was not found")]
    RootSymbolNotFound(String),
    #[error("Multiple sids held symbol {symbol:?}: {sids:?}")]
    MultipleSymbolsFound { symbol: String, sids: Vec<Sid> },
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Asset db version mismatch, expected = {expected}, found = {found}")]
    VersionMismatch { expected: u64, found: u64 },
    #[error("Column {column} of table {table} is required and has no default")]
    MissingDefault { table: String, column: String },
    #[error("No borrow fee data available: {0}")]
    ProviderDataUnavailable(String),
}

impl AssetError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
    pub fn missing_default(table: &str, column: &str) -> Self {
        Self::MissingDefault {
            table: table.to_string(),
            column: column.to_string(),
        }
    }
}
