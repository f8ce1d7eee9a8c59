use serde::{Deserialize, Serialize};

/// Country code used when an exchange was ingested without one.
pub const UNKNOWN_COUNTRY_CODE: &str = "??";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExchangeInfo {
    pub name: String,
    pub canonical_name: String,
    pub country_code: String,
}

impl ExchangeInfo {
    pub fn new(name: impl Into<String>, canonical_name: Option<String>, country_code: Option<String>) -> Self {
        let name = name.into();
        Self {
            canonical_name: canonical_name.unwrap_or_else(|| name.clone()),
            country_code: country_code.unwrap_or_else(|| UNKNOWN_COUNTRY_CODE.to_string()),
            name,
        }
    }
    /// Name a trading calendar would be registered under.
    pub fn calendar_name(&self) -> &str {
        &self.canonical_name
    }
}
