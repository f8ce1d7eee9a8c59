use std::path::PathBuf;
use std::str::FromStr;

use chrono::NaiveDate;
use lib::batch::DEFAULT_MAX_BOUND_PARAMS;
use lib::log::LogLevel;
use serde::Deserialize;
use trading_model::core::Date;

use crate::fees::RuleKind;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub directory: PathBuf,
    /// keep the asset db in memory, `directory` is ignored
    #[serde(default)]
    pub in_memory: bool,
}
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    pub level: LogLevel,
}
#[derive(Debug, Clone, Deserialize)]
pub struct FinderConfig {
    #[serde(default = "default_max_bound_params")]
    pub max_bound_params: usize,
}
impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            max_bound_params: DEFAULT_MAX_BOUND_PARAMS,
        }
    }
}
fn default_max_bound_params() -> usize {
    DEFAULT_MAX_BOUND_PARAMS
}

/// annual rate charged on a date rule
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct FeeRuleConfig {
    pub rate: f64,
    #[serde(default)]
    pub rule: RuleKind,
    #[serde(default)]
    pub days_offset: usize,
}
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BorrowFeeConfig {
    /// first day the borrow fee source has data for
    #[serde(default = "default_borrow_data_start")]
    pub data_start: Date,
}
impl Default for BorrowFeeConfig {
    fn default() -> Self {
        Self {
            data_start: default_borrow_data_start(),
        }
    }
}
pub fn default_borrow_data_start() -> Date {
    Date::from(NaiveDate::from_ymd_opt(2018, 4, 16).unwrap_or_default())
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct FeesConfig {
    pub margin: Option<FeeRuleConfig>,
    pub management: Option<FeeRuleConfig>,
    pub performance: Option<FeeRuleConfig>,
    pub borrow: Option<BorrowFeeConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub log: LogConfig,
    #[serde(default)]
    pub finder: FinderConfig,
    #[serde(default)]
    pub fees: FeesConfig,
}

impl FromStr for Config {
    type Err = toml::de::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        toml::from_str(s)
    }
}

impl TryFrom<PathBuf> for Config {
    type Error = eyre::Error;

    fn try_from(path: PathBuf) -> Result<Self, Self::Error> {
        let toml_str = std::fs::read_to_string(path).map_err(|e| eyre::eyre!("{e}"))?;
        Config::from_str(&toml_str).map_err(|e| eyre::eyre!("{e}"))
    }
}
