use gluesql_derive::{FromGlueSqlRow, ReflectGlueSqlRow, ToGlueSqlRow};
use std::str::FromStr;
use trading_model::AssetType;

pub const ASSET_ROUTER: &str = "asset_router";

/// which table holds a sid
#[derive(Debug, Clone, FromGlueSqlRow, ReflectGlueSqlRow, ToGlueSqlRow, PartialEq, Eq)]
pub struct DbRowAssetRouter {
    pub sid: u64,
    pub asset_type: String,
}

impl DbRowAssetRouter {
    pub fn new(sid: u64, asset_type: AssetType) -> Self {
        Self {
            sid,
            asset_type: asset_type.to_string(),
        }
    }
    pub fn asset_type(&self) -> eyre::Result<AssetType> {
        AssetType::from_str(&self.asset_type).map_err(|e| eyre::eyre!("sid {}: {e}", self.sid))
    }
}
