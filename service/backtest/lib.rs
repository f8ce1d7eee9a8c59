pub mod config;
pub mod db;
pub mod fees;
pub mod finder;

/// Schema version of the asset db, bumped on any table layout change.
pub const ASSET_DB_VERSION: u64 = 7;
