use std::collections::HashMap;
use std::path::PathBuf;

use backtest_core::config::Config;
use backtest_core::db::gluesql::{get_memory_storage, get_sled_storage, AssetStore};
use backtest_core::finder::AssetFinder;
use backtest_core::ASSET_DB_VERSION;
use clap::Parser;
use gluesql::core::store::{GStore, GStoreMut};
use lib::batch::Batcher;
use lib::log::setup_logs;
use tracing::{error, info};
use trading_model::AssetError;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
pub struct CliArgument {
    /// The path to config file
    #[clap(short, long, value_parser, value_name = "FILE", env = "CONFIG")]
    pub config: PathBuf,
}

fn open<G: GStore + GStoreMut + Clone>(storage: G, config: &Config) -> eyre::Result<()> {
    let mut store = AssetStore::new(storage, Batcher::new(config.finder.max_bound_params));
    if let Err(err) = store.init_db(ASSET_DB_VERSION) {
        if let Some(AssetError::VersionMismatch { expected, found }) = err.downcast_ref::<AssetError>() {
            error!("Asset db version check failed, expected {expected} found {found}");
            std::process::exit(10);
        }
        return Err(err);
    }
    let mut finder = AssetFinder::new(store, HashMap::new())?;
    let equities = finder.equities_sids()?;
    let futures = finder.futures_sids()?;
    info!(
        "Asset db v{} holds {} equities and {} futures",
        ASSET_DB_VERSION,
        equities.len(),
        futures.len()
    );
    Ok(())
}

fn main() -> eyre::Result<()> {
    let cli_args: CliArgument = CliArgument::parse();
    let config = Config::try_from(cli_args.config)?;
    setup_logs(config.log.level)?;
    info!("Fee schedule: {:?}", config.fees);

    if config.database.in_memory {
        open(get_memory_storage(), &config)
    } else {
        open(get_sled_storage(&config.database)?, &config)
    }
}
