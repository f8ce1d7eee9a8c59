use std::collections::{HashMap, HashSet};

use eyre::{Result, WrapErr};
use futures::executor::block_on;
use gluesql::core::store::{GStore, GStoreMut};
use gluesql::prelude::SharedMemoryStorage;
use gluesql_shared_sled_storage::{Config as SledConfig, Mode, SharedSledStorage};
use itertools::Itertools;
use lib::batch::Batcher;
use lib::gluesql::{DbRow, QueryFilter, Table, TableCreate};
use lib::log::can_create_file_in_directory;
use tracing::{debug, info, warn};
use trading_model::{AssetType, Sid};

use crate::config::DatabaseConfig;
use crate::db::{derive_asset_rows, AssetData, AssetRows, ExistingAssets};
use schema::*;

/// table schema
pub mod schema;

pub fn get_sled_storage(config: &DatabaseConfig) -> Result<SharedSledStorage> {
    if !can_create_file_in_directory(&config.directory) {
        eyre::bail!(
            "no write access to configured db path ({})",
            config.directory.display()
        );
    }
    let sled_config = SledConfig::default()
        .path(&config.directory)
        .mode(Mode::HighThroughput);
    SharedSledStorage::new(sled_config, true)
}

/// One insert per chunk, each binding at most the batcher's parameter limit.
async fn insert_chunked<G: GStore + GStoreMut, D: DbRow>(table: &mut Table<G, D>, batcher: Batcher, rows: &[D]) -> Result<()> {
    for chunk in batcher.row_chunks(rows, D::columns().len()) {
        table.insert_many(chunk).await?;
    }
    Ok(())
}

fn report_undo(table: &str, deleted: Result<usize>) {
    match deleted {
        Ok(0) => {}
        Ok(n) => warn!("Removed {n} rows of a failed write from {table}"),
        Err(err) => warn!("Could not remove rows of a failed write from {table}: {err:#}"),
    }
}

pub fn get_memory_storage() -> SharedMemoryStorage {
    SharedMemoryStorage::new()
}

/// Persistent side of the asset directory.
///
/// Every method drives the async gluesql calls to completion, callers see a
/// plain synchronous API. Reads of sid batches are split by the [`Batcher`].
pub struct AssetStore<G: GStore + GStoreMut + Clone> {
    equities: Table<G, DbRowEquity>,
    mappings: Table<G, DbRowSymbolMapping>,
    futures: Table<G, DbRowFuture>,
    exchanges: Table<G, DbRowExchange>,
    root_symbols: Table<G, DbRowRootSymbol>,
    router: Table<G, DbRowAssetRouter>,
    version: Table<G, DbRowVersionInfo>,
    batcher: Batcher,
}

impl<G: GStore + GStoreMut + Clone> AssetStore<G> {
    pub fn new(storage: G, batcher: Batcher) -> Self {
        Self {
            equities: Table::new(EQUITIES, storage.clone()),
            mappings: Table::new(EQUITY_SYMBOL_MAPPINGS, storage.clone()),
            futures: Table::new(FUTURES_CONTRACTS, storage.clone()),
            exchanges: Table::new(EXCHANGES, storage.clone()),
            root_symbols: Table::new(FUTURES_ROOT_SYMBOLS, storage.clone()),
            router: Table::new(ASSET_ROUTER, storage.clone()),
            version: Table::new(VERSION_INFO, storage),
            batcher,
        }
    }
    pub fn batcher(&self) -> Batcher {
        self.batcher
    }

    /// Creates missing tables. A fresh store is stamped with `version`, an
    /// existing one must already carry it.
    pub fn init_db(&mut self, version: u64) -> Result<()> {
        block_on(async {
            self.version.init_version_info(version).await?;
            self.equities.create_table().await?;
            self.mappings.create_table().await?;
            self.futures.create_table().await?;
            self.exchanges.create_table().await?;
            self.root_symbols.create_table().await?;
            self.router.create_table().await?;
            Ok(())
        })
    }
    pub fn check_version_info(&mut self, expected: u64) -> Result<()> {
        block_on(self.version.check_version_info(expected))
    }
    /// overwrite the stored version, only meant for tooling and tests
    pub fn write_version_info(&mut self, version: u64) -> Result<()> {
        block_on(async {
            self.version.create_table().await?;
            self.version.upsert_version_info(DbRowVersionInfo { version }).await
        })
    }

    /// Persists one bulk of assets.
    ///
    /// Every row is derived and validated before the first insert, a rejected
    /// write leaves the store untouched. When an insert fails midway the rows
    /// of this write that already landed are deleted again.
    pub fn write(&mut self, data: AssetData, version: u64) -> Result<()> {
        self.init_db(version)?;
        let existing = ExistingAssets {
            sids: self.all_router_rows()?.into_iter().map(|r| r.sid).collect(),
            root_symbols: block_on(self.root_symbols.select_unordered(None))?
                .into_iter()
                .map(|r| r.root_symbol)
                .collect(),
            next_mapping_id: block_on(self.mappings.select_unordered(None))?
                .iter()
                .map(|m| m.id + 1)
                .max()
                .unwrap_or(0),
        };
        let rows = derive_asset_rows(data, &existing)?;
        let known_exchanges: HashSet<String> = self.exchanges()?.into_iter().map(|e| e.exchange).collect();
        let exchanges = rows
            .exchanges
            .iter()
            .filter(|e| !known_exchanges.contains(&e.exchange))
            .cloned()
            .collect_vec();

        if let Err(err) = self.insert_rows(&rows, &exchanges) {
            self.undo_write(&rows, &exchanges);
            return Err(err.wrap_err("asset db write failed"));
        }
        info!(
            "Wrote {} equities ({} symbol mappings), {} futures, {} exchanges, {} root symbols",
            rows.equities.len(),
            rows.mappings.len(),
            rows.futures.len(),
            exchanges.len(),
            rows.root_symbols.len()
        );
        Ok(())
    }

    fn insert_rows(&mut self, rows: &AssetRows, exchanges: &[DbRowExchange]) -> Result<()> {
        let batcher = self.batcher;
        block_on(async {
            insert_chunked(&mut self.exchanges, batcher, exchanges).await?;
            insert_chunked(&mut self.root_symbols, batcher, &rows.root_symbols).await?;
            insert_chunked(&mut self.equities, batcher, &rows.equities).await?;
            insert_chunked(&mut self.mappings, batcher, &rows.mappings).await?;
            insert_chunked(&mut self.futures, batcher, &rows.futures).await?;
            insert_chunked(&mut self.router, batcher, &rows.router).await
        })
    }

    /// Deletes every key of `rows`. All of them were new to the store, older rows are not touched.
    fn undo_write(&mut self, rows: &AssetRows, exchanges: &[DbRowExchange]) {
        let sids = rows.router.iter().map(|r| r.sid).collect_vec();
        let mapping_ids = rows.mappings.iter().map(|m| m.id).collect_vec();
        let root_symbols = rows.root_symbols.iter().map(|r| r.root_symbol.clone()).collect_vec();
        let exchange_names = exchanges.iter().map(|e| e.exchange.clone()).collect_vec();
        let batcher = self.batcher;
        block_on(async {
            for chunk in batcher.chunks(&sids) {
                report_undo(ASSET_ROUTER, self.router.delete(QueryFilter::in_u64("sid", chunk)).await);
                report_undo(EQUITIES, self.equities.delete(QueryFilter::in_u64("sid", chunk)).await);
                report_undo(FUTURES_CONTRACTS, self.futures.delete(QueryFilter::in_u64("sid", chunk)).await);
            }
            for chunk in batcher.chunks(&mapping_ids) {
                let filter = QueryFilter::in_u64("id", chunk);
                report_undo(EQUITY_SYMBOL_MAPPINGS, self.mappings.delete(filter).await);
            }
            for chunk in batcher.chunks(&root_symbols) {
                let filter = QueryFilter::in_string("root_symbol", chunk);
                report_undo(FUTURES_ROOT_SYMBOLS, self.root_symbols.delete(filter).await);
            }
            for chunk in batcher.chunks(&exchange_names) {
                let filter = QueryFilter::in_string("exchange", chunk);
                report_undo(EXCHANGES, self.exchanges.delete(filter).await);
            }
        });
    }

    pub fn lookup_asset_types(&mut self, sids: &[Sid]) -> Result<HashMap<Sid, AssetType>> {
        let batcher = self.batcher;
        let rows = batcher.run(sids, |chunk| {
            block_on(self.router.select_unordered(Some(QueryFilter::in_u64("sid", chunk))))
        })?;
        debug!("Looked up asset types of {} sids, {} known", sids.len(), rows.len());
        rows.into_iter().map(|r| Ok((r.sid, r.asset_type()?))).collect()
    }
    pub fn all_router_rows(&mut self) -> Result<Vec<DbRowAssetRouter>> {
        block_on(self.router.select(None, "sid ASC"))
    }
    pub fn sids_of_type(&mut self, asset_type: AssetType) -> Result<Vec<Sid>> {
        let filter = QueryFilter::eq_string("asset_type", asset_type.to_string());
        let rows = block_on(self.router.select(Some(filter), "sid ASC"))?;
        Ok(rows.into_iter().map(|r| r.sid).collect())
    }

    pub fn equities_by_sids(&mut self, sids: &[Sid]) -> Result<Vec<DbRowEquity>> {
        let batcher = self.batcher;
        batcher.run(sids, |chunk| {
            block_on(self.equities.select_unordered(Some(QueryFilter::in_u64("sid", chunk))))
        })
    }
    pub fn futures_by_sids(&mut self, sids: &[Sid]) -> Result<Vec<DbRowFuture>> {
        let batcher = self.batcher;
        batcher.run(sids, |chunk| {
            block_on(self.futures.select_unordered(Some(QueryFilter::in_u64("sid", chunk))))
        })
    }
    pub fn equities_on_exchanges(&mut self, exchanges: &[String]) -> Result<Vec<DbRowEquity>> {
        let batcher = self.batcher;
        batcher.run(exchanges, |chunk| {
            block_on(self.equities.select(Some(QueryFilter::in_string("exchange", chunk)), "sid ASC"))
        })
    }
    pub fn all_equities(&mut self) -> Result<Vec<DbRowEquity>> {
        block_on(self.equities.select(None, "sid ASC"))
    }
    pub fn symbol_mappings(&mut self) -> Result<Vec<DbRowSymbolMapping>> {
        block_on(self.mappings.select(None, "id ASC"))
    }
    pub fn futures_by_symbol(&mut self, symbol: &str) -> Result<Vec<DbRowFuture>> {
        block_on(
            self.futures
                .select(Some(QueryFilter::eq_string("symbol", symbol)), "sid ASC"),
        )
    }
    pub fn futures_by_root_symbol(&mut self, root_symbol: &str) -> Result<Vec<DbRowFuture>> {
        block_on(self.futures.select(
            Some(QueryFilter::eq_string("root_symbol", root_symbol)),
            "auto_close_date ASC",
        ))
    }
    pub fn root_symbol(&mut self, root_symbol: &str) -> Result<Option<DbRowRootSymbol>> {
        block_on(
            self.root_symbols
                .select_one_unordered(Some(QueryFilter::eq_string("root_symbol", root_symbol))),
        )
    }
    pub fn exchanges(&mut self) -> Result<Vec<DbRowExchange>> {
        block_on(self.exchanges.select(None, "exchange ASC"))
    }
}
