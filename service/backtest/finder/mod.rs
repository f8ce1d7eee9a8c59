use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use eyre::Result;
use gluesql::core::store::{GStore, GStoreMut};
use itertools::Itertools;
use strum::IntoEnumIterator;
use tracing::{debug, info};
use trading_model::core::{Date, Time};
use trading_model::{
    encode_continuous_future_sid, AdjustmentStyle, Asset, AssetError, AssetType, ContinuousFuture, ExchangeInfo,
    RollStyle, SharedAsset, Sid,
};

use crate::db::gluesql::AssetStore;
use crate::ASSET_DB_VERSION;

mod chain;
mod lifetimes;
mod symbols;

pub use chain::*;
pub use lifetimes::*;
pub use symbols::*;

/// Point-in-time directory of the assets held by an [`AssetStore`].
///
/// Every lookup reads through per-instance caches that are never evicted.
/// Writing to the store after the finder is built is not reflected.
pub struct AssetFinder<G: GStore + GStoreMut + Clone> {
    store: AssetStore<G>,
    exchanges: HashMap<String, ExchangeInfo>,
    asset_cache: HashMap<Sid, Option<SharedAsset>>,
    asset_type_cache: HashMap<Sid, Option<AssetType>>,
    ordered_contracts: HashMap<String, Arc<OrderedContracts>>,
    lifetime_arrays: HashMap<BTreeSet<String>, Arc<LifetimeArrays>>,
    country_equities: HashMap<String, Vec<Sid>>,
    symbol_ownership: Option<Arc<SymbolOwnership>>,
    chain_predicates: HashMap<String, ChainPredicate>,
}

impl<G: GStore + GStoreMut + Clone> AssetFinder<G> {
    /// Fails with [`AssetError::VersionMismatch`] unless the store carries [`ASSET_DB_VERSION`].
    pub fn new(mut store: AssetStore<G>, chain_predicates: HashMap<String, ChainPredicate>) -> Result<Self> {
        store.check_version_info(ASSET_DB_VERSION)?;
        let exchanges: HashMap<String, ExchangeInfo> = store
            .exchanges()?
            .into_iter()
            .map(|row| (row.exchange.clone(), ExchangeInfo::from(row)))
            .collect();
        info!("Asset finder opened, {} exchanges", exchanges.len());
        Ok(Self {
            store,
            exchanges,
            asset_cache: HashMap::new(),
            asset_type_cache: HashMap::new(),
            ordered_contracts: HashMap::new(),
            lifetime_arrays: HashMap::new(),
            country_equities: HashMap::new(),
            symbol_ownership: None,
            chain_predicates,
        })
    }

    pub fn exchange_info(&self, name: &str) -> Option<&ExchangeInfo> {
        self.exchanges.get(name)
    }
    fn exchange_or_default(&self, name: &str) -> ExchangeInfo {
        self.exchanges
            .get(name)
            .cloned()
            .unwrap_or_else(|| ExchangeInfo::new(name, None, None))
    }

    pub fn sids(&mut self) -> Result<Vec<Sid>> {
        Ok(self.store.all_router_rows()?.into_iter().map(|r| r.sid).collect())
    }
    pub fn equities_sids(&mut self) -> Result<Vec<Sid>> {
        self.store.sids_of_type(AssetType::Equity)
    }
    pub fn futures_sids(&mut self) -> Result<Vec<Sid>> {
        self.store.sids_of_type(AssetType::Future)
    }

    /// Type of every sid, `None` for sids the store does not know.
    pub fn lookup_asset_types(&mut self, sids: &[Sid]) -> Result<HashMap<Sid, Option<AssetType>>> {
        let misses = sids
            .iter()
            .copied()
            .filter(|sid| !self.asset_type_cache.contains_key(sid))
            .unique()
            .collect_vec();
        if !misses.is_empty() {
            let found = self.store.lookup_asset_types(&misses)?;
            for sid in misses {
                self.asset_type_cache.insert(sid, found.get(&sid).copied());
            }
        }
        Ok(sids
            .iter()
            .map(|sid| (*sid, self.asset_type_cache.get(sid).copied().flatten()))
            .collect())
    }

    pub fn group_by_type(&mut self, sids: &[Sid]) -> Result<HashMap<Option<AssetType>, Vec<Sid>>> {
        let types = self.lookup_asset_types(sids)?;
        let mut grouped: HashMap<Option<AssetType>, Vec<Sid>> = HashMap::new();
        for sid in sids.iter().unique() {
            grouped.entry(types.get(sid).copied().flatten()).or_default().push(*sid);
        }
        Ok(grouped)
    }

    /// Equities listed on an exchange of `country_code`, by sid.
    pub fn equities_sids_for_country_code(&mut self, country_code: &str) -> Result<Vec<Sid>> {
        if let Some(sids) = self.country_equities.get(country_code) {
            return Ok(sids.clone());
        }
        let sids = self.load_equities_sids_for_country_code(country_code)?;
        self.country_equities.insert(country_code.to_string(), sids.clone());
        Ok(sids)
    }
    fn load_equities_sids_for_country_code(&mut self, country_code: &str) -> Result<Vec<Sid>> {
        let exchanges = self
            .exchanges
            .values()
            .filter(|e| e.country_code == country_code)
            .map(|e| e.name.clone())
            .collect_vec();
        if exchanges.is_empty() {
            return Ok(vec![]);
        }
        let mut sids = self
            .store
            .equities_on_exchanges(&exchanges)?
            .into_iter()
            .map(|r| r.sid)
            .collect_vec();
        sids.sort_unstable();
        Ok(sids)
    }

    fn load_equities(&mut self, sids: &[Sid]) -> Result<Vec<SharedAsset>> {
        let rows = self.store.equities_by_sids(sids)?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let exchange = self.exchange_or_default(&row.exchange);
                Asset::Equity(row.into_equity(exchange)).into_shared()
            })
            .collect())
    }
    fn load_futures(&mut self, sids: &[Sid]) -> Result<Vec<SharedAsset>> {
        let rows = self.store.futures_by_sids(sids)?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let exchange = self.exchange_or_default(&row.exchange);
                Asset::Future(row.into_future(exchange)).into_shared()
            })
            .collect())
    }

    pub fn retrieve_asset(&mut self, sid: Sid, default_none: bool) -> Result<Option<SharedAsset>> {
        match self.asset_cache.get(&sid) {
            Some(Some(asset)) => Ok(Some(asset.clone())),
            Some(None) if default_none => Ok(None),
            Some(None) => Err(AssetError::SidsNotFound(vec![sid]).into()),
            None => Ok(self.retrieve_all(&[sid], default_none)?.into_iter().next().flatten()),
        }
    }

    /// Assets of `sids` in input order, duplicates included.
    ///
    /// Unknown sids are remembered as missing. Without `default_none` they are
    /// reported together in one [`AssetError::SidsNotFound`].
    pub fn retrieve_all(&mut self, sids: &[Sid], default_none: bool) -> Result<Vec<Option<SharedAsset>>> {
        let misses = sids
            .iter()
            .copied()
            .filter(|sid| !self.asset_cache.contains_key(sid))
            .unique()
            .collect_vec();
        if !misses.is_empty() {
            let mut grouped = self.group_by_type(&misses)?;
            let mut loaded = vec![];
            if let Some(equities) = grouped.remove(&Some(AssetType::Equity)) {
                loaded.extend(self.load_equities(&equities)?);
            }
            if let Some(futures) = grouped.remove(&Some(AssetType::Future)) {
                loaded.extend(self.load_futures(&futures)?);
            }
            debug!("Resolved {} of {} uncached sids", loaded.len(), misses.len());
            for asset in loaded {
                self.asset_cache.insert(asset.sid(), Some(asset));
            }
            for sid in misses {
                self.asset_cache.entry(sid).or_insert(None);
            }
        }

        let mut missing = vec![];
        let assets = sids
            .iter()
            .map(|sid| match self.asset_cache.get(sid) {
                Some(Some(asset)) => Some(asset.clone()),
                _ => {
                    missing.push(*sid);
                    None
                }
            })
            .collect_vec();
        if !missing.is_empty() && !default_none {
            return Err(AssetError::SidsNotFound(missing.into_iter().unique().collect()).into());
        }
        Ok(assets)
    }

    fn retrieve_typed(&mut self, sids: &[Sid], asset_type: AssetType) -> Result<HashMap<Sid, SharedAsset>> {
        let mut found = HashMap::new();
        let mut misses = vec![];
        for sid in sids.iter().unique() {
            match self.asset_cache.get(sid) {
                Some(Some(asset)) if asset.asset_type() == Some(asset_type) => {
                    found.insert(*sid, asset.clone());
                }
                _ => misses.push(*sid),
            }
        }
        if !misses.is_empty() {
            let loaded = match asset_type {
                AssetType::Equity => self.load_equities(&misses)?,
                AssetType::Future => self.load_futures(&misses)?,
            };
            for asset in loaded {
                self.asset_cache.insert(asset.sid(), Some(asset.clone()));
                found.insert(asset.sid(), asset);
            }
        }
        let failures = misses.into_iter().filter(|sid| !found.contains_key(sid)).collect_vec();
        if !failures.is_empty() {
            return Err(AssetError::SidsNotFound(failures).into());
        }
        Ok(found)
    }

    /// Every sid must be an equity, all the others are reported together.
    pub fn retrieve_equities(&mut self, sids: &[Sid]) -> Result<HashMap<Sid, SharedAsset>> {
        self.retrieve_typed(sids, AssetType::Equity)
    }
    pub fn retrieve_futures_contracts(&mut self, sids: &[Sid]) -> Result<HashMap<Sid, SharedAsset>> {
        self.retrieve_typed(sids, AssetType::Future)
    }

    fn symbol_ownership(&mut self) -> Result<Arc<SymbolOwnership>> {
        if let Some(ownership) = &self.symbol_ownership {
            return Ok(ownership.clone());
        }
        let country_of: HashMap<Sid, String> = self
            .store
            .all_equities()?
            .into_iter()
            .map(|row| {
                let country = self.exchange_or_default(&row.exchange).country_code;
                (row.sid, country)
            })
            .collect();
        let mappings = self.store.symbol_mappings()?;
        let ownership = Arc::new(SymbolOwnership::build(&mappings, &country_of));
        debug!("Built symbol ownership maps from {} mappings", mappings.len());
        self.symbol_ownership = Some(ownership.clone());
        Ok(ownership)
    }

    /// Equity that held `symbol`.
    ///
    /// With `as_of` the owner at that time is returned. Without it the symbol
    /// must have belonged to a single sid over its whole history.
    pub fn lookup_symbol(
        &mut self,
        symbol: &str,
        as_of: Option<Time>,
        fuzzy: bool,
        country_code: Option<&str>,
    ) -> Result<SharedAsset> {
        let sid = self.symbol_ownership()?.lookup(symbol, as_of, fuzzy, country_code)?;
        self.retrieve_asset(sid, false)?
            .ok_or_else(|| AssetError::SidsNotFound(vec![sid]).into())
    }

    pub fn lookup_symbols(
        &mut self,
        symbols: &[&str],
        as_of: Option<Time>,
        fuzzy: bool,
        country_code: Option<&str>,
    ) -> Result<Vec<SharedAsset>> {
        symbols
            .iter()
            .map(|symbol| self.lookup_symbol(symbol, as_of, fuzzy, country_code))
            .collect()
    }

    /// Future contract with exactly this symbol.
    pub fn lookup_future_symbol(&mut self, symbol: &str) -> Result<SharedAsset> {
        let Some(row) = self.store.futures_by_symbol(symbol)?.into_iter().next() else {
            return Err(AssetError::SymbolNotFound(symbol.to_string()).into());
        };
        if let Some(Some(asset)) = self.asset_cache.get(&row.sid) {
            return Ok(asset.clone());
        }
        let exchange = self.exchange_or_default(&row.exchange);
        let asset = Asset::Future(row.into_future(exchange)).into_shared();
        self.asset_cache.insert(asset.sid(), Some(asset.clone()));
        Ok(asset)
    }

    /// Futures chain of `root_symbol`, built once.
    pub fn get_ordered_contracts(&mut self, root_symbol: &str) -> Result<Arc<OrderedContracts>> {
        if let Some(chain) = self.ordered_contracts.get(root_symbol) {
            return Ok(chain.clone());
        }
        let futures = self
            .store
            .futures_by_root_symbol(root_symbol)?
            .into_iter()
            .map(|row| {
                let exchange = self.exchange_or_default(&row.exchange);
                row.into_future(exchange)
            })
            .collect_vec();
        let chain = Arc::new(OrderedContracts::new(
            root_symbol,
            &futures,
            self.chain_predicates.get(root_symbol),
        ));
        debug!("Built {} chain with {} contracts", root_symbol, chain.len());
        self.ordered_contracts.insert(root_symbol.to_string(), chain.clone());
        Ok(chain)
    }

    /// Continuous future over the chain of `root_symbol`.
    ///
    /// All three adjustments of the same definition are cached together, the
    /// requested one is returned.
    pub fn create_continuous_future(
        &mut self,
        root_symbol: &str,
        offset: i64,
        roll_style: RollStyle,
        adjustment: AdjustmentStyle,
    ) -> Result<SharedAsset> {
        let sid = encode_continuous_future_sid(root_symbol, offset, roll_style, adjustment)?;
        if let Some(Some(asset)) = self.asset_cache.get(&sid) {
            return Ok(asset.clone());
        }
        let chain = self.get_ordered_contracts(root_symbol)?;
        let root = self
            .store
            .root_symbol(root_symbol)?
            .ok_or_else(|| AssetError::RootSymbolNotFound(root_symbol.to_string()))?;
        let exchange = self.exchange_or_default(&root.exchange);
        let base = ContinuousFuture::new(
            root_symbol,
            offset,
            roll_style,
            AdjustmentStyle::None,
            chain.start_date(),
            chain.end_date(),
            exchange,
        )?;
        for style in AdjustmentStyle::iter() {
            let cf = base.with_adjustment(style);
            self.asset_cache
                .insert(cf.sid, Some(Asset::ContinuousFuture(cf).into_shared()));
        }
        info!(
            "Created continuous future {} offset={} roll={} over {} contracts",
            root_symbol,
            offset,
            roll_style,
            chain.len()
        );
        self.asset_cache
            .get(&sid)
            .cloned()
            .flatten()
            .ok_or_else(|| AssetError::SidsNotFound(vec![sid]).into())
    }

    fn lifetime_arrays(&mut self, country_codes: BTreeSet<String>) -> Result<Arc<LifetimeArrays>> {
        if let Some(arrays) = self.lifetime_arrays.get(&country_codes) {
            return Ok(arrays.clone());
        }
        let exchanges = self
            .exchanges
            .values()
            .filter(|e| country_codes.contains(&e.country_code))
            .map(|e| e.name.clone())
            .collect_vec();
        let rows = if exchanges.is_empty() {
            vec![]
        } else {
            self.store.equities_on_exchanges(&exchanges)?
        };
        let arrays = Arc::new(LifetimeArrays::from_rows(
            rows.into_iter().map(|r| (r.sid, r.start_date, r.end_date)).collect(),
        ));
        self.lifetime_arrays.insert(country_codes, arrays.clone());
        Ok(arrays)
    }

    /// Which equities of `country_codes` exist on each of `dates`.
    ///
    /// Takes a collection of codes, a single code must be wrapped, e.g. `["US"]`.
    pub fn lifetimes<I>(&mut self, dates: &[Date], include_start_date: bool, country_codes: I) -> Result<Lifetimes>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let key: BTreeSet<String> = country_codes.into_iter().map(|c| c.as_ref().to_string()).collect();
        let arrays = self.lifetime_arrays(key)?;
        Ok(Lifetimes::compute(&arrays, dates, include_start_date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::gluesql::get_memory_storage;
    use crate::db::{AssetData, EquityInput, ExchangeInput, FutureInput, RootSymbolInput};
    use gluesql::prelude::SharedMemoryStorage;
    use lib::batch::Batcher;

    fn day(y: i32, m: u32, d: u32) -> Time {
        Date::from_ymd(y, m, d).map(|d| d.to_time()).unwrap_or(Time::NAT)
    }

    fn finder(data: AssetData) -> Result<AssetFinder<SharedMemoryStorage>> {
        let mut store = AssetStore::new(get_memory_storage(), Batcher::new(3));
        store.write(data, ASSET_DB_VERSION)?;
        AssetFinder::new(store, HashMap::new())
    }

    fn equity(sid: Sid, symbol: &str, exchange: &str) -> EquityInput {
        EquityInput {
            sid,
            symbol: Some(symbol.into()),
            exchange: Some(exchange.into()),
            start_date: Some(day(2020, 1, 2)),
            end_date: Some(day(2020, 12, 31)),
            ..Default::default()
        }
    }

    fn future(sid: Sid, symbol: &str, expiration: Time) -> FutureInput {
        FutureInput {
            sid,
            symbol: Some(symbol.into()),
            root_symbol: Some("CL".into()),
            exchange: Some("CMES".into()),
            start_date: Some(day(2020, 1, 2)),
            expiration_date: Some(expiration),
            ..Default::default()
        }
    }

    fn data() -> AssetData {
        AssetData {
            equities: vec![equity(1, "AAA", "NYSE"), equity(3, "BBB", "NYSE"), equity(5, "CCC", "TSX")],
            futures: vec![future(10, "CLF21", day(2021, 1, 20)), future(11, "CLG21", day(2021, 2, 20))],
            exchanges: vec![
                ExchangeInput {
                    exchange: "NYSE".into(),
                    canonical_name: None,
                    country_code: Some("US".into()),
                },
                ExchangeInput {
                    exchange: "TSX".into(),
                    canonical_name: None,
                    country_code: Some("CA".into()),
                },
            ],
            root_symbols: vec![RootSymbolInput {
                root_symbol: "CL".into(),
                exchange: Some("CMES".into()),
                ..Default::default()
            }],
        }
    }

    #[test]
    fn test_retrieve_all_preserves_order_and_duplicates() -> Result<()> {
        let mut finder = finder(data())?;
        let assets = finder.retrieve_all(&[5, 3, 5, 1], false)?;
        let sids = assets.iter().map(|a| a.as_ref().map(|a| a.sid())).collect_vec();
        assert_eq!(sids, vec![Some(5), Some(3), Some(5), Some(1)]);
        Ok(())
    }

    #[test]
    fn test_missing_sids_are_negative_cached() -> Result<()> {
        let mut finder = finder(data())?;
        let err = finder.retrieve_all(&[1, 7, 8, 7], false).unwrap_err();
        assert_eq!(
            err.downcast_ref::<AssetError>(),
            Some(&AssetError::SidsNotFound(vec![7, 8]))
        );
        assert_eq!(finder.asset_cache.get(&7), Some(&None));
        assert!(finder.retrieve_asset(7, true)?.is_none());
        assert!(finder.retrieve_asset(8, false).is_err());
        let mixed = finder.retrieve_all(&[10, 7], true)?;
        assert!(mixed[0].as_ref().and_then(|a| a.as_future()).is_some());
        assert!(mixed[1].is_none());
        Ok(())
    }

    #[test]
    fn test_typed_retrieval_reports_all_failures() -> Result<()> {
        let mut finder = finder(data())?;
        assert_eq!(finder.retrieve_equities(&[1, 3])?.len(), 2);
        let err = finder.retrieve_equities(&[1, 10, 99]).unwrap_err();
        assert_eq!(
            err.downcast_ref::<AssetError>(),
            Some(&AssetError::SidsNotFound(vec![10, 99]))
        );
        assert_eq!(finder.retrieve_futures_contracts(&[10, 11])?.len(), 2);
        Ok(())
    }

    #[test]
    fn test_type_grouping_and_countries() -> Result<()> {
        let mut finder = finder(data())?;
        let grouped = finder.group_by_type(&[1, 10, 42, 3])?;
        assert_eq!(grouped[&Some(AssetType::Equity)], vec![1, 3]);
        assert_eq!(grouped[&Some(AssetType::Future)], vec![10]);
        assert_eq!(grouped[&None], vec![42]);
        assert_eq!(finder.equities_sids_for_country_code("US")?, vec![1, 3]);
        assert_eq!(finder.equities_sids_for_country_code("CA")?, vec![5]);
        assert!(finder.equities_sids_for_country_code("DE")?.is_empty());
        assert_eq!(finder.sids()?, vec![1, 3, 5, 10, 11]);
        assert_eq!(finder.futures_sids()?, vec![10, 11]);
        assert_eq!(finder.exchange_info("CMES").map(|e| e.country_code.as_str()), Some("??"));
        Ok(())
    }

    #[test]
    fn test_symbol_lookups() -> Result<()> {
        let mut finder = finder(data())?;
        assert_eq!(finder.lookup_symbol("BBB", None, false, None)?.sid(), 3);
        assert_eq!(finder.lookup_symbol("CCC", Some(day(2020, 6, 1)), false, Some("CA"))?.sid(), 5);
        let err = finder.lookup_symbol("CCC", None, false, Some("US")).unwrap_err();
        assert_eq!(
            err.downcast_ref::<AssetError>(),
            Some(&AssetError::SymbolNotFound("CCC".into()))
        );
        let sids = finder
            .lookup_symbols(&["CCC", "AAA"], None, false, None)?
            .iter()
            .map(|a| a.sid())
            .collect_vec();
        assert_eq!(sids, vec![5, 1]);
        assert_eq!(finder.lookup_future_symbol("CLG21")?.sid(), 11);
        assert!(finder.lookup_future_symbol("CLH21").is_err());
        Ok(())
    }

    #[test]
    fn test_continuous_future_variants_share_one_definition() -> Result<()> {
        let mut finder = finder(data())?;
        let add = finder.create_continuous_future("CL", 0, RollStyle::Calendar, AdjustmentStyle::Additive)?;
        let cf = add.as_continuous_future().cloned().ok_or_else(|| eyre::eyre!("not continuous"))?;
        assert_eq!(cf.adjustment, AdjustmentStyle::Additive);
        assert_eq!(cf.start_date, day(2020, 1, 2));
        assert_eq!(cf.end_date, day(2021, 2, 20));
        for style in AdjustmentStyle::iter() {
            let sid = encode_continuous_future_sid("CL", 0, RollStyle::Calendar, style)?;
            assert!(finder.retrieve_asset(sid, false)?.is_some());
        }
        let err = finder
            .create_continuous_future("NG", 0, RollStyle::Calendar, AdjustmentStyle::None)
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<AssetError>(),
            Some(&AssetError::RootSymbolNotFound("NG".into()))
        );
        Ok(())
    }

    #[test]
    fn test_lifetimes_per_country_set() -> Result<()> {
        let mut finder = finder(data())?;
        let start = Date::from_ymd(2020, 1, 2)?;
        let later = Date::from_ymd(2020, 3, 2)?;
        let us = finder.lifetimes(&[start, later], false, ["US"])?;
        assert_eq!(us.sids(), &[1, 3]);
        assert_eq!(us.is_alive(start, 1), Some(false));
        assert_eq!(us.is_alive(later, 3), Some(true));
        assert_eq!(us.is_alive(later, 5), None);
        let all = finder.lifetimes(&[start], true, vec!["CA".to_string(), "US".to_string()])?;
        assert_eq!(all.sids(), &[1, 3, 5]);
        assert_eq!(all.row(start), Some(&[true, true, true][..]));
        assert_eq!(finder.lifetime_arrays.len(), 2);
        Ok(())
    }
}
