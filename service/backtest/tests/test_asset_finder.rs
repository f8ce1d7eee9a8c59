use std::collections::HashMap;
use std::sync::Arc;

use backtest_core::config::DatabaseConfig;
use backtest_core::db::gluesql::{get_memory_storage, get_sled_storage, AssetStore};
use backtest_core::db::{AssetData, EquityInput, ExchangeInput, FutureInput, RootSymbolInput};
use backtest_core::finder::{AssetFinder, ChainPredicate};
use backtest_core::ASSET_DB_VERSION;
use eyre::Result;
use gluesql::prelude::SharedMemoryStorage;
use lib::batch::Batcher;
use trading_model::core::{Date, Time};
use trading_model::{encode_continuous_future_sid, AdjustmentStyle, AssetError, Future, RollStyle};

fn day(y: i32, m: u32, d: u32) -> Result<Time> {
    Ok(Date::from_ymd(y, m, d)?.to_time())
}

fn assets() -> Result<AssetData> {
    let equity = |sid, symbol: &str, start: Time, end: Time| EquityInput {
        sid,
        symbol: Some(symbol.to_string()),
        exchange: Some("NYSE".into()),
        start_date: Some(start),
        end_date: Some(end),
        ..Default::default()
    };
    let future = |sid, symbol: &str, start: Time, expiration: Time| FutureInput {
        sid,
        symbol: Some(symbol.to_string()),
        root_symbol: Some("FO".into()),
        exchange: Some("CMES".into()),
        start_date: Some(start),
        expiration_date: Some(expiration),
        multiplier: Some(1000.0),
        ..Default::default()
    };
    Ok(AssetData {
        equities: vec![
            equity(1, "OLD", day(2019, 1, 2)?, day(2019, 6, 28)?),
            // sid 1 changes its ticker mid year
            equity(1, "NEW", day(2019, 7, 1)?, day(2020, 12, 31)?),
            equity(2, "OLD", day(2020, 1, 2)?, day(2020, 12, 31)?),
            equity(3, "BRK.A", day(2019, 1, 2)?, day(2020, 12, 31)?),
            equity(5, "FIVE", day(2020, 1, 2)?, day(2020, 1, 10)?),
        ],
        futures: vec![
            future(100, "FOH20", day(2019, 6, 3)?, day(2020, 3, 20)?),
            future(101, "FOF20", day(2019, 3, 1)?, day(2020, 1, 20)?),
            future(102, "FOG20", day(2019, 4, 1)?, day(2020, 2, 20)?),
        ],
        exchanges: vec![ExchangeInput {
            exchange: "NYSE".into(),
            canonical_name: Some("XNYS".into()),
            country_code: Some("US".into()),
        }],
        root_symbols: vec![RootSymbolInput {
            root_symbol: "FO".into(),
            exchange: Some("CMES".into()),
            sector: Some("Energy".into()),
            ..Default::default()
        }],
    })
}

fn finder_with(predicates: HashMap<String, ChainPredicate>) -> Result<AssetFinder<SharedMemoryStorage>> {
    let mut store = AssetStore::new(get_memory_storage(), Batcher::new(2));
    store.write(assets()?, ASSET_DB_VERSION)?;
    AssetFinder::new(store, predicates)
}

#[test]
fn test_retrieve_all_keeps_order_and_duplicates() -> Result<()> {
    let mut finder = finder_with(HashMap::new())?;
    let assets = finder.retrieve_all(&[5, 3, 5, 1, 100], false)?;
    let sids: Vec<_> = assets.iter().flatten().map(|a| a.sid()).collect();
    assert_eq!(sids, vec![5, 3, 5, 1, 100]);
    assert!(Arc::ptr_eq(
        assets[0].as_ref().unwrap(),
        assets[2].as_ref().unwrap()
    ));
    let one = assets[3].as_ref().unwrap().as_equity().unwrap();
    assert_eq!(one.symbol.as_deref(), Some("NEW"));
    assert_eq!(one.start_date, day(2019, 1, 2)?);
    assert_eq!(one.exchange.canonical_name, "XNYS");
    assert_eq!(assets[4].as_ref().unwrap().as_future().unwrap().multiplier, 1000.0);
    Ok(())
}

#[test]
fn test_batch_failures_are_reported_together() -> Result<()> {
    let mut finder = finder_with(HashMap::new())?;
    let err = finder.retrieve_equities(&[1, 42]).unwrap_err();
    assert_eq!(
        err.downcast_ref::<AssetError>(),
        Some(&AssetError::SidsNotFound(vec![42]))
    );
    let err = finder.retrieve_equities(&[43, 42]).unwrap_err();
    assert_eq!(
        err.downcast_ref::<AssetError>(),
        Some(&AssetError::SidsNotFound(vec![43, 42]))
    );
    let err = finder.retrieve_all(&[1, 44, 2, 45], false).unwrap_err();
    assert!(err.to_string().contains("[44, 45]"), "{err}");
    Ok(())
}

#[test]
fn test_symbol_history_is_point_in_time() -> Result<()> {
    let mut finder = finder_with(HashMap::new())?;
    assert_eq!(finder.lookup_symbol("OLD", Some(day(2019, 3, 1)?), false, None)?.sid(), 1);
    assert_eq!(finder.lookup_symbol("OLD", Some(day(2020, 3, 2)?), false, Some("US"))?.sid(), 2);
    assert_eq!(finder.lookup_symbol("NEW", None, false, None)?.sid(), 1);
    let err = finder.lookup_symbol("OLD", None, false, None).unwrap_err();
    assert_eq!(
        err.downcast_ref::<AssetError>(),
        Some(&AssetError::MultipleSymbolsFound {
            symbol: "OLD".into(),
            sids: vec![1, 2]
        })
    );
    assert_eq!(finder.lookup_symbol("BRK/A", None, false, None)?.sid(), 3);
    assert_eq!(finder.lookup_symbol("BRKA", None, true, None)?.sid(), 3);
    Ok(())
}

#[test]
fn test_future_chain_and_continuous_future() -> Result<()> {
    let mut finder = finder_with(HashMap::new())?;
    let chain = finder.get_ordered_contracts("FO")?;
    let sids: Vec<_> = chain.contracts().iter().map(|c| c.sid).collect();
    assert_eq!(sids, vec![101, 102, 100]);
    assert_eq!(chain.contract_before_auto_close(day(2020, 1, 21)?), Some(102));
    assert_eq!(chain.contract_at_offset(101, 1, day(2019, 5, 1)?), Some(102));
    assert_eq!(chain.contract_at_offset(101, 2, day(2019, 5, 1)?), None);

    let cf = finder.create_continuous_future("FO", 0, RollStyle::Volume, AdjustmentStyle::Multiplicative)?;
    assert_eq!(
        cf.sid(),
        encode_continuous_future_sid("FO", 0, RollStyle::Volume, AdjustmentStyle::Multiplicative)?
    );
    assert_eq!(cf.start_date(), day(2019, 3, 1)?);
    assert_eq!(cf.end_date(), day(2020, 3, 20)?);
    assert_eq!(cf.exchange().name, "CMES");
    let unadjusted = encode_continuous_future_sid("FO", 0, RollStyle::Volume, AdjustmentStyle::None)?;
    assert!(finder.retrieve_all(&[unadjusted, cf.sid()], false)?.iter().all(Option::is_some));

    assert!(matches!(
        "mul".parse::<AdjustmentStyle>(),
        Err(AssetError::InvalidArgument(_))
    ));
    let err = finder
        .create_continuous_future("FOO", 0, RollStyle::Calendar, AdjustmentStyle::None)
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AssetError>(),
        Some(AssetError::InvalidArgument(_))
    ));
    Ok(())
}

#[test]
fn test_chain_predicate_drops_contracts() -> Result<()> {
    let no_march: ChainPredicate = Arc::new(|f: &Future| !f.symbol_str().ends_with("H20"));
    let mut finder = finder_with(HashMap::from([("FO".to_string(), no_march)]))?;
    let chain = finder.get_ordered_contracts("FO")?;
    assert_eq!(chain.len(), 2);
    assert_eq!(chain.end_date(), day(2020, 2, 20)?);
    Ok(())
}

#[test]
fn test_lifetimes_start_inclusivity() -> Result<()> {
    let mut finder = finder_with(HashMap::new())?;
    let start = Date::from_ymd(2020, 1, 2)?;
    let exclusive = finder.lifetimes(&[start], false, ["US"])?;
    assert_eq!(exclusive.is_alive(start, 5), Some(false));
    let inclusive = finder.lifetimes(&[start], true, ["US"])?;
    assert_eq!(inclusive.is_alive(start, 5), Some(true));
    let after = Date::from_ymd(2020, 1, 13)?;
    assert_eq!(finder.lifetimes(&[after], true, ["US"])?.is_alive(after, 5), Some(false));
    assert!(finder.lifetimes(&[after], true, ["JP"])?.sids().is_empty());
    Ok(())
}

#[test]
fn test_version_mismatch_is_fatal() -> Result<()> {
    for stored in [ASSET_DB_VERSION - 1, ASSET_DB_VERSION + 1] {
        let mut store = AssetStore::new(get_memory_storage(), Batcher::default());
        store.init_db(stored)?;
        let err = AssetFinder::new(store, HashMap::new()).err().unwrap();
        assert_eq!(
            err.downcast_ref::<AssetError>(),
            Some(&AssetError::VersionMismatch {
                expected: ASSET_DB_VERSION,
                found: stored
            })
        );
    }
    Ok(())
}

#[test]
fn test_on_disk_store_serves_a_new_finder() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = DatabaseConfig {
        directory: dir.path().join("assets"),
        in_memory: false,
    };
    std::fs::create_dir_all(&config.directory)?;
    // sled keeps the directory locked while any handle lives, share one
    let storage = get_sled_storage(&config)?;
    {
        let mut store = AssetStore::new(storage.clone(), Batcher::default());
        store.write(assets()?, ASSET_DB_VERSION)?;
    }
    let store = AssetStore::new(storage, Batcher::default());
    let mut finder = AssetFinder::new(store, HashMap::new())?;
    assert_eq!(finder.equities_sids()?, vec![1, 2, 3, 5]);
    assert_eq!(finder.lookup_future_symbol("FOG20")?.sid(), 102);
    Ok(())
}

#[test]
fn test_equity_without_symbol_is_not_found_by_symbol() -> Result<()> {
    let mut store = AssetStore::new(get_memory_storage(), Batcher::default());
    store.write(
        AssetData {
            equities: vec![EquityInput {
                sid: 9,
                exchange: Some("NYSE".into()),
                ..Default::default()
            }],
            ..Default::default()
        },
        ASSET_DB_VERSION,
    )?;
    let mut finder = AssetFinder::new(store, HashMap::new())?;
    for symbol in ["", "."] {
        let err = finder.lookup_symbol(symbol, None, false, None).unwrap_err();
        assert_eq!(
            err.downcast_ref::<AssetError>(),
            Some(&AssetError::SymbolNotFound(symbol.to_string()))
        );
    }
    assert_eq!(finder.retrieve_asset(9, false)?.map(|a| a.sid()), Some(9));
    Ok(())
}

#[test]
fn test_country_equities_are_cached() -> Result<()> {
    let mut finder = finder_with(HashMap::new())?;
    assert_eq!(finder.equities_sids_for_country_code("US")?, vec![1, 2, 3, 5]);
    assert_eq!(finder.equities_sids_for_country_code("US")?, vec![1, 2, 3, 5]);
    assert!(finder.equities_sids_for_country_code("JP")?.is_empty());
    Ok(())
}
