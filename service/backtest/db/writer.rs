use std::collections::{BTreeMap, HashSet};

use itertools::Itertools;
use trading_model::core::{Time, NANOSECONDS_PER_DAY, NAT_TIMESTAMP};
use trading_model::{is_tagged_sid, split_delimited_symbol, AssetError, AssetType, Sid, UNKNOWN_COUNTRY_CODE};

use crate::db::gluesql::schema::*;

/// Open end of a listing that has not been delisted, `2^62 - 1` ns.
pub const DEFAULT_END_DATE: i64 = (1 << 62) - 1;
pub const DEFAULT_CURRENCY: &str = "USD";
pub const DEFAULT_TICK_SIZE: f64 = 0.01;

/// One symbol interval of an equity. Several rows may share a sid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EquityInput {
    pub sid: Sid,
    pub symbol: Option<String>,
    pub asset_name: Option<String>,
    pub start_date: Option<Time>,
    pub end_date: Option<Time>,
    pub first_traded: Option<Time>,
    pub auto_close_date: Option<Time>,
    pub exchange: Option<String>,
    pub real_sid: Option<String>,
    pub currency: Option<String>,
    pub tick_size: Option<f64>,
    pub price_magnifier: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FutureInput {
    pub sid: Sid,
    pub symbol: Option<String>,
    pub root_symbol: Option<String>,
    pub asset_name: Option<String>,
    pub start_date: Option<Time>,
    pub end_date: Option<Time>,
    pub first_traded: Option<Time>,
    pub notice_date: Option<Time>,
    pub expiration_date: Option<Time>,
    pub auto_close_date: Option<Time>,
    pub rollover_date: Option<Time>,
    pub exchange: Option<String>,
    pub real_sid: Option<String>,
    pub currency: Option<String>,
    pub tick_size: Option<f64>,
    pub multiplier: Option<f64>,
    pub price_magnifier: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExchangeInput {
    pub exchange: String,
    pub canonical_name: Option<String>,
    pub country_code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RootSymbolInput {
    pub root_symbol: String,
    pub root_symbol_id: Option<u64>,
    pub sector: Option<String>,
    pub description: Option<String>,
    pub exchange: Option<String>,
}

/// Everything a single `write` persists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetData {
    pub equities: Vec<EquityInput>,
    pub futures: Vec<FutureInput>,
    pub exchanges: Vec<ExchangeInput>,
    pub root_symbols: Vec<RootSymbolInput>,
}

/// Rows ready to be inserted, all checks already passed.
#[derive(Debug, Clone, Default)]
pub struct AssetRows {
    pub equities: Vec<DbRowEquity>,
    pub mappings: Vec<DbRowSymbolMapping>,
    pub futures: Vec<DbRowFuture>,
    pub exchanges: Vec<DbRowExchange>,
    pub root_symbols: Vec<DbRowRootSymbol>,
    pub router: Vec<DbRowAssetRouter>,
}

/// Keys already persisted, a write may not reuse them.
#[derive(Debug, Clone, Default)]
pub struct ExistingAssets {
    pub sids: HashSet<Sid>,
    pub root_symbols: HashSet<String>,
    pub next_mapping_id: u64,
}

fn required<T>(value: Option<T>, table: &str, column: &str) -> Result<T, AssetError> {
    value.ok_or_else(|| AssetError::missing_default(table, column))
}

fn nanos(t: Option<Time>, default: i64) -> i64 {
    t.map(|t| t.nanos()).unwrap_or(default)
}

fn check_sid(sid: Sid) -> Result<(), AssetError> {
    if is_tagged_sid(sid) {
        return Err(AssetError::invalid(format!(
            "sid {sid} uses the reserved high byte of synthetic sids"
        )));
    }
    Ok(())
}

/// Derives and validates every row of `data`.
///
/// Re-ingesting a sid or a root symbol found in `existing` is rejected.
pub fn derive_asset_rows(data: AssetData, existing: &ExistingAssets) -> Result<AssetRows, AssetError> {
    let mut rows = AssetRows::default();

    let (equities, mappings) = derive_equities(data.equities, existing.next_mapping_id)?;
    let futures = derive_futures(data.futures)?;

    let equity_sids: HashSet<Sid> = equities.iter().map(|e| e.sid).collect();
    for future in &futures {
        if equity_sids.contains(&future.sid) {
            return Err(AssetError::invalid(format!(
                "sid {} is both an equity and a future",
                future.sid
            )));
        }
    }
    for sid in equity_sids.iter().chain(futures.iter().map(|f| &f.sid)) {
        if existing.sids.contains(sid) {
            return Err(AssetError::invalid(format!("sid {sid} is already in the asset db")));
        }
    }

    rows.router.extend(equities.iter().map(|e| DbRowAssetRouter::new(e.sid, AssetType::Equity)));
    rows.router.extend(futures.iter().map(|f| DbRowAssetRouter::new(f.sid, AssetType::Future)));

    rows.root_symbols = derive_root_symbols(data.root_symbols, &existing.root_symbols)?;
    rows.exchanges = derive_exchanges(
        data.exchanges,
        equities
            .iter()
            .map(|e| e.exchange.as_str())
            .chain(futures.iter().map(|f| f.exchange.as_str()))
            .chain(rows.root_symbols.iter().map(|r| r.exchange.as_str())),
    );
    rows.equities = equities;
    rows.mappings = mappings;
    rows.futures = futures;
    Ok(rows)
}

fn derive_equities(
    inputs: Vec<EquityInput>,
    next_mapping_id: u64,
) -> Result<(Vec<DbRowEquity>, Vec<DbRowSymbolMapping>), AssetError> {
    let mut mappings = Vec::with_capacity(inputs.len());
    let mut by_sid: BTreeMap<Sid, Vec<EquityInput>> = BTreeMap::new();
    for input in inputs {
        check_sid(input.sid)?;
        required(input.exchange.as_ref(), EQUITIES, "exchange")?;
        let (company_symbol, share_class_symbol) = split_delimited_symbol(input.symbol.as_deref());
        // no symbol, nothing to own
        if !company_symbol.is_empty() || !share_class_symbol.is_empty() {
            mappings.push(DbRowSymbolMapping {
                id: next_mapping_id + mappings.len() as u64,
                sid: input.sid,
                symbol: input.symbol.clone().unwrap_or_default(),
                company_symbol,
                share_class_symbol,
                start_date: nanos(input.start_date, 0),
                end_date: nanos(input.end_date, DEFAULT_END_DATE),
            });
        }
        by_sid.entry(input.sid).or_default().push(input);
    }

    let mut equities = Vec::with_capacity(by_sid.len());
    for (sid, group) in by_sid {
        let start_date = group.iter().map(|r| nanos(r.start_date, 0)).min().unwrap_or(0);
        let end_date = group
            .iter()
            .map(|r| nanos(r.end_date, DEFAULT_END_DATE))
            .max()
            .unwrap_or(DEFAULT_END_DATE);
        // the interval that ends last describes the equity, ties go to the later row
        let Some(latest) = group
            .into_iter()
            .max_by_key(|r| nanos(r.end_date, DEFAULT_END_DATE))
        else {
            continue;
        };
        let exchange = required(latest.exchange, EQUITIES, "exchange")?;
        equities.push(DbRowEquity {
            sid,
            real_sid: latest.real_sid.unwrap_or_else(|| sid.to_string()),
            symbol: latest.symbol.unwrap_or_default(),
            asset_name: latest.asset_name.unwrap_or_default(),
            start_date,
            end_date,
            first_traded: nanos(latest.first_traded, NAT_TIMESTAMP),
            auto_close_date: nanos(latest.auto_close_date, end_date.saturating_add(NANOSECONDS_PER_DAY)),
            exchange,
            currency: latest.currency.unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            tick_size: latest.tick_size.unwrap_or(DEFAULT_TICK_SIZE),
            price_magnifier: latest.price_magnifier.unwrap_or(1.0),
        });
    }
    Ok((equities, mappings))
}

fn derive_futures(inputs: Vec<FutureInput>) -> Result<Vec<DbRowFuture>, AssetError> {
    let duplicated: Vec<Sid> = inputs.iter().map(|f| f.sid).duplicates().collect();
    if !duplicated.is_empty() {
        return Err(AssetError::invalid(format!("futures sids listed twice: {duplicated:?}")));
    }
    inputs
        .into_iter()
        .map(|input| {
            check_sid(input.sid)?;
            let root_symbol = required(input.root_symbol, FUTURES_CONTRACTS, "root_symbol")?;
            let exchange = required(input.exchange, FUTURES_CONTRACTS, "exchange")?;
            let expiration_date = required(input.expiration_date, FUTURES_CONTRACTS, "expiration_date")?.nanos();
            let notice_date = nanos(input.notice_date, NAT_TIMESTAMP);
            let auto_close_date = match input.auto_close_date {
                Some(t) => t.nanos(),
                // NaT sorts lowest, skip it
                None if notice_date == NAT_TIMESTAMP => expiration_date,
                None => notice_date.min(expiration_date),
            };
            Ok(DbRowFuture {
                sid: input.sid,
                real_sid: input.real_sid.unwrap_or_else(|| input.sid.to_string()),
                symbol: input.symbol.unwrap_or_default(),
                root_symbol,
                asset_name: input.asset_name.unwrap_or_default(),
                start_date: nanos(input.start_date, 0),
                end_date: nanos(input.end_date, DEFAULT_END_DATE),
                first_traded: nanos(input.first_traded, NAT_TIMESTAMP),
                notice_date,
                expiration_date,
                auto_close_date,
                rollover_date: nanos(input.rollover_date, auto_close_date),
                exchange,
                currency: input.currency.unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
                tick_size: input.tick_size.unwrap_or(DEFAULT_TICK_SIZE),
                multiplier: input.multiplier.unwrap_or(1.0),
                price_magnifier: input.price_magnifier.unwrap_or(1.0),
            })
        })
        .collect()
}

fn derive_root_symbols(
    inputs: Vec<RootSymbolInput>,
    existing: &HashSet<String>,
) -> Result<Vec<DbRowRootSymbol>, AssetError> {
    let duplicated: Vec<&str> = inputs.iter().map(|r| r.root_symbol.as_str()).duplicates().collect();
    if !duplicated.is_empty() {
        return Err(AssetError::invalid(format!("root symbols listed twice: {duplicated:?}")));
    }
    if let Some(known) = inputs.iter().find(|r| existing.contains(&r.root_symbol)) {
        return Err(AssetError::invalid(format!(
            "root symbol {} is already in the asset db",
            known.root_symbol
        )));
    }
    inputs
        .into_iter()
        .enumerate()
        .map(|(i, input)| {
            Ok(DbRowRootSymbol {
                exchange: required(input.exchange, FUTURES_ROOT_SYMBOLS, "exchange")?,
                root_symbol: input.root_symbol,
                root_symbol_id: input.root_symbol_id.unwrap_or(i as u64),
                sector: input.sector.unwrap_or_default(),
                description: input.description.unwrap_or_default(),
            })
        })
        .collect()
}

/// Given exchanges plus any referenced exchange that was not given.
fn derive_exchanges<'a>(inputs: Vec<ExchangeInput>, referenced: impl Iterator<Item = &'a str>) -> Vec<DbRowExchange> {
    let mut rows: Vec<DbRowExchange> = inputs
        .into_iter()
        .map(|input| DbRowExchange {
            canonical_name: input.canonical_name.unwrap_or_else(|| input.exchange.clone()),
            country_code: input.country_code.unwrap_or_else(|| UNKNOWN_COUNTRY_CODE.to_string()),
            exchange: input.exchange,
        })
        .collect();
    let mut known: HashSet<String> = rows.iter().map(|r| r.exchange.clone()).collect();
    for name in referenced {
        if known.insert(name.to_string()) {
            rows.push(DbRowExchange {
                exchange: name.to_string(),
                canonical_name: name.to_string(),
                country_code: UNKNOWN_COUNTRY_CODE.to_string(),
            });
        }
    }
    rows
}
