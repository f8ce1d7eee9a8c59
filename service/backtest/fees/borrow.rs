use std::collections::HashMap;
use std::io::{Read, Write};

use eyre::Result;
use serde::{Deserialize, Serialize};
use trading_model::core::Date;
use trading_model::{AssetError, Sid};

/// One observation of the annual borrow rate of a sid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BorrowFeeRow {
    pub date: Date,
    pub sid: Sid,
    pub fee_rate: f64,
}

/// Source of borrow rates.
///
/// Writes `date,sid,fee_rate` csv rows covering `[start, end]` to `sink`.
/// Raises [`AssetError::ProviderDataUnavailable`] when it has nothing for the query.
pub trait BorrowFeeProvider: Send {
    fn fetch(&mut self, sink: &mut dyn Write, start: Date, end: Date, sids: &[Sid]) -> Result<()>;
}

/// Reads what a provider wrote, keeping the latest observation of each sid.
///
/// Earlier rows of a window may carry stale placeholder rates, only the last
/// date counts.
pub fn parse_borrow_fee_rows(data: &[u8]) -> Result<HashMap<Sid, f64>> {
    let mut reader = csv::Reader::from_reader(data);
    let mut latest: HashMap<Sid, BorrowFeeRow> = HashMap::new();
    for row in reader.deserialize() {
        let row: BorrowFeeRow = row?;
        match latest.get(&row.sid) {
            Some(seen) if seen.date > row.date => {}
            _ => {
                latest.insert(row.sid, row);
            }
        }
    }
    Ok(latest.into_iter().map(|(sid, row)| (sid, row.fee_rate)).collect())
}

/// Serves borrow rates held in memory.
#[derive(Debug, Clone, Default)]
pub struct CsvBorrowFeeProvider {
    rows: Vec<BorrowFeeRow>,
}

impl CsvBorrowFeeProvider {
    pub fn new(rows: Vec<BorrowFeeRow>) -> Self {
        Self { rows }
    }
    /// Loads `date,sid,fee_rate` csv with a header line.
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(reader);
        let rows = reader.deserialize().collect::<Result<Vec<BorrowFeeRow>, _>>()?;
        Ok(Self::new(rows))
    }
}

impl BorrowFeeProvider for CsvBorrowFeeProvider {
    fn fetch(&mut self, sink: &mut dyn Write, start: Date, end: Date, sids: &[Sid]) -> Result<()> {
        let rows = self
            .rows
            .iter()
            .filter(|r| start <= r.date && r.date <= end && sids.contains(&r.sid))
            .collect::<Vec<_>>();
        if rows.is_empty() {
            return Err(AssetError::ProviderDataUnavailable(format!("{sids:?} between {start} and {end}")).into());
        }
        let mut writer = csv::Writer::from_writer(sink);
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}
