//! Historical candle loading.
//!
//! Reads the standard 11-column kline CSV export: header line first, then
//! `open_time, open, high, low, close, volume, close_time, quote_volume,
//! trade_count, taker_buy_base_volume, taker_buy_quote_volume` per row.
//! Rows with missing fields or unparseable numbers are skipped silently.

use crate::market::Kline;
use csv::{ReaderBuilder, StringRecord};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("cannot read candle csv: {0}")]
    Csv(#[from] csv::Error),
}

/// In-memory candle series for one symbol, in file order.
#[derive(Debug, Clone)]
pub struct KlineHistory {
    symbol: String,
    klines: Vec<Kline>,
}

impl KlineHistory {
    pub fn load(symbol: impl Into<String>, path: impl AsRef<Path>) -> Result<Self, HistoryError> {
        let symbol = symbol.into();
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path.as_ref())?;

        let mut klines = Vec::new();
        let mut skipped = 0usize;
        for record in reader.records() {
            let Ok(record) = record else {
                skipped += 1;
                continue;
            };
            match parse_row(&record) {
                Some(kline) => klines.push(kline),
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            debug!(%symbol, skipped, "malformed candle rows skipped");
        }
        Ok(Self { symbol, klines })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn len(&self) -> usize {
        self.klines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.klines.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Kline> {
        self.klines.get(index)
    }

    pub fn latest(&self) -> Option<&Kline> {
        self.klines.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Kline> {
        self.klines.iter()
    }
}

fn parse_row(record: &StringRecord) -> Option<Kline> {
    if record.len() < 11 {
        return None;
    }
    let field = |i: usize| record.get(i).map(str::trim);
    Some(Kline {
        open_time: field(0)?.parse().ok()?,
        open: field(1)?.parse().ok()?,
        high: field(2)?.parse().ok()?,
        low: field(3)?.parse().ok()?,
        close: field(4)?.parse().ok()?,
        volume: field(5)?.parse().ok()?,
        close_time: field(6)?.parse().ok()?,
        quote_volume: field(7)?.parse().ok()?,
        trade_count: field(8)?.parse().ok()?,
        taker_buy_base_volume: field(9)?.parse().ok()?,
        taker_buy_quote_volume: field(10)?.parse().ok()?,
    })
}
