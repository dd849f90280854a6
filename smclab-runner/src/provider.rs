//! Market-data providers.
//!
//! The scanner only sees [`MarketDataProvider`]; exchange clients, CSV
//! directories and test fixtures all sit behind it.

use rust_decimal::Decimal;
use serde::Deserialize;
use smclab_core::domain::{Candle, CandleSeries, SeriesError, Timeframe};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("no data for {symbol} on {timeframe}")]
    NotFound { symbol: String, timeframe: Timeframe },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("invalid decimal '{value}' in column {column}")]
    InvalidDecimal { column: &'static str, value: String },

    #[error("malformed series: {0}")]
    Series(#[from] SeriesError),
}

/// Source of candle windows.
pub trait MarketDataProvider: Send + Sync {
    fn name(&self) -> &str;

    /// The most recent `window` candles, oldest first.
    fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        window: usize,
    ) -> Result<CandleSeries, ProviderError>;
}

// ── In-memory ────────────────────────────────────────────────────────

/// Fixed series keyed by `(symbol, timeframe)`.
#[derive(Debug, Default, Clone)]
pub struct InMemoryProvider {
    series: BTreeMap<(String, Timeframe), CandleSeries>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: &str, timeframe: Timeframe, series: CandleSeries) {
        self.series.insert((symbol.to_string(), timeframe), series);
    }

    pub fn with(mut self, symbol: &str, timeframe: Timeframe, series: CandleSeries) -> Self {
        self.insert(symbol, timeframe, series);
        self
    }

    /// Full stored series, ignoring any window.
    pub fn full(&self, symbol: &str, timeframe: Timeframe) -> Option<&CandleSeries> {
        self.series.get(&(symbol.to_string(), timeframe))
    }
}

impl MarketDataProvider for InMemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        window: usize,
    ) -> Result<CandleSeries, ProviderError> {
        self.full(symbol, timeframe)
            .map(|s| s.tail(window))
            .ok_or_else(|| ProviderError::NotFound {
                symbol: symbol.to_string(),
                timeframe,
            })
    }
}

// ── CSV directory ────────────────────────────────────────────────────

/// Reads `{SYMBOL}_{timeframe}.csv` files from a directory.
///
/// Expected header: `timestamp,open,high,low,close,volume`, timestamps in
/// epoch milliseconds, prices as decimal strings.
#[derive(Debug, Clone)]
pub struct CsvProvider {
    dir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: i64,
    open: String,
    high: String,
    low: String,
    close: String,
    volume: String,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, symbol: &str, timeframe: Timeframe) -> PathBuf {
        self.dir.join(format!("{symbol}_{timeframe}.csv"))
    }

    /// Load a whole file.
    pub fn load(&self, path: &Path) -> Result<CandleSeries, ProviderError> {
        let mut reader = csv::Reader::from_path(path).map_err(|source| csv_error(path, source))?;
        let mut candles = Vec::new();
        for row in reader.deserialize::<CsvRow>() {
            let row = row.map_err(|source| csv_error(path, source))?;
            candles.push(Candle::new(
                row.timestamp,
                parse_decimal("open", &row.open)?,
                parse_decimal("high", &row.high)?,
                parse_decimal("low", &row.low)?,
                parse_decimal("close", &row.close)?,
                parse_decimal("volume", &row.volume)?,
            ));
        }
        Ok(CandleSeries::new(candles)?)
    }
}

impl MarketDataProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        window: usize,
    ) -> Result<CandleSeries, ProviderError> {
        let path = self.path_for(symbol, timeframe);
        if !path.exists() {
            return Err(ProviderError::NotFound {
                symbol: symbol.to_string(),
                timeframe,
            });
        }
        Ok(self.load(&path)?.tail(window))
    }
}

fn csv_error(path: &Path, source: csv::Error) -> ProviderError {
    ProviderError::Csv {
        path: path.to_path_buf(),
        source,
    }
}

fn parse_decimal(column: &'static str, value: &str) -> Result<Decimal, ProviderError> {
    let trimmed = value.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| ProviderError::InvalidDecimal {
            column,
            value: value.to_string(),
        })
}
