//! Data integrity check and content hash of a candle window.
//!
//! The hash covers the ordered `(timestamp, close)` pairs. A confluence signal
//! is only turned into a trade setup when its recorded hash matches the hash
//! of the window the setup is built against.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{CandleSeries, IntegrityHash};

pub const VERSION: &str = "1.0.0";
pub const NAME: &str = "data_integrity";

const PAIR_SEPARATOR: u8 = b'\n';

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataIntegrityReport {
    pub valid: bool,
    pub issues: Vec<String>,
    pub data_hash: IntegrityHash,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DataIntegrityEngine;

impl DataIntegrityEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, series: &CandleSeries) -> DataIntegrityReport {
        let mut issues = Vec::new();

        if series.is_empty() {
            issues.push("Data series is empty.".to_string());
        }

        for candle in series {
            if !candle.is_sane() {
                issues.push(format!("Invalid OHLC data at timestamp {}", candle.timestamp));
            }
            if candle.volume < Decimal::ZERO {
                issues.push(format!("Negative volume at timestamp {}", candle.timestamp));
            }
        }

        DataIntegrityReport {
            valid: issues.is_empty(),
            issues,
            data_hash: hash_series(series),
        }
    }
}

/// BLAKE3 over `(timestamp, close)` pairs.
///
/// Timestamps are little-endian `i64`; closes are normalized decimal strings
/// so `10.50` and `10.5` hash the same.
pub fn hash_series(series: &CandleSeries) -> IntegrityHash {
    let mut hasher = blake3::Hasher::new();
    for candle in series {
        hasher.update(&candle.timestamp.to_le_bytes());
        hasher.update(candle.close.normalize().to_string().as_bytes());
        hasher.update(&[PAIR_SEPARATOR]);
    }
    IntegrityHash(hasher.finalize().to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Candle;
    use rust_decimal_macros::dec;

    fn series() -> CandleSeries {
        CandleSeries::new(
            (0..10)
                .map(|i| {
                    Candle::new(
                        i * 60_000,
                        dec!(100),
                        dec!(102),
                        dec!(99),
                        dec!(101) + Decimal::from(i),
                        dec!(1000),
                    )
                })
                .map(|mut c| {
                    c.high = c.high.max(c.close);
                    c
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn clean_series_is_valid() {
        let report = DataIntegrityEngine::new().validate(&series());
        assert!(report.valid, "{:?}", report.issues);
        assert_eq!(report.data_hash.as_str().len(), 64);
    }

    #[test]
    fn empty_series_is_reported() {
        let report = DataIntegrityEngine::new().validate(&CandleSeries::empty());
        assert!(!report.valid);
        assert_eq!(report.issues, vec!["Data series is empty.".to_string()]);
    }

    #[test]
    fn bad_ohlc_and_negative_volume_name_the_timestamp() {
        let mut candles = series().candles().to_vec();
        candles[3].low = dec!(200);
        candles[5].volume = dec!(-1);
        let report = DataIntegrityEngine::new().validate(&CandleSeries::new(candles).unwrap());
        assert!(!report.valid);
        assert_eq!(report.issues.len(), 2);
        assert!(report.issues[0].contains("180000"));
        assert!(report.issues[1].starts_with("Negative volume"));
    }

    #[test]
    fn hash_ignores_trailing_zeros_but_not_values() {
        let base = series();
        let mut padded = base.candles().to_vec();
        padded[0].close = dec!(101.000);
        assert_eq!(hash_series(&base), hash_series(&CandleSeries::new(padded).unwrap()));

        let mut changed = base.candles().to_vec();
        changed[0].close = dec!(101.01);
        assert_ne!(hash_series(&base), hash_series(&CandleSeries::new(changed).unwrap()));
    }

    #[test]
    fn hash_ignores_non_close_fields() {
        let base = series();
        let mut other = base.candles().to_vec();
        other[2].volume = dec!(5);
        assert_eq!(hash_series(&base), hash_series(&CandleSeries::new(other).unwrap()));
    }
}
