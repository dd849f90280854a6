//! Candle and CandleSeries, the market data every engine reads.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One OHLCV candle. Timestamps are epoch milliseconds.
///
/// Construction never rejects a candle; OHLC ordering is reported by the
/// integrity check instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl Candle {
    pub fn new(
        timestamp: i64,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// `low <= min(open, close) <= max(open, close) <= high`.
    pub fn is_sane(&self) -> bool {
        self.low <= self.open.min(self.close) && self.open.max(self.close) <= self.high
    }

    /// Absolute body size.
    pub fn body(&self) -> Decimal {
        (self.close - self.open).abs()
    }

    pub fn range(&self) -> Decimal {
        self.high - self.low
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Body midpoint.
    pub fn midpoint(&self) -> Decimal {
        (self.open + self.close) / Decimal::TWO
    }

    /// True if the candle's high/low range touches the zone `[bottom, top]`.
    pub fn overlaps(&self, bottom: Decimal, top: Decimal) -> bool {
        self.high >= bottom && self.low <= top
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeriesError {
    #[error("duplicate timestamp {timestamp} at index {index}")]
    DuplicateTimestamp { index: usize, timestamp: i64 },

    #[error("timestamp {current} at index {index} precedes previous timestamp {previous}")]
    NonMonotonic {
        index: usize,
        previous: i64,
        current: i64,
    },
}

/// Strictly time-ordered candles.
///
/// Immutable once built. An empty series is allowed; the integrity check
/// reports it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Candle>", into = "Vec<Candle>")]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn new(candles: Vec<Candle>) -> Result<Self, SeriesError> {
        for (index, pair) in candles.windows(2).enumerate() {
            let (previous, current) = (pair[0].timestamp, pair[1].timestamp);
            if current == previous {
                return Err(SeriesError::DuplicateTimestamp {
                    index: index + 1,
                    timestamp: current,
                });
            }
            if current < previous {
                return Err(SeriesError::NonMonotonic {
                    index: index + 1,
                    previous,
                    current,
                });
            }
        }
        Ok(Self { candles })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candle> {
        self.candles.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Candle> {
        self.candles.get(index)
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    /// Index of the candle with exactly this timestamp.
    pub fn position(&self, timestamp: i64) -> Option<usize> {
        self.candles
            .binary_search_by_key(&timestamp, |c| c.timestamp)
            .ok()
    }

    /// Sub-series over `start..end`. Out-of-range bounds are clamped.
    pub fn slice(&self, start: usize, end: usize) -> Self {
        let end = end.min(self.candles.len());
        let start = start.min(end);
        Self {
            candles: self.candles[start..end].to_vec(),
        }
    }

    /// The most recent `n` candles.
    pub fn tail(&self, n: usize) -> Self {
        let len = self.candles.len();
        self.slice(len.saturating_sub(n), len)
    }

    /// Candles strictly before `timestamp`.
    pub fn before(&self, timestamp: i64) -> Self {
        let end = self.candles.partition_point(|c| c.timestamp < timestamp);
        self.slice(0, end)
    }

    /// Candles strictly after `timestamp`.
    pub fn after(&self, timestamp: i64) -> Self {
        let start = self.candles.partition_point(|c| c.timestamp <= timestamp);
        self.slice(start, self.candles.len())
    }
}

impl TryFrom<Vec<Candle>> for CandleSeries {
    type Error = SeriesError;

    fn try_from(candles: Vec<Candle>) -> Result<Self, Self::Error> {
        Self::new(candles)
    }
}

impl From<CandleSeries> for Vec<Candle> {
    fn from(series: CandleSeries) -> Self {
        series.candles
    }
}

impl<'a> IntoIterator for &'a CandleSeries {
    type Item = &'a Candle;
    type IntoIter = std::slice::Iter<'a, Candle>;

    fn into_iter(self) -> Self::IntoIter {
        self.candles.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn candle(ts: i64) -> Candle {
        Candle::new(ts, dec!(10), dec!(11), dec!(9), dec!(10.5), dec!(100))
    }

    #[test]
    fn candle_is_sane() {
        assert!(candle(0).is_sane());
        let mut bad = candle(0);
        bad.high = dec!(10.2);
        assert!(!bad.is_sane());
    }

    #[test]
    fn series_rejects_duplicates() {
        let err = CandleSeries::new(vec![candle(1), candle(1)]).unwrap_err();
        assert_eq!(
            err,
            SeriesError::DuplicateTimestamp {
                index: 1,
                timestamp: 1
            }
        );
    }

    #[test]
    fn series_rejects_out_of_order() {
        let err = CandleSeries::new(vec![candle(1), candle(3), candle(2)]).unwrap_err();
        assert!(matches!(err, SeriesError::NonMonotonic { index: 2, .. }));
    }

    #[test]
    fn empty_series_is_allowed() {
        let series = CandleSeries::new(Vec::new()).unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn before_and_after_split_on_timestamp() {
        let series = CandleSeries::new((0..5).map(|i| candle(i * 10)).collect()).unwrap();
        assert_eq!(series.before(20).len(), 2);
        assert_eq!(series.after(20).len(), 2);
        assert_eq!(series.tail(3).candles()[0].timestamp, 20);
        assert_eq!(series.position(30), Some(3));
        assert_eq!(series.position(31), None);
    }

    #[test]
    fn deserialize_validates_order() {
        let json = serde_json::to_string(&vec![candle(2), candle(1)]).unwrap();
        assert!(serde_json::from_str::<CandleSeries>(&json).is_err());
    }
}
