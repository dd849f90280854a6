//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|).
//! ATR here is the simple mean of the trailing `period` true ranges.

use rust_decimal::Decimal;

use crate::domain::Candle;

/// True Range series.
/// TR[0] = high[0] - low[0] (no previous close).
pub fn true_range(candles: &[Candle]) -> Vec<Decimal> {
    let mut tr = Vec::with_capacity(candles.len());
    if let Some(first) = candles.first() {
        tr.push(first.range());
    }
    for pair in candles.windows(2) {
        let (prev, cur) = (&pair[0], &pair[1]);
        let hl = cur.range();
        let hc = (cur.high - prev.close).abs();
        let lc = (cur.low - prev.close).abs();
        tr.push(hl.max(hc).max(lc));
    }
    tr
}

/// Mean true range over the last `period` candles.
///
/// Fewer candles than `period`: mean over what is there. Empty input or
/// zero period: zero.
pub fn average_true_range(candles: &[Candle], period: usize) -> Decimal {
    if candles.is_empty() || period == 0 {
        return Decimal::ZERO;
    }
    let tr = true_range(candles);
    let tail = &tr[tr.len().saturating_sub(period)..];
    let sum: Decimal = tail.iter().copied().sum();
    sum / Decimal::from(tail.len())
}
