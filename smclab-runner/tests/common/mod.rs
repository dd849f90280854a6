//! Shared fixtures for runner integration tests.

#![allow(dead_code)]

use rust_decimal_macros::dec;
use smclab_core::domain::{Candle, CandleSeries, Timeframe};
use smclab_runner::InMemoryProvider;

pub const HOUR_MS: i64 = 3_600_000;

/// Deterministic sawtooth uptrend: waves of 8 up candles (+2) and 6 down
/// candles (-1.5). With 250 candles the last order block is the down candle
/// at index 223 (top 213.7, bottom 211.5); `spike_at` gets 4x volume.
pub fn sawtooth(n: usize, spike_at: usize) -> CandleSeries {
    let mut close = dec!(100);
    let candles = (0..n)
        .map(|i| {
            let open = close;
            let (high, low) = if i % 14 < 8 {
                close = open + dec!(2);
                (close + dec!(0.5), open - dec!(0.2))
            } else {
                close = open - dec!(1.5);
                (open + dec!(0.2), close - dec!(0.5))
            };
            let volume = if i == spike_at { dec!(4000) } else { dec!(1000) };
            Candle::new(i as i64 * HOUR_MS, open, high, low, close, volume)
        })
        .collect();
    CandleSeries::new(candles).unwrap()
}

/// Same series on the entry (1h) and structural (4h) timeframes.
pub fn provider_with(symbol: &str, series: CandleSeries) -> InMemoryProvider {
    InMemoryProvider::new()
        .with(symbol, Timeframe::H1, series.clone())
        .with(symbol, Timeframe::H4, series)
}

/// `sawtooth(rally, 223)` followed by `crash` candles falling 5 each, deep
/// enough to trade through every order block the rally left behind.
pub fn rally_then_crash(rally: usize, crash: usize) -> CandleSeries {
    let rally = sawtooth(rally, 223);
    let mut candles = rally.candles().to_vec();
    let Some(last) = rally.last().copied() else {
        return rally;
    };
    let mut close = last.close;
    for i in 0..crash {
        let open = close;
        close = open - dec!(5);
        candles.push(Candle::new(
            last.timestamp + (i as i64 + 1) * HOUR_MS,
            open,
            open + dec!(0.2),
            close - dec!(0.5),
            close,
            dec!(1000),
        ));
    }
    CandleSeries::new(candles).unwrap()
}
