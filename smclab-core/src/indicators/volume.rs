//! Rolling volume baseline.

use rust_decimal::Decimal;

use crate::domain::Candle;

/// Mean volume of up to `lookback` candles immediately before `index`.
///
/// `None` when there are no preceding candles.
pub fn trailing_mean_volume(candles: &[Candle], index: usize, lookback: usize) -> Option<Decimal> {
    let end = index.min(candles.len());
    let start = end.saturating_sub(lookback);
    let window = &candles[start..end];
    if window.is_empty() {
        return None;
    }
    let sum: Decimal = window.iter().map(|c| c.volume).sum();
    Some(sum / Decimal::from(window.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn mean_of_preceding_window() {
        let candles: Vec<_> = (0..5)
            .map(|i| Candle::new(i, dec!(1), dec!(1), dec!(1), dec!(1), Decimal::from(i * 10)))
            .collect();
        assert_eq!(trailing_mean_volume(&candles, 4, 2), Some(dec!(25)));
        assert_eq!(trailing_mean_volume(&candles, 4, 20), Some(dec!(15)));
        assert_eq!(trailing_mean_volume(&candles, 0, 20), None);
    }
}
