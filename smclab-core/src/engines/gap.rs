//! Fair value gap (FVG) detection over a 3-candle sliding window.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::domain::{Candle, CandleSeries, Direction, Explanation, FvgResult};

pub const VERSION: &str = "1.0.0";
pub const NAME: &str = "gap";

#[derive(Debug, Clone, Copy, Default)]
pub struct GapEngine;

impl GapEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, series: &CandleSeries) -> Vec<FvgResult> {
        let candles = series.candles();
        if candles.len() < 3 {
            return Vec::new();
        }

        let mut gaps = Vec::new();
        for i in 0..candles.len() - 2 {
            let (first, middle, third) = (&candles[i], &candles[i + 1], &candles[i + 2]);
            if middle.body().is_zero() {
                continue;
            }

            let zone = if first.low > third.high {
                Some((Direction::Bearish, first.low, third.high))
            } else if first.high < third.low {
                Some((Direction::Bullish, third.low, first.high))
            } else {
                None
            };

            if let Some((direction, top, bottom)) = zone {
                gaps.push(build_gap(direction, top, bottom, candles, i));
            }
        }
        gaps
    }
}

fn build_gap(
    direction: Direction,
    top: Decimal,
    bottom: Decimal,
    candles: &[Candle],
    start: usize,
) -> FvgResult {
    let middle = &candles[start + 1];
    let third = &candles[start + 2];
    let strength = body_ratio(middle);

    let mitigation = candles[start + 3..]
        .iter()
        .find(|c| c.overlaps(bottom, top))
        .map(|c| c.timestamp);

    let label = match direction {
        Direction::Bullish => "Bullish",
        Direction::Bearish => "Bearish",
    };
    let explanation = Explanation::new(
        "Fair Value Gap",
        format!("A {label} imbalance was left between candles one and three."),
    )
    .with_detail("Direction", direction)
    .with_detail("Top", top)
    .with_detail("Bottom", bottom)
    .with_detail("Strength Score", format!("{strength:.2}"))
    .with_detail("Mitigated", mitigation.is_some());

    FvgResult {
        direction,
        top,
        bottom,
        strength,
        mitigated: mitigation.is_some(),
        start_timestamp: candles[start].timestamp,
        end_timestamp: mitigation.unwrap_or(third.timestamp),
        explanation,
    }
}

/// Body over range of a candle, clamped to `[0, 1]`; zero for a zero range.
pub(crate) fn body_ratio(candle: &Candle) -> f64 {
    let range = candle.range();
    if range <= Decimal::ZERO {
        return 0.0;
    }
    (candle.body() / range)
        .to_f64()
        .unwrap_or(0.0)
        .clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn series(candles: Vec<Candle>) -> CandleSeries {
        CandleSeries::new(candles).unwrap()
    }

    #[test]
    fn bearish_gap_between_first_low_and_third_high() {
        let candles = vec![
            Candle::new(0, dec!(112), dec!(113), dec!(110), dec!(111), dec!(1)),
            Candle::new(1, dec!(108), dec!(112.5), dec!(107.5), dec!(112), dec!(1)),
            Candle::new(2, dec!(108.5), dec!(109), dec!(106), dec!(107), dec!(1)),
        ];
        let gaps = GapEngine::new().analyze(&series(candles));
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].direction, Direction::Bearish);
        assert_eq!(gaps[0].top, dec!(110));
        assert_eq!(gaps[0].bottom, dec!(109));
        assert!(!gaps[0].mitigated);
        assert_eq!(gaps[0].end_timestamp, 2);
    }

    #[test]
    fn bullish_gap_and_mitigation() {
        let candles = vec![
            Candle::new(0, dec!(100), dec!(101), dec!(99), dec!(100.5), dec!(1)),
            Candle::new(1, dec!(101), dec!(105), dec!(100.8), dec!(104.8), dec!(1)),
            Candle::new(2, dec!(104.8), dec!(106), dec!(103), dec!(105.5), dec!(1)),
            Candle::new(3, dec!(105.5), dec!(107), dec!(104), dec!(106), dec!(1)),
            Candle::new(4, dec!(106), dec!(106.5), dec!(102), dec!(102.5), dec!(1)),
        ];
        let gaps = GapEngine::new().analyze(&series(candles));
        let bullish: Vec<_> = gaps
            .iter()
            .filter(|g| g.direction == Direction::Bullish && g.start_timestamp == 0)
            .collect();
        assert_eq!(bullish.len(), 1);
        assert_eq!(bullish[0].top, dec!(103));
        assert_eq!(bullish[0].bottom, dec!(101));
        assert!(bullish[0].mitigated);
        assert_eq!(bullish[0].end_timestamp, 4);
    }

    #[test]
    fn doji_middle_candle_never_gaps() {
        let candles = vec![
            Candle::new(0, dec!(100), dec!(101), dec!(99), dec!(100.5), dec!(1)),
            Candle::new(1, dec!(102), dec!(105), dec!(100), dec!(102), dec!(1)),
            Candle::new(2, dec!(104.8), dec!(106), dec!(103), dec!(105.5), dec!(1)),
        ];
        assert!(GapEngine::new().analyze(&series(candles)).is_empty());
    }

    #[test]
    fn strength_is_body_ratio() {
        let c = Candle::new(0, dec!(10), dec!(14), dec!(10), dec!(13), dec!(1));
        assert!((body_ratio(&c) - 0.75).abs() < 1e-12);
        let flat = Candle::new(0, dec!(10), dec!(10), dec!(10), dec!(10), dec!(1));
        assert_eq!(body_ratio(&flat), 0.0);
    }

    #[test]
    fn fewer_than_three_candles_is_empty() {
        let candles = vec![Candle::new(0, dec!(1), dec!(1), dec!(1), dec!(1), dec!(1))];
        assert!(GapEngine::new().analyze(&series(candles)).is_empty());
    }
}
