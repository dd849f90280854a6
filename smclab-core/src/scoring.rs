//! Weighted 0-100 confidence score.
//!
//! `score = round(0.40·structural + 0.25·gap + 0.15·pattern + 0.20·volume)`,
//! half away from zero, clamped to `0..=100`.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::domain::{CandleSeries, ConfluenceSignal, ScoreBreakdown, ScoredSignal};
use crate::indicators::trailing_mean_volume;

pub const VERSION: &str = "1.0.0";
pub const NAME: &str = "scoring";

pub const WEIGHT_STRUCTURAL_ALIGNMENT: Decimal = dec!(0.40);
pub const WEIGHT_GAP_QUALITY: Decimal = dec!(0.25);
pub const WEIGHT_PATTERN_STRENGTH: Decimal = dec!(0.15);
pub const WEIGHT_VOLUME_CONFIRMATION: Decimal = dec!(0.20);

/// Aligned structure is a precondition of any signal, so it always scores full.
const STRUCTURAL_ALIGNMENT_SCORE: u32 = 100;
const NEUTRAL_VOLUME_SCORE: u32 = 50;
const VOLUME_RATIO_CAP: Decimal = dec!(3);
const DEFAULT_VOLUME_LOOKBACK: usize = 20;

#[derive(Debug, Clone, Copy)]
pub struct ScoringEngine {
    volume_lookback: usize,
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self {
            volume_lookback: DEFAULT_VOLUME_LOOKBACK,
        }
    }
}

impl ScoringEngine {
    pub fn new(volume_lookback: usize) -> Self {
        Self {
            volume_lookback: volume_lookback.max(1),
        }
    }

    /// `series` is the entry-timeframe window the signal was built from.
    pub fn score(&self, signal: ConfluenceSignal, series: &CandleSeries) -> ScoredSignal {
        let breakdown = ScoreBreakdown {
            structural_alignment: STRUCTURAL_ALIGNMENT_SCORE,
            gap_quality: signal.gap.as_ref().map_or(0, |g| strength_score(g.strength)),
            pattern_strength: signal
                .pattern
                .as_ref()
                .map_or(0, |p| strength_score(p.strength)),
            volume_confirmation: self.volume_score(&signal, series),
        };
        ScoredSignal::new(weighted_score(&breakdown), breakdown, signal)
    }

    /// Anchor candle volume over its trailing mean, capped at 3x, mapped to
    /// `0..=100`. Anchor missing from the series scores 0; no baseline scores 50.
    fn volume_score(&self, signal: &ConfluenceSignal, series: &CandleSeries) -> u32 {
        let Some(index) = series.position(signal.anchor.timestamp()) else {
            return 0;
        };
        let candles = series.candles();
        let baseline = match trailing_mean_volume(candles, index, self.volume_lookback) {
            Some(mean) if mean > Decimal::ZERO => mean,
            _ => return NEUTRAL_VOLUME_SCORE,
        };
        let ratio = (candles[index].volume / baseline).min(VOLUME_RATIO_CAP);
        to_component(ratio / VOLUME_RATIO_CAP * Decimal::ONE_HUNDRED)
    }
}

/// `floor(strength * 100)`, clamped.
fn strength_score(strength: f64) -> u32 {
    (strength.clamp(0.0, 1.0) * 100.0).floor() as u32
}

fn to_component(value: Decimal) -> u32 {
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u32()
        .unwrap_or(0)
        .min(100)
}

/// Weighted sum of the breakdown, rounded half away from zero and clamped.
pub fn weighted_score(breakdown: &ScoreBreakdown) -> u32 {
    let total = WEIGHT_STRUCTURAL_ALIGNMENT * Decimal::from(breakdown.structural_alignment)
        + WEIGHT_GAP_QUALITY * Decimal::from(breakdown.gap_quality)
        + WEIGHT_PATTERN_STRENGTH * Decimal::from(breakdown.pattern_strength)
        + WEIGHT_VOLUME_CONFIRMATION * Decimal::from(breakdown.volume_confirmation);
    to_component(total.max(Decimal::ZERO))
}
