//! Macro regime filter on the structural timeframe.
//!
//! Trend regime from the last close against its simple moving average with
//! a symmetric band.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::domain::{CandleSeries, Direction};

pub const VERSION: &str = "1.0.0";
pub const NAME: &str = "regime";
pub const DEFAULT_PERIOD: usize = 50;
pub const DEFAULT_BAND: Decimal = dec!(0.05);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketRegime {
    BullTrend,
    BearTrend,
    Ranging,
}

impl MarketRegime {
    /// Ranging permits either direction; a trend only permits its own.
    pub fn permits(self, direction: Direction) -> bool {
        match self {
            MarketRegime::Ranging => true,
            MarketRegime::BullTrend => direction == Direction::Bullish,
            MarketRegime::BearTrend => direction == Direction::Bearish,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RegimeFilterEngine {
    period: usize,
    band: Decimal,
}

impl Default for RegimeFilterEngine {
    fn default() -> Self {
        Self::new(DEFAULT_PERIOD, DEFAULT_BAND)
    }
}

impl RegimeFilterEngine {
    pub fn new(period: usize, band: Decimal) -> Self {
        Self {
            period: period.max(1),
            band,
        }
    }

    pub fn regime(&self, series: &CandleSeries) -> MarketRegime {
        if series.len() < self.period {
            return MarketRegime::Ranging;
        }
        let window = series.tail(self.period);
        let sum: Decimal = window.iter().map(|c| c.close).sum();
        let sma = sum / Decimal::from(self.period);
        let Some(last) = series.last() else {
            return MarketRegime::Ranging;
        };

        if last.close > sma * (Decimal::ONE + self.band) {
            MarketRegime::BullTrend
        } else if last.close < sma * (Decimal::ONE - self.band) {
            MarketRegime::BearTrend
        } else {
            MarketRegime::Ranging
        }
    }
}
