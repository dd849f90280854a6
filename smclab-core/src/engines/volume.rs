//! Volume spikes relative to a rolling mean.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::domain::{CandleSeries, VolumeSpike};
use crate::indicators::trailing_mean_volume;

pub const VERSION: &str = "1.0.0";
pub const NAME: &str = "volume_spike";
pub const DEFAULT_LOOKBACK: usize = 20;
pub const DEFAULT_THRESHOLD: f64 = 3.0;

#[derive(Debug, Clone, Copy)]
pub struct VolumeSpikeEngine {
    lookback: usize,
    threshold: f64,
}

impl Default for VolumeSpikeEngine {
    fn default() -> Self {
        Self::new(DEFAULT_LOOKBACK, DEFAULT_THRESHOLD)
    }
}

impl VolumeSpikeEngine {
    pub fn new(lookback: usize, threshold: f64) -> Self {
        Self {
            lookback: lookback.max(1),
            threshold,
        }
    }

    /// Candles whose volume is at least `threshold` times the mean of the
    /// `lookback` candles before them. Zero baselines are skipped.
    pub fn analyze(&self, series: &CandleSeries) -> Vec<VolumeSpike> {
        let candles = series.candles();
        let mut spikes = Vec::new();
        for i in self.lookback..candles.len() {
            let Some(baseline) = trailing_mean_volume(candles, i, self.lookback) else {
                continue;
            };
            if baseline <= Decimal::ZERO {
                continue;
            }
            let ratio = (candles[i].volume / baseline).to_f64().unwrap_or(0.0);
            if ratio >= self.threshold {
                spikes.push(VolumeSpike {
                    timestamp: candles[i].timestamp,
                    ratio,
                });
            }
        }
        spikes
    }
}
