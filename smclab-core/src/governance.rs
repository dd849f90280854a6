//! Governance thresholds read by the gates. Read-only for the duration of a run.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceConfig {
    /// Minimum confidence score for a scored signal to continue.
    pub signal_score_threshold: u32,
    pub ai_validation_enabled: bool,
    /// Minimum oracle score for a validated signal to continue.
    pub ai_validation_threshold: u32,
    /// Hard cap on entry-to-stop distance, percent of entry.
    pub max_stop_loss_percentage: Decimal,
    pub volume_spike_engine_enabled: bool,
    /// Reject signals whose direction contradicts the structural-timeframe regime.
    pub regime_filter_enabled: bool,
    pub atr_period: usize,
    /// Stop buffer beyond the order block, in ATRs.
    pub atr_buffer_multiple: Decimal,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            signal_score_threshold: 70,
            ai_validation_enabled: false,
            ai_validation_threshold: 60,
            max_stop_loss_percentage: dec!(2.0),
            volume_spike_engine_enabled: true,
            regime_filter_enabled: false,
            atr_period: 14,
            atr_buffer_multiple: dec!(0.5),
        }
    }
}
