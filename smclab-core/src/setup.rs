//! Trade setup construction with the risk governance gate.
//!
//! A [`TradeSetup`] can only be obtained from [`TradeSetupBuilder::build`],
//! which applies the integrity admission check and the stop-loss cap in the
//! same step.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::audit::AuditSink;
use crate::domain::{CandleSeries, Direction, EngineVersions, ScoredSignal};
use crate::governance::GovernanceConfig;
use crate::indicators::average_true_range;
use crate::integrity::hash_series;
use crate::scoring;

pub const VERSION: &str = "1.1.0";
pub const NAME: &str = "trade_setup";

/// Second target sits at this multiple of the stop distance.
const REWARD_MULTIPLE: Decimal = Decimal::TWO;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSetup {
    direction: Direction,
    entry: Decimal,
    stop_loss: Decimal,
    take_profit_1: Decimal,
    take_profit_2: Decimal,
    risk_percentage: Decimal,
    risk_reward_ratio: Decimal,
    signal: ScoredSignal,
    engine_versions: EngineVersions,
}

impl TradeSetup {
    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn entry(&self) -> Decimal {
        self.entry
    }

    pub fn stop_loss(&self) -> Decimal {
        self.stop_loss
    }

    pub fn take_profit_1(&self) -> Decimal {
        self.take_profit_1
    }

    pub fn take_profit_2(&self) -> Decimal {
        self.take_profit_2
    }

    /// Entry-to-stop distance as a percentage of entry.
    pub fn risk_percentage(&self) -> Decimal {
        self.risk_percentage
    }

    pub fn risk_reward_ratio(&self) -> Decimal {
        self.risk_reward_ratio
    }

    /// Display form, e.g. `1:2.0`.
    pub fn risk_reward_label(&self) -> String {
        format!("1:{:.1}", self.risk_reward_ratio)
    }

    pub fn signal(&self) -> &ScoredSignal {
        &self.signal
    }

    pub fn symbol(&self) -> &str {
        self.signal.symbol()
    }

    pub fn engine_versions(&self) -> &EngineVersions {
        &self.engine_versions
    }
}

pub struct TradeSetupBuilder<'a> {
    governance: &'a GovernanceConfig,
    audit: &'a dyn AuditSink,
}

impl<'a> TradeSetupBuilder<'a> {
    pub fn new(governance: &'a GovernanceConfig, audit: &'a dyn AuditSink) -> Self {
        Self { governance, audit }
    }

    /// `series` is the entry-timeframe window the signal was derived from.
    ///
    /// Returns `None` without logging when the anchor is not an order block.
    /// Every other refusal is reported to the audit sink.
    pub fn build(&self, scored: ScoredSignal, series: &CandleSeries) -> Option<TradeSetup> {
        let symbol = scored.symbol().to_string();
        let signal = scored.signal();

        let Some(block) = signal.anchor.as_order_block().copied() else {
            debug!(symbol = %symbol, "anchor is not an order block, no setup");
            return None;
        };

        if hash_series(series) != signal.integrity_hash {
            self.audit.log_rejection(&symbol, "integrity hash does not match candle window");
            return None;
        }

        let atr = average_true_range(series.candles(), self.governance.atr_period);
        let buffer = atr * self.governance.atr_buffer_multiple;

        let (entry, stop_loss) = match block.direction {
            Direction::Bullish => (block.top, block.bottom - buffer),
            Direction::Bearish => (block.bottom, block.top + buffer),
        };

        if entry <= Decimal::ZERO {
            self.audit.log_rejection(&symbol, &format!("non-positive entry price {entry}"));
            return None;
        }

        let risk = (entry - stop_loss).abs();
        if risk.is_zero() {
            self.audit.log_rejection(&symbol, "zero stop distance");
            return None;
        }

        let risk_percentage = risk / entry * Decimal::ONE_HUNDRED;
        if risk_percentage > self.governance.max_stop_loss_percentage {
            self.audit.log_rejection(
                &symbol,
                &format!(
                    "stop loss {}% exceeds maximum {}%",
                    risk_percentage.round_dp(2),
                    self.governance.max_stop_loss_percentage
                ),
            );
            return None;
        }

        let (take_profit_1, take_profit_2) = match block.direction {
            Direction::Bullish => (entry + risk, entry + risk * REWARD_MULTIPLE),
            Direction::Bearish => (entry - risk, entry - risk * REWARD_MULTIPLE),
        };

        let mut engine_versions = signal.engine_versions.clone();
        engine_versions.insert(scoring::NAME.to_string(), scoring::VERSION.to_string());
        engine_versions.insert(NAME.to_string(), VERSION.to_string());

        debug!(
            symbol = %symbol,
            direction = %block.direction,
            entry = %entry,
            stop_loss = %stop_loss,
            risk_pct = %risk_percentage.round_dp(4),
            "trade setup built"
        );

        Some(TradeSetup {
            direction: block.direction,
            entry,
            stop_loss,
            take_profit_1,
            take_profit_2,
            risk_percentage,
            risk_reward_ratio: REWARD_MULTIPLE,
            signal: scored,
            engine_versions,
        })
    }
}
