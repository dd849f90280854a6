//! Replays a trade setup against the candles that follow it.
//!
//! State machine: `AwaitingEntry -> InTrade -> HitTp2 | HitSl`. A series that
//! ends before a terminal event yields `NotTriggered` with zero timestamps,
//! whether or not entry happened. TP1 is not a partial exit.

use serde::{Deserialize, Serialize};

use crate::domain::{Candle, CandleSeries, Direction};
use crate::setup::TradeSetup;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BacktestOutcome {
    HitTp2,
    /// Not produced by this simulator: TP1 is not a partial exit.
    HitTp1,
    HitSl,
    NotTriggered,
}

/// Which level wins when one candle touches both the target and the stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntrabarPolicy {
    /// TP2 before SL.
    #[default]
    TargetFirst,
    /// SL before TP2.
    StopFirst,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub outcome: BacktestOutcome,
    pub entry_timestamp: i64,
    pub exit_timestamp: i64,
    pub setup: TradeSetup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TradeState {
    AwaitingEntry,
    InTrade { entry_timestamp: i64 },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BacktestSimulator {
    policy: IntrabarPolicy,
}

impl BacktestSimulator {
    pub fn new(policy: IntrabarPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> IntrabarPolicy {
        self.policy
    }

    /// Exactly one result for any setup and future.
    pub fn run(&self, setup: &TradeSetup, future: &CandleSeries) -> BacktestResult {
        let mut state = TradeState::AwaitingEntry;

        for candle in future {
            if state == TradeState::AwaitingEntry && touches_entry(setup, candle) {
                state = TradeState::InTrade {
                    entry_timestamp: candle.timestamp,
                };
            }

            // The entry candle is checked for exits too.
            if let TradeState::InTrade { entry_timestamp } = state {
                if let Some(outcome) = self.exit(setup, candle) {
                    return BacktestResult {
                        outcome,
                        entry_timestamp,
                        exit_timestamp: candle.timestamp,
                        setup: setup.clone(),
                    };
                }
            }
        }

        BacktestResult {
            outcome: BacktestOutcome::NotTriggered,
            entry_timestamp: 0,
            exit_timestamp: 0,
            setup: setup.clone(),
        }
    }

    fn exit(&self, setup: &TradeSetup, candle: &Candle) -> Option<BacktestOutcome> {
        let (target_hit, stop_hit) = match setup.direction() {
            Direction::Bullish => (
                candle.high >= setup.take_profit_2(),
                candle.low <= setup.stop_loss(),
            ),
            Direction::Bearish => (
                candle.low <= setup.take_profit_2(),
                candle.high >= setup.stop_loss(),
            ),
        };

        match (target_hit, stop_hit, self.policy) {
            (true, true, IntrabarPolicy::TargetFirst) => Some(BacktestOutcome::HitTp2),
            (true, true, IntrabarPolicy::StopFirst) => Some(BacktestOutcome::HitSl),
            (true, false, _) => Some(BacktestOutcome::HitTp2),
            (false, true, _) => Some(BacktestOutcome::HitSl),
            (false, false, _) => None,
        }
    }
}

fn touches_entry(setup: &TradeSetup, candle: &Candle) -> bool {
    match setup.direction() {
        Direction::Bullish => candle.low <= setup.entry(),
        Direction::Bearish => candle.high >= setup.entry(),
    }
}
