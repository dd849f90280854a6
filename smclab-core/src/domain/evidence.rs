//! Auxiliary evidence: fair value gaps, candle patterns, volume spikes.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Direction, Explanation};

/// Three-candle price imbalance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FvgResult {
    pub direction: Direction,
    pub top: Decimal,
    pub bottom: Decimal,
    /// Middle candle body/range, in `[0, 1]`.
    pub strength: f64,
    pub mitigated: bool,
    pub start_timestamp: i64,
    /// Mitigating candle if mitigated, else the third window candle.
    pub end_timestamp: i64,
    pub explanation: Explanation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PatternKind {
    Reversal,
    Continuation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternResult {
    pub name: String,
    pub kind: PatternKind,
    pub direction: Direction,
    /// In `[0, 1]`.
    pub strength: f64,
    pub start_timestamp: i64,
    pub end_timestamp: i64,
    pub explanation: Explanation,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeSpike {
    pub timestamp: i64,
    /// Volume over the trailing mean.
    pub ratio: f64,
}
