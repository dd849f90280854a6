//! Market-structure output: swing points, BOS/CHoCH events, order blocks.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SwingKind {
    High,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwingPoint {
    pub kind: SwingKind,
    pub price: Decimal,
    pub timestamp: i64,
    /// Candle index within the analyzed series.
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StructureEventKind {
    /// Break of structure: continuation of the current trend.
    Bos,
    /// Change of character: the trend flips.
    Choch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketStructureEvent {
    pub kind: StructureEventKind,
    /// Bullish when a swing high was exceeded, bearish when a swing low was undercut.
    pub direction: Direction,
    /// Timestamp of the breaking swing candle.
    pub timestamp: i64,
    pub price: Decimal,
    pub broken_swing_timestamp: i64,
}

/// Last opposing candle before a BOS, as a price zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBlock {
    pub direction: Direction,
    pub top: Decimal,
    pub bottom: Decimal,
    pub timestamp: i64,
    pub mitigated: bool,
}
