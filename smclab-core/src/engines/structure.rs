//! Smart-money market structure: swing points, BOS/CHoCH, order blocks, bias.
//!
//! Swing high at `i`: high strictly above every high within `lookback`
//! candles on both sides (swing low symmetric on lows; a candle that is both
//! is recorded as a high). Events come from walking the swings in time order
//! against the last unbroken high and low.

use serde::{Deserialize, Serialize};

use crate::domain::{
    Candle, CandleSeries, Direction, Explanation, MarketBias, MarketStructureEvent, OrderBlock,
    StructureEventKind, SwingKind, SwingPoint,
};

pub const VERSION: &str = "1.0.0";
pub const NAME: &str = "structure";
pub const DEFAULT_SWING_LOOKBACK: usize = 5;

/// Fewer swing points than this yields no events.
const MIN_SWINGS_FOR_EVENTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureAnalysis {
    pub bias: MarketBias,
    pub swing_points: Vec<SwingPoint>,
    pub events: Vec<MarketStructureEvent>,
    pub order_blocks: Vec<OrderBlock>,
    pub explanation: Explanation,
}

#[derive(Debug, Clone, Copy)]
pub struct StructureEngine {
    swing_lookback: usize,
}

impl Default for StructureEngine {
    fn default() -> Self {
        Self::new(DEFAULT_SWING_LOOKBACK)
    }
}

impl StructureEngine {
    pub fn new(swing_lookback: usize) -> Self {
        Self {
            swing_lookback: swing_lookback.max(1),
        }
    }

    pub fn swing_lookback(&self) -> usize {
        self.swing_lookback
    }

    /// Minimum candles needed before any swing can exist.
    pub fn min_candles(&self) -> usize {
        2 * self.swing_lookback + 1
    }

    pub fn analyze(&self, series: &CandleSeries) -> StructureAnalysis {
        let candles = series.candles();
        if candles.len() < self.min_candles() {
            return ranging(Vec::new(), "Not enough candles to identify swing points.");
        }

        let swing_points = self.find_swing_points(candles);
        if swing_points.len() < MIN_SWINGS_FOR_EVENTS {
            return ranging(swing_points, "Too few swing points to establish structure.");
        }

        let (bias, events) = classify_structure(&swing_points);
        let order_blocks = find_order_blocks(series, &events);

        let reasoning = match bias {
            MarketBias::Ranging => "No structure breaks; market treated as ranging.".to_string(),
            _ => format!("Structure breaks point to a {bias} bias."),
        };
        let explanation = Explanation::new("Market Structure", reasoning)
            .with_detail("Swing Points", swing_points.len())
            .with_detail("BOS Events", count_kind(&events, StructureEventKind::Bos))
            .with_detail("CHoCH Events", count_kind(&events, StructureEventKind::Choch))
            .with_detail("Order Blocks", order_blocks.len());

        StructureAnalysis {
            bias,
            swing_points,
            events,
            order_blocks,
            explanation,
        }
    }

    pub fn find_swing_points(&self, candles: &[Candle]) -> Vec<SwingPoint> {
        let lb = self.swing_lookback;
        if candles.len() < 2 * lb + 1 {
            return Vec::new();
        }

        let mut points = Vec::new();
        for i in lb..candles.len() - lb {
            let center = &candles[i];
            let neighbours = candles[i - lb..i].iter().chain(&candles[i + 1..=i + lb]);

            let is_high = neighbours.clone().all(|c| c.high < center.high);
            let is_low = neighbours.clone().all(|c| c.low > center.low);

            if is_high {
                points.push(SwingPoint {
                    kind: SwingKind::High,
                    price: center.high,
                    timestamp: center.timestamp,
                    index: i,
                });
            } else if is_low {
                points.push(SwingPoint {
                    kind: SwingKind::Low,
                    price: center.low,
                    timestamp: center.timestamp,
                    index: i,
                });
            }
        }
        points
    }
}

fn ranging(swing_points: Vec<SwingPoint>, reasoning: &str) -> StructureAnalysis {
    StructureAnalysis {
        bias: MarketBias::Ranging,
        explanation: Explanation::new("Market Structure", reasoning)
            .with_detail("Swing Points", swing_points.len()),
        swing_points,
        events: Vec::new(),
        order_blocks: Vec::new(),
    }
}

fn count_kind(events: &[MarketStructureEvent], kind: StructureEventKind) -> usize {
    events.iter().filter(|e| e.kind == kind).count()
}

/// Walk swings in order, tracking the last unbroken high/low and the trend.
fn classify_structure(swings: &[SwingPoint]) -> (MarketBias, Vec<MarketStructureEvent>) {
    let first_high = swings.iter().find(|s| s.kind == SwingKind::High);
    let first_low = swings.iter().find(|s| s.kind == SwingKind::Low);
    let (Some(mut last_high), Some(mut last_low)) = (first_high.copied(), first_low.copied()) else {
        return (MarketBias::Ranging, Vec::new());
    };

    let mut uptrend = last_high.price > last_low.price;
    let mut events = Vec::new();

    for point in swings {
        match point.kind {
            SwingKind::High if point.price > last_high.price => {
                let kind = if uptrend {
                    StructureEventKind::Bos
                } else {
                    uptrend = true;
                    StructureEventKind::Choch
                };
                events.push(MarketStructureEvent {
                    kind,
                    direction: Direction::Bullish,
                    timestamp: point.timestamp,
                    price: point.price,
                    broken_swing_timestamp: last_high.timestamp,
                });
                last_high = *point;
            }
            SwingKind::Low if point.price < last_low.price => {
                let kind = if uptrend {
                    uptrend = false;
                    StructureEventKind::Choch
                } else {
                    StructureEventKind::Bos
                };
                events.push(MarketStructureEvent {
                    kind,
                    direction: Direction::Bearish,
                    timestamp: point.timestamp,
                    price: point.price,
                    broken_swing_timestamp: last_low.timestamp,
                });
                last_low = *point;
            }
            _ => {}
        }
    }

    let bias = match (events.is_empty(), uptrend) {
        (true, _) => MarketBias::Ranging,
        (false, true) => MarketBias::Bullish,
        (false, false) => MarketBias::Bearish,
    };
    (bias, events)
}

/// One order block per BOS: the nearest candle at or before the breaking
/// candle whose body opposes the break.
fn find_order_blocks(series: &CandleSeries, events: &[MarketStructureEvent]) -> Vec<OrderBlock> {
    let candles = series.candles();
    let mut blocks = Vec::new();

    for event in events.iter().filter(|e| e.kind == StructureEventKind::Bos) {
        let Some(break_index) = series.position(event.timestamp) else {
            continue;
        };

        let opposing = candles[..=break_index].iter().rev().find(|c| match event.direction {
            Direction::Bullish => c.is_bearish(),
            Direction::Bearish => c.is_bullish(),
        });

        if let Some(candle) = opposing {
            let top = candle.high;
            let bottom = candle.low;
            let mitigated = candles[break_index + 1..]
                .iter()
                .any(|c| c.overlaps(bottom, top));
            blocks.push(OrderBlock {
                direction: event.direction,
                top,
                bottom,
                timestamp: candle.timestamp,
                mitigated,
            });
        }
    }
    blocks
}
