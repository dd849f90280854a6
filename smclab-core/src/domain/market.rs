//! Directional vocabulary shared by every engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Trade or evidence direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Bullish,
    Bearish,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Bullish => Direction::Bearish,
            Direction::Bearish => Direction::Bullish,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Bullish => write!(f, "BULLISH"),
            Direction::Bearish => write!(f, "BEARISH"),
        }
    }
}

/// Market bias from structure analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketBias {
    Bullish,
    Bearish,
    Ranging,
}

impl MarketBias {
    /// `None` for Ranging.
    pub fn direction(self) -> Option<Direction> {
        match self {
            MarketBias::Bullish => Some(Direction::Bullish),
            MarketBias::Bearish => Some(Direction::Bearish),
            MarketBias::Ranging => None,
        }
    }
}

impl From<Direction> for MarketBias {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Bullish => MarketBias::Bullish,
            Direction::Bearish => MarketBias::Bearish,
        }
    }
}

impl fmt::Display for MarketBias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketBias::Bullish => write!(f, "BULLISH"),
            MarketBias::Bearish => write!(f, "BEARISH"),
            MarketBias::Ranging => write!(f, "RANGING"),
        }
    }
}
