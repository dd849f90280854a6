//! Merged and scored signals.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use super::{
    Direction, EngineVersions, Explanation, FvgResult, IntegrityHash, MarketBias,
    MarketStructureEvent, OrderBlock, PatternResult, Symbol, Timeframe, VolumeSpike,
};

/// The structural level a signal is built around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StructuralAnchor {
    OrderBlock(OrderBlock),
    Event(MarketStructureEvent),
}

impl StructuralAnchor {
    pub fn timestamp(&self) -> i64 {
        match self {
            StructuralAnchor::OrderBlock(ob) => ob.timestamp,
            StructuralAnchor::Event(ev) => ev.timestamp,
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            StructuralAnchor::OrderBlock(ob) => ob.direction,
            StructuralAnchor::Event(ev) => ev.direction,
        }
    }

    pub fn as_order_block(&self) -> Option<&OrderBlock> {
        match self {
            StructuralAnchor::OrderBlock(ob) => Some(ob),
            StructuralAnchor::Event(_) => None,
        }
    }
}

/// Directional evidence aligned across the entry and structural timeframes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfluenceSignal {
    pub symbol: Symbol,
    pub timeframe: Timeframe,
    pub higher_timeframe_bias: MarketBias,
    pub anchor: StructuralAnchor,
    pub pattern: Option<PatternResult>,
    pub gap: Option<FvgResult>,
    pub volume: Option<VolumeSpike>,
    pub engine_versions: EngineVersions,
    pub integrity_hash: IntegrityHash,
    pub explanation: Vec<Explanation>,
}

impl ConfluenceSignal {
    pub fn direction(&self) -> Direction {
        self.anchor.direction()
    }
}

/// Component scores, each in `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub structural_alignment: u32,
    pub gap_quality: u32,
    pub pattern_strength: u32,
    pub volume_confirmation: u32,
}

impl ScoreBreakdown {
    pub fn to_map(&self) -> BTreeMap<String, u32> {
        BTreeMap::from([
            ("structural_alignment".to_string(), self.structural_alignment),
            ("gap_quality".to_string(), self.gap_quality),
            ("pattern_strength".to_string(), self.pattern_strength),
            ("volume_confirmation".to_string(), self.volume_confirmation),
        ])
    }
}

/// A signal plus its weighted confidence score. Built by the scoring engine.
///
/// Deserialization recomputes the weighted score and rejects a record whose
/// `confidence_score` disagrees with its breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ScoredSignalRecord")]
pub struct ScoredSignal {
    confidence_score: u32,
    breakdown: ScoreBreakdown,
    signal: ConfluenceSignal,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("confidence score {recorded} does not match weighted breakdown {computed}")]
pub struct ScoreMismatch {
    pub recorded: u32,
    pub computed: u32,
}

/// Wire form of [`ScoredSignal`], checked on the way in.
#[derive(Deserialize)]
struct ScoredSignalRecord {
    confidence_score: u32,
    breakdown: ScoreBreakdown,
    signal: ConfluenceSignal,
}

impl TryFrom<ScoredSignalRecord> for ScoredSignal {
    type Error = ScoreMismatch;

    fn try_from(record: ScoredSignalRecord) -> Result<Self, Self::Error> {
        let computed = crate::scoring::weighted_score(&record.breakdown);
        if computed != record.confidence_score {
            return Err(ScoreMismatch {
                recorded: record.confidence_score,
                computed,
            });
        }
        Ok(Self::new(computed, record.breakdown, record.signal))
    }
}

impl ScoredSignal {
    pub(crate) fn new(confidence_score: u32, breakdown: ScoreBreakdown, signal: ConfluenceSignal) -> Self {
        Self {
            confidence_score,
            breakdown,
            signal,
        }
    }

    pub fn confidence_score(&self) -> u32 {
        self.confidence_score
    }

    pub fn breakdown(&self) -> &ScoreBreakdown {
        &self.breakdown
    }

    pub fn signal(&self) -> &ConfluenceSignal {
        &self.signal
    }

    pub fn symbol(&self) -> &str {
        &self.signal.symbol
    }
}

/// Oracle verdict on a scored signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiValidationResult {
    pub validated: bool,
    pub ai_score: u32,
    pub signal: ScoredSignal,
}

impl AiValidationResult {
    /// Verdict used when no oracle is consulted.
    pub fn pass_through(signal: ScoredSignal) -> Self {
        Self {
            validated: true,
            ai_score: signal.confidence_score(),
            signal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::weighted_score;
    use rust_decimal_macros::dec;

    fn scored() -> ScoredSignal {
        let breakdown = ScoreBreakdown {
            structural_alignment: 100,
            gap_quality: 74,
            pattern_strength: 74,
            volume_confirmation: 100,
        };
        let signal = ConfluenceSignal {
            symbol: "BTCUSDT".into(),
            timeframe: Timeframe::H1,
            higher_timeframe_bias: MarketBias::Bullish,
            anchor: StructuralAnchor::OrderBlock(OrderBlock {
                direction: Direction::Bullish,
                top: dec!(213.7),
                bottom: dec!(211.5),
                timestamp: 7,
                mitigated: false,
            }),
            pattern: None,
            gap: None,
            volume: None,
            engine_versions: Default::default(),
            integrity_hash: IntegrityHash::from_hash("h"),
            explanation: Vec::new(),
        };
        ScoredSignal::new(weighted_score(&breakdown), breakdown, signal)
    }

    #[test]
    fn scored_signal_roundtrips_through_json() {
        let original = scored();
        let json = serde_json::to_string(&original).unwrap();
        let back: ScoredSignal = serde_json::from_str(&json).unwrap();
        assert_eq!(back, original);
        assert_eq!(back.confidence_score(), 90);
    }

    #[test]
    fn tampered_score_is_rejected_on_deserialize() {
        let mut value = serde_json::to_value(scored()).unwrap();
        value["confidence_score"] = serde_json::json!(99);
        let err = serde_json::from_value::<ScoredSignal>(value).unwrap_err();
        assert!(err.to_string().contains("does not match weighted breakdown 90"), "{err}");
    }

    #[test]
    fn tampered_breakdown_is_rejected_on_deserialize() {
        let mut value = serde_json::to_value(scored()).unwrap();
        value["breakdown"]["gap_quality"] = serde_json::json!(0);
        assert!(serde_json::from_value::<ScoredSignal>(value).is_err());
    }
}
