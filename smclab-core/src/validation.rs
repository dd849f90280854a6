//! Oracle validation gate.
//!
//! The oracle is an external collaborator. When it is disabled, absent, or
//! fails, the signal passes through with its own confidence score.

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::{AiValidationResult, CandleSeries, ScoredSignal};
use crate::governance::GovernanceConfig;

pub const VERSION: &str = "1.0.0";
pub const NAME: &str = "validation";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    #[error("oracle unavailable: {0}")]
    Unavailable(String),

    #[error("oracle returned a malformed verdict: {0}")]
    Malformed(String),
}

pub trait AiOracle: Send + Sync {
    fn name(&self) -> &str;

    fn validate(
        &self,
        signal: &ScoredSignal,
        series: &CandleSeries,
    ) -> Result<AiValidationResult, OracleError>;
}

/// Deterministic stand-in model.
///
/// +10 when the score is above 80 with strong volume, -15 without pattern
/// evidence. Validated at 60 or above.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedOracle;

impl RuleBasedOracle {
    const VALIDATION_FLOOR: u32 = 60;
}

impl AiOracle for RuleBasedOracle {
    fn name(&self) -> &str {
        "rule_based"
    }

    fn validate(
        &self,
        signal: &ScoredSignal,
        _series: &CandleSeries,
    ) -> Result<AiValidationResult, OracleError> {
        let score = signal.confidence_score();
        let ai_score = if score > 80 && signal.breakdown().volume_confirmation > 75 {
            score + 10
        } else if signal.signal().pattern.is_none() {
            score.saturating_sub(15)
        } else {
            score
        }
        .min(100);

        Ok(AiValidationResult {
            validated: ai_score >= Self::VALIDATION_FLOOR,
            ai_score,
            signal: signal.clone(),
        })
    }
}

pub struct ValidationGate {
    oracle: Option<Arc<dyn AiOracle>>,
    enabled: bool,
    threshold: u32,
}

impl std::fmt::Debug for ValidationGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationGate")
            .field("oracle", &self.oracle.as_ref().map(|o| o.name().to_string()))
            .field("enabled", &self.enabled)
            .field("threshold", &self.threshold)
            .finish()
    }
}

impl ValidationGate {
    pub fn new(oracle: Option<Arc<dyn AiOracle>>, governance: &GovernanceConfig) -> Self {
        Self {
            oracle,
            enabled: governance.ai_validation_enabled,
            threshold: governance.ai_validation_threshold,
        }
    }

    /// Gate with no oracle: always pass-through.
    pub fn pass_through(governance: &GovernanceConfig) -> Self {
        Self::new(None, governance)
    }

    /// Consult the oracle, falling back to pass-through.
    pub fn consult(&self, signal: ScoredSignal, series: &CandleSeries) -> AiValidationResult {
        let oracle = match (&self.oracle, self.enabled) {
            (Some(oracle), true) => oracle,
            _ => return AiValidationResult::pass_through(signal),
        };
        match oracle.validate(&signal, series) {
            Ok(result) => {
                debug!(
                    symbol = %signal.symbol(),
                    oracle = oracle.name(),
                    validated = result.validated,
                    ai_score = result.ai_score,
                    "oracle verdict"
                );
                result
            }
            Err(err) => {
                warn!(symbol = %signal.symbol(), oracle = oracle.name(), error = %err, "oracle failed, passing through");
                AiValidationResult::pass_through(signal)
            }
        }
    }

    pub fn admits(&self, result: &AiValidationResult) -> bool {
        result.validated && result.ai_score >= self.threshold
    }

    /// Consult and filter in one step.
    pub fn validate(&self, signal: ScoredSignal, series: &CandleSeries) -> Option<AiValidationResult> {
        let result = self.consult(signal, series);
        self.admits(&result).then_some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Candle, ConfluenceSignal, Direction, Explanation, IntegrityHash, MarketBias, OrderBlock,
        PatternKind, PatternResult, StructuralAnchor, Timeframe,
    };
    use crate::scoring::ScoringEngine;
    use rust_decimal_macros::dec;

    struct FailingOracle;

    impl AiOracle for FailingOracle {
        fn name(&self) -> &str {
            "failing"
        }

        fn validate(
            &self,
            _signal: &ScoredSignal,
            _series: &CandleSeries,
        ) -> Result<AiValidationResult, OracleError> {
            Err(OracleError::Unavailable("timeout".into()))
        }
    }

    fn scored(with_pattern: bool) -> (ScoredSignal, CandleSeries) {
        let series = CandleSeries::new(vec![Candle::new(
            0,
            dec!(10),
            dec!(11),
            dec!(9),
            dec!(10),
            dec!(100),
        )])
        .unwrap();
        let pattern = with_pattern.then(|| PatternResult {
            name: "Morning Star".into(),
            kind: PatternKind::Reversal,
            direction: Direction::Bullish,
            strength: 0.9,
            start_timestamp: 0,
            end_timestamp: 0,
            explanation: Explanation::new("Chart Pattern", "test"),
        });
        let signal = ConfluenceSignal {
            symbol: "BTCUSDT".into(),
            timeframe: Timeframe::H1,
            higher_timeframe_bias: MarketBias::Bullish,
            anchor: StructuralAnchor::OrderBlock(OrderBlock {
                direction: Direction::Bullish,
                top: dec!(11),
                bottom: dec!(9),
                timestamp: 0,
                mitigated: false,
            }),
            pattern,
            gap: None,
            volume: None,
            engine_versions: Default::default(),
            integrity_hash: IntegrityHash::from_hash("h"),
            explanation: Vec::new(),
        };
        (ScoringEngine::default().score(signal, &series), series)
    }

    #[test]
    fn disabled_gate_passes_through() {
        let (signal, series) = scored(false);
        let score = signal.confidence_score();
        let gate = ValidationGate::new(Some(Arc::new(RuleBasedOracle)), &GovernanceConfig::default());
        let result = gate.consult(signal, &series);
        assert!(result.validated);
        assert_eq!(result.ai_score, score);
    }

    #[test]
    fn oracle_failure_passes_through() {
        let governance = GovernanceConfig {
            ai_validation_enabled: true,
            ai_validation_threshold: 0,
            ..Default::default()
        };
        let (signal, series) = scored(false);
        let gate = ValidationGate::new(Some(Arc::new(FailingOracle)), &governance);
        let result = gate.validate(signal, &series).unwrap();
        assert!(result.validated);
    }

    #[test]
    fn rule_based_oracle_penalizes_missing_pattern() {
        // 40 structural + 10 neutral volume = 50 without pattern.
        let (signal, series) = scored(false);
        let result = RuleBasedOracle.validate(&signal, &series).unwrap();
        assert_eq!(result.ai_score, 35);
        assert!(!result.validated);

        // Pattern strength 90 adds 13.5.
        let (signal, series) = scored(true);
        let result = RuleBasedOracle.validate(&signal, &series).unwrap();
        assert_eq!(result.ai_score, signal.confidence_score());
    }

    #[test]
    fn gate_filters_below_threshold() {
        let governance = GovernanceConfig {
            ai_validation_enabled: true,
            ai_validation_threshold: 60,
            ..Default::default()
        };
        let (signal, series) = scored(true);
        let gate = ValidationGate::new(Some(Arc::new(RuleBasedOracle)), &governance);
        // 40 + 13.5 + 10 = 63.5 -> 64, unchanged by the oracle.
        let result = gate.validate(signal, &series).unwrap();
        assert_eq!(result.ai_score, 64);

        let strict = GovernanceConfig {
            ai_validation_threshold: 65,
            ..governance
        };
        let (signal, series) = scored(true);
        let gate = ValidationGate::new(Some(Arc::new(RuleBasedOracle)), &strict);
        assert!(gate.validate(signal, &series).is_none());
    }
}
