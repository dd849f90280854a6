//! Scanner configuration (TOML) and the hot-reload handle.
//!
//! ```toml
//! [governance]
//! signal_score_threshold = 70
//! max_stop_loss_percentage = 2.0
//!
//! [scan]
//! symbols = ["BTCUSDT", "ETHUSDT"]
//! entry_timeframe = "1h"
//! structure_timeframe = "4h"
//!
//! [backtest]
//! warmup = 200
//! intrabar_policy = "target_first"
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smclab_core::domain::Timeframe;
use smclab_core::engines::{regime, structure, volume};
use smclab_core::{GovernanceConfig, IntrabarPolicy};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize config TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Engine tuning parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineParams {
    pub swing_lookback: usize,
    pub volume_lookback: usize,
    pub volume_threshold: f64,
    pub regime_period: usize,
    pub regime_band: Decimal,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            swing_lookback: structure::DEFAULT_SWING_LOOKBACK,
            volume_lookback: volume::DEFAULT_LOOKBACK,
            volume_threshold: volume::DEFAULT_THRESHOLD,
            regime_period: regime::DEFAULT_PERIOD,
            regime_band: regime::DEFAULT_BAND,
        }
    }
}

/// What to scan and how wide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub symbols: Vec<String>,
    pub entry_timeframe: Timeframe,
    pub structure_timeframe: Timeframe,
    /// Most recent candles fetched per timeframe.
    pub window: usize,
    /// Worker threads for universe-wide runs; 0 means available parallelism.
    pub worker_threads: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            symbols: Vec::new(),
            entry_timeframe: Timeframe::H1,
            structure_timeframe: Timeframe::H4,
            window: 500,
            worker_threads: 0,
        }
    }
}

impl ScanConfig {
    pub fn effective_threads(&self) -> usize {
        if self.worker_threads > 0 {
            return self.worker_threads;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}

/// Walk-forward backtest settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkForwardConfig {
    /// First window end index; earlier candles are history only.
    pub warmup: usize,
    /// Candles between successive window ends.
    pub step: usize,
    pub intrabar_policy: IntrabarPolicy,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        Self {
            warmup: 200,
            step: 1,
            intrabar_policy: IntrabarPolicy::TargetFirst,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub governance: GovernanceConfig,
    pub engines: EngineParams,
    pub scan: ScanConfig,
    pub backtest: WalkForwardConfig,
}

impl ScannerConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let g = &self.governance;
        if g.signal_score_threshold > 100 {
            return Err(invalid("governance.signal_score_threshold must be 0..=100"));
        }
        if g.ai_validation_threshold > 100 {
            return Err(invalid("governance.ai_validation_threshold must be 0..=100"));
        }
        if g.max_stop_loss_percentage <= Decimal::ZERO {
            return Err(invalid("governance.max_stop_loss_percentage must be positive"));
        }
        if g.atr_period == 0 {
            return Err(invalid("governance.atr_period must be at least 1"));
        }
        if g.atr_buffer_multiple < Decimal::ZERO {
            return Err(invalid("governance.atr_buffer_multiple must not be negative"));
        }
        if self.engines.swing_lookback == 0 || self.engines.volume_lookback == 0 {
            return Err(invalid("engine lookbacks must be at least 1"));
        }
        if !(self.engines.volume_threshold > 0.0) {
            return Err(invalid("engines.volume_threshold must be positive"));
        }
        if self.scan.structure_timeframe < self.scan.entry_timeframe {
            return Err(invalid(
                "scan.structure_timeframe must not be shorter than scan.entry_timeframe",
            ));
        }
        if self.scan.window == 0 {
            return Err(invalid("scan.window must be at least 1"));
        }
        if self.backtest.step == 0 {
            return Err(invalid("backtest.step must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(msg: &str) -> ConfigError {
    ConfigError::Invalid(msg.to_string())
}

/// Shared, swappable configuration.
///
/// Each run takes one [`snapshot`](ConfigHandle::snapshot) and reads only
/// that; a reload becomes visible to the next run.
#[derive(Debug)]
pub struct ConfigHandle {
    current: RwLock<Arc<ScannerConfig>>,
}

impl ConfigHandle {
    pub fn new(config: ScannerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            current: RwLock::new(Arc::new(config)),
        })
    }

    pub fn snapshot(&self) -> Arc<ScannerConfig> {
        let guard = self.current.read().unwrap_or_else(|p| p.into_inner());
        Arc::clone(&guard)
    }

    /// Swap in a validated config. Invalid configs leave the current one in place.
    pub fn replace(&self, config: ScannerConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let mut guard = self.current.write().unwrap_or_else(|p| p.into_inner());
        *guard = Arc::new(config);
        Ok(())
    }

    pub fn reload(&self, path: &Path) -> Result<(), ConfigError> {
        self.replace(ScannerConfig::from_file(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = ScannerConfig::from_toml("").unwrap();
        assert_eq!(config, ScannerConfig::default());
        assert_eq!(config.scan.entry_timeframe, Timeframe::H1);
        assert_eq!(config.scan.structure_timeframe, Timeframe::H4);
        assert_eq!(config.backtest.warmup, 200);
    }

    #[test]
    fn parses_sections() {
        let toml = r#"
            [governance]
            signal_score_threshold = 55
            max_stop_loss_percentage = 3.5
            ai_validation_enabled = true

            [scan]
            symbols = ["BTCUSDT", "ETHUSDT"]
            entry_timeframe = "15m"
            structure_timeframe = "1h"

            [backtest]
            step = 4
            intrabar_policy = "stop_first"
        "#;
        let config = ScannerConfig::from_toml(toml).unwrap();
        assert_eq!(config.governance.signal_score_threshold, 55);
        assert_eq!(config.governance.max_stop_loss_percentage, dec!(3.5));
        assert!(config.governance.ai_validation_enabled);
        assert_eq!(config.scan.symbols.len(), 2);
        assert_eq!(config.scan.entry_timeframe, Timeframe::M15);
        assert_eq!(config.backtest.step, 4);
        assert_eq!(config.backtest.intrabar_policy, IntrabarPolicy::StopFirst);
        // Untouched fields keep defaults.
        assert_eq!(config.governance.ai_validation_threshold, 60);
    }

    #[test]
    fn rejects_inverted_timeframes() {
        let toml = r#"
            [scan]
            entry_timeframe = "4h"
            structure_timeframe = "1h"
        "#;
        assert!(matches!(ScannerConfig::from_toml(toml), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_unknown_timeframe() {
        let toml = "[scan]\nentry_timeframe = \"2h\"\n";
        assert!(matches!(ScannerConfig::from_toml(toml), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn toml_roundtrip() {
        let mut config = ScannerConfig::default();
        config.scan.symbols = vec!["SOLUSDT".into()];
        config.governance.max_stop_loss_percentage = dec!(1.25);
        let text = config.to_toml().unwrap();
        assert_eq!(ScannerConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn handle_replace_is_seen_by_next_snapshot() {
        let handle = ConfigHandle::new(ScannerConfig::default()).unwrap();
        let before = handle.snapshot();

        let mut next = ScannerConfig::default();
        next.governance.signal_score_threshold = 40;
        handle.replace(next).unwrap();

        assert_eq!(before.governance.signal_score_threshold, 70);
        assert_eq!(handle.snapshot().governance.signal_score_threshold, 40);
    }

    #[test]
    fn handle_keeps_old_config_on_invalid_replace() {
        let handle = ConfigHandle::new(ScannerConfig::default()).unwrap();
        let mut bad = ScannerConfig::default();
        bad.scan.window = 0;
        assert!(handle.replace(bad).is_err());
        assert_eq!(handle.snapshot().scan.window, 500);
    }
}
