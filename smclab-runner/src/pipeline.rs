//! Per-symbol scan pipeline and the bounded-pool universe scan.
//!
//! Stage order for one symbol:
//! 1. Fetch entry and structural windows
//! 2. Integrity gate on both windows
//! 3. Structure on both timeframes, joined
//! 4. Gap, pattern, volume (and regime, when enabled) evidence
//! 5. Confluence merge and scoring; every score is audit-logged
//! 6. Oracle gate
//! 7. Trade setup with the risk gate
//!
//! Cancellation is checked between stages, never inside an engine.

use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use smclab_core::domain::CandleSeries;
use smclab_core::engines::{
    GapEngine, PatternEngine, RegimeFilterEngine, StructureEngine, VolumeSpikeEngine,
};
use smclab_core::{
    AiOracle, AuditSink, ConfluenceInput, ConfluenceMerger, DataIntegrityEngine, ScoringEngine,
    TradeSetup, TradeSetupBuilder, ValidationGate,
};

use crate::config::ScannerConfig;
use crate::profiling::ProfileScope;
use crate::provider::MarketDataProvider;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("no symbols configured")]
    NoSymbols,

    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),
}

/// How far one symbol got through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScanOutcome {
    FetchFailed { reason: String },
    IntegrityFailed { issues: Vec<String> },
    NoConfluence,
    BelowThreshold { score: u32 },
    NotValidated { ai_score: u32 },
    /// Anchor was not an order block, or the risk gate refused it.
    NoSetup,
    Setup(Box<TradeSetup>),
    Cancelled,
}

impl ScanOutcome {
    pub fn setup(&self) -> Option<&TradeSetup> {
        match self {
            ScanOutcome::Setup(setup) => Some(setup),
            _ => None,
        }
    }

    pub fn into_setup(self) -> Option<TradeSetup> {
        match self {
            ScanOutcome::Setup(setup) => Some(*setup),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScanOutcome::FetchFailed { .. } => "fetch_failed",
            ScanOutcome::IntegrityFailed { .. } => "integrity_failed",
            ScanOutcome::NoConfluence => "no_confluence",
            ScanOutcome::BelowThreshold { .. } => "below_threshold",
            ScanOutcome::NotValidated { .. } => "not_validated",
            ScanOutcome::NoSetup => "no_setup",
            ScanOutcome::Setup(_) => "setup",
            ScanOutcome::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolScan {
    pub symbol: String,
    pub outcome: ScanOutcome,
}

/// Outcomes of one universe scan, keyed by symbol.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UniverseScan {
    pub outcomes: BTreeMap<String, ScanOutcome>,
}

impl UniverseScan {
    pub fn setups(&self) -> impl Iterator<Item = &TradeSetup> {
        self.outcomes.values().filter_map(ScanOutcome::setup)
    }

    pub fn get(&self, symbol: &str) -> Option<&ScanOutcome> {
        self.outcomes.get(symbol)
    }

    /// Outcome label counts, for logging.
    pub fn tally(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for outcome in self.outcomes.values() {
            *counts.entry(outcome.label()).or_insert(0) += 1;
        }
        counts
    }
}

fn cancelled(cancel: Option<&AtomicBool>) -> bool {
    cancel.is_some_and(|f| f.load(Ordering::Relaxed))
}

/// Engines and gates for one configuration snapshot.
pub struct Scanner {
    config: Arc<ScannerConfig>,
    provider: Arc<dyn MarketDataProvider>,
    audit: Arc<dyn AuditSink>,
    gate: ValidationGate,
    integrity: DataIntegrityEngine,
    structure: StructureEngine,
    gaps: GapEngine,
    patterns: PatternEngine,
    volume: VolumeSpikeEngine,
    regime: RegimeFilterEngine,
    merger: ConfluenceMerger,
    scoring: ScoringEngine,
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("provider", &self.provider.name())
            .field("symbols", &self.config.scan.symbols)
            .field("gate", &self.gate)
            .finish()
    }
}

impl Scanner {
    /// Scanner without an oracle; the gate passes signals through.
    pub fn new(
        config: Arc<ScannerConfig>,
        provider: Arc<dyn MarketDataProvider>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let engines = &config.engines;
        Self {
            gate: ValidationGate::pass_through(&config.governance),
            integrity: DataIntegrityEngine::new(),
            structure: StructureEngine::new(engines.swing_lookback),
            gaps: GapEngine::new(),
            patterns: PatternEngine::default(),
            volume: VolumeSpikeEngine::new(engines.volume_lookback, engines.volume_threshold),
            regime: RegimeFilterEngine::new(engines.regime_period, engines.regime_band),
            merger: ConfluenceMerger::new(),
            scoring: ScoringEngine::new(engines.volume_lookback),
            config,
            provider,
            audit,
        }
    }

    pub fn with_oracle(mut self, oracle: Arc<dyn AiOracle>) -> Self {
        self.gate = ValidationGate::new(Some(oracle), &self.config.governance);
        self
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    pub fn provider(&self) -> &dyn MarketDataProvider {
        &*self.provider
    }

    /// Fetch both windows for `symbol` and run the pipeline on them.
    pub fn scan_symbol(&self, symbol: &str, cancel: Option<&AtomicBool>) -> ScanOutcome {
        if cancelled(cancel) {
            return ScanOutcome::Cancelled;
        }
        let _scope = ProfileScope::for_symbol("scan_symbol", symbol);
        let scan = &self.config.scan;

        let fetched = self
            .provider
            .fetch(symbol, scan.entry_timeframe, scan.window)
            .and_then(|entry| {
                let higher = self
                    .provider
                    .fetch(symbol, scan.structure_timeframe, scan.window)?;
                Ok((entry, higher))
            });
        let (entry, higher) = match fetched {
            Ok(windows) => windows,
            Err(err) => {
                warn!(symbol = %symbol, provider = self.provider.name(), error = %err, "fetch failed, skipping symbol");
                self.audit
                    .log_rejection(symbol, &format!("market data unavailable: {err}"));
                return ScanOutcome::FetchFailed {
                    reason: err.to_string(),
                };
            }
        };

        self.analyze_windows(symbol, &entry, &higher, cancel)
    }

    /// Run every stage after the fetch on already-materialized windows.
    pub fn analyze_windows(
        &self,
        symbol: &str,
        entry: &CandleSeries,
        higher: &CandleSeries,
        cancel: Option<&AtomicBool>,
    ) -> ScanOutcome {
        let governance = &self.config.governance;

        // ── Integrity ──
        let report = {
            let _scope = ProfileScope::for_symbol("integrity", symbol);
            let report = self.integrity.validate(entry);
            let higher_report = self.integrity.validate(higher);
            if !report.valid || !higher_report.valid {
                let issues: Vec<String> = report
                    .issues
                    .into_iter()
                    .chain(higher_report.issues)
                    .collect();
                warn!(symbol = %symbol, issues = issues.len(), "integrity check failed, skipping symbol");
                self.audit.log_rejection(
                    symbol,
                    &format!("integrity check failed: {}", issues.join("; ")),
                );
                return ScanOutcome::IntegrityFailed { issues };
            }
            report
        };
        if cancelled(cancel) {
            return ScanOutcome::Cancelled;
        }

        // ── Structure on both timeframes ──
        let (entry_structure, higher_structure) = {
            let _scope = ProfileScope::for_symbol("structure", symbol);
            rayon::join(
                || self.structure.analyze(entry),
                || self.structure.analyze(higher),
            )
        };
        if cancelled(cancel) {
            return ScanOutcome::Cancelled;
        }

        // ── Evidence ──
        let (gaps, patterns, spikes, regime) = {
            let _scope = ProfileScope::for_symbol("evidence", symbol);
            let spikes = governance
                .volume_spike_engine_enabled
                .then(|| self.volume.analyze(entry));
            let regime = governance
                .regime_filter_enabled
                .then(|| self.regime.regime(higher));
            (
                self.gaps.analyze(entry),
                self.patterns.analyze(entry),
                spikes,
                regime,
            )
        };

        let Some(signal) = self.merger.merge(&ConfluenceInput {
            symbol,
            timeframe: self.config.scan.entry_timeframe,
            entry: &entry_structure,
            higher: &higher_structure,
            patterns: &patterns,
            gaps: &gaps,
            volume: spikes.as_deref(),
            regime,
            integrity_hash: &report.data_hash,
        }) else {
            debug!(
                symbol = %symbol,
                entry_bias = %entry_structure.bias,
                higher_bias = %higher_structure.bias,
                "no confluence"
            );
            return ScanOutcome::NoConfluence;
        };

        // ── Scoring ──
        let scored = self.scoring.score(signal, entry);
        let score = scored.confidence_score();
        let passed = score >= governance.signal_score_threshold;
        self.audit.log_evaluation(&scored, passed);
        if !passed {
            debug!(symbol = %symbol, score, threshold = governance.signal_score_threshold, "below score threshold");
            return ScanOutcome::BelowThreshold { score };
        }
        if cancelled(cancel) {
            return ScanOutcome::Cancelled;
        }

        // ── Oracle gate ──
        let verdict = {
            let _scope = ProfileScope::for_symbol("validation", symbol);
            self.gate.consult(scored, entry)
        };
        if !self.gate.admits(&verdict) {
            self.audit.log_rejection(
                symbol,
                &format!(
                    "oracle score {} below threshold {}",
                    verdict.ai_score, governance.ai_validation_threshold
                ),
            );
            return ScanOutcome::NotValidated {
                ai_score: verdict.ai_score,
            };
        }
        if cancelled(cancel) {
            return ScanOutcome::Cancelled;
        }

        // ── Setup and risk gate ──
        match TradeSetupBuilder::new(governance, &*self.audit).build(verdict.signal, entry) {
            Some(setup) => {
                info!(
                    symbol = %symbol,
                    direction = %setup.direction(),
                    entry = %setup.entry(),
                    stop = %setup.stop_loss(),
                    score,
                    "trade setup"
                );
                ScanOutcome::Setup(Box::new(setup))
            }
            None => ScanOutcome::NoSetup,
        }
    }

    /// Scan every configured symbol on a private bounded pool.
    pub fn scan_universe(&self, cancel: Option<&AtomicBool>) -> Result<UniverseScan, ScanError> {
        let symbols = &self.config.scan.symbols;
        if symbols.is_empty() {
            return Err(ScanError::NoSymbols);
        }
        let threads = self.config.scan.effective_threads();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| ScanError::ThreadPool(e.to_string()))?;

        let _scope = ProfileScope::new("scan_universe");
        let outcomes: BTreeMap<String, ScanOutcome> = pool.install(|| {
            symbols
                .par_iter()
                .map(|symbol| (symbol.clone(), self.scan_symbol(symbol, cancel)))
                .collect()
        });

        let scan = UniverseScan { outcomes };
        info!(symbols = symbols.len(), threads, tally = ?scan.tally(), "universe scan finished");
        Ok(scan)
    }

    /// One [`SymbolScan`] per configured symbol, in configuration order, on
    /// the calling thread.
    pub fn scan_sequential(&self, cancel: Option<&AtomicBool>) -> Vec<SymbolScan> {
        self.config
            .scan
            .symbols
            .iter()
            .map(|symbol| SymbolScan {
                symbol: symbol.clone(),
                outcome: self.scan_symbol(symbol, cancel),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::InMemoryProvider;
    use rust_decimal_macros::dec;
    use smclab_core::domain::{Candle, Timeframe};
    use smclab_core::MemoryAuditSink;

    fn flat(n: i64, step: i64) -> CandleSeries {
        CandleSeries::new(
            (0..n)
                .map(|i| Candle::new(i * step, dec!(10), dec!(11), dec!(9), dec!(10), dec!(100)))
                .collect(),
        )
        .unwrap()
    }

    fn scanner(provider: InMemoryProvider, symbols: &[&str]) -> (Scanner, Arc<MemoryAuditSink>) {
        let mut config = ScannerConfig::default();
        config.scan.symbols = symbols.iter().map(|s| s.to_string()).collect();
        config.scan.worker_threads = 2;
        let audit = Arc::new(MemoryAuditSink::new());
        let scanner = Scanner::new(Arc::new(config), Arc::new(provider), audit.clone());
        (scanner, audit)
    }

    #[test]
    fn missing_data_is_fetch_failed_and_audited() {
        let (scanner, audit) = scanner(InMemoryProvider::new(), &["BTCUSDT"]);
        let outcome = scanner.scan_symbol("BTCUSDT", None);
        assert!(matches!(outcome, ScanOutcome::FetchFailed { .. }));
        assert_eq!(audit.rejections().len(), 1);
    }

    #[test]
    fn flat_market_has_no_confluence() {
        let provider = InMemoryProvider::new()
            .with("BTCUSDT", Timeframe::H1, flat(100, 3_600_000))
            .with("BTCUSDT", Timeframe::H4, flat(100, 14_400_000));
        let (scanner, audit) = scanner(provider, &["BTCUSDT"]);
        assert_eq!(scanner.scan_symbol("BTCUSDT", None), ScanOutcome::NoConfluence);
        assert!(audit.is_empty());
    }

    #[test]
    fn preset_cancel_flag_cancels_every_symbol() {
        let (scanner, _audit) = scanner(InMemoryProvider::new(), &["A", "B", "C"]);
        let cancel = AtomicBool::new(true);
        let scan = scanner.scan_universe(Some(&cancel)).unwrap();
        assert_eq!(scan.outcomes.len(), 3);
        assert!(scan.outcomes.values().all(|o| *o == ScanOutcome::Cancelled));
    }

    #[test]
    fn empty_universe_is_an_error() {
        let (scanner, _audit) = scanner(InMemoryProvider::new(), &[]);
        assert!(matches!(scanner.scan_universe(None), Err(ScanError::NoSymbols)));
    }

    #[test]
    fn invalid_candles_are_skipped_with_rejection() {
        // high below low
        let bad = CandleSeries::new(vec![Candle::new(0, dec!(10), dec!(8), dec!(9), dec!(10), dec!(1))]).unwrap();
        let (scanner, audit) = scanner(InMemoryProvider::new(), &["X"]);
        let outcome = scanner.analyze_windows("X", &bad, &flat(10, 1), None);
        assert!(matches!(outcome, ScanOutcome::IntegrityFailed { ref issues } if issues.len() == 1));
        let rejections = audit.rejections();
        assert_eq!(rejections.len(), 1);
        assert_eq!(rejections[0].symbol(), "X");
    }
}
