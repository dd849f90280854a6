//! Walk-forward backtest: rebuild setups as history grows, replay each on the
//! candles that follow.
//!
//! For every window end `i` from `warmup` in `step` increments, the scanner runs
//! on the entry candles before `i` and on the structural candles already closed
//! at candle `i`'s open. A resulting setup is simulated on entry candles
//! `[i, end)`. Each order-block anchor is simulated once, from the first window
//! that produced it.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

use smclab_core::domain::CandleSeries;
use smclab_core::{BacktestOutcome, BacktestResult, BacktestSimulator};

use crate::config::WalkForwardConfig;
use crate::pipeline::{ScanError, ScanOutcome, Scanner};
use crate::profiling::ProfileScope;

// ─── Result types ────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolBacktest {
    pub symbol: String,
    /// Trades that reached TP2 or SL.
    pub results: Vec<BacktestResult>,
    /// Setups whose future never resolved.
    pub not_triggered: usize,
    /// Windows evaluated.
    pub windows: usize,
    pub cancelled: bool,
}

impl SymbolBacktest {
    pub fn setups_simulated(&self) -> usize {
        self.results.len() + self.not_triggered
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UniverseBacktest {
    pub symbols: BTreeMap<String, SymbolBacktest>,
    /// Symbols whose history could not be fetched, with the reason.
    pub skipped: BTreeMap<String, String>,
}

impl UniverseBacktest {
    pub fn results(&self) -> impl Iterator<Item = &BacktestResult> {
        self.symbols.values().flat_map(|s| s.results.iter())
    }
}

// ─── Window schedule ─────────────────────────────────────────────────

/// Window end indices `warmup, warmup + step, ...` below `total`.
pub fn window_ends(total: usize, warmup: usize, step: usize) -> Vec<usize> {
    if step == 0 || warmup >= total {
        return Vec::new();
    }
    (warmup..total).step_by(step).collect()
}

/// Structural candles fully closed at `cutoff`: `open + duration <= cutoff`.
fn closed_before(higher: &CandleSeries, cutoff: i64, duration_ms: i64) -> CandleSeries {
    higher.before(cutoff - duration_ms + 1)
}

// ─── Runner ──────────────────────────────────────────────────────────

pub struct WalkForward<'a> {
    scanner: &'a Scanner,
    settings: WalkForwardConfig,
    simulator: BacktestSimulator,
}

impl<'a> WalkForward<'a> {
    pub fn new(scanner: &'a Scanner) -> Self {
        let settings = scanner.config().backtest.clone();
        Self {
            scanner,
            simulator: BacktestSimulator::new(settings.intrabar_policy),
            settings,
        }
    }

    /// Walk one symbol's full histories.
    pub fn run_symbol(
        &self,
        symbol: &str,
        entry: &CandleSeries,
        higher: &CandleSeries,
        cancel: Option<&AtomicBool>,
    ) -> SymbolBacktest {
        let _scope = ProfileScope::for_symbol("walk_forward", symbol);
        let scan = &self.scanner.config().scan;
        let higher_ms = scan.structure_timeframe.millis();

        let mut report = SymbolBacktest {
            symbol: symbol.to_string(),
            ..Default::default()
        };
        let mut seen_anchors = BTreeSet::new();

        for end in window_ends(entry.len(), self.settings.warmup, self.settings.step) {
            if cancel.is_some_and(|f| f.load(Ordering::Relaxed)) {
                report.cancelled = true;
                break;
            }
            let Some(cutoff) = entry.get(end).map(|c| c.timestamp) else {
                break;
            };
            report.windows += 1;

            let entry_window = entry.slice(end.saturating_sub(scan.window), end);
            let higher_window = closed_before(higher, cutoff, higher_ms).tail(scan.window);

            let outcome = self
                .scanner
                .analyze_windows(symbol, &entry_window, &higher_window, cancel);
            let ScanOutcome::Setup(setup) = outcome else {
                continue;
            };
            let anchor = setup.signal().signal().anchor.timestamp();
            if !seen_anchors.insert(anchor) {
                continue;
            }

            let future = entry.slice(end, entry.len());
            let result = self.simulator.run(&setup, &future);
            debug!(symbol = %symbol, window_end = end, anchor, outcome = ?result.outcome, "setup replayed");
            match result.outcome {
                BacktestOutcome::NotTriggered => report.not_triggered += 1,
                _ => report.results.push(result),
            }
        }

        report
    }

    /// Every configured symbol, sharded over a bounded pool.
    ///
    /// Full histories are fetched from the scanner's provider.
    pub fn run_universe(&self, cancel: Option<&AtomicBool>) -> Result<UniverseBacktest, ScanError> {
        let scan = &self.scanner.config().scan;
        if scan.symbols.is_empty() {
            return Err(ScanError::NoSymbols);
        }
        let threads = scan.effective_threads();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| ScanError::ThreadPool(e.to_string()))?;

        let provider = self.scanner.provider();
        let per_symbol: Vec<(String, Result<SymbolBacktest, String>)> = pool.install(|| {
            scan.symbols
                .par_iter()
                .map(|symbol| {
                    let histories = provider
                        .fetch(symbol, scan.entry_timeframe, usize::MAX)
                        .and_then(|entry| {
                            let higher =
                                provider.fetch(symbol, scan.structure_timeframe, usize::MAX)?;
                            Ok((entry, higher))
                        });
                    let result = match histories {
                        Ok((entry, higher)) => Ok(self.run_symbol(symbol, &entry, &higher, cancel)),
                        Err(err) => {
                            warn!(symbol = %symbol, error = %err, "history unavailable, skipping symbol");
                            Err(err.to_string())
                        }
                    };
                    (symbol.clone(), result)
                })
                .collect()
        });

        let mut universe = UniverseBacktest::default();
        for (symbol, result) in per_symbol {
            match result {
                Ok(report) => {
                    universe.symbols.insert(symbol, report);
                }
                Err(reason) => {
                    universe.skipped.insert(symbol, reason);
                }
            }
        }
        info!(
            symbols = universe.symbols.len(),
            skipped = universe.skipped.len(),
            trades = universe.results().count(),
            "walk-forward finished"
        );
        Ok(universe)
    }
}
