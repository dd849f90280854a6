//! Backtest summaries and exports: JSON summary, CSV trade tape, Markdown.
//!
//! Persisted JSON carries a `schema_version`; newer versions are rejected on load.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smclab_core::{BacktestOutcome, BacktestResult};

use crate::walk_forward::{SymbolBacktest, UniverseBacktest};

pub const SCHEMA_VERSION: u32 = 1;

// ─── Summary ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub hit_tp2: usize,
    pub hit_tp1: usize,
    pub hit_sl: usize,
    pub not_triggered: usize,
}

impl OutcomeCounts {
    pub fn record(&mut self, outcome: BacktestOutcome) {
        match outcome {
            BacktestOutcome::HitTp2 => self.hit_tp2 += 1,
            BacktestOutcome::HitTp1 => self.hit_tp1 += 1,
            BacktestOutcome::HitSl => self.hit_sl += 1,
            BacktestOutcome::NotTriggered => self.not_triggered += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.hit_tp2 + self.hit_tp1 + self.hit_sl + self.not_triggered
    }

    /// TP2 / (TP2 + SL); `None` before any trade resolved.
    pub fn win_rate(&self) -> Option<f64> {
        let resolved = self.hit_tp2 + self.hit_sl;
        (resolved > 0).then(|| self.hit_tp2 as f64 / resolved as f64)
    }

    fn merge(&mut self, other: &OutcomeCounts) {
        self.hit_tp2 += other.hit_tp2;
        self.hit_tp1 += other.hit_tp1;
        self.hit_sl += other.hit_sl;
        self.not_triggered += other.not_triggered;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSummary {
    pub schema_version: u32,
    pub generated_at: DateTime<Utc>,
    pub overall: OutcomeCounts,
    pub win_rate: Option<f64>,
    pub per_symbol: BTreeMap<String, OutcomeCounts>,
    pub skipped: BTreeMap<String, String>,
}

pub fn counts_for(report: &SymbolBacktest) -> OutcomeCounts {
    let mut counts = OutcomeCounts::default();
    for result in &report.results {
        counts.record(result.outcome);
    }
    counts.not_triggered += report.not_triggered;
    counts
}

pub fn summarize(universe: &UniverseBacktest) -> BacktestSummary {
    let mut overall = OutcomeCounts::default();
    let per_symbol: BTreeMap<String, OutcomeCounts> = universe
        .symbols
        .iter()
        .map(|(symbol, report)| {
            let counts = counts_for(report);
            overall.merge(&counts);
            (symbol.clone(), counts)
        })
        .collect();
    BacktestSummary {
        schema_version: SCHEMA_VERSION,
        generated_at: Utc::now(),
        win_rate: overall.win_rate(),
        overall,
        per_symbol,
        skipped: universe.skipped.clone(),
    }
}

// ─── JSON ───────────────────────────────────────────────────────────

pub fn export_summary_json(summary: &BacktestSummary) -> Result<String> {
    serde_json::to_string_pretty(summary).context("failed to serialize BacktestSummary to JSON")
}

pub fn import_summary_json(json: &str) -> Result<BacktestSummary> {
    let summary: BacktestSummary =
        serde_json::from_str(json).context("failed to deserialize BacktestSummary from JSON")?;
    if summary.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            summary.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(summary)
}

// ─── CSV ────────────────────────────────────────────────────────────

fn format_ts(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|t| t.to_rfc3339())
        .unwrap_or_default()
}

/// Trade tape, one row per simulated setup.
///
/// Columns: symbol, direction, outcome, entry, stop_loss, take_profit_1,
/// take_profit_2, risk_percentage, confidence_score, anchor_time,
/// entry_time, exit_time, entry_timestamp, exit_timestamp
pub fn export_trades_csv(results: &[BacktestResult]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "symbol",
        "direction",
        "outcome",
        "entry",
        "stop_loss",
        "take_profit_1",
        "take_profit_2",
        "risk_percentage",
        "confidence_score",
        "anchor_time",
        "entry_time",
        "exit_time",
        "entry_timestamp",
        "exit_timestamp",
    ])?;

    for r in results {
        let setup = &r.setup;
        let outcome = serde_json::to_value(r.outcome)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        let row: [String; 14] = [
            setup.symbol().to_string(),
            setup.direction().to_string(),
            outcome,
            setup.entry().to_string(),
            setup.stop_loss().to_string(),
            setup.take_profit_1().to_string(),
            setup.take_profit_2().to_string(),
            setup.risk_percentage().round_dp(4).to_string(),
            setup.signal().confidence_score().to_string(),
            format_ts(setup.signal().signal().anchor.timestamp()),
            format_ts(r.entry_timestamp),
            format_ts(r.exit_timestamp),
            r.entry_timestamp.to_string(),
            r.exit_timestamp.to_string(),
        ];
        wtr.write_record(&row)?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Markdown ───────────────────────────────────────────────────────

fn pct(v: Option<f64>) -> String {
    v.map(|r| format!("{:.1}%", r * 100.0))
        .unwrap_or_else(|| "n/a".to_string())
}

pub fn generate_report(summary: &BacktestSummary) -> String {
    let mut md = String::with_capacity(1024);
    md.push_str("# Walk-Forward Backtest\n\n");
    md.push_str(&format!("Generated {}\n\n", summary.generated_at.to_rfc3339()));

    md.push_str("| Symbol | TP2 | SL | Not triggered | Win rate |\n");
    md.push_str("| --- | ---: | ---: | ---: | ---: |\n");
    for (symbol, c) in &summary.per_symbol {
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            symbol,
            c.hit_tp2,
            c.hit_sl,
            c.not_triggered,
            pct(c.win_rate())
        ));
    }
    let o = &summary.overall;
    md.push_str(&format!(
        "| **All** | {} | {} | {} | {} |\n",
        o.hit_tp2,
        o.hit_sl,
        o.not_triggered,
        pct(summary.win_rate)
    ));

    if !summary.skipped.is_empty() {
        md.push_str("\n## Skipped\n\n");
        for (symbol, reason) in &summary.skipped {
            md.push_str(&format!("- {symbol}: {reason}\n"));
        }
    }
    md
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write `summary.json`, `trades.csv` and `report.md` into a fresh
/// `walk_forward_{timestamp}/` directory under `output_dir`.
pub fn save_artifacts(universe: &UniverseBacktest, output_dir: &Path) -> Result<PathBuf> {
    let summary = summarize(universe);
    let run_dir = output_dir.join(format!(
        "walk_forward_{}",
        summary.generated_at.format("%Y%m%d_%H%M%S")
    ));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("summary.json"), export_summary_json(&summary)?)?;
    let trades: Vec<BacktestResult> = universe.results().cloned().collect();
    std::fs::write(run_dir.join("trades.csv"), export_trades_csv(&trades)?)?;
    std::fs::write(run_dir.join("report.md"), generate_report(&summary))?;

    Ok(run_dir)
}

pub fn load_summary(dir: &Path) -> Result<BacktestSummary> {
    let path = dir.join("summary.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_summary_json(&json)
}
