//! End-to-end scans through `Scanner` with in-memory data.

mod common;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use rust_decimal_macros::dec;
use smclab_core::domain::{AiValidationResult, CandleSeries, Direction, ScoredSignal, StructuralAnchor};
use smclab_core::{AiOracle, AuditRecord, MemoryAuditSink, OracleError, RuleBasedOracle};
use smclab_runner::audit_log::read_entries;
use smclab_runner::{JsonlAuditSink, ScanOutcome, Scanner, ScannerConfig};

use common::{provider_with, sawtooth, HOUR_MS};

fn config(symbols: &[&str]) -> ScannerConfig {
    let mut config = ScannerConfig::default();
    config.scan.symbols = symbols.iter().map(|s| s.to_string()).collect();
    config.scan.worker_threads = 2;
    config
}

fn scanner(config: ScannerConfig) -> (Scanner, Arc<MemoryAuditSink>) {
    let audit = Arc::new(MemoryAuditSink::new());
    let provider = provider_with("BTCUSDT", sawtooth(250, 223));
    let scanner = Scanner::new(Arc::new(config), Arc::new(provider), audit.clone());
    (scanner, audit)
}

#[test]
fn sawtooth_uptrend_produces_bullish_setup() {
    let (scanner, audit) = scanner(config(&["BTCUSDT"]));
    let outcome = scanner.scan_symbol("BTCUSDT", None);

    let setup = outcome.setup().expect("setup");
    assert_eq!(setup.direction(), Direction::Bullish);
    assert_eq!(setup.signal().breakdown().structural_alignment, 100);
    assert!(matches!(
        setup.signal().signal().anchor,
        StructuralAnchor::OrderBlock(ob) if ob.timestamp == 223 * HOUR_MS
    ));
    assert_eq!(setup.entry(), dec!(213.7));
    assert!(setup.stop_loss() < setup.entry());
    assert!(setup.entry() < setup.take_profit_1());
    assert!(setup.take_profit_1() < setup.take_profit_2());
    assert_eq!(setup.risk_reward_label(), "1:2.0");

    let records = audit.records();
    assert_eq!(records.len(), 1);
    assert!(matches!(
        &records[0],
        AuditRecord::Evaluation { passed: true, confidence_score: 90, .. }
    ));
}

#[test]
fn threshold_above_score_stops_after_evaluation() {
    let mut cfg = config(&["BTCUSDT"]);
    cfg.governance.signal_score_threshold = 95;
    let (scanner, audit) = scanner(cfg);

    assert_eq!(
        scanner.scan_symbol("BTCUSDT", None),
        ScanOutcome::BelowThreshold { score: 90 }
    );
    assert!(matches!(
        &audit.records()[..],
        [AuditRecord::Evaluation { passed: false, .. }]
    ));
}

#[test]
fn tight_stop_cap_rejects_setup_with_reason() {
    let mut cfg = config(&["BTCUSDT"]);
    cfg.governance.max_stop_loss_percentage = dec!(1.0);
    let (scanner, audit) = scanner(cfg);

    assert_eq!(scanner.scan_symbol("BTCUSDT", None), ScanOutcome::NoSetup);
    let rejections = audit.rejections();
    assert_eq!(rejections.len(), 1);
    let AuditRecord::Rejection { reason, .. } = &rejections[0] else {
        panic!("expected rejection");
    };
    assert!(reason.contains("exceeds maximum 1.0%"), "{reason}");
}

#[test]
fn rule_based_oracle_admits_strong_signal() {
    let mut cfg = config(&["BTCUSDT"]);
    cfg.governance.ai_validation_enabled = true;
    let (scanner, _audit) = scanner(cfg);
    let scanner = scanner.with_oracle(Arc::new(RuleBasedOracle));

    assert!(scanner.scan_symbol("BTCUSDT", None).setup().is_some());
}

struct Skeptic;

impl AiOracle for Skeptic {
    fn name(&self) -> &str {
        "skeptic"
    }

    fn validate(
        &self,
        signal: &ScoredSignal,
        _series: &CandleSeries,
    ) -> Result<AiValidationResult, OracleError> {
        Ok(AiValidationResult {
            validated: false,
            ai_score: 10,
            signal: signal.clone(),
        })
    }
}

struct Offline;

impl AiOracle for Offline {
    fn name(&self) -> &str {
        "offline"
    }

    fn validate(
        &self,
        _signal: &ScoredSignal,
        _series: &CandleSeries,
    ) -> Result<AiValidationResult, OracleError> {
        Err(OracleError::Unavailable("connection refused".into()))
    }
}

#[test]
fn refusing_oracle_blocks_setup() {
    let mut cfg = config(&["BTCUSDT"]);
    cfg.governance.ai_validation_enabled = true;
    let (scanner, audit) = scanner(cfg);
    let scanner = scanner.with_oracle(Arc::new(Skeptic));

    assert_eq!(
        scanner.scan_symbol("BTCUSDT", None),
        ScanOutcome::NotValidated { ai_score: 10 }
    );
    assert_eq!(audit.rejections().len(), 1);
}

#[test]
fn disabled_oracle_is_never_consulted() {
    let (scanner, _audit) = scanner(config(&["BTCUSDT"]));
    let scanner = scanner.with_oracle(Arc::new(Skeptic));
    assert!(scanner.scan_symbol("BTCUSDT", None).setup().is_some());
}

#[test]
fn failing_oracle_passes_through() {
    let mut cfg = config(&["BTCUSDT"]);
    cfg.governance.ai_validation_enabled = true;
    let (scanner, _audit) = scanner(cfg);
    let scanner = scanner.with_oracle(Arc::new(Offline));
    assert!(scanner.scan_symbol("BTCUSDT", None).setup().is_some());
}

#[test]
fn disabled_volume_engine_drops_volume_evidence() {
    let mut cfg = config(&["BTCUSDT"]);
    cfg.governance.volume_spike_engine_enabled = false;
    let (scanner, _audit) = scanner(cfg);

    let outcome = scanner.scan_symbol("BTCUSDT", None);
    let setup = outcome.setup().expect("setup");
    let signal = setup.signal().signal();
    assert!(signal.volume.is_none());
    assert!(!signal.engine_versions.contains_key("volume_spike"));
}

#[test]
fn universe_scan_reports_every_symbol() {
    let (scanner, audit) = scanner(config(&["BTCUSDT", "ETHUSDT"]));
    let scan = scanner.scan_universe(None).unwrap();

    assert_eq!(scan.outcomes.len(), 2);
    assert!(scan.get("BTCUSDT").and_then(ScanOutcome::setup).is_some());
    assert!(matches!(scan.get("ETHUSDT"), Some(ScanOutcome::FetchFailed { .. })));
    assert_eq!(scan.setups().count(), 1);
    assert_eq!(scan.tally().get("fetch_failed"), Some(&1));
    assert_eq!(audit.rejections().len(), 1);
}

#[test]
fn cancelled_universe_scan_does_no_work() {
    let (scanner, audit) = scanner(config(&["BTCUSDT"]));
    let cancel = AtomicBool::new(true);
    let scan = scanner.scan_universe(Some(&cancel)).unwrap();
    assert_eq!(scan.get("BTCUSDT"), Some(&ScanOutcome::Cancelled));
    assert!(audit.is_empty());
}

#[test]
fn sequential_scan_keeps_configuration_order() {
    let (scanner, _audit) = scanner(config(&["ETHUSDT", "BTCUSDT"]));
    let scans = scanner.scan_sequential(None);
    let order: Vec<&str> = scans.iter().map(|s| s.symbol.as_str()).collect();
    assert_eq!(order, ["ETHUSDT", "BTCUSDT"]);
}

#[test]
fn jsonl_sink_records_the_evaluation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    let sink = Arc::new(JsonlAuditSink::open(&path).unwrap());

    let provider = provider_with("BTCUSDT", sawtooth(250, 223));
    let scanner = Scanner::new(Arc::new(config(&["BTCUSDT"])), Arc::new(provider), sink);
    assert!(scanner.scan_symbol("BTCUSDT", None).setup().is_some());

    let entries = read_entries(&path).unwrap();
    assert_eq!(entries.len(), 1);
    assert!(matches!(
        &entries[0].record,
        AuditRecord::Evaluation { symbol, passed: true, .. } if symbol == "BTCUSDT"
    ));
}
