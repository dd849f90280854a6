//! SMCLab Core: candle domain, analytic engines, governance gates, trade setups, backtest.
//!
//! This crate contains the deterministic half of the scanner:
//! - Domain types (candles, series, structure, evidence, signals)
//! - Data integrity check and window hashing
//! - Structure (SMC), fair value gap, pattern, volume spike and regime engines
//! - Multi-timeframe confluence merge and weighted scoring
//! - Oracle validation gate and trade-setup builder with the risk gate
//! - Setup backtest simulator
//!
//! Everything here is synchronous and free of I/O; orchestration lives in
//! `smclab-runner`.

pub mod audit;
pub mod backtest;
pub mod confluence;
pub mod domain;
pub mod engines;
pub mod governance;
pub mod indicators;
pub mod integrity;
pub mod scoring;
pub mod setup;
pub mod synthetic;
pub mod validation;

pub use audit::{AuditRecord, AuditSink, MemoryAuditSink, TracingAuditSink};
pub use backtest::{BacktestOutcome, BacktestResult, BacktestSimulator, IntrabarPolicy};
pub use confluence::{ConfluenceInput, ConfluenceMerger};
pub use governance::GovernanceConfig;
pub use integrity::{DataIntegrityEngine, DataIntegrityReport};
pub use scoring::ScoringEngine;
pub use setup::{TradeSetup, TradeSetupBuilder};
pub use validation::{AiOracle, OracleError, RuleBasedOracle, ValidationGate};
