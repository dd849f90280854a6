//! SMCLab Runner: scan orchestration over a symbol universe.
//!
//! Wires market-data providers into the core engine chain, applies the
//! governance configuration, fans symbols out over a bounded worker pool,
//! writes the audit trail and replays setups in walk-forward backtests.

pub mod audit_log;
pub mod config;
pub mod pipeline;
pub mod profiling;
pub mod provider;
pub mod report;
pub mod walk_forward;

pub use audit_log::{AuditEntry, JsonlAuditSink};
pub use config::{ConfigError, ConfigHandle, ScannerConfig};
pub use pipeline::{ScanError, ScanOutcome, Scanner, SymbolScan, UniverseScan};
pub use provider::{CsvProvider, InMemoryProvider, MarketDataProvider, ProviderError};
pub use walk_forward::{SymbolBacktest, UniverseBacktest, WalkForward};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    /// Compile-time check: everything shared across the worker pool is
    /// Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<Scanner>();
        require_sync::<Scanner>();
        require_send::<ConfigHandle>();
        require_sync::<ConfigHandle>();
        require_send::<JsonlAuditSink>();
        require_sync::<JsonlAuditSink>();
        require_send::<InMemoryProvider>();
        require_sync::<InMemoryProvider>();
        require_send::<CsvProvider>();
        require_sync::<CsvProvider>();
        require_send::<ScanOutcome>();
        require_sync::<ScanOutcome>();
        require_send::<SymbolBacktest>();
        require_sync::<SymbolBacktest>();
    }
}
