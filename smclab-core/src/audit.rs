//! Audit trail contract. Every gate reports here; sinks never fail the caller.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::info;

use crate::domain::{IntegrityHash, ScoredSignal};

pub trait AuditSink: Send + Sync {
    /// Every scored signal, whether it passed the score threshold or not.
    fn log_evaluation(&self, signal: &ScoredSignal, passed: bool);

    /// A gate refused a symbol or setup.
    fn log_rejection(&self, symbol: &str, reason: &str);
}

/// One audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditRecord {
    Evaluation {
        symbol: String,
        confidence_score: u32,
        passed: bool,
        integrity_hash: IntegrityHash,
    },
    Rejection {
        symbol: String,
        reason: String,
    },
}

impl AuditRecord {
    pub fn evaluation(signal: &ScoredSignal, passed: bool) -> Self {
        AuditRecord::Evaluation {
            symbol: signal.symbol().to_string(),
            confidence_score: signal.confidence_score(),
            passed,
            integrity_hash: signal.signal().integrity_hash.clone(),
        }
    }

    pub fn rejection(symbol: &str, reason: &str) -> Self {
        AuditRecord::Rejection {
            symbol: symbol.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            AuditRecord::Evaluation { symbol, .. } | AuditRecord::Rejection { symbol, .. } => symbol,
        }
    }
}

/// Emits audit entries as structured `tracing` events on the `audit` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn log_evaluation(&self, signal: &ScoredSignal, passed: bool) {
        info!(
            target: "audit",
            symbol = %signal.symbol(),
            score = signal.confidence_score(),
            passed,
            integrity_hash = %signal.signal().integrity_hash,
            "signal evaluated"
        );
    }

    fn log_rejection(&self, symbol: &str, reason: &str) {
        info!(target: "audit", symbol = %symbol, reason = %reason, "rejected");
    }
}

/// Keeps records in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.lock().clone()
    }

    pub fn rejections(&self) -> Vec<AuditRecord> {
        self.lock()
            .iter()
            .filter(|r| matches!(r, AuditRecord::Rejection { .. }))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<AuditRecord>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push(&self, record: AuditRecord) {
        self.lock().push(record);
    }
}

impl AuditSink for MemoryAuditSink {
    fn log_evaluation(&self, signal: &ScoredSignal, passed: bool) {
        self.push(AuditRecord::evaluation(signal, passed));
    }

    fn log_rejection(&self, symbol: &str, reason: &str) {
        self.push(AuditRecord::rejection(symbol, reason));
    }
}
