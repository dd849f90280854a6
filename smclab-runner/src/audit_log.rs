//! Append-only JSON-lines audit sink.
//!
//! One line per record: `{"recorded_at": "...", "event": "evaluation", ...}`.
//! Write failures are logged and dropped; auditing never fails a scan.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smclab_core::domain::ScoredSignal;
use smclab_core::{AuditRecord, AuditSink};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub recorded_at: DateTime<Utc>,
    #[serde(flatten)]
    pub record: AuditRecord,
}

#[derive(Debug)]
pub struct JsonlAuditSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl JsonlAuditSink {
    /// Open `path` for appending, creating it if needed.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, record: AuditRecord) {
        let entry = AuditEntry {
            recorded_at: Utc::now(),
            record,
        };
        let line = match serde_json::to_string(&entry) {
            Ok(line) => line,
            Err(err) => {
                warn!(error = %err, "audit entry not serializable");
                return;
            }
        };
        let mut writer = self.writer.lock().unwrap_or_else(|p| p.into_inner());
        // Flush per line so a crash loses at most the record in flight.
        if let Err(err) = writeln!(writer, "{line}").and_then(|_| writer.flush()) {
            warn!(path = %self.path.display(), error = %err, "audit write failed");
        }
    }
}

impl AuditSink for JsonlAuditSink {
    fn log_evaluation(&self, signal: &ScoredSignal, passed: bool) {
        self.append(AuditRecord::evaluation(signal, passed));
    }

    fn log_rejection(&self, symbol: &str, reason: &str) {
        self.append(AuditRecord::rejection(symbol, reason));
    }
}

/// Read back every entry of an audit file. Blank lines are skipped.
pub fn read_entries(path: &Path) -> std::io::Result<Vec<AuditEntry>> {
    let reader = BufReader::new(File::open(path)?);
    let mut entries = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let entry = serde_json::from_str(&line)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        entries.push(entry);
    }
    Ok(entries)
}
