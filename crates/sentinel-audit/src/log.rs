//! Append-only audit log.
//!
//! One record per command, written at the moment its final action is
//! determined. Records are write-once; nothing in this module mutates or
//! deletes an existing record. The default sink is a line-oriented JSONL
//! file so operators can tail and grep it.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::error;

use sentinel_core::{AuditDecision, Command, NormalizedCommand, Timestamp};

/// A single terminal audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    /// When the final action was determined.
    pub timestamp: Timestamp,
    /// The raw command as submitted.
    pub command: String,
    /// The normalized form the rules matched against.
    pub normalized: String,
    /// The terminal decision.
    pub decision: AuditDecision,
}

impl AuditLogEntry {
    /// Build a record for a command and its terminal decision.
    #[must_use]
    pub fn new(command: &Command, normalized: &NormalizedCommand, decision: AuditDecision) -> Self {
        Self {
            timestamp: Timestamp::now(),
            command: command.as_str().to_string(),
            normalized: normalized.text().to_string(),
            decision,
        }
    }
}

/// Destination for audit records.
pub trait AuditSink: Send + Sync {
    /// Append one record.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the record could not be persisted.
    fn append(&self, entry: &AuditLogEntry) -> std::io::Result<()>;
}

/// JSONL file sink, one record per line, append-only.
#[derive(Debug)]
pub struct JsonlAuditSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlAuditSink {
    /// Open (or create) the log file at `path` for appending.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// The log file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for JsonlAuditSink {
    fn append(&self, entry: &AuditLogEntry) -> std::io::Result<()> {
        let line = serde_json::to_string(entry)?;
        let mut file = self.file.lock().unwrap_or_else(|e| {
            tracing::warn!("audit sink lock poisoned, recovering");
            e.into_inner()
        });
        writeln!(file, "{line}")?;
        file.flush()
    }
}

/// In-memory sink for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<AuditLogEntry>>,
}

impl MemoryAuditSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded entries.
    #[must_use]
    pub fn entries(&self) -> Vec<AuditLogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl AuditSink for MemoryAuditSink {
    fn append(&self, entry: &AuditLogEntry) -> std::io::Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(entry.clone());
        Ok(())
    }
}

/// Shared handle to the audit log.
///
/// Recording never propagates sink failures into the audit pipeline; a
/// failed write is reported through tracing and the decision stands.
#[derive(Clone)]
pub struct AuditLog {
    sink: Arc<dyn AuditSink>,
}

impl AuditLog {
    /// Wrap a sink.
    #[must_use]
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    /// Record a terminal decision.
    pub fn record(&self, entry: &AuditLogEntry) {
        if let Err(e) = self.sink.append(entry) {
            error!(error = %e, command = %entry.command, "failed to append audit record");
        }
    }
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize;
    use sentinel_core::DecisionSource;
    use std::io::BufRead;

    fn entry(command: &str, allowed: bool) -> AuditLogEntry {
        let cmd = Command::new(command);
        let normalized = normalize(command);
        let decision = if allowed {
            AuditDecision::allow("fine", sentinel_core::RiskScore::MIN, DecisionSource::Semantic)
        } else {
            AuditDecision::reject("blocked token: sudo", DecisionSource::Deterministic)
        };
        AuditLogEntry::new(&cmd, &normalized, decision)
    }

    #[test]
    fn jsonl_sink_appends_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let sink = JsonlAuditSink::open(&path).unwrap();

        sink.append(&entry("ls -la", true)).unwrap();
        sink.append(&entry("sudo ls", false)).unwrap();

        let file = File::open(&path).unwrap();
        let lines: Vec<String> = std::io::BufReader::new(file)
            .lines()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(lines.len(), 2);

        let first: AuditLogEntry = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(first.command, "ls -la");
        assert!(first.decision.allowed);

        let second: AuditLogEntry = serde_json::from_str(&lines[1]).unwrap();
        assert!(!second.decision.allowed);
        assert_eq!(second.decision.source, DecisionSource::Deterministic);
    }

    #[test]
    fn reopening_appends_rather_than_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        JsonlAuditSink::open(&path)
            .unwrap()
            .append(&entry("ls", true))
            .unwrap();
        JsonlAuditSink::open(&path)
            .unwrap()
            .append(&entry("pwd", true))
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn memory_sink_records_in_order() {
        let sink = Arc::new(MemoryAuditSink::new());
        let log = AuditLog::new(Arc::clone(&sink) as Arc<dyn AuditSink>);
        log.record(&entry("a", true));
        log.record(&entry("b", false));
        let entries = sink.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].command, "a");
        assert!(!entries[1].decision.allowed);
    }
}
