//! Fitness Audit Logging
//!
//! Append-only, tamper-evident record of changes to externally observed
//! worker fitness values:
//! - Every entry carries a BLAKE3 hash over its own serialized fields
//! - Every entry links to the hash of the entry before it
//! - Writes are queued to a single background writer so a slow sink never
//!   stalls the caller

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::AuditError;

/// Hash of the (virtual) entry preceding the first one
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// An observed fitness change, before it is sequenced into the log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitnessChange {
    /// Timestamp (Unix millis)
    pub timestamp: i64,
    pub worker_id: String,
    pub old_value: f64,
    pub new_value: f64,
    /// Who observed the change (e.g. "optimizer", "reviewer")
    pub source_tag: String,
    pub task_id: Option<String>,
}

impl FitnessChange {
    pub fn new(worker_id: &str, old_value: f64, new_value: f64, source_tag: &str) -> Self {
        Self {
            timestamp: chrono::Utc::now().timestamp_millis(),
            worker_id: worker_id.to_string(),
            old_value,
            new_value,
            source_tag: source_tag.to_string(),
            task_id: None,
        }
    }

    /// Set task ID
    pub fn with_task(mut self, task_id: &str) -> Self {
        self.task_id = Some(task_id.to_string());
        self
    }

    /// Override timestamp
    pub fn at(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Sequenced, hashed audit entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitnessAuditEntry {
    /// Unique entry ID
    pub entry_id: String,
    /// Position in the log, starting at 0
    pub sequence: u64,
    pub timestamp: i64,
    pub worker_id: String,
    pub old_value: f64,
    pub new_value: f64,
    pub source_tag: String,
    pub task_id: Option<String>,
    /// Hash of the previous entry, [`GENESIS_HASH`] for the first
    pub prev_hash: String,
    /// Hex BLAKE3 over every other field
    pub hash: String,
}

/// Field view that feeds the content hash. Field order is part of the format.
/// Fitness values are hashed by their bit pattern, not their decimal text.
#[derive(Serialize)]
struct HashedFields<'a> {
    entry_id: &'a str,
    sequence: u64,
    timestamp: i64,
    worker_id: &'a str,
    old_value: u64,
    new_value: u64,
    source_tag: &'a str,
    task_id: Option<&'a str>,
    prev_hash: &'a str,
}

impl FitnessAuditEntry {
    fn seal(change: FitnessChange, sequence: u64, prev_hash: &str) -> Result<Self, AuditError> {
        let mut entry = Self {
            entry_id: uuid::Uuid::now_v7().to_string(),
            sequence,
            timestamp: change.timestamp,
            worker_id: change.worker_id,
            old_value: change.old_value,
            new_value: change.new_value,
            source_tag: change.source_tag,
            task_id: change.task_id,
            prev_hash: prev_hash.to_string(),
            hash: String::new(),
        };
        entry.hash = entry.compute_hash()?;
        Ok(entry)
    }

    /// Recompute the content hash from the current field values
    pub fn compute_hash(&self) -> Result<String, AuditError> {
        let fields = HashedFields {
            entry_id: &self.entry_id,
            sequence: self.sequence,
            timestamp: self.timestamp,
            worker_id: &self.worker_id,
            old_value: self.old_value.to_bits(),
            new_value: self.new_value.to_bits(),
            source_tag: &self.source_tag,
            task_id: self.task_id.as_deref(),
            prev_hash: &self.prev_hash,
        };
        let bytes =
            serde_json::to_vec(&fields).map_err(|e| AuditError::Serialization(e.to_string()))?;
        Ok(hex::encode(blake3::hash(&bytes).as_bytes()))
    }

    /// Check this entry in isolation
    pub fn verify(&self) -> Result<(), AuditError> {
        let actual = self.compute_hash()?;
        if actual != self.hash {
            return Err(AuditError::HashMismatch {
                sequence: self.sequence,
                expected: self.hash.clone(),
                actual,
            });
        }
        Ok(())
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> Result<String, AuditError> {
        serde_json::to_string(self).map_err(|e| AuditError::Serialization(e.to_string()))
    }
}

/// Append-only, hash-chained fitness log
pub struct AuditLog {
    entries: RwLock<Vec<FitnessAuditEntry>>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Sequence, hash, and append a change. Appends are serialized.
    pub fn append(&self, change: FitnessChange) -> Result<FitnessAuditEntry, AuditError> {
        let mut entries = self.entries.write();
        let sequence = entries.len() as u64;
        let prev_hash = entries
            .last()
            .map(|e| e.hash.as_str())
            .unwrap_or(GENESIS_HASH);
        let entry = FitnessAuditEntry::seal(change, sequence, prev_hash)?;
        entries.push(entry.clone());
        Ok(entry)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Snapshot of all entries
    pub fn entries(&self) -> Vec<FitnessAuditEntry> {
        self.entries.read().clone()
    }

    /// Entries recorded for one worker
    pub fn entries_for(&self, worker_id: &str) -> Vec<FitnessAuditEntry> {
        self.entries
            .read()
            .iter()
            .filter(|e| e.worker_id == worker_id)
            .cloned()
            .collect()
    }

    /// Verify every entry hash and the links between them
    pub fn verify_chain(&self) -> Result<(), AuditError> {
        verify_entries(&self.entries.read())
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Verify a sequence of entries, e.g. one read back from a sink
pub fn verify_entries(entries: &[FitnessAuditEntry]) -> Result<(), AuditError> {
    let mut prev = GENESIS_HASH;
    for (i, entry) in entries.iter().enumerate() {
        if entry.sequence != i as u64 || entry.prev_hash != prev {
            return Err(AuditError::BrokenChain {
                sequence: entry.sequence,
            });
        }
        entry.verify()?;
        prev = &entry.hash;
    }
    Ok(())
}

/// Audit log sink
pub trait AuditSink: Send + Sync {
    /// Write an audit entry
    fn write(&self, entry: &FitnessAuditEntry) -> Result<(), AuditError>;

    /// Flush pending entries
    fn flush(&self) -> Result<(), AuditError>;
}

/// Console audit sink (for development)
pub struct ConsoleAuditSink;

impl AuditSink for ConsoleAuditSink {
    fn write(&self, entry: &FitnessAuditEntry) -> Result<(), AuditError> {
        info!(
            sequence = entry.sequence,
            worker = %entry.worker_id,
            old = entry.old_value,
            new = entry.new_value,
            source = %entry.source_tag,
            task = entry.task_id.as_deref().unwrap_or("-"),
            "fitness changed"
        );
        Ok(())
    }

    fn flush(&self) -> Result<(), AuditError> {
        // Console logging is immediate
        Ok(())
    }
}

/// In-memory sink, mostly for tests and embedding
#[derive(Default)]
pub struct MemoryAuditSink {
    entries: RwLock<Vec<FitnessAuditEntry>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<FitnessAuditEntry> {
        self.entries.read().clone()
    }
}

impl AuditSink for MemoryAuditSink {
    fn write(&self, entry: &FitnessAuditEntry) -> Result<(), AuditError> {
        self.entries.write().push(entry.clone());
        Ok(())
    }

    fn flush(&self) -> Result<(), AuditError> {
        Ok(())
    }
}

impl AuditSink for Arc<MemoryAuditSink> {
    fn write(&self, entry: &FitnessAuditEntry) -> Result<(), AuditError> {
        (**self).write(entry)
    }

    fn flush(&self) -> Result<(), AuditError> {
        (**self).flush()
    }
}

/// File sink writing one JSON object per line
pub struct JsonLinesAuditSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl JsonLinesAuditSink {
    /// Open (or create) `path` for appending
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
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

    /// Read every entry back from a JSON-lines file
    pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<FitnessAuditEntry>, AuditError> {
        let content = std::fs::read_to_string(path)?;
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line).map_err(|e| AuditError::Serialization(e.to_string()))
            })
            .collect()
    }
}

impl AuditSink for JsonLinesAuditSink {
    fn write(&self, entry: &FitnessAuditEntry) -> Result<(), AuditError> {
        let line = entry.to_json()?;
        let mut writer = self.writer.lock();
        writeln!(writer, "{}", line)?;
        Ok(())
    }

    fn flush(&self) -> Result<(), AuditError> {
        debug!(path = %self.path.display(), "Flushing audit file");
        self.writer.lock().flush()?;
        Ok(())
    }
}

/// Non-blocking handle for recording fitness changes.
///
/// Cloneable; every clone feeds the same single writer.
#[derive(Clone)]
pub struct AuditHandle {
    tx: mpsc::UnboundedSender<FitnessChange>,
    failures: Arc<AtomicU64>,
}

impl AuditHandle {
    /// Queue a change. Never blocks and never fails the caller.
    pub fn record(&self, change: FitnessChange) {
        if let Err(err) = self.tx.send(change) {
            self.failures.fetch_add(1, Ordering::Relaxed);
            warn!(worker = %err.0.worker_id, "Audit writer is gone, dropping fitness change");
        }
    }

    /// Number of changes that failed to reach the log or a sink so far
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

/// Background single-writer feeding an [`AuditLog`] and its sinks
pub struct AuditRecorder;

impl AuditRecorder {
    /// Spawn the writer on the current tokio runtime.
    ///
    /// The writer exits once every [`AuditHandle`] has been dropped, after
    /// flushing all sinks.
    pub fn spawn(log: Arc<AuditLog>, sinks: Vec<Box<dyn AuditSink>>) -> (AuditHandle, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<FitnessChange>();
        let failures = Arc::new(AtomicU64::new(0));
        let writer_failures = Arc::clone(&failures);

        let join = tokio::task::spawn_blocking(move || {
            while let Some(change) = rx.blocking_recv() {
                let entry = match log.append(change) {
                    Ok(entry) => entry,
                    Err(err) => {
                        writer_failures.fetch_add(1, Ordering::Relaxed);
                        error!(error = %err, "Failed to append fitness audit entry");
                        continue;
                    }
                };
                for sink in &sinks {
                    if let Err(err) = sink.write(&entry) {
                        writer_failures.fetch_add(1, Ordering::Relaxed);
                        error!(sequence = entry.sequence, error = %err, "Audit sink write failed");
                    }
                }
            }
            for sink in &sinks {
                if let Err(err) = sink.flush() {
                    writer_failures.fetch_add(1, Ordering::Relaxed);
                    error!(error = %err, "Audit sink flush failed");
                }
            }
            debug!(entries = log.len(), "Audit writer stopped");
        });

        (AuditHandle { tx, failures }, join)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingSink;

    impl AuditSink for FailingSink {
        fn write(&self, _entry: &FitnessAuditEntry) -> Result<(), AuditError> {
            Err(AuditError::SinkWrite("disk full".to_string()))
        }

        fn flush(&self) -> Result<(), AuditError> {
            Ok(())
        }
    }

    fn change(worker: &str, old: f64, new: f64) -> FitnessChange {
        FitnessChange::new(worker, old, new, "test").with_task("t-1").at(1_700_000_000_000)
    }

    #[test]
    fn test_append_chains_entries() {
        let log = AuditLog::new();
        let first = log.append(change("ada", 0.5, 0.6)).unwrap();
        let second = log.append(change("ada", 0.6, 0.7)).unwrap();

        assert_eq!(first.sequence, 0);
        assert_eq!(first.prev_hash, GENESIS_HASH);
        assert_eq!(second.prev_hash, first.hash);
        assert_eq!(first.hash.len(), 64);
        assert!(log.verify_chain().is_ok());
    }

    #[test]
    fn test_tampered_entry_detected() {
        let log = AuditLog::new();
        let mut entry = log.append(change("ada", 0.5, 0.6)).unwrap();
        assert!(entry.verify().is_ok());

        entry.new_value = 0.99;
        assert!(matches!(entry.verify(), Err(AuditError::HashMismatch { .. })));
    }

    #[test]
    fn test_reordered_entries_break_chain() {
        let log = AuditLog::new();
        log.append(change("ada", 0.5, 0.6)).unwrap();
        log.append(change("grace", 0.4, 0.3)).unwrap();

        let mut entries = log.entries();
        entries.swap(0, 1);
        assert!(matches!(
            verify_entries(&entries),
            Err(AuditError::BrokenChain { .. })
        ));
    }

    #[test]
    fn test_entries_for_worker() {
        let log = AuditLog::new();
        log.append(change("ada", 0.5, 0.6)).unwrap();
        log.append(change("grace", 0.4, 0.3)).unwrap();
        assert_eq!(log.entries_for("grace").len(), 1);
    }

    #[test]
    fn test_json_lines_sink_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let sink = JsonLinesAuditSink::open(&path).unwrap();

        let log = AuditLog::new();
        for i in 0..3 {
            let entry = log.append(change("ada", i as f64 / 10.0, (i + 1) as f64 / 10.0)).unwrap();
            sink.write(&entry).unwrap();
        }
        sink.flush().unwrap();

        let read_back = JsonLinesAuditSink::read_all(&path).unwrap();
        assert_eq!(read_back.len(), 3);
        assert!(verify_entries(&read_back).is_ok());
    }

    #[test]
    fn test_computed_values_survive_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let sink = JsonLinesAuditSink::open(&path).unwrap();

        let log = AuditLog::new();
        for (old, new) in [(0.1 + 0.2, 0.9719863718547628), (0.011935154727148343, 1.0 / 3.0)] {
            sink.write(&log.append(change("ada", old, new)).unwrap()).unwrap();
        }
        sink.flush().unwrap();

        let read_back = JsonLinesAuditSink::read_all(&path).unwrap();
        assert_eq!(read_back, log.entries());
        assert!(verify_entries(&read_back).is_ok());
    }

    proptest::proptest! {
        #![proptest_config(proptest::prelude::ProptestConfig::with_cases(32))]

        #[test]
        fn prop_file_roundtrip_verifies(
            values in proptest::collection::vec((0.0f64..=1.0, 0.0f64..=1.0), 1..40)
        ) {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("audit.jsonl");
            let sink = JsonLinesAuditSink::open(&path).unwrap();

            let log = AuditLog::new();
            for (old, new) in values {
                sink.write(&log.append(change("ada", old, new)).unwrap()).unwrap();
            }
            sink.flush().unwrap();

            let read_back = JsonLinesAuditSink::read_all(&path).unwrap();
            proptest::prop_assert!(verify_entries(&read_back).is_ok());
            proptest::prop_assert_eq!(read_back, log.entries());
        }
    }

    #[tokio::test]
    async fn test_recorder_writes_to_sinks() {
        let log = Arc::new(AuditLog::new());
        let memory = Arc::new(MemoryAuditSink::new());
        let (handle, join) = AuditRecorder::spawn(
            Arc::clone(&log),
            vec![Box::new(Arc::clone(&memory)), Box::new(ConsoleAuditSink)],
        );

        handle.record(change("ada", 0.5, 0.6));
        handle.record(change("ada", 0.6, 0.8));
        drop(handle);
        join.await.unwrap();

        assert_eq!(log.len(), 2);
        assert_eq!(memory.entries().len(), 2);
        assert!(log.verify_chain().is_ok());
    }

    #[tokio::test]
    async fn test_sink_failure_is_contained() {
        let log = Arc::new(AuditLog::new());
        let (handle, join) = AuditRecorder::spawn(Arc::clone(&log), vec![Box::new(FailingSink)]);

        handle.record(change("ada", 0.5, 0.6));
        let failures = Arc::clone(&handle.failures);
        drop(handle);
        join.await.unwrap();

        assert_eq!(log.len(), 1);
        assert_eq!(failures.load(Ordering::Relaxed), 1);
    }
}
