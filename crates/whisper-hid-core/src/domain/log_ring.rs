//! Bounded in-memory log buffer.
//!
//! The relay keeps the most recent log lines in memory so the speech-to-text
//! process and the shell can show them without reading files.  Pushing is a
//! memory append under a short lock; when the ring is full the oldest entry is
//! evicted.  Readers get a snapshot copy, never a live view.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Default number of entries retained.
pub const DEFAULT_CAPACITY: usize = 200;

/// Severity of a ring entry.  Serialized in lower case (`"info"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// One line of the `/logs` response: `{"ts": <unix secs>, "level", "msg"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub ts: u64,
    pub level: LogLevel,
    pub msg: String,
}

impl LogEntry {
    /// Creates an entry stamped with the current wall-clock time.
    pub fn now(level: LogLevel, msg: impl Into<String>) -> Self {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self {
            ts,
            level,
            msg: msg.into(),
        }
    }
}

/// Thread-safe FIFO of [`LogEntry`] with a fixed capacity.
#[derive(Debug)]
pub struct LogRing {
    capacity: usize,
    entries: Mutex<VecDeque<LogEntry>>,
}

impl Default for LogRing {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl LogRing {
    /// Creates an empty ring.  A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Appends a message stamped now.
    pub fn push(&self, level: LogLevel, msg: impl Into<String>) {
        self.push_entry(LogEntry::now(level, msg));
    }

    /// Appends an entry, evicting the oldest one when full.
    pub fn push_entry(&self, entry: LogEntry) {
        // A panic while holding the lock cannot leave the deque half-updated,
        // so a poisoned lock is still safe to use.
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Copies out all entries, oldest first.
    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_new_ring_is_empty() {
        let ring = LogRing::default();
        assert!(ring.is_empty());
        assert_eq!(ring.capacity(), 200);
    }

    #[test]
    fn test_snapshot_is_oldest_first() {
        // Arrange
        let ring = LogRing::new(10);

        // Act
        ring.push(LogLevel::Info, "first");
        ring.push(LogLevel::Warn, "second");
        ring.push(LogLevel::Error, "third");

        // Assert
        let msgs: Vec<_> = ring.snapshot().into_iter().map(|e| e.msg).collect();
        assert_eq!(msgs, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_full_ring_evicts_oldest() {
        let ring = LogRing::new(200);
        for i in 0..250 {
            ring.push(LogLevel::Info, format!("line {i}"));
        }

        let snapshot = ring.snapshot();
        assert_eq!(snapshot.len(), 200);
        assert_eq!(snapshot[0].msg, "line 50");
        assert_eq!(snapshot[199].msg, "line 249");
    }

    #[test]
    fn test_zero_capacity_keeps_latest_entry() {
        let ring = LogRing::new(0);
        ring.push(LogLevel::Info, "a");
        ring.push(LogLevel::Info, "b");
        assert_eq!(ring.len(), 1);
        assert_eq!(ring.snapshot()[0].msg, "b");
    }

    #[test]
    fn test_snapshot_is_detached_from_later_pushes() {
        let ring = LogRing::new(5);
        ring.push(LogLevel::Info, "before");
        let snapshot = ring.snapshot();
        ring.push(LogLevel::Info, "after");
        assert_eq!(snapshot.len(), 1);
        assert_eq!(ring.len(), 2);
    }

    #[test]
    fn test_entry_serializes_with_lowercase_level() {
        let entry = LogEntry {
            ts: 1_700_000_000,
            level: LogLevel::Warn,
            msg: "host dropped".into(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"ts": 1_700_000_000u64, "level": "warn", "msg": "host dropped"})
        );
    }

    #[test]
    fn test_concurrent_pushes_respect_capacity() {
        let ring = Arc::new(LogRing::new(50));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let ring = Arc::clone(&ring);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        ring.push(LogLevel::Info, format!("{t}-{i}"));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(ring.len(), 50);
    }
}
