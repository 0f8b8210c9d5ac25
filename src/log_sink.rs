//! Log sink contract consumed by the pipeline.
//!
//! The core never renders anything itself; it hands colored, append-only log
//! lines to whichever sink the host embeds. The CLI forwards entries to
//! `tracing`, tests capture them in memory, and an embedding UI would feed its
//! own widget.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tracing::{error, info, warn};

/// Display color of a log line; doubles as its severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Routine progress.
    Black,
    /// Informational detail.
    Blue,
    /// A success.
    Green,
    /// A recoverable problem or a skip.
    Orange,
    /// A terminal failure.
    Red,
    /// Mode and pass markers.
    Purple,
}

/// One log line. Entries are append-only and ordered by emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub id: u64,
    pub message: String,
    pub severity: Severity,
}

/// Where the pipeline reports user-visible progress.
pub trait LogSink: Send + Sync {
    /// Record one line. Must not fail and must not block the caller.
    fn log(&self, message: &str, severity: Severity);
}

/// Sink that retains every entry, in emission order, with monotonic ids.
#[derive(Debug, Default)]
pub struct MemoryLog {
    next_id: AtomicU64,
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything logged so far.
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().expect("log mutex poisoned").clone()
    }

    /// Whether any entry's message contains `needle`.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.entries
            .lock()
            .expect("log mutex poisoned")
            .iter()
            .any(|entry| entry.message.contains(needle))
    }
}

impl LogSink for MemoryLog {
    fn log(&self, message: &str, severity: Severity) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries
            .lock()
            .expect("log mutex poisoned")
            .push(LogEntry {
                id,
                message: message.to_string(),
                severity,
            });
    }
}

/// Sink that forwards entries to `tracing` at a level matching the severity.
#[derive(Debug, Default)]
pub struct TracingLog;

impl LogSink for TracingLog {
    fn log(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Red => error!("{message}"),
            Severity::Orange => warn!("{message}"),
            Severity::Black | Severity::Blue | Severity::Green | Severity::Purple => {
                info!("{message}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_log_orders_entries() {
        let log = MemoryLog::new();
        log.log("first", Severity::Black);
        log.log("second", Severity::Green);
        log.log("third", Severity::Red);

        let entries = log.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].message, "first");
        assert_eq!(entries[2].severity, Severity::Red);
        assert!(entries.windows(2).all(|pair| pair[0].id < pair[1].id));
    }

    #[test]
    fn test_memory_log_contains() {
        let log = MemoryLog::new();
        log.log("Checking for .jpg...", Severity::Black);
        assert!(log.contains(".jpg"));
        assert!(!log.contains(".mp4"));
    }
}
