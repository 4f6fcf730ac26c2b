//! Console log capture.
//!
//! The game under test emits console messages as its only observable
//! signal of internal state transitions ("Difficulty changed to: 2.0",
//! "Master is muted", ...). This module captures those messages into an
//! ordered, append-only buffer that tests slice by checkpoint so an
//! assertion only sees entries produced after a known point.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Console message level, as reported by the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsoleLevel {
    /// `console.log`
    Log,
    /// `console.info`
    Info,
    /// `console.warn`
    Warn,
    /// `console.error`
    Error,
    /// `console.debug`
    Debug,
    /// Any other CDP console API type (trace, dir, ...)
    Other,
}

impl ConsoleLevel {
    /// Map a CDP console API `type` string to a level.
    #[must_use]
    pub fn from_cdp(kind: &str) -> Self {
        match kind {
            "log" => Self::Log,
            "info" => Self::Info,
            "warning" | "warn" => Self::Warn,
            "error" => Self::Error,
            "debug" => Self::Debug,
            _ => Self::Other,
        }
    }

    /// Short name used in log dumps.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Info => "info",
            Self::Warn => "warning",
            Self::Error => "error",
            Self::Debug => "debug",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for ConsoleLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One observed console message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleEntry {
    /// Message level
    pub level: ConsoleLevel,
    /// Message text
    pub text: String,
}

impl ConsoleEntry {
    /// Create a new entry.
    #[must_use]
    pub fn new(level: ConsoleLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }

    /// Format as a dump line: `[level] text`.
    #[must_use]
    pub fn dump_line(&self) -> String {
        format!("[{}] {}", self.level, self.text)
    }
}

/// A position in the log buffer captured before an action.
///
/// Assertions scoped to a checkpoint never match entries produced
/// strictly before it, so residual logs from earlier actions cannot
/// produce false positives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogCheckpoint(pub(crate) usize);

impl LogCheckpoint {
    /// Index of the first entry in scope.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.0
    }
}

/// Ordered, append-only console log buffer.
///
/// The browser event task is the single writer; the test task reads.
/// Cloning yields another handle onto the same buffer.
#[derive(Debug, Clone, Default)]
pub struct LogBuffer {
    entries: Arc<Mutex<Vec<ConsoleEntry>>>,
}

impl LogBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry in arrival order.
    pub fn push(&self, entry: ConsoleEntry) {
        self.entries.lock().expect("log buffer lock").push(entry);
    }

    /// Number of entries observed so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().expect("log buffer lock").len()
    }

    /// True if nothing has been observed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Capture the current buffer length as a scope boundary.
    ///
    /// Call this immediately before driving an action, then assert
    /// against [`LogBuffer::since`] with the returned checkpoint.
    #[must_use]
    pub fn checkpoint(&self) -> LogCheckpoint {
        LogCheckpoint(self.len())
    }

    /// Entries produced at or after the checkpoint.
    #[must_use]
    pub fn since(&self, checkpoint: LogCheckpoint) -> Vec<ConsoleEntry> {
        let entries = self.entries.lock().expect("log buffer lock");
        entries.get(checkpoint.0..).unwrap_or_default().to_vec()
    }

    /// A copy of the full buffer.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ConsoleEntry> {
        self.entries.lock().expect("log buffer lock").clone()
    }

    /// All entries formatted as dump lines, for artifacts and error context.
    #[must_use]
    pub fn dump_lines(&self) -> Vec<String> {
        self.entries
            .lock()
            .expect("log buffer lock")
            .iter()
            .map(ConsoleEntry::dump_line)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_preserve_arrival_order() {
        let buffer = LogBuffer::new();
        buffer.push(ConsoleEntry::new(ConsoleLevel::Log, "first"));
        buffer.push(ConsoleEntry::new(ConsoleLevel::Warn, "second"));
        buffer.push(ConsoleEntry::new(ConsoleLevel::Log, "third"));

        let all = buffer.snapshot();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].text, "first");
        assert_eq!(all[2].text, "third");
    }

    #[test]
    fn checkpoint_scopes_out_earlier_entries() {
        let buffer = LogBuffer::new();
        buffer.push(ConsoleEntry::new(ConsoleLevel::Log, "stale"));

        let cp = buffer.checkpoint();
        buffer.push(ConsoleEntry::new(ConsoleLevel::Log, "fresh"));

        let scoped = buffer.since(cp);
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].text, "fresh");
    }

    #[test]
    fn checkpoint_past_end_yields_empty_slice() {
        let buffer = LogBuffer::new();
        buffer.push(ConsoleEntry::new(ConsoleLevel::Log, "only"));
        let cp = LogCheckpoint(10);
        assert!(buffer.since(cp).is_empty());
    }

    #[test]
    fn clones_share_the_same_buffer() {
        let writer = LogBuffer::new();
        let reader = writer.clone();
        writer.push(ConsoleEntry::new(ConsoleLevel::Info, "shared"));
        assert_eq!(reader.len(), 1);
    }

    #[test]
    fn cdp_level_mapping() {
        assert_eq!(ConsoleLevel::from_cdp("warning"), ConsoleLevel::Warn);
        assert_eq!(ConsoleLevel::from_cdp("log"), ConsoleLevel::Log);
        assert_eq!(ConsoleLevel::from_cdp("table"), ConsoleLevel::Other);
    }

    #[test]
    fn dump_line_format() {
        let entry = ConsoleEntry::new(ConsoleLevel::Error, "boom");
        assert_eq!(entry.dump_line(), "[error] boom");
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // Entries before the checkpoint are never in scope, entries
            // after always are, regardless of where the cut falls.
            #[test]
            fn checkpoint_scoping_holds_for_any_split(
                before in 0usize..50,
                after in 0usize..50,
            ) {
                let buffer = LogBuffer::new();
                for i in 0..before {
                    buffer.push(ConsoleEntry::new(ConsoleLevel::Log, format!("old {i}")));
                }
                let cp = buffer.checkpoint();
                for i in 0..after {
                    buffer.push(ConsoleEntry::new(ConsoleLevel::Log, format!("new {i}")));
                }

                let scoped = buffer.since(cp);
                prop_assert_eq!(scoped.len(), after);
                prop_assert!(scoped.iter().all(|e| e.text.starts_with("new")));
                prop_assert_eq!(buffer.len(), before + after);
            }
        }
    }

    #[test]
    fn append_from_another_thread_is_visible() {
        let buffer = LogBuffer::new();
        let writer = buffer.clone();
        let handle = std::thread::spawn(move || {
            for i in 0..100 {
                writer.push(ConsoleEntry::new(ConsoleLevel::Log, format!("msg {i}")));
            }
        });
        handle.join().expect("writer thread");
        assert_eq!(buffer.len(), 100);
        assert_eq!(buffer.snapshot()[99].text, "msg 99");
    }
}
