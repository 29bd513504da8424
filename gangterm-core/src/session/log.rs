//! Operator-visible logs: the bounded connection log and the audit trail.

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Local};

/// Maximum number of lines kept in the connection log
pub const LOG_CAPACITY: usize = 100;

/// Maximum number of entries kept in the audit trail
pub const AUDIT_CAPACITY: usize = 50;

/// Severity of a connection log line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// One timestamped log line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub level: LogLevel,
    pub text: String,
}

impl LogEntry {
    pub fn new(level: LogLevel, text: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            level,
            text: text.into(),
        }
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.timestamp.format("%H:%M:%S"), self.text)
    }
}

/// Append-only log that keeps the most recent [`LOG_CAPACITY`] lines.
#[derive(Debug, Clone)]
pub struct LogBuffer {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::with_capacity(LOG_CAPACITY)
    }
}

impl LogBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a line, evicting the oldest one when full.
    pub(crate) fn push(&mut self, level: LogLevel, text: impl Into<String>) {
        let entry = LogEntry::new(level, text);
        match level {
            LogLevel::Info => tracing::info!(target: "gangterm::session", "{}", entry.text),
            LogLevel::Warn => tracing::warn!(target: "gangterm::session", "{}", entry.text),
            LogLevel::Error => tracing::error!(target: "gangterm::session", "{}", entry.text),
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Oldest first
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &LogEntry> + ExactSizeIterator {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&LogEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One audit record, e.g. a connect or disconnect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub timestamp: DateTime<Local>,
    pub event: String,
    pub details: String,
}

/// Newest-first audit trail of connection lifecycle events.
#[derive(Debug, Clone, Default)]
pub struct AuditLog {
    entries: VecDeque<AuditEntry>,
}

impl AuditLog {
    pub(crate) fn record(&mut self, event: impl Into<String>, details: impl Into<String>) {
        self.entries.push_front(AuditEntry {
            timestamp: Local::now(),
            event: event.into(),
            details: details.into(),
        });
        self.entries.truncate(AUDIT_CAPACITY);
    }

    /// Newest first
    pub fn iter(&self) -> impl Iterator<Item = &AuditEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_buffer_evicts_oldest() {
        let mut logs = LogBuffer::default();
        for i in 0..=LOG_CAPACITY {
            logs.push(LogLevel::Info, format!("line {}", i));
        }

        assert_eq!(logs.len(), LOG_CAPACITY);
        assert!(logs.iter().all(|entry| entry.text != "line 0"));
        assert_eq!(logs.iter().next().unwrap().text, "line 1");
        assert_eq!(logs.latest().unwrap().text, format!("line {}", LOG_CAPACITY));
    }

    #[test]
    fn test_log_entry_display_has_timestamp_prefix() {
        let entry = LogEntry::new(LogLevel::Warn, "careful");
        let rendered = entry.to_string();
        assert!(rendered.starts_with('['));
        assert!(rendered.ends_with("] careful"));
    }

    #[test]
    fn test_audit_log_is_newest_first_and_bounded() {
        let mut audit = AuditLog::default();
        for i in 0..AUDIT_CAPACITY + 5 {
            audit.record("event", format!("{}", i));
        }
        assert_eq!(audit.len(), AUDIT_CAPACITY);
        let newest = audit.iter().next().unwrap();
        assert_eq!(newest.details, format!("{}", AUDIT_CAPACITY + 4));
    }
}
