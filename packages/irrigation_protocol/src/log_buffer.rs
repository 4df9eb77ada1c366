//! Bounded log of panel messages.
//!
//! Keeps the most recent entries only; pushing past capacity evicts the
//! oldest. Nothing is persisted.

use std::collections::VecDeque;

use chrono::{DateTime, Local};

use crate::severity::Severity;

/// Number of entries the panel keeps
pub const DEFAULT_LOG_CAPACITY: usize = 100;

/// A single timestamped log line
#[derive(Clone, Debug, PartialEq)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub severity: Severity,
    pub message: String,
}

impl LogEntry {
    /// `[HH:MM:SS] message`
    pub fn format_line(&self) -> String {
        format!("[{}] {}", self.timestamp.format("%H:%M:%S"), self.message)
    }
}

/// FIFO of log entries capped at a fixed capacity
#[derive(Debug)]
pub struct LogBuffer {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }

    /// A capacity of zero is treated as one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record a message stamped with the current local time
    pub fn push(&mut self, severity: Severity, message: impl Into<String>) -> &LogEntry {
        self.push_entry(LogEntry {
            timestamp: Local::now(),
            severity,
            message: message.into(),
        })
    }

    pub fn push_entry(&mut self, entry: LogEntry) -> &LogEntry {
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
        // Just pushed, so the deque is non-empty
        &self.entries[self.entries.len() - 1]
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// The `n` most recent entries, oldest first
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().skip(self.entries.len().saturating_sub(n))
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evicts_oldest_past_capacity() {
        let mut log = LogBuffer::new();
        for i in 0..DEFAULT_LOG_CAPACITY {
            log.push(Severity::Info, format!("msg {i}"));
        }
        assert_eq!(log.len(), 100);
        assert_eq!(log.iter().next().unwrap().message, "msg 0");

        log.push(Severity::Info, "msg 100");
        assert_eq!(log.len(), 100);
        assert_eq!(log.iter().next().unwrap().message, "msg 1");
        assert_eq!(log.last().unwrap().message, "msg 100");
    }

    #[test]
    fn test_recent_returns_tail_in_order() {
        let mut log = LogBuffer::with_capacity(5);
        for i in 0..5 {
            log.push(Severity::Raw, i.to_string());
        }
        let tail: Vec<_> = log.recent(2).map(|e| e.message.as_str()).collect();
        assert_eq!(tail, vec!["3", "4"]);
        assert_eq!(log.recent(50).count(), 5);
    }

    #[test]
    fn test_zero_capacity_keeps_one() {
        let mut log = LogBuffer::with_capacity(0);
        log.push(Severity::Info, "a");
        log.push(Severity::Info, "b");
        assert_eq!(log.len(), 1);
        assert_eq!(log.last().unwrap().message, "b");
    }

    #[test]
    fn test_format_line() {
        let entry = LogEntry {
            timestamp: Local::now(),
            severity: Severity::Success,
            message: "Connected".into(),
        };
        let line = entry.format_line();
        assert!(line.starts_with('['));
        assert!(line.ends_with("] Connected"));
        // [HH:MM:SS] prefix
        assert_eq!(&line[9..11], "] ");
    }
}
