//! Bounded, newest-first activity log.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// Maximum number of entries kept in the log.
pub const ACTIVITY_CAPACITY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// One immutable log record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityEntry {
    /// Millisecond timestamp, bumped forward on collision so ids stay unique.
    pub id: i64,
    pub message: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug)]
struct LogInner {
    entries: VecDeque<ActivityEntry>,
    last_id: i64,
}

/// Activity log store. Eviction is strict FIFO by insertion order.
#[derive(Debug)]
pub struct ActivityLog {
    capacity: usize,
    inner: Mutex<LogInner>,
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::with_capacity(ACTIVITY_CAPACITY)
    }
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            inner: Mutex::new(LogInner {
                entries: VecDeque::with_capacity(capacity + 1),
                last_id: 0,
            }),
        }
    }

    /// Insert a new entry at the head, evicting the oldest past capacity.
    pub fn append(&self, message: impl Into<String>, severity: Severity) -> ActivityEntry {
        let message = message.into();
        match severity {
            Severity::Info | Severity::Success => tracing::info!("{}", message),
            Severity::Warning => tracing::warn!("{}", message),
            Severity::Error => tracing::error!("{}", message),
        }

        let timestamp = Utc::now();
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        let id = timestamp.timestamp_millis().max(inner.last_id + 1);
        inner.last_id = id;

        let entry = ActivityEntry {
            id,
            message,
            severity,
            timestamp,
        };
        inner.entries.push_front(entry.clone());
        while inner.entries.len() > self.capacity {
            inner.entries.pop_back();
        }

        entry
    }

    /// Snapshot of the log, newest first.
    ///
    /// The iterator is detached from the store: later appends are not observed.
    pub fn entries(&self) -> impl Iterator<Item = ActivityEntry> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.entries.iter().cloned().collect::<Vec<_>>().into_iter()
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
