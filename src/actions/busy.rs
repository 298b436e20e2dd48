//! Per-kind busy flags.

use super::ActionKind;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// One control action in flight.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionRequest {
    pub kind: ActionKind,
    pub started_at: DateTime<Utc>,
}

/// Registry of in-flight actions, at most one per kind.
#[derive(Debug, Default)]
pub struct BusyFlags {
    in_flight: Mutex<HashMap<ActionKind, ActionRequest>>,
}

impl BusyFlags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `kind` busy, or return `None` if it already is.
    ///
    /// The flag is cleared when the returned guard drops.
    pub fn try_acquire(self: &Arc<Self>, kind: ActionKind) -> Option<BusyGuard> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if in_flight.contains_key(&kind) {
            return None;
        }
        in_flight.insert(
            kind,
            ActionRequest {
                kind,
                started_at: Utc::now(),
            },
        );

        Some(BusyGuard {
            flags: Arc::clone(self),
            kind,
        })
    }

    pub fn is_busy(&self, kind: ActionKind) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&kind)
    }

    /// In-flight requests, oldest first.
    pub fn in_flight(&self) -> Vec<ActionRequest> {
        let mut requests: Vec<_> = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        requests.sort_by_key(|r| r.started_at);
        requests
    }

    fn release(&self, kind: ActionKind) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&kind);
    }
}

/// Holds one kind busy for as long as it lives.
#[derive(Debug)]
pub struct BusyGuard {
    flags: Arc<BusyFlags>,
    kind: ActionKind,
}

impl BusyGuard {
    pub fn kind(&self) -> ActionKind {
        self.kind
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.flags.release(self.kind);
    }
}
