//! Connection state store.

use serde::{Deserialize, Serialize};
use std::sync::{PoisonError, RwLock};

/// Shown in place of the IP address while disconnected or unknown.
pub const IP_SENTINEL: &str = "Not Connected";
/// Shown in place of the country when it is unknown.
pub const COUNTRY_SENTINEL: &str = "Unknown";

/// Last-known truth about the proxy connection.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConnectionState {
    pub connected: bool,
    /// Always `None` while disconnected.
    pub ip_address: Option<String>,
    pub country: Option<String>,
    pub bytes_transferred: u64,
    pub success_rate_percent: Option<f64>,
    pub service: Option<String>,
    pub server: Option<String>,
    pub uptime_secs: u64,
    /// Last non-empty IP seen, kept across disconnects.
    pub last_known_ip: Option<String>,
}

impl ConnectionState {
    pub fn display_ip(&self) -> &str {
        match (&self.ip_address, self.connected) {
            (Some(ip), true) => ip.as_str(),
            _ => IP_SENTINEL,
        }
    }

    pub fn display_country(&self) -> &str {
        self.country.as_deref().unwrap_or(COUNTRY_SENTINEL)
    }

    pub fn status_text(&self) -> &'static str {
        if self.connected {
            "Connected"
        } else {
            "Disconnected"
        }
    }

    fn normalize(&mut self) {
        if let Some(ip) = &self.ip_address {
            if ip.is_empty() {
                self.ip_address = None;
            } else {
                self.last_known_ip = Some(ip.clone());
            }
        }
        if !self.connected {
            self.ip_address = None;
        }
        if let Some(rate) = self.success_rate_percent {
            self.success_rate_percent = if rate.is_finite() {
                Some(rate.clamp(0.0, 100.0))
            } else {
                None
            };
        }
    }
}

/// Aggregate statistics nested inside a status payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotStats {
    #[serde(default)]
    pub success_rate: Option<f64>,
}

/// Full-state status payload pushed by the remote service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub connected: bool,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub data_transferred: Option<u64>,
    #[serde(default)]
    pub stats: Option<SnapshotStats>,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default)]
    pub uptime: Option<u64>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Partial update applied after a successful local action.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionPatch {
    pub connected: Option<bool>,
    pub ip_address: Option<String>,
    pub service: Option<String>,
    pub server: Option<String>,
}

/// Single source of truth for the domain connection.
///
/// Writes are last-write-wins: a snapshot and an optimistic patch are applied
/// in the order they reach the store, with no staleness check between them.
#[derive(Debug, Default)]
pub struct ConnectionStore {
    state: RwLock<ConnectionState>,
}

impl ConnectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest applied state.
    pub fn current(&self) -> ConnectionState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .connected
    }

    /// Replace the observable state from a pushed snapshot.
    ///
    /// Returns whether anything observable changed.
    pub fn apply_snapshot(&self, snapshot: &StatusSnapshot) -> bool {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let prev = state.clone();

        let mut bytes = snapshot.data_transferred.unwrap_or(0);
        if prev.connected && snapshot.connected && bytes < prev.bytes_transferred {
            tracing::debug!(
                "Ignoring byte counter regression {} -> {} while connected",
                prev.bytes_transferred,
                bytes
            );
            bytes = prev.bytes_transferred;
        }

        let mut next = ConnectionState {
            connected: snapshot.connected,
            ip_address: snapshot.ip_address.clone(),
            country: snapshot.country.clone().filter(|c| !c.is_empty()),
            bytes_transferred: bytes,
            success_rate_percent: match &snapshot.stats {
                Some(stats) => stats.success_rate,
                None => prev.success_rate_percent,
            },
            service: snapshot.service.clone(),
            server: snapshot.server.clone(),
            uptime_secs: snapshot.uptime.unwrap_or(0),
            last_known_ip: prev.last_known_ip.clone(),
        };
        next.normalize();

        let changed = next != prev;
        *state = next;
        changed
    }

    /// Merge a partial update on top of the current state.
    pub fn apply_optimistic(&self, patch: ConnectionPatch) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(connected) = patch.connected {
            state.connected = connected;
        }
        if patch.ip_address.is_some() {
            state.ip_address = patch.ip_address;
        }
        if patch.service.is_some() {
            state.service = patch.service;
        }
        if patch.server.is_some() {
            state.server = patch.server;
        }
        state.normalize();
    }
}
