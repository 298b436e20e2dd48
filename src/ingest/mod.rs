//! Event ingestor for the push channel.
//!
//! Messages are folded into the stores one at a time, in arrival order, by a
//! single consumer loop.

mod bridge;

pub use bridge::*;

use crate::state::{ActivityLog, ConnectionStore, Severity, StatusSnapshot};

use serde::Deserialize;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// One named event from the push channel.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum PushMessage {
    /// Transport reached the service.
    Connect,
    /// Transport lost the service.
    Disconnect,
    StatusUpdate(StatusSnapshot),
    /// Kept raw so unknown tags can be ignored instead of failing the frame.
    ConnectionEvent(Value),
}

/// Domain connection event reported by the service.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    Connecting { server: Option<String> },
    Connected { server: Option<String> },
    Disconnected,
    Error { message: Option<String> },
    IpRotated { new_ip: Option<String> },
}

impl ConnectionEvent {
    /// Decode a tagged event. Unknown or missing tags yield `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let field = |name: &str| value.get(name).and_then(Value::as_str).map(str::to_string);

        let event = match value.get("event")?.as_str()? {
            "connecting" => ConnectionEvent::Connecting { server: field("server") },
            "connected" => ConnectionEvent::Connected { server: field("server") },
            "disconnected" => ConnectionEvent::Disconnected,
            "error" => ConnectionEvent::Error { message: field("message") },
            "ip_rotated" => ConnectionEvent::IpRotated { new_ip: field("new_ip") },
            _ => return None,
        };
        Some(event)
    }

    /// The activity line and severity this event maps to.
    pub fn activity(&self) -> (String, Severity) {
        fn or_unknown(value: &Option<String>) -> &str {
            value.as_deref().unwrap_or("unknown")
        }

        match self {
            ConnectionEvent::Connecting { server } => {
                (format!("Connecting to {}...", or_unknown(server)), Severity::Info)
            }
            ConnectionEvent::Connected { server } => {
                (format!("Connected to {}", or_unknown(server)), Severity::Success)
            }
            ConnectionEvent::Disconnected => ("Disconnected".to_string(), Severity::Warning),
            ConnectionEvent::Error { message } => {
                (format!("Connection error: {}", or_unknown(message)), Severity::Error)
            }
            ConnectionEvent::IpRotated { new_ip } => {
                (format!("IP rotated to {}", or_unknown(new_ip)), Severity::Success)
            }
        }
    }
}

/// Folds push messages into the connection store and activity log.
#[derive(Debug, Clone)]
pub struct EventIngestor {
    connection: Arc<ConnectionStore>,
    activity: Arc<ActivityLog>,
    transport_connected: Arc<AtomicBool>,
}

impl EventIngestor {
    pub fn new(connection: Arc<ConnectionStore>, activity: Arc<ActivityLog>) -> Self {
        Self {
            connection,
            activity,
            transport_connected: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether the push transport is currently up. Independent of the domain connection.
    pub fn transport_connected(&self) -> bool {
        self.transport_connected.load(Ordering::SeqCst)
    }

    pub fn handle(&self, message: PushMessage) {
        match message {
            PushMessage::Connect => self.on_connect(),
            PushMessage::Disconnect => self.on_disconnect(),
            PushMessage::StatusUpdate(snapshot) => self.on_status_update(&snapshot),
            PushMessage::ConnectionEvent(value) => self.on_connection_event(&value),
        }
    }

    pub fn on_connect(&self) {
        self.transport_connected.store(true, Ordering::SeqCst);
        self.activity.append("Connected to control server", Severity::Success);
    }

    pub fn on_disconnect(&self) {
        self.transport_connected.store(false, Ordering::SeqCst);
        self.activity.append("Disconnected from control server", Severity::Error);
    }

    pub fn on_status_update(&self, snapshot: &StatusSnapshot) {
        if self.connection.apply_snapshot(snapshot) {
            tracing::debug!("Applied status snapshot (connected={})", snapshot.connected);
        }
    }

    pub fn on_connection_event(&self, value: &Value) {
        match ConnectionEvent::from_value(value) {
            Some(event) => {
                let (message, severity) = event.activity();
                self.activity.append(message, severity);
            }
            None => tracing::debug!("Ignoring unrecognized connection event: {}", value),
        }
    }

    /// Consume messages until every sender is dropped.
    pub async fn run(self, mut rx: mpsc::Receiver<PushMessage>) {
        while let Some(message) = rx.recv().await {
            self.handle(message);
        }
        tracing::info!("Push channel closed, event ingestor stopping");
    }
}
