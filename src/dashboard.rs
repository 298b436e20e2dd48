//! Session context.
//!
//! One [`Dashboard`] per session owns the stores, the action coordinator and the
//! event ingestor. The view layer only reads from it through [`Dashboard::view`].

use crate::actions::{ActionCoordinator, ActionKind, ActionRequest, AutoRotation};
use crate::ingest::EventIngestor;
use crate::remote::RemoteControl;
use crate::state::{ActivityEntry, ActivityLog, ConnectionState, ConnectionStore, MetricSample, MetricSeries};

use serde::Serialize;
use std::sync::Arc;

pub struct Dashboard {
    connection: Arc<ConnectionStore>,
    activity: Arc<ActivityLog>,
    metrics: Arc<MetricSeries>,
    actions: ActionCoordinator,
    ingestor: EventIngestor,
}

impl Dashboard {
    pub fn new(remote: Arc<dyn RemoteControl>, auto_rotation_minutes: u32) -> Self {
        let connection = Arc::new(ConnectionStore::new());
        let activity = Arc::new(ActivityLog::new());
        let metrics = Arc::new(MetricSeries::new(connection.clone()));
        let actions = ActionCoordinator::new(
            remote,
            connection.clone(),
            activity.clone(),
            auto_rotation_minutes,
        );
        let ingestor = EventIngestor::new(connection.clone(), activity.clone());

        Self {
            connection,
            activity,
            metrics,
            actions,
            ingestor,
        }
    }

    pub fn connection(&self) -> &ConnectionStore {
        &self.connection
    }

    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }

    pub fn metrics(&self) -> &MetricSeries {
        &self.metrics
    }

    pub fn actions(&self) -> &ActionCoordinator {
        &self.actions
    }

    pub fn ingestor(&self) -> &EventIngestor {
        &self.ingestor
    }

    /// Everything the view needs to render one frame.
    pub fn view(&self) -> ViewModel {
        let state = self.connection.current();
        let speed = self.actions.speed_readout();

        ViewModel {
            connection: ConnectionView::from(&state),
            controls: ControlAffordances::derive(&state, &self.actions),
            in_flight: self.actions.in_flight(),
            transport_connected: self.ingestor.transport_connected(),
            speed: SpeedView {
                ping: speed.display_ping(),
                download: speed.display_download(),
                upload: speed.display_upload(),
            },
            auto_rotation: self.actions.auto_rotation(),
            activity: self.activity.entries().collect(),
            metrics: self.metrics.snapshot(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ViewModel {
    pub connection: ConnectionView,
    pub controls: ControlAffordances,
    pub in_flight: Vec<ActionRequest>,
    pub transport_connected: bool,
    pub speed: SpeedView,
    pub auto_rotation: AutoRotation,
    pub activity: Vec<ActivityEntry>,
    pub metrics: Vec<MetricSample>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionView {
    pub connected: bool,
    pub status: String,
    pub ip_address: String,
    pub country: String,
    pub data_transferred: String,
    pub success_rate: String,
    pub service: Option<String>,
    pub server: Option<String>,
}

impl From<&ConnectionState> for ConnectionView {
    fn from(state: &ConnectionState) -> Self {
        Self {
            connected: state.connected,
            status: state.status_text().to_string(),
            ip_address: state.display_ip().to_string(),
            country: state.display_country().to_string(),
            data_transferred: format_bytes(state.bytes_transferred),
            success_rate: format!("{}%", state.success_rate_percent.unwrap_or(0.0)),
            service: state.service.clone(),
            server: state.server.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeedView {
    pub ping: String,
    pub download: String,
    pub upload: String,
}

/// Which controls the view should enable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ControlAffordances {
    pub connect: bool,
    pub disconnect: bool,
    pub rotate: bool,
    pub speed_test: bool,
    pub auto_rotation: bool,
}

impl ControlAffordances {
    pub fn derive(state: &ConnectionState, actions: &ActionCoordinator) -> Self {
        let idle = |kind| !actions.is_busy(kind);
        Self {
            connect: !state.connected && idle(ActionKind::Connect),
            disconnect: state.connected && idle(ActionKind::Disconnect),
            rotate: state.connected && idle(ActionKind::Rotate),
            speed_test: idle(ActionKind::SpeedTest),
            auto_rotation: idle(ActionKind::ToggleAutoRotation),
        }
    }
}

/// Human-readable byte count: "0 B", "1.5 KB", "2 MB".
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}
