//! Action coordinator.
//!
//! Runs each control action at most once per kind, records its lifecycle in the
//! activity log and applies optimistic connection changes on success. Errors are
//! settled here: every failure becomes exactly one `error` activity entry.

use super::{ActionError, ActionKind, ActionOutcome, ActionRequest, BusyFlags};
use crate::remote::{AutoRotationRequest, ConnectRequest, RemoteControl, SpeedTestData};
use crate::state::{ActivityLog, ConnectionPatch, ConnectionStore, Severity};

use serde::Serialize;
use std::sync::{Arc, PoisonError, RwLock};

/// Shown for a speed figure that has not been measured.
pub const SPEED_SENTINEL: &str = "--";

/// Last speed test figures. Display-only; never touches the connection state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SpeedReadout {
    pub ping_ms: Option<f64>,
    pub download_mbps: Option<f64>,
    pub upload_mbps: Option<f64>,
}

impl SpeedReadout {
    pub fn display_ping(&self) -> String {
        format!("{} ms", display_figure(self.ping_ms))
    }

    pub fn display_download(&self) -> String {
        format!("{} Mbps", display_figure(self.download_mbps))
    }

    pub fn display_upload(&self) -> String {
        format!("{} Mbps", display_figure(self.upload_mbps))
    }
}

impl From<SpeedTestData> for SpeedReadout {
    fn from(data: SpeedTestData) -> Self {
        Self {
            ping_ms: Some(data.ping),
            download_mbps: Some(data.download),
            upload_mbps: Some(data.upload),
        }
    }
}

fn display_figure(value: Option<f64>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| SPEED_SENTINEL.to_string())
}

/// Client-side auto-rotation preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AutoRotation {
    pub enabled: bool,
    pub interval_minutes: u32,
}

/// Serializes control actions and settles their outcomes.
#[derive(Clone)]
pub struct ActionCoordinator {
    remote: Arc<dyn RemoteControl>,
    busy: Arc<BusyFlags>,
    connection: Arc<ConnectionStore>,
    activity: Arc<ActivityLog>,
    speed: Arc<RwLock<SpeedReadout>>,
    auto_rotation: Arc<RwLock<AutoRotation>>,
}

impl ActionCoordinator {
    pub fn new(
        remote: Arc<dyn RemoteControl>,
        connection: Arc<ConnectionStore>,
        activity: Arc<ActivityLog>,
        auto_rotation_minutes: u32,
    ) -> Self {
        Self {
            remote,
            busy: Arc::new(BusyFlags::new()),
            connection,
            activity,
            speed: Arc::new(RwLock::new(SpeedReadout::default())),
            auto_rotation: Arc::new(RwLock::new(AutoRotation {
                enabled: false,
                interval_minutes: auto_rotation_minutes.max(1),
            })),
        }
    }

    pub fn is_busy(&self, kind: ActionKind) -> bool {
        self.busy.is_busy(kind)
    }

    pub fn in_flight(&self) -> Vec<ActionRequest> {
        self.busy.in_flight()
    }

    pub fn speed_readout(&self) -> SpeedReadout {
        *self.speed.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn auto_rotation(&self) -> AutoRotation {
        *self.auto_rotation.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Connect to `service`, letting the remote pick a server when `server` is "auto".
    /// Only available while disconnected.
    pub async fn connect(&self, service: &str, server: &str) -> ActionOutcome {
        let kind = ActionKind::Connect;
        if self.connection.is_connected() {
            tracing::debug!("Ignoring connect while connected");
            return ActionOutcome::Unavailable;
        }
        let Some(_guard) = self.busy.try_acquire(kind) else {
            return self.dropped(kind);
        };

        let service = service.trim();
        if service.is_empty() {
            return self.fail(kind, ActionError::Validation("service type is required".to_string()));
        }

        let label = service.to_uppercase();
        self.activity
            .append(format!("Connecting to {} server...", label), Severity::Info);

        let server = server.trim();
        let request = ConnectRequest {
            service: service.to_string(),
            server: if server.is_empty() || server.eq_ignore_ascii_case("auto") {
                None
            } else {
                Some(server.to_string())
            },
        };

        let result = match self.remote.connect(&request).await {
            Ok(reply) if reply.success => Ok(()),
            Ok(reply) => Err(ActionError::request_failed(reply.message)),
            Err(e) => Err(e.into()),
        };

        match result {
            Ok(()) => {
                self.connection.apply_optimistic(ConnectionPatch {
                    connected: Some(true),
                    service: Some(request.service.clone()),
                    server: request.server.clone(),
                    ..Default::default()
                });
                self.activity
                    .append(format!("Connected to {} successfully", label), Severity::Success);
                ActionOutcome::Succeeded
            }
            Err(e) => self.fail(kind, e),
        }
    }

    pub async fn disconnect(&self) -> ActionOutcome {
        let kind = ActionKind::Disconnect;
        if !self.connection.is_connected() {
            tracing::debug!("Ignoring disconnect while disconnected");
            return ActionOutcome::Unavailable;
        }
        let Some(_guard) = self.busy.try_acquire(kind) else {
            return self.dropped(kind);
        };

        self.activity.append("Disconnecting...", Severity::Info);

        match self.remote.disconnect().await {
            Ok(reply) if reply.success => {
                self.connection.apply_optimistic(ConnectionPatch {
                    connected: Some(false),
                    ..Default::default()
                });
                self.activity.append("Disconnected successfully", Severity::Success);
                ActionOutcome::Succeeded
            }
            Ok(reply) => self.fail(kind, ActionError::request_failed(reply.message)),
            Err(e) => self.fail(kind, e.into()),
        }
    }

    /// Request a new exit IP. Only available while connected.
    pub async fn rotate(&self) -> ActionOutcome {
        let kind = ActionKind::Rotate;
        if !self.connection.is_connected() {
            tracing::debug!("Ignoring rotate while disconnected");
            return ActionOutcome::Unavailable;
        }
        let Some(_guard) = self.busy.try_acquire(kind) else {
            return self.dropped(kind);
        };

        self.activity.append("Rotating IP address...", Severity::Info);

        match self.remote.rotate().await {
            Ok(reply) if reply.success => {
                let new_ip = reply.new_ip.filter(|ip| !ip.is_empty());
                self.activity.append(
                    format!("IP rotated to {}", new_ip.as_deref().unwrap_or("unknown")),
                    Severity::Success,
                );
                if new_ip.is_some() {
                    self.connection.apply_optimistic(ConnectionPatch {
                        ip_address: new_ip,
                        ..Default::default()
                    });
                }
                ActionOutcome::Succeeded
            }
            Ok(reply) => self.fail(kind, ActionError::request_failed(reply.message)),
            Err(e) => self.fail(kind, e.into()),
        }
    }

    pub async fn speed_test(&self) -> ActionOutcome {
        let kind = ActionKind::SpeedTest;
        let Some(_guard) = self.busy.try_acquire(kind) else {
            return self.dropped(kind);
        };

        self.activity.append("Running speed test...", Severity::Info);
        self.set_speed(SpeedReadout::default());

        match self.remote.speed_test().await {
            Ok(reply) if reply.success => match reply.data {
                Some(data) => {
                    self.set_speed(data.into());
                    self.activity.append(
                        format!("Speed test completed: {}/{} Mbps", data.download, data.upload),
                        Severity::Success,
                    );
                    ActionOutcome::Succeeded
                }
                None => self.fail(
                    kind,
                    crate::remote::TransportError::Decode("missing speed test data".to_string()).into(),
                ),
            },
            Ok(reply) => self.fail(kind, ActionError::request_failed(reply.message)),
            Err(e) => self.fail(kind, e.into()),
        }
    }

    /// Record the preference and notify the remote without waiting for it.
    ///
    /// `interval_minutes` of `None` keeps the current interval.
    pub fn toggle_auto_rotation(&self, enabled: bool, interval_minutes: Option<u32>) -> ActionOutcome {
        let kind = ActionKind::ToggleAutoRotation;
        let Some(guard) = self.busy.try_acquire(kind) else {
            return self.dropped(kind);
        };

        let interval = interval_minutes.unwrap_or_else(|| self.auto_rotation().interval_minutes);
        if interval == 0 {
            return self.fail(
                kind,
                ActionError::Validation("rotation interval must be at least 1 minute".to_string()),
            );
        }

        *self.auto_rotation.write().unwrap_or_else(PoisonError::into_inner) = AutoRotation {
            enabled,
            interval_minutes: interval,
        };
        self.activity.append(
            format!("Auto rotation {}", if enabled { "enabled" } else { "disabled" }),
            Severity::Info,
        );

        let remote = Arc::clone(&self.remote);
        let request = AutoRotationRequest { enabled, interval };
        tokio::spawn(async move {
            let _guard = guard;
            if let Err(e) = remote.set_auto_rotation(&request).await {
                tracing::warn!("Auto rotation notification failed: {}", e);
            }
        });

        ActionOutcome::Succeeded
    }

    fn set_speed(&self, readout: SpeedReadout) {
        *self.speed.write().unwrap_or_else(PoisonError::into_inner) = readout;
    }

    fn dropped(&self, kind: ActionKind) -> ActionOutcome {
        tracing::debug!("Dropping {:?}: already in flight", kind);
        ActionOutcome::Busy
    }

    fn fail(&self, kind: ActionKind, error: ActionError) -> ActionOutcome {
        self.activity.append(kind.describe_failure(&error), Severity::Error);
        ActionOutcome::Failed(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::mock::MockRemote;
    use crate::remote::{ControlReply, RotateReply, SpeedTestReply, TransportError};
    use crate::state::ActivityEntry;
    use std::time::Duration;

    struct Fixture {
        remote: Arc<MockRemote>,
        connection: Arc<ConnectionStore>,
        activity: Arc<ActivityLog>,
        coordinator: ActionCoordinator,
    }

    fn fixture(remote: MockRemote) -> Fixture {
        let remote = Arc::new(remote);
        let connection = Arc::new(ConnectionStore::new());
        let activity = Arc::new(ActivityLog::new());
        let coordinator = ActionCoordinator::new(
            remote.clone(),
            connection.clone(),
            activity.clone(),
            15,
        );
        Fixture {
            remote,
            connection,
            activity,
            coordinator,
        }
    }

    fn connect_now(connection: &ConnectionStore) {
        connection.apply_optimistic(ConnectionPatch {
            connected: Some(true),
            ip_address: Some("198.51.100.4".to_string()),
            ..Default::default()
        });
    }

    /// Log oldest first, as (severity, message).
    fn log_lines(activity: &ActivityLog) -> Vec<(Severity, String)> {
        let mut entries: Vec<ActivityEntry> = activity.entries().collect();
        entries.reverse();
        entries.into_iter().map(|e| (e.severity, e.message)).collect()
    }

    #[tokio::test]
    async fn test_connect_success() {
        let f = fixture(MockRemote::new());

        let outcome = f.coordinator.connect("vpn", "auto").await;
        assert_eq!(outcome, ActionOutcome::Succeeded);

        assert_eq!(
            log_lines(&f.activity),
            vec![
                (Severity::Info, "Connecting to VPN server...".to_string()),
                (Severity::Success, "Connected to VPN successfully".to_string()),
            ]
        );
        assert!(f.connection.is_connected());
        assert!(!f.coordinator.is_busy(ActionKind::Connect));

        let requests = f.remote.connect_requests.lock().unwrap();
        assert_eq!(requests[0].server, None);
        assert_eq!(requests[0].service, "vpn");
    }

    #[tokio::test]
    async fn test_connect_passes_explicit_server() {
        let f = fixture(MockRemote::new());
        f.coordinator.connect("proxy", "us-east").await;

        let requests = f.remote.connect_requests.lock().unwrap();
        assert_eq!(requests[0].server.as_deref(), Some("us-east"));
        assert_eq!(f.connection.current().server.as_deref(), Some("us-east"));
    }

    #[tokio::test]
    async fn test_connect_requires_service() {
        let f = fixture(MockRemote::new());

        let outcome = f.coordinator.connect("  ", "auto").await;
        assert!(matches!(outcome, ActionOutcome::Failed(ActionError::Validation(_))));
        assert_eq!(f.remote.call_count("connect"), 0);
        assert_eq!(
            log_lines(&f.activity),
            vec![(Severity::Error, "Connection failed: service type is required".to_string())]
        );
        assert!(!f.coordinator.is_busy(ActionKind::Connect));
    }

    #[tokio::test]
    async fn test_connect_remote_failure_leaves_state() {
        let remote = MockRemote::new();
        *remote.connect_reply.lock().unwrap() = Ok(ControlReply {
            success: false,
            message: Some("license expired".to_string()),
        });
        let f = fixture(remote);

        let outcome = f.coordinator.connect("tor", "auto").await;
        assert!(matches!(outcome, ActionOutcome::Failed(ActionError::RequestFailed { .. })));
        assert!(!f.connection.is_connected());
        assert_eq!(
            log_lines(&f.activity).last().cloned(),
            Some((Severity::Error, "Connection failed: license expired".to_string()))
        );
    }

    #[tokio::test]
    async fn test_connect_transport_error_is_logged_distinctly() {
        let remote = MockRemote::new();
        *remote.connect_reply.lock().unwrap() = Err(TransportError::Network("connection refused".to_string()));
        let f = fixture(remote);

        let outcome = f.coordinator.connect("vpn", "auto").await;
        assert!(matches!(outcome, ActionOutcome::Failed(ActionError::Transport(_))));
        assert_eq!(
            log_lines(&f.activity).last().cloned(),
            Some((Severity::Error, "Connection error: network error: connection refused".to_string()))
        );
        assert!(!f.coordinator.is_busy(ActionKind::Connect));
    }

    #[tokio::test]
    async fn test_second_connect_while_busy_is_dropped() {
        let f = fixture(MockRemote::held());

        let first = {
            let coordinator = f.coordinator.clone();
            tokio::spawn(async move { coordinator.connect("vpn", "auto").await })
        };
        f.remote.wait_entered().await;
        assert!(f.coordinator.is_busy(ActionKind::Connect));

        let second = f.coordinator.connect("vpn", "auto").await;
        assert_eq!(second, ActionOutcome::Busy);
        assert_eq!(f.remote.call_count("connect"), 1);

        f.remote.release();
        assert_eq!(first.await.unwrap(), ActionOutcome::Succeeded);
        assert!(!f.coordinator.is_busy(ActionKind::Connect));
        assert_eq!(f.remote.call_count("connect"), 1);
    }

    #[tokio::test]
    async fn test_cross_kind_actions_run_together() {
        let f = fixture(MockRemote::held());

        let connect = {
            let coordinator = f.coordinator.clone();
            tokio::spawn(async move { coordinator.connect("vpn", "auto").await })
        };
        f.remote.wait_entered().await;

        let speed = {
            let coordinator = f.coordinator.clone();
            tokio::spawn(async move { coordinator.speed_test().await })
        };
        f.remote.wait_entered().await;

        let kinds: Vec<_> = f.coordinator.in_flight().into_iter().map(|r| r.kind).collect();
        assert!(kinds.contains(&ActionKind::Connect));
        assert!(kinds.contains(&ActionKind::SpeedTest));

        f.remote.release();
        f.remote.release();
        connect.await.unwrap();
        speed.await.unwrap();
        assert!(f.coordinator.in_flight().is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_success() {
        let f = fixture(MockRemote::new());
        connect_now(&f.connection);

        assert!(f.coordinator.disconnect().await.is_success());
        let state = f.connection.current();
        assert!(!state.connected);
        assert_eq!(state.ip_address, None);
        assert_eq!(state.last_known_ip.as_deref(), Some("198.51.100.4"));
        assert_eq!(
            log_lines(&f.activity),
            vec![
                (Severity::Info, "Disconnecting...".to_string()),
                (Severity::Success, "Disconnected successfully".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_disconnect_failure_keeps_connection() {
        let remote = MockRemote::new();
        *remote.disconnect_reply.lock().unwrap() = Ok(ControlReply {
            success: false,
            message: Some("tunnel busy".to_string()),
        });
        let f = fixture(remote);
        connect_now(&f.connection);
        let before = f.connection.current();

        let outcome = f.coordinator.disconnect().await;
        assert!(matches!(outcome, ActionOutcome::Failed(ActionError::RequestFailed { .. })));
        assert_eq!(
            log_lines(&f.activity),
            vec![
                (Severity::Info, "Disconnecting...".to_string()),
                (Severity::Error, "Disconnect failed: tunnel busy".to_string()),
            ]
        );
        assert_eq!(f.connection.current(), before);
        assert!(!f.coordinator.is_busy(ActionKind::Disconnect));

        *f.remote.disconnect_reply.lock().unwrap() = Err(TransportError::Timeout(Duration::from_secs(10)));
        let outcome = f.coordinator.disconnect().await;
        assert!(matches!(
            outcome,
            ActionOutcome::Failed(ActionError::Transport(TransportError::Timeout(_)))
        ));
        let (severity, message) = log_lines(&f.activity).pop().unwrap();
        assert_eq!(severity, Severity::Error);
        assert!(message.starts_with("Disconnect error: "), "{}", message);
        assert!(f.connection.is_connected());
        assert!(!f.coordinator.is_busy(ActionKind::Disconnect));
        assert_eq!(f.remote.call_count("disconnect"), 2);
    }

    #[tokio::test]
    async fn test_connect_and_disconnect_follow_connection_state() {
        let f = fixture(MockRemote::new());

        assert_eq!(f.coordinator.disconnect().await, ActionOutcome::Unavailable);
        assert_eq!(f.remote.call_count("disconnect"), 0);

        connect_now(&f.connection);
        assert_eq!(f.coordinator.connect("vpn", "auto").await, ActionOutcome::Unavailable);
        assert_eq!(f.remote.call_count("connect"), 0);
        assert!(f.activity.is_empty());
    }

    #[tokio::test]
    async fn test_rotate_success_updates_ip() {
        let f = fixture(MockRemote::new());
        connect_now(&f.connection);

        assert!(f.coordinator.rotate().await.is_success());
        assert_eq!(f.connection.current().display_ip(), "203.0.113.9");
        assert_eq!(
            log_lines(&f.activity).last().cloned(),
            Some((Severity::Success, "IP rotated to 203.0.113.9".to_string()))
        );
        assert!(!f.coordinator.is_busy(ActionKind::Rotate));
    }

    #[tokio::test]
    async fn test_rotate_failure() {
        let remote = MockRemote::new();
        *remote.rotate_reply.lock().unwrap() = Ok(RotateReply {
            success: false,
            new_ip: None,
            message: Some("no servers available".to_string()),
        });
        let f = fixture(remote);
        connect_now(&f.connection);
        let before = f.connection.current();

        let outcome = f.coordinator.rotate().await;
        assert!(matches!(outcome, ActionOutcome::Failed(ActionError::RequestFailed { .. })));
        assert_eq!(
            log_lines(&f.activity),
            vec![
                (Severity::Info, "Rotating IP address...".to_string()),
                (Severity::Error, "IP rotation failed: no servers available".to_string()),
            ]
        );
        assert_eq!(f.connection.current(), before);
        assert!(!f.coordinator.is_busy(ActionKind::Rotate));
    }

    #[tokio::test]
    async fn test_rotate_unavailable_while_disconnected() {
        let f = fixture(MockRemote::new());

        assert_eq!(f.coordinator.rotate().await, ActionOutcome::Unavailable);
        assert_eq!(f.remote.call_count("rotate"), 0);
        assert!(f.activity.is_empty());
    }

    #[tokio::test]
    async fn test_speed_test_success() {
        let remote = MockRemote::new();
        *remote.speed_test_reply.lock().unwrap() = Ok(SpeedTestReply {
            success: true,
            data: Some(SpeedTestData {
                ping: 23.0,
                download: 94.5,
                upload: 11.0,
            }),
            message: None,
        });
        let f = fixture(remote);
        let before = f.connection.current();

        assert!(f.coordinator.speed_test().await.is_success());
        let readout = f.coordinator.speed_readout();
        assert_eq!(readout.display_ping(), "23 ms");
        assert_eq!(readout.display_download(), "94.5 Mbps");
        assert_eq!(
            log_lines(&f.activity).last().cloned(),
            Some((Severity::Success, "Speed test completed: 94.5/11 Mbps".to_string()))
        );
        assert_eq!(f.connection.current(), before);
    }

    #[tokio::test]
    async fn test_speed_test_clears_stale_figures() {
        let remote = MockRemote::new();
        *remote.speed_test_reply.lock().unwrap() = Ok(SpeedTestReply {
            success: true,
            data: Some(SpeedTestData {
                ping: 40.0,
                download: 50.0,
                upload: 5.0,
            }),
            message: None,
        });
        let f = fixture(remote);
        f.coordinator.speed_test().await;

        *f.remote.speed_test_reply.lock().unwrap() = Ok(SpeedTestReply {
            success: false,
            data: None,
            message: Some("server busy".to_string()),
        });
        let outcome = f.coordinator.speed_test().await;
        assert!(matches!(outcome, ActionOutcome::Failed(_)));

        let readout = f.coordinator.speed_readout();
        assert_eq!(readout, SpeedReadout::default());
        assert_eq!(readout.display_upload(), "-- Mbps");
    }

    #[tokio::test]
    async fn test_speed_test_without_data_is_transport_error() {
        let remote = MockRemote::new();
        *remote.speed_test_reply.lock().unwrap() = Ok(SpeedTestReply {
            success: true,
            data: None,
            message: None,
        });
        let f = fixture(remote);

        let outcome = f.coordinator.speed_test().await;
        assert!(matches!(
            outcome,
            ActionOutcome::Failed(ActionError::Transport(TransportError::Decode(_)))
        ));
    }

    #[tokio::test]
    async fn test_toggle_auto_rotation_logs_immediately() {
        let f = fixture(MockRemote::held());

        let outcome = f.coordinator.toggle_auto_rotation(true, Some(30));
        assert!(outcome.is_success());
        assert_eq!(
            log_lines(&f.activity),
            vec![(Severity::Info, "Auto rotation enabled".to_string())]
        );
        assert_eq!(
            f.coordinator.auto_rotation(),
            AutoRotation {
                enabled: true,
                interval_minutes: 30
            }
        );

        // The remote has not answered yet; the flag holds until it does.
        f.remote.wait_entered().await;
        assert!(f.coordinator.is_busy(ActionKind::ToggleAutoRotation));
        f.remote.release();

        let requests = f.remote.auto_rotation_requests.lock().unwrap().clone();
        assert_eq!(requests, vec![AutoRotationRequest { enabled: true, interval: 30 }]);
    }

    #[tokio::test]
    async fn test_toggle_auto_rotation_failure_is_not_logged() {
        let remote = MockRemote::new();
        *remote.auto_rotation_reply.lock().unwrap() = Err(TransportError::Status(500));
        let f = fixture(remote);

        assert!(f.coordinator.toggle_auto_rotation(false, None).is_success());
        while f.coordinator.is_busy(ActionKind::ToggleAutoRotation) {
            tokio::task::yield_now().await;
        }
        assert_eq!(
            log_lines(&f.activity),
            vec![(Severity::Info, "Auto rotation disabled".to_string())]
        );
        assert_eq!(f.coordinator.auto_rotation().interval_minutes, 15);
    }

    #[tokio::test]
    async fn test_toggle_auto_rotation_rejects_zero_interval() {
        let f = fixture(MockRemote::new());

        let outcome = f.coordinator.toggle_auto_rotation(true, Some(0));
        assert!(matches!(outcome, ActionOutcome::Failed(ActionError::Validation(_))));
        assert!(!f.coordinator.auto_rotation().enabled);
        assert_eq!(f.remote.call_count("auto_rotation"), 0);
    }
}
