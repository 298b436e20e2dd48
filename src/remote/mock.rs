//! Scripted remote control for tests.

use super::{
    AutoRotationRequest, ConnectRequest, ControlReply, RemoteControl, RotateReply, SpeedTestReply,
    TransportError,
};

use async_trait::async_trait;
use std::sync::Mutex;
use tokio::sync::Notify;

/// Canned replies plus a record of every call made.
pub struct MockRemote {
    pub connect_reply: Mutex<Result<ControlReply, TransportError>>,
    pub disconnect_reply: Mutex<Result<ControlReply, TransportError>>,
    pub rotate_reply: Mutex<Result<RotateReply, TransportError>>,
    pub speed_test_reply: Mutex<Result<SpeedTestReply, TransportError>>,
    pub auto_rotation_reply: Mutex<Result<(), TransportError>>,
    pub calls: Mutex<Vec<String>>,
    pub connect_requests: Mutex<Vec<ConnectRequest>>,
    pub auto_rotation_requests: Mutex<Vec<AutoRotationRequest>>,
    /// When set, every call signals `entered` and parks until `release` fires.
    hold: Option<(Notify, Notify)>,
}

impl Default for MockRemote {
    fn default() -> Self {
        Self {
            connect_reply: Mutex::new(Ok(ControlReply { success: true, message: None })),
            disconnect_reply: Mutex::new(Ok(ControlReply { success: true, message: None })),
            rotate_reply: Mutex::new(Ok(RotateReply {
                success: true,
                new_ip: Some("203.0.113.9".to_string()),
                message: None,
            })),
            speed_test_reply: Mutex::new(Ok(SpeedTestReply::default())),
            auto_rotation_reply: Mutex::new(Ok(())),
            calls: Mutex::new(Vec::new()),
            connect_requests: Mutex::new(Vec::new()),
            auto_rotation_requests: Mutex::new(Vec::new()),
            hold: None,
        }
    }
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mock whose calls stay in flight until [`MockRemote::release`].
    pub fn held() -> Self {
        Self {
            hold: Some((Notify::new(), Notify::new())),
            ..Self::default()
        }
    }

    pub async fn wait_entered(&self) {
        if let Some((entered, _)) = &self.hold {
            entered.notified().await;
        }
    }

    pub fn release(&self) {
        if let Some((_, release)) = &self.hold {
            release.notify_one();
        }
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == name).count()
    }

    async fn enter(&self, name: &str) {
        self.calls.lock().unwrap().push(name.to_string());
        if let Some((entered, release)) = &self.hold {
            entered.notify_one();
            release.notified().await;
        }
    }
}

#[async_trait]
impl RemoteControl for MockRemote {
    async fn connect(&self, request: &ConnectRequest) -> Result<ControlReply, TransportError> {
        self.connect_requests.lock().unwrap().push(request.clone());
        self.enter("connect").await;
        self.connect_reply.lock().unwrap().clone()
    }

    async fn disconnect(&self) -> Result<ControlReply, TransportError> {
        self.enter("disconnect").await;
        self.disconnect_reply.lock().unwrap().clone()
    }

    async fn rotate(&self) -> Result<RotateReply, TransportError> {
        self.enter("rotate").await;
        self.rotate_reply.lock().unwrap().clone()
    }

    async fn speed_test(&self) -> Result<SpeedTestReply, TransportError> {
        self.enter("speed_test").await;
        self.speed_test_reply.lock().unwrap().clone()
    }

    async fn set_auto_rotation(&self, request: &AutoRotationRequest) -> Result<(), TransportError> {
        self.auto_rotation_requests.lock().unwrap().push(request.clone());
        self.enter("auto_rotation").await;
        self.auto_rotation_reply.lock().unwrap().clone()
    }
}
