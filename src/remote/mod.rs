//! Remote control API seam.
//!
//! The coordinator only talks to the service through [`RemoteControl`]; the
//! reqwest client in [`http`] is the production implementation.

mod http;
#[cfg(test)]
pub mod mock;

pub use http::HttpRemoteControl;
pub(crate) use http::{decode_response, map_reqwest_error};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// A remote call that could not be completed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("server returned HTTP {0}")]
    Status(u16),
    #[error("network error: {0}")]
    Network(String),
    #[error("malformed response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectRequest {
    pub service: String,
    /// `None` lets the service pick a server.
    pub server: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AutoRotationRequest {
    pub enabled: bool,
    /// Minutes between rotations.
    pub interval: u32,
}

/// Reply to connect and disconnect.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ControlReply {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RotateReply {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub new_ip: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedTestData {
    pub ping: f64,
    pub download: f64,
    pub upload: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SpeedTestReply {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<SpeedTestData>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Request/response control surface of the remote service.
///
/// Implementations own their timeout policy; none of the calls are cancellable.
#[async_trait]
pub trait RemoteControl: Send + Sync {
    async fn connect(&self, request: &ConnectRequest) -> Result<ControlReply, TransportError>;

    async fn disconnect(&self) -> Result<ControlReply, TransportError>;

    async fn rotate(&self) -> Result<RotateReply, TransportError>;

    async fn speed_test(&self) -> Result<SpeedTestReply, TransportError>;

    /// The response body is ignored.
    async fn set_auto_rotation(&self, request: &AutoRotationRequest) -> Result<(), TransportError>;
}
