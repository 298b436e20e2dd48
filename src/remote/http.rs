//! HTTP implementation of the remote control API.

use super::{
    AutoRotationRequest, ConnectRequest, ControlReply, RemoteControl, RotateReply, SpeedTestReply,
    TransportError,
};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Control API client speaking JSON over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRemoteControl {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpRemoteControl {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<B, R>(&self, path: &str, body: Option<&B>) -> Result<R, TransportError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let mut request = self.client.post(self.url(path));
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, self.timeout))?;

        decode_response(response, self.timeout).await
    }
}

pub(crate) fn map_reqwest_error(e: reqwest::Error, timeout: Duration) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout(timeout)
    } else if e.is_decode() {
        TransportError::Decode(e.to_string())
    } else {
        TransportError::Network(e.to_string())
    }
}

/// Reject non-2xx statuses and decode the JSON body.
pub(crate) async fn decode_response<R: DeserializeOwned>(
    response: reqwest::Response,
    timeout: Duration,
) -> Result<R, TransportError> {
    let status = response.status();
    if !status.is_success() {
        return Err(TransportError::Status(status.as_u16()));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| map_reqwest_error(e, timeout))?;

    serde_json::from_slice(&body).map_err(|e| TransportError::Decode(e.to_string()))
}

#[async_trait]
impl RemoteControl for HttpRemoteControl {
    async fn connect(&self, request: &ConnectRequest) -> Result<ControlReply, TransportError> {
        self.post("/api/connect", Some(request)).await
    }

    async fn disconnect(&self) -> Result<ControlReply, TransportError> {
        self.post::<(), _>("/api/disconnect", None).await
    }

    async fn rotate(&self) -> Result<RotateReply, TransportError> {
        self.post::<(), _>("/api/rotate", None).await
    }

    async fn speed_test(&self) -> Result<SpeedTestReply, TransportError> {
        self.post::<(), _>("/api/speed-test", None).await
    }

    async fn set_auto_rotation(&self, request: &AutoRotationRequest) -> Result<(), TransportError> {
        let response = self
            .client
            .post(self.url("/api/auto-rotation"))
            .json(request)
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, self.timeout))?;

        if !response.status().is_success() {
            return Err(TransportError::Status(response.status().as_u16()));
        }
        Ok(())
    }
}
