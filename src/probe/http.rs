//! HTTP round-trip probe.

use super::{LatencySource, ProbeError};

use async_trait::async_trait;
use std::time::{Duration, Instant};

/// Times a full GET against the control API.
#[derive(Debug, Clone)]
pub struct HttpLatencyProbe {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpLatencyProbe {
    pub fn new(address: &str, timeout: Duration) -> Result<Self, ProbeError> {
        let url = if address.starts_with("http://") || address.starts_with("https://") {
            address.to_string()
        } else {
            format!("http://{}", address)
        };

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProbeError::Network(e.to_string()))?;

        Ok(Self {
            client,
            url,
            timeout,
        })
    }
}

#[async_trait]
impl LatencySource for HttpLatencyProbe {
    async fn sample(&self) -> Result<f64, ProbeError> {
        // Jitter so the probe does not line up with the status poll
        let jitter = rand::random::<u64>() % 100;
        tokio::time::sleep(Duration::from_millis(jitter)).await;

        let start = Instant::now();

        let response = self.client.get(&self.url).send().await.map_err(|e| {
            if e.is_timeout() {
                ProbeError::Timeout(self.timeout)
            } else {
                ProbeError::Network(e.to_string())
            }
        })?;

        // Read the full body to measure complete transfer time
        let _body = response
            .bytes()
            .await
            .map_err(|e| ProbeError::Network(e.to_string()))?;

        Ok(start.elapsed().as_secs_f64() * 1000.0)
    }
}
