//! Latency sources for the metric series.
//!
//! The series only governs bounding and gating; where a sample comes from is
//! decided here.

mod http;

pub use http::*;

use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use thiserror::Error;

/// Probe error types.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(String),
}

/// Produces one latency reading in milliseconds per call.
#[async_trait]
pub trait LatencySource: Send + Sync {
    async fn sample(&self) -> Result<f64, ProbeError>;
}

/// Placeholder readings in the 20..120 ms range.
#[derive(Debug, Default, Clone, Copy)]
pub struct SyntheticLatency;

#[async_trait]
impl LatencySource for SyntheticLatency {
    async fn sample(&self) -> Result<f64, ProbeError> {
        Ok(rand::thread_rng().gen_range(20.0..120.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_latency_range() {
        for _ in 0..100 {
            let ms = tokio_test::block_on(SyntheticLatency.sample()).unwrap();
            assert!((20.0..120.0).contains(&ms));
        }
    }
}
