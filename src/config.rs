//! Configuration module for proxydash.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Where metric-series samples come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatencyProbeKind {
    /// Random placeholder values, matching the dashboard's demo behavior.
    Synthetic,
    /// Round-trip time of a GET against the control API.
    Http,
}

impl FromStr for LatencyProbeKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "synthetic" => Ok(Self::Synthetic),
            "http" => Ok(Self::Http),
            _ => Err(()),
        }
    }
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP port for the local view/action server (default: 8080)
    pub http_port: u16,
    /// Base URL of the remote control service (default: "http://127.0.0.1:3000")
    pub api_url: String,
    /// Period of the status poll timer (default: 10s)
    pub status_poll_interval: Duration,
    /// Period of the metric series timer (default: 5s)
    pub metric_interval: Duration,
    /// Timeout applied to every outbound control request (default: 10s)
    pub request_timeout: Duration,
    /// Retry period of the status bridge while the transport is down (default: 5s)
    pub reconnect_interval: Duration,
    /// Source of metric samples (default: synthetic)
    pub latency_probe: LatencyProbeKind,
    /// Rotation interval used when a toggle does not name one (default: 15)
    pub auto_rotation_minutes: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: 8080,
            api_url: "http://127.0.0.1:3000".to_string(),
            status_poll_interval: Duration::from_secs(10),
            metric_interval: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
            reconnect_interval: Duration::from_secs(5),
            latency_probe: LatencyProbeKind::Synthetic,
            auto_rotation_minutes: 15,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PROXYDASH_HTTP_PORT`: local server port (default: 8080)
    /// - `PROXYDASH_API_URL`: remote control service base URL
    /// - `PROXYDASH_STATUS_POLL_SECS`: status poll period (default: 10)
    /// - `PROXYDASH_METRIC_SECS`: metric sample period (default: 5)
    /// - `PROXYDASH_REQUEST_TIMEOUT_SECS`: control request timeout (default: 10)
    /// - `PROXYDASH_RECONNECT_SECS`: bridge retry period (default: 5)
    /// - `PROXYDASH_LATENCY_PROBE`: "synthetic" or "http" (default: synthetic)
    /// - `PROXYDASH_AUTO_ROTATION_MINUTES`: default rotation interval (default: 15)
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Unparseable values keep the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(port) = parse_var(&lookup, "PROXYDASH_HTTP_PORT") {
            cfg.http_port = port;
        }

        if let Some(url) = lookup("PROXYDASH_API_URL") {
            let url = url.trim().trim_end_matches('/');
            if !url.is_empty() {
                cfg.api_url = url.to_string();
            }
        }

        if let Some(secs) = parse_secs(&lookup, "PROXYDASH_STATUS_POLL_SECS") {
            cfg.status_poll_interval = secs;
        }
        if let Some(secs) = parse_secs(&lookup, "PROXYDASH_METRIC_SECS") {
            cfg.metric_interval = secs;
        }
        if let Some(secs) = parse_secs(&lookup, "PROXYDASH_REQUEST_TIMEOUT_SECS") {
            cfg.request_timeout = secs;
        }
        if let Some(secs) = parse_secs(&lookup, "PROXYDASH_RECONNECT_SECS") {
            cfg.reconnect_interval = secs;
        }

        if let Some(kind) = parse_var(&lookup, "PROXYDASH_LATENCY_PROBE") {
            cfg.latency_probe = kind;
        }

        if let Some(minutes) = parse_var::<_, u32>(&lookup, "PROXYDASH_AUTO_ROTATION_MINUTES") {
            if minutes > 0 {
                cfg.auto_rotation_minutes = minutes;
            }
        }

        cfg
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)?.trim().parse().ok()
}

// Zero-length periods would make tokio::time::interval panic, so a value that
// rounds down to zero is rejected along with negatives and overflow.
fn parse_secs<F>(lookup: &F, key: &str) -> Option<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let secs: f64 = parse_var(lookup, key)?;
    Duration::try_from_secs_f64(secs)
        .ok()
        .filter(|period| !period.is_zero())
}
