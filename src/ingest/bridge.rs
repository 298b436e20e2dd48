//! HTTP status bridge.
//!
//! Stands in for a socket-style push transport: status requests become GETs on
//! the control API and the results are fed back as [`PushMessage`]s.

use super::PushMessage;
use crate::remote::{decode_response, map_reqwest_error, TransportError};
use crate::state::{SnapshotStats, StatusSnapshot};

use serde::Deserialize;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

/// Outbound side of the push channel.
pub trait PushChannel: Send + Sync {
    /// Ask the service to push a fresh status snapshot.
    fn request_status(&self);
}

/// Handle used by the timers to poke the bridge.
#[derive(Debug, Clone)]
pub struct StatusRequester {
    tx: mpsc::Sender<()>,
}

impl PushChannel for StatusRequester {
    fn request_status(&self) {
        // A full queue already has a poll pending.
        if let Err(mpsc::error::TrySendError::Closed(_)) = self.tx.try_send(()) {
            tracing::warn!("Status bridge is gone, dropping status request");
        }
    }
}

/// `/api/status` answers either with a bare snapshot or wrapped in an envelope.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StatusBody {
    Envelope { data: StatusData },
    Bare(StatusSnapshot),
}

#[derive(Debug, Deserialize)]
struct StatusData {
    connection: StatusSnapshot,
    #[serde(default)]
    stats: Option<SnapshotStats>,
}

impl StatusBody {
    fn into_snapshot(self) -> StatusSnapshot {
        match self {
            StatusBody::Bare(snapshot) => snapshot,
            StatusBody::Envelope { data } => {
                let mut snapshot = data.connection;
                if snapshot.stats.is_none() {
                    snapshot.stats = data.stats;
                }
                snapshot
            }
        }
    }
}

/// Polls the control API and reports transport connectivity transitions.
pub struct StatusBridge {
    client: reqwest::Client,
    status_url: String,
    timeout: Duration,
    events: mpsc::Sender<PushMessage>,
    connected: bool,
}

impl StatusBridge {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        events: mpsc::Sender<PushMessage>,
    ) -> Result<(Self, StatusRequester, mpsc::Receiver<()>), TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let (tx, rx) = mpsc::channel(1);
        let bridge = Self {
            client,
            status_url: format!("{}/api/status", base_url.trim_end_matches('/')),
            timeout,
            events,
            connected: false,
        };
        Ok((bridge, StatusRequester { tx }, rx))
    }

    /// Serve status requests, retrying every `reconnect_every` while down.
    pub async fn run(
        mut self,
        mut requests: mpsc::Receiver<()>,
        reconnect_every: Duration,
        mut stop_rx: broadcast::Receiver<()>,
    ) {
        let mut reconnect = tokio::time::interval(reconnect_every);
        reconnect.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = stop_rx.recv() => break,
                request = requests.recv() => {
                    if request.is_none() {
                        break;
                    }
                    if !self.poll().await {
                        break;
                    }
                }
                _ = reconnect.tick(), if !self.connected => {
                    if !self.poll().await {
                        break;
                    }
                }
            }
        }

        tracing::info!("Status bridge stopped");
    }

    /// One status round-trip. Returns false once the ingestor has gone away.
    async fn poll(&mut self) -> bool {
        let mut outbox = Vec::with_capacity(2);

        match self.fetch().await {
            Ok(snapshot) => {
                if !self.connected {
                    tracing::info!("Status bridge reached {}", self.status_url);
                    self.connected = true;
                    outbox.push(PushMessage::Connect);
                }
                outbox.push(PushMessage::StatusUpdate(snapshot));
            }
            Err(e) => {
                if self.connected {
                    tracing::warn!("Status bridge lost {}: {}", self.status_url, e);
                    self.connected = false;
                    outbox.push(PushMessage::Disconnect);
                } else {
                    tracing::debug!("Status bridge still down: {}", e);
                }
            }
        }

        for message in outbox {
            if self.events.send(message).await.is_err() {
                return false;
            }
        }
        true
    }

    async fn fetch(&self) -> Result<StatusSnapshot, TransportError> {
        let response = self
            .client
            .get(&self.status_url)
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, self.timeout))?;

        let body: StatusBody = decode_response(response, self.timeout).await?;
        Ok(body.into_snapshot())
    }
}
