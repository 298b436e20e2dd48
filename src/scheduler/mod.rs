//! Periodic timers: status poll and metric series advance.

use crate::dashboard::Dashboard;
use crate::ingest::PushChannel;
use crate::probe::LatencySource;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};

/// Runs the dashboard's two periodic timers until stopped.
pub struct Scheduler {
    dashboard: Arc<Dashboard>,
    push: Arc<dyn PushChannel>,
    latency: Arc<dyn LatencySource>,
    status_poll_interval: Duration,
    metric_interval: Duration,
    stop: Arc<Mutex<Option<broadcast::Sender<()>>>>,
}

impl Scheduler {
    pub fn new(
        dashboard: Arc<Dashboard>,
        push: Arc<dyn PushChannel>,
        latency: Arc<dyn LatencySource>,
        status_poll_interval: Duration,
        metric_interval: Duration,
    ) -> Self {
        Self {
            dashboard,
            push,
            latency,
            status_poll_interval,
            metric_interval,
            stop: Arc::new(Mutex::new(None)),
        }
    }

    /// Spawn both timer loops.
    pub async fn start(&self) {
        let mut stop = self.stop.lock().await;
        if stop.is_some() {
            return; // Already running
        }

        let (stop_tx, _) = broadcast::channel(1);
        *stop = Some(stop_tx.clone());
        drop(stop);

        tracing::info!(
            "Starting scheduler (status poll every {:?}, metrics every {:?})",
            self.status_poll_interval,
            self.metric_interval
        );

        tokio::spawn(run_status_poll_loop(
            self.dashboard.clone(),
            self.push.clone(),
            self.status_poll_interval,
            stop_tx.subscribe(),
        ));
        tokio::spawn(run_metric_loop(
            self.dashboard.clone(),
            self.latency.clone(),
            self.metric_interval,
            stop_tx.subscribe(),
        ));
    }

    /// Stop both timer loops.
    pub async fn stop(&self) {
        let mut stop = self.stop.lock().await;
        if let Some(tx) = stop.take() {
            let _ = tx.send(());
            tracing::info!("Scheduler stopped");
        }
    }
}

/// Ask for a fresh snapshot each tick while the transport is up.
async fn run_status_poll_loop(
    dashboard: Arc<Dashboard>,
    push: Arc<dyn PushChannel>,
    period: Duration,
    mut stop_rx: broadcast::Receiver<()>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = stop_rx.recv() => break,
            _ = interval.tick() => {
                if dashboard.ingestor().transport_connected() {
                    push.request_status();
                }
            }
        }
    }
}

/// Advance the metric series each tick while the domain connection is up.
async fn run_metric_loop(
    dashboard: Arc<Dashboard>,
    latency: Arc<dyn LatencySource>,
    period: Duration,
    mut stop_rx: broadcast::Receiver<()>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = stop_rx.recv() => break,
            _ = interval.tick() => {
                if !dashboard.connection().is_connected() {
                    continue;
                }
                match latency.sample().await {
                    Ok(ms) => {
                        dashboard.metrics().record(ms);
                    }
                    Err(e) => tracing::debug!("Skipping metric sample: {}", e),
                }
            }
        }
    }
}
