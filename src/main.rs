//! proxydash - dashboard state engine for a remote proxy control service.

use proxydash::config::{LatencyProbeKind, ServerConfig};
use proxydash::dashboard::Dashboard;
use proxydash::ingest::StatusBridge;
use proxydash::probe::{HttpLatencyProbe, LatencySource, SyntheticLatency};
use proxydash::remote::HttpRemoteControl;
use proxydash::scheduler::Scheduler;
use proxydash::web::Server;

use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("proxydash=info".parse()?))
        .init();

    // Load configuration
    let cfg = ServerConfig::load();
    tracing::info!("Starting proxydash on port {}...", cfg.http_port);
    tracing::info!("Using control API at {}", cfg.api_url);

    let remote = Arc::new(HttpRemoteControl::new(&cfg.api_url, cfg.request_timeout)?);
    let dashboard = Arc::new(Dashboard::new(remote, cfg.auto_rotation_minutes));

    // Push channel: bridge -> single ingestor loop
    let (push_tx, push_rx) = mpsc::channel(256);
    let (bridge, requester, requests) = StatusBridge::new(&cfg.api_url, cfg.request_timeout, push_tx)?;
    let (stop_tx, _) = broadcast::channel(1);

    tokio::spawn(dashboard.ingestor().clone().run(push_rx));
    tokio::spawn(bridge.run(requests, cfg.reconnect_interval, stop_tx.subscribe()));

    let latency: Arc<dyn LatencySource> = match cfg.latency_probe {
        LatencyProbeKind::Synthetic => Arc::new(SyntheticLatency),
        LatencyProbeKind::Http => Arc::new(HttpLatencyProbe::new(&cfg.api_url, cfg.request_timeout)?),
    };

    // Start timers
    let scheduler = Scheduler::new(
        dashboard.clone(),
        Arc::new(requester),
        latency,
        cfg.status_poll_interval,
        cfg.metric_interval,
    );
    scheduler.start().await;

    // Start web server
    let server = Server::new(cfg, dashboard);
    let result = server.start().await;

    scheduler.stop().await;
    let _ = stop_tx.send(());

    result
}
