use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use pubsub_node::{load_config, NodeRuntime};
use udp_pubsub::adapters::{SystemClock, UdpTransportProvider};

fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Load configuration
    let config = load_config().context("failed to load configuration")?;
    info!(
        node = %config.name,
        publishers = config.publishers.len(),
        subscribers = config.subscribers.len(),
        "starting node"
    );

    let mut runtime = NodeRuntime::new(
        &config,
        Arc::new(UdpTransportProvider::new()),
        Arc::new(SystemClock::new()),
    )
    .context("failed to attach endpoints")?;
    runtime.log_topics();

    let iterations = runtime.run();
    info!(
        iterations,
        sent = runtime.heartbeats_sent(),
        received = runtime.heartbeats_received(),
        "node stopped"
    );
    Ok(())
}
