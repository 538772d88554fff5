//! Clusterprobe server binary.

use clusterprobe::{HttpProbeClient, ProbeMetrics, ProbeRegistry};
use clusterprobe_server::api::{self, AppState};
use clusterprobe_server::config::Config;
use clusterprobe_server::persist::RegistrationStore;
use prometheus_client::registry::Registry;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    common::logging::init_with_default(config.logging.level.as_deref().unwrap_or("info"));

    info!("Clusterprobe server starting");

    let mut metric_registry = Registry::default();
    let probe_metrics = Arc::new(ProbeMetrics::new(&mut metric_registry));

    let client = Arc::new(HttpProbeClient::new(config.client.clone())?);
    let registry = Arc::new(ProbeRegistry::new(
        client,
        config.probes,
        Some(probe_metrics),
    ));

    let store = Arc::new(RegistrationStore::open(&config.persistence.path));
    for uri in store.uris() {
        if let Err(err) = registry.register(&uri) {
            warn!(uri = %uri, error = %err, "skipping saved registration");
        }
    }
    info!(probes = registry.len(), "replayed saved registrations");

    let state = AppState {
        registry,
        store,
        metrics: Arc::new(metric_registry),
    };

    let listener = TcpListener::bind(&config.server.listen).await?;
    info!(listen = %config.server.listen, "API server listening");
    axum::serve(listener, api::router(state)).await?;

    Ok(())
}
