use std::sync::Arc;

use tracing::error;

use kpitron::config::{load_config, print_schema};
use kpitron::metrics::{KpiRecorder, Metrics};
use kpitron::startup;
use kpitron::utils::logger::init_logging;

#[tokio::main]
async fn main() {
    if std::env::args().any(|arg| arg == "--schema") {
        print_schema();
        return;
    }

    let config = Arc::new(load_config());
    init_logging(&config.logging);

    let metrics = Metrics::new(&config.metrics);
    // Liveness gauge, so a scrape is never empty before the first KPI lands.
    if let Err(e) = metrics.record_kpi("kpitron_up", 1.0) {
        error!("Failed to publish liveness gauge: {}", e);
    }

    if let Err(e) = startup::run(config, metrics).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
