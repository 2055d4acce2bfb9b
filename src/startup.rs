//! Application startup and server initialization.
//!
//! This module handles the creation and configuration of the HTTP server,
//! attaching the KPI gauge registry to the scrape endpoint and binding the
//! configured listen address.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::ConfigV1;
use crate::metrics::Metrics;
use crate::routes;
use crate::state::AppState;

/// Initializes and runs the exposition server.
///
/// Takes ownership of the shared gauge facade and wires its registry into
/// the scrape endpoint; the caller keeps a clone and records KPIs through it
/// for the lifetime of the process. Binds to the address specified in the
/// configuration and starts serving requests.
///
/// # Errors
///
/// Returns an error if the server fails to bind to the specified address
/// or encounters a runtime error during execution.
pub async fn run(config: Arc<ConfigV1>, metrics: Metrics) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting server on {}", config.bind_address);

    let state = AppState {
        config: config.clone(),
        metrics,
    };

    let app = routes::create_router(state);

    let listener = TcpListener::bind(&config.bind_address).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
