//! Shared application state.
//!
//! Contains the state that is shared across all request handlers,
//! including configuration and the KPI gauge facade.

use crate::config::ConfigV1;
use crate::metrics::Metrics;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// This state is cloned for each request handler and contains
/// references to the configuration and the gauge registry facade.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration loaded at startup.
    pub config: Arc<ConfigV1>,
    /// KPI gauge facade whose registry the scrape endpoint renders.
    pub metrics: Metrics,
}
