//! KPI gauge collection and exposition for Prometheus.
//!
//! This module provides the gauge registration facade

mod recorder;

pub use recorder::{KpiRecorder, Metrics};
