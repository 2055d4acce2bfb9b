//! KPI gauge recording implementation using Prometheus.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};

use crate::config::MetricsConfig;

/// Family-level label naming the emitting collector instance, so several
/// collectors scraped by the same server stay distinguishable.
const COLLECTOR_LABEL: &str = "cmonitor";

/// Trait for publishing named KPI gauges.
pub trait KpiRecorder: Clone + Send + Sync + 'static {
    /// Sets the gauge named `name` to `value`, creating its family on first
    /// use. A later call with the same name overwrites the previous value.
    fn record_kpi(&self, name: &str, value: f64) -> prometheus::Result<()>;
}

/// Prometheus-backed KPI gauge facade.
///
/// Gauge families are created lazily, keyed by KPI name, with help text equal
/// to the name. Every series carries the configured default labels plus the
/// collector instance label.
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    instance: String,
    label_names: Vec<String>,
    label_values: Vec<String>,
    // Families already registered, so a second record of the same name reuses
    // the existing GaugeVec instead of racing another thread to register it.
    families: Arc<Mutex<HashMap<String, GaugeVec>>>,
}

impl Metrics {
    /// Creates a facade with its own private registry.
    pub fn new(config: &MetricsConfig) -> Self {
        Self::with_registry(Arc::new(Registry::new()), config)
    }

    /// Creates a facade on top of an existing registry, e.g. one shared with
    /// other collectable sources.
    pub fn with_registry(registry: Arc<Registry>, config: &MetricsConfig) -> Self {
        Metrics {
            registry,
            instance: config.instance.clone(),
            label_names: config.labels.keys().cloned().collect(),
            label_values: config.labels.values().cloned().collect(),
            families: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The registry this facade records into.
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Looks up or registers the gauge family for `name`.
    fn family(&self, name: &str) -> prometheus::Result<GaugeVec> {
        let mut families = self
            .families
            .lock()
            .expect("gauge family cache mutex poisoned");
        if let Some(family) = families.get(name) {
            return Ok(family.clone());
        }

        let label_names: Vec<&str> = self.label_names.iter().map(String::as_str).collect();
        let opts = Opts::new(name, name).const_label(COLLECTOR_LABEL, self.instance.clone());
        let family = GaugeVec::new(opts, &label_names)?;
        self.registry.register(Box::new(family.clone()))?;
        families.insert(name.to_string(), family.clone());
        Ok(family)
    }

    /// Renders all metrics in Prometheus text format.
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .expect("Failed to encode metrics");
        String::from_utf8(buffer).expect("Metrics encoding produced invalid UTF-8")
    }
}

impl KpiRecorder for Metrics {
    fn record_kpi(&self, name: &str, value: f64) -> prometheus::Result<()> {
        let family = self.family(name)?;
        let label_values: Vec<&str> = self.label_values.iter().map(String::as_str).collect();
        family.get_metric_with_label_values(&label_values)?.set(value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn create_test_config() -> MetricsConfig {
        let mut labels = BTreeMap::new();
        labels.insert("env".to_string(), "prod".to_string());
        labels.insert("region".to_string(), "us".to_string());
        MetricsConfig {
            instance: "instance_1".to_string(),
            labels,
        }
    }

    fn gather_family(metrics: &Metrics, name: &str) -> prometheus::proto::MetricFamily {
        metrics
            .registry()
            .gather()
            .into_iter()
            .find(|family| family.get_name() == name)
            .expect("family should be registered")
    }

    #[test]
    fn repeated_records_keep_a_single_series() {
        let metrics = Metrics::new(&create_test_config());

        metrics.record_kpi("queue_depth", 1.0).unwrap();
        metrics.record_kpi("queue_depth", 2.0).unwrap();

        let family = gather_family(&metrics, "queue_depth");
        assert_eq!(family.get_metric().len(), 1);
        assert_eq!(family.get_metric()[0].get_gauge().get_value(), 2.0);
    }

    #[test]
    fn names_are_isolated() {
        let metrics = Metrics::new(&create_test_config());

        metrics.record_kpi("cpu_pct", 10.5).unwrap();
        metrics.record_kpi("mem_pct", 33.0).unwrap();
        metrics.record_kpi("cpu_pct", 87.3).unwrap();

        let cpu = gather_family(&metrics, "cpu_pct");
        let mem = gather_family(&metrics, "mem_pct");
        assert_eq!(cpu.get_metric()[0].get_gauge().get_value(), 87.3);
        assert_eq!(mem.get_metric()[0].get_gauge().get_value(), 33.0);
    }

    #[test]
    fn help_text_matches_name() {
        let metrics = Metrics::new(&create_test_config());

        metrics.record_kpi("queue_depth", 42.0).unwrap();

        let family = gather_family(&metrics, "queue_depth");
        assert_eq!(family.get_help(), "queue_depth");
    }

    #[test]
    fn all_default_labels_applied() {
        let metrics = Metrics::new(&create_test_config());

        metrics.record_kpi("queue_depth", 42.0).unwrap();

        let family = gather_family(&metrics, "queue_depth");
        let labels: BTreeMap<String, String> = family.get_metric()[0]
            .get_label()
            .iter()
            .map(|pair| (pair.get_name().to_string(), pair.get_value().to_string()))
            .collect();

        assert_eq!(labels.len(), 3);
        assert_eq!(labels.get("cmonitor").map(String::as_str), Some("instance_1"));
        assert_eq!(labels.get("env").map(String::as_str), Some("prod"));
        assert_eq!(labels.get("region").map(String::as_str), Some("us"));
    }

    #[test]
    fn configured_instance_overrides_default() {
        let config = MetricsConfig {
            instance: "instance_7".to_string(),
            labels: BTreeMap::new(),
        };
        let metrics = Metrics::new(&config);

        metrics.record_kpi("queue_depth", 42.0).unwrap();

        let family = gather_family(&metrics, "queue_depth");
        let pair = &family.get_metric()[0].get_label()[0];
        assert_eq!(pair.get_name(), "cmonitor");
        assert_eq!(pair.get_value(), "instance_7");
    }

    #[test]
    fn invalid_name_leaves_other_families_intact() {
        let metrics = Metrics::new(&create_test_config());

        metrics.record_kpi("valid_kpi", 1.0).unwrap();
        assert!(metrics.record_kpi("invalid-kpi", 1.0).is_err());
        metrics.record_kpi("valid_kpi", 2.0).unwrap();

        let families = metrics.registry().gather();
        assert_eq!(families.len(), 1);
        assert_eq!(families[0].get_metric()[0].get_gauge().get_value(), 2.0);
    }

    #[test]
    fn non_finite_values_pass_through() {
        let metrics = Metrics::new(&create_test_config());

        metrics.record_kpi("oddball", f64::NAN).unwrap();

        let family = gather_family(&metrics, "oddball");
        assert!(family.get_metric()[0].get_gauge().get_value().is_nan());
    }

    #[test]
    fn shared_registry_receives_records() {
        let registry = Arc::new(Registry::new());
        let metrics = Metrics::with_registry(registry.clone(), &create_test_config());

        metrics.record_kpi("queue_depth", 42.0).unwrap();

        assert_eq!(registry.gather().len(), 1);
    }

    #[test]
    fn render_emits_exposition_text() {
        let metrics = Metrics::new(&create_test_config());

        metrics.record_kpi("queue_depth", 42.0).unwrap();

        let rendered = metrics.render();
        assert!(rendered.contains("# HELP queue_depth queue_depth"));
        assert!(rendered.contains("# TYPE queue_depth gauge"));
        assert!(rendered.contains("queue_depth{"));
        assert!(rendered.contains("} 42"));
    }
}
