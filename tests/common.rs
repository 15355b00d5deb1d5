#![allow(dead_code)]

use flagd_metrics::metrics::{Metrics, Resource};
use prometheus::proto::{Metric, MetricFamily};
use prometheus::Registry;

pub fn build_recorder(registry: &Registry, service_name: &str) -> Metrics {
    Metrics::new(
        registry.clone(),
        Resource::for_service(service_name, Some("test")),
        service_name,
    )
    .expect("recorder should build")
}

pub fn family(registry: &Registry, name: &str) -> Option<MetricFamily> {
    registry.gather().into_iter().find(|mf| mf.get_name() == name)
}

pub fn label<'a>(metric: &'a Metric, name: &str) -> &'a str {
    metric
        .get_label()
        .iter()
        .find(|l| l.get_name() == name)
        .map(|l| l.get_value())
        .unwrap_or("")
}

/// Series of `name` whose `otel_scope_name` label equals `scope`.
pub fn scoped_metrics(registry: &Registry, name: &str, scope: &str) -> Vec<Metric> {
    family(registry, name)
        .map(|mf| {
            mf.get_metric()
                .iter()
                .filter(|m| label(m, "otel_scope_name") == scope)
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

pub fn counter_sum(metrics: &[Metric]) -> f64 {
    metrics.iter().map(|m| m.get_counter().get_value()).sum()
}
