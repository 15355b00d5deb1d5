mod common;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use common::{build_recorder, counter_sum, family, label, scoped_metrics};
use flagd_metrics::config::MetricsConfig;
use flagd_metrics::error::MetricsError;
use flagd_metrics::metrics::{http_attributes, KeyValue, Metrics, MetricsRecorder, Resource};
use flagd_metrics::startup::init_metrics;
use prometheus::Registry;

#[derive(Debug)]
struct ParseError(&'static str);

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl std::error::Error for ParseError {}

fn metrics_config(service_name: &str, fail_fast: bool) -> MetricsConfig {
    MetricsConfig {
        service_name: service_name.to_string(),
        service_version: Some("test".to_string()),
        resource: Default::default(),
        fail_fast,
    }
}

/// Recorders for different services share a registry without sharing series.
#[test]
fn test_scopes_are_independent() {
    let registry = Registry::new();
    let flagd = build_recorder(&registry, "flagd");
    let proxy = build_recorder(&registry, "flagd-proxy");

    flagd.record_evaluation(None, "STATIC", "on", "banner");
    flagd.record_evaluation(None, "STATIC", "on", "banner");
    proxy.http_response_size(512, &http_attributes("flagd-proxy", "/sync", "GET", "200"));

    assert_eq!(
        counter_sum(&scoped_metrics(&registry, "impressions", "flagd")),
        2.0
    );
    assert!(scoped_metrics(&registry, "impressions", "flagd-proxy").is_empty());
    assert!(scoped_metrics(&registry, "http_response_size_bytes", "flagd").is_empty());
    assert_eq!(
        scoped_metrics(&registry, "http_response_size_bytes", "flagd-proxy").len(),
        1
    );
}

/// Services whose resources carry different attributes still share a registry.
#[test]
fn test_scopes_with_different_resources_share_registry() {
    let registry = Registry::new();
    let flagd = Metrics::new(
        registry.clone(),
        Resource::for_service("flagd", Some("1.0")),
        "flagd",
    )
    .expect("first recorder should build");
    let proxy = Metrics::new(
        registry.clone(),
        Resource::for_service("flagd-proxy", None),
        "flagd-proxy",
    )
    .expect("recorder with a differently shaped resource should build");
    let sync = Metrics::new(
        registry.clone(),
        Resource::for_service("flagd-sync", None).with(KeyValue::new("__reserved", "x")),
        "flagd-sync",
    )
    .expect("recorder with an unusable resource label should build");

    flagd.record_evaluation(None, "STATIC", "on", "banner");
    proxy.record_evaluation(None, "DEFAULT", "off", "banner");
    proxy.record_evaluation(None, "DEFAULT", "off", "banner");
    sync.reasons("ERROR", None);

    assert_eq!(counter_sum(&scoped_metrics(&registry, "impressions", "flagd")), 1.0);
    assert_eq!(
        counter_sum(&scoped_metrics(&registry, "impressions", "flagd-proxy")),
        2.0
    );
    assert_eq!(counter_sum(&scoped_metrics(&registry, "reasons", "flagd-sync")), 1.0);
    assert!(scoped_metrics(&registry, "impressions", "flagd-sync").is_empty());
}

/// Both resources end up in target_info.
#[test]
fn test_each_service_publishes_target_info() {
    let registry = Registry::new();
    let _flagd = build_recorder(&registry, "flagd");
    let _proxy = build_recorder(&registry, "flagd-proxy");

    let info = family(&registry, "target_info").expect("target_info registered");
    let mut services: Vec<&str> = info
        .get_metric()
        .iter()
        .map(|m| label(m, "service_name"))
        .collect();
    services.sort();
    assert_eq!(services, vec!["flagd", "flagd-proxy"]);
}

/// Concurrent callers record without external locking and nothing is lost.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_recording() {
    let registry = Registry::new();
    let recorder: Arc<dyn MetricsRecorder> = Arc::new(build_recorder(&registry, "flagd"));

    let mut handles = Vec::new();
    for task in 0..8 {
        let recorder = recorder.clone();
        handles.push(tokio::spawn(async move {
            let attrs = http_attributes("flagd", "/resolve", "POST", "200");
            for i in 0..100 {
                recorder.in_flight_request_start(&attrs);
                recorder.http_request_duration(Duration::from_millis(10), &attrs);
                if (task + i) % 2 == 0 {
                    recorder.record_evaluation(None, "TARGETING_MATCH", "on", "checkout");
                } else {
                    recorder.record_evaluation(
                        Some(&ParseError("bad context")),
                        "ERROR",
                        "",
                        "checkout",
                    );
                }
                recorder.in_flight_request_end(&attrs);
            }
        }));
    }
    for handle in handles {
        handle.await.expect("task should not panic");
    }

    let impressions = scoped_metrics(&registry, "impressions", "flagd");
    let reasons = scoped_metrics(&registry, "reasons", "flagd");
    assert_eq!(counter_sum(&impressions), 400.0);
    assert_eq!(counter_sum(&reasons), 800.0);

    let errors: f64 = reasons
        .iter()
        .filter(|m| label(m, "exception_type") == "bad context")
        .map(|m| m.get_counter().get_value())
        .sum();
    assert_eq!(errors, 400.0);

    let inflight = scoped_metrics(&registry, "http_requests_inflight", "flagd");
    assert_eq!(inflight.len(), 1);
    assert_eq!(inflight[0].get_gauge().get_value(), 0.0);

    let durations = scoped_metrics(&registry, "http_request_duration_seconds", "flagd");
    assert_eq!(durations[0].get_histogram().get_sample_count(), 800);
}

/// Without fail_fast a broken setup yields a recorder that discards data.
#[test]
fn test_init_metrics_falls_back_to_noop() {
    let registry = Registry::new();
    let _existing = build_recorder(&registry, "flagd");

    // Same resource shape, so the only conflict is the duplicate scope.
    let direct = Metrics::new(
        registry.clone(),
        metrics_config("flagd", false).resource(),
        "flagd",
    );
    assert!(matches!(
        direct,
        Err(MetricsError::Instrument { ref name, .. }) if name == "http_request_duration_seconds"
    ));

    let recorder = init_metrics(&metrics_config("flagd", false), registry.clone())
        .expect("fallback should not fail");
    recorder.record_evaluation(None, "STATIC", "on", "banner");

    assert!(scoped_metrics(&registry, "impressions", "flagd").is_empty());
    assert!(scoped_metrics(&registry, "reasons", "flagd").is_empty());
}

#[test]
fn test_init_metrics_fail_fast() {
    let registry = Registry::new();
    let _existing = build_recorder(&registry, "flagd");

    let result = init_metrics(&metrics_config("flagd", true), registry);
    assert!(matches!(
        result,
        Err(MetricsError::Instrument { ref name, ref scope, .. })
            if name == "http_request_duration_seconds" && scope == "flagd"
    ));

    let empty = init_metrics(&metrics_config("", true), Registry::new());
    assert!(matches!(empty, Err(MetricsError::EmptyServiceName)));
}

#[test]
fn test_init_metrics_builds_real_recorder() {
    let registry = Registry::new();
    let recorder = init_metrics(&metrics_config("flagd", true), registry.clone())
        .expect("recorder should build");

    recorder.reasons("DEFAULT", None);

    let reasons = scoped_metrics(&registry, "reasons", "flagd");
    assert_eq!(counter_sum(&reasons), 1.0);
    assert_eq!(label(&reasons[0], "feature_flag_provider_name"), "flagd");
}
