//! The service metrics recorder.
//!
//! [`Metrics::new`] provisions five instruments in the scope of one service and
//! customizes the buckets of the two HTTP histograms. After construction the
//! recorder is read-only; all mutation happens inside the Prometheus
//! collectors, which are safe to use from many threads at once.

use std::error::Error;
use std::time::Duration;

use opentelemetry::KeyValue;
use prometheus::core::Collector;
use prometheus::Registry;
use tracing::{info, warn};

use super::attributes::{
    exception_type, feature_flag_reason, EXCEPTION_TYPE_KEY, FEATURE_FLAG_REASON_KEY,
    FLAGD_PROVIDER_NAME,
};
use super::instrument::{Counter, Histogram, Instrument, UpDownCounter};
use super::provider::{Meter, MeterProvider};
use super::resource::Resource;
use super::semconv;
use super::view::View;
use crate::error::{MetricsError, Result};

pub const REQUEST_DURATION_NAME: &str = "http_request_duration_seconds";
pub const RESPONSE_SIZE_NAME: &str = "http_response_size_bytes";
pub const REQUESTS_INFLIGHT_NAME: &str = "http_requests_inflight";
pub const IMPRESSIONS_NAME: &str = "impressions";
pub const REASONS_NAME: &str = "reasons";

/// Recording operations used by the HTTP and flag-evaluation code paths.
pub trait MetricsRecorder: Send + Sync + 'static {
    /// Records the elapsed time of a request, in seconds.
    fn http_request_duration(&self, duration: Duration, attributes: &[KeyValue]);

    /// Records the size of a response body in bytes.
    fn http_response_size(&self, size_bytes: i64, attributes: &[KeyValue]);

    fn in_flight_request_start(&self, attributes: &[KeyValue]);

    /// Must be paired with [`MetricsRecorder::in_flight_request_start`]; mismatches are not detected.
    fn in_flight_request_end(&self, attributes: &[KeyValue]);

    /// Counts a successful evaluation of `flag_key`.
    fn impressions(&self, reason: &str, variant: &str, flag_key: &str);

    /// Counts an evaluation by reason, tagging the error when there is one.
    fn reasons(&self, reason: &str, error: Option<&dyn Error>);

    fn record_outcome(&self, outcome: EvaluationOutcome<'_>) {
        match outcome {
            EvaluationOutcome::Resolved {
                reason,
                variant,
                flag_key,
            } => {
                self.impressions(reason, variant, flag_key);
                self.reasons(reason, None);
            }
            EvaluationOutcome::Failed { reason, error } => self.reasons(reason, Some(error)),
        }
    }

    /// Records one flag evaluation. Successes count an impression and a
    /// reason, failures only a reason.
    fn record_evaluation(
        &self,
        error: Option<&dyn Error>,
        reason: &str,
        variant: &str,
        flag_key: &str,
    ) {
        self.record_outcome(EvaluationOutcome::classify(error, reason, variant, flag_key));
    }
}

/// Result of a flag evaluation as seen by the recorder.
#[derive(Debug, Clone, Copy)]
pub enum EvaluationOutcome<'a> {
    Resolved {
        reason: &'a str,
        variant: &'a str,
        flag_key: &'a str,
    },
    Failed {
        reason: &'a str,
        error: &'a dyn Error,
    },
}

impl<'a> EvaluationOutcome<'a> {
    pub fn classify(
        error: Option<&'a dyn Error>,
        reason: &'a str,
        variant: &'a str,
        flag_key: &'a str,
    ) -> Self {
        match error {
            None => EvaluationOutcome::Resolved {
                reason,
                variant,
                flag_key,
            },
            Some(error) => EvaluationOutcome::Failed { reason, error },
        }
    }
}

/// Flag identity plus the resolution reason.
pub fn impression_attributes(reason: &str, variant: &str, flag_key: &str) -> Vec<KeyValue> {
    let mut attributes = semconv::feature_flag_attributes(flag_key, variant);
    attributes.push(feature_flag_reason(reason));
    attributes
}

/// Provider name and reason, plus `exception.type` only when an error is given.
pub fn reason_attributes(reason: &str, error: Option<&dyn Error>) -> Vec<KeyValue> {
    let mut attributes = vec![
        KeyValue::new(semconv::FEATURE_FLAG_PROVIDER_NAME, FLAGD_PROVIDER_NAME),
        feature_flag_reason(reason),
    ];
    if let Some(error) = error {
        attributes.push(exception_type(&error.to_string()));
    }
    attributes
}

/// Prometheus-backed recorder holding the five service instruments.
#[derive(Debug, Clone)]
pub struct Metrics {
    http_request_duration: Histogram,
    http_response_size: Histogram,
    http_requests_inflight: UpDownCounter,
    impressions: Counter,
    reasons: Counter,
}

/// Keeps a handle on every collector registered so far.
fn tracked<I: Instrument>(registered: &mut Vec<Box<dyn Collector>>, instrument: I) -> I {
    registered.push(instrument.collector());
    instrument
}

impl Metrics {
    /// Builds a recorder for `service_name` recording into `registry`.
    ///
    /// # Errors
    ///
    /// Fails if the service name is empty or any instrument cannot be
    /// registered (for example when a recorder for the same service already
    /// exists on this registry). Instruments registered before the failure
    /// are removed again, so the call can be retried.
    pub fn new(registry: Registry, resource: Resource, service_name: &str) -> Result<Self> {
        if service_name.trim().is_empty() {
            return Err(MetricsError::EmptyServiceName);
        }

        // Response sizes: 8 exponential buckets starting at 100 bytes.
        let size_buckets =
            prometheus::exponential_buckets(100.0, 10.0, 8).map_err(|source| {
                MetricsError::Buckets {
                    name: RESPONSE_SIZE_NAME.to_string(),
                    source,
                }
            })?;

        let provider = MeterProvider::builder(registry.clone())
            .with_resource(resource)
            // Request durations use the standard latency buckets, in seconds.
            .with_view(View::explicit_buckets(
                REQUEST_DURATION_NAME,
                service_name,
                prometheus::DEFAULT_BUCKETS.to_vec(),
            ))
            .with_view(View::explicit_buckets(
                RESPONSE_SIZE_NAME,
                service_name,
                size_buckets,
            ))
            .build();

        let mut registered = Vec::new();
        match Self::provision(&provider.meter(service_name), &mut registered) {
            Ok(metrics) => {
                info!(scope = service_name, "Metrics recorder initialized");
                Ok(metrics)
            }
            Err(e) => {
                for collector in registered {
                    if let Err(unregister) = registry.unregister(collector) {
                        warn!(scope = service_name, "Failed to roll back instrument: {}", unregister);
                    }
                }
                Err(e)
            }
        }
    }

    fn provision(meter: &Meter, registered: &mut Vec<Box<dyn Collector>>) -> Result<Self> {
        let http_keys = [
            semconv::SERVICE_NAME,
            semconv::HTTP_URL,
            semconv::HTTP_METHOD,
            semconv::HTTP_STATUS_CODE,
        ];

        let http_request_duration = meter
            .f64_histogram(REQUEST_DURATION_NAME)
            .with_description("The latency of the HTTP requests")
            .with_unit("s")
            .with_attribute_keys(http_keys.clone())
            .build()?;
        let http_request_duration = tracked(registered, http_request_duration);
        let http_response_size = meter
            .f64_histogram(RESPONSE_SIZE_NAME)
            .with_description("The size of the HTTP responses")
            .with_unit("By")
            .with_attribute_keys(http_keys.clone())
            .build()?;
        let http_response_size = tracked(registered, http_response_size);
        let http_requests_inflight = meter
            .i64_up_down_counter(REQUESTS_INFLIGHT_NAME)
            .with_description("The number of inflight requests being handled at the same time")
            .with_attribute_keys(http_keys)
            .build()?;
        let http_requests_inflight = tracked(registered, http_requests_inflight);
        let impressions = meter
            .u64_counter(IMPRESSIONS_NAME)
            .with_description("The number of evaluations for a given flag")
            .with_attribute_keys([
                semconv::FEATURE_FLAG_KEY,
                semconv::FEATURE_FLAG_VARIANT,
                FEATURE_FLAG_REASON_KEY,
            ])
            .build()?;
        let impressions = tracked(registered, impressions);
        let reasons = meter
            .u64_counter(REASONS_NAME)
            .with_description("The number of evaluations for a given reason")
            .with_attribute_keys([
                semconv::FEATURE_FLAG_PROVIDER_NAME,
                FEATURE_FLAG_REASON_KEY,
                EXCEPTION_TYPE_KEY,
            ])
            .build()?;
        let reasons = tracked(registered, reasons);

        Ok(Metrics {
            http_request_duration,
            http_response_size,
            http_requests_inflight,
            impressions,
            reasons,
        })
    }

    pub fn request_duration_histogram(&self) -> &Histogram {
        &self.http_request_duration
    }

    pub fn response_size_histogram(&self) -> &Histogram {
        &self.http_response_size
    }
}

impl MetricsRecorder for Metrics {
    fn http_request_duration(&self, duration: Duration, attributes: &[KeyValue]) {
        self.http_request_duration
            .record(duration.as_secs_f64(), attributes);
    }

    fn http_response_size(&self, size_bytes: i64, attributes: &[KeyValue]) {
        self.http_response_size.record(size_bytes as f64, attributes);
    }

    fn in_flight_request_start(&self, attributes: &[KeyValue]) {
        self.http_requests_inflight.add(1, attributes);
    }

    fn in_flight_request_end(&self, attributes: &[KeyValue]) {
        self.http_requests_inflight.add(-1, attributes);
    }

    fn impressions(&self, reason: &str, variant: &str, flag_key: &str) {
        self.impressions
            .add(1, &impression_attributes(reason, variant, flag_key));
    }

    fn reasons(&self, reason: &str, error: Option<&dyn Error>) {
        self.reasons.add(1, &reason_attributes(reason, error));
    }
}

/// Recorder that discards every measurement.
///
/// Used when metrics could not be initialized but the service should keep running.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl NoopMetrics {
    pub fn new() -> Self {
        NoopMetrics
    }
}

impl MetricsRecorder for NoopMetrics {
    fn http_request_duration(&self, _duration: Duration, _attributes: &[KeyValue]) {}

    fn http_response_size(&self, _size_bytes: i64, _attributes: &[KeyValue]) {}

    fn in_flight_request_start(&self, _attributes: &[KeyValue]) {}

    fn in_flight_request_end(&self, _attributes: &[KeyValue]) {}

    fn impressions(&self, _reason: &str, _variant: &str, _flag_key: &str) {}

    fn reasons(&self, _reason: &str, _error: Option<&dyn Error>) {}
}
