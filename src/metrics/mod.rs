//! Metrics provisioning and recording.
//!
//! This module provides the service metrics recorder and the small
//! provider/meter/instrument layer it is built on.

pub mod attributes;
pub mod instrument;
pub mod provider;
pub mod recorder;
pub mod resource;
pub mod semconv;
pub mod view;

pub use attributes::{exception_type, feature_flag_reason, http_attributes};
pub use opentelemetry::{Key, KeyValue};
pub use provider::{Meter, MeterProvider};
pub use recorder::{EvaluationOutcome, Metrics, MetricsRecorder, NoopMetrics};
pub use resource::Resource;
pub use view::View;
