//! Typed instrument handles backed by Prometheus metric vectors.
//!
//! Each handle is bound to one scope (carried as the `otel_scope_name` const
//! label) and a fixed list of attribute keys that become its label names.
//! Handles are cheap to clone and safe to record on from many threads.

use std::borrow::Cow;
use std::fmt;

use opentelemetry::{Key, KeyValue};
use prometheus::core::Collector;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts};
use tracing::debug;

use super::attributes::last_value;
use super::provider::Meter;
use super::view::{histogram_boundaries, validate_boundaries};
use crate::error::{MetricsError, Result};
use crate::utils::label::sanitize_label_name;

/// Const label carrying the instrumentation scope.
pub const SCOPE_LABEL: &str = "otel_scope_name";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentDescriptor {
    pub name: String,
    pub description: String,
    pub unit: Option<String>,
    pub scope: String,
}

/// An instrument kind that a [`Meter`] knows how to register.
pub trait Instrument: Sized {
    fn create(meter: &Meter, descriptor: InstrumentDescriptor, keys: Vec<Key>) -> Result<Self>;

    /// Handle on the registered collector, used to unregister it again.
    fn collector(&self) -> Box<dyn Collector>;
}

#[derive(Debug, Clone)]
struct LabelSchema {
    keys: Vec<Key>,
    names: Vec<String>,
}

impl LabelSchema {
    fn new(keys: Vec<Key>) -> Self {
        let names = keys.iter().map(|k| sanitize_label_name(k.as_str())).collect();
        LabelSchema { keys, names }
    }

    fn names(&self) -> Vec<&str> {
        self.names.iter().map(String::as_str).collect()
    }

    /// Label values in schema order. Missing keys record as empty values.
    fn values<'a>(&self, instrument: &str, attributes: &'a [KeyValue]) -> Vec<Cow<'a, str>> {
        for kv in attributes {
            if !self.keys.contains(&kv.key) {
                debug!(
                    instrument = instrument,
                    attribute = kv.key.as_str(),
                    "Dropping attribute not declared by instrument"
                );
            }
        }
        self.keys
            .iter()
            .map(|key| last_value(attributes, key).unwrap_or(Cow::Borrowed("")))
            .collect()
    }
}

fn common_opts(descriptor: &InstrumentDescriptor) -> Opts {
    Opts::new(descriptor.name.clone(), descriptor.description.clone())
        .const_label(SCOPE_LABEL, descriptor.scope.clone())
}

fn instrument_error(descriptor: &InstrumentDescriptor, source: prometheus::Error) -> MetricsError {
    MetricsError::Instrument {
        name: descriptor.name.clone(),
        scope: descriptor.scope.clone(),
        source,
    }
}

fn register<C>(meter: &Meter, descriptor: &InstrumentDescriptor, collector: C) -> Result<()>
where
    C: Collector + 'static,
{
    meter
        .registry()
        .register(Box::new(collector))
        .map_err(|e| instrument_error(descriptor, e))
}

macro_rules! with_values {
    ($self:ident, $attributes:ident) => {{
        let values = $self.schema.values(&$self.descriptor.name, $attributes);
        let values: Vec<&str> = values.iter().map(|v| v.as_ref()).collect();
        $self.inner.with_label_values(&values)
    }};
}

/// Distribution of `f64` measurements.
#[derive(Clone)]
pub struct Histogram {
    descriptor: InstrumentDescriptor,
    schema: LabelSchema,
    inner: HistogramVec,
}

impl Instrument for Histogram {
    fn create(meter: &Meter, descriptor: InstrumentDescriptor, keys: Vec<Key>) -> Result<Self> {
        let schema = LabelSchema::new(keys);
        let buckets = histogram_boundaries(meter.views(), &descriptor.name, &descriptor.scope);
        // Prometheus only checks buckets when the first series is created.
        validate_boundaries(&buckets).map_err(|msg| MetricsError::Buckets {
            name: descriptor.name.clone(),
            source: prometheus::Error::Msg(msg),
        })?;
        let opts = HistogramOpts {
            common_opts: common_opts(&descriptor),
            buckets,
        };
        let inner =
            HistogramVec::new(opts, &schema.names()).map_err(|e| instrument_error(&descriptor, e))?;
        register(meter, &descriptor, inner.clone())?;
        Ok(Histogram {
            descriptor,
            schema,
            inner,
        })
    }

    fn collector(&self) -> Box<dyn Collector> {
        Box::new(self.inner.clone())
    }
}

impl Histogram {
    pub fn record(&self, value: f64, attributes: &[KeyValue]) {
        with_values!(self, attributes).observe(value);
    }

    pub fn descriptor(&self) -> &InstrumentDescriptor {
        &self.descriptor
    }
}

/// Monotonic `u64` sum.
#[derive(Clone)]
pub struct Counter {
    descriptor: InstrumentDescriptor,
    schema: LabelSchema,
    inner: IntCounterVec,
}

impl Instrument for Counter {
    fn create(meter: &Meter, descriptor: InstrumentDescriptor, keys: Vec<Key>) -> Result<Self> {
        let schema = LabelSchema::new(keys);
        let inner = IntCounterVec::new(common_opts(&descriptor), &schema.names())
            .map_err(|e| instrument_error(&descriptor, e))?;
        register(meter, &descriptor, inner.clone())?;
        Ok(Counter {
            descriptor,
            schema,
            inner,
        })
    }

    fn collector(&self) -> Box<dyn Collector> {
        Box::new(self.inner.clone())
    }
}

impl Counter {
    pub fn add(&self, value: u64, attributes: &[KeyValue]) {
        with_values!(self, attributes).inc_by(value);
    }
}

/// `i64` sum that may go up or down. Never clamped at zero.
#[derive(Clone)]
pub struct UpDownCounter {
    descriptor: InstrumentDescriptor,
    schema: LabelSchema,
    inner: IntGaugeVec,
}

impl Instrument for UpDownCounter {
    fn create(meter: &Meter, descriptor: InstrumentDescriptor, keys: Vec<Key>) -> Result<Self> {
        let schema = LabelSchema::new(keys);
        let inner = IntGaugeVec::new(common_opts(&descriptor), &schema.names())
            .map_err(|e| instrument_error(&descriptor, e))?;
        register(meter, &descriptor, inner.clone())?;
        Ok(UpDownCounter {
            descriptor,
            schema,
            inner,
        })
    }

    fn collector(&self) -> Box<dyn Collector> {
        Box::new(self.inner.clone())
    }
}

impl UpDownCounter {
    pub fn add(&self, value: i64, attributes: &[KeyValue]) {
        with_values!(self, attributes).add(value);
    }
}

macro_rules! impl_instrument_debug {
    ($($kind:ident),+) => {
        $(
            impl fmt::Debug for $kind {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.debug_struct(stringify!($kind))
                        .field("descriptor", &self.descriptor)
                        .field("labels", &self.schema.names)
                        .finish()
                }
            }
        )+
    };
}

impl_instrument_debug!(Histogram, Counter, UpDownCounter);
