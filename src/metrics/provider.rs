//! Provider, meters and instrument builders over a Prometheus registry.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use opentelemetry::Key;
use prometheus::{IntGauge, Opts, Registry};
use tracing::warn;

use super::instrument::{Counter, Histogram, Instrument, InstrumentDescriptor, UpDownCounter};
use super::resource::Resource;
use super::view::View;
use crate::error::Result;

/// Owns the measurement sink and the registered views.
#[derive(Clone)]
pub struct MeterProvider {
    registry: Registry,
    views: Arc<[View]>,
}

impl fmt::Debug for MeterProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeterProvider")
            .field("views", &self.views)
            .finish_non_exhaustive()
    }
}

pub struct MeterProviderBuilder {
    registry: Registry,
    resource: Resource,
    views: Vec<View>,
}

impl MeterProvider {
    /// Starts a provider that records into `registry`.
    pub fn builder(registry: Registry) -> MeterProviderBuilder {
        MeterProviderBuilder {
            registry,
            resource: Resource::default(),
            views: Vec::new(),
        }
    }

    /// Derives a meter whose instruments are namespaced by `scope`.
    pub fn meter(&self, scope: impl Into<String>) -> Meter {
        Meter {
            scope: scope.into(),
            registry: self.registry.clone(),
            views: self.views.clone(),
        }
    }
}

impl MeterProviderBuilder {
    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resource = resource;
        self
    }

    pub fn with_view(mut self, view: View) -> Self {
        self.views.push(view);
        self
    }

    /// Publishes the resource as `target_info` and freezes the views.
    pub fn build(self) -> MeterProvider {
        publish_resource(&self.registry, &self.resource);
        MeterProvider {
            registry: self.registry,
            views: self.views.into(),
        }
    }
}

/// Registers `target_info` for the resource. The resource is metadata, so a
/// series the registry cannot take (invalid label, or a label set differing
/// from an already published resource) is skipped with a warning.
fn publish_resource(registry: &Registry, resource: &Resource) {
    let labels = resource.target_labels();
    if labels.is_empty() {
        return;
    }

    let info = match IntGauge::with_opts(Opts::new("target_info", "Target metadata").const_labels(labels)) {
        Ok(info) => info,
        Err(e) => {
            warn!("Skipping target_info, resource is not a valid label set: {}", e);
            return;
        }
    };
    info.set(1);

    match registry.register(Box::new(info)) {
        // Same resource already published by another provider on this registry.
        Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
        Err(e) => warn!("Skipping target_info for this resource: {}", e),
    }
}

/// Creates instruments within a single scope.
#[derive(Clone)]
pub struct Meter {
    scope: String,
    registry: Registry,
    views: Arc<[View]>,
}

impl fmt::Debug for Meter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Meter")
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl Meter {
    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub(crate) fn registry(&self) -> &Registry {
        &self.registry
    }

    pub(crate) fn views(&self) -> &[View] {
        &self.views
    }

    pub fn f64_histogram(&self, name: impl Into<String>) -> InstrumentBuilder<'_, Histogram> {
        InstrumentBuilder::new(self, name.into())
    }

    pub fn u64_counter(&self, name: impl Into<String>) -> InstrumentBuilder<'_, Counter> {
        InstrumentBuilder::new(self, name.into())
    }

    pub fn i64_up_down_counter(
        &self,
        name: impl Into<String>,
    ) -> InstrumentBuilder<'_, UpDownCounter> {
        InstrumentBuilder::new(self, name.into())
    }
}

/// Collects an instrument's descriptor before registering it.
pub struct InstrumentBuilder<'a, I> {
    meter: &'a Meter,
    name: String,
    description: String,
    unit: Option<String>,
    attribute_keys: Vec<Key>,
    _kind: PhantomData<I>,
}

impl<'a, I: Instrument> InstrumentBuilder<'a, I> {
    fn new(meter: &'a Meter, name: String) -> Self {
        InstrumentBuilder {
            meter,
            name,
            description: String::new(),
            unit: None,
            attribute_keys: Vec::new(),
            _kind: PhantomData,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Attribute keys this instrument accepts. Anything else is dropped.
    pub fn with_attribute_keys(mut self, keys: impl IntoIterator<Item = Key>) -> Self {
        self.attribute_keys = keys.into_iter().collect();
        self
    }

    pub fn build(self) -> Result<I> {
        let descriptor = InstrumentDescriptor {
            name: self.name,
            description: self.description,
            unit: self.unit,
            scope: self.meter.scope.clone(),
        };
        I::create(self.meter, descriptor, self.attribute_keys)
    }
}
