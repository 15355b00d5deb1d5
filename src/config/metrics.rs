use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use opentelemetry::KeyValue;

use crate::metrics::Resource;

/// Identity of the service whose metrics are recorded, and how to react
/// when the recorder cannot be built.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
pub struct MetricsConfig {
    /// Scope of every instrument, also reported as `service.name`.
    pub service_name: String,
    pub service_version: Option<String>,
    /// Extra resource attributes, e.g. `deployment.environment: prod`.
    #[serde(default)]
    pub resource: BTreeMap<String, String>,
    /// Abort startup instead of falling back to a no-op recorder.
    #[serde(default)]
    pub fail_fast: bool,
}

impl MetricsConfig {
    /// Resource descriptor: service name, optional version, then the extra
    /// attributes in key order.
    pub fn resource(&self) -> Resource {
        let base = Resource::for_service(&self.service_name, self.service_version.as_deref());
        self.resource
            .iter()
            .fold(base, |resource, (key, value)| {
                resource.with(KeyValue::new(key.clone(), value.clone()))
            })
    }
}
