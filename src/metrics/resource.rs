//! Identity of the process emitting telemetry.

use std::collections::HashMap;

use opentelemetry::KeyValue;

use super::semconv;
use crate::utils::label::sanitize_label_name;

/// Resource descriptor supplied by the owning process.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resource {
    attributes: Vec<KeyValue>,
}

impl Resource {
    pub fn new(attributes: impl IntoIterator<Item = KeyValue>) -> Self {
        Resource {
            attributes: attributes.into_iter().collect(),
        }
    }

    /// Resource carrying `service.name` and, when given, `service.version`.
    pub fn for_service(name: &str, version: Option<&str>) -> Self {
        let mut attributes = vec![KeyValue::new(semconv::SERVICE_NAME, name.to_string())];
        if let Some(version) = version {
            attributes.push(KeyValue::new(semconv::SERVICE_VERSION, version.to_string()));
        }
        Resource { attributes }
    }

    /// Returns the resource extended by `kv`.
    pub fn with(mut self, kv: KeyValue) -> Self {
        self.attributes.push(kv);
        self
    }

    pub fn attributes(&self) -> &[KeyValue] {
        &self.attributes
    }

    /// Const labels for the `target_info` series. Later attributes override
    /// earlier ones that sanitize to the same label; empty values are skipped.
    pub(crate) fn target_labels(&self) -> HashMap<String, String> {
        self.attributes
            .iter()
            .map(|kv| (sanitize_label_name(kv.key.as_str()), kv.value.as_str().into_owned()))
            .filter(|(_, value)| !value.is_empty())
            .collect()
    }
}
