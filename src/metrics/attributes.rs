//! Attribute builders for recorded data points.
//!
//! Attribute lists are built fresh for every recording call and dropped when
//! the call returns. Order is preserved so that two lists built from the same
//! inputs compare equal.

use std::borrow::Cow;

use opentelemetry::{Key, KeyValue};

use super::semconv;

/// Provider name reported on every `reasons` data point.
pub const FLAGD_PROVIDER_NAME: &str = "flagd";

pub const FEATURE_FLAG_REASON_KEY: Key = Key::from_static_str("feature_flag.reason");
pub const EXCEPTION_TYPE_KEY: Key = Key::from_static_str("exception.type");

/// Attributes describing an HTTP exchange: service name, URL, method and
/// status code, in that order.
pub fn http_attributes(
    service_name: &str,
    url: &str,
    method: &str,
    status_code: &str,
) -> Vec<KeyValue> {
    vec![
        KeyValue::new(semconv::SERVICE_NAME, service_name.to_string()),
        KeyValue::new(semconv::HTTP_URL, url.to_string()),
        KeyValue::new(semconv::HTTP_METHOD, method.to_string()),
        KeyValue::new(semconv::HTTP_STATUS_CODE, status_code.to_string()),
    ]
}

/// Why a flag evaluation resolved the way it did (e.g. `STATIC`, `DEFAULT`, `ERROR`).
pub fn feature_flag_reason(reason: &str) -> KeyValue {
    KeyValue::new(FEATURE_FLAG_REASON_KEY, reason.to_string())
}

pub fn exception_type(value: &str) -> KeyValue {
    KeyValue::new(EXCEPTION_TYPE_KEY, value.to_string())
}

/// Value of the last attribute named `key`.
pub(crate) fn last_value<'a>(attributes: &'a [KeyValue], key: &Key) -> Option<Cow<'a, str>> {
    attributes
        .iter()
        .rev()
        .find(|kv| &kv.key == key)
        .map(|kv| kv.value.as_str())
}
