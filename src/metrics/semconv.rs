//! Semantic-convention attribute keys used by the recorder.

use opentelemetry::{Key, KeyValue};

pub const SERVICE_NAME: Key = Key::from_static_str("service.name");
pub const SERVICE_VERSION: Key = Key::from_static_str("service.version");

pub const HTTP_URL: Key = Key::from_static_str("http.url");
pub const HTTP_METHOD: Key = Key::from_static_str("http.method");
pub const HTTP_STATUS_CODE: Key = Key::from_static_str("http.status_code");

pub const FEATURE_FLAG_KEY: Key = Key::from_static_str("feature_flag.key");
pub const FEATURE_FLAG_VARIANT: Key = Key::from_static_str("feature_flag.variant");
pub const FEATURE_FLAG_PROVIDER_NAME: Key = Key::from_static_str("feature_flag.provider_name");

/// Identity of an evaluated flag: its key and the variant it resolved to.
pub fn feature_flag_attributes(flag_key: &str, variant: &str) -> Vec<KeyValue> {
    vec![
        KeyValue::new(FEATURE_FLAG_KEY, flag_key.to_string()),
        KeyValue::new(FEATURE_FLAG_VARIANT, variant.to_string()),
    ]
}
