use std::path::Path;

use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use super::logging::LoggingConfig;
use super::metrics::MetricsConfig;
use crate::error::Result;

/// Prefix of environment variables overriding file values,
/// e.g. `FLAGD_METRICS_METRICS__SERVICE_NAME`.
pub const ENV_PREFIX: &str = "FLAGD_METRICS_";

/// A top-level enum for versioned configurations.
#[derive(Deserialize, Serialize, JsonSchema)]
#[serde(tag = "version")]
pub enum Config {
    #[serde(rename = "1.0.0")]
    ConfigV1(ConfigV1),
}

/// Main config for v1.0.0.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
pub struct ConfigV1 {
    #[serde(default)]
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

/// Load config from a YAML file named "config.yaml" in the current directory.
pub fn load_config() -> Result<ConfigV1> {
    load_config_from("./config.yaml")
}

/// Load config from `path`, with `FLAGD_METRICS_*` environment overrides.
pub fn load_config_from(path: impl AsRef<Path>) -> Result<ConfigV1> {
    let figment = Figment::new()
        .merge(Yaml::file(path.as_ref()))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));
    match figment.extract::<Config>()? {
        Config::ConfigV1(c) => Ok(c),
    }
}

/// JSON schema of the configuration file.
pub fn schema() -> String {
    let schema = schema_for!(Config);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    const CONFIG: &str = r#"
version: "1.0.0"
logging:
  level: "debug"
  format: "console"
metrics:
  service_name: "flagd"
  service_version: "0.9.0"
  resource:
    deployment.environment: "staging"
"#;

    #[test]
    fn test_load_config_from_file() {
        Jail::expect_with(|jail| {
            jail.create_file("config.yaml", CONFIG)?;

            let config = load_config().map_err(|e| e.to_string())?;
            assert_eq!(config.logging.level, "debug");
            assert_eq!(config.logging.format, "console");
            assert_eq!(config.metrics.service_name, "flagd");
            assert_eq!(config.metrics.service_version.as_deref(), Some("0.9.0"));
            assert_eq!(
                config.metrics.resource.get("deployment.environment").map(String::as_str),
                Some("staging")
            );
            assert!(!config.metrics.fail_fast);
            Ok(())
        });
    }

    /// Environment variables override values from the file.
    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("metrics.yaml", CONFIG)?;
            jail.set_env("FLAGD_METRICS_METRICS__SERVICE_NAME", "flagd-proxy");
            jail.set_env("FLAGD_METRICS_METRICS__FAIL_FAST", "true");

            let config = load_config_from("metrics.yaml").map_err(|e| e.to_string())?;
            assert_eq!(config.metrics.service_name, "flagd-proxy");
            assert!(config.metrics.fail_fast);
            Ok(())
        });
    }

    /// Logging falls back to info/json when omitted.
    #[test]
    fn test_logging_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                "version: \"1.0.0\"\nmetrics:\n  service_name: flagd\n",
            )?;

            let config = load_config().map_err(|e| e.to_string())?;
            assert_eq!(config.logging, LoggingConfig::default());
            Ok(())
        });
    }

    #[test]
    fn test_unknown_version_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                "version: \"2.0.0\"\nmetrics:\n  service_name: flagd\n",
            )?;

            assert!(load_config().is_err());
            Ok(())
        });
    }

    #[test]
    fn test_schema_mentions_sections() {
        let schema = schema();
        assert!(schema.contains("service_name"));
        assert!(schema.contains("fail_fast"));
    }
}
