//! Metrics initialization for the owning process.
//!
//! Builds the recorder from configuration and applies the failure policy:
//! either stop startup, or log the error and continue with a recorder that
//! discards measurements.

use std::sync::Arc;

use prometheus::Registry;
use tracing::{error, info};

use crate::config::{ConfigV1, MetricsConfig};
use crate::error::Result;
use crate::metrics::{Metrics, MetricsRecorder, NoopMetrics};
use crate::utils::logger::init_logging;

/// Creates the recorder shared by all request handlers.
///
/// # Errors
///
/// Returns the construction error only when `fail_fast` is set.
pub fn init_metrics(config: &MetricsConfig, registry: Registry) -> Result<Arc<dyn MetricsRecorder>> {
    match Metrics::new(registry, config.resource(), &config.service_name) {
        Ok(metrics) => Ok(Arc::new(metrics)),
        Err(e) if config.fail_fast => Err(e),
        Err(e) => {
            error!(
                service_name = %config.service_name,
                "Failed to initialize metrics, recording disabled: {}", e
            );
            Ok(Arc::new(NoopMetrics::new()))
        }
    }
}

/// Installs logging and builds the recorder from a loaded configuration.
pub fn init(config: &ConfigV1, registry: Registry) -> Result<Arc<dyn MetricsRecorder>> {
    init_logging(&config.logging, &config.metrics.resource())?;
    info!("Initializing metrics for {}", config.metrics.service_name);
    init_metrics(&config.metrics, registry)
}
