//! Error types for metrics construction, configuration and logging setup.
//!
//! Recording operations never fail; everything here is raised while the
//! recorder and its surroundings are being built.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("service name must not be empty")]
    EmptyServiceName,

    #[error("invalid histogram buckets for '{name}': {source}")]
    Buckets {
        name: String,
        #[source]
        source: prometheus::Error,
    },

    #[error("failed to create instrument '{name}' in scope '{scope}': {source}")]
    Instrument {
        name: String,
        scope: String,
        #[source]
        source: prometheus::Error,
    },

    #[error("configuration error: {0}")]
    Config(#[from] figment::Error),

    #[error("logging setup failed: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, MetricsError>;
