//! Library exports for flagd-metrics, shared between services and tests.

pub mod config;
pub mod error;
pub mod metrics;
pub mod startup;
pub mod utils;
