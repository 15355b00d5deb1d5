//! Bucket overrides keyed by instrument name and scope.

/// Buckets used by histograms that no view matches.
pub const DEFAULT_HISTOGRAM_BOUNDARIES: [f64; 15] = [
    0.0, 5.0, 10.0, 25.0, 50.0, 75.0, 100.0, 250.0, 500.0, 750.0, 1000.0, 2500.0, 5000.0, 7500.0,
    10000.0,
];

/// A rule giving one histogram in one scope explicit bucket boundaries.
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    instrument_name: String,
    scope: String,
    boundaries: Vec<f64>,
}

impl View {
    pub fn explicit_buckets(
        instrument_name: impl Into<String>,
        scope: impl Into<String>,
        boundaries: Vec<f64>,
    ) -> Self {
        View {
            instrument_name: instrument_name.into(),
            scope: scope.into(),
            boundaries,
        }
    }

    pub fn matches(&self, instrument_name: &str, scope: &str) -> bool {
        self.instrument_name == instrument_name && self.scope == scope
    }
}

/// Boundaries of the first matching view, otherwise the defaults.
pub(crate) fn histogram_boundaries(views: &[View], instrument_name: &str, scope: &str) -> Vec<f64> {
    views
        .iter()
        .find(|view| view.matches(instrument_name, scope))
        .map(|view| view.boundaries.clone())
        .unwrap_or_else(|| DEFAULT_HISTOGRAM_BOUNDARIES.to_vec())
}

/// Boundaries must be non-empty, finite and strictly increasing. An empty
/// list would make Prometheus substitute its own default buckets.
pub(crate) fn validate_boundaries(boundaries: &[f64]) -> Result<(), String> {
    if boundaries.is_empty() {
        return Err("bucket boundaries must not be empty".to_string());
    }
    if let Some(bad) = boundaries.iter().find(|b| !b.is_finite()) {
        return Err(format!("bucket boundary {} is not finite", bad));
    }
    if boundaries.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err("bucket boundaries must be strictly increasing".to_string());
    }
    Ok(())
}
