//! Bifrost error types

/// Bifrost error types
///
/// All variants are metric-definition errors surfaced at binding
/// construction time. Nothing in the per-call path returns these:
/// wrapped calls never fail because of instrumentation.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// A metric name was registered twice as different instrument kinds
    /// (e.g. first as a counter, then as a gauge).
    #[error("metric '{name}' already registered as {existing}, requested {requested}")]
    KindMismatch {
        name: &'static str,
        existing: &'static str,
        requested: &'static str,
    },

    /// A metric name was registered twice with different label schemas.
    /// The label schema is part of a metric's identity; exporters reject
    /// series that disagree on label keys.
    #[error("metric '{name}' already registered with labels [{existing}], requested [{requested}]")]
    SchemaMismatch {
        name: &'static str,
        existing: String,
        requested: String,
    },
}

/// Result type alias for Bifrost operations
pub type Result<T> = std::result::Result<T, MetricsError>;
