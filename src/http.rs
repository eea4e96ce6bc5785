//! HTTP request instrumentation.
//!
//! Framework-agnostic: the caller hands over the request path and the
//! handler future, and maps its response to a status via
//! [`StatusSource`] (implemented here for `u16` status codes). There is
//! no middleware type to mount; wrapping the handler call is enough.

use std::future::Future;

use crate::config::MetricsConfig;
use crate::envelope::{CallEnvelope, CallIdentity, EnvelopeNames, InstrumentedCall, StatusSource};
use crate::error::Result;
use crate::registry::MetricRegistry;
use crate::telemetry;

/// Numeric HTTP status codes label exits with their decimal form
/// (`"200"`, `"404"`, ...).
impl StatusSource for u16 {
    fn status_label(&self) -> Option<String> {
        Some(self.to_string())
    }
}

/// Metrics around HTTP request handling, keyed by request path.
///
/// Carries the four standard call families plus a most-recent-latency
/// gauge. Excluded paths (health checks by default) bypass every
/// family:
///
/// ```rust
/// use bifrost::{HttpMetrics, MetricRegistry, MetricsConfig};
///
/// # async fn example() -> bifrost::Result<()> {
/// let registry = MetricRegistry::new();
/// let metrics = HttpMetrics::new(&registry, &MetricsConfig::new().host("billing-api"))?;
///
/// let status = metrics
///     .wrap("/api/v1/transfers", async {
///         Ok::<u16, std::io::Error>(200)
///     })
///     .await;
/// assert_eq!(status.unwrap(), 200);
/// # Ok(())
/// # }
/// ```
pub struct HttpMetrics {
    envelope: CallEnvelope,
    config: MetricsConfig,
}

impl HttpMetrics {
    /// Create the HTTP call family in `registry`.
    pub fn new(registry: &MetricRegistry, config: &MetricsConfig) -> Result<Self> {
        let envelope = CallEnvelope::new(
            registry,
            EnvelopeNames {
                entered: telemetry::HTTP_SERVER_CALL_IN_COUNT,
                exited: telemetry::HTTP_SERVER_CALL_OUT_COUNT,
                in_flight: telemetry::HTTP_SERVER_CALL_PROCESS_COUNT,
                latency: telemetry::HTTP_SERVER_CALL_DELAY_SEC,
                last_latency: Some(telemetry::HTTP_SERVER_CALL_DELAY_SEC_LAST),
            },
            &telemetry::PATH_LABELS,
        )?;
        Ok(Self {
            envelope,
            config: config.clone(),
        })
    }

    /// Wrap one request-handling future.
    ///
    /// Excluded paths run the handler untouched: no counter, gauge, or
    /// timer in any of the five families is updated for them. For
    /// instrumented paths the exit status is the response's own label
    /// (a `u16` handler output yields `"200"`-style statuses), with
    /// errors recorded as `"exception"`.
    pub fn wrap<F, T, E>(&self, path: &str, handler: F) -> InstrumentedCall<F>
    where
        F: Future<Output = std::result::Result<T, E>>,
        T: StatusSource,
    {
        if self.config.is_excluded(path) {
            return InstrumentedCall::passthrough(handler);
        }
        let identity = CallIdentity::from_path(&self.config.host, path);
        self.envelope.call_deferred(&identity, handler)
    }
}
