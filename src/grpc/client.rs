//! Client-side unary call instrumentation.

use std::future::Future;

use crate::config::MetricsConfig;
use crate::envelope::{CallEnvelope, CallIdentity, EnvelopeNames, InstrumentedCall, StatusSource};
use crate::error::Result;
use crate::registry::MetricRegistry;
use crate::telemetry;

/// Metrics around outbound unary calls.
///
/// Two wrapping shapes cover the ways a call can be driven:
/// [`wrap_blocking`](Self::wrap_blocking) for calls completed before
/// returning, and [`wrap`](Self::wrap) for call futures the caller
/// awaits. Unlike the server side, the controller and method labels are
/// supplied directly; an outbound call site knows what it is calling.
pub struct ClientMetrics {
    envelope: CallEnvelope,
    host: String,
}

impl ClientMetrics {
    /// Create the client-side call family in `registry`.
    pub fn new(registry: &MetricRegistry, config: &MetricsConfig) -> Result<Self> {
        let envelope = CallEnvelope::new(
            registry,
            EnvelopeNames {
                entered: telemetry::GRPC_CLIENT_CALL_IN_COUNT,
                exited: telemetry::GRPC_CLIENT_CALL_OUT_COUNT,
                in_flight: telemetry::GRPC_CLIENT_CALL_PROCESS_COUNT,
                latency: telemetry::GRPC_CLIENT_CALL_DELAY_SEC,
                last_latency: None,
            },
            &telemetry::RPC_LABELS,
        )?;
        Ok(Self {
            envelope,
            host: config.host.clone(),
        })
    }

    /// Wrap an outbound call that completes before returning.
    ///
    /// The call's result is returned unchanged. A returned
    /// `tonic::Response` exits as `"OK"`; an error exits as
    /// `"exception"`.
    pub fn wrap_blocking<F, T, E>(
        &self,
        service: &str,
        method: &str,
        call: F,
    ) -> std::result::Result<T, E>
    where
        F: FnOnce() -> std::result::Result<T, E>,
        T: StatusSource,
    {
        let identity = CallIdentity::from_service_method(&self.host, service, method);
        self.envelope.call(&identity, call)
    }

    /// Wrap an outbound call future.
    ///
    /// Scopes open now; finalization runs when the call future
    /// resolves, not when this returns. Dropping the returned future
    /// before it resolves counts as an `"exception"` exit.
    pub fn wrap<F, T, E>(&self, service: &str, method: &str, call: F) -> InstrumentedCall<F>
    where
        F: Future<Output = std::result::Result<T, E>>,
        T: StatusSource,
    {
        let identity = CallIdentity::from_service_method(&self.host, service, method);
        self.envelope.call_deferred(&identity, call)
    }
}
