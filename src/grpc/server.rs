//! Server-side unary call instrumentation.

use std::future::Future;

use crate::config::MetricsConfig;
use crate::envelope::{CallEnvelope, CallIdentity, EnvelopeNames, InstrumentedCall, StatusSource};
use crate::error::Result;
use crate::registry::MetricRegistry;
use crate::telemetry;

/// Metrics around inbound unary calls.
///
/// Created once at server startup; `wrap_unary` goes around each
/// handler invocation and never alters its output:
///
/// ```rust
/// use bifrost::grpc::ServerMetrics;
/// use bifrost::{MetricRegistry, MetricsConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let registry = MetricRegistry::new();
/// let metrics = ServerMetrics::new(&registry, &MetricsConfig::new().host("greeter"))?;
///
/// let reply = metrics
///     .wrap_unary("/helloworld.Greeter/SayHello", async {
///         Ok::<_, tonic::Status>(tonic::Response::new("hello"))
///     })
///     .await?;
/// assert_eq!(*reply.get_ref(), "hello");
/// # Ok(())
/// # }
/// ```
pub struct ServerMetrics {
    envelope: CallEnvelope,
    host: String,
}

impl ServerMetrics {
    /// Create the server-side call family in `registry`.
    pub fn new(registry: &MetricRegistry, config: &MetricsConfig) -> Result<Self> {
        let envelope = CallEnvelope::new(
            registry,
            EnvelopeNames {
                entered: telemetry::GRPC_SERVER_CALL_IN_COUNT,
                exited: telemetry::GRPC_SERVER_CALL_OUT_COUNT,
                in_flight: telemetry::GRPC_SERVER_CALL_PROCESS_COUNT,
                latency: telemetry::GRPC_SERVER_CALL_DELAY_SEC,
                last_latency: None,
            },
            &telemetry::RPC_LABELS,
        )?;
        Ok(Self {
            envelope,
            host: config.host.clone(),
        })
    }

    /// Wrap one inbound unary handler invocation.
    ///
    /// `method_path` is the full gRPC method path as tonic reports it
    /// (`"/package.Service/Method"`). The controller label is the
    /// service segment; a malformed path degrades to an `"unknown"`
    /// controller instead of failing the call. The method label keeps
    /// the full path.
    pub fn wrap_unary<F, T, E>(&self, method_path: &str, handler: F) -> InstrumentedCall<F>
    where
        F: Future<Output = std::result::Result<T, E>>,
        T: StatusSource,
    {
        let identity = CallIdentity::from_method_path(&self.host, method_path);
        self.envelope.call_deferred(&identity, handler)
    }
}
