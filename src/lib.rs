//! Bifrost - Call-boundary metrics for gRPC and HTTP services
//!
//! This crate wraps unary RPC calls and HTTP requests with latency,
//! throughput, and concurrency metrics, without the call sites knowing
//! anything about metric plumbing. Everything records through the
//! [`metrics`] facade: install any recorder (prometheus, statsd, ...)
//! and the call families show up there; without one, every update is a
//! no-op.
//!
//! # Blocking Call Example
//!
//! ```rust
//! use bifrost::grpc::ClientMetrics;
//! use bifrost::{MetricRegistry, MetricsConfig};
//!
//! fn main() -> bifrost::Result<()> {
//!     let registry = MetricRegistry::new();
//!     let config = MetricsConfig::new().host("billing-api");
//!     let metrics = ClientMetrics::new(&registry, &config)?;
//!
//!     // Runs exactly as if the call were made directly; the wrapper
//!     // counts it, times it, and tracks it in flight.
//!     let reply: Result<&str, std::io::Error> =
//!         metrics.wrap_blocking("Greeter", "SayHello", || Ok("done"));
//!     assert_eq!(reply.unwrap(), "done");
//!     Ok(())
//! }
//! ```
//!
//! # Deferred Call Example
//!
//! Futures are wrapped instead of executed: the wrapper resolves to the
//! inner output and finalizes the metrics when the call does.
//!
//! ```rust,no_run
//! use bifrost::{HttpMetrics, MetricRegistry, MetricsConfig};
//!
//! # async fn handle(http: &HttpMetrics) {
//! let status = http
//!     .wrap("/api/v1/transfers", async {
//!         Ok::<u16, std::io::Error>(200)
//!     })
//!     .await;
//! assert_eq!(status.unwrap(), 200);
//! # }
//! ```

pub mod config;
pub mod envelope;
pub mod error;
#[cfg(feature = "grpc")]
pub mod grpc;
pub mod http;
pub mod registry;
pub mod telemetry;
pub mod timer;

// Re-export main types at crate root
pub use config::{MetricsConfig, host_from_env};
pub use envelope::{CallEnvelope, CallIdentity, EnvelopeNames, InstrumentedCall, StatusSource};
pub use error::{MetricsError, Result};
pub use http::HttpMetrics;
pub use registry::{Counter, Gauge, Histogram, InProgressGuard, MetricRegistry};
pub use timer::ScopedTimer;
