//! Call envelope: the metric lifecycle around one remote call.
//!
//! [`CallEnvelope`] owns the handles for one call family (entered and
//! exited counters, in-flight gauge, latency timers) and wraps
//! downstream work in the full bookkeeping. Two shapes share one
//! finalization path:
//!
//! - [`CallEnvelope::call`] for downstream work that completes before
//!   returning. Scopes open and close around the closure.
//! - [`CallEnvelope::call_deferred`] for a downstream future. Scopes
//!   open and the entered counter increments immediately; the returned
//!   [`InstrumentedCall`] finalizes when the inner future resolves.
//!
//! Finalization runs on every exit path: normal return, error return,
//! panic unwind, and cancellation by dropping a pending wrapped future.
//! The exited counter increments exactly once per wrapped call. The
//! in-flight gauge stays raised for as long as a call is genuinely
//! outstanding, so a downstream that never resolves shows up as a stuck
//! gauge rather than being papered over.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use metrics::Unit;
use pin_project_lite::pin_project;
use tracing::warn;

use crate::error::Result;
use crate::registry::{Counter, Gauge, Histogram, InProgressGuard, MetricRegistry};
use crate::telemetry;
use crate::timer::ScopedTimer;

// ============================================================================
// Call identity
// ============================================================================

/// Identity of one remote call, as label values.
///
/// Derived once per call from transport metadata and used only to build
/// label tuples. Bindings construct it; the envelope never inspects it
/// beyond turning it into values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallIdentity {
    host: String,
    controller: String,
    method: Option<String>,
}

impl CallIdentity {
    /// Identity for a call addressed by full gRPC method path.
    ///
    /// `"/helloworld.Greeter/SayHello"` yields the controller
    /// `"helloworld.Greeter"`; the method label keeps the full path.
    /// A path without enough `/`-separated segments degrades to an
    /// `"unknown"` controller instead of failing the call.
    pub fn from_method_path(host: impl Into<String>, method_path: &str) -> Self {
        let mut segments = method_path.split('/');
        // A leading slash makes the first segment empty; the service
        // name is the second segment either way.
        let controller = match (segments.next(), segments.next()) {
            (Some(_), Some(service)) => service.to_string(),
            _ => {
                warn!(method_path, "unparseable method path, labelling controller as unknown");
                telemetry::UNKNOWN_CONTROLLER.to_string()
            }
        };
        Self {
            host: host.into(),
            controller,
            method: Some(method_path.to_string()),
        }
    }

    /// Identity for a call addressed by service and bare method name.
    pub fn from_service_method(
        host: impl Into<String>,
        service: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            controller: service.into(),
            method: Some(method.into()),
        }
    }

    /// Identity for a call addressed by request path only.
    pub fn from_path(host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            controller: path.into(),
            method: None,
        }
    }

    /// Host label value.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Controller label value (service name or request path).
    pub fn controller(&self) -> &str {
        &self.controller
    }

    /// Method label value, absent for path-only identities.
    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    /// Label values in schema order.
    fn label_values(&self) -> Vec<String> {
        let mut values = vec![self.host.clone(), self.controller.clone()];
        if let Some(method) = &self.method {
            values.push(method.clone());
        }
        values
    }
}

// ============================================================================
// Outcome status
// ============================================================================

/// Reads an outcome status label from a completed call's value.
///
/// Implemented by result types that carry their own status (a gRPC
/// response, a numeric HTTP status code). Returning `None` makes the
/// envelope fall back to a fixed marker:
/// [`telemetry::STATUS_SUCCESS`] on the immediate path,
/// [`telemetry::STATUS_UNKNOWN`] on the deferred path, where the
/// outcome is read after the fact and may carry nothing.
pub trait StatusSource {
    /// Status label for this completed value, if it carries one.
    fn status_label(&self) -> Option<String>;
}

impl StatusSource for &str {
    fn status_label(&self) -> Option<String> {
        Some((*self).to_string())
    }
}

impl StatusSource for String {
    fn status_label(&self) -> Option<String> {
        Some(self.clone())
    }
}

/// Unit results carry no status; the envelope's marker applies.
impl StatusSource for () {
    fn status_label(&self) -> Option<String> {
        None
    }
}

// ============================================================================
// Envelope
// ============================================================================

/// Metric names for one call family.
///
/// Bindings fill this from [`crate::telemetry`] constants; tests can
/// use their own names.
#[derive(Debug, Clone, Copy)]
pub struct EnvelopeNames {
    /// Counter of calls entered, incremented before the downstream runs.
    pub entered: &'static str,
    /// Counter of calls exited, labelled by outcome status.
    pub exited: &'static str,
    /// Gauge of calls currently in flight.
    pub in_flight: &'static str,
    /// Histogram of call latency in seconds.
    pub latency: &'static str,
    /// Optional gauge of the most recent call's latency in milliseconds.
    pub last_latency: Option<&'static str>,
}

const DESC_ENTERED: &str = "Calls entered, counted before the downstream runs";
const DESC_EXITED: &str = "Calls exited, labelled by outcome status";
const DESC_IN_FLIGHT: &str = "Calls currently in flight";
const DESC_LATENCY: &str = "Call latency in seconds";
const DESC_LAST_LATENCY: &str = "Latency of the most recent call, in milliseconds";

/// The metric lifecycle engine for one call family.
///
/// Created once per transport binding and shared across calls. Wrapping
/// takes no locks: concurrent calls hit the same handles, whose thread
/// safety is the `metrics` facade's contract.
pub struct CallEnvelope {
    entered: Counter,
    exited: Counter,
    in_flight: Gauge,
    latency: Histogram,
    last_latency: Option<Gauge>,
}

impl CallEnvelope {
    /// Create the family's handles in `registry`.
    ///
    /// `schema` is the base label schema; the exited counter extends it
    /// with a trailing `status` label.
    pub fn new(
        registry: &MetricRegistry,
        names: EnvelopeNames,
        schema: &[&'static str],
    ) -> Result<Self> {
        let mut exited_schema = schema.to_vec();
        exited_schema.push(telemetry::LABEL_STATUS);

        Ok(Self {
            entered: registry.counter(names.entered, DESC_ENTERED, schema)?,
            exited: registry.counter(names.exited, DESC_EXITED, &exited_schema)?,
            in_flight: registry.gauge(names.in_flight, None, DESC_IN_FLIGHT, schema)?,
            latency: registry.histogram(
                names.latency,
                Some(Unit::Seconds),
                DESC_LATENCY,
                schema,
            )?,
            last_latency: names
                .last_latency
                .map(|name| {
                    registry.gauge(name, Some(Unit::Milliseconds), DESC_LAST_LATENCY, schema)
                })
                .transpose()?,
        })
    }

    /// Wrap downstream work that completes before returning.
    ///
    /// Opens the scopes, counts the call as entered, runs `downstream`,
    /// and records the exit labelled with the outcome's own status
    /// (falling back to [`telemetry::STATUS_SUCCESS`]) or
    /// [`telemetry::STATUS_EXCEPTION`] for an error. The downstream's
    /// result is returned unchanged; errors are never wrapped or
    /// swallowed. A panic in `downstream` releases every scope and
    /// records an `"exception"` exit while unwinding.
    ///
    /// # Panics
    ///
    /// Panics if `identity` carries a different number of label values
    /// than the schema this envelope was built with.
    pub fn call<F, T, E>(
        &self,
        identity: &CallIdentity,
        downstream: F,
    ) -> std::result::Result<T, E>
    where
        F: FnOnce() -> std::result::Result<T, E>,
        T: StatusSource,
    {
        let finalizer = self.begin(identity);
        let result = downstream();
        match &result {
            Ok(value) => {
                let status = value.status_label();
                finalizer.complete(status.as_deref().unwrap_or(telemetry::STATUS_SUCCESS));
            }
            Err(_) => finalizer.complete(telemetry::STATUS_EXCEPTION),
        }
        result
    }

    /// Wrap a downstream future, finalizing when it resolves.
    ///
    /// Scopes open and the entered counter increments now, before the
    /// future is first polled. The returned [`InstrumentedCall`]
    /// resolves to exactly the inner future's output; an `Ok` exit is
    /// labelled with the value's own status (falling back to
    /// [`telemetry::STATUS_UNKNOWN`]), an `Err` exit with
    /// [`telemetry::STATUS_EXCEPTION`]. Dropping the wrapper before it
    /// resolves counts as an `"exception"` exit and releases the
    /// scopes; a wrapper that is never dropped and never resolves keeps
    /// the in-flight gauge raised.
    ///
    /// # Panics
    ///
    /// Panics if `identity` carries a different number of label values
    /// than the schema this envelope was built with.
    pub fn call_deferred<F, T, E>(
        &self,
        identity: &CallIdentity,
        downstream: F,
    ) -> InstrumentedCall<F>
    where
        F: Future<Output = std::result::Result<T, E>>,
        T: StatusSource,
    {
        InstrumentedCall {
            inner: downstream,
            finalizer: Some(self.begin(identity)),
        }
    }

    /// Open the call's scopes and count it as entered.
    fn begin(&self, identity: &CallIdentity) -> CallFinalizer {
        let values = identity.label_values();
        // In-progress scope is outermost, then the seconds timer, then
        // the milliseconds timer. Release happens innermost-first.
        let in_progress = self.in_flight.track_in_progress(&values);
        let timer = self.latency.start_timer(&values);
        let last_timer = self
            .last_latency
            .as_ref()
            .map(|gauge| gauge.start_millis_timer(&values));
        self.entered.increment(&values);
        CallFinalizer {
            exited: self.exited.clone(),
            values,
            done: false,
            last_timer,
            timer,
            in_progress,
        }
    }
}

// ============================================================================
// Finalization
// ============================================================================

/// Completion bookkeeping for one call, run exactly once.
///
/// `complete` records the real outcome. If the call never completes
/// (panic unwind, or a cancelled deferred call) `Drop` records an
/// `"exception"` exit instead. Field order fixes release order: the
/// milliseconds timer drops first, then the seconds timer, then the
/// in-progress guard.
struct CallFinalizer {
    exited: Counter,
    values: Vec<String>,
    done: bool,
    last_timer: Option<ScopedTimer>,
    timer: ScopedTimer,
    in_progress: InProgressGuard,
}

impl CallFinalizer {
    /// Record the exit and release the scopes.
    fn complete(mut self, status: &str) {
        self.record_exit(status);
        // Scopes release as `self` drops here.
    }

    fn record_exit(&mut self, status: &str) {
        if self.done {
            return;
        }
        self.done = true;
        let mut values = std::mem::take(&mut self.values);
        values.push(status.to_string());
        self.exited.increment(&values);
    }
}

impl Drop for CallFinalizer {
    fn drop(&mut self) {
        // Reached with `done` unset only when the call unwound or was
        // cancelled mid-flight.
        self.record_exit(telemetry::STATUS_EXCEPTION);
    }
}

pin_project! {
    /// A wrapped downstream call; resolves to the inner future's output.
    ///
    /// Created by [`CallEnvelope::call_deferred`]. Completion
    /// bookkeeping runs when the inner future resolves; dropping the
    /// wrapper before that counts as a faulted exit.
    #[must_use = "futures do nothing unless you `.await` or poll them"]
    pub struct InstrumentedCall<F> {
        #[pin]
        inner: F,
        finalizer: Option<CallFinalizer>,
    }
}

impl<F> InstrumentedCall<F> {
    /// Wrap without any bookkeeping. Used for excluded paths, where the
    /// downstream must run exactly as if it were never wrapped.
    pub(crate) fn passthrough(inner: F) -> Self {
        Self {
            inner,
            finalizer: None,
        }
    }
}

impl<F, T, E> Future for InstrumentedCall<F>
where
    F: Future<Output = std::result::Result<T, E>>,
    T: StatusSource,
{
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let output = ready!(this.inner.poll(cx));
        if let Some(finalizer) = this.finalizer.take() {
            match &output {
                Ok(value) => {
                    let status = value.status_label();
                    finalizer.complete(status.as_deref().unwrap_or(telemetry::STATUS_UNKNOWN));
                }
                Err(_) => finalizer.complete(telemetry::STATUS_EXCEPTION),
            }
        }
        Poll::Ready(output)
    }
}
