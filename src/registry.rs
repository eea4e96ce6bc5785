//! Metric registry adapter over the `metrics` facade.
//!
//! [`MetricRegistry`] hands out typed handles keyed by metric name and
//! label schema. Creation is idempotent: asking for the same name with
//! the same kind and schema again yields an equivalent handle, while a
//! conflicting definition fails fast with [`MetricsError`] instead of
//! silently shadowing an existing series.
//!
//! Handles emit through whatever `metrics` recorder is installed at
//! operation time, not at creation time. Without a recorder every
//! operation is a no-op; tests can scope a local recorder around a call
//! and observe exactly what it recorded.
//!
//! Label tuples are positional: every operation takes one value per
//! schema key, in schema order. Arity mismatches are programming errors
//! and panic. Histogram bucket layout is left to the exporter; the call
//! latency histograms only rely on sum and count.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use metrics::{Label, Unit};
use tracing::debug;

use crate::error::{MetricsError, Result};

/// Instrument kinds a metric name can be registered as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InstrumentKind {
    Counter,
    Gauge,
    Histogram,
}

impl InstrumentKind {
    fn as_str(self) -> &'static str {
        match self {
            InstrumentKind::Counter => "counter",
            InstrumentKind::Gauge => "gauge",
            InstrumentKind::Histogram => "histogram",
        }
    }
}

struct Registered {
    kind: InstrumentKind,
    schema: Arc<[&'static str]>,
}

/// Process-wide registry of metric definitions.
///
/// Construct one at startup and pass it to each transport binding; the
/// bindings create their handles once and share them across calls. Two
/// bindings asking for the same definition get interchangeable handles.
#[derive(Default)]
pub struct MetricRegistry {
    metrics: RwLock<HashMap<&'static str, Registered>>,
}

impl MetricRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create a counter.
    ///
    /// Fails with [`MetricsError::KindMismatch`] or
    /// [`MetricsError::SchemaMismatch`] when `name` is already
    /// registered with a different definition.
    pub fn counter(
        &self,
        name: &'static str,
        description: &'static str,
        schema: &[&'static str],
    ) -> Result<Counter> {
        let schema = self.register(name, InstrumentKind::Counter, None, description, schema)?;
        Ok(Counter { name, schema })
    }

    /// Get or create a gauge. `unit` is advertised to the recorder on
    /// first registration.
    pub fn gauge(
        &self,
        name: &'static str,
        unit: Option<Unit>,
        description: &'static str,
        schema: &[&'static str],
    ) -> Result<Gauge> {
        let schema = self.register(name, InstrumentKind::Gauge, unit, description, schema)?;
        Ok(Gauge { name, schema })
    }

    /// Get or create a histogram. `unit` is advertised to the recorder
    /// on first registration.
    pub fn histogram(
        &self,
        name: &'static str,
        unit: Option<Unit>,
        description: &'static str,
        schema: &[&'static str],
    ) -> Result<Histogram> {
        let schema = self.register(name, InstrumentKind::Histogram, unit, description, schema)?;
        Ok(Histogram { name, schema })
    }

    fn register(
        &self,
        name: &'static str,
        kind: InstrumentKind,
        unit: Option<Unit>,
        description: &'static str,
        schema: &[&'static str],
    ) -> Result<Arc<[&'static str]>> {
        let mut metrics = self.metrics.write().expect("metric registry lock poisoned");
        if let Some(existing) = metrics.get(name) {
            if existing.kind != kind {
                return Err(MetricsError::KindMismatch {
                    name,
                    existing: existing.kind.as_str(),
                    requested: kind.as_str(),
                });
            }
            if existing.schema.as_ref() != schema {
                return Err(MetricsError::SchemaMismatch {
                    name,
                    existing: existing.schema.join(", "),
                    requested: schema.join(", "),
                });
            }
            return Ok(existing.schema.clone());
        }

        let schema: Arc<[&'static str]> = Arc::from(schema);
        metrics.insert(
            name,
            Registered {
                kind,
                schema: schema.clone(),
            },
        );
        drop(metrics);

        // Describe once, on first registration.
        match (kind, unit) {
            (InstrumentKind::Counter, Some(unit)) => {
                metrics::describe_counter!(name, unit, description);
            }
            (InstrumentKind::Counter, None) => metrics::describe_counter!(name, description),
            (InstrumentKind::Gauge, Some(unit)) => {
                metrics::describe_gauge!(name, unit, description);
            }
            (InstrumentKind::Gauge, None) => metrics::describe_gauge!(name, description),
            (InstrumentKind::Histogram, Some(unit)) => {
                metrics::describe_histogram!(name, unit, description);
            }
            (InstrumentKind::Histogram, None) => metrics::describe_histogram!(name, description),
        }
        debug!(name, kind = kind.as_str(), "registered metric");
        Ok(schema)
    }
}

/// Zip schema keys with tuple values, enforcing arity.
fn bind(name: &'static str, schema: &[&'static str], values: &[String]) -> Vec<Label> {
    assert_eq!(
        values.len(),
        schema.len(),
        "metric '{name}': label tuple arity {} does not match schema arity {}",
        values.len(),
        schema.len(),
    );
    schema
        .iter()
        .zip(values)
        .map(|(key, value)| Label::new(*key, value.clone()))
        .collect()
}

/// Monotonic counter handle bound to a name and label schema.
#[derive(Debug, Clone)]
pub struct Counter {
    name: &'static str,
    schema: Arc<[&'static str]>,
}

impl Counter {
    /// Increment by one under the given label tuple.
    ///
    /// # Panics
    ///
    /// Panics if `values` does not match the schema arity.
    pub fn increment(&self, values: &[String]) {
        let labels = bind(self.name, &self.schema, values);
        metrics::counter!(self.name, labels).increment(1);
    }
}

/// Gauge handle bound to a name and label schema.
#[derive(Debug, Clone)]
pub struct Gauge {
    name: &'static str,
    schema: Arc<[&'static str]>,
}

impl Gauge {
    /// Set the gauge to `value` under the given label tuple.
    ///
    /// # Panics
    ///
    /// Panics if `values` does not match the schema arity.
    pub fn set(&self, values: &[String], value: f64) {
        let labels = bind(self.name, &self.schema, values);
        metrics::gauge!(self.name, labels).set(value);
    }

    /// Track one unit of in-progress work under the given label tuple.
    ///
    /// Increments the gauge now; the returned guard decrements it when
    /// dropped, on every exit path including unwinding. Concurrent
    /// guards under the same tuple are additive.
    ///
    /// # Panics
    ///
    /// Panics if `values` does not match the schema arity.
    pub fn track_in_progress(&self, values: &[String]) -> InProgressGuard {
        let labels = bind(self.name, &self.schema, values);
        metrics::gauge!(self.name, labels.clone()).increment(1.0);
        InProgressGuard {
            name: self.name,
            labels,
        }
    }

    pub(crate) fn check_arity(&self, values: &[String]) {
        bind(self.name, &self.schema, values);
    }
}

/// Histogram handle bound to a name and label schema.
#[derive(Debug, Clone)]
pub struct Histogram {
    name: &'static str,
    schema: Arc<[&'static str]>,
}

impl Histogram {
    /// Record one observation under the given label tuple.
    ///
    /// # Panics
    ///
    /// Panics if `values` does not match the schema arity.
    pub fn observe(&self, values: &[String], value: f64) {
        let labels = bind(self.name, &self.schema, values);
        metrics::histogram!(self.name, labels).record(value);
    }

    pub(crate) fn check_arity(&self, values: &[String]) {
        bind(self.name, &self.schema, values);
    }
}

/// Decrements its gauge when dropped.
///
/// Returned by [`Gauge::track_in_progress`]; holds the fully bound
/// labels so the decrement hits the same series that was incremented.
#[must_use = "dropping the guard immediately ends the in-progress window"]
#[derive(Debug)]
pub struct InProgressGuard {
    name: &'static str,
    labels: Vec<Label>,
}

impl Drop for InProgressGuard {
    fn drop(&mut self) {
        metrics::gauge!(self.name, self.labels.clone()).decrement(1.0);
    }
}
