#![cfg(feature = "grpc")]

//! Tests for the gRPC transport bindings.

use std::io;

use metrics_util::MetricKind;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};
use tokio_test::task;
use tokio_test::{assert_pending, assert_ready};

use bifrost::grpc::{ClientMetrics, ServerMetrics, code_label};
use bifrost::{MetricRegistry, MetricsConfig, telemetry};

// ============================================================================
// Snapshot type alias for readability
// ============================================================================

type SnapshotVec = Vec<(
    metrics_util::CompositeKey,
    Option<metrics::Unit>,
    Option<metrics::SharedString>,
    DebugValue,
)>;

// ============================================================================
// Helpers
// ============================================================================

fn labels_match(key: &metrics::Key, labels: &[(&str, &str)]) -> bool {
    labels.iter().all(|(name, value)| {
        key.labels()
            .any(|label| label.key() == *name && label.value() == *value)
    })
}

fn counter_total(snapshot: &SnapshotVec, name: &str, labels: &[(&str, &str)]) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| {
            key.kind() == MetricKind::Counter
                && key.key().name() == name
                && labels_match(key.key(), labels)
        })
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

fn gauge_value(snapshot: &SnapshotVec, name: &str) -> Option<f64> {
    snapshot.iter().find_map(|(key, _, _, value)| {
        if key.kind() == MetricKind::Gauge && key.key().name() == name {
            match value {
                DebugValue::Gauge(v) => Some(v.into_inner()),
                _ => None,
            }
        } else {
            None
        }
    })
}

fn has_histogram(snapshot: &SnapshotVec, name: &str) -> bool {
    snapshot
        .iter()
        .any(|(key, _, _, _)| key.kind() == MetricKind::Histogram && key.key().name() == name)
}

fn config() -> MetricsConfig {
    MetricsConfig::new().host("svc1")
}

// ============================================================================
// Server side
// ============================================================================

#[test]
fn server_unary_success_records_family() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let registry = MetricRegistry::new();
    let metrics = ServerMetrics::new(&registry, &config()).unwrap();

    let reply = metrics::with_local_recorder(&recorder, || {
        let call = metrics.wrap_unary("/helloworld.Greeter/SayHello", async {
            Ok::<_, tonic::Status>(tonic::Response::new("hi"))
        });
        let mut call = task::spawn(call);
        assert_ready!(call.poll())
    });
    assert_eq!(*reply.unwrap().get_ref(), "hi");

    let snapshot = snapshotter.snapshot().into_vec();
    let call_labels = [
        ("host", "svc1"),
        ("controller", "helloworld.Greeter"),
        ("method", "/helloworld.Greeter/SayHello"),
    ];
    assert_eq!(
        counter_total(&snapshot, telemetry::GRPC_SERVER_CALL_IN_COUNT, &call_labels),
        1
    );
    // A response that came back is an OK exit.
    assert_eq!(
        counter_total(
            &snapshot,
            telemetry::GRPC_SERVER_CALL_OUT_COUNT,
            &[("status", "OK")]
        ),
        1
    );
    assert_eq!(
        gauge_value(&snapshot, telemetry::GRPC_SERVER_CALL_PROCESS_COUNT),
        Some(0.0)
    );
    assert!(has_histogram(&snapshot, telemetry::GRPC_SERVER_CALL_DELAY_SEC));
}

#[test]
fn server_unary_error_records_exception_and_passes_status_through() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let registry = MetricRegistry::new();
    let metrics = ServerMetrics::new(&registry, &config()).unwrap();

    let reply: Result<tonic::Response<&str>, tonic::Status> =
        metrics::with_local_recorder(&recorder, || {
            let call = metrics.wrap_unary("/helloworld.Greeter/SayHello", async {
                Err(tonic::Status::not_found("no greeting"))
            });
            let mut call = task::spawn(call);
            assert_ready!(call.poll())
        });
    // The status travels back unchanged.
    let status = reply.unwrap_err();
    assert_eq!(status.code(), tonic::Code::NotFound);
    assert_eq!(status.message(), "no greeting");

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(
        counter_total(
            &snapshot,
            telemetry::GRPC_SERVER_CALL_OUT_COUNT,
            &[("status", "exception")]
        ),
        1
    );
    assert_eq!(
        gauge_value(&snapshot, telemetry::GRPC_SERVER_CALL_PROCESS_COUNT),
        Some(0.0)
    );
}

#[test]
fn server_malformed_method_path_labels_unknown_controller() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let registry = MetricRegistry::new();
    let metrics = ServerMetrics::new(&registry, &config()).unwrap();

    metrics::with_local_recorder(&recorder, || {
        let call = metrics.wrap_unary("SayHello", async {
            Ok::<_, tonic::Status>(tonic::Response::new(()))
        });
        let mut call = task::spawn(call);
        assert_ready!(call.poll()).unwrap();
    });

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(
        counter_total(
            &snapshot,
            telemetry::GRPC_SERVER_CALL_IN_COUNT,
            &[("controller", "unknown"), ("method", "SayHello")]
        ),
        1
    );
}

#[test]
fn server_pending_call_shows_in_flight() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let registry = MetricRegistry::new();
    let metrics = ServerMetrics::new(&registry, &config()).unwrap();

    let (_tx, rx) = tokio::sync::oneshot::channel::<Result<tonic::Response<()>, tonic::Status>>();
    metrics::with_local_recorder(&recorder, || {
        let call = metrics.wrap_unary("/helloworld.Greeter/SayHello", async move {
            rx.await.expect("sender dropped")
        });
        let mut call = task::spawn(call);
        assert_pending!(call.poll());

        // Still pending: in flight, nothing finalized.
        let snapshot = snapshotter.snapshot().into_vec();
        assert_eq!(
            gauge_value(&snapshot, telemetry::GRPC_SERVER_CALL_PROCESS_COUNT),
            Some(1.0)
        );
        assert_eq!(
            counter_total(&snapshot, telemetry::GRPC_SERVER_CALL_OUT_COUNT, &[]),
            0
        );
    });
}

// ============================================================================
// Client side
// ============================================================================

#[test]
fn client_blocking_success_records_ok() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let registry = MetricRegistry::new();
    let metrics = ClientMetrics::new(&registry, &config()).unwrap();

    let reply = metrics::with_local_recorder(&recorder, || {
        metrics.wrap_blocking("Greeter", "SayHello", || {
            Ok::<_, tonic::Status>(tonic::Response::new(42))
        })
    });
    assert_eq!(*reply.unwrap().get_ref(), 42);

    let snapshot = snapshotter.snapshot().into_vec();
    let call_labels = [
        ("host", "svc1"),
        ("controller", "Greeter"),
        ("method", "SayHello"),
    ];
    assert_eq!(
        counter_total(&snapshot, telemetry::GRPC_CLIENT_CALL_IN_COUNT, &call_labels),
        1
    );
    assert_eq!(
        counter_total(
            &snapshot,
            telemetry::GRPC_CLIENT_CALL_OUT_COUNT,
            &[("status", "OK")]
        ),
        1
    );
    assert!(has_histogram(&snapshot, telemetry::GRPC_CLIENT_CALL_DELAY_SEC));
}

#[test]
fn client_blocking_error_records_exception() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let registry = MetricRegistry::new();
    let metrics = ClientMetrics::new(&registry, &config()).unwrap();

    let reply: Result<tonic::Response<()>, tonic::Status> =
        metrics::with_local_recorder(&recorder, || {
            metrics.wrap_blocking("Greeter", "SayHello", || {
                Err(tonic::Status::unavailable("connection refused"))
            })
        });
    assert_eq!(reply.unwrap_err().code(), tonic::Code::Unavailable);

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(
        counter_total(
            &snapshot,
            telemetry::GRPC_CLIENT_CALL_OUT_COUNT,
            &[("status", "exception")]
        ),
        1
    );
    assert_eq!(
        gauge_value(&snapshot, telemetry::GRPC_CLIENT_CALL_PROCESS_COUNT),
        Some(0.0)
    );
}

#[test]
fn client_deferred_call_finalizes_on_resolution() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let registry = MetricRegistry::new();
    let metrics = ClientMetrics::new(&registry, &config()).unwrap();

    let (tx, rx) = tokio::sync::oneshot::channel();
    metrics::with_local_recorder(&recorder, || {
        let call = metrics.wrap("Greeter", "SayHello", async move {
            rx.await.expect("sender dropped")
        });
        let mut call = task::spawn(call);
        assert_pending!(call.poll());

        tx.send(Ok::<_, tonic::Status>(tonic::Response::new("done")))
            .expect("receiver dropped");
        assert_ready!(call.poll()).unwrap();
    });

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(
        counter_total(&snapshot, telemetry::GRPC_CLIENT_CALL_IN_COUNT, &[]),
        1
    );
    assert_eq!(
        counter_total(
            &snapshot,
            telemetry::GRPC_CLIENT_CALL_OUT_COUNT,
            &[("status", "OK")]
        ),
        1
    );
    assert_eq!(
        gauge_value(&snapshot, telemetry::GRPC_CLIENT_CALL_PROCESS_COUNT),
        Some(0.0)
    );
}

#[test]
fn server_and_client_families_are_distinct() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let registry = MetricRegistry::new();
    let server = ServerMetrics::new(&registry, &config()).unwrap();
    let client = ClientMetrics::new(&registry, &config()).unwrap();

    metrics::with_local_recorder(&recorder, || {
        let call = server.wrap_unary("/helloworld.Greeter/SayHello", async {
            Ok::<_, tonic::Status>(tonic::Response::new(()))
        });
        assert_ready!(task::spawn(call).poll()).unwrap();

        client
            .wrap_blocking("Greeter", "SayHello", || {
                Ok::<_, tonic::Status>(tonic::Response::new(()))
            })
            .unwrap();
    });

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(
        counter_total(&snapshot, telemetry::GRPC_SERVER_CALL_IN_COUNT, &[]),
        1
    );
    assert_eq!(
        counter_total(&snapshot, telemetry::GRPC_CLIENT_CALL_IN_COUNT, &[]),
        1
    );
}

// ============================================================================
// Code labels
// ============================================================================

#[test]
fn code_labels_match_dashboard_names() {
    assert_eq!(code_label(tonic::Code::Ok), "OK");
    assert_eq!(code_label(tonic::Code::NotFound), "NotFound");
    assert_eq!(code_label(tonic::Code::DeadlineExceeded), "DeadlineExceeded");
    assert_eq!(code_label(tonic::Code::Unavailable), "Unavailable");
    assert_eq!(code_label(tonic::Code::Unauthenticated), "Unauthenticated");
}

#[test]
fn metrics_are_noop_without_recorder() {
    // Verify no panics when no recorder is installed.
    let registry = MetricRegistry::new();
    let client = ClientMetrics::new(&registry, &config()).unwrap();
    let reply = client.wrap_blocking("Greeter", "SayHello", || {
        Ok::<_, io::Error>(tonic::Response::new(()))
    });
    assert!(reply.is_ok());
}
