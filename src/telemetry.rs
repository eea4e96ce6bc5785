//! Telemetry metric name constants.
//!
//! Centralised metric names for every call family bifrost records.
//! Consumers install their own `metrics` recorder (e.g. prometheus,
//! statsd); without a recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `bifrost_` followed by the call side
//! (`grpc_server`, `grpc_client`, `http_server`). Latency histograms
//! record seconds. The one `_last` gauge records milliseconds; the
//! `_sec` in its name predates the unit and is kept so existing
//! dashboards stay valid.
//!
//! # Common labels
//!
//! - `host`: reporting process identity (see [`crate::host_from_env`])
//! - `controller`: service name parsed from the call target
//! - `method`: full method path (server) or bare method name (client)
//! - `path`: HTTP request path
//! - `status`: a call's own status string, or one of [`STATUS_SUCCESS`],
//!   [`STATUS_EXCEPTION`], [`STATUS_UNKNOWN`]

/// Inbound unary calls entered.
///
/// Labels: `host`, `controller`, `method`.
pub const GRPC_SERVER_CALL_IN_COUNT: &str = "bifrost_grpc_server_call_in_count";

/// Inbound unary calls exited.
///
/// Labels: `host`, `controller`, `method`, `status`.
pub const GRPC_SERVER_CALL_OUT_COUNT: &str = "bifrost_grpc_server_call_out_count";

/// Inbound unary calls currently in flight.
///
/// Labels: `host`, `controller`, `method`.
pub const GRPC_SERVER_CALL_PROCESS_COUNT: &str = "bifrost_grpc_server_call_process_count";

/// Inbound unary call latency in seconds.
///
/// Labels: `host`, `controller`, `method`.
pub const GRPC_SERVER_CALL_DELAY_SEC: &str = "bifrost_grpc_server_call_delay_sec";

/// Outbound unary calls entered.
///
/// Labels: `host`, `controller`, `method`.
pub const GRPC_CLIENT_CALL_IN_COUNT: &str = "bifrost_grpc_client_call_in_count";

/// Outbound unary calls exited.
///
/// Labels: `host`, `controller`, `method`, `status`.
pub const GRPC_CLIENT_CALL_OUT_COUNT: &str = "bifrost_grpc_client_call_out_count";

/// Outbound unary calls currently in flight.
///
/// Labels: `host`, `controller`, `method`.
pub const GRPC_CLIENT_CALL_PROCESS_COUNT: &str = "bifrost_grpc_client_call_process_count";

/// Outbound unary call latency in seconds.
///
/// Labels: `host`, `controller`, `method`.
pub const GRPC_CLIENT_CALL_DELAY_SEC: &str = "bifrost_grpc_client_call_delay_sec";

/// HTTP requests entered.
///
/// Labels: `host`, `path`.
pub const HTTP_SERVER_CALL_IN_COUNT: &str = "bifrost_http_server_call_in_count";

/// HTTP requests exited.
///
/// Labels: `host`, `path`, `status`.
pub const HTTP_SERVER_CALL_OUT_COUNT: &str = "bifrost_http_server_call_out_count";

/// HTTP requests currently in flight.
///
/// Labels: `host`, `path`.
pub const HTTP_SERVER_CALL_PROCESS_COUNT: &str = "bifrost_http_server_call_process_count";

/// HTTP request latency in seconds.
///
/// Labels: `host`, `path`.
pub const HTTP_SERVER_CALL_DELAY_SEC: &str = "bifrost_http_server_call_delay_sec";

/// Latency of the most recent HTTP request, in milliseconds.
///
/// Labels: `host`, `path`.
pub const HTTP_SERVER_CALL_DELAY_SEC_LAST: &str = "bifrost_http_server_call_delay_sec_last";

// ============================================================================
// Label keys and status markers
// ============================================================================

/// Reporting process identity.
pub const LABEL_HOST: &str = "host";
/// Service name parsed from the call target.
pub const LABEL_CONTROLLER: &str = "controller";
/// Method path (server side) or bare method name (client side).
pub const LABEL_METHOD: &str = "method";
/// HTTP request path.
pub const LABEL_PATH: &str = "path";
/// Call outcome, present only on `_out_count` counters.
pub const LABEL_STATUS: &str = "status";

/// Label schema for RPC call families.
pub const RPC_LABELS: [&str; 3] = [LABEL_HOST, LABEL_CONTROLLER, LABEL_METHOD];
/// Label schema for HTTP call families.
pub const PATH_LABELS: [&str; 2] = [LABEL_HOST, LABEL_PATH];

/// Status marker: call returned without error and carried no status of
/// its own.
pub const STATUS_SUCCESS: &str = "success";
/// Status marker: call failed, panicked, or was cancelled mid-flight.
pub const STATUS_EXCEPTION: &str = "exception";
/// Status marker: call completed but its outcome metadata was absent.
pub const STATUS_UNKNOWN: &str = "unknown";

/// Controller label used when a call target cannot be parsed.
pub const UNKNOWN_CONTROLLER: &str = "unknown";
