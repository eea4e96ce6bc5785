//! gRPC transport bindings.
//!
//! Thin adapters that derive a call identity from tonic call metadata
//! and hand the downstream to the call envelope:
//!
//! - [`ServerMetrics`] wraps inbound unary handler invocations
//! - [`ClientMetrics`] wraps outbound unary calls, blocking or deferred
//!
//! Each side keeps its own call families (`bifrost_grpc_server_*`,
//! `bifrost_grpc_client_*`); a process acting as both records both.

mod client;
mod server;

pub use client::ClientMetrics;
pub use server::ServerMetrics;

use crate::envelope::StatusSource;

/// Status label for a tonic status code.
///
/// Matches the PascalCase code names dashboards key on (`"OK"`,
/// `"NotFound"`, `"DeadlineExceeded"`, ...).
pub fn code_label(code: tonic::Code) -> &'static str {
    match code {
        tonic::Code::Ok => "OK",
        tonic::Code::Cancelled => "Cancelled",
        tonic::Code::Unknown => "Unknown",
        tonic::Code::InvalidArgument => "InvalidArgument",
        tonic::Code::DeadlineExceeded => "DeadlineExceeded",
        tonic::Code::NotFound => "NotFound",
        tonic::Code::AlreadyExists => "AlreadyExists",
        tonic::Code::PermissionDenied => "PermissionDenied",
        tonic::Code::ResourceExhausted => "ResourceExhausted",
        tonic::Code::FailedPrecondition => "FailedPrecondition",
        tonic::Code::Aborted => "Aborted",
        tonic::Code::OutOfRange => "OutOfRange",
        tonic::Code::Unimplemented => "Unimplemented",
        tonic::Code::Internal => "Internal",
        tonic::Code::Unavailable => "Unavailable",
        tonic::Code::DataLoss => "DataLoss",
        tonic::Code::Unauthenticated => "Unauthenticated",
    }
}

/// A tonic response that made it back to the caller is an `OK` exit;
/// failures travel as `tonic::Status` errors instead.
impl<T> StatusSource for tonic::Response<T> {
    fn status_label(&self) -> Option<String> {
        Some(code_label(tonic::Code::Ok).to_string())
    }
}
