//! # Reconciliation Errors
//!
//! Two error types, one per boundary:
//!
//! - [`TransportError`] is what a [`ResourceTransport`](crate::transport::ResourceTransport)
//!   reports for a failed round trip.
//! - [`ReconcileError`] is what the adapter, linker and clients surface to their callers.
//!
//! `ReconcileError` is `Clone` because a single settled get-or-create result is
//! handed to every caller that was coalesced onto it.

use thiserror::Error;

/// Failures reported by a transport implementation.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    /// The store could not be reached (connection refused, timeout, ...).
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The store answered with a non-success status.
    #[error("Store returned status {code}: {message}")]
    Status { code: u16, message: String },

    /// The transport itself has shut down.
    #[error("Transport closed")]
    Closed,
}

/// Errors surfaced by reconciliation operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ReconcileError {
    /// Local validation failed. Raised before any network call; never retried.
    #[error("Invalid resource: {0}")]
    InvalidResource(String),

    /// A received envelope has no usable self link.
    #[error("Identity missing: {0}")]
    IdentityMissing(String),

    /// A caller-supplied id does not resolve on the store.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Network error or non-success response from the store.
    #[error("Remote failure: {0}")]
    RemoteFailure(String),

    /// The task resolving a key panicked or was aborted.
    #[error("Resolution task failed: {0}")]
    TaskFailed(String),
}

impl ReconcileError {
    /// Whether retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ReconcileError::RemoteFailure(_) | ReconcileError::TaskFailed(_)
        )
    }
}

impl From<TransportError> for ReconcileError {
    fn from(e: TransportError) -> Self {
        ReconcileError::RemoteFailure(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_errors_become_remote_failures() {
        let err: ReconcileError = TransportError::Status {
            code: 503,
            message: "maintenance".into(),
        }
        .into();
        assert_eq!(
            err,
            ReconcileError::RemoteFailure("Store returned status 503: maintenance".into())
        );
        assert!(err.is_retryable());
    }

    #[test]
    fn test_local_errors_are_not_retryable() {
        assert!(!ReconcileError::InvalidResource("empty name".into()).is_retryable());
        assert!(!ReconcileError::IdentityMissing("no self".into()).is_retryable());
        assert!(!ReconcileError::NotFound("abc".into()).is_retryable());
    }
}
