//! Domain Errors
//!
//! Failures crossing the port boundaries. Delivery outcomes (server and
//! client errors) are not errors here; they are classified responses.

use thiserror::Error;

/// Queue store read or write failed.
///
/// Not recovered locally: it aborts the enclosing enqueue or flush.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),

    #[error("stored queue is not valid JSON: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Request could not be exchanged with the remote end.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Unreachable, DNS failure, connection reset, timeout
    #[error("transport failure: {0}")]
    Unreachable(String),

    /// The request could not be built (bad URL, bad header)
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Failure surfaced by the interceptor to its host.
#[derive(Debug, Error)]
pub enum InterceptError {
    /// Pass-through (GET/HEAD) request failed; nothing is deferred for these
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Deferring a failed mutating request could not be persisted
    #[error(transparent)]
    Store(#[from] StoreError),
}
