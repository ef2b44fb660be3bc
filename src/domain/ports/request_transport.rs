//! Request Transport Port
//!
//! Defines the interface used to actually send a request over the network.

use crate::domain::entities::{OutgoingRequest, TransportResponse};
use crate::domain::errors::TransportError;
use async_trait::async_trait;

/// Sends a request and returns whatever response the remote end produced.
///
/// Any HTTP status is an `Ok` response; only failures to complete the
/// exchange (unreachable host, reset, DNS) are errors.
#[async_trait]
pub trait RequestTransport: Send + Sync {
    async fn send(&self, request: OutgoingRequest) -> Result<TransportResponse, TransportError>;
}
