//! Intercept Port
//!
//! Defines the interface the host uses to hand an outgoing request to the
//! deferrer before it reaches the network.

use crate::domain::entities::{OutgoingRequest, TransportResponse};
use crate::domain::errors::InterceptError;
use async_trait::async_trait;

/// Inbound port implemented by the interceptor.
#[async_trait]
pub trait InterceptPort: Send + Sync {
    /// Send `request`, deferring it when it is a mutating request that
    /// fails. The returned response is what the original caller sees.
    async fn handle(&self, request: OutgoingRequest) -> Result<TransportResponse, InterceptError>;
}
