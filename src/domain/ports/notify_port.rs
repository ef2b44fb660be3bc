//! Notify Port
//!
//! Defines the interface for broadcasting replay outcomes to listener
//! endpoints.

use crate::domain::entities::{ListenerEndpoint, ReplayMessage};
use async_trait::async_trait;

/// Outbound port to the listener endpoints.
#[async_trait]
pub trait NotifyPort: Send + Sync {
    /// Enumerate the current endpoints, in a stable order.
    async fn endpoints(&self) -> Vec<ListenerEndpoint>;

    /// Deliver a message to one endpoint.
    ///
    /// Fire-and-forget: not acknowledged and never retried. Implementations
    /// log their own failures.
    async fn post(&self, endpoint: &ListenerEndpoint, message: &ReplayMessage);
}
