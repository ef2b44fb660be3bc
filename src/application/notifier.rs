//! Notifier - best-effort broadcast of replay outcomes

use crate::domain::entities::ReplayMessage;
use crate::domain::ports::NotifyPort;
use std::sync::Arc;

/// Delivers replay results to exactly one listener endpoint.
///
/// Selection: the first focused endpoint; otherwise the first enumerated
/// endpoint; otherwise the message is dropped.
#[derive(Clone)]
pub struct Notifier {
    port: Arc<dyn NotifyPort>,
}

impl Notifier {
    pub fn new(port: Arc<dyn NotifyPort>) -> Self {
        Self { port }
    }

    /// Broadcast a message. Never fails and never retries.
    pub async fn broadcast(&self, message: &ReplayMessage) {
        let endpoints = self.port.endpoints().await;

        let target = endpoints
            .iter()
            .find(|e| e.focused)
            .or_else(|| endpoints.first());

        match target {
            Some(endpoint) => {
                tracing::debug!(endpoint = %endpoint.id, url = %message.url, "notifying listener");
                self.port.post(endpoint, message).await;
            }
            None => {
                tracing::debug!(url = %message.url, "no listener endpoints, dropping notification");
            }
        }
    }
}
