//! Webhook Notify Port
//!
//! Listener endpoints register a callback URL (and whether they are
//! currently focused) through the control API. Replay messages are POSTed
//! to the selected endpoint as JSON, fire-and-forget.

use crate::domain::entities::{ListenerEndpoint, ReplayMessage};
use crate::domain::ports::NotifyPort;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// A registered listener endpoint.
#[derive(Debug, Clone)]
pub struct RegisteredListener {
    pub id: String,
    pub url: String,
    pub focused: bool,
    pub registered_at: Instant,
}

/// Listener status as exposed by the control API.
#[derive(Debug, Clone, Serialize)]
pub struct ListenerStatus {
    pub id: String,
    pub url: String,
    pub focused: bool,
    pub registered_secs: u64,
}

/// Registration-ordered set of listener endpoints.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    listeners: Arc<RwLock<Vec<RegisteredListener>>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an endpoint and return its generated id.
    pub fn register(&self, url: impl Into<String>, focused: bool) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.listeners.write().push(RegisteredListener {
            id: id.clone(),
            url: url.into(),
            focused,
            registered_at: Instant::now(),
        });
        id
    }

    pub fn set_focus(&self, id: &str, focused: bool) -> bool {
        match self.listeners.write().iter_mut().find(|l| l.id == id) {
            Some(listener) => {
                listener.focused = focused;
                true
            }
            None => false,
        }
    }

    pub fn deregister(&self, id: &str) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|l| l.id != id);
        listeners.len() != before
    }

    pub fn get(&self, id: &str) -> Option<RegisteredListener> {
        self.listeners.read().iter().find(|l| l.id == id).cloned()
    }

    pub fn list(&self) -> Vec<RegisteredListener> {
        self.listeners.read().clone()
    }

    pub fn statuses(&self) -> Vec<ListenerStatus> {
        let now = Instant::now();
        self.listeners
            .read()
            .iter()
            .map(|l| ListenerStatus {
                id: l.id.clone(),
                url: l.url.clone(),
                focused: l.focused,
                registered_secs: now.duration_since(l.registered_at).as_secs(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }
}

pub struct WebhookNotifyPort {
    registry: ListenerRegistry,
    client: reqwest::Client,
}

impl WebhookNotifyPort {
    pub fn new(registry: ListenerRegistry) -> Self {
        Self {
            registry,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl NotifyPort for WebhookNotifyPort {
    async fn endpoints(&self) -> Vec<ListenerEndpoint> {
        self.registry
            .list()
            .into_iter()
            .map(|l| ListenerEndpoint {
                id: l.id,
                focused: l.focused,
            })
            .collect()
    }

    async fn post(&self, endpoint: &ListenerEndpoint, message: &ReplayMessage) {
        let Some(listener) = self.registry.get(&endpoint.id) else {
            tracing::debug!(endpoint = %endpoint.id, "listener gone before delivery");
            return;
        };

        let request = self.client.post(&listener.url).json(message);
        let id = listener.id;
        tokio::spawn(async move {
            match request.send().await {
                Ok(resp) if resp.status().is_success() => {
                    tracing::debug!(endpoint = %id, "notification delivered");
                }
                Ok(resp) => {
                    tracing::warn!(endpoint = %id, status = %resp.status(), "listener rejected notification");
                }
                Err(e) => {
                    tracing::warn!(endpoint = %id, error = %e, "notification failed");
                }
            }
        });
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_registry_keeps_registration_order() {
        let registry = ListenerRegistry::new();
        let a = registry.register("http://a.local/hook", false);
        let b = registry.register("http://b.local/hook", true);

        let ids: Vec<String> = registry.list().into_iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![a, b]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_registry_focus_and_deregister() {
        let registry = ListenerRegistry::new();
        let id = registry.register("http://a.local/hook", false);

        assert!(registry.set_focus(&id, true));
        assert!(registry.get(&id).unwrap().focused);
        assert!(!registry.set_focus("missing", true));

        assert!(registry.deregister(&id));
        assert!(!registry.deregister(&id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_statuses() {
        let registry = ListenerRegistry::new();
        registry.register("http://a.local/hook", true);

        let statuses = registry.statuses();
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].url, "http://a.local/hook");
        assert!(statuses[0].focused);
    }

    #[tokio::test]
    async fn test_endpoints_mirror_registry() {
        let registry = ListenerRegistry::new();
        let id = registry.register("http://a.local/hook", true);
        let port = WebhookNotifyPort::new(registry);

        let endpoints = port.endpoints().await;
        assert_eq!(endpoints, vec![ListenerEndpoint { id, focused: true }]);
    }

    #[tokio::test]
    async fn test_post_delivers_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let registry = ListenerRegistry::new();
        let id = registry.register(format!("{}/hook", server.uri()), true);
        let port = WebhookNotifyPort::new(registry);
        let message = ReplayMessage::new("http://api.local/a", serde_json::json!({"id": 1}));

        port.post(&ListenerEndpoint { id, focused: true }, &message).await;

        let mut received = Vec::new();
        for _ in 0..50 {
            received = server.received_requests().await.unwrap_or_default();
            if !received.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(received.len(), 1);
        let body: ReplayMessage = serde_json::from_slice(&received[0].body).unwrap();
        assert_eq!(body, message);
    }

    #[tokio::test]
    async fn test_post_to_unknown_endpoint_is_noop() {
        let port = WebhookNotifyPort::new(ListenerRegistry::new());
        let message = ReplayMessage::new("http://api.local/a", serde_json::Value::Null);

        port.post(
            &ListenerEndpoint {
                id: "missing".to_string(),
                focused: false,
            },
            &message,
        )
        .await;
    }
}
