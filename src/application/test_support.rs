//! Test doubles shared by the application tests.

use crate::domain::entities::{
    DeferredRequest, ListenerEndpoint, OutgoingRequest, ReplayMessage, TransportResponse,
};
use crate::domain::errors::TransportError;
use crate::domain::ports::{NotifyPort, RequestTransport};
use crate::domain::services::RequestCodec;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// A POST record for `url` with a small JSON body.
pub fn record(url: &str) -> DeferredRequest {
    RequestCodec::serialize(
        &OutgoingRequest::new("POST", url)
            .with_header("content-type", "application/json")
            .with_body(r#"{"n":1}"#),
    )
}

/// Scripted reaction of the transport for one URL.
#[derive(Debug, Clone)]
pub enum Scripted {
    Status(u16, &'static str),
    Delayed(Duration, u16),
    Unreachable,
}

/// Transport answering from a per-URL script (default: 200 `{}`).
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<String, Scripted>>,
    sent: Mutex<Vec<OutgoingRequest>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, url: &str, scripted: Scripted) {
        self.scripts.lock().insert(url.to_string(), scripted);
    }

    pub fn calls(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn sent_urls(&self) -> Vec<String> {
        self.sent.lock().iter().map(|r| r.url.clone()).collect()
    }

    pub fn sent_requests(&self) -> Vec<OutgoingRequest> {
        self.sent.lock().clone()
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RequestTransport for ScriptedTransport {
    async fn send(&self, request: OutgoingRequest) -> Result<TransportResponse, TransportError> {
        let scripted = self
            .scripts
            .lock()
            .get(&request.url)
            .cloned()
            .unwrap_or(Scripted::Status(200, "{}"));
        self.sent.lock().push(request);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let result = match scripted {
            Scripted::Status(status, body) => Ok(TransportResponse::new(status, body)),
            Scripted::Delayed(delay, status) => {
                tokio::time::sleep(delay).await;
                Ok(TransportResponse::new(status, "{}"))
            }
            Scripted::Unreachable => Err(TransportError::Unreachable(
                "connection refused".to_string(),
            )),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Notify port with a fixed endpoint list that records every post.
pub struct RecordingNotifyPort {
    endpoints: Vec<ListenerEndpoint>,
    messages: Mutex<Vec<(String, ReplayMessage)>>,
}

impl RecordingNotifyPort {
    pub fn with_endpoints(endpoints: Vec<ListenerEndpoint>) -> Self {
        Self {
            endpoints,
            messages: Mutex::new(Vec::new()),
        }
    }

    pub fn messages(&self) -> Vec<(String, ReplayMessage)> {
        self.messages.lock().clone()
    }
}

#[async_trait]
impl NotifyPort for RecordingNotifyPort {
    async fn endpoints(&self) -> Vec<ListenerEndpoint> {
        self.endpoints.clone()
    }

    async fn post(&self, endpoint: &ListenerEndpoint, message: &ReplayMessage) {
        self.messages
            .lock()
            .push((endpoint.id.clone(), message.clone()));
    }
}
