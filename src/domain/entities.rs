//! Domain Entities - Core business objects
//!
//! These entities represent the requests, records and messages that flow
//! through the deferrer. They have no I/O and contain only data rules.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cross-origin mode of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    SameOrigin,
    #[default]
    NoCors,
    Cors,
    Navigate,
}

impl RequestMode {
    /// Parse the `sec-fetch-mode` vocabulary. Unknown values map to the default.
    pub fn from_fetch_mode(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "same-origin" => Self::SameOrigin,
            "cors" => Self::Cors,
            "navigate" => Self::Navigate,
            _ => Self::default(),
        }
    }
}

/// Whether credentials (cookies, authorization) travel with the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialsPolicy {
    Omit,
    SameOrigin,
    #[default]
    Include,
}

/// HTTP cache interaction requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CachePolicy {
    #[default]
    Default,
    NoStore,
    Reload,
    NoCache,
    ForceCache,
    OnlyIfCached,
}

impl CachePolicy {
    /// Policies that must bypass intermediate caches on replay.
    pub fn bypasses_cache(&self) -> bool {
        matches!(self, Self::NoStore | Self::Reload | Self::NoCache)
    }
}

/// How redirects are handled when the request is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RedirectPolicy {
    #[default]
    Follow,
    Error,
    Manual,
}

/// Referrer value meaning "use the client default".
pub const DEFAULT_REFERRER: &str = "about:client";

/// A live outgoing request, as seen by the interceptor.
///
/// Headers keep their wire order and may repeat. The body is reference
/// counted, so handing a copy to the serializer never consumes the
/// caller's request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub mode: RequestMode,
    pub credentials: CredentialsPolicy,
    pub cache: CachePolicy,
    pub redirect: RedirectPolicy,
    pub referrer: String,
    pub body: Bytes,
}

impl OutgoingRequest {
    /// Create a request with default policies, no headers and no body.
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: Vec::new(),
            mode: RequestMode::default(),
            credentials: CredentialsPolicy::default(),
            cache: CachePolicy::default(),
            redirect: RedirectPolicy::default(),
            referrer: DEFAULT_REFERRER.to_string(),
            body: Bytes::new(),
        }
    }

    /// Append a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Replace the body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// First value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Deferred Request Record.
///
/// Immutable snapshot of a mutating request awaiting replay. This is the
/// JSON form persisted in the queue store. `body` is absent for GET and
/// HEAD requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferredRequest {
    pub method: String,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub mode: RequestMode,
    #[serde(default)]
    pub credentials: CredentialsPolicy,
    #[serde(default)]
    pub cache: CachePolicy,
    #[serde(default)]
    pub redirect: RedirectPolicy,
    #[serde(default = "default_referrer")]
    pub referrer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

fn default_referrer() -> String {
    DEFAULT_REFERRER.to_string()
}

/// Response produced by a transport (or synthesized by the interceptor).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Synthetic acceptance returned to a caller whose request was deferred.
    pub fn accepted() -> Self {
        Self {
            status: 202,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Bytes::from_static(b"{}"),
        }
    }

    /// First value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Parsed response payload.
    ///
    /// JSON bodies are parsed; any other body becomes a JSON string of its
    /// text, and an empty body becomes `null`.
    pub fn payload(&self) -> serde_json::Value {
        if self.body.is_empty() {
            return serde_json::Value::Null;
        }
        serde_json::from_slice(&self.body).unwrap_or_else(|_| {
            serde_json::Value::String(String::from_utf8_lossy(&self.body).into_owned())
        })
    }
}

/// Broadcast sent to a listener endpoint after a successful replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayMessage {
    pub replayed: bool,
    pub url: String,
    pub payload: serde_json::Value,
}

impl ReplayMessage {
    pub fn new(url: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            replayed: true,
            url: url.into(),
            payload,
        }
    }
}

/// A listener endpoint as enumerated by a notify port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerEndpoint {
    pub id: String,
    /// Whether the endpoint reports itself foregrounded/focused
    pub focused: bool,
}

/// Outcome counters of one flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FlushReport {
    /// Records taken from the live queue by the reservation step
    pub attempted: usize,
    /// Records delivered with status < 400
    pub delivered: usize,
    /// Records appended back to the live queue
    pub requeued: usize,
    /// Records dropped after a 4xx response
    pub dropped: usize,
    /// Another flush was already running; nothing was done
    pub skipped: bool,
}

impl FlushReport {
    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Default::default()
        }
    }
}

/// Event that may start a flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerEvent {
    /// Periodic timer tick, gated on the connectivity probe
    Tick,
    /// Inbound `{online}` signal
    Connectivity { online: bool },
    /// Direct caller invocation
    Manual,
}
