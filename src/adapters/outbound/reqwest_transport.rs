//! Reqwest Transport
//!
//! Implements RequestTransport over reqwest. Request policies that a
//! server-side client can honour are mapped onto the outgoing request:
//! - redirect: one client per policy (follow, none, error)
//! - credentials `omit`: `cookie` and `authorization` are stripped
//! - cache `no-store`/`reload`/`no-cache`: `cache-control: no-cache`
//! - referrer: sent as `referer` unless it is the client default
//!
//! No per-attempt timeout is configured.

use crate::domain::entities::{
    CredentialsPolicy, OutgoingRequest, RedirectPolicy, TransportResponse, DEFAULT_REFERRER,
};
use crate::domain::errors::TransportError;
use crate::domain::ports::RequestTransport;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CACHE_CONTROL, REFERER};
use reqwest::{redirect, Client, Method};

/// Headers never forwarded when credentials are omitted.
const CREDENTIAL_HEADERS: &[&str] = &["cookie", "authorization"];

pub struct ReqwestTransport {
    follow: Client,
    manual: Client,
    error: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        let build = |policy: redirect::Policy| {
            Client::builder()
                .redirect(policy)
                .build()
                .map_err(|e| TransportError::InvalidRequest(format!("client error: {}", e)))
        };

        Ok(Self {
            follow: build(redirect::Policy::default())?,
            manual: build(redirect::Policy::none())?,
            error: build(redirect::Policy::custom(|attempt| {
                attempt.error("redirect not allowed")
            }))?,
        })
    }

    fn client(&self, policy: RedirectPolicy) -> &Client {
        match policy {
            RedirectPolicy::Follow => &self.follow,
            RedirectPolicy::Manual => &self.manual,
            RedirectPolicy::Error => &self.error,
        }
    }

    /// Header map actually sent for `request`.
    fn headers(request: &OutgoingRequest) -> Result<HeaderMap, TransportError> {
        let mut headers = HeaderMap::new();

        for (name, value) in &request.headers {
            if request.credentials == CredentialsPolicy::Omit
                && CREDENTIAL_HEADERS.iter().any(|h| name.eq_ignore_ascii_case(h))
            {
                continue;
            }
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TransportError::InvalidRequest(format!("header {}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| TransportError::InvalidRequest(format!("header {}: {}", name, e)))?;
            headers.append(name, value);
        }

        if request.cache.bypasses_cache() && !headers.contains_key(CACHE_CONTROL) {
            headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        }

        let referrer = request.referrer.as_str();
        if !matches!(referrer, "" | DEFAULT_REFERRER | "no-referrer") && !headers.contains_key(REFERER) {
            let value = HeaderValue::from_str(referrer)
                .map_err(|e| TransportError::InvalidRequest(format!("referrer: {}", e)))?;
            headers.insert(REFERER, value);
        }

        Ok(headers)
    }
}

#[async_trait]
impl RequestTransport for ReqwestTransport {
    async fn send(&self, request: OutgoingRequest) -> Result<TransportResponse, TransportError> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| TransportError::InvalidRequest(format!("method {}: {}", request.method, e)))?;
        let headers = Self::headers(&request)?;

        let mut builder = self
            .client(request.redirect)
            .request(method, &request.url)
            .headers(headers);
        if !request.body.is_empty() {
            builder = builder.body(request.body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_builder() {
                TransportError::InvalidRequest(e.to_string())
            } else {
                TransportError::Unreachable(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    String::from_utf8_lossy(v.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Unreachable(format!("reading body: {}", e)))?;

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}
