//! Intercepting HTTP Proxy
//!
//! Accepts every request on the proxy listener, rewrites it onto the
//! configured upstream and hands it to the intercept port. The response the
//! port returns (real or synthetic 202) is written back to the caller.

use crate::domain::entities::{OutgoingRequest, RequestMode, TransportResponse, DEFAULT_REFERRER};
use crate::domain::errors::InterceptError;
use crate::domain::ports::InterceptPort;
use crate::infrastructure::ShutdownController;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json, Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Headers that describe a single hop and are never forwarded.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
];

fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| name.eq_ignore_ascii_case(h))
}

/// Proxy state shared by handlers.
#[derive(Clone)]
pub struct ProxyState {
    pub interceptor: Arc<dyn InterceptPort>,
    /// Base URL requests are rewritten onto (no trailing slash)
    pub upstream: String,
    pub max_body_bytes: usize,
}

impl ProxyState {
    pub fn new(interceptor: Arc<dyn InterceptPort>, upstream: &str, max_body_bytes: usize) -> Self {
        Self {
            interceptor,
            upstream: upstream.trim_end_matches('/').to_string(),
            max_body_bytes,
        }
    }
}

pub struct ProxyServer {
    listen_addr: String,
    state: ProxyState,
}

impl ProxyServer {
    pub fn new(listen_addr: String, state: ProxyState) -> Self {
        Self { listen_addr, state }
    }

    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    /// Serve until shutdown is signalled.
    #[cfg_attr(coverage_nightly, coverage(off))]
    pub async fn run(&self, shutdown: ShutdownController) -> anyhow::Result<()> {
        let listener = TcpListener::bind(&self.listen_addr).await?;
        tracing::info!("proxy listening on {} -> {}", self.listen_addr, self.state.upstream);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { shutdown.wait().await })
            .await?;
        Ok(())
    }
}

pub fn router(state: ProxyState) -> Router {
    Router::new()
        .fallback(intercept_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn intercept_handler(State(state): State<ProxyState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();

    let body = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(body) => body,
        Err(e) => {
            return (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response();
        }
    };

    let path = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    let mut outgoing = OutgoingRequest::new(parts.method.as_str(), format!("{}{}", state.upstream, path));
    for (name, value) in parts.headers.iter() {
        if is_hop_by_hop(name.as_str()) {
            continue;
        }
        outgoing.headers.push((
            name.as_str().to_string(),
            String::from_utf8_lossy(value.as_bytes()).into_owned(),
        ));
    }
    let mode = outgoing.header("sec-fetch-mode").map(RequestMode::from_fetch_mode);
    let referrer = outgoing.header("referer").map(str::to_string);
    outgoing.mode = mode.unwrap_or_default();
    outgoing.referrer = referrer.unwrap_or_else(|| DEFAULT_REFERRER.to_string());
    outgoing.body = body;

    match state.interceptor.handle(outgoing).await {
        Ok(response) => into_axum_response(response),
        Err(InterceptError::Transport(e)) => (
            StatusCode::BAD_GATEWAY,
            Json(serde_json::json!({ "error": e.to_string() })),
        )
            .into_response(),
        Err(InterceptError::Store(e)) => {
            tracing::error!(error = %e, "failed to defer request");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

fn into_axum_response(response: TransportResponse) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut out = axum::http::Response::builder().status(status);

    for (name, value) in &response.headers {
        if is_hop_by_hop(name) {
            continue;
        }
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                out = out.header(name, value);
            }
            _ => tracing::debug!(header = %name, "dropping unrepresentable response header"),
        }
    }

    out.body(Body::from(response.body)).unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to build response");
        (
            StatusCode::BAD_GATEWAY,
            [(header::CONTENT_TYPE, "application/json")],
            r#"{"error":"invalid upstream response"}"#,
        )
            .into_response()
    })
}
