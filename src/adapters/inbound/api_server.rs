//! Control API Server
//!
//! HTTP surface for the host: connectivity signals, explicit flushes,
//! queue inspection and listener endpoint registration.

use crate::adapters::outbound::{ListenerRegistry, ListenerStatus};
use crate::application::FlushEngine;
use crate::domain::entities::DeferredRequest;
use crate::domain::ports::TriggerPort;
use crate::infrastructure::ShutdownController;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Inbound connectivity signal.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectivitySignal {
    pub online: bool,
}

/// Listener registration request.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterListenerRequest {
    pub url: String,
    #[serde(default)]
    pub focused: bool,
}

/// Focus update for a listener.
#[derive(Debug, Clone, Deserialize)]
pub struct FocusRequest {
    pub focused: bool,
}

/// Queue snapshot response.
#[derive(Debug, Serialize)]
pub struct QueueResponse {
    pub pending: usize,
    pub in_flight: usize,
    pub records: Vec<DeferredRequest>,
}

/// Health response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub listeners: usize,
}

/// API server state.
#[derive(Clone)]
pub struct ApiState {
    pub engine: Arc<FlushEngine>,
    pub triggers: TriggerPort,
    pub listeners: ListenerRegistry,
}

impl ApiState {
    pub fn new(engine: Arc<FlushEngine>, triggers: TriggerPort, listeners: ListenerRegistry) -> Self {
        Self {
            engine,
            triggers,
            listeners,
        }
    }
}

pub struct ApiServer {
    listen_addr: String,
    state: ApiState,
}

impl ApiServer {
    pub fn new(listen_addr: String, state: ApiState) -> Self {
        Self { listen_addr, state }
    }

    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    /// Serve until shutdown is signalled.
    #[cfg_attr(coverage_nightly, coverage(off))]
    pub async fn run(&self, shutdown: ShutdownController) -> anyhow::Result<()> {
        let listener = TcpListener::bind(&self.listen_addr).await?;
        tracing::info!("control API listening on {}", self.listen_addr);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { shutdown.wait().await })
            .await?;
        Ok(())
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/v1/connectivity", post(connectivity_handler))
        .route("/api/v1/flush", post(flush_handler))
        .route("/api/v1/queue", get(queue_handler))
        .route(
            "/api/v1/listeners",
            post(register_listener_handler).get(list_listeners_handler),
        )
        .route("/api/v1/listeners/:id", delete(deregister_listener_handler))
        .route("/api/v1/listeners/:id/focus", post(focus_handler))
        // Listener pages register themselves from the browser.
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// Handler functions

async fn health_handler(State(state): State<ApiState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        listeners: state.listeners.len(),
    })
}

async fn connectivity_handler(
    State(state): State<ApiState>,
    Json(signal): Json<ConnectivitySignal>,
) -> impl IntoResponse {
    if state.triggers.online(signal.online).await {
        (
            StatusCode::ACCEPTED,
            Json(serde_json::json!({ "online": signal.online })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "error": "trigger dispatcher stopped" })),
        )
    }
}

async fn flush_handler(State(state): State<ApiState>) -> impl IntoResponse {
    match state.engine.flush().await {
        Ok(report) => (StatusCode::OK, Json(serde_json::json!(report))),
        Err(e) => {
            tracing::error!(error = %e, "manual flush aborted");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
        }
    }
}

async fn queue_handler(State(state): State<ApiState>) -> impl IntoResponse {
    let snapshot = async {
        let records = state.engine.pending().await?;
        let in_flight = state.engine.in_flight().await?.len();
        Ok::<_, crate::domain::errors::StoreError>(QueueResponse {
            pending: records.len(),
            in_flight,
            records,
        })
    };

    match snapshot.await {
        Ok(queue) => (StatusCode::OK, Json(serde_json::json!(queue))),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": e.to_string() })),
        ),
    }
}

async fn register_listener_handler(
    State(state): State<ApiState>,
    Json(req): Json<RegisterListenerRequest>,
) -> impl IntoResponse {
    let id = state.listeners.register(req.url.clone(), req.focused);
    tracing::info!("registered listener {} -> {}", id, req.url);

    (
        StatusCode::CREATED,
        Json(serde_json::json!({ "id": id, "registered": true })),
    )
}

async fn list_listeners_handler(State(state): State<ApiState>) -> Json<Vec<ListenerStatus>> {
    Json(state.listeners.statuses())
}

async fn focus_handler(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(req): Json<FocusRequest>,
) -> impl IntoResponse {
    if state.listeners.set_focus(&id, req.focused) {
        (
            StatusCode::OK,
            Json(serde_json::json!({ "id": id, "focused": req.focused })),
        )
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "id": id, "error": "listener not registered" })),
        )
    }
}

async fn deregister_listener_handler(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    if state.listeners.deregister(&id) {
        tracing::info!("deregistered listener {}", id);
        (
            StatusCode::OK,
            Json(serde_json::json!({ "id": id, "deregistered": true })),
        )
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "id": id, "error": "listener not found" })),
        )
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::adapters::outbound::{MemoryQueueStore, WebhookNotifyPort};
    use crate::application::test_support::{record, Scripted, ScriptedTransport};
    use crate::application::Notifier;
    use crate::domain::entities::TriggerEvent;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    struct Harness {
        state: ApiState,
        transport: Arc<ScriptedTransport>,
        rx: mpsc::Receiver<TriggerEvent>,
    }

    fn harness() -> Harness {
        let listeners = ListenerRegistry::new();
        let transport = Arc::new(ScriptedTransport::new());
        let engine = Arc::new(FlushEngine::new(
            Arc::new(MemoryQueueStore::new()),
            transport.clone(),
            Notifier::new(Arc::new(WebhookNotifyPort::new(listeners.clone()))),
        ));
        let (triggers, rx) = TriggerPort::channel(8);
        Harness {
            state: ApiState::new(engine, triggers, listeners),
            transport,
            rx,
        }
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_handler() {
        let h = harness();
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

        let response = router(h.state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["listeners"], 0);
    }

    #[tokio::test]
    async fn test_connectivity_signal_emits_trigger() {
        let mut h = harness();

        let response = router(h.state.clone())
            .oneshot(post_json("/api/v1/connectivity", serde_json::json!({"online": true})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(
            h.rx.recv().await,
            Some(TriggerEvent::Connectivity { online: true })
        );
    }

    #[tokio::test]
    async fn test_connectivity_without_dispatcher() {
        let h = harness();
        drop(h.rx);

        let response = router(h.state)
            .oneshot(post_json("/api/v1/connectivity", serde_json::json!({"online": false})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_flush_handler_returns_report() {
        let h = harness();
        h.transport.script("http://api.local/b", Scripted::Status(500, ""));
        h.state.engine.enqueue(record("http://api.local/a")).await.unwrap();
        h.state.engine.enqueue(record("http://api.local/b")).await.unwrap();

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/flush")
            .body(Body::empty())
            .unwrap();
        let response = router(h.state.clone()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["attempted"], 2);
        assert_eq!(body["delivered"], 1);
        assert_eq!(body["requeued"], 1);
        assert_eq!(body["skipped"], false);
    }

    #[tokio::test]
    async fn test_queue_handler_lists_records() {
        let h = harness();
        h.state.engine.enqueue(record("http://api.local/a")).await.unwrap();

        let request = Request::builder().uri("/api/v1/queue").body(Body::empty()).unwrap();
        let response = router(h.state).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["pending"], 1);
        assert_eq!(body["in_flight"], 0);
        assert_eq!(body["records"][0]["url"], "http://api.local/a");
        assert_eq!(body["records"][0]["method"], "POST");
    }

    #[tokio::test]
    async fn test_listener_lifecycle() {
        let h = harness();
        let app = router(h.state.clone());

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/v1/listeners",
                serde_json::json!({"url": "http://tab.local/hook"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let id = json_body(response).await["id"].as_str().unwrap().to_string();
        assert!(!h.state.listeners.get(&id).unwrap().focused);

        let response = app
            .clone()
            .oneshot(post_json(
                &format!("/api/v1/listeners/{}/focus", id),
                serde_json::json!({"focused": true}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(h.state.listeners.get(&id).unwrap().focused);

        let request = Request::builder().uri("/api/v1/listeners").body(Body::empty()).unwrap();
        let listed = json_body(app.clone().oneshot(request).await.unwrap()).await;
        assert_eq!(listed[0]["id"], id.as_str());
        assert_eq!(listed[0]["focused"], true);

        let request = Request::builder()
            .method("DELETE")
            .uri(format!("/api/v1/listeners/{}", id))
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(h.state.listeners.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_listener_not_found() {
        let h = harness();
        let app = router(h.state);

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/v1/listeners/missing/focus",
                serde_json::json!({"focused": true}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let request = Request::builder()
            .method("DELETE")
            .uri("/api/v1/listeners/missing")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
