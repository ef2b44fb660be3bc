//! Integration tests for the SQLite queue store
//!
//! Queue state must survive reopening the database file, and a flush
//! interrupted mid-way must be recoverable on the next start.

use request_deferrer::adapters::outbound::{ListenerRegistry, ReqwestTransport, SqliteQueueStore, WebhookNotifyPort};
use request_deferrer::application::{FlushEngine, Notifier};
use request_deferrer::domain::entities::OutgoingRequest;
use request_deferrer::domain::ports::QueueStore;
use request_deferrer::{QueueKey, RequestCodec};
use std::sync::Arc;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn engine(store: Arc<SqliteQueueStore>) -> FlushEngine {
    FlushEngine::new(
        store,
        Arc::new(ReqwestTransport::new().unwrap()),
        Notifier::new(Arc::new(WebhookNotifyPort::new(ListenerRegistry::new()))),
    )
}

fn record(url: &str) -> request_deferrer::DeferredRequest {
    RequestCodec::serialize(
        &OutgoingRequest::new("PUT", url)
            .with_header("Content-Type", "application/json")
            .with_header("X-Request-Id", "abc")
            .with_body(r#"{"v":2}"#),
    )
}

#[tokio::test]
async fn test_queue_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("queue.db");
    let db = db.to_str().unwrap();

    {
        let store = Arc::new(SqliteQueueStore::open(db).unwrap());
        let engine = engine(store);
        engine.enqueue(record("http://api.local/a")).await.unwrap();
        engine.enqueue(record("http://api.local/b")).await.unwrap();
    }

    let store = Arc::new(SqliteQueueStore::open(db).unwrap());
    let pending = engine(store).pending().await.unwrap();

    assert_eq!(pending, vec![record("http://api.local/a"), record("http://api.local/b")]);
    assert_eq!(pending[0].headers.get("content-type").map(String::as_str), Some("application/json"));
    assert_eq!(pending[0].body.as_deref(), Some(r#"{"v":2}"#));
}

#[tokio::test]
async fn test_interrupted_flush_is_recovered() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("queue.db");
    let db = db.to_str().unwrap();

    // Simulate a crash after reservation: records stranded in the shadow queue.
    {
        let store = SqliteQueueStore::open(db).unwrap();
        store
            .set(QueueKey::Shadow, &[record("http://api.local/a"), record("http://api.local/b")])
            .await
            .unwrap();
        store
            .set(QueueKey::Live, &[record("http://api.local/c")])
            .await
            .unwrap();
    }

    let store = Arc::new(SqliteQueueStore::open(db).unwrap());
    let engine = engine(store.clone());

    assert_eq!(engine.recover().await.unwrap(), 2);
    let urls: Vec<String> = engine
        .pending()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.url)
        .collect();
    assert_eq!(urls, vec!["http://api.local/a", "http://api.local/b", "http://api.local/c"]);
    assert_eq!(store.get(QueueKey::Shadow).await.unwrap(), Some(Vec::new()));

    assert_eq!(engine.recover().await.unwrap(), 0);
}

#[tokio::test]
async fn test_flush_persists_requeued_records() {
    let upstream = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&upstream)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("queue.db");
    let db = db.to_str().unwrap();
    let url = format!("{}/items/1", upstream.uri());

    {
        let engine = engine(Arc::new(SqliteQueueStore::open(db).unwrap()));
        engine.enqueue(record(&url)).await.unwrap();
        let report = engine.flush().await.unwrap();
        assert_eq!(report.requeued, 1);
    }

    let store = Arc::new(SqliteQueueStore::open(db).unwrap());
    assert_eq!(store.get(QueueKey::Live).await.unwrap(), Some(vec![record(&url)]));
    assert_eq!(store.get(QueueKey::Shadow).await.unwrap(), Some(Vec::new()));
}
