//! request-deferrer - Offline Request Deferral Proxy
//!
//! This is the composition root that wires together all the components.

use request_deferrer::adapters::inbound::{ApiServer, ApiState, ProxyServer, ProxyState};
use request_deferrer::adapters::outbound::{
    HttpConnectivityProbe, ListenerRegistry, MemoryQueueStore, ReqwestTransport,
    SignalConnectivityProbe, SqliteQueueStore, WebhookNotifyPort,
};
use request_deferrer::application::{
    spawn_ticker, FlushEngine, Interceptor, Notifier, TriggerDispatcher,
};
use request_deferrer::config::load_config;
use request_deferrer::domain::ports::{ConnectivityProbe, QueueStore, TriggerPort};
use request_deferrer::infrastructure::{shutdown_signal, ShutdownController};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::fmt::format::FmtSpan;

/// How long shutdown waits for a running flush.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment
    let cfg = load_config()?;

    // Setup logging
    let log_level = if cfg.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_span_events(FmtSpan::CLOSE)
        .init();

    tracing::info!(
        "starting request-deferrer listen={} api={} upstream={}",
        cfg.listen_addr,
        cfg.api_listen_addr,
        cfg.upstream_url
    );

    // ===== COMPOSITION ROOT =====
    // Wire up all adapters and services

    let shutdown = ShutdownController::new();

    // 1. Create outbound adapters

    // Queue store (SQLite, or in-memory when requested)
    let store: Arc<dyn QueueStore> = if cfg.in_memory {
        tracing::warn!("using in-memory queue store; deferred requests will not survive restart");
        Arc::new(MemoryQueueStore::new())
    } else {
        tracing::info!("queue store at {}", cfg.store_path);
        Arc::new(SqliteQueueStore::open(&cfg.store_path)?)
    };

    // Network transport (reqwest)
    let transport = Arc::new(ReqwestTransport::new()?);

    // Listener endpoints (webhooks)
    let listeners = ListenerRegistry::new();
    let notifier = Notifier::new(Arc::new(WebhookNotifyPort::new(listeners.clone())));

    // Connectivity probe
    let probe: Arc<dyn ConnectivityProbe> = match &cfg.probe_url {
        Some(url) => {
            tracing::info!("probing connectivity via {}", url);
            Arc::new(HttpConnectivityProbe::new(
                url.clone(),
                Duration::from_millis(cfg.probe_timeout_ms),
            )?)
        }
        None => Arc::new(SignalConnectivityProbe::default()),
    };

    // 2. Create application services
    let engine = Arc::new(
        FlushEngine::new(store, transport.clone(), notifier).with_shutdown(shutdown.clone()),
    );

    let recovered = engine.recover().await?;
    if recovered > 0 {
        tracing::warn!("recovered {} requests interrupted mid-flush", recovered);
    }

    let interceptor = Arc::new(Interceptor::new(engine.clone(), transport));

    // 3. Triggers
    let (triggers, trigger_rx) = TriggerPort::channel(64);
    let dispatcher = Arc::new(TriggerDispatcher::new(engine.clone(), probe));
    let dispatcher_task = tokio::spawn(dispatcher.run(trigger_rx, shutdown.clone()));
    let ticker = spawn_ticker(
        triggers.clone(),
        Duration::from_secs(cfg.flush_interval_secs),
        shutdown.clone(),
    );

    // Replay whatever survived the last run
    triggers.flush_now().await;

    // 4. Create inbound adapters and run
    let proxy = ProxyServer::new(
        cfg.listen_addr.clone(),
        ProxyState::new(interceptor, &cfg.upstream_url, cfg.max_body_bytes),
    );
    let api = ApiServer::new(
        cfg.api_listen_addr.clone(),
        ApiState::new(engine, triggers, listeners),
    );

    tokio::spawn(shutdown_signal(shutdown.clone()));

    let result = tokio::try_join!(proxy.run(shutdown.clone()), api.run(shutdown.clone()));
    // A server that failed to start takes the process down with it.
    shutdown.shutdown();

    let _ = ticker.await;
    let _ = dispatcher_task.await;

    if !shutdown.wait_for_drain(DRAIN_TIMEOUT).await {
        tracing::warn!("exiting with a flush still running; remaining records stay in the shadow queue");
    }

    tracing::info!("shutdown complete");
    result.map(|_| ())
}
