//! Graceful Shutdown Handler
//!
//! Signals shutdown to the servers, the ticker and the trigger dispatcher,
//! and lets the process wait for a started flush to finish. Deliveries are
//! never cancelled.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::sync::Notify;

/// Shutdown coordinator.
#[derive(Clone)]
pub struct ShutdownController {
    /// Whether shutdown has been initiated
    shutdown_initiated: Arc<AtomicBool>,
    /// Number of flushes currently running
    active_flushes: Arc<AtomicUsize>,
    /// Broadcast channel for shutdown signal
    shutdown_tx: broadcast::Sender<()>,
    /// Notify when the last flush finishes
    drain_complete: Arc<Notify>,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            shutdown_initiated: Arc::new(AtomicBool::new(false)),
            active_flushes: Arc::new(AtomicUsize::new(0)),
            shutdown_tx,
            drain_complete: Arc::new(Notify::new()),
        }
    }

    /// Subscribe to shutdown notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Initiate graceful shutdown. Idempotent.
    pub fn shutdown(&self) {
        if !self.shutdown_initiated.swap(true, Ordering::SeqCst) {
            tracing::info!("initiating graceful shutdown");
            let _ = self.shutdown_tx.send(());
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown_initiated.load(Ordering::SeqCst)
    }

    pub fn active_flushes(&self) -> usize {
        self.active_flushes.load(Ordering::SeqCst)
    }

    /// Resolves when shutdown has been initiated.
    pub async fn wait(&self) {
        let mut rx = self.subscribe();
        if self.is_shutdown() {
            return;
        }
        let _ = rx.recv().await;
    }

    /// Wait for running flushes to finish, up to `timeout`.
    pub async fn wait_for_drain(&self, timeout: Duration) -> bool {
        let notified = self.drain_complete.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if self.active_flushes() == 0 {
            return true;
        }

        tokio::select! {
            _ = notified => true,
            _ = tokio::time::sleep(timeout) => {
                tracing::warn!(
                    "drain timeout: {} flushes still running",
                    self.active_flushes()
                );
                false
            }
        }
    }

    /// Register a running flush; the guard unregisters it on drop.
    pub fn flush_guard(&self) -> FlushGuard {
        self.active_flushes.fetch_add(1, Ordering::SeqCst);
        FlushGuard {
            controller: self.clone(),
        }
    }

    fn flush_ended(&self) {
        let prev = self.active_flushes.fetch_sub(1, Ordering::SeqCst);
        if prev == 1 {
            self.drain_complete.notify_waiters();
        }
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII registration of a running flush.
pub struct FlushGuard {
    controller: ShutdownController,
}

impl Drop for FlushGuard {
    fn drop(&mut self) {
        self.controller.flush_ended();
    }
}

/// Resolves when Ctrl+C or SIGTERM is received, then initiates shutdown.
#[cfg_attr(coverage_nightly, coverage(off))]
pub async fn shutdown_signal(controller: ShutdownController) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received Ctrl+C, initiating shutdown");
        }
        _ = terminate => {
            tracing::info!("received SIGTERM, initiating shutdown");
        }
    }

    controller.shutdown();
}
