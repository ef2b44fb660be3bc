//! Trigger Dispatcher
//!
//! Turns connectivity signals, timer ticks and explicit commands into
//! flushes.

use crate::application::FlushEngine;
use crate::domain::entities::{FlushReport, TriggerEvent};
use crate::domain::errors::StoreError;
use crate::domain::ports::{ConnectivityProbe, TriggerPort};
use crate::infrastructure::ShutdownController;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Default period of the recurring flush timer.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(60);

pub struct TriggerDispatcher {
    engine: Arc<FlushEngine>,
    probe: Arc<dyn ConnectivityProbe>,
}

impl TriggerDispatcher {
    pub fn new(engine: Arc<FlushEngine>, probe: Arc<dyn ConnectivityProbe>) -> Self {
        Self { engine, probe }
    }

    /// Handle one event. Returns the flush report if a flush ran.
    pub async fn handle(&self, event: TriggerEvent) -> Result<Option<FlushReport>, StoreError> {
        match event {
            TriggerEvent::Connectivity { online } => {
                self.probe.observe(online);
                if !online {
                    tracing::info!("network unavailable");
                    return Ok(None);
                }
                tracing::info!("network available, flushing queue");
                self.engine.flush().await.map(Some)
            }
            TriggerEvent::Tick => {
                if !self.probe.is_online().await {
                    tracing::debug!("offline, skipping periodic flush");
                    return Ok(None);
                }
                tracing::debug!("periodic flush");
                self.engine.flush().await.map(Some)
            }
            TriggerEvent::Manual => self.engine.flush().await.map(Some),
        }
    }

    /// Consume events until the channel closes or shutdown is signalled.
    ///
    /// Each event is handled on its own task so a slow flush never holds up
    /// the channel; overlapping flushes are skipped by the engine.
    pub async fn run(self: Arc<Self>, mut rx: mpsc::Receiver<TriggerEvent>, shutdown: ShutdownController) {
        let stopped = shutdown.wait();
        tokio::pin!(stopped);

        loop {
            tokio::select! {
                event = rx.recv() => {
                    let Some(event) = event else { break };
                    let this = self.clone();
                    tokio::spawn(async move {
                        if let Err(e) = this.handle(event).await {
                            tracing::error!(?event, error = %e, "flush aborted");
                        }
                    });
                }
                _ = &mut stopped => break,
            }
        }

        tracing::debug!("trigger dispatcher stopped");
    }
}

/// Emit a `Tick` every `period`, starting one period from now.
///
/// Not debounced and not backed off: an empty queue makes the tick a cheap
/// no-op.
pub fn spawn_ticker(port: TriggerPort, period: Duration, shutdown: ShutdownController) -> JoinHandle<()> {
    let mut shutdown_rx = shutdown.subscribe();

    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if !port.tick().await {
                        break;
                    }
                }
                _ = shutdown_rx.recv() => break,
            }
        }
    })
}
