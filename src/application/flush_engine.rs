//! Flush Engine - queue ownership and ordered replay
//!
//! Owns every mutation of the live and shadow queues. Replays deferred
//! requests one at a time in FIFO order, requeues failures and emits
//! notifications for successful replays.
//!
//! ```text
//!   enqueue ──► [gate] ──► live queue
//!
//!   flush:
//!     1. [gate] shadow ++ live ──► shadow, live := []  (reservation)
//!     2. for each record (strictly sequential):
//!          send ─┬─ transport error ─► [gate] append to live
//!                ├─ status >= 500   ─► [gate] append to live
//!                ├─ status 4xx      ─► drop
//!                └─ status < 400    ─► notify {url, payload}, drop
//!          [gate] shadow := remaining
//!     3. [gate] shadow := []
//! ```

use crate::application::Notifier;
use crate::domain::entities::{DeferredRequest, FlushReport, ReplayMessage};
use crate::domain::errors::StoreError;
use crate::domain::ports::{QueueStore, RequestTransport};
use crate::domain::services::RequestCodec;
use crate::domain::value_objects::{QueueKey, ResponseClass};
use crate::infrastructure::ShutdownController;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Resolution of a single replayed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayOutcome {
    /// Status < 400; a notification was emitted
    Delivered,
    /// Transport failure or status >= 500; appended to the live queue
    Requeued,
    /// Status 400..=499; discarded without notification
    Dropped,
}

/// Step-able state of one flush.
///
/// `remaining` mirrors the persisted shadow queue: a record leaves it only
/// after its outcome (including any requeue) has been fully resolved.
#[derive(Debug)]
pub struct ReplayRun {
    remaining: VecDeque<DeferredRequest>,
}

impl ReplayRun {
    fn new(records: Vec<DeferredRequest>) -> Self {
        Self {
            remaining: records.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.remaining.len()
    }

    pub fn is_empty(&self) -> bool {
        self.remaining.is_empty()
    }

    /// Resolve the next record. Returns `None` once the run is exhausted.
    pub async fn step(&mut self, engine: &FlushEngine) -> Result<Option<ReplayOutcome>, StoreError> {
        let Some(record) = self.remaining.front().cloned() else {
            return Ok(None);
        };

        let outcome = engine.replay(&record).await?;

        self.remaining.pop_front();
        engine.shrink_shadow(&self.remaining).await?;

        Ok(Some(outcome))
    }
}

/// Owner of the persistent queue and the flush protocol.
pub struct FlushEngine {
    store: Arc<dyn QueueStore>,
    transport: Arc<dyn RequestTransport>,
    notifier: Notifier,
    /// Serializes every read-modify-write against the store
    gate: Mutex<()>,
    /// Held for the whole duration of a flush
    flush_slot: Mutex<()>,
    shutdown: Option<ShutdownController>,
}

impl FlushEngine {
    pub fn new(
        store: Arc<dyn QueueStore>,
        transport: Arc<dyn RequestTransport>,
        notifier: Notifier,
    ) -> Self {
        Self {
            store,
            transport,
            notifier,
            gate: Mutex::new(()),
            flush_slot: Mutex::new(()),
            shutdown: None,
        }
    }

    /// Register running flushes with a shutdown controller so the process
    /// waits for them before exiting.
    pub fn with_shutdown(mut self, controller: ShutdownController) -> Self {
        self.shutdown = Some(controller);
        self
    }

    /// Append a record to the live queue.
    pub async fn enqueue(&self, record: DeferredRequest) -> Result<(), StoreError> {
        let _gate = self.gate.lock().await;

        let mut queue = self.read(QueueKey::Live).await?;
        tracing::info!(method = %record.method, url = %record.url, "request enqueued");
        queue.push(record);
        self.store.set(QueueKey::Live, &queue).await?;

        tracing::debug!(pending = queue.len(), "live queue updated");
        Ok(())
    }

    /// Snapshot of the live queue.
    pub async fn pending(&self) -> Result<Vec<DeferredRequest>, StoreError> {
        self.read(QueueKey::Live).await
    }

    /// Snapshot of the shadow queue (non-empty only during a flush or after
    /// an interrupted one).
    pub async fn in_flight(&self) -> Result<Vec<DeferredRequest>, StoreError> {
        self.read(QueueKey::Shadow).await
    }

    /// Move records stranded in the shadow queue by an interrupted flush back
    /// to the head of the live queue.
    ///
    /// Returns the number of records recovered.
    pub async fn recover(&self) -> Result<usize, StoreError> {
        let _slot = self.flush_slot.lock().await;
        let _gate = self.gate.lock().await;

        let stranded = self.read(QueueKey::Shadow).await?;
        if stranded.is_empty() {
            return Ok(0);
        }

        let count = stranded.len();
        let mut queue = stranded;
        queue.extend(self.read(QueueKey::Live).await?);

        self.store.set(QueueKey::Live, &queue).await?;
        self.store.set(QueueKey::Shadow, &[]).await?;

        tracing::warn!(count, "recovered records from interrupted flush");
        Ok(count)
    }

    /// Drain the live queue and replay every reserved record in order.
    ///
    /// Returns a skipped report without touching the store if another flush
    /// is already running.
    pub async fn flush(&self) -> Result<FlushReport, StoreError> {
        let Ok(_slot) = self.flush_slot.try_lock() else {
            tracing::debug!("flush already in progress, skipping");
            return Ok(FlushReport::skipped());
        };
        let _guard = self.shutdown.as_ref().map(|s| s.flush_guard());

        let Some(mut run) = self.reserve().await? else {
            return Ok(FlushReport::default());
        };

        let mut report = FlushReport {
            attempted: run.len(),
            ..Default::default()
        };
        tracing::info!(count = run.len(), "replaying deferred requests");

        while let Some(outcome) = run.step(self).await? {
            match outcome {
                ReplayOutcome::Delivered => report.delivered += 1,
                ReplayOutcome::Requeued => report.requeued += 1,
                ReplayOutcome::Dropped => report.dropped += 1,
            }
        }

        self.clear_shadow().await?;

        tracing::info!(
            attempted = report.attempted,
            delivered = report.delivered,
            requeued = report.requeued,
            dropped = report.dropped,
            "flush complete"
        );
        Ok(report)
    }

    /// Reservation: copy live to shadow and reset live, atomically with
    /// respect to every other queue mutation.
    ///
    /// Records still in the shadow queue belong to an aborted flush and are
    /// replayed first.
    async fn reserve(&self) -> Result<Option<ReplayRun>, StoreError> {
        let _gate = self.gate.lock().await;

        let mut queue = self.read(QueueKey::Shadow).await?;
        if !queue.is_empty() {
            tracing::warn!(count = queue.len(), "resuming records from aborted flush");
        }
        queue.extend(self.read(QueueKey::Live).await?);
        if queue.is_empty() {
            return Ok(None);
        }

        self.store.set(QueueKey::Shadow, &queue).await?;
        self.store.set(QueueKey::Live, &[]).await?;

        Ok(Some(ReplayRun::new(queue)))
    }

    /// Deliver one record and apply its outcome.
    async fn replay(&self, record: &DeferredRequest) -> Result<ReplayOutcome, StoreError> {
        tracing::debug!(method = %record.method, url = %record.url, "sending");
        let request = RequestCodec::deserialize(record);

        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(url = %record.url, error = %e, "replay failed, requeueing");
                self.enqueue(record.clone()).await?;
                return Ok(ReplayOutcome::Requeued);
            }
        };

        match ResponseClass::from_status(response.status) {
            ResponseClass::ServerError => {
                tracing::warn!(url = %record.url, status = response.status, "server error, requeueing");
                self.enqueue(record.clone()).await?;
                Ok(ReplayOutcome::Requeued)
            }
            ResponseClass::ClientError => {
                tracing::warn!(url = %record.url, status = response.status, "client error, dropping record");
                Ok(ReplayOutcome::Dropped)
            }
            ResponseClass::Success => {
                let message = ReplayMessage::new(record.url.clone(), response.payload());
                self.notifier.broadcast(&message).await;
                Ok(ReplayOutcome::Delivered)
            }
        }
    }

    async fn shrink_shadow(&self, remaining: &VecDeque<DeferredRequest>) -> Result<(), StoreError> {
        let _gate = self.gate.lock().await;
        let remaining: Vec<DeferredRequest> = remaining.iter().cloned().collect();
        self.store.set(QueueKey::Shadow, &remaining).await
    }

    async fn clear_shadow(&self) -> Result<(), StoreError> {
        let _gate = self.gate.lock().await;
        self.store.set(QueueKey::Shadow, &[]).await
    }

    async fn read(&self, key: QueueKey) -> Result<Vec<DeferredRequest>, StoreError> {
        Ok(self.store.get(key).await?.unwrap_or_default())
    }
}
