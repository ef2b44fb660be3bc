//! Trigger Port
//!
//! Channel through which the host delivers connectivity signals, timer ticks
//! and explicit flush commands.

use crate::domain::entities::TriggerEvent;
use tokio::sync::mpsc;

/// Cloneable sender side of the trigger channel.
#[derive(Clone)]
pub struct TriggerPort {
    tx: mpsc::Sender<TriggerEvent>,
}

impl TriggerPort {
    /// Create a trigger port and the receiver consumed by the dispatcher.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<TriggerEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Emit an event. Returns false once the dispatcher is gone.
    pub async fn emit(&self, event: TriggerEvent) -> bool {
        self.tx.send(event).await.is_ok()
    }

    /// Inbound `{online}` signal.
    pub async fn online(&self, online: bool) -> bool {
        self.emit(TriggerEvent::Connectivity { online }).await
    }

    pub async fn tick(&self) -> bool {
        self.emit(TriggerEvent::Tick).await
    }

    pub async fn flush_now(&self) -> bool {
        self.emit(TriggerEvent::Manual).await
    }
}
