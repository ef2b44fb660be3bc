//! Queue Store Port
//!
//! Defines the interface for the persistent key-value store holding the
//! live and shadow queues.

use crate::domain::entities::DeferredRequest;
use crate::domain::errors::StoreError;
use crate::domain::value_objects::QueueKey;
use async_trait::async_trait;

/// Async key-value persistence for queue sequences.
///
/// This is an outbound port. Each call is individually atomic, but a
/// `get` followed by a `set` is NOT: callers that read-modify-write must
/// serialize themselves (the flush engine does this with its mutation gate).
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Read the sequence stored under `key`, or `None` if it was never written.
    async fn get(&self, key: QueueKey) -> Result<Option<Vec<DeferredRequest>>, StoreError>;

    /// Replace the sequence stored under `key`.
    async fn set(&self, key: QueueKey, records: &[DeferredRequest]) -> Result<(), StoreError>;
}
