//! In-Memory Queue Store
//!
//! Implements QueueStore using DashMap. Nothing survives a restart; used by
//! tests and by `DEFERRER_IN_MEMORY=true`.

use crate::domain::entities::DeferredRequest;
use crate::domain::errors::StoreError;
use crate::domain::ports::QueueStore;
use crate::domain::value_objects::QueueKey;
use async_trait::async_trait;
use dashmap::DashMap;

pub struct MemoryQueueStore {
    queues: DashMap<QueueKey, Vec<DeferredRequest>>,
}

impl MemoryQueueStore {
    pub fn new() -> Self {
        Self {
            queues: DashMap::new(),
        }
    }
}

impl Default for MemoryQueueStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
    async fn get(&self, key: QueueKey) -> Result<Option<Vec<DeferredRequest>>, StoreError> {
        Ok(self.queues.get(&key).map(|e| e.value().clone()))
    }

    async fn set(&self, key: QueueKey, records: &[DeferredRequest]) -> Result<(), StoreError> {
        self.queues.insert(key, records.to_vec());
        Ok(())
    }
}
