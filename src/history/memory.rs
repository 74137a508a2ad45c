use std::collections::VecDeque;

use anyhow::Result;
use tokio::sync::RwLock;

use super::{HistoryStore, DEFAULT_HISTORY_CAPACITY};
use crate::models::Snapshot;

/// Ring buffer of snapshots. Lost on restart.
pub struct MemoryHistoryStore {
    window: RwLock<VecDeque<Snapshot>>,
    capacity: usize,
}

impl MemoryHistoryStore {
    /// A capacity of zero is treated as one so `latest` stays meaningful.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.window.read().await.len()
    }

    #[cfg(test)]
    async fn is_empty(&self) -> bool {
        self.window.read().await.is_empty()
    }
}

impl Default for MemoryHistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

/// Pushes onto a bounded deque, dropping from the front once full.
pub(super) fn push_bounded(window: &mut VecDeque<Snapshot>, snapshot: Snapshot, capacity: usize) {
    while window.len() >= capacity {
        window.pop_front();
    }
    window.push_back(snapshot);
}

#[async_trait::async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn append(&self, snapshot: Snapshot) -> Result<()> {
        let mut window = self.window.write().await;
        push_bounded(&mut window, snapshot, self.capacity);
        Ok(())
    }

    async fn latest(&self) -> Result<Option<Snapshot>> {
        Ok(self.window.read().await.back().cloned())
    }

    async fn all(&self) -> Result<Vec<Snapshot>> {
        Ok(self.window.read().await.iter().cloned().collect())
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}
