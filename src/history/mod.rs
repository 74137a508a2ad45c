//! Bounded snapshot history.
//!
//! A history holds at most `capacity` snapshots in insertion order. Appending
//! to a full history evicts the oldest entry.

mod jsonl;
mod memory;

pub use jsonl::JsonlHistoryStore;
pub use memory::MemoryHistoryStore;

use anyhow::Result;

use crate::models::Snapshot;

/// Default number of snapshots kept.
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

#[async_trait::async_trait]
pub trait HistoryStore: Send + Sync {
    /// Appends a snapshot, evicting the oldest one if the window is full.
    async fn append(&self, snapshot: Snapshot) -> Result<()>;

    /// The most recently appended snapshot.
    async fn latest(&self) -> Result<Option<Snapshot>>;

    /// All retained snapshots, oldest first.
    async fn all(&self) -> Result<Vec<Snapshot>>;

    fn capacity(&self) -> usize;
}
