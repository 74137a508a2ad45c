//! Refresh cycle orchestration.
//!
//! A cycle prices every tracked equity, then the reserve asset, derives one
//! mNAV per equity from the same batch of quotes and appends one snapshot.
//! At most one cycle runs at a time; triggers that arrive while a cycle is
//! running are dropped.

mod coordinator;
mod scheduler;

pub use coordinator::RefreshCoordinator;

use std::time::Duration;

use crate::config::{RefreshConfig, RefreshMode};
use crate::models::Snapshot;

/// What decides when a cycle runs, besides manual triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerPolicy {
    /// Long-running process: a background task refreshes on a fixed period,
    /// starting immediately.
    Interval(Duration),
    /// Stateless invocation: a read refreshes first when the latest snapshot
    /// is older than the threshold.
    Staleness(Duration),
}

impl TriggerPolicy {
    pub fn from_config(config: &RefreshConfig) -> Self {
        match config.mode {
            RefreshMode::Scheduled => Self::Interval(config.interval),
            RefreshMode::OnDemand => Self::Staleness(config.staleness),
        }
    }
}

/// Result of one completed cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshReport {
    pub snapshot: Snapshot,
    /// Set when the snapshot could not be persisted. The snapshot is still
    /// the cycle's result.
    pub storage_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    Completed(RefreshReport),
    /// Another cycle was already running.
    Skipped,
}

impl RefreshOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        match self {
            Self::Completed(report) => Some(&report.snapshot),
            Self::Skipped => None,
        }
    }
}
