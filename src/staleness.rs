//! Staleness detection for the snapshot history.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::models::Snapshot;

/// Result of a staleness check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StalenessCheck {
    pub is_stale: bool,
    pub age: Option<Duration>,
    pub threshold: Duration,
}

impl StalenessCheck {
    pub fn stale(age: Duration, threshold: Duration) -> Self {
        Self { is_stale: true, age: Some(age), threshold }
    }

    pub fn fresh(age: Duration, threshold: Duration) -> Self {
        Self { is_stale: false, age: Some(age), threshold }
    }

    pub fn missing(threshold: Duration) -> Self {
        Self { is_stale: true, age: None, threshold }
    }
}

/// Age of a timestamp relative to `now`. Timestamps in the future are age zero.
pub fn age_of(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - timestamp).to_std().unwrap_or(Duration::ZERO)
}

/// Stale iff the latest snapshot is strictly older than `threshold`.
/// No snapshot at all is always stale.
pub fn check_snapshot_staleness(
    latest: Option<&Snapshot>,
    now: DateTime<Utc>,
    threshold: Duration,
) -> StalenessCheck {
    match latest {
        Some(snapshot) => {
            let age = age_of(snapshot.timestamp, now);
            if age > threshold {
                StalenessCheck::stale(age, threshold)
            } else {
                StalenessCheck::fresh(age, threshold)
            }
        }
        None => StalenessCheck::missing(threshold),
    }
}

/// Log snapshot staleness check results.
pub fn log_snapshot_staleness(check: &StalenessCheck) {
    let status = if check.is_stale { "stale" } else { "fresh" };
    let age_str = check
        .age
        .map(crate::duration::format_duration)
        .unwrap_or_else(|| "never".to_string());
    let threshold_str = crate::duration::format_duration(check.threshold);

    info!(
        age = %age_str,
        threshold = %threshold_str,
        status = status,
        "snapshot staleness check"
    );
}
