use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use super::{RefreshCoordinator, RefreshOutcome, TriggerPolicy};
use crate::duration::format_duration;

impl RefreshCoordinator {
    /// Spawns the background refresh loop for the interval policy.
    ///
    /// The first cycle runs immediately. Returns `None` under the staleness
    /// policy, where reads drive refreshes instead.
    pub fn start(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let TriggerPolicy::Interval(period) = self.policy() else {
            return None;
        };
        if period.is_zero() {
            warn!("refresh interval is zero; background refresh disabled");
            return None;
        }

        info!(interval = %format_duration(period), "background refresh started");

        let coordinator = Arc::clone(self);
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if coordinator.trigger().await == RefreshOutcome::Skipped {
                    info!("scheduled refresh overlapped a running cycle");
                }
            }
        }))
    }
}
