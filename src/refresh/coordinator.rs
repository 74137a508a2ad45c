use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use super::{RefreshOutcome, RefreshReport, TriggerPolicy};
use crate::clock::{Clock, SystemClock};
use crate::config_store::ConfigStore;
use crate::history::HistoryStore;
use crate::market_data::PriceSource;
use crate::metric::derive_metric;
use crate::models::{PriceTarget, Snapshot};
use crate::staleness::{check_snapshot_staleness, log_snapshot_staleness, StalenessCheck};

/// Runs refresh cycles, one at a time.
pub struct RefreshCoordinator {
    source: Arc<dyn PriceSource>,
    history: Arc<dyn HistoryStore>,
    config_store: Arc<dyn ConfigStore>,
    instruments: Vec<String>,
    reserve_symbol: String,
    inter_call_delay: Duration,
    policy: TriggerPolicy,
    clock: Arc<dyn Clock>,
    /// Held for the whole cycle, fetch delays included.
    cycle_lock: Mutex<()>,
}

impl RefreshCoordinator {
    pub fn new(
        source: Arc<dyn PriceSource>,
        history: Arc<dyn HistoryStore>,
        config_store: Arc<dyn ConfigStore>,
        instruments: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            source,
            history,
            config_store,
            instruments: instruments
                .into_iter()
                .map(|s| s.into().trim().to_uppercase())
                .collect(),
            reserve_symbol: "ETH".to_string(),
            inter_call_delay: Duration::from_secs(2),
            policy: TriggerPolicy::Interval(Duration::from_secs(60 * 60)),
            clock: Arc::new(SystemClock),
            cycle_lock: Mutex::new(()),
        }
    }

    pub fn with_reserve_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.reserve_symbol = symbol.into().to_uppercase();
        self
    }

    pub fn with_inter_call_delay(mut self, delay: Duration) -> Self {
        self.inter_call_delay = delay;
        self
    }

    pub fn with_policy(mut self, policy: TriggerPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn policy(&self) -> TriggerPolicy {
        self.policy
    }

    pub fn instruments(&self) -> &[String] {
        &self.instruments
    }

    pub fn is_running(&self) -> bool {
        self.cycle_lock.try_lock().is_err()
    }

    /// Runs one cycle unless one is already in progress.
    pub async fn trigger(&self) -> RefreshOutcome {
        let Ok(_guard) = self.cycle_lock.try_lock() else {
            info!("refresh already running; trigger dropped");
            return RefreshOutcome::Skipped;
        };
        RefreshOutcome::Completed(self.run_cycle().await)
    }

    /// Staleness of the latest snapshot. A history read error counts as stale.
    pub async fn check_staleness(&self, threshold: Duration) -> StalenessCheck {
        let latest = match self.history.latest().await {
            Ok(latest) => latest,
            Err(err) => {
                warn!(error = %format!("{err:#}"), "history unreadable; treating as stale");
                None
            }
        };
        check_snapshot_staleness(latest.as_ref(), self.clock.now(), threshold)
    }

    /// Under the staleness policy, runs a cycle when the latest snapshot is
    /// too old. Returns `None` when nothing was attempted.
    pub async fn refresh_if_stale(&self) -> Option<RefreshOutcome> {
        let TriggerPolicy::Staleness(threshold) = self.policy else {
            return None;
        };

        let check = self.check_staleness(threshold).await;
        log_snapshot_staleness(&check);
        if !check.is_stale {
            return None;
        }
        Some(self.trigger().await)
    }

    /// Hook for the read path.
    ///
    /// A stale read refreshes first and then serves the new snapshot. A read
    /// that arrives while another cycle is running does not wait for it: it
    /// serves whatever is stored, which is nothing on a cold start.
    pub async fn before_read(&self) {
        if let Some(RefreshOutcome::Skipped) = self.refresh_if_stale().await {
            info!("stale read served while another refresh is running");
        }
    }

    async fn run_cycle(&self) -> RefreshReport {
        info!(
            instruments = ?self.instruments,
            reserve = %self.reserve_symbol,
            "refresh cycle started"
        );

        let mut prices = Vec::with_capacity(self.instruments.len());
        for symbol in &self.instruments {
            prices.push(self.source.fetch_price(&PriceTarget::equity(symbol)).await);
            if !self.inter_call_delay.is_zero() {
                tokio::time::sleep(self.inter_call_delay).await;
            }
        }

        let reserve = self
            .source
            .fetch_price(&PriceTarget::reserve(&self.reserve_symbol))
            .await;

        let configs = match self.config_store.get_all().await {
            Ok(configs) => configs,
            Err(err) => {
                warn!(error = %err, "instrument config unreadable; metrics skipped");
                BTreeMap::new()
            }
        };

        let timestamp = self.clock.now();
        let metrics = prices
            .iter()
            .map(|quote| derive_metric(quote, configs.get(quote.symbol()), &reserve, timestamp))
            .collect();
        let snapshot = Snapshot {
            timestamp,
            configs: self
                .instruments
                .iter()
                .filter_map(|symbol| configs.get(symbol).cloned())
                .collect(),
            prices,
            reserve,
            metrics,
        };

        let storage_error = match self.history.append(snapshot.clone()).await {
            Ok(()) => None,
            Err(err) => {
                let message = format!("{err:#}");
                error!(error = %message, "failed to store snapshot");
                Some(message)
            }
        };

        info!(
            timestamp = %snapshot.timestamp,
            failed = ?snapshot.failed_fetches(),
            metrics = snapshot.metrics.iter().filter(|m| m.value.is_some()).count(),
            "refresh cycle complete"
        );

        RefreshReport {
            snapshot,
            storage_error,
        }
    }
}
