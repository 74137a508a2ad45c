//! The operations exposed to API consumers.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::clock::{Clock, SystemClock};
use crate::config_store::{normalize_symbol, ConfigStore};
use crate::error::TrackerError;
use crate::history::HistoryStore;
use crate::models::{InstrumentConfig, Snapshot};
use crate::refresh::{RefreshCoordinator, RefreshOutcome};

/// Latest snapshot plus the current reference quantities.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatestData {
    pub snapshot: Option<Snapshot>,
    pub config: BTreeMap<String, InstrumentConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub message: String,
}

/// Raw config update as received from a client.
///
/// Fields are kept loosely typed so that missing, null and non-numeric values
/// all surface as validation errors rather than parse failures.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigUpdateRequest {
    pub symbol: Option<Value>,
    pub shares_outstanding: Option<Value>,
    pub eth_holdings: Option<Value>,
}

/// A validated config update.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigUpdate {
    pub symbol: String,
    pub shares_outstanding: f64,
    pub eth_holdings: f64,
}

impl ConfigUpdateRequest {
    pub fn new(symbol: &str, shares_outstanding: f64, eth_holdings: f64) -> Self {
        Self {
            symbol: Some(Value::from(symbol)),
            shares_outstanding: Some(Value::from(shares_outstanding)),
            eth_holdings: Some(Value::from(eth_holdings)),
        }
    }

    /// All three fields are required. Quantities may be JSON numbers or
    /// numeric strings and must be finite and strictly positive.
    pub fn validate(&self) -> Result<ConfigUpdate, TrackerError> {
        let symbol = match &self.symbol {
            Some(Value::String(s)) if !s.trim().is_empty() => normalize_symbol(s),
            Some(Value::Null) | None => return Err(TrackerError::Validation("symbol is required".into())),
            Some(Value::String(_)) => return Err(TrackerError::Validation("symbol is required".into())),
            Some(_) => return Err(TrackerError::Validation("symbol must be a string".into())),
        };

        Ok(ConfigUpdate {
            symbol,
            shares_outstanding: parse_quantity("shares_outstanding", self.shares_outstanding.as_ref())?,
            eth_holdings: parse_quantity("eth_holdings", self.eth_holdings.as_ref())?,
        })
    }
}

fn parse_quantity(field: &str, value: Option<&Value>) -> Result<f64, TrackerError> {
    let number = match value {
        None | Some(Value::Null) => {
            return Err(TrackerError::Validation(format!("{field} is required")))
        }
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };

    match number {
        Some(n) if n.is_finite() && n > 0.0 => Ok(n),
        Some(_) => Err(TrackerError::Validation(format!("{field} must be a positive number"))),
        None => Err(TrackerError::Validation(format!("{field} must be numeric"))),
    }
}

/// Owns the stores and the coordinator; injected into the HTTP layer.
pub struct TrackerService {
    history: Arc<dyn HistoryStore>,
    config_store: Arc<dyn ConfigStore>,
    coordinator: Arc<RefreshCoordinator>,
    clock: Arc<dyn Clock>,
}

impl TrackerService {
    pub fn new(
        history: Arc<dyn HistoryStore>,
        config_store: Arc<dyn ConfigStore>,
        coordinator: Arc<RefreshCoordinator>,
    ) -> Self {
        Self {
            history,
            config_store,
            coordinator,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Latest snapshot, refreshing first if the staleness policy says so.
    pub async fn latest_snapshot(&self) -> Result<LatestData, TrackerError> {
        self.coordinator.before_read().await;

        let snapshot = self.history.latest().await?;
        let config = self.config_store.get_all().await?;
        Ok(LatestData { snapshot, config })
    }

    /// Every retained snapshot, oldest first.
    pub async fn history(&self) -> Result<Vec<Snapshot>, TrackerError> {
        self.coordinator.before_read().await;
        Ok(self.history.all().await?)
    }

    pub async fn trigger_manual_refresh(&self) -> RefreshOutcome {
        info!("manual refresh requested");
        self.coordinator.trigger().await
    }

    /// Validates and stores new reference quantities. They apply from the
    /// next cycle on; existing snapshots are not recomputed.
    pub async fn update_config(
        &self,
        request: &ConfigUpdateRequest,
    ) -> Result<InstrumentConfig, TrackerError> {
        let update = request.validate()?;
        let updated = self
            .config_store
            .set(&update.symbol, update.shares_outstanding, update.eth_holdings)
            .await?;

        info!(
            symbol = %updated.symbol,
            shares_outstanding = updated.shares_outstanding,
            eth_holdings = updated.eth_holdings,
            "instrument config updated"
        );
        Ok(updated)
    }

    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            status: "ok",
            message: "mNAV tracker is running".to_string(),
        }
    }
}
