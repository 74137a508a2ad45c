use std::collections::BTreeMap;

use tokio::sync::RwLock;

use super::{index_defaults, normalize_symbol, ConfigStore};
use crate::error::TrackerError;
use crate::models::{default_instruments, InstrumentConfig};

/// In-memory config store. Mutations are lost on restart.
pub struct MemoryConfigStore {
    configs: RwLock<BTreeMap<String, InstrumentConfig>>,
}

impl MemoryConfigStore {
    /// The symbols of `defaults` become the tracked set.
    pub fn new(defaults: impl IntoIterator<Item = InstrumentConfig>) -> Self {
        Self {
            configs: RwLock::new(index_defaults(defaults)),
        }
    }
}

impl Default for MemoryConfigStore {
    fn default() -> Self {
        Self::new(default_instruments())
    }
}

#[async_trait::async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn get(&self, symbol: &str) -> Result<Option<InstrumentConfig>, TrackerError> {
        Ok(self.configs.read().await.get(&normalize_symbol(symbol)).cloned())
    }

    async fn get_all(&self) -> Result<BTreeMap<String, InstrumentConfig>, TrackerError> {
        Ok(self.configs.read().await.clone())
    }

    async fn set(
        &self,
        symbol: &str,
        shares_outstanding: f64,
        eth_holdings: f64,
    ) -> Result<InstrumentConfig, TrackerError> {
        let symbol = normalize_symbol(symbol);
        let mut configs = self.configs.write().await;
        let entry = configs
            .get_mut(&symbol)
            .ok_or_else(|| TrackerError::UnknownInstrument(symbol.clone()))?;
        entry.shares_outstanding = shares_outstanding;
        entry.eth_holdings = eth_holdings;
        Ok(entry.clone())
    }
}
