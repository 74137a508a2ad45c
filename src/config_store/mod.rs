//! Per-instrument reference quantities.
//!
//! The key set is fixed at construction: it is the set of tracked
//! instruments. `set` only ever overwrites an existing entry.

mod json_file;
mod memory;

pub use json_file::JsonConfigStore;
pub use memory::MemoryConfigStore;

use std::collections::BTreeMap;

use crate::error::TrackerError;
use crate::models::InstrumentConfig;

#[async_trait::async_trait]
pub trait ConfigStore: Send + Sync {
    async fn get(&self, symbol: &str) -> Result<Option<InstrumentConfig>, TrackerError>;

    async fn get_all(&self) -> Result<BTreeMap<String, InstrumentConfig>, TrackerError>;

    /// Replaces the quantities for a tracked instrument. Last writer wins.
    ///
    /// Values are stored as given; validation is the caller's job.
    async fn set(
        &self,
        symbol: &str,
        shares_outstanding: f64,
        eth_holdings: f64,
    ) -> Result<InstrumentConfig, TrackerError>;
}

pub(crate) fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

fn index_defaults(defaults: impl IntoIterator<Item = InstrumentConfig>) -> BTreeMap<String, InstrumentConfig> {
    defaults
        .into_iter()
        .map(|mut config| {
            config.symbol = normalize_symbol(&config.symbol);
            (config.symbol.clone(), config)
        })
        .collect()
}
