use std::sync::Arc;

use anyhow::Result;

use crate::clock::{Clock, SystemClock};
use crate::config::ResolvedConfig;
use crate::config_store::{ConfigStore, JsonConfigStore, MemoryConfigStore};
use crate::history::{HistoryStore, JsonlHistoryStore, MemoryHistoryStore};
use crate::market_data::PriceSource;
use crate::refresh::{RefreshCoordinator, TriggerPolicy};
use crate::service::TrackerService;

/// Builds a [`TrackerService`] from resolved configuration.
///
/// Stores and the price source are chosen from config unless overridden,
/// which is how tests inject mocks.
pub struct TrackerServiceBuilder {
    config: ResolvedConfig,
    price_source: Option<Arc<dyn PriceSource>>,
    history: Option<Arc<dyn HistoryStore>>,
    config_store: Option<Arc<dyn ConfigStore>>,
    clock: Arc<dyn Clock>,
}

impl TrackerServiceBuilder {
    pub fn new(config: ResolvedConfig) -> Self {
        Self {
            config,
            price_source: None,
            history: None,
            config_store: None,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_price_source(mut self, source: Arc<dyn PriceSource>) -> Self {
        self.price_source = Some(source);
        self
    }

    pub fn with_history_store(mut self, history: Arc<dyn HistoryStore>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn with_config_store(mut self, config_store: Arc<dyn ConfigStore>) -> Self {
        self.config_store = Some(config_store);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub async fn build(self) -> Result<TrackerService> {
        let config = self.config;

        let history: Arc<dyn HistoryStore> = match self.history {
            Some(history) => history,
            None => match &config.history_path {
                Some(path) => {
                    Arc::new(JsonlHistoryStore::open(path, config.history.capacity).await?)
                }
                None => Arc::new(MemoryHistoryStore::new(config.history.capacity)),
            },
        };

        let config_store: Arc<dyn ConfigStore> = match self.config_store {
            Some(store) => store,
            None => match &config.config_store_path {
                Some(path) => Arc::new(JsonConfigStore::open(path, config.instruments.clone()).await?),
                None => Arc::new(MemoryConfigStore::new(config.instruments.clone())),
            },
        };

        let source = match self.price_source {
            Some(source) => source,
            None => default_price_source(&config, self.clock.clone())?,
        };

        let coordinator = RefreshCoordinator::new(
            source,
            history.clone(),
            config_store.clone(),
            config.instruments.iter().map(|i| i.symbol.clone()),
        )
        .with_reserve_symbol(config.providers.reserve_symbol.clone())
        .with_inter_call_delay(config.refresh.inter_call_delay)
        .with_policy(TriggerPolicy::from_config(&config.refresh))
        .with_clock(self.clock.clone());

        tracing::debug!(
            policy = ?coordinator.policy(),
            durable_history = config.history_path.is_some(),
            durable_config = config.config_store_path.is_some(),
            "tracker service built"
        );

        Ok(TrackerService::new(history, config_store, Arc::new(coordinator)).with_clock(self.clock))
    }
}

#[cfg(feature = "providers")]
fn default_price_source(config: &ResolvedConfig, clock: Arc<dyn Clock>) -> Result<Arc<dyn PriceSource>> {
    use crate::market_data::providers::{CoinGeckoQuoteSource, FinnhubQuoteSource};
    use crate::market_data::PriceRouter;

    let providers = &config.providers;
    let timeout = config.refresh.request_timeout;

    let api_key = providers.finnhub_api_key.clone().unwrap_or_else(|| {
        tracing::warn!("no Finnhub API key configured; equity prices will be unavailable");
        String::new()
    });
    let equity = FinnhubQuoteSource::new(api_key)
        .with_base_url(providers.finnhub_base_url.as_str())
        .with_timeout(timeout);

    let mut reserve = CoinGeckoQuoteSource::new()
        .with_base_url(providers.coingecko_base_url.as_str())
        .with_quote_currency(providers.quote_currency.as_str())
        .with_timeout(timeout);
    if let Some(coin_id) = &providers.coingecko_coin_id {
        reserve = reserve.with_mapping(providers.reserve_symbol.as_str(), coin_id.as_str());
    }

    Ok(Arc::new(
        PriceRouter::new(Arc::new(equity), Arc::new(reserve)).with_clock(clock),
    ))
}

#[cfg(not(feature = "providers"))]
fn default_price_source(_config: &ResolvedConfig, _clock: Arc<dyn Clock>) -> Result<Arc<dyn PriceSource>> {
    anyhow::bail!("built without the `providers` feature; supply a price source explicitly")
}
