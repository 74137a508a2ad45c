//! CoinGecko spot price provider.
//!
//! Uses the `/simple/price` endpoint for the current price of the reserve
//! asset. The 24h change, volume and market cap are requested as well and
//! logged when present.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info};

use super::{DEFAULT_REQUEST_TIMEOUT, USER_AGENT};
use crate::market_data::{FetchError, QuoteProvider, COINGECKO_API_BASE};

/// `{ "<coin id>": { "usd": 3012.5, "usd_24h_change": -1.2, ... } }`
type SimplePriceResponse = HashMap<String, HashMap<String, Option<f64>>>;

/// CoinGecko spot price client. No API key is required.
pub struct CoinGeckoQuoteSource {
    client: Client,
    base_url: String,
    /// Quote currency for prices (e.g., "usd")
    quote_currency: String,
    /// Symbol to CoinGecko ID overrides
    custom_mappings: HashMap<String, String>,
    timeout: Duration,
}

impl CoinGeckoQuoteSource {
    /// Creates a provider quoting in USD.
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            base_url: COINGECKO_API_BASE.to_string(),
            quote_currency: "usd".to_string(),
            custom_mappings: HashMap::new(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_quote_currency(mut self, currency: impl Into<String>) -> Self {
        self.quote_currency = currency.into().to_lowercase();
        self
    }

    /// Adds a single mapping from symbol to CoinGecko coin ID.
    pub fn with_mapping(mut self, symbol: impl Into<String>, coingecko_id: impl Into<String>) -> Self {
        self.custom_mappings
            .insert(symbol.into().to_uppercase(), coingecko_id.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Maps a symbol to a CoinGecko coin ID, falling back to the lowercased
    /// symbol for coins whose ID equals their ticker.
    fn coin_id(&self, symbol: &str) -> String {
        let symbol = symbol.to_uppercase();
        if let Some(id) = self.custom_mappings.get(&symbol) {
            return id.clone();
        }

        match symbol.as_str() {
            "ETH" => "ethereum",
            "BTC" => "bitcoin",
            "SOL" => "solana",
            "STETH" => "staked-ether",
            "WETH" => "weth",
            _ => return symbol.to_lowercase(),
        }
        .to_string()
    }

    fn parse_price(&self, coin_id: &str, body: &str) -> Result<f64, FetchError> {
        let data: SimplePriceResponse =
            serde_json::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))?;

        let fields = data
            .get(coin_id)
            .ok_or_else(|| FetchError::MissingPrice(coin_id.to_string()))?;

        let currency = &self.quote_currency;
        let price = fields
            .get(currency)
            .copied()
            .flatten()
            .filter(|p| p.is_finite() && *p > 0.0)
            .ok_or_else(|| FetchError::MissingPrice(format!("{coin_id}/{currency}")))?;

        let stat = |suffix: &str| fields.get(&format!("{currency}_{suffix}")).copied().flatten();
        if let Some(change) = stat("24h_change") {
            info!(coin = coin_id, change_24h_percent = change, "coingecko 24h change");
        }
        debug!(
            coin = coin_id,
            market_cap = stat("market_cap"),
            volume_24h = stat("24h_vol"),
            "coingecko market stats"
        );

        Ok(price)
    }
}

impl Default for CoinGeckoQuoteSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl QuoteProvider for CoinGeckoQuoteSource {
    async fn fetch_quote(&self, symbol: &str) -> Result<f64, FetchError> {
        let coin_id = self.coin_id(symbol);
        let url = format!("{}/simple/price", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("ids", coin_id.as_str()),
                ("vs_currencies", self.quote_currency.as_str()),
                ("include_24hr_change", "true"),
                ("include_24hr_vol", "true"),
                ("include_market_cap", "true"),
            ])
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        self.parse_price(&coin_id, &body)
    }

    fn name(&self) -> &str {
        "coingecko"
    }
}
