//! Finnhub equity quote provider.
//!
//! Uses the `/quote` endpoint, which returns the current price as `c` along
//! with the absolute (`d`) and percent (`dp`) change since the previous close.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use super::{DEFAULT_REQUEST_TIMEOUT, USER_AGENT};
use crate::market_data::{FetchError, QuoteProvider, FINNHUB_API_BASE};

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    /// Current price.
    c: Option<f64>,
    /// Change.
    d: Option<f64>,
    /// Percent change.
    dp: Option<f64>,
    error: Option<String>,
}

/// Finnhub quote client. Requires an API key.
pub struct FinnhubQuoteSource {
    api_key: String,
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl FinnhubQuoteSource {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_client(api_key, Client::new())
    }

    pub fn with_client(api_key: impl Into<String>, client: Client) -> Self {
        Self {
            api_key: api_key.into(),
            client,
            base_url: FINNHUB_API_BASE.to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Points the client at a different host (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn parse_quote(symbol: &str, body: &str) -> Result<f64, FetchError> {
        let quote: QuoteResponse =
            serde_json::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))?;

        if let Some(error) = quote.error {
            return Err(FetchError::Provider(error));
        }

        // Finnhub answers unknown symbols with an all-zero quote.
        let price = quote
            .c
            .filter(|c| c.is_finite() && *c > 0.0)
            .ok_or_else(|| FetchError::MissingPrice(symbol.to_string()))?;

        info!(
            symbol,
            change = quote.d.unwrap_or(0.0),
            change_percent = quote.dp.unwrap_or(0.0),
            "finnhub quote change"
        );

        Ok(price)
    }
}

#[async_trait::async_trait]
impl QuoteProvider for FinnhubQuoteSource {
    async fn fetch_quote(&self, symbol: &str) -> Result<f64, FetchError> {
        let url = format!("{}/quote", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("symbol", symbol), ("token", self.api_key.as_str())])
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

        Self::parse_quote(symbol, &body)
    }

    fn name(&self) -> &str {
        "finnhub"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_QUOTE: &str = r#"{
        "c": 18.42,
        "d": -0.37,
        "dp": -1.9691,
        "h": 19.1,
        "l": 18.05,
        "o": 18.9,
        "pc": 18.79,
        "t": 1754337600
    }"#;

    #[test]
    fn test_parse_quote() {
        let price = FinnhubQuoteSource::parse_quote("SBET", SAMPLE_QUOTE).unwrap();
        assert!((price - 18.42).abs() < 1e-9);
    }

    #[test]
    fn test_parse_quote_without_change_fields() {
        let price = FinnhubQuoteSource::parse_quote("SBET", r#"{"c": 7.5}"#).unwrap();
        assert_eq!(price, 7.5);
    }

    #[test]
    fn test_zero_quote_is_missing_price() {
        let body = r#"{"c": 0, "d": null, "dp": null, "h": 0, "l": 0, "o": 0, "pc": 0, "t": 0}"#;
        let err = FinnhubQuoteSource::parse_quote("NOPE", body).unwrap_err();
        assert!(matches!(err, FetchError::MissingPrice(s) if s == "NOPE"));
    }

    #[test]
    fn test_error_field_is_provider_error() {
        let body = r#"{"error": "You don't have access to this resource."}"#;
        let err = FinnhubQuoteSource::parse_quote("SBET", body).unwrap_err();
        assert!(matches!(err, FetchError::Provider(_)));
    }

    #[test]
    fn test_non_json_is_malformed() {
        let err = FinnhubQuoteSource::parse_quote("SBET", "<html>rate limited</html>").unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));
    }

    #[test]
    fn test_provider_name_and_base_url() {
        let provider = FinnhubQuoteSource::new("key").with_base_url("http://localhost:1234/");
        assert_eq!(provider.name(), "finnhub");
        assert_eq!(provider.base_url, "http://localhost:1234");
        assert_eq!(provider.timeout, DEFAULT_REQUEST_TIMEOUT);
    }
}
