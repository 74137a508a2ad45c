use anyhow::Result;
use mnav_tracker::market_data::providers::CoinGeckoQuoteSource;
use mnav_tracker::market_data::{FetchError, QuoteProvider};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn coingecko_simple_price_hits_mock_server() -> Result<()> {
    let server = MockServer::start().await;
    let provider = CoinGeckoQuoteSource::new().with_base_url(server.uri());

    Mock::given(method("GET"))
        .and(path("/simple/price"))
        .and(query_param("ids", "ethereum"))
        .and(query_param("vs_currencies", "usd"))
        .and(query_param("include_24hr_change", "true"))
        .and(query_param("include_24hr_vol", "true"))
        .and(query_param("include_market_cap", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"ethereum": {"usd": 3000.5, "usd_24h_change": 2.5, "usd_24h_vol": 1.5e10, "usd_market_cap": 3.6e11}}"#,
            "application/json",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let price = provider.fetch_quote("ETH").await?;
    assert!((price - 3000.5).abs() < 1e-9);
    Ok(())
}

#[tokio::test]
async fn coingecko_custom_mapping_and_currency() -> Result<()> {
    let server = MockServer::start().await;
    let provider = CoinGeckoQuoteSource::new()
        .with_base_url(server.uri())
        .with_quote_currency("EUR")
        .with_mapping("ETH", "ethereum-classic-test");

    Mock::given(method("GET"))
        .and(path("/simple/price"))
        .and(query_param("ids", "ethereum-classic-test"))
        .and(query_param("vs_currencies", "eur"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"ethereum-classic-test": {"eur": 21.0}}"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    assert_eq!(provider.fetch_quote("eth").await?, 21.0);
    Ok(())
}

#[tokio::test]
async fn coingecko_missing_coin_is_missing_price() -> Result<()> {
    let server = MockServer::start().await;
    let provider = CoinGeckoQuoteSource::new().with_base_url(server.uri());

    Mock::given(method("GET"))
        .and(path("/simple/price"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{}", "application/json"))
        .mount(&server)
        .await;

    let err = provider.fetch_quote("ETH").await.unwrap_err();
    assert!(matches!(err, FetchError::MissingPrice(_)));
    Ok(())
}

#[tokio::test]
async fn coingecko_null_price_is_missing_price() -> Result<()> {
    let server = MockServer::start().await;
    let provider = CoinGeckoQuoteSource::new().with_base_url(server.uri());

    Mock::given(method("GET"))
        .and(path("/simple/price"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(r#"{"ethereum": {"usd": null}}"#, "application/json"),
        )
        .mount(&server)
        .await;

    let err = provider.fetch_quote("ETH").await.unwrap_err();
    assert!(matches!(err, FetchError::MissingPrice(_)));
    Ok(())
}
