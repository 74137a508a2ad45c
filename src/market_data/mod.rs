mod error;
#[cfg(feature = "providers")]
pub mod providers;
mod sources;

pub use error::FetchError;
pub use sources::{PriceRouter, PriceSource, QuoteProvider};

/// Default Finnhub REST endpoint.
pub const FINNHUB_API_BASE: &str = "https://finnhub.io/api/v1";
/// Default CoinGecko REST endpoint.
pub const COINGECKO_API_BASE: &str = "https://api.coingecko.com/api/v3";
