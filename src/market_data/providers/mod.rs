use std::time::Duration;

pub mod coingecko;
pub mod finnhub;

pub use coingecko::CoinGeckoQuoteSource;
pub use finnhub::FinnhubQuoteSource;

/// Upper bound for a single provider request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("mnav-tracker/", env!("CARGO_PKG_VERSION"));
