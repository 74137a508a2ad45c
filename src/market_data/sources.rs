use std::sync::Arc;

use tracing::{info, warn};

use super::FetchError;
use crate::clock::{Clock, SystemClock};
use crate::models::{PriceQuote, PriceTarget};

/// The capability the refresh cycle depends on: price one target, never fail.
///
/// Every failure cause is folded into an absent quote.
#[async_trait::async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_price(&self, target: &PriceTarget) -> PriceQuote;

    fn name(&self) -> &str;
}

/// One upstream HTTP API. Returns the raw price or the reason there is none.
#[async_trait::async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn fetch_quote(&self, symbol: &str) -> Result<f64, FetchError>;

    fn name(&self) -> &str;
}

/// Routes equity targets to the equity provider and the reserve target to the
/// crypto provider, logging one line per attempt.
pub struct PriceRouter {
    equity: Arc<dyn QuoteProvider>,
    reserve: Arc<dyn QuoteProvider>,
    clock: Arc<dyn Clock>,
}

impl PriceRouter {
    pub fn new(equity: Arc<dyn QuoteProvider>, reserve: Arc<dyn QuoteProvider>) -> Self {
        Self {
            equity,
            reserve,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn provider_for(&self, target: &PriceTarget) -> &Arc<dyn QuoteProvider> {
        match target {
            PriceTarget::Equity(_) => &self.equity,
            PriceTarget::Reserve(_) => &self.reserve,
        }
    }
}

#[async_trait::async_trait]
impl PriceSource for PriceRouter {
    async fn fetch_price(&self, target: &PriceTarget) -> PriceQuote {
        let provider = self.provider_for(target);
        let symbol = target.symbol();

        let result = provider.fetch_quote(symbol).await;
        let now = self.clock.now();

        match result {
            Ok(price) if price.is_finite() && price > 0.0 => {
                info!(
                    provider = provider.name(),
                    target = %target,
                    price,
                    "price fetched"
                );
                PriceQuote::new(symbol, Some(price), now)
            }
            Ok(price) => {
                let err = FetchError::MissingPrice(format!("{symbol} (got {price})"));
                warn!(provider = provider.name(), target = %target, error = %err, "price fetch failed");
                PriceQuote::absent(symbol, now)
            }
            Err(err) => {
                warn!(provider = provider.name(), target = %target, error = %err, "price fetch failed");
                PriceQuote::absent(symbol, now)
            }
        }
    }

    fn name(&self) -> &str {
        "router"
    }
}
