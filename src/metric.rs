//! mNAV computation.
//!
//! mNAV = (equity price × shares outstanding) / (ETH holdings × ETH price)
//!
//! The ratio is only defined when all four inputs are present and strictly
//! positive. Anything else yields `None`; that is a normal state (an
//! unconfigured instrument or a failed fetch), not an error.

use chrono::{DateTime, Utc};

use crate::models::{DerivedMetric, InstrumentConfig, PriceQuote};

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

/// Computes the market-value to reserve-value ratio. No rounding is applied.
pub fn compute_mnav(
    instrument_price: Option<f64>,
    unit_count: Option<f64>,
    reserve_holdings: Option<f64>,
    reserve_price: Option<f64>,
) -> Option<f64> {
    let price = positive(instrument_price)?;
    let units = positive(unit_count)?;
    let holdings = positive(reserve_holdings)?;
    let reserve_price = positive(reserve_price)?;

    let mnav = (price * units) / (holdings * reserve_price);
    mnav.is_finite().then_some(mnav)
}

/// Derives the metric for one instrument from quotes of the same cycle.
pub fn derive_metric(
    quote: &PriceQuote,
    config: Option<&InstrumentConfig>,
    reserve: &PriceQuote,
    timestamp: DateTime<Utc>,
) -> DerivedMetric {
    let value = compute_mnav(
        quote.price(),
        config.map(|c| c.shares_outstanding),
        config.map(|c| c.eth_holdings),
        reserve.price(),
    );

    DerivedMetric {
        symbol: quote.symbol().to_string(),
        value,
        timestamp,
    }
}
