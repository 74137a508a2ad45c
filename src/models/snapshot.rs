use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{InstrumentConfig, PriceQuote};

/// mNAV for one instrument from one refresh cycle. `value` is absent when
/// any input was missing or non-positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetric {
    pub symbol: String,
    pub value: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

/// Everything one refresh cycle produced.
/// One line in the JSONL history file = one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    /// One quote per tracked equity, in tracking order.
    pub prices: Vec<PriceQuote>,
    pub reserve: PriceQuote,
    /// One metric per tracked equity, in tracking order.
    pub metrics: Vec<DerivedMetric>,
    /// Reference quantities the metrics were computed from.
    #[serde(default)]
    pub configs: Vec<InstrumentConfig>,
}

impl Snapshot {
    pub fn price(&self, symbol: &str) -> Option<f64> {
        self.prices
            .iter()
            .find(|q| q.symbol().eq_ignore_ascii_case(symbol))
            .and_then(PriceQuote::price)
    }

    pub fn metric(&self, symbol: &str) -> Option<f64> {
        self.metrics
            .iter()
            .find(|m| m.symbol.eq_ignore_ascii_case(symbol))
            .and_then(|m| m.value)
    }

    pub fn reserve_price(&self) -> Option<f64> {
        self.reserve.price()
    }

    pub fn failed_fetches(&self) -> Vec<&str> {
        self.prices
            .iter()
            .chain(std::iter::once(&self.reserve))
            .filter(|q| q.is_absent())
            .map(PriceQuote::symbol)
            .collect()
    }
}
