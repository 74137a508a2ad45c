use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a price source is asked to price.
///
/// The set is closed: tracked equities are quoted by the equity provider and
/// the single reserve asset by the crypto spot provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PriceTarget {
    Equity(String),
    Reserve(String),
}

impl PriceTarget {
    pub fn equity(symbol: impl Into<String>) -> Self {
        Self::Equity(symbol.into().to_uppercase())
    }

    pub fn reserve(symbol: impl Into<String>) -> Self {
        Self::Reserve(symbol.into().to_uppercase())
    }

    pub fn symbol(&self) -> &str {
        match self {
            Self::Equity(symbol) | Self::Reserve(symbol) => symbol,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Equity(_) => "equity",
            Self::Reserve(_) => "reserve",
        }
    }
}

impl fmt::Display for PriceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.symbol())
    }
}

/// A single observed price.
///
/// An absent price means the fetch failed. A present price is always finite
/// and strictly positive; the constructors enforce this, and so does
/// deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawPriceQuote")]
pub struct PriceQuote {
    symbol: String,
    price: Option<f64>,
    timestamp: DateTime<Utc>,
}

#[derive(Deserialize)]
struct RawPriceQuote {
    symbol: String,
    price: Option<f64>,
    timestamp: DateTime<Utc>,
}

impl From<RawPriceQuote> for PriceQuote {
    fn from(raw: RawPriceQuote) -> Self {
        Self::new(raw.symbol, raw.price, raw.timestamp)
    }
}

impl PriceQuote {
    /// Builds a quote, discarding prices that are zero, negative or not finite.
    pub fn new(symbol: impl Into<String>, price: Option<f64>, timestamp: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.into(),
            price: price.filter(|p| p.is_finite() && *p > 0.0),
            timestamp,
        }
    }

    pub fn absent(symbol: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(symbol, None, timestamp)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn price(&self) -> Option<f64> {
        self.price
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn is_absent(&self) -> bool {
        self.price.is_none()
    }
}
