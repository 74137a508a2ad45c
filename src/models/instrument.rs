use serde::{Deserialize, Serialize};

/// Reference quantities for one tracked equity.
///
/// Zero means "not configured yet": the instrument is still tracked and
/// priced, but no mNAV is derived for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentConfig {
    pub symbol: String,
    #[serde(default)]
    pub shares_outstanding: f64,
    #[serde(default)]
    pub eth_holdings: f64,
}

impl InstrumentConfig {
    pub fn new(symbol: impl Into<String>, shares_outstanding: f64, eth_holdings: f64) -> Self {
        Self {
            symbol: symbol.into().to_uppercase(),
            shares_outstanding,
            eth_holdings,
        }
    }

    /// A tracked instrument with no reference quantities.
    pub fn unconfigured(symbol: impl Into<String>) -> Self {
        Self::new(symbol, 0.0, 0.0)
    }

    pub fn is_configured(&self) -> bool {
        self.shares_outstanding > 0.0 && self.eth_holdings > 0.0
    }
}

/// The compiled-in instrument set: SBET and BMNR, both unconfigured.
pub fn default_instruments() -> Vec<InstrumentConfig> {
    vec![
        InstrumentConfig::unconfigured("SBET"),
        InstrumentConfig::unconfigured("BMNR"),
    ]
}
