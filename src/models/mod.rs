mod instrument;
mod quote;
mod snapshot;

pub use instrument::{default_instruments, InstrumentConfig};
pub use quote::{PriceQuote, PriceTarget};
pub use snapshot::{DerivedMetric, Snapshot};
