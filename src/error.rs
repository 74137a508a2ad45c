//! Caller-visible error taxonomy.
//!
//! Fetch failures and skipped metric computations are not errors here: they
//! flow through the data model as absent values. Only conditions a caller has
//! to act on are represented.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrackerError {
    /// Config update for a symbol that is not tracked.
    #[error("unknown instrument: {0}")]
    UnknownInstrument(String),

    /// Missing or non-numeric fields on a config update.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The persistence layer could not be read or written.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl TrackerError {
    /// True for errors caused by the request rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::UnknownInstrument(_) | Self::Validation(_))
    }
}

impl From<anyhow::Error> for TrackerError {
    fn from(err: anyhow::Error) -> Self {
        Self::Storage(format!("{err:#}"))
    }
}
