use thiserror::Error;

/// Why a single provider call produced no price.
///
/// Callers of [`PriceSource`](super::PriceSource) never see this: it is logged
/// and the quote is returned as absent.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("provider reported an error: {0}")]
    Provider(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("no usable price for {0}")]
    MissingPrice(String),
}

#[cfg(feature = "providers")]
impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}
