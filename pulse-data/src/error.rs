use thiserror::Error;

/// All errors generated in `pulse-data`.
///
/// Insufficient history and zero/negative baselines are *not* errors: they
/// surface as `None` from the history store (a normal "no signal yet" state).
#[derive(Debug, Clone, Error)]
pub enum RelayError {
    #[error("upstream unavailable ({provider}): {detail}")]
    UpstreamUnavailable {
        provider: &'static str,
        detail: String,
    },

    #[error("malformed response from {provider}: {detail}")]
    MalformedResponse {
        provider: &'static str,
        detail: String,
    },

    #[error("no provider returned a usable snapshot")]
    SnapshotEmpty,

    #[error("no market data computed yet")]
    NotReady,

    #[error("http client: {0}")]
    Http(String),
}

impl RelayError {
    pub fn upstream(provider: &'static str, detail: impl std::fmt::Display) -> Self {
        Self::UpstreamUnavailable {
            provider,
            detail: detail.to_string(),
        }
    }

    pub fn malformed(provider: &'static str, detail: impl std::fmt::Display) -> Self {
        Self::MalformedResponse {
            provider,
            detail: detail.to_string(),
        }
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value.to_string())
    }
}
