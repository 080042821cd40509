use thiserror::Error;

/// Errors surfaced by page fetches, extraction and the streaming operations built on them.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("too many requests fetching {url}; check the rate limit and user agent")]
    RateLimited { url: String },

    #[error("{url} was not found, are you sure it exists?")]
    NotFound { url: String },

    #[error("unexpected status {status} fetching {url}")]
    Status { url: String, status: u16 },

    #[error("could not extract {what}: {reason}")]
    Extract { what: &'static str, reason: String },

    #[error("{kind} has no key, cannot enhance it")]
    MissingKey { kind: &'static str },

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("stream ended without a completion signal")]
    Aborted,

    #[error("{failed} batch sub-stream(s) failed, first error: {first}")]
    BatchFailed { failed: usize, first: String },
}

impl ScrapeError {
    pub(crate) fn extract(what: &'static str, reason: impl Into<String>) -> Self {
        Self::Extract { what, reason: reason.into() }
    }

    /// Whether an outer retry layer could reasonably try the same request again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Transport { .. } => true,
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

pub type ScrapeResult<T> = std::result::Result<T, ScrapeError>;
