#[derive(Debug, thiserror::Error)]
pub enum TcgpError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Upstream error from {url}: {reason}")]
    Upstream { url: String, reason: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Write failed: {0}")]
    Write(String),

    #[error("Subscription error: {0}")]
    Subscription(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl TcgpError {
    /// Build an [`TcgpError::Upstream`] for the given URL.
    pub fn upstream(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Upstream {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// True for errors a caller may reasonably retry (network and upstream
    /// failures), false for missing data and bad input.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Upstream { .. } | Self::Write(_) | Self::Subscription(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, TcgpError>;
