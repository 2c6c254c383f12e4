use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport error, non-retryable status, or retries exhausted.
    #[error("Failed to fetch {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    #[error("Cache I/O failed for {path:?}: {source}")]
    CacheIoFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The entry exists but is not a gzip stream of UTF-8 text.
    #[error("Malformed cache entry {path:?}: {reason}")]
    MalformedCacheEntry { path: PathBuf, reason: String },

    #[error("Failed to write download to {path:?}: {source}")]
    DownloadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    pub fn fetch_failed(url: &str, reason: impl Into<String>) -> Self {
        FetchError::FetchFailed {
            url: url.to_string(),
            reason: reason.into(),
        }
    }
}

/// Failure below the HTTP layer: DNS, connect, TLS, body read.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        Self::new(e.to_string())
    }
}
