use starsdb_config::FetchConfig;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::admission::AdmissionQueue;
use crate::error::{FetchError, TransportError};
use crate::http::{AttemptOutcome, HttpGet, ReqwestGet};
use crate::rate_gate::RateGate;

/// Tunables for [`FetchExecutor`], in runtime units.
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    pub max_active_fetches: usize,
    pub target_per_minute: f64,
    pub max_attempts: u32,
    pub rate_poll_interval: Duration,
    pub too_many_requests_backoff: Duration,
    pub server_error_backoff: Duration,
}

impl From<&FetchConfig> for FetchPolicy {
    fn from(config: &FetchConfig) -> Self {
        Self {
            max_active_fetches: config.max_active_fetches,
            target_per_minute: f64::from(config.target_fetches_per_minute),
            max_attempts: config.max_attempts,
            rate_poll_interval: Duration::from_millis(config.rate_poll_interval_ms),
            too_many_requests_backoff: Duration::from_secs(config.too_many_requests_backoff_secs),
            server_error_backoff: Duration::from_secs(config.server_error_backoff_secs),
        }
    }
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self::from(&FetchConfig::default())
    }
}

/// Rate-limited, concurrency-bounded GET with status-aware retries.
///
/// Every request goes through one admission slot and one rate-gate admission,
/// however many attempts it takes. Clones share the queue, the gate and the
/// HTTP client.
#[derive(Clone)]
pub struct FetchExecutor {
    http: Arc<dyn HttpGet>,
    admission: AdmissionQueue,
    rate_gate: RateGate,
    policy: Arc<FetchPolicy>,
}

impl FetchExecutor {
    pub fn new(http: Arc<dyn HttpGet>, policy: FetchPolicy) -> Self {
        Self {
            http,
            admission: AdmissionQueue::new(policy.max_active_fetches),
            rate_gate: RateGate::new(),
            policy: Arc::new(policy),
        }
    }

    /// Executor backed by reqwest, configured from `[fetch]`.
    pub fn from_config(config: &FetchConfig) -> Result<Self, TransportError> {
        let http = ReqwestGet::new(&config.user_agent)?;
        Ok(Self::new(Arc::new(http), FetchPolicy::from(config)))
    }

    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    pub fn admission(&self) -> &AdmissionQueue {
        &self.admission
    }

    /// Fetches admitted through the rate gate in the trailing minute.
    pub fn fetches_last_minute(&self) -> usize {
        self.rate_gate.recent_count(Instant::now())
    }

    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let _slot = self.admission.enqueue().await;
        self.wait_for_rate().await;

        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let response = self
                .http
                .get(url)
                .await
                .map_err(|e| FetchError::fetch_failed(url, e.to_string()))?;

            let outcome = AttemptOutcome::classify(
                response,
                self.policy.too_many_requests_backoff,
                self.policy.server_error_backoff,
            );

            match outcome {
                AttemptOutcome::Success(body) => {
                    debug!(url, attempt, bytes = body.len(), "fetched");
                    return Ok(body);
                }
                AttemptOutcome::Fatal(reason) => {
                    return Err(FetchError::fetch_failed(url, reason));
                }
                AttemptOutcome::Retryable { status, backoff } => {
                    if attempt >= max_attempts {
                        return Err(FetchError::fetch_failed(
                            url,
                            format!("HTTP {} after {} attempts", status, attempt),
                        ));
                    }
                    warn!(
                        "HTTP {} from {} (attempt {}/{}), retrying in {:?}",
                        status, url, attempt, max_attempts, backoff
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Body decoded as UTF-8; invalid sequences are replaced.
    pub async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let bytes = self.fetch_bytes(url).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Save the body at `url` to `path`. Does nothing if `path` already exists.
    pub async fn download(&self, url: &str, path: &Path) -> Result<(), FetchError> {
        if tokio::fs::try_exists(path).await.unwrap_or(false) {
            debug!("Skipping download of {}, {:?} exists", url, path);
            return Ok(());
        }

        let bytes = self.fetch_bytes(url).await?;

        let to_download_error = |source: std::io::Error| FetchError::DownloadFailed {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(to_download_error)?;
        }
        tokio::fs::write(path, &bytes)
            .await
            .map_err(to_download_error)?;

        debug!("Downloaded {} ({} bytes) to {:?}", url, bytes.len(), path);
        Ok(())
    }

    async fn wait_for_rate(&self) {
        while !self
            .rate_gate
            .admit_below(self.policy.target_per_minute, Instant::now())
        {
            tokio::time::sleep(self.policy.rate_poll_interval).await;
        }
    }
}
