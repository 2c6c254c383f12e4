use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use sha2::{Digest, Sha512};
use starsdb_config::CacheConfig;
use std::future::Future;
use std::io::{self, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::buffer_pool::BufferPool;
use crate::error::FetchError;
use crate::executor::FetchExecutor;
use crate::rate_gate::RateGate;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Hit/miss counts over the trailing minute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheStats {
    pub hits_last_minute: usize,
    pub misses_last_minute: usize,
    pub miss_rate_percent: f64,
}

/// Disk cache of page text, one gzip file per URL.
///
/// Entries are named by the SHA-512 of the URL, so the same URL always maps to
/// the same file across runs. There is no expiry; callers drop stale pages
/// with [`ContentCache::invalidate`].
#[derive(Clone)]
pub struct ContentCache {
    root: PathBuf,
    executor: FetchExecutor,
    hits: RateGate,
    misses: RateGate,
    buffers: BufferPool,
    read_retries: u32,
    read_retry_delay: Duration,
}

impl ContentCache {
    pub fn new(
        root: impl Into<PathBuf>,
        executor: FetchExecutor,
        config: &CacheConfig,
    ) -> Result<Self, FetchError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|source| FetchError::CacheIoFailed {
            path: root.clone(),
            source,
        })?;

        let swept = sweep_temp_files(&root);
        if swept > 0 {
            info!("Removed {} stale temp files from {:?}", swept, root);
        }

        Ok(Self {
            root,
            executor,
            hits: RateGate::new(),
            misses: RateGate::new(),
            buffers: BufferPool::new(config.buffer_capacity_bytes),
            read_retries: config.read_retries,
            read_retry_delay: Duration::from_millis(config.read_retry_delay_ms),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn executor(&self) -> &FetchExecutor {
        &self.executor
    }

    pub fn path_for_url(&self, url: &str) -> PathBuf {
        self.root.join(Self::key_for_url(url))
    }

    /// Lowercase hex SHA-512 of the URL bytes.
    pub fn key_for_url(url: &str) -> String {
        let mut hasher = Sha512::new();
        hasher.update(url.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn contains(&self, url: &str) -> bool {
        self.path_for_url(url).exists()
    }

    /// Page text for `url`, from disk if cached, otherwise fetched and stored.
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let path = self.path_for_url(url);

        if let Some(text) = self.read_entry(&path).await? {
            self.hits.record(Instant::now());
            debug!("Cache hit for {}", url);
            return Ok(text);
        }

        self.misses.record(Instant::now());
        debug!("Cache miss for {}", url);
        let text = self.executor.fetch_text(url).await?;
        self.write_entry(&path, &text).await?;
        Ok(text)
    }

    /// Make sure `url` is cached without reading it back. Not counted in stats.
    pub async fn hint_fetch(&self, url: &str) -> Result<(), FetchError> {
        let path = self.path_for_url(url);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        let text = self.executor.fetch_text(url).await?;
        self.write_entry(&path, &text).await
    }

    /// Drop the entry for `url`. Missing entries are ignored.
    pub async fn invalidate(&self, url: &str) -> Result<(), FetchError> {
        let path = self.path_for_url(url);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Invalidated cache entry for {}", url);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(FetchError::CacheIoFailed { path, source }),
        }
    }

    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let hits = self.hits.recent_count(now);
        let misses = self.misses.recent_count(now);
        let total = hits + misses;
        let miss_rate_percent = if total == 0 {
            0.0
        } else {
            misses as f64 * 100.0 / total as f64
        };

        CacheStats {
            hits_last_minute: hits,
            misses_last_minute: misses,
            miss_rate_percent,
        }
    }

    /// `Ok(None)` when there is no entry.
    async fn read_entry(&self, path: &Path) -> Result<Option<String>, FetchError> {
        let read = |entry: PathBuf| tokio::fs::read(entry);
        let Some(compressed) =
            read_with_retries(path, self.read_retries, self.read_retry_delay, read).await?
        else {
            return Ok(None);
        };

        let buffers = self.buffers.clone();
        let entry = path.to_path_buf();
        let text = tokio::task::spawn_blocking(move || decode_entry(&entry, &compressed, &buffers))
            .await
            .map_err(|e| FetchError::CacheIoFailed {
                path: path.to_path_buf(),
                source: io::Error::new(ErrorKind::Other, e),
            })??;

        Ok(Some(text))
    }

    async fn write_entry(&self, path: &Path, text: &str) -> Result<(), FetchError> {
        let io_error = |source: io::Error| FetchError::CacheIoFailed {
            path: path.to_path_buf(),
            source,
        };

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(text.as_bytes()).map_err(io_error)?;
        let compressed = encoder.finish().map_err(io_error)?;

        // Readers only ever see complete entries.
        let temp = path.with_extension(format!(
            "tmp{}-{}",
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        tokio::fs::write(&temp, &compressed).await.map_err(io_error)?;
        if let Err(source) = tokio::fs::rename(&temp, path).await {
            if let Err(e) = tokio::fs::remove_file(&temp).await {
                debug!("Could not remove {:?}: {}", temp, e);
            }
            return Err(io_error(source));
        }

        debug!(
            "Cached {} bytes ({} compressed) at {:?}",
            text.len(),
            compressed.len(),
            path
        );
        Ok(())
    }
}

/// Read `path` through `read`, retrying transient failures up to `retries`
/// times with `delay` between tries. A missing entry is `Ok(None)`.
async fn read_with_retries<F, Fut>(
    path: &Path,
    retries: u32,
    delay: Duration,
    mut read: F,
) -> Result<Option<Vec<u8>>, FetchError>
where
    F: FnMut(PathBuf) -> Fut,
    Fut: Future<Output = io::Result<Vec<u8>>>,
{
    let mut attempt = 0;
    loop {
        match read(path.to_path_buf()).await {
            Ok(data) => return Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) if is_transient(e.kind()) && attempt < retries => {
                attempt += 1;
                warn!(
                    "Cache entry {:?} busy ({}), retry {}/{}",
                    path, e, attempt, retries
                );
                tokio::time::sleep(delay).await;
            }
            Err(source) => {
                return Err(FetchError::CacheIoFailed {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
    }
}

fn decode_entry(path: &Path, compressed: &[u8], buffers: &BufferPool) -> Result<String, FetchError> {
    let malformed = |reason: String| FetchError::MalformedCacheEntry {
        path: path.to_path_buf(),
        reason,
    };

    let mut buf = buffers.take();
    GzDecoder::new(compressed)
        .read_to_end(&mut buf)
        .map_err(|e| malformed(e.to_string()))?;
    let text = std::str::from_utf8(&buf).map_err(|e| malformed(e.to_string()))?;
    Ok(text.to_owned())
}

/// Remove write-in-progress files left behind by an interrupted run.
fn sweep_temp_files(root: &Path) -> usize {
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Could not scan {:?} for stale temp files: {}", root, e);
            return 0;
        }
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        if !entry.file_name().to_string_lossy().contains(".tmp") {
            continue;
        }
        match std::fs::remove_file(entry.path()) {
            Ok(()) => removed += 1,
            Err(e) => warn!("Could not remove stale temp file {:?}: {}", entry.path(), e),
        }
    }
    removed
}

fn is_transient(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::PermissionDenied
            | ErrorKind::WouldBlock
            | ErrorKind::Interrupted
            | ErrorKind::TimedOut
    )
}
