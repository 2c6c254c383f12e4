use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::StoreError;

const OPEN_ATTEMPTS: u32 = 3;
const OPEN_RETRY_DELAY: Duration = Duration::from_secs(1);

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Read a JSON array from `path`. A missing file is an empty list.
pub async fn load_list<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StoreError> {
    let load_error = |source: io::Error| StoreError::LoadFailed {
        path: path.to_path_buf(),
        source,
    };

    let start = std::time::Instant::now();
    let data = match tokio::fs::read(path).await {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("{:?} does not exist, starting empty", path);
            return Ok(Vec::new());
        }
        Err(source) => return Err(load_error(source)),
    };

    let items: Vec<T> =
        serde_json::from_slice(&data).map_err(|e| load_error(io::Error::from(e)))?;

    debug!("Loaded {} entries from {:?} in {:?}", items.len(), path, start.elapsed());
    Ok(items)
}

/// Write `items` to `path` as an indented JSON array.
///
/// The array goes to a sibling temp file that is renamed over `path` once
/// complete, so a failed save leaves the previous snapshot in place. Another
/// process may briefly hold files in the data directory, so opening the temp
/// file is retried a few times before a last attempt whose error is returned
/// as is.
pub async fn save_list<T: Serialize>(path: &Path, items: &[T]) -> Result<(), StoreError> {
    let persist_error = |source: io::Error| StoreError::PersistFailed {
        path: path.to_path_buf(),
        source,
    };

    let json = serde_json::to_vec_pretty(items).map_err(|e| persist_error(io::Error::from(e)))?;

    let temp = temp_path(path);
    if let Err(source) = write_and_replace(&temp, path, &json).await {
        if let Err(e) = tokio::fs::remove_file(&temp).await {
            if e.kind() != ErrorKind::NotFound {
                warn!("Could not remove {:?}: {}", temp, e);
            }
        }
        return Err(persist_error(source));
    }

    debug!("Saved {} entries to {:?}", items.len(), path);
    Ok(())
}

async fn write_and_replace(temp: &Path, path: &Path, json: &[u8]) -> io::Result<()> {
    let create = |target: PathBuf| File::create(target);
    let mut file = open_patiently(temp, OPEN_ATTEMPTS, OPEN_RETRY_DELAY, create).await?;
    file.write_all(json).await?;
    file.sync_all().await?;
    drop(file);
    tokio::fs::rename(temp, path).await
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(format!(
        ".tmp{}-{}",
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    PathBuf::from(name)
}

/// Run `open` on `path`, retrying contention errors `attempts` times with
/// `delay` between tries, then once more unguarded.
async fn open_patiently<T, F, Fut>(
    path: &Path,
    attempts: u32,
    delay: Duration,
    mut open: F,
) -> io::Result<T>
where
    F: FnMut(PathBuf) -> Fut,
    Fut: Future<Output = io::Result<T>>,
{
    for attempt in 1..=attempts {
        match open(path.to_path_buf()).await {
            Ok(opened) => return Ok(opened),
            Err(e) if is_contention(&e) => {
                warn!(
                    "{:?} is busy ({}), attempt {}/{}",
                    path, e, attempt, attempts
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
    open(path.to_path_buf()).await
}

fn is_contention(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::PermissionDenied | ErrorKind::WouldBlock | ErrorKind::Interrupted
    )
}
