use futures::stream::{self, StreamExt};
use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Cooperative shutdown signal shared by every worker of a run.
#[derive(Clone, Default)]
pub struct ShutdownFlag {
    requested: Arc<AtomicBool>,
}

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParallelSummary {
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Run `handler` over `items`, at most `parallelism` at a time (0 means no
/// limit).
///
/// A failing item is logged and counted; the rest of the batch carries on.
/// Items that have not started when `shutdown` is requested are skipped.
pub async fn parallel_op<T, F, Fut, E>(
    items: Vec<T>,
    name: &str,
    parallelism: usize,
    shutdown: &ShutdownFlag,
    handler: F,
) -> ParallelSummary
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: Display,
{
    let total = items.len();
    let progress = Progress::default();

    info!("{}: starting {} items (parallelism {})", name, total, parallelism);

    let limit = if parallelism == 0 { None } else { Some(parallelism) };
    let progress_ref = &progress;
    let handler = &handler;
    stream::iter(items)
        .for_each_concurrent(limit, move |item| async move {
            if shutdown.is_requested() {
                progress_ref.skipped.fetch_add(1, Ordering::SeqCst);
            } else {
                match handler(item).await {
                    Ok(()) => {
                        progress_ref.completed.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(e) => {
                        progress_ref.failed.fetch_add(1, Ordering::SeqCst);
                        warn!("{}: item failed: {}", name, e);
                    }
                }
            }
            progress_ref.step(name, total);
        })
        .await;

    let summary = ParallelSummary {
        completed: progress.completed.into_inner(),
        failed: progress.failed.into_inner(),
        skipped: progress.skipped.into_inner(),
    };

    if summary.skipped > 0 {
        info!(
            "{}: stopped early, {} completed, {} failed, {} skipped",
            name, summary.completed, summary.failed, summary.skipped
        );
    } else {
        info!(
            "{}: finished, {} completed, {} failed",
            name, summary.completed, summary.failed
        );
    }

    summary
}

#[derive(Default)]
struct Progress {
    completed: AtomicUsize,
    failed: AtomicUsize,
    skipped: AtomicUsize,
    finished: AtomicUsize,
    last_percent: AtomicUsize,
}

impl Progress {
    /// Log once per whole percent.
    fn step(&self, name: &str, total: usize) {
        let done = self.finished.fetch_add(1, Ordering::SeqCst) + 1;
        let percent = done * 100 / total.max(1);
        if self.last_percent.fetch_max(percent, Ordering::SeqCst) < percent {
            info!("{}: {}% ({}/{})", name, percent, done, total);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_failures_are_counted_not_fatal() {
        let shutdown = ShutdownFlag::new();
        let summary = parallel_op((1..=10).collect(), "numbers", 3, &shutdown, |n: u32| async move {
            if n % 4 == 0 {
                Err(format!("{} is unlucky", n))
            } else {
                Ok(())
            }
        })
        .await;

        assert_eq!(summary, ParallelSummary { completed: 8, failed: 2, skipped: 0 });
    }

    #[tokio::test]
    async fn test_parallelism_is_bounded() {
        let shutdown = ShutdownFlag::new();
        let active_count = AtomicUsize::new(0);
        let peak_count = AtomicUsize::new(0);
        let active = &active_count;
        let peak = &peak_count;

        let summary = parallel_op((0..20).collect(), "bounded", 4, &shutdown, move |_: u32| {
            async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                Ok::<(), String>(())
            }
        })
        .await;

        assert_eq!(summary.completed, 20);
        assert!(peak.load(Ordering::SeqCst) <= 4);
        assert!(peak.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test]
    async fn test_shutdown_skips_unstarted_items() {
        let shutdown = ShutdownFlag::new();
        let trigger = shutdown.clone();

        let summary = parallel_op((0..10).collect(), "stopping", 1, &shutdown, |n: u32| {
            let trigger = trigger.clone();
            async move {
                if n == 2 {
                    trigger.request();
                }
                Ok::<(), String>(())
            }
        })
        .await;

        assert_eq!(summary, ParallelSummary { completed: 3, failed: 0, skipped: 7 });
        assert!(shutdown.is_requested());
    }
}
