//! Expiration Sweeper
//!
//! Background task that periodically removes expired cache entries.
//!
//! Expiration is already enforced lazily on every read; the sweeper only
//! reclaims the memory of entries nobody reads again.

use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::error::{CacheError, Result};

/// Handle to a running sweep task.
///
/// The task stops when [`stop`](Sweeper::stop) or
/// [`shutdown`](Sweeper::shutdown) is called, when the handle is dropped, or
/// when the sweep function reports that the cache is gone.
#[derive(Debug)]
pub struct Sweeper {
    stop_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl Sweeper {
    /// Spawns a task calling `sweep` every `interval` on the current Tokio
    /// runtime.
    ///
    /// `sweep` returns the number of entries it removed, or `None` once there
    /// is nothing left to sweep, which ends the task.
    ///
    /// # Errors
    /// Returns [`CacheError::Config`] when called outside a Tokio runtime.
    ///
    /// # Example
    /// ```ignore
    /// let sweeper = Sweeper::spawn(Duration::from_secs(1), move || {
    ///     weak.upgrade().map(|cache| cache.expire_all())
    /// })?;
    /// // Later, during shutdown:
    /// sweeper.shutdown().await;
    /// ```
    pub fn spawn<F>(interval: Duration, mut sweep: F) -> Result<Self>
    where
        F: FnMut() -> Option<usize> + Send + 'static,
    {
        let runtime = Handle::try_current().map_err(|_| {
            CacheError::Config(
                "a cleanup interval requires a running Tokio runtime".to_string(),
            )
        })?;
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let handle = runtime.spawn(async move {
            info!("Starting expiration sweeper with interval of {:?}", interval);

            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    biased;
                    // Also fires when the sender is dropped
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => match sweep() {
                        Some(0) => debug!("Expiration sweep: no expired entries found"),
                        Some(removed) => {
                            info!("Expiration sweep: removed {} expired entries", removed)
                        }
                        None => break,
                    },
                }
            }

            info!("Expiration sweeper stopped");
        });

        Ok(Self {
            stop_tx: Some(stop_tx),
            handle,
        })
    }

    // == Stop ==
    /// Signals the task to stop. No sweep starts after this returns.
    ///
    /// A sweep already in progress finishes first.
    pub fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            // Err means the task already exited
            let _ = stop_tx.send(());
        }
    }

    // == Shutdown ==
    /// Signals the task to stop and waits for it to exit.
    pub async fn shutdown(mut self) {
        self.stop();
        if let Err(err) = (&mut self.handle).await {
            debug!("Expiration sweeper ended abnormally: {}", err);
        }
    }

    /// Returns true once the task has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_sweep(counter: &Arc<AtomicUsize>) -> impl FnMut() -> Option<usize> + Send + 'static {
        let counter = Arc::clone(counter);
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Some(0)
        }
    }

    #[tokio::test]
    async fn test_sweeper_runs_periodically() {
        let runs = Arc::new(AtomicUsize::new(0));
        let sweeper = Sweeper::spawn(Duration::from_millis(10), counting_sweep(&runs)).unwrap();

        tokio::time::sleep(Duration::from_millis(65)).await;
        sweeper.shutdown().await;

        assert!(runs.load(Ordering::SeqCst) >= 3, "sweep should run repeatedly");
    }

    #[tokio::test]
    async fn test_sweeper_does_not_run_after_shutdown() {
        let runs = Arc::new(AtomicUsize::new(0));
        let sweeper = Sweeper::spawn(Duration::from_millis(5), counting_sweep(&runs)).unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        sweeper.shutdown().await;
        let after_shutdown = runs.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(runs.load(Ordering::SeqCst), after_shutdown);
    }

    #[tokio::test]
    async fn test_sweeper_skips_immediate_tick() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut sweeper = Sweeper::spawn(Duration::from_secs(60), counting_sweep(&runs)).unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        sweeper.stop();
    }

    #[tokio::test]
    async fn test_sweeper_stops_when_cache_is_gone() {
        let sweeper = Sweeper::spawn(Duration::from_millis(5), || None).unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(sweeper.is_finished(), "task should exit when sweep returns None");
    }

    #[tokio::test]
    async fn test_sweeper_stops_when_dropped() {
        let runs = Arc::new(AtomicUsize::new(0));
        let sweeper = Sweeper::spawn(Duration::from_millis(5), counting_sweep(&runs)).unwrap();
        drop(sweeper);

        tokio::time::sleep(Duration::from_millis(10)).await;
        let after_drop = runs.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(runs.load(Ordering::SeqCst), after_drop);
    }

    #[test]
    fn test_sweeper_requires_runtime() {
        let result = Sweeper::spawn(Duration::from_millis(5), || Some(0));
        assert!(matches!(result, Err(CacheError::Config(_))));
    }
}
