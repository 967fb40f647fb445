//! Execution environment: a worker pool that graphs schedule node work on.

use crate::error_channel::panic_message;
use crate::errors::{BridgeError, BridgeResult};
use flow_config::MAX_THREADS;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct Pending {
    count: Mutex<usize>,
    idle: Condvar,
}

impl Pending {
    fn count(&self) -> MutexGuard<'_, usize> {
        self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn start(&self) {
        *self.count() += 1;
    }

    fn finish(&self) {
        let mut count = self.count();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.idle.notify_all();
        }
    }
}

/// Marks one job finished on drop, including when the job unwinds
struct JobGuard(Arc<Pending>);

impl Drop for JobGuard {
    fn drop(&mut self) {
        self.0.finish();
    }
}

/// Worker pool with an outstanding-work counter
pub struct Env {
    pool: rayon::ThreadPool,
    max_threads: usize,
    pending: Arc<Pending>,
}

impl Env {
    /// Create an environment with `max_threads` workers.
    ///
    /// Zero selects the worker count from the installed configuration.
    /// Counts above [`MAX_THREADS`] are rejected.
    pub fn new(max_threads: usize) -> BridgeResult<Self> {
        let max_threads = if max_threads == 0 {
            crate::config().max_threads()
        } else {
            max_threads
        };
        if max_threads > MAX_THREADS {
            return Err(BridgeError::InvalidArgument(format!(
                "max_threads must be at most {}, got {}",
                MAX_THREADS, max_threads
            )));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(max_threads)
            .thread_name(|i| format!("flow-worker-{}", i))
            .build()
            .map_err(|e| BridgeError::Unknown(format!("failed to start worker pool: {}", e)))?;

        tracing::debug!(max_threads, "env.create");
        Ok(Self {
            pool,
            max_threads,
            pending: Arc::new(Pending::default()),
        })
    }

    pub fn max_threads(&self) -> usize {
        self.max_threads
    }

    /// Queue `job` on the pool. A panicking job is logged and counted as finished.
    pub fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.pending.start();
        let guard = JobGuard(Arc::clone(&self.pending));
        self.pool.spawn(move || {
            let _guard = guard;
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
                tracing::error!("worker job panicked: {}", panic_message(payload.as_ref()));
            }
        });
    }

    /// Block until every job spawned so far has finished.
    ///
    /// Fails on a worker of this environment, whose own job would never
    /// finish while it waits.
    pub fn wait(&self) -> BridgeResult<()> {
        if self.pool.current_thread_index().is_some() {
            return Err(BridgeError::InvalidArgument(
                "cannot wait on an environment from one of its own workers".to_string(),
            ));
        }
        let mut count = self.pending.count();
        while *count > 0 {
            count = self
                .pending
                .idle
                .wait(count)
                .unwrap_or_else(PoisonError::into_inner);
        }
        Ok(())
    }

    /// Jobs queued or running
    pub fn pending(&self) -> usize {
        *self.pending.count()
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Env")
            .field("max_threads", &self.max_threads)
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_wait_observes_all_jobs() {
        let env = Env::new(2).unwrap();
        let done = Arc::new(AtomicUsize::new(0));

        for _ in 0..16 {
            let done = Arc::clone(&done);
            env.spawn(move || {
                done.fetch_add(1, Ordering::SeqCst);
            });
        }
        env.wait().unwrap();

        assert_eq!(done.load(Ordering::SeqCst), 16);
        assert_eq!(env.pending(), 0);
    }

    #[test]
    fn test_panicking_job_still_completes() {
        let env = Env::new(1).unwrap();
        env.spawn(|| panic!("job failed"));
        env.wait().unwrap();
        assert_eq!(env.pending(), 0);
    }

    #[test]
    fn test_rejects_too_many_threads() {
        let err = Env::new(MAX_THREADS + 1).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidArgument(_)));
    }

    #[test]
    fn test_wait_from_own_worker_fails() {
        let env = Arc::new(Env::new(1).unwrap());
        let (tx, rx) = std::sync::mpsc::channel();
        let inner = Arc::clone(&env);
        env.spawn(move || {
            tx.send(inner.wait()).unwrap();
        });

        let result = rx.recv().unwrap();
        assert!(matches!(result, Err(BridgeError::InvalidArgument(_))));
        env.wait().unwrap();
    }

    #[test]
    fn test_zero_uses_configured_default() {
        let env = Env::new(0).unwrap();
        assert!(env.max_threads() >= 1);
    }
}
