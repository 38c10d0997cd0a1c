//! Fixed-size worker pool backing session execution.
//!
//! Each worker runs one task to completion before taking the next, so the
//! pool size caps the number of sessions served at once. Connections that
//! arrive while every worker is busy wait in the queue; that is expected and
//! not reported as an error. The queue is unbounded.

use std::collections::VecDeque;
use std::io;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use thiserror::Error;
use tracing::{debug, info, warn};

pub(crate) const POOL_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::pool");

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Errors reported by the worker pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// A worker thread could not be spawned.
    #[error("failed to spawn worker {index}: {source}")]
    Spawn {
        /// Index of the worker that failed to start.
        index: usize,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// The pool is shutting down and accepts no further tasks.
    #[error("worker pool is stopping")]
    Stopping,
}

#[derive(Default)]
struct QueueState {
    tasks: VecDeque<Task>,
    stopping: bool,
}

#[derive(Default)]
struct Shared {
    queue: Mutex<QueueState>,
    available: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Bounded set of worker threads consuming a shared FIFO queue.
pub struct WorkerPool {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    size: NonZeroUsize,
}

impl WorkerPool {
    /// Starts `size` named worker threads.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Spawn`] when a thread cannot be created. Workers
    /// that did start are stopped and joined before the error is returned.
    pub fn new(size: NonZeroUsize) -> Result<Self, PoolError> {
        let shared = Arc::new(Shared::default());
        let pool = Self {
            shared,
            workers: Mutex::new(Vec::with_capacity(size.get())),
            size,
        };
        for index in 0..size.get() {
            let shared = Arc::clone(&pool.shared);
            let handle = thread::Builder::new()
                .name(format!("myftp-worker-{index}"))
                .spawn(move || run_worker(&shared, index))
                .map_err(|source| PoolError::Spawn { index, source })?;
            pool.lock_workers().push(handle);
        }
        info!(target: POOL_TARGET, workers = size.get(), "worker pool started");
        Ok(pool)
    }

    /// Number of worker threads.
    #[must_use]
    pub const fn size(&self) -> NonZeroUsize {
        self.size
    }

    /// Number of tasks waiting for a free worker.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.shared.lock().tasks.len()
    }

    /// Enqueues a task and returns without waiting for it to run.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Stopping`] once [`WorkerPool::shutdown`] has begun.
    pub fn submit<F>(&self, task: F) -> Result<(), PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        {
            let mut state = self.shared.lock();
            if state.stopping {
                return Err(PoolError::Stopping);
            }
            state.tasks.push_back(Box::new(task));
        }
        self.shared.available.notify_one();
        Ok(())
    }

    /// Stops accepting tasks, lets the workers drain the queue, and joins
    /// every worker. Calling it again is a no-op.
    pub fn shutdown(&self) {
        self.shared.lock().stopping = true;
        self.shared.available.notify_all();

        let workers = std::mem::take(&mut *self.lock_workers());
        if workers.is_empty() {
            return;
        }
        for handle in workers {
            if handle.join().is_err() {
                warn!(target: POOL_TARGET, "worker thread panicked outside a task");
            }
        }
        info!(target: POOL_TARGET, "worker pool stopped");
    }

    fn lock_workers(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.workers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(shared: &Shared, index: usize) {
    while let Some(task) = next_task(shared) {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
            warn!(
                target: POOL_TARGET,
                worker = index,
                panic = panic_message(payload.as_ref()),
                "task panicked"
            );
        }
    }
    debug!(target: POOL_TARGET, worker = index, "worker exiting");
}

/// Blocks until a task is available. Returns `None` once the pool is
/// stopping and the queue is empty.
fn next_task(shared: &Shared) -> Option<Task> {
    let mut state = shared.lock();
    loop {
        if let Some(task) = state.tasks.pop_front() {
            return Some(task);
        }
        if state.stopping {
            return None;
        }
        state = shared
            .available
            .wait(state)
            .unwrap_or_else(PoisonError::into_inner);
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
