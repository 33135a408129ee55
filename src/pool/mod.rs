//! Bounded worker pool subsystem.
//!
//! # Data Flow
//! ```text
//! listener
//!     → dispatch() (enqueue under the lock, wake one worker)
//!     → worker.rs (dequeue under the lock, run the item outside it)
//!     → destroy() (drain the queue, flip shutdown, join every worker)
//!
//! Pool States:
//!     Accepting → Draining → Shutdown (workers joined when destroy() returns)
//! ```
//!
//! # Design Decisions
//! - One mutex guards the queue and both flags
//! - `work_available` wakes idle workers, `drained` wakes the thread in destroy()
//! - Items queued before destroy() always run; items dispatched after it are dropped
//! - A poisoned lock ends only the worker that observed it

mod worker;

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use thiserror::Error;

/// Upper bound on the number of workers a pool may own.
pub const MAX_POOL_SIZE: usize = 200;

/// A pending invocation: the handler with its argument already captured.
pub type WorkItem = Box<dyn FnOnce() + Send + 'static>;

/// Error type for pool construction.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Requested size is outside `[1, MAX_POOL_SIZE]`.
    #[error("invalid pool size {requested}: must be between 1 and {max}")]
    InvalidSize { requested: usize, max: usize },

    /// The OS refused to start a worker thread.
    #[error("failed to start worker {index}: {source}")]
    Spawn {
        index: usize,
        #[source]
        source: std::io::Error,
    },
}

/// Lifecycle state of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    /// Accepting and running work.
    Accepting,
    /// No new work accepted; queued work still runs.
    Draining,
    /// Queue empty, workers told to exit.
    Shutdown,
}

/// Queue and flags, only ever touched under `Shared::queue`.
struct Queue {
    items: VecDeque<WorkItem>,
    draining: bool,
    shutdown: bool,
}

/// State shared between the pool handle and its workers.
struct Shared {
    queue: Mutex<Queue>,
    work_available: Condvar,
    drained: Condvar,
}

impl Shared {
    fn new() -> Self {
        Self {
            queue: Mutex::new(Queue {
                items: VecDeque::new(),
                draining: false,
                shutdown: false,
            }),
            work_available: Condvar::new(),
            drained: Condvar::new(),
        }
    }

    fn enqueue(&self, item: WorkItem) -> bool {
        let mut queue = match self.queue.lock() {
            Ok(queue) => queue,
            Err(_) => {
                tracing::error!("Worker pool lock poisoned, dropping work item");
                return false;
            }
        };

        if queue.draining || queue.shutdown {
            tracing::debug!("Worker pool is draining, dropping work item");
            return false;
        }

        queue.items.push_back(item);
        drop(queue);

        self.work_available.notify_one();
        true
    }

    /// Tell idle workers to exit without draining. Used when startup fails half-way.
    fn halt(&self) {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        queue.draining = true;
        queue.shutdown = true;
        drop(queue);
        self.work_available.notify_all();
    }
}

/// A fixed set of worker threads consuming a FIFO of work items.
///
/// Dropping the pool drains it the same way [`WorkerPool::destroy`] does.
pub struct WorkerPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
    terminated: bool,
}

impl WorkerPool {
    /// Start a pool of `size` workers.
    ///
    /// If a worker fails to start, the ones already running are stopped and
    /// joined before the error is returned.
    pub fn new(size: usize) -> Result<Self, PoolError> {
        Self::start(size, |index, shared| {
            thread::Builder::new()
                .name(format!("pool-worker-{index}"))
                .spawn(move || worker::run(index, &shared))
        })
    }

    fn start<S>(size: usize, mut spawn: S) -> Result<Self, PoolError>
    where
        S: FnMut(usize, Arc<Shared>) -> io::Result<JoinHandle<()>>,
    {
        if !(1..=MAX_POOL_SIZE).contains(&size) {
            return Err(PoolError::InvalidSize {
                requested: size,
                max: MAX_POOL_SIZE,
            });
        }

        let shared = Arc::new(Shared::new());
        let mut workers = Vec::with_capacity(size);

        for index in 0..size {
            match spawn(index, Arc::clone(&shared)) {
                Ok(handle) => workers.push(handle),
                Err(source) => {
                    shared.halt();
                    for handle in workers.drain(..) {
                        let _ = handle.join();
                    }
                    tracing::error!(worker = index, error = %source, "Failed to start worker");
                    return Err(PoolError::Spawn { index, source });
                }
            }
        }

        tracing::info!(workers = size, "Worker pool started");

        Ok(Self {
            shared,
            workers,
            terminated: false,
        })
    }

    /// Queue `job` for execution by the next free worker.
    ///
    /// Returns `false` when the job was dropped because the pool is draining.
    pub fn dispatch<F>(&self, job: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.enqueue(Box::new(job))
    }

    /// A cloneable handle that can dispatch into this pool from other threads,
    /// including from inside running work items.
    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Number of worker threads.
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Number of items waiting to be picked up.
    pub fn pending(&self) -> usize {
        self.shared
            .queue
            .lock()
            .map(|queue| queue.items.len())
            .unwrap_or(0)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PoolState {
        let queue = self.shared.queue.lock().unwrap_or_else(PoisonError::into_inner);
        if queue.shutdown {
            PoolState::Shutdown
        } else if queue.draining {
            PoolState::Draining
        } else {
            PoolState::Accepting
        }
    }

    /// Stop accepting work, run everything still queued, then join all workers.
    pub fn destroy(mut self) {
        self.shutdown_and_join();
    }

    fn shutdown_and_join(&mut self) {
        if self.terminated {
            return;
        }

        {
            let mut queue = self.shared.queue.lock().unwrap_or_else(PoisonError::into_inner);
            queue.draining = true;

            if !queue.items.is_empty() {
                tracing::info!(pending = queue.items.len(), "Draining worker pool");
            }
            while !queue.items.is_empty() {
                queue = self
                    .shared
                    .drained
                    .wait(queue)
                    .unwrap_or_else(PoisonError::into_inner);
            }

            queue.shutdown = true;
        }
        self.shared.work_available.notify_all();

        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                tracing::warn!("Worker thread panicked during shutdown");
            }
        }

        self.terminated = true;
        tracing::info!("Worker pool terminated");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers.len())
            .field("terminated", &self.terminated)
            .finish()
    }
}

/// Dispatch handle detached from the pool's lifetime.
#[derive(Clone)]
pub struct Dispatcher {
    shared: Arc<Shared>,
}

impl Dispatcher {
    /// Same contract as [`WorkerPool::dispatch`].
    pub fn dispatch<F>(&self, job: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.enqueue(Box::new(job))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn rejects_sizes_out_of_range() {
        assert!(matches!(
            WorkerPool::new(0),
            Err(PoolError::InvalidSize { requested: 0, .. })
        ));
        assert!(matches!(
            WorkerPool::new(MAX_POOL_SIZE + 1),
            Err(PoolError::InvalidSize { .. })
        ));
    }

    #[test]
    fn runs_dispatched_work() {
        let pool = WorkerPool::new(2).unwrap();
        let (tx, rx) = mpsc::channel();

        assert!(pool.dispatch(move || tx.send(42).unwrap()));
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 42);
        assert_eq!(pool.size(), 2);
        assert_eq!(pool.state(), PoolState::Accepting);
    }

    #[test]
    fn panicking_item_does_not_kill_worker() {
        let pool = WorkerPool::new(1).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        pool.dispatch(|| panic!("boom"));
        let c = Arc::clone(&counter);
        pool.dispatch(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        pool.destroy();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_spawn_stops_started_workers() {
        let exited = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&exited);

        let result = WorkerPool::start(4, move |index, shared| {
            if index == 2 {
                return Err(io::Error::new(io::ErrorKind::WouldBlock, "thread limit reached"));
            }
            let counter = Arc::clone(&counter);
            thread::Builder::new().spawn(move || {
                worker::run(index, &shared);
                counter.fetch_add(1, Ordering::SeqCst);
            })
        });

        assert!(matches!(result, Err(PoolError::Spawn { index: 2, .. })));
        assert_eq!(exited.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn drop_drains_like_destroy() {
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let pool = WorkerPool::new(1).unwrap();
            for _ in 0..10 {
                let c = Arc::clone(&counter);
                pool.dispatch(move || {
                    c.fetch_add(1, Ordering::SeqCst);
                });
            }
        }
        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }
}
