//! Worker thread loop.

use std::panic::{self, AssertUnwindSafe};

use super::{Shared, WorkItem};

/// Body of every worker thread. Returns when the pool shuts down or its lock is poisoned.
pub(super) fn run(index: usize, shared: &Shared) {
    tracing::trace!(worker = index, "Worker started");

    while let Some(item) = next_item(index, shared) {
        // A panicking item must not take the worker (or the queue lock) down with it.
        if panic::catch_unwind(AssertUnwindSafe(item)).is_err() {
            tracing::warn!(worker = index, "Work item panicked");
        }
    }

    tracing::trace!(worker = index, "Worker exiting");
}

/// Block until an item is available. `None` means the worker should exit.
fn next_item(index: usize, shared: &Shared) -> Option<WorkItem> {
    let mut queue = match shared.queue.lock() {
        Ok(queue) => queue,
        Err(_) => {
            tracing::error!(worker = index, "Worker pool lock poisoned");
            return None;
        }
    };

    while queue.items.is_empty() && !queue.shutdown {
        queue = match shared.work_available.wait(queue) {
            Ok(queue) => queue,
            Err(_) => {
                tracing::error!(worker = index, "Worker pool lock poisoned while waiting");
                return None;
            }
        };
    }

    if queue.shutdown {
        return None;
    }

    let item = queue.items.pop_front();

    if queue.draining && queue.items.is_empty() {
        shared.drained.notify_all();
    }

    item
}
