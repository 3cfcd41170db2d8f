//! Worker threads consuming the shared task queue.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::queue::{Pop, TaskQueue};

/// One OS thread bound to the queue-consumption loop
pub(crate) struct Worker {
    id: usize,
    handle: JoinHandle<()>,
}

/// Decrements the live-worker count when the thread exits, including by panic.
struct LiveGuard(Arc<AtomicUsize>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Worker {
    pub(crate) fn spawn(
        id: usize,
        name: String,
        queue: Arc<TaskQueue>,
        poll_interval: Duration,
        live: Arc<AtomicUsize>,
    ) -> std::io::Result<Self> {
        live.fetch_add(1, Ordering::SeqCst);
        let guard = LiveGuard(live);

        let handle = thread::Builder::new().name(name).spawn(move || {
            let _guard = guard;
            run_worker(id, &queue, poll_interval);
        });

        // On spawn failure the closure, and with it the guard, is dropped
        Ok(Self { id, handle: handle? })
    }

    /// Wait for the thread to exit. A panic inside a task surfaces here.
    pub(crate) fn join(self) {
        let id = self.id;
        if self.handle.join().is_err() {
            tracing::error!("[worker:{}] Thread terminated by a panicking task", id);
        } else {
            tracing::debug!("[worker:{}] Joined", id);
        }
    }
}

fn run_worker(id: usize, queue: &TaskQueue, poll_interval: Duration) {
    tracing::debug!("[worker:{}] Started", id);

    loop {
        match queue.pop_timeout(poll_interval) {
            Pop::Task(task) => task(),
            Pop::Idle => continue,
            Pop::Closed => break,
        }
    }

    tracing::debug!("[worker:{}] Stop requested, exiting", id);
}
