//! ScriptDev Scheduler - Bounded worker pool for off-thread script execution
//!
//! Callers hand closures to [`Scheduler::schedule`]; a fixed set of worker
//! threads takes them off one shared FIFO queue and runs each exactly once.
//! Scheduling never blocks and reports failure only through its return value.
//!
//! ```ignore
//! let scheduler = Scheduler::new(SchedulerOptions::default());
//! scheduler.init(3)?;
//! scheduler.schedule(|| do_work());
//! scheduler.shutdown();
//! ```

mod error;
mod queue;
mod worker;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

pub use error::SchedulerError;
pub use queue::Task;

use queue::TaskQueue;
use worker::Worker;

/// Default bounded wait a worker spends on an empty queue before re-checking
/// for shutdown.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

// ─────────────────────────────────────────────────────────────────────────────
// Options
// ─────────────────────────────────────────────────────────────────────────────

/// Worker pool tuning
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    /// How long an idle worker waits on the queue per iteration
    pub poll_interval: Duration,
    /// Worker threads are named `{prefix}-{index}`
    pub thread_name_prefix: String,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            thread_name_prefix: "scriptdev-exec".to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Scheduler
// ─────────────────────────────────────────────────────────────────────────────

/// Fixed-size pool of worker threads sharing one FIFO task queue
pub struct Scheduler {
    options: SchedulerOptions,
    queue: Arc<TaskQueue>,
    workers: Mutex<Vec<Worker>>,
    live: Arc<AtomicUsize>,
}

impl Scheduler {
    pub fn new(options: SchedulerOptions) -> Self {
        Self {
            options,
            queue: Arc::new(TaskQueue::new()),
            workers: Mutex::new(Vec::new()),
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Start `n` workers and open the queue.
    ///
    /// Succeeds if at least one worker could be spawned; a partial failure is
    /// logged and the pool runs with the workers it got. Returns the number
    /// of workers started.
    pub fn init(&self, n: usize) -> Result<usize, SchedulerError> {
        if n == 0 {
            return Err(SchedulerError::NoWorkers);
        }

        let mut workers = self.workers.lock();
        if !workers.is_empty() {
            return Err(SchedulerError::AlreadyRunning(workers.len()));
        }

        let mut last_error = None;
        for id in 0..n {
            let name = format!("{}-{}", self.options.thread_name_prefix, id);
            match Worker::spawn(
                id,
                name,
                self.queue.clone(),
                self.options.poll_interval,
                self.live.clone(),
            ) {
                Ok(worker) => workers.push(worker),
                Err(e) => {
                    tracing::warn!("[scheduler] Failed to spawn worker {}: {}", id, e);
                    last_error = Some(e);
                }
            }
        }

        if workers.is_empty() {
            let err = last_error.map_or(SchedulerError::NoWorkers, SchedulerError::Spawn);
            tracing::error!("[scheduler] No worker could be started: {}", err);
            return Err(err);
        }
        if workers.len() < n {
            tracing::warn!(
                "[scheduler] Running with {} of {} requested workers",
                workers.len(),
                n
            );
        }

        self.queue.open();
        tracing::info!("[scheduler] Started {} workers", workers.len());
        Ok(workers.len())
    }

    /// Enqueue a task and wake one worker.
    ///
    /// Returns false, and drops `task` without running it, if the pool is not
    /// running or has no live workers.
    pub fn schedule<F>(&self, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.schedule_boxed(Box::new(task))
    }

    /// Same as [`schedule`](Self::schedule) for an already boxed task.
    pub fn schedule_boxed(&self, task: Task) -> bool {
        if self.live.load(Ordering::SeqCst) == 0 {
            return false;
        }
        self.queue.push(task)
    }

    /// Stop the pool and block until every worker has exited.
    ///
    /// A task already executing runs to completion. Tasks still queued are
    /// abandoned without running; their count is returned.
    pub fn shutdown(&self) -> usize {
        let mut workers = self.workers.lock();
        if workers.is_empty() {
            return 0;
        }

        let abandoned = self.queue.close();
        let count = abandoned.len();
        drop(abandoned);
        if count > 0 {
            tracing::warn!("[scheduler] Abandoned {} queued tasks at shutdown", count);
        }

        tracing::debug!("[scheduler] Joining {} workers", workers.len());
        for worker in workers.drain(..) {
            worker.join();
        }

        tracing::info!("[scheduler] Stopped");
        count
    }

    /// Whether the pool accepts tasks
    pub fn is_running(&self) -> bool {
        self.queue.is_open() && self.worker_count() > 0
    }

    /// Number of worker threads currently alive
    pub fn worker_count(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Number of tasks waiting to be picked up
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(SchedulerOptions::default())
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
