//! Error types for the task scheduler.

/// Errors that can occur while bringing up the worker pool.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Worker pool needs at least one thread")]
    NoWorkers,

    #[error("Worker pool is already running with {0} workers")]
    AlreadyRunning(usize),

    #[error("Failed to spawn any worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}
