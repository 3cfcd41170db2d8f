//! Script Host
//!
//! Ties the interpreter session and the worker pool together with the
//! ordering both require: the session is initialized before any worker
//! exists, and every worker has stopped before the session shuts down.
//!
//! Host threads never run scripts themselves. They [`submit`](ScriptHost::submit)
//! text and collect the outcome later from a [`Completion`], or pass a
//! callback that the worker invokes when the script is done.

use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

use scriptdev_runtime::{InterruptRegistry, Session, SessionError};
use scriptdev_scheduler::{Scheduler, SchedulerError};
use scriptdev_types::{ScriptArgs, Variant};

use crate::config::ScriptDevConfig;

/// Outcome of one scripted evaluation
pub type ScriptResult = Result<Variant, SessionError>;

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Worker pool error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("Worker pool rejected the task")]
    Rejected,

    #[error("Task finished without reporting a result")]
    Lost,

    #[error("Timed out waiting for the task")]
    Timeout,
}

// ─────────────────────────────────────────────────────────────────────────────
// Completion
// ─────────────────────────────────────────────────────────────────────────────

/// Receiving end of one submitted script
pub struct Completion {
    rx: mpsc::Receiver<ScriptResult>,
}

impl Completion {
    /// Block until the script has run.
    pub fn wait(self) -> Result<Variant, HostError> {
        match self.rx.recv() {
            Ok(result) => result.map_err(HostError::from),
            Err(_) => Err(HostError::Lost),
        }
    }

    /// Block at most `timeout` for the script to run.
    pub fn wait_timeout(self, timeout: Duration) -> Result<Variant, HostError> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => result.map_err(HostError::from),
            Err(mpsc::RecvTimeoutError::Timeout) => Err(HostError::Timeout),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(HostError::Lost),
        }
    }

    /// Check for the result without blocking.
    pub fn try_result(&self) -> Option<ScriptResult> {
        self.rx.try_recv().ok()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Script Host
// ─────────────────────────────────────────────────────────────────────────────

pub struct ScriptHost {
    config: ScriptDevConfig,
    session: Arc<Session>,
    scheduler: Scheduler,
}

impl ScriptHost {
    /// Initialize the session, then start the worker pool.
    pub fn start(config: ScriptDevConfig) -> Result<Self, HostError> {
        let session = Arc::new(Session::new(config.session_options()));
        session.init()?;

        let scheduler = Scheduler::new(config.scheduler_options());
        if let Err(e) = scheduler.init(config.worker_threads()) {
            if let Err(shutdown_err) = session.shutdown() {
                tracing::error!("[host] Session shutdown after failed start: {}", shutdown_err);
            }
            return Err(e.into());
        }

        tracing::info!(
            "[host] Started with {} workers",
            scheduler.worker_count()
        );
        Ok(Self {
            config,
            session,
            scheduler,
        })
    }

    pub fn config(&self) -> &ScriptDevConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn interrupts(&self) -> &Arc<InterruptRegistry> {
        self.session.interrupts()
    }

    /// Run an arbitrary closure on the pool.
    pub fn schedule<F>(&self, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.scheduler.schedule(task)
    }

    /// Evaluate `text` with `args` on the pool and hand the outcome to
    /// `on_done` on the worker thread.
    ///
    /// Script errors are logged and passed to `on_done`; they never unwind
    /// through the worker. Returns false if the pool rejected the task, in
    /// which case `on_done` is never called.
    pub fn submit_with<F>(&self, text: impl Into<String>, args: ScriptArgs, on_done: F) -> bool
    where
        F: FnOnce(ScriptResult) + Send + 'static,
    {
        let text = text.into();
        let debug = self.config.debug;
        let session = self.session.clone();

        self.scheduler.schedule(move || {
            let result = session.exec_with_args(&text, &args, debug);
            if let Err(e) = &result {
                report(&text, e);
            }
            on_done(result);
        })
    }

    /// Evaluate `text` with `args` on the pool. Returns `None` if the pool
    /// rejected the task.
    pub fn submit(&self, text: impl Into<String>, args: ScriptArgs) -> Option<Completion> {
        let (tx, rx) = mpsc::sync_channel(1);
        let accepted = self.submit_with(text, args, move |result| {
            // The caller may have dropped its Completion
            let _ = tx.send(result);
        });
        accepted.then_some(Completion { rx })
    }

    /// Evaluate `text` on the pool and wait for the outcome.
    pub fn run(&self, text: impl Into<String>, args: ScriptArgs) -> Result<Variant, HostError> {
        self.submit(text, args).ok_or(HostError::Rejected)?.wait()
    }

    /// Stop the pool, then shut the session down. Calling it again is a no-op.
    pub fn shutdown(&self) -> Result<(), HostError> {
        let abandoned = self.scheduler.shutdown();
        if abandoned > 0 {
            tracing::warn!("[host] {} submitted scripts never ran", abandoned);
        }
        self.session.shutdown()?;
        Ok(())
    }
}

impl Drop for ScriptHost {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::error!("[host] Shutdown failed: {}", e);
        }
    }
}

/// Script defects are routine and logged as warnings; anything else means the
/// host broke the session contract.
fn report(text: &str, err: &SessionError) {
    if err.is_script_error() {
        tracing::warn!("[host] Script `{}` failed: {}", text, err);
    } else {
        tracing::error!("[host] Script `{}` could not run: {}", text, err);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn host(threads: i64) -> ScriptHost {
        ScriptHost::start(ScriptDevConfig {
            num_threads: threads,
            poll_interval_ms: 20,
            lock_wait_ms: 10,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_run_expression() {
        let host = host(2);
        assert_eq!(host.run("6 * 7", ScriptArgs::new()).unwrap(), Variant::Long(42));
    }

    #[test]
    fn test_submit_with_args() {
        let host = host(2);
        let mut args = ScriptArgs::new();
        args.insert("name".to_string(), Variant::from("pump"));

        let completion = host.submit(r#"name + "-01""#, args).unwrap();
        assert_eq!(
            completion.wait_timeout(Duration::from_secs(5)).unwrap(),
            Variant::from("pump-01")
        );
    }

    #[test]
    fn test_script_errors_are_contained() {
        let host = host(1);
        let err = host.run("1 +", ScriptArgs::new()).unwrap_err();
        assert!(matches!(err, HostError::Session(SessionError::Syntax(_))));

        let err = host.run("missing_value * 2", ScriptArgs::new()).unwrap_err();
        assert!(matches!(err, HostError::Session(SessionError::Evaluation(_))));

        // The single worker survived both failures
        assert_eq!(host.run("1", ScriptArgs::new()).unwrap(), Variant::Long(1));
    }

    #[test]
    fn test_callback_completion() {
        let host = host(3);
        let (tx, rx) = mpsc::channel();

        for i in 0..10i64 {
            let mut args = ScriptArgs::new();
            args.insert("i".to_string(), Variant::from(i));
            let tx = tx.clone();
            assert!(host.submit_with("i * i", args, move |result| {
                tx.send((i, result)).unwrap();
            }));
        }

        for _ in 0..10 {
            let (i, result) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
            assert_eq!(result, Ok(Variant::Long(i * i)));
        }
    }

    #[test]
    fn test_interrupt_push_reaches_host() {
        let host = host(2);
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        host.interrupts().register("setpoint", move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        host.run(r#"iointr("setpoint", [1.0, 2.5])"#, ScriptArgs::new())
            .unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(
            host.interrupts().read("setpoint"),
            Variant::VectorDouble(vec![1.0, 2.5])
        );
    }

    #[test]
    fn test_shutdown_rejects_new_work() {
        let host = host(2);
        host.shutdown().unwrap();

        assert!(host.submit("1", ScriptArgs::new()).is_none());
        assert!(matches!(
            host.run("1", ScriptArgs::new()),
            Err(HostError::Rejected)
        ));
        // Idempotent
        host.shutdown().unwrap();
    }

    #[test]
    fn test_zero_threads_falls_back_to_default() {
        let host = host(0);
        assert_eq!(host.scheduler.worker_count(), 3);
    }
}
