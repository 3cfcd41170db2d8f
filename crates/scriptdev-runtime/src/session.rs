//! Interpreter Session - lifecycle and entry points of the shared runtime
//!
//! One [`Session`] owns the embedded engine, its global function library, the
//! persistent local scope, and the arena of compiled units. All of it sits
//! behind a single [`LockToken`](crate::LockToken); every entry point takes
//! the token through a [`SessionLock`] for the duration of the call.
//!
//! # Lifecycle
//!
//! `Uninitialized -> Initialized -> ShuttingDown -> Terminated`
//!
//! Entry points are only valid while `Initialized`. Shut the session down
//! only after every thread that calls into it (normally the scheduler's
//! workers) has stopped.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::thread::{self, ThreadId};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use scriptdev_types::{ScriptArgs, Variant};

use crate::bytecode::ByteCode;
use crate::error::SessionError;
use crate::interrupt::InterruptRegistry;
use crate::lock::{LockToken, SessionLock};

/// Default slice a thread waits for the session lock before re-checking the
/// session state.
pub const DEFAULT_LOCK_WAIT: Duration = Duration::from_millis(100);

// ─────────────────────────────────────────────────────────────────────────────
// Session State
// ─────────────────────────────────────────────────────────────────────────────

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized = 0,
    Initialized = 1,
    ShuttingDown = 2,
    Terminated = 3,
}

impl SessionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => SessionState::Initialized,
            2 => SessionState::ShuttingDown,
            3 => SessionState::Terminated,
            _ => SessionState::Uninitialized,
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Uninitialized => write!(f, "uninitialized"),
            SessionState::Initialized => write!(f, "initialized"),
            SessionState::ShuttingDown => write!(f, "shutting down"),
            SessionState::Terminated => write!(f, "terminated"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Options
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// How long a blocked thread waits for the lock before re-checking state
    pub lock_wait: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            lock_wait: DEFAULT_LOCK_WAIT,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

/// Where the parked token lives while no thread holds the lock
pub(crate) struct Slot {
    pub(crate) token: Option<LockToken>,
    pub(crate) holder: Option<ThreadId>,
}

/// The shared interpreter session
pub struct Session {
    options: SessionOptions,
    state: AtomicU8,
    pub(crate) slot: Mutex<Slot>,
    pub(crate) released: Condvar,
    pub(crate) outstanding: AtomicUsize,
    interrupts: Arc<InterruptRegistry>,
}

impl Session {
    pub fn new(options: SessionOptions) -> Self {
        Self::with_interrupts(options, Arc::new(InterruptRegistry::new()))
    }

    /// Create a session whose scripts push into an existing registry
    pub fn with_interrupts(options: SessionOptions, interrupts: Arc<InterruptRegistry>) -> Self {
        Self {
            options,
            state: AtomicU8::new(SessionState::Uninitialized as u8),
            slot: Mutex::new(Slot {
                token: None,
                holder: None,
            }),
            released: Condvar::new(),
            outstanding: AtomicUsize::new(0),
            interrupts,
        }
    }

    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn is_initialized(&self) -> bool {
        self.state() == SessionState::Initialized
    }

    /// Registry that `iointr` pushes into
    pub fn interrupts(&self) -> &Arc<InterruptRegistry> {
        &self.interrupts
    }

    /// Number of compiled units not yet destroyed
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Bring up the runtime and park its token.
    ///
    /// Calling `init` on an initialized session does nothing. A session that
    /// has been shut down cannot be initialized again.
    pub fn init(&self) -> Result<(), SessionError> {
        let mut slot = self.slot.lock();
        match self.state() {
            SessionState::Initialized => return Ok(()),
            SessionState::Uninitialized => {}
            other => return Err(SessionError::Lifecycle(other)),
        }

        slot.token = Some(LockToken::new(self.interrupts.clone()));
        slot.holder = None;
        self.state
            .store(SessionState::Initialized as u8, Ordering::SeqCst);

        tracing::info!("[session] Initialized");
        Ok(())
    }

    /// Take the token back for good and tear the runtime down.
    ///
    /// Waits for the current holder, if any, to release the lock. Units that
    /// were never destroyed are reclaimed with a warning. Shutting down a
    /// terminated session does nothing.
    pub fn shutdown(&self) -> Result<(), SessionError> {
        if let Err(current) = self.state.compare_exchange(
            SessionState::Initialized as u8,
            SessionState::ShuttingDown as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        ) {
            return match SessionState::from_u8(current) {
                SessionState::Terminated => Ok(()),
                other => Err(SessionError::Lifecycle(other)),
            };
        }

        // Waiters re-check the state and give up
        self.released.notify_all();

        let token = match self.acquire(false) {
            Ok(guard) => guard.retire(),
            Err(e) => {
                self.state
                    .store(SessionState::Initialized as u8, Ordering::SeqCst);
                tracing::error!("[session] Shutdown aborted: {}", e);
                return Err(e);
            }
        };

        if let Some(token) = token {
            let leaked = token.outstanding();
            if leaked > 0 {
                tracing::warn!(
                    "[session] Reclaiming {} byte code units never destroyed",
                    leaked
                );
            }
            drop(token);
        }

        self.outstanding.store(0, Ordering::SeqCst);
        self.state
            .store(SessionState::Terminated as u8, Ordering::SeqCst);
        tracing::info!("[session] Terminated");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Locking
    // ─────────────────────────────────────────────────────────────────────────

    /// Take the session lock, blocking while another thread holds it.
    ///
    /// Use the returned guard to batch several operations under one
    /// acquisition. Taking the lock again from the holding thread fails with
    /// [`SessionError::Reentrant`] instead of deadlocking.
    pub fn lock(&self) -> Result<SessionLock<'_>, SessionError> {
        self.acquire(true)
    }

    /// `check_state` is false only for shutdown, which must get the token
    /// while the state is already `ShuttingDown`.
    fn acquire(&self, check_state: bool) -> Result<SessionLock<'_>, SessionError> {
        let me = thread::current().id();
        let mut slot = self.slot.lock();

        loop {
            if check_state {
                let state = self.state();
                if state != SessionState::Initialized {
                    return Err(SessionError::Lifecycle(state));
                }
            }
            if slot.holder == Some(me) {
                return Err(SessionError::Reentrant);
            }
            if let Some(token) = slot.token.take() {
                slot.holder = Some(me);
                return Ok(SessionLock::new(self, token));
            }
            if slot.holder.is_none() {
                // Nobody holds the token and none is parked
                return Err(SessionError::Lifecycle(self.state()));
            }

            self.released.wait_for(&mut slot, self.options.lock_wait);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Entry points
    // ─────────────────────────────────────────────────────────────────────────

    /// Parse `text` as an expression, or failing that as a statement block.
    pub fn compile(&self, text: &str, debug: bool) -> Result<ByteCode, SessionError> {
        self.lock()?.compile(text, debug)
    }

    /// Evaluate a compiled unit with `args` bound into the local scope.
    pub fn eval(
        &self,
        code: &ByteCode,
        args: &ScriptArgs,
        debug: bool,
    ) -> Result<Variant, SessionError> {
        self.lock()?.eval(code, args, debug)
    }

    /// Compile and evaluate `text` once without arguments.
    pub fn exec(&self, text: &str, debug: bool) -> Result<Variant, SessionError> {
        self.lock()?.exec(text, &ScriptArgs::new(), debug)
    }

    /// Compile and evaluate `text` once with `args` bound.
    pub fn exec_with_args(
        &self,
        text: &str,
        args: &ScriptArgs,
        debug: bool,
    ) -> Result<Variant, SessionError> {
        self.lock()?.exec(text, args, debug)
    }

    /// Release the unit behind `code`. An empty handle is a no-op.
    pub fn destroy(&self, code: &mut ByteCode) -> Result<(), SessionError> {
        if code.is_empty() {
            return Ok(());
        }
        self.lock()?.destroy(code)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionOptions::default())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
