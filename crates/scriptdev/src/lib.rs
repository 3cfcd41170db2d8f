//! ScriptDev
//!
//! Asynchronous script execution for multi-threaded hosts: host threads
//! submit script text, a bounded worker pool evaluates it in one shared
//! interpreter session, and typed [`Variant`] results come back.
//!
//! - [`config`]: layered settings (defaults, TOML file, `SCRIPTDEV_*` env)
//! - [`host`]: [`ScriptHost`], ordered start/stop and error-containing tasks
//! - [`shell`]: argument parsing and the line-oriented shell

pub mod config;
pub mod host;
pub mod shell;

pub use config::ScriptDevConfig;
pub use host::{Completion, HostError, ScriptHost, ScriptResult};

pub use scriptdev_runtime::{
    ByteCode, CachedScript, InterruptRegistry, Session, SessionError, SessionLock,
};
pub use scriptdev_scheduler::Scheduler;
pub use scriptdev_types::{ConvertError, ScriptArgs, Variant, VariantType};
