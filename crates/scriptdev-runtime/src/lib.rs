//! ScriptDev Runtime
//!
//! Embeds a dynamically-typed scripting runtime behind one global lock so
//! that many host threads can compile and evaluate script snippets
//! concurrently without corrupting it.
//!
//! # Architecture
//!
//! - [`Session`] owns the runtime's lifecycle and parks its [`LockToken`]
//! - [`SessionLock`] resumes the token for one thread and re-parks it on drop
//! - [`ByteCode`] handles name compiled units kept in the session's arena
//! - [`InterruptRegistry`] lets scripts push named values back to the host
//! - Values cross the boundary as [`Variant`](scriptdev_types::Variant)

mod bytecode;
mod cache;
mod convert;
mod error;
mod globals;
mod interrupt;
mod lock;
mod session;

pub use bytecode::{ByteCode, CodeKind};
pub use cache::CachedScript;
pub use error::SessionError;
pub use globals::SCRIPT_LOG_TARGET;
pub use interrupt::{InterruptCallback, InterruptRegistry};
pub use lock::{LockToken, SessionLock};
pub use session::{DEFAULT_LOCK_WAIT, Session, SessionOptions, SessionState};

pub use scriptdev_types::{ConvertError, ScriptArgs, Variant, VariantType};
