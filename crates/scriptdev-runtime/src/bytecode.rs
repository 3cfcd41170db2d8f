//! Move-only handles to compiled script units.
//!
//! The compiled form itself lives in the session's arena; a [`ByteCode`]
//! only names it. Handles must be released with
//! [`SessionLock::destroy`](crate::SessionLock::destroy) before they are
//! dropped. Dropping a live handle never takes the session lock: it logs,
//! asserts in debug builds, and leaves the unit for shutdown to reclaim.

use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

use rhai::AST;

/// Ids are unique across every session in the process, so a handle from one
/// session is never mistaken for a unit of another.
static NEXT_CODE_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_code_id() -> NonZeroU64 {
    let id = NEXT_CODE_ID.fetch_add(1, Ordering::Relaxed);
    NonZeroU64::new(id).unwrap_or(NonZeroU64::MIN)
}

/// How a unit was parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeKind {
    /// Single expression; evaluation yields its value
    Expression,
    /// Statement block; evaluation yields the absent value
    Statements,
}

/// A compiled unit owned by the session arena
pub(crate) struct CodeUnit {
    pub(crate) ast: AST,
    pub(crate) kind: CodeKind,
    /// Script text, kept for diagnostics
    pub(crate) source: String,
    /// Names assigned at the top level of a statement block
    pub(crate) assigned: Vec<String>,
}

/// Opaque, move-only handle to a compiled unit.
///
/// `ByteCode` deliberately does not implement `Clone`: each handle is the one
/// owner of its unit. Share it between threads by reference (e.g. in an
/// `Arc`), never by copying.
#[derive(Debug, Default)]
pub struct ByteCode {
    id: Option<NonZeroU64>,
    kind: Option<CodeKind>,
}

impl ByteCode {
    pub(crate) fn new(id: NonZeroU64, kind: CodeKind) -> Self {
        Self {
            id: Some(id),
            kind: Some(kind),
        }
    }

    /// A handle that owns nothing
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether the handle has been released (or never owned a unit)
    pub fn is_empty(&self) -> bool {
        self.id.is_none()
    }

    /// How the unit was parsed, if the handle is live
    pub fn kind(&self) -> Option<CodeKind> {
        self.kind
    }

    pub(crate) fn id(&self) -> Option<NonZeroU64> {
        self.id
    }

    /// Give up ownership of the unit, leaving the handle empty
    pub(crate) fn take(&mut self) -> Option<NonZeroU64> {
        self.kind = None;
        self.id.take()
    }
}

impl Drop for ByteCode {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }
        if let Some(id) = self.id {
            tracing::warn!("[bytecode:{}] Dropped without destroy, unit leaked until shutdown", id);
            debug_assert!(false, "byte code {} dropped without destroy", id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_handle() {
        let code = ByteCode::empty();
        assert!(code.is_empty());
        assert_eq!(code.kind(), None);
    }

    #[test]
    fn test_take_leaves_handle_empty() {
        let mut code = ByteCode::new(next_code_id(), CodeKind::Expression);
        assert!(!code.is_empty());
        assert_eq!(code.kind(), Some(CodeKind::Expression));

        assert!(code.take().is_some());
        assert!(code.is_empty());
        assert!(code.take().is_none());
    }

    #[test]
    fn test_ids_are_unique() {
        let a = next_code_id();
        let b = next_code_id();
        assert_ne!(a, b);
    }
}
