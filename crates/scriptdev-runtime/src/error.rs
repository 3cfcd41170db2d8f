//! Error types for the interpreter session.

use scriptdev_types::ConvertError;

use crate::session::SessionState;

/// Errors raised by [`Session`](crate::Session) entry points.
///
/// Syntax, evaluation and conversion errors come from caller-supplied scripts
/// and are always recoverable. Lifecycle and reentrancy errors mean the host
/// broke the init/shutdown or locking contract.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("Syntax error: {0}")]
    Syntax(String),

    #[error("Evaluation error: {0}")]
    Evaluation(String),

    #[error(transparent)]
    Convert(#[from] ConvertError),

    #[error("Session is {0}, not initialized")]
    Lifecycle(SessionState),

    #[error("Session lock is already held by the current thread")]
    Reentrant,

    #[error("Byte code handle is empty")]
    EmptyByteCode,

    #[error("Byte code {0} is not owned by this session")]
    UnknownByteCode(u64),
}

impl SessionError {
    /// Whether the error reflects a defect in the script rather than in the
    /// host integration
    pub fn is_script_error(&self) -> bool {
        matches!(
            self,
            SessionError::Syntax(_) | SessionError::Evaluation(_) | SessionError::Convert(_)
        )
    }
}
