//! Per-call-site cache of the last compiled script.
//!
//! Call sites that evaluate the same text over and over (a record processed
//! every scan, say) keep one [`CachedScript`]. The text is compiled on first
//! use and again only when it changes; the previous unit is destroyed under
//! the same lock acquisition.

use scriptdev_types::{ScriptArgs, Variant};

use crate::bytecode::ByteCode;
use crate::error::SessionError;
use crate::lock::SessionLock;
use crate::session::Session;

#[derive(Debug, Default)]
pub struct CachedScript {
    text: Option<String>,
    code: ByteCode,
}

impl CachedScript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text of the currently compiled unit
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn is_compiled(&self) -> bool {
        !self.code.is_empty()
    }

    /// Evaluate `text` under an already held lock, recompiling if it differs
    /// from the cached text.
    pub fn eval(
        &mut self,
        lock: &mut SessionLock<'_>,
        text: &str,
        args: &ScriptArgs,
        debug: bool,
    ) -> Result<Variant, SessionError> {
        if self.code.is_empty() || self.text.as_deref() != Some(text) {
            lock.destroy(&mut self.code)?;
            self.text = None;

            self.code = lock.compile(text, debug)?;
            self.text = Some(text.to_string());
        }

        lock.eval(&self.code, args, debug)
    }

    /// Take the session lock and evaluate `text`.
    pub fn run(
        &mut self,
        session: &Session,
        text: &str,
        args: &ScriptArgs,
        debug: bool,
    ) -> Result<Variant, SessionError> {
        let mut lock = session.lock()?;
        self.eval(&mut lock, text, args, debug)
    }

    /// Destroy the cached unit. Must be called before the session shuts down.
    pub fn release(&mut self, session: &Session) -> Result<(), SessionError> {
        self.text = None;
        session.destroy(&mut self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        let session = Session::default();
        session.init().unwrap();
        session
    }

    #[test]
    fn test_same_text_compiles_once() {
        let session = session();
        let mut cache = CachedScript::new();
        let mut args = ScriptArgs::new();

        for i in 0..5i64 {
            args.insert("v".to_string(), Variant::from(i));
            let result = cache.run(&session, "v * 10", &args, false).unwrap();
            assert_eq!(result, Variant::Long(i * 10));
            assert_eq!(session.outstanding(), 1);
        }

        cache.release(&session).unwrap();
        assert_eq!(session.outstanding(), 0);
        assert!(!cache.is_compiled());
    }

    #[test]
    fn test_changed_text_recompiles() {
        let session = session();
        let mut cache = CachedScript::new();
        let args = ScriptArgs::new();

        assert_eq!(cache.run(&session, "1", &args, false).unwrap(), Variant::Long(1));
        assert_eq!(cache.run(&session, "2", &args, false).unwrap(), Variant::Long(2));
        assert_eq!(cache.text(), Some("2"));
        assert_eq!(session.outstanding(), 1);

        cache.release(&session).unwrap();
    }

    #[test]
    fn test_syntax_error_leaves_cache_empty() {
        let session = session();
        let mut cache = CachedScript::new();
        let args = ScriptArgs::new();

        cache.run(&session, "1", &args, false).unwrap();
        let err = cache.run(&session, "1 +", &args, false).unwrap_err();

        assert!(matches!(err, SessionError::Syntax(_)));
        assert!(!cache.is_compiled());
        assert_eq!(cache.text(), None);
        assert_eq!(session.outstanding(), 0);
    }

    #[test]
    fn test_release_of_empty_cache() {
        let session = session();
        let mut cache = CachedScript::new();
        cache.release(&session).unwrap();
    }
}
