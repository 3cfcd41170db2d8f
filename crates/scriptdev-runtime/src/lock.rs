//! The session lock: a parked execution state and the guard that resumes it.
//!
//! The runtime has no lock of its own. Exclusive access is represented by a
//! single [`LockToken`] that owns the whole execution state. While no thread
//! is inside the runtime the token is parked in the session; a
//! [`SessionLock`] takes it out on construction and parks it again when
//! dropped, including during unwinding.

use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use rhai::{AST, Dynamic, Engine, Expr, Scope, Stmt};
use scriptdev_types::{ScriptArgs, Variant};

use crate::bytecode::{ByteCode, CodeKind, CodeUnit, next_code_id};
use crate::convert::{from_dynamic, to_dynamic};
use crate::error::SessionError;
use crate::globals;
use crate::interrupt::InterruptRegistry;
use crate::session::Session;

// ─────────────────────────────────────────────────────────────────────────────
// Execution State
// ─────────────────────────────────────────────────────────────────────────────

struct ExecState {
    engine: Engine,
    /// Global namespace: functions defined by statement blocks
    library: AST,
    /// Local namespace: arguments and script variables
    locals: Scope<'static>,
    /// Arena of compiled units, keyed by byte code id
    codes: HashMap<u64, CodeUnit>,
}

/// Exclusive right to run code in the session runtime.
///
/// Move-only; exactly one exists per initialized session.
pub struct LockToken {
    state: Box<ExecState>,
}

impl LockToken {
    pub(crate) fn new(interrupts: Arc<InterruptRegistry>) -> Self {
        let mut engine = Engine::new();
        globals::install(&mut engine, interrupts);

        Self {
            state: Box::new(ExecState {
                engine,
                library: AST::empty(),
                locals: Scope::new(),
                codes: HashMap::new(),
            }),
        }
    }

    /// Units in the arena
    pub(crate) fn outstanding(&self) -> usize {
        self.state.codes.len()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session Lock
// ─────────────────────────────────────────────────────────────────────────────

/// Scoped hold on the session lock.
///
/// Obtained from [`Session::lock`]. Every operation on the runtime goes
/// through one of these.
pub struct SessionLock<'s> {
    session: &'s Session,
    token: Option<LockToken>,
}

impl<'s> SessionLock<'s> {
    pub(crate) fn new(session: &'s Session, token: LockToken) -> Self {
        Self {
            session,
            token: Some(token),
        }
    }

    /// Keep the token instead of parking it again. Used by shutdown.
    pub(crate) fn retire(mut self) -> Option<LockToken> {
        let token = self.token.take();
        self.session.slot.lock().holder = None;
        token
    }

    fn exec_state(&mut self) -> Result<&mut ExecState, SessionError> {
        let session = self.session;
        self.token
            .as_mut()
            .map(|token| &mut *token.state)
            .ok_or_else(|| SessionError::Lifecycle(session.state()))
    }

    /// Number of entries in the local scope
    pub fn scope_len(&self) -> usize {
        self.token.as_ref().map_or(0, |token| token.state.locals.len())
    }

    /// Number of units in the arena
    pub fn outstanding(&self) -> usize {
        self.token.as_ref().map_or(0, LockToken::outstanding)
    }

    /// Parse `text` as a single expression, or failing that as a statement
    /// block.
    pub fn compile(&mut self, text: &str, debug: bool) -> Result<ByteCode, SessionError> {
        let session = self.session;
        let state = self.exec_state()?;

        let (ast, kind) = match state.engine.compile_expression(text) {
            Ok(ast) => (ast, CodeKind::Expression),
            Err(_) => match state.engine.compile(text) {
                Ok(ast) => (ast, CodeKind::Statements),
                Err(e) => {
                    diagnostic(debug, "Syntax error", text, &e);
                    return Err(SessionError::Syntax(e.to_string()));
                }
            },
        };

        let assigned = match kind {
            CodeKind::Statements => assignment_targets(&ast),
            CodeKind::Expression => Vec::new(),
        };

        let id = next_code_id();
        state.codes.insert(
            id.get(),
            CodeUnit {
                ast,
                kind,
                source: text.to_string(),
                assigned,
            },
        );
        session.outstanding.fetch_add(1, Ordering::SeqCst);

        tracing::trace!("[session] Compiled unit {} as {:?}", id, kind);
        Ok(ByteCode::new(id, kind))
    }

    /// Bind `args` into the local scope and evaluate `code`.
    ///
    /// Expressions yield their value; statement blocks yield
    /// [`Variant::None`] and publish the functions they define. A value with
    /// no `Variant` representation also yields `Variant::None`.
    pub fn eval(
        &mut self,
        code: &ByteCode,
        args: &ScriptArgs,
        debug: bool,
    ) -> Result<Variant, SessionError> {
        let id = code.id().ok_or(SessionError::EmptyByteCode)?;
        let ExecState {
            engine,
            library,
            locals,
            codes,
        } = self.exec_state()?;
        let unit = codes
            .get(&id.get())
            .ok_or(SessionError::UnknownByteCode(id.get()))?;

        let before = locals.len();
        for name in &unit.assigned {
            if !locals.contains(name) {
                locals.push_dynamic(name.clone(), Dynamic::UNIT);
            }
        }
        for (name, value) in args {
            bind(locals, name, to_dynamic(value));
        }

        let ast = library.merge(&unit.ast);
        let outcome = engine.eval_ast_with_scope::<Dynamic>(locals, &ast);

        // `let` on a rerun and shadowed constants leave hidden entries behind
        if locals.len() > before {
            *locals = locals.clone_visible();
        }

        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                diagnostic(debug, "Evaluation error", &unit.source, &e);
                return Err(SessionError::Evaluation(e.to_string()));
            }
        };

        match unit.kind {
            CodeKind::Statements => {
                library.combine(unit.ast.clone_functions_only());
                Ok(Variant::None)
            }
            CodeKind::Expression => {
                let type_name = result.type_name();
                Ok(from_dynamic(result).unwrap_or_else(|| {
                    tracing::debug!(
                        "[session] Result of type {} has no Variant representation",
                        type_name
                    );
                    Variant::None
                }))
            }
        }
    }

    /// Release the unit behind `code`, leaving the handle empty.
    ///
    /// An empty handle is a no-op. A handle that names a unit this session
    /// does not own is emptied and reported.
    pub fn destroy(&mut self, code: &mut ByteCode) -> Result<(), SessionError> {
        let Some(id) = code.take() else {
            return Ok(());
        };
        let session = self.session;
        let state = self.exec_state()?;

        match state.codes.remove(&id.get()) {
            Some(_) => {
                session.outstanding.fetch_sub(1, Ordering::SeqCst);
                tracing::trace!("[session] Destroyed unit {}", id);
                Ok(())
            }
            None => Err(SessionError::UnknownByteCode(id.get())),
        }
    }

    /// Compile, evaluate with `args`, and destroy `text` in one go.
    pub fn exec(
        &mut self,
        text: &str,
        args: &ScriptArgs,
        debug: bool,
    ) -> Result<Variant, SessionError> {
        let mut code = self.compile(text, debug)?;
        let result = self.eval(&code, args, debug);
        self.destroy(&mut code)?;
        result
    }
}

impl Drop for SessionLock<'_> {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            {
                let mut slot = self.session.slot.lock();
                slot.token = Some(token);
                slot.holder = None;
            }
            self.session.released.notify_one();
        }
    }
}

/// Top-level variables a statement block assigns to.
fn assignment_targets(ast: &AST) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for stmt in ast.statements() {
        let Stmt::Assignment(assignment) = stmt else {
            continue;
        };
        // Plain, unqualified names only; `a.b = ..` and `a[i] = ..` need `a`
        if let Expr::Variable(var, ..) = &assignment.1.lhs {
            let (_, name, namespace, _) = var.as_ref();
            if namespace.is_empty() && !names.iter().any(|n| n == name.as_str()) {
                names.push(name.to_string());
            }
        }
    }
    names
}

/// Set `name` in the local scope. A script constant of the same name is
/// shadowed rather than overwritten.
fn bind(locals: &mut Scope<'static>, name: &str, value: Dynamic) {
    if locals.is_constant(name) == Some(true) {
        locals.push_dynamic(name.to_string(), value);
    } else {
        locals.set_or_push(name, value);
    }
}

/// Script diagnostics go to WARN when the caller asked for them, DEBUG
/// otherwise. The error itself is always returned.
fn diagnostic(debug: bool, what: &str, source: &str, err: &dyn Display) {
    if debug {
        tracing::warn!("[session] {} in `{}`: {}", what, source, err);
    } else {
        tracing::debug!("[session] {} in `{}`: {}", what, source, err);
    }
}
