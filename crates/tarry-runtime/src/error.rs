//! Runtime errors.

#![allow(missing_docs)]

use smol_str::SmolStr;
use tarry_syntax::ParseError;
use thiserror::Error;

/// Errors raised by evaluation, the debugger and the control server.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// Symbol is neither a local binding nor a builtin.
    #[error("unable to resolve symbol '{0}'")]
    UndefinedSymbol(SmolStr),

    /// Operand of the wrong kind.
    #[error("type mismatch: {op} expects {expected}, got {got}")]
    TypeMismatch {
        op: SmolStr,
        expected: &'static str,
        got: &'static str,
    },

    /// Wrong number of arguments.
    #[error("wrong number of arguments to {callee} (expected {expected}, got {got})")]
    Arity {
        callee: SmolStr,
        expected: SmolStr,
        got: usize,
    },

    /// Head of a call is not a function.
    #[error("{0} is not callable")]
    NotCallable(SmolStr),

    /// Special form used with invalid shape.
    #[error("malformed {form}: {reason}")]
    MalformedForm { form: SmolStr, reason: SmolStr },

    /// Form nesting or closure calls went deeper than the evaluator allows.
    #[error("evaluation nested deeper than {0} levels")]
    RecursionLimit(usize),

    /// Integer division by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// Integer arithmetic overflow.
    #[error("arithmetic overflow")]
    Overflow,

    /// Source text could not be read.
    #[error("read error: {0}")]
    Parse(#[from] ParseError),

    /// A breakpoint fired while no client was attached.
    #[error("breakpoint hit at {coordinate} but no debugger is attached")]
    NoDebuggerAttached { coordinate: SmolStr },

    /// A client reply did not parse as the requested input kind.
    #[error("malformed debugger reply: {0}")]
    MalformedReply(SmolStr),

    /// No reply arrived within the configured timeout.
    #[error("timed out waiting for debugger reply '{0}'")]
    ReplyTimeout(SmolStr),

    /// Evaluation was cancelled (`quit` or session teardown).
    #[error("evaluation cancelled")]
    Cancelled,

    /// Outbound message could not be delivered.
    #[error("transport error: {0}")]
    Transport(SmolStr),

    /// Control server failure.
    #[error("control error: {0}")]
    ControlError(SmolStr),

    /// Invalid configuration.
    #[error("invalid config: {0}")]
    InvalidConfig(SmolStr),
}

impl RuntimeError {
    /// Returns true when the error is a deliberate abort rather than a failure.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
