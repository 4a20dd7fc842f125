//! `tarry-runtime` - breakpoint debugger runtime and evaluation server for
//! the tarry expression language.
//!
//! Evaluations run on worker threads. When one reaches a `#break` site it
//! suspends, reports its value and locals to the attached client and waits
//! for a command (`next`, `continue`, `out`, `inject`, `eval` or `quit`).

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

/// Server configuration.
pub mod config;
/// Control server and protocol.
pub mod control;
/// Breakpoint debugging core.
pub mod debug;
/// Runtime errors.
pub mod error;
/// Expression evaluation.
pub mod eval;
/// Worker threads for top-level evaluations.
pub mod host;
/// Runtime values.
pub mod value;

pub use debug::{DebugService, ScopeSnapshot};
pub use error::RuntimeError;
pub use host::{EvalHost, EvalOutcome};
