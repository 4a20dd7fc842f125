//! Breakpoint hook trait.

#![allow(missing_docs)]

use crate::error::RuntimeError;
use crate::value::Value;

use super::{CancelToken, Coordinate, ScopeSnapshot};

/// Everything the evaluator knows about a `#break` site when it fires.
#[derive(Debug, Clone, Copy)]
pub struct BreakpointSite<'a> {
    pub session: &'a str,
    pub coordinate: &'a Coordinate,
    pub snapshot: &'a ScopeSnapshot,
    pub cancel: &'a CancelToken,
}

/// Hook invoked for every instrumented form.
pub trait BreakpointHook: Send + Sync {
    /// Receives the value of the tagged form and returns the value the
    /// computation continues with.
    fn on_breakpoint(&self, site: BreakpointSite<'_>, value: Value) -> Result<Value, RuntimeError>;

    /// Called before each top-level form of an evaluation starts.
    fn on_top_level_form(&self, _session: &str) {}
}

/// Hook that passes every value through untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopBreakpointHook;

impl BreakpointHook for NoopBreakpointHook {
    fn on_breakpoint(
        &self,
        _site: BreakpointSite<'_>,
        value: Value,
    ) -> Result<Value, RuntimeError> {
        Ok(value)
    }
}
