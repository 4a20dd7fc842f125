//! Evaluation host: runs each top-level evaluation on its own thread.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use smol_str::SmolStr;
use tracing::{debug, info};

use crate::debug::{CancelToken, DebugService};
use crate::error::RuntimeError;
use crate::eval::{eval_top_level, EvalContext};
use crate::value::Value;

/// Stack reserved for each evaluation thread; deep enough for
/// [`MAX_EVAL_DEPTH`](crate::eval::MAX_EVAL_DEPTH) plus an injected expression.
pub const EVAL_STACK_SIZE: usize = 16 * 1024 * 1024;

/// How a top-level evaluation ended.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalOutcome {
    Value(Value),
    Error(RuntimeError),
    /// Cancelled by `quit` or by closing the session.
    Aborted,
}

impl From<Result<Value, RuntimeError>> for EvalOutcome {
    fn from(result: Result<Value, RuntimeError>) -> Self {
        match result {
            Ok(value) => EvalOutcome::Value(value),
            Err(err) if err.is_cancelled() => EvalOutcome::Aborted,
            Err(err) => EvalOutcome::Error(err),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EvalHost {
    debug: Arc<DebugService>,
}

impl EvalHost {
    #[must_use]
    pub fn new(debug: Arc<DebugService>) -> Self {
        Self { debug }
    }

    #[must_use]
    pub fn debug(&self) -> &Arc<DebugService> {
        &self.debug
    }

    /// Starts `code` on a named worker thread; `on_done` receives the outcome.
    pub fn spawn<F>(
        &self,
        session: impl Into<SmolStr>,
        code: impl Into<String>,
        on_done: F,
    ) -> io::Result<JoinHandle<()>>
    where
        F: FnOnce(EvalOutcome) + Send + 'static,
    {
        let session = session.into();
        let code = code.into();
        let host = self.clone();
        thread::Builder::new()
            .name(format!("tarry-eval-{session}"))
            .stack_size(EVAL_STACK_SIZE)
            .spawn(move || on_done(host.eval_blocking(&session, &code)))
    }

    /// Evaluates `code` for `session` on the calling thread.
    pub fn eval_blocking(&self, session: &str, code: &str) -> EvalOutcome {
        let cancel = CancelToken::new();
        self.debug.sessions().begin_evaluation(session, &cancel);
        debug!(session, "evaluation started");
        let result = tarry_syntax::parse_forms(code)
            .map_err(RuntimeError::from)
            .and_then(|forms| {
                let mut ctx = EvalContext::new(session, &cancel).with_hook(self.debug.as_ref());
                eval_top_level(&mut ctx, &forms)
            });
        self.debug.sessions().finish_evaluation(session, &cancel);
        let outcome = EvalOutcome::from(result);
        match &outcome {
            EvalOutcome::Aborted => info!(session, "evaluation aborted"),
            EvalOutcome::Error(err) => debug!(session, "evaluation failed: {err}"),
            EvalOutcome::Value(_) => debug!(session, "evaluation finished"),
        }
        outcome
    }

    /// Cancels the session's running evaluations and forgets the session.
    pub fn close_session(&self, session: &str) -> bool {
        self.debug.close_session(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DebugSettings;

    #[test]
    fn evaluates_without_breakpoints() {
        let host = EvalHost::new(Arc::new(DebugService::new(DebugSettings::default())));
        assert_eq!(
            host.eval_blocking("s", "(def-less 1)"),
            EvalOutcome::Error(RuntimeError::UndefinedSymbol("def-less".into()))
        );
        assert_eq!(
            host.eval_blocking("s", "1 (+ 1 1)"),
            EvalOutcome::Value(Value::Int(2))
        );
        assert_eq!(host.debug().sessions().sessions(), vec![SmolStr::new("s")]);
    }

    #[test]
    fn runaway_recursion_fails_only_its_own_evaluation() {
        let host = EvalHost::new(Arc::new(DebugService::new(DebugSettings::default())));
        let (tx, rx) = crossbeam_channel::bounded(1);
        host.spawn("s", "((fn [f] (f f)) (fn [f] (f f)))", move |outcome| {
            let _ = tx.send(outcome);
        })
        .unwrap();
        assert_eq!(
            rx.recv_timeout(std::time::Duration::from_secs(10)).unwrap(),
            EvalOutcome::Error(RuntimeError::RecursionLimit(crate::eval::MAX_EVAL_DEPTH))
        );
        assert_eq!(host.eval_blocking("s", "(+ 1 2)"), EvalOutcome::Value(Value::Int(3)));

        let nested = format!("{}1", "(".repeat(100_000));
        assert!(matches!(
            host.eval_blocking("s", &nested),
            EvalOutcome::Error(RuntimeError::Parse(_))
        ));
    }

    #[test]
    fn detached_breakpoint_is_an_error_by_default() {
        let host = EvalHost::new(Arc::new(DebugService::new(DebugSettings::default())));
        let outcome = host.eval_blocking("s", "(let [x 1] #break x)");
        assert_eq!(
            outcome,
            EvalOutcome::Error(RuntimeError::NoDebuggerAttached {
                coordinate: "[2]".into()
            })
        );
    }
}
