//! Evaluator with breakpoint instrumentation.

#![allow(missing_docs)]

pub mod builtins;

use std::sync::Arc;

use smol_str::SmolStr;
use tarry_syntax::Form;

use crate::debug::{BreakpointHook, BreakpointSite, CancelToken, Coordinate, ScopeSnapshot};
use crate::error::RuntimeError;
use crate::value::{Lambda, Value};

use self::builtins::Builtin;

/// Deepest form nesting, counting closure calls, one evaluation may reach.
pub const MAX_EVAL_DEPTH: usize = 512;

/// Per-evaluation state.
pub struct EvalContext<'a> {
    pub session: &'a str,
    /// Receives `#break` sites; `None` passes them through.
    pub hook: Option<&'a dyn BreakpointHook>,
    pub cancel: &'a CancelToken,
    /// Local bindings, outermost first.
    pub locals: Vec<(SmolStr, Value)>,
    depth: usize,
}

impl<'a> EvalContext<'a> {
    pub fn new(session: &'a str, cancel: &'a CancelToken) -> Self {
        Self {
            session,
            hook: None,
            cancel,
            locals: Vec::new(),
            depth: 0,
        }
    }

    #[must_use]
    pub fn with_locals(mut self, locals: Vec<(SmolStr, Value)>) -> Self {
        self.locals = locals;
        self
    }

    #[must_use]
    pub fn with_hook(mut self, hook: &'a dyn BreakpointHook) -> Self {
        self.hook = Some(hook);
        self
    }

    fn lookup(&self, name: &str) -> Option<Value> {
        self.locals
            .iter()
            .rev()
            .find(|(local, _)| local == name)
            .map(|(_, value)| value.clone())
    }
}

/// Evaluates each form in order, every one rooted at the empty coordinate,
/// and returns the last value.
pub fn eval_top_level(ctx: &mut EvalContext<'_>, forms: &[Form]) -> Result<Value, RuntimeError> {
    let mut last = Value::Nil;
    for form in forms {
        if let Some(hook) = ctx.hook {
            hook.on_top_level_form(ctx.session);
        }
        last = eval_form(ctx, form, &Coordinate::root())?;
    }
    Ok(last)
}

/// Evaluates `form`, which sits at `at`.
pub fn eval_form(
    ctx: &mut EvalContext<'_>,
    form: &Form,
    at: &Coordinate,
) -> Result<Value, RuntimeError> {
    if ctx.depth >= MAX_EVAL_DEPTH {
        return Err(RuntimeError::RecursionLimit(MAX_EVAL_DEPTH));
    }
    ctx.depth += 1;
    let result = eval_nested(ctx, form, at);
    ctx.depth -= 1;
    result
}

fn eval_nested(
    ctx: &mut EvalContext<'_>,
    form: &Form,
    at: &Coordinate,
) -> Result<Value, RuntimeError> {
    match form {
        Form::Nil => Ok(Value::Nil),
        Form::Bool(value) => Ok(Value::Bool(*value)),
        Form::Int(value) => Ok(Value::Int(*value)),
        Form::Float(value) => Ok(Value::Float(*value)),
        Form::Str(value) => Ok(Value::Str(value.clone())),
        Form::Symbol(name) => resolve_symbol(ctx, name),
        Form::Vector(items) => {
            ctx.cancel.check()?;
            let values = eval_children(ctx, items, at, 0)?;
            Ok(Value::Vector(values))
        }
        Form::List(items) => {
            ctx.cancel.check()?;
            eval_list(ctx, items, at)
        }
        Form::Break(inner) => {
            let value = eval_form(ctx, inner, at)?;
            fire_breakpoint(ctx, at, value)
        }
    }
}

fn fire_breakpoint(
    ctx: &mut EvalContext<'_>,
    at: &Coordinate,
    value: Value,
) -> Result<Value, RuntimeError> {
    let Some(hook) = ctx.hook else {
        return Ok(value);
    };
    let snapshot = ScopeSnapshot::capture(&ctx.locals);
    let site = BreakpointSite {
        session: ctx.session,
        coordinate: at,
        snapshot: &snapshot,
        cancel: ctx.cancel,
    };
    hook.on_breakpoint(site, value)
}

fn resolve_symbol(ctx: &EvalContext<'_>, name: &SmolStr) -> Result<Value, RuntimeError> {
    if let Some(value) = ctx.lookup(name) {
        return Ok(value);
    }
    Builtin::lookup(name)
        .map(Value::Builtin)
        .ok_or_else(|| RuntimeError::UndefinedSymbol(name.clone()))
}

fn eval_children(
    ctx: &mut EvalContext<'_>,
    items: &[Form],
    at: &Coordinate,
    first_index: usize,
) -> Result<Vec<Value>, RuntimeError> {
    items
        .iter()
        .enumerate()
        .skip(first_index)
        .map(|(idx, item)| eval_form(ctx, item, &at.child(idx)))
        .collect()
}

fn eval_list(
    ctx: &mut EvalContext<'_>,
    items: &[Form],
    at: &Coordinate,
) -> Result<Value, RuntimeError> {
    let Some(head) = items.first() else {
        return Ok(Value::List(Vec::new()));
    };
    match head.as_symbol() {
        Some("quote") => eval_quote(items),
        Some("do") => eval_body(ctx, items, 1, at),
        Some("if") => eval_if(ctx, items, at),
        Some("let") => eval_let(ctx, items, at),
        Some("fn") => eval_fn(ctx, items, at),
        _ => {
            let callee = eval_form(ctx, head, &at.child(0))?;
            let args = eval_children(ctx, items, at, 1)?;
            apply(ctx, &callee, args, head)
        }
    }
}

fn malformed(form: &str, reason: &str) -> RuntimeError {
    RuntimeError::MalformedForm {
        form: SmolStr::new(form),
        reason: SmolStr::new(reason),
    }
}

fn eval_quote(items: &[Form]) -> Result<Value, RuntimeError> {
    match items {
        [_, quoted] => Ok(Value::from_form(quoted)),
        _ => Err(malformed("quote", "expects exactly one form")),
    }
}

/// Evaluates `items[start..]` in order, returning the last value or nil.
fn eval_body(
    ctx: &mut EvalContext<'_>,
    items: &[Form],
    start: usize,
    at: &Coordinate,
) -> Result<Value, RuntimeError> {
    let mut last = Value::Nil;
    for (idx, item) in items.iter().enumerate().skip(start) {
        last = eval_form(ctx, item, &at.child(idx))?;
    }
    Ok(last)
}

fn eval_if(
    ctx: &mut EvalContext<'_>,
    items: &[Form],
    at: &Coordinate,
) -> Result<Value, RuntimeError> {
    if !(3..=4).contains(&items.len()) {
        return Err(malformed("if", "expects a test, a then branch and an optional else"));
    }
    let test = eval_form(ctx, &items[1], &at.child(1))?;
    if test.is_truthy() {
        eval_form(ctx, &items[2], &at.child(2))
    } else if let Some(otherwise) = items.get(3) {
        eval_form(ctx, otherwise, &at.child(3))
    } else {
        Ok(Value::Nil)
    }
}

fn eval_let(
    ctx: &mut EvalContext<'_>,
    items: &[Form],
    at: &Coordinate,
) -> Result<Value, RuntimeError> {
    let Some(Form::Vector(bindings)) = items.get(1).map(Form::untagged) else {
        return Err(malformed("let", "expects a binding vector"));
    };
    if bindings.len() % 2 != 0 {
        return Err(malformed("let", "binding vector needs an even number of forms"));
    }
    let depth = ctx.locals.len();
    let result = bind_and_eval(ctx, bindings, items, at);
    ctx.locals.truncate(depth);
    result
}

fn bind_and_eval(
    ctx: &mut EvalContext<'_>,
    bindings: &[Form],
    items: &[Form],
    at: &Coordinate,
) -> Result<Value, RuntimeError> {
    let vector_at = at.child(1);
    for (pair_idx, pair) in bindings.chunks(2).enumerate() {
        let Some(name) = pair[0].as_symbol() else {
            return Err(malformed("let", "binding names must be symbols"));
        };
        let value = eval_form(ctx, &pair[1], &vector_at.child(pair_idx * 2 + 1))?;
        ctx.locals.push((SmolStr::new(name), value));
    }
    eval_body(ctx, items, 2, at)
}

fn eval_fn(
    ctx: &mut EvalContext<'_>,
    items: &[Form],
    at: &Coordinate,
) -> Result<Value, RuntimeError> {
    let Some(Form::Vector(params)) = items.get(1).map(Form::untagged) else {
        return Err(malformed("fn", "expects a parameter vector"));
    };
    let params = params
        .iter()
        .map(|param| {
            param
                .as_symbol()
                .map(SmolStr::new)
                .ok_or_else(|| malformed("fn", "parameters must be symbols"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::Fn(Arc::new(Lambda {
        params,
        body: items[2..].to_vec(),
        captured: ctx.locals.clone(),
        coordinate: at.clone(),
    })))
}

fn apply(
    ctx: &mut EvalContext<'_>,
    callee: &Value,
    args: Vec<Value>,
    head: &Form,
) -> Result<Value, RuntimeError> {
    match callee {
        Value::Builtin(builtin) => builtin.call(args),
        Value::Fn(lambda) => call_lambda(ctx, lambda, args),
        other => Err(RuntimeError::NotCallable(SmolStr::new(match head {
            Form::Symbol(name) => name.to_string(),
            _ => other.to_string(),
        }))),
    }
}

fn call_lambda(
    ctx: &mut EvalContext<'_>,
    lambda: &Lambda,
    args: Vec<Value>,
) -> Result<Value, RuntimeError> {
    if args.len() != lambda.params.len() {
        return Err(RuntimeError::Arity {
            callee: SmolStr::new("fn"),
            expected: SmolStr::new(lambda.params.len().to_string()),
            got: args.len(),
        });
    }
    let mut frame = lambda.captured.clone();
    frame.extend(lambda.params.iter().cloned().zip(args));
    let outer = std::mem::replace(&mut ctx.locals, frame);
    // body forms sit after `fn` and the parameter vector
    let mut result = Ok(Value::Nil);
    for (idx, form) in lambda.body.iter().enumerate() {
        result = eval_form(ctx, form, &lambda.coordinate.child(idx + 2));
        if result.is_err() {
            break;
        }
    }
    ctx.locals = outer;
    result
}
