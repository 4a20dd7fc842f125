//! Scope snapshots and evaluation against them.

use std::sync::Arc;

use indexmap::IndexMap;
use smol_str::SmolStr;
use tarry_syntax::Form;

use crate::error::RuntimeError;
use crate::eval::{eval_form, EvalContext};
use crate::value::Value;

use super::{CancelToken, Coordinate};

/// Immutable name to value mapping of the locals visible at a breakpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScopeSnapshot {
    bindings: Arc<IndexMap<SmolStr, Value>>,
}

impl ScopeSnapshot {
    /// Captures bindings ordered outermost first; inner bindings shadow
    /// outer ones of the same name.
    pub fn capture<'a, I>(bindings: I) -> Self
    where
        I: IntoIterator<Item = &'a (SmolStr, Value)>,
    {
        let mut map = IndexMap::new();
        for (name, value) in bindings {
            map.shift_remove(name);
            map.insert(name.clone(), value.clone());
        }
        Self {
            bindings: Arc::new(map),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SmolStr, &Value)> {
        self.bindings.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Locals as printed values, for breakpoint display data.
    #[must_use]
    pub fn to_display(&self) -> serde_json::Map<String, serde_json::Value> {
        self.bindings
            .iter()
            .map(|(name, value)| (name.to_string(), serde_json::Value::String(value.to_string())))
            .collect()
    }

    /// Reads `text` as one form and evaluates it with exactly the snapshot
    /// names bound.
    pub fn evaluate(&self, text: &str, cancel: &CancelToken) -> Result<Value, RuntimeError> {
        let form = tarry_syntax::parse_form(text)?;
        self.evaluate_form(&form, cancel)
    }

    pub fn evaluate_form(&self, form: &Form, cancel: &CancelToken) -> Result<Value, RuntimeError> {
        let locals = self
            .bindings
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        let mut ctx = EvalContext::new("", cancel).with_locals(locals);
        eval_form(&mut ctx, form, &Coordinate::root())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bind(name: &str, value: i64) -> (SmolStr, Value) {
        (SmolStr::new(name), Value::Int(value))
    }

    #[test]
    fn inner_bindings_shadow_outer() {
        let locals = vec![bind("x", 1), bind("y", 2), bind("x", 3)];
        let snapshot = ScopeSnapshot::capture(&locals);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get("x"), Some(&Value::Int(3)));
        let names: Vec<_> = snapshot.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, ["y", "x"]);
    }

    #[test]
    fn evaluates_against_captured_names_only() {
        let cancel = CancelToken::new();
        let snapshot = ScopeSnapshot::capture(&[bind("x", 40)]);
        assert_eq!(snapshot.evaluate("(+ x 2)", &cancel), Ok(Value::Int(42)));
        assert_eq!(
            snapshot.evaluate("y", &cancel),
            Err(RuntimeError::UndefinedSymbol("y".into()))
        );
    }

    #[test]
    fn snapshots_do_not_leak_into_each_other() {
        let cancel = CancelToken::new();
        let first = ScopeSnapshot::capture(&[bind("a", 1)]);
        let second = ScopeSnapshot::capture(&[bind("b", 2)]);
        assert!(first.evaluate("b", &cancel).is_err());
        assert!(second.evaluate("a", &cancel).is_err());
        assert_eq!(
            first.evaluate("(let [a 5] a)", &cancel),
            Ok(Value::Int(5))
        );
        assert_eq!(first.get("a"), Some(&Value::Int(1)));
    }
}
