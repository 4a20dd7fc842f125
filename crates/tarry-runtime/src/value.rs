//! Runtime values.

#![allow(missing_docs)]

use std::fmt;
use std::sync::Arc;

use smol_str::SmolStr;
use tarry_syntax::form::{write_float, write_string};
use tarry_syntax::Form;

use crate::debug::Coordinate;
use crate::eval::builtins::Builtin;

/// A runtime value.
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(SmolStr),
    Symbol(SmolStr),
    List(Vec<Value>),
    Vector(Vec<Value>),
    Builtin(Builtin),
    Fn(Arc<Lambda>),
}

/// A closure created by `fn`.
#[derive(Debug)]
pub struct Lambda {
    pub params: Vec<SmolStr>,
    pub body: Vec<Form>,
    /// Locals visible where the `fn` form was evaluated.
    pub captured: Vec<(SmolStr, Value)>,
    /// Coordinate of the `fn` form; body coordinates hang off it.
    pub coordinate: Coordinate,
}

impl Value {
    /// Short kind name used in error messages.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::List(_) => "list",
            Value::Vector(_) => "vector",
            Value::Builtin(_) | Value::Fn(_) => "function",
        }
    }

    /// `nil` and `false` are falsey; everything else is truthy.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// Converts a quoted form into data.
    #[must_use]
    pub fn from_form(form: &Form) -> Self {
        match form {
            Form::Nil => Value::Nil,
            Form::Bool(value) => Value::Bool(*value),
            Form::Int(value) => Value::Int(*value),
            Form::Float(value) => Value::Float(*value),
            Form::Str(value) => Value::Str(value.clone()),
            Form::Symbol(name) => Value::Symbol(name.clone()),
            Form::List(items) => Value::List(items.iter().map(Value::from_form).collect()),
            Form::Vector(items) => Value::Vector(items.iter().map(Value::from_form).collect()),
            Form::Break(inner) => Value::from_form(inner),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) | (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::List(a), Value::List(b)) | (Value::Vector(a), Value::Vector(b)) => a == b,
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            (Value::Fn(a), Value::Fn(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Bool(value) => write!(f, "{value}"),
            Value::Int(value) => write!(f, "{value}"),
            Value::Float(value) => write_float(f, *value),
            Value::Str(value) => write_string(f, value),
            Value::Symbol(name) => f.write_str(name),
            Value::List(items) => write_seq(f, "(", ")", items),
            Value::Vector(items) => write_seq(f, "[", "]", items),
            Value::Builtin(builtin) => write!(f, "#<fn {}>", builtin.name()),
            Value::Fn(_) => f.write_str("#<fn>"),
        }
    }
}

fn write_seq(f: &mut fmt::Formatter<'_>, open: &str, close: &str, items: &[Value]) -> fmt::Result {
    f.write_str(open)?;
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{item}")?;
    }
    f.write_str(close)
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;

    #[test]
    fn prints_in_reader_syntax() {
        let value = Value::Vector(vec![
            Value::Nil,
            Value::Float(2.0),
            Value::Str("a\"b".into()),
            Value::List(vec![Value::Symbol("x".into()), Value::Int(-3)]),
            Value::Builtin(Builtin::Add),
        ]);
        expect![[r#"[nil 2.0 "a\"b" (x -3) #<fn +>]"#]].assert_eq(&value.to_string());
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Int(0).is_truthy());
        assert!(Value::List(Vec::new()).is_truthy());
    }
}
