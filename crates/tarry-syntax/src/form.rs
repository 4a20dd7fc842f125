//! Forms produced by the reader.

#![allow(missing_docs)]

use std::fmt;

use smol_str::SmolStr;

/// A read form.
///
/// `Break` is the instrumentation tag: it wraps the form that follows
/// `#break` and occupies no coordinate slot of its own.
#[derive(Debug, Clone, PartialEq)]
pub enum Form {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(SmolStr),
    Symbol(SmolStr),
    List(Vec<Form>),
    Vector(Vec<Form>),
    Break(Box<Form>),
}

impl Form {
    /// Returns the symbol name if this form is a symbol.
    #[must_use]
    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Self::Symbol(name) => Some(name.as_str()),
            _ => None,
        }
    }

    /// Strips any number of `#break` tags.
    #[must_use]
    pub fn untagged(&self) -> &Form {
        let mut form = self;
        while let Self::Break(inner) = form {
            form = inner;
        }
        form
    }

    /// Counts the breakpoint tags in this form and its children.
    #[must_use]
    pub fn breakpoint_count(&self) -> usize {
        match self {
            Self::Break(inner) => 1 + inner.breakpoint_count(),
            Self::List(items) | Self::Vector(items) => {
                items.iter().map(Form::breakpoint_count).sum()
            }
            _ => 0,
        }
    }
}

impl fmt::Display for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => f.write_str("nil"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write_float(f, *value),
            Self::Str(value) => write_string(f, value),
            Self::Symbol(name) => f.write_str(name),
            Self::List(items) => write_seq(f, "(", ")", items),
            Self::Vector(items) => write_seq(f, "[", "]", items),
            Self::Break(inner) => write!(f, "#break {inner}"),
        }
    }
}

fn write_seq(f: &mut fmt::Formatter<'_>, open: &str, close: &str, items: &[Form]) -> fmt::Result {
    f.write_str(open)?;
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{item}")?;
    }
    f.write_str(close)
}

/// Writes a float so it reads back as a float (`1.0`, not `1`).
pub fn write_float(f: &mut impl fmt::Write, value: f64) -> fmt::Result {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        write!(f, "{value:.1}")
    } else {
        write!(f, "{value}")
    }
}

/// Writes a string literal with reader escapes.
pub fn write_string(f: &mut impl fmt::Write, value: &str) -> fmt::Result {
    f.write_char('"')?;
    for ch in value.chars() {
        match ch {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            other => f.write_char(other)?,
        }
    }
    f.write_char('"')
}
