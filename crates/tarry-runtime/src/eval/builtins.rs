//! Builtin functions.

use smol_str::SmolStr;

use crate::error::RuntimeError;
use crate::value::Value;

/// Global functions. These resolve after locals and are never part of a
/// scope snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Lt,
    Gt,
    Le,
    Ge,
    Not,
    Inc,
    Dec,
    Str,
    List,
    Vector,
    Count,
}

const ALL: &[Builtin] = &[
    Builtin::Add,
    Builtin::Sub,
    Builtin::Mul,
    Builtin::Div,
    Builtin::Mod,
    Builtin::Eq,
    Builtin::Lt,
    Builtin::Gt,
    Builtin::Le,
    Builtin::Ge,
    Builtin::Not,
    Builtin::Inc,
    Builtin::Dec,
    Builtin::Str,
    Builtin::List,
    Builtin::Vector,
    Builtin::Count,
];

impl Builtin {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Add => "+",
            Builtin::Sub => "-",
            Builtin::Mul => "*",
            Builtin::Div => "/",
            Builtin::Mod => "mod",
            Builtin::Eq => "=",
            Builtin::Lt => "<",
            Builtin::Gt => ">",
            Builtin::Le => "<=",
            Builtin::Ge => ">=",
            Builtin::Not => "not",
            Builtin::Inc => "inc",
            Builtin::Dec => "dec",
            Builtin::Str => "str",
            Builtin::List => "list",
            Builtin::Vector => "vector",
            Builtin::Count => "count",
        }
    }

    #[must_use]
    pub fn lookup(name: &str) -> Option<Self> {
        ALL.iter().copied().find(|builtin| builtin.name() == name)
    }

    pub fn call(self, args: Vec<Value>) -> Result<Value, RuntimeError> {
        match self {
            Builtin::Add => fold_numeric(self, args, Value::Int(0), Arith::Add),
            Builtin::Mul => fold_numeric(self, args, Value::Int(1), Arith::Mul),
            Builtin::Sub => match args.len() {
                0 => Err(arity(self, "at least 1", 0)),
                1 => arith(self, Arith::Sub, Value::Int(0), first(args)),
                _ => fold_rest(self, args, Arith::Sub),
            },
            Builtin::Div => match args.len() {
                0 => Err(arity(self, "at least 1", 0)),
                1 => arith(self, Arith::Div, Value::Int(1), first(args)),
                _ => fold_rest(self, args, Arith::Div),
            },
            Builtin::Mod => {
                let [a, b] = exact::<2>(self, args)?;
                modulo(self, a, b)
            }
            Builtin::Eq => {
                if args.is_empty() {
                    return Err(arity(self, "at least 1", 0));
                }
                Ok(Value::Bool(args.windows(2).all(|pair| pair[0] == pair[1])))
            }
            Builtin::Lt | Builtin::Gt | Builtin::Le | Builtin::Ge => compare_chain(self, &args),
            Builtin::Not => {
                let [value] = exact::<1>(self, args)?;
                Ok(Value::Bool(!value.is_truthy()))
            }
            Builtin::Inc => {
                let [value] = exact::<1>(self, args)?;
                arith(self, Arith::Add, value, Value::Int(1))
            }
            Builtin::Dec => {
                let [value] = exact::<1>(self, args)?;
                arith(self, Arith::Sub, value, Value::Int(1))
            }
            Builtin::Str => {
                let mut out = String::new();
                for value in &args {
                    match value {
                        Value::Nil => {}
                        Value::Str(text) => out.push_str(text),
                        other => out.push_str(&other.to_string()),
                    }
                }
                Ok(Value::Str(SmolStr::new(out)))
            }
            Builtin::List => Ok(Value::List(args)),
            Builtin::Vector => Ok(Value::Vector(args)),
            Builtin::Count => {
                let [value] = exact::<1>(self, args)?;
                let count = match &value {
                    Value::Nil => 0,
                    Value::List(items) | Value::Vector(items) => items.len(),
                    Value::Str(text) => text.chars().count(),
                    other => return Err(mismatch(self, "a collection", other)),
                };
                i64::try_from(count)
                    .map(Value::Int)
                    .map_err(|_| RuntimeError::Overflow)
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Arith {
    Add,
    Sub,
    Mul,
    Div,
}

fn first(args: Vec<Value>) -> Value {
    args.into_iter().next().unwrap_or(Value::Nil)
}

fn exact<const N: usize>(builtin: Builtin, args: Vec<Value>) -> Result<[Value; N], RuntimeError> {
    let got = args.len();
    <[Value; N]>::try_from(args).map_err(|_| arity(builtin, &N.to_string(), got))
}

fn arity(builtin: Builtin, expected: &str, got: usize) -> RuntimeError {
    RuntimeError::Arity {
        callee: SmolStr::new(builtin.name()),
        expected: SmolStr::new(expected),
        got,
    }
}

fn mismatch(builtin: Builtin, expected: &'static str, got: &Value) -> RuntimeError {
    RuntimeError::TypeMismatch {
        op: SmolStr::new(builtin.name()),
        expected,
        got: got.kind_name(),
    }
}

fn fold_numeric(
    builtin: Builtin,
    args: Vec<Value>,
    init: Value,
    op: Arith,
) -> Result<Value, RuntimeError> {
    args.into_iter()
        .try_fold(init, |acc, value| arith(builtin, op, acc, value))
}

fn fold_rest(builtin: Builtin, args: Vec<Value>, op: Arith) -> Result<Value, RuntimeError> {
    let mut iter = args.into_iter();
    let init = iter.next().unwrap_or(Value::Nil);
    iter.try_fold(init, |acc, value| arith(builtin, op, acc, value))
}

fn arith(builtin: Builtin, op: Arith, left: Value, right: Value) -> Result<Value, RuntimeError> {
    match (&left, &right) {
        (Value::Int(a), Value::Int(b)) => int_arith(op, *a, *b),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            let a = as_f64(&left);
            let b = as_f64(&right);
            Ok(Value::Float(match op {
                Arith::Add => a + b,
                Arith::Sub => a - b,
                Arith::Mul => a * b,
                Arith::Div => a / b,
            }))
        }
        (Value::Int(_) | Value::Float(_), other) | (other, _) => {
            Err(mismatch(builtin, "numbers", other))
        }
    }
}

fn int_arith(op: Arith, a: i64, b: i64) -> Result<Value, RuntimeError> {
    let result = match op {
        Arith::Add => a.checked_add(b),
        Arith::Sub => a.checked_sub(b),
        Arith::Mul => a.checked_mul(b),
        Arith::Div => {
            if b == 0 {
                return Err(RuntimeError::DivisionByZero);
            }
            match a.checked_rem(b) {
                Some(0) => a.checked_div(b),
                Some(_) => return Ok(Value::Float(a as f64 / b as f64)),
                None => None,
            }
        }
    };
    result.map(Value::Int).ok_or(RuntimeError::Overflow)
}

fn as_f64(value: &Value) -> f64 {
    match value {
        Value::Int(v) => *v as f64,
        Value::Float(v) => *v,
        _ => f64::NAN,
    }
}

fn modulo(builtin: Builtin, a: Value, b: Value) -> Result<Value, RuntimeError> {
    match (&a, &b) {
        (Value::Int(_), Value::Int(0)) => Err(RuntimeError::DivisionByZero),
        (Value::Int(x), Value::Int(y)) => {
            let rem = x.checked_rem(*y).ok_or(RuntimeError::Overflow)?;
            // result takes the sign of the divisor
            if rem != 0 && (rem < 0) != (*y < 0) {
                Ok(Value::Int(rem + y))
            } else {
                Ok(Value::Int(rem))
            }
        }
        (Value::Int(_), other) | (other, _) => Err(mismatch(builtin, "integers", other)),
    }
}

fn compare_chain(builtin: Builtin, args: &[Value]) -> Result<Value, RuntimeError> {
    if args.is_empty() {
        return Err(arity(builtin, "at least 1", 0));
    }
    for value in args {
        if !matches!(value, Value::Int(_) | Value::Float(_)) {
            return Err(mismatch(builtin, "numbers", value));
        }
    }
    let holds = args.windows(2).all(|pair| {
        let ordering = match (&pair[0], &pair[1]) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (a, b) => as_f64(a).partial_cmp(&as_f64(b)),
        };
        match (builtin, ordering) {
            (_, None) => false,
            (Builtin::Lt, Some(ord)) => ord.is_lt(),
            (Builtin::Gt, Some(ord)) => ord.is_gt(),
            (Builtin::Le, Some(ord)) => ord.is_le(),
            (_, Some(ord)) => ord.is_ge(),
        }
    });
    Ok(Value::Bool(holds))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: Vec<Value>) -> Result<Value, RuntimeError> {
        Builtin::lookup(name).expect("builtin").call(args)
    }

    #[test]
    fn arithmetic_promotes_and_checks() {
        assert_eq!(call("+", vec![]).unwrap(), Value::Int(0));
        assert_eq!(
            call("+", vec![Value::Int(1), Value::Float(0.5)]).unwrap(),
            Value::Float(1.5)
        );
        assert_eq!(call("-", vec![Value::Int(4)]).unwrap(), Value::Int(-4));
        assert_eq!(
            call("/", vec![Value::Int(6), Value::Int(3)]).unwrap(),
            Value::Int(2)
        );
        assert_eq!(
            call("/", vec![Value::Int(1), Value::Int(2)]).unwrap(),
            Value::Float(0.5)
        );
        assert_eq!(
            call("/", vec![Value::Int(1), Value::Int(0)]),
            Err(RuntimeError::DivisionByZero)
        );
        assert_eq!(
            call("+", vec![Value::Int(i64::MAX), Value::Int(1)]),
            Err(RuntimeError::Overflow)
        );
        assert_eq!(
            call("/", vec![Value::Int(i64::MIN), Value::Int(-1)]),
            Err(RuntimeError::Overflow)
        );
    }

    #[test]
    fn modulo_follows_divisor_sign() {
        assert_eq!(
            call("mod", vec![Value::Int(-7), Value::Int(3)]).unwrap(),
            Value::Int(2)
        );
        assert_eq!(
            call("mod", vec![Value::Int(7), Value::Int(-3)]).unwrap(),
            Value::Int(-2)
        );
    }

    #[test]
    fn comparisons_chain() {
        let args = vec![Value::Int(1), Value::Float(2.5), Value::Int(3)];
        assert_eq!(call("<", args).unwrap(), Value::Bool(true));
        assert_eq!(
            call(">=", vec![Value::Int(3), Value::Int(3), Value::Int(4)]).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn type_errors_name_the_operator() {
        let err = call("inc", vec![Value::Str("x".into())]).unwrap_err();
        assert_eq!(err.to_string(), "type mismatch: inc expects numbers, got string");
    }

    #[test]
    fn str_and_count() {
        assert_eq!(
            call("str", vec![Value::Str("a".into()), Value::Int(1), Value::Nil]).unwrap(),
            Value::Str("a1".into())
        );
        assert_eq!(
            call("count", vec![Value::Vector(vec![Value::Nil, Value::Nil])]).unwrap(),
            Value::Int(2)
        );
    }
}
