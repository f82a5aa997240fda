//! Runtime values of the sortscript interpreter.

use super::builtins::Builtin;
use crate::error::{ScriptError, ScriptResult};
use crate::parser::ast::FunctionDef;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt::Write as _;
use std::rc::Rc;

/// A user-defined function closed over its evaluated default arguments.
#[derive(Debug)]
pub struct Function {
    pub def: Rc<FunctionDef>,
    pub defaults: Vec<Value>,
}

impl Function {
    pub fn name(&self) -> &str {
        &self.def.name
    }
}

#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    /// Lists are shared: every clone of the value aliases the same storage.
    List(Rc<RefCell<Vec<Value>>>),
    Tuple(Rc<[Value]>),
    Range { start: i64, stop: i64, step: i64 },
    Function(Rc<Function>),
    Builtin(Builtin),
}

impl Value {
    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn tuple(items: Vec<Value>) -> Self {
        Value::Tuple(Rc::from(items))
    }

    pub fn str(text: impl AsRef<str>) -> Self {
        Value::Str(Rc::from(text.as_ref()))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Range { .. } => "range",
            Value::Function(_) => "function",
            Value::Builtin(_) => "builtin_function_or_method",
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.borrow().is_empty(),
            Value::Tuple(items) => !items.is_empty(),
            Value::Range { start, stop, step } => range_len(*start, *stop, *step) > 0,
            Value::Function(_) | Value::Builtin(_) => true,
        }
    }

    /// Integer view of `int` and `bool` values.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Float view of any numeric value.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            other => other.as_int().map(|i| i as f64),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Bool(_) | Value::Float(_))
    }

    /// `str(value)`.
    pub fn to_display(&self) -> String {
        match self {
            Value::Str(s) => s.to_string(),
            other => other.repr(),
        }
    }

    /// `repr(value)`.
    pub fn repr(&self) -> String {
        let mut out = String::new();
        let mut seen = Vec::new();
        self.write_repr(&mut out, &mut seen);
        out
    }

    fn write_repr(&self, out: &mut String, seen: &mut Vec<*const RefCell<Vec<Value>>>) {
        match self {
            Value::None => out.push_str("None"),
            Value::Bool(true) => out.push_str("True"),
            Value::Bool(false) => out.push_str("False"),
            Value::Int(i) => {
                let _ = write!(out, "{}", i);
            }
            Value::Float(f) => out.push_str(&format_float(*f)),
            Value::Str(s) => out.push_str(&quote_str(s)),
            Value::List(items) => {
                let ptr = Rc::as_ptr(items);
                if seen.contains(&ptr) {
                    out.push_str("[...]");
                    return;
                }
                seen.push(ptr);
                out.push('[');
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.write_repr(out, seen);
                }
                out.push(']');
                seen.pop();
            }
            Value::Tuple(items) => {
                out.push('(');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.write_repr(out, seen);
                }
                if items.len() == 1 {
                    out.push(',');
                }
                out.push(')');
            }
            Value::Range { start, stop, step } => {
                if *step == 1 {
                    let _ = write!(out, "range({}, {})", start, stop);
                } else {
                    let _ = write!(out, "range({}, {}, {})", start, stop, step);
                }
            }
            Value::Function(f) => {
                let _ = write!(out, "<function {}>", f.name());
            }
            Value::Builtin(b) => {
                let _ = write!(out, "<built-in function {}>", b.name());
            }
        }
    }

    /// Convert to JSON for state logging. Lists and tuples become arrays.
    pub fn to_json(&self) -> ScriptResult<serde_json::Value> {
        let mut seen = Vec::new();
        self.to_json_inner(&mut seen)
    }

    fn to_json_inner(
        &self,
        seen: &mut Vec<*const RefCell<Vec<Value>>>,
    ) -> ScriptResult<serde_json::Value> {
        use serde_json::Value as Json;
        Ok(match self {
            Value::None => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::Float(f) => Json::from(*f),
            Value::Str(s) => Json::String(s.to_string()),
            Value::List(items) => {
                let ptr = Rc::as_ptr(items);
                if seen.contains(&ptr) {
                    return Err(ScriptError::value_error("Circular reference detected"));
                }
                seen.push(ptr);
                let converted = items
                    .borrow()
                    .iter()
                    .map(|item| item.to_json_inner(seen))
                    .collect::<ScriptResult<Vec<_>>>()?;
                seen.pop();
                Json::Array(converted)
            }
            Value::Tuple(items) => Json::Array(
                items
                    .iter()
                    .map(|item| item.to_json_inner(seen))
                    .collect::<ScriptResult<Vec<_>>>()?,
            ),
            other => {
                return Err(ScriptError::type_error(format!(
                    "Object of type {} is not JSON serializable",
                    other.type_name()
                )))
            }
        })
    }
}

/// Number of items a `range(start, stop, step)` yields.
pub fn range_len(start: i64, stop: i64, step: i64) -> usize {
    let (start, stop, step) = (i128::from(start), i128::from(stop), i128::from(step));
    let len = if step > 0 && start < stop {
        (stop - start + step - 1) / step
    } else if step < 0 && start > stop {
        (start - stop - step - 1) / -step
    } else {
        0
    };
    usize::try_from(len).unwrap_or(usize::MAX)
}

/// Float text the way the scripting language prints it: `1.0`, `0.1`,
/// `1e+16`, `1.5e-05`, `inf`, `nan`.
pub fn format_float(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let abs = v.abs();
    if abs != 0.0 && !(1e-4..1e16).contains(&abs) {
        let text = format!("{:e}", v);
        return match text.split_once('e') {
            Some((mantissa, exp)) => {
                let exp: i32 = exp.parse().unwrap_or(0);
                let sign = if exp < 0 { '-' } else { '+' };
                format!("{}e{}{:02}", mantissa, sign, exp.abs())
            }
            None => text,
        };
    }
    if v.fract() == 0.0 {
        format!("{:.1}", v)
    } else {
        format!("{}", v)
    }
}

fn quote_str(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// Value equality (`==`). Numbers compare across `bool`/`int`/`float`.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::None, Value::None) => true,
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::Float(_), _) | (_, Value::Float(_)) if a.is_numeric() && b.is_numeric() => {
            a.as_float() == b.as_float()
        }
        (x, y) if x.as_int().is_some() && y.as_int().is_some() => x.as_int() == y.as_int(),
        (Value::List(x), Value::List(y)) => {
            if Rc::ptr_eq(x, y) {
                return true;
            }
            let (x, y) = (x.borrow(), y.borrow());
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(p, q)| values_equal(p, q))
        }
        (Value::Tuple(x), Value::Tuple(y)) => {
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(p, q)| values_equal(p, q))
        }
        (
            Value::Range {
                start: s1,
                stop: e1,
                step: t1,
            },
            Value::Range {
                start: s2,
                stop: e2,
                step: t2,
            },
        ) => {
            let (l1, l2) = (range_len(*s1, *e1, *t1), range_len(*s2, *e2, *t2));
            l1 == l2 && (l1 == 0 || (s1 == s2 && (l1 == 1 || t1 == t2)))
        }
        (Value::Function(x), Value::Function(y)) => Rc::ptr_eq(x, y),
        (Value::Builtin(x), Value::Builtin(y)) => x == y,
        _ => false,
    }
}

/// Identity (`is`).
pub fn values_identical(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::List(x), Value::List(y)) => Rc::ptr_eq(x, y),
        (Value::Tuple(x), Value::Tuple(y)) => Rc::ptr_eq(x, y),
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Bool(_), _) | (_, Value::Bool(_)) => false,
        (Value::Float(_), _) | (_, Value::Float(_)) => false,
        _ => values_equal(a, b),
    }
}

/// Ordering for `<`, `<=`, `>`, `>=` and sorting. `op` names the operator in
/// the error raised for unorderable operands.
pub fn compare_values(a: &Value, b: &Value, op: &str) -> ScriptResult<Ordering> {
    let unorderable = || {
        ScriptError::type_error(format!(
            "'{}' not supported between instances of '{}' and '{}'",
            op,
            a.type_name(),
            b.type_name()
        ))
    };
    match (a, b) {
        (x, y) if x.as_int().is_some() && y.as_int().is_some() => {
            Ok(x.as_int().cmp(&y.as_int()))
        }
        (x, y) if x.is_numeric() && y.is_numeric() => {
            let (p, q) = (x.as_float().unwrap_or(0.0), y.as_float().unwrap_or(0.0));
            // NaN compares false both ways; treat as equal so sorting stays stable
            Ok(p.partial_cmp(&q).unwrap_or(Ordering::Equal))
        }
        (Value::Str(x), Value::Str(y)) => Ok(x.cmp(y)),
        (Value::List(x), Value::List(y)) => {
            let (x, y) = (x.borrow().clone(), y.borrow().clone());
            compare_sequences(&x, &y, op)
        }
        (Value::Tuple(x), Value::Tuple(y)) => compare_sequences(x, y, op),
        _ => Err(unorderable()),
    }
}

fn compare_sequences(x: &[Value], y: &[Value], op: &str) -> ScriptResult<Ordering> {
    for (p, q) in x.iter().zip(y.iter()) {
        if !values_equal(p, q) {
            return compare_values(p, q, op);
        }
    }
    Ok(x.len().cmp(&y.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_text_matches_script_conventions() {
        assert_eq!(format_float(1.0), "1.0");
        assert_eq!(format_float(0.1), "0.1");
        assert_eq!(format_float(-2.5), "-2.5");
        assert_eq!(format_float(1e16), "1e+16");
        assert_eq!(format_float(1.5e-5), "1.5e-05");
    }

    #[test]
    fn repr_of_nested_values() {
        let v = Value::list(vec![
            Value::Int(1),
            Value::str("a'b"),
            Value::tuple(vec![Value::Bool(true)]),
            Value::None,
        ]);
        assert_eq!(v.repr(), "[1, \"a'b\", (True,), None]");
    }

    #[test]
    fn mixed_numeric_equality_and_ordering() {
        assert!(values_equal(&Value::Int(1), &Value::Float(1.0)));
        assert!(values_equal(&Value::Bool(true), &Value::Int(1)));
        assert_eq!(
            compare_values(&Value::Int(2), &Value::Float(2.5), "<").unwrap(),
            Ordering::Less
        );
        let err = compare_values(&Value::Int(1), &Value::str("x"), "<").unwrap_err();
        assert_eq!(
            err.to_string(),
            "'<' not supported between instances of 'int' and 'str'"
        );
    }
}
