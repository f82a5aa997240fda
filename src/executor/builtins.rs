//! Builtin functions and list methods.

use super::runner::{binary_op, Interpreter};
use super::value::{compare_values, range_len, values_equal, Value};
use crate::error::{ScriptError, ScriptResult};
use crate::parser::lexer::BinOp;
use crate::parser::LOG_ROUTINE;
use std::cmp::Ordering;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Print,
    Len,
    Range,
    Min,
    Max,
    Abs,
    Int,
    Float,
    Str,
    Bool,
    List,
    Tuple,
    Sorted,
    Sum,
    Reversed,
    Enumerate,
    /// The state logging routine every injected line calls.
    LogState,
}

const ALL: [Builtin; 17] = [
    Builtin::Print,
    Builtin::Len,
    Builtin::Range,
    Builtin::Min,
    Builtin::Max,
    Builtin::Abs,
    Builtin::Int,
    Builtin::Float,
    Builtin::Str,
    Builtin::Bool,
    Builtin::List,
    Builtin::Tuple,
    Builtin::Sorted,
    Builtin::Sum,
    Builtin::Reversed,
    Builtin::Enumerate,
    Builtin::LogState,
];

impl Builtin {
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Print => "print",
            Builtin::Len => "len",
            Builtin::Range => "range",
            Builtin::Min => "min",
            Builtin::Max => "max",
            Builtin::Abs => "abs",
            Builtin::Int => "int",
            Builtin::Float => "float",
            Builtin::Str => "str",
            Builtin::Bool => "bool",
            Builtin::List => "list",
            Builtin::Tuple => "tuple",
            Builtin::Sorted => "sorted",
            Builtin::Sum => "sum",
            Builtin::Reversed => "reversed",
            Builtin::Enumerate => "enumerate",
            Builtin::LogState => LOG_ROUTINE,
        }
    }

    pub fn lookup(name: &str) -> Option<Builtin> {
        ALL.iter().copied().find(|b| b.name() == name)
    }
}

type Kwargs = Vec<(String, Value)>;

fn exactly_one(name: &str, args: &[Value]) -> ScriptResult<()> {
    if args.len() == 1 {
        Ok(())
    } else {
        Err(ScriptError::type_error(format!(
            "{}() takes exactly one argument ({} given)",
            name,
            args.len()
        )))
    }
}

fn arg_range(name: &str, args: &[Value], min: usize, max: usize) -> ScriptResult<()> {
    let plural = |n: usize| if n == 1 { "argument" } else { "arguments" };
    if args.len() < min {
        return Err(ScriptError::type_error(format!(
            "{} expected at least {} {}, got {}",
            name,
            min,
            plural(min),
            args.len()
        )));
    }
    if args.len() > max {
        return Err(ScriptError::type_error(format!(
            "{} expected at most {} {}, got {}",
            name,
            max,
            plural(max),
            args.len()
        )));
    }
    Ok(())
}

fn no_kwargs(name: &str, kwargs: &Kwargs) -> ScriptResult<()> {
    if kwargs.is_empty() {
        Ok(())
    } else {
        Err(ScriptError::type_error(format!(
            "{}() takes no keyword arguments",
            name
        )))
    }
}

/// Pull the allowed keyword arguments out, rejecting any other.
fn take_kwargs<const N: usize>(
    name: &str,
    kwargs: Kwargs,
    allowed: [&str; N],
) -> ScriptResult<[Option<Value>; N]> {
    let mut found: [Option<Value>; N] = std::array::from_fn(|_| None);
    for (key, value) in kwargs {
        match allowed.iter().position(|a| *a == key) {
            Some(i) => found[i] = Some(value),
            None => {
                return Err(ScriptError::type_error(format!(
                    "'{}' is an invalid keyword argument for {}()",
                    key, name
                )))
            }
        }
    }
    Ok(found)
}

fn index_arg(value: &Value) -> ScriptResult<i64> {
    value.as_int().ok_or_else(|| {
        ScriptError::type_error(format!(
            "'{}' object cannot be interpreted as an integer",
            value.type_name()
        ))
    })
}

/// Stable merge sort driven by a fallible comparison.
fn merge_sort_by<F>(order: &mut Vec<usize>, mut cmp: F) -> ScriptResult<()>
where
    F: FnMut(usize, usize) -> ScriptResult<Ordering>,
{
    let len = order.len();
    let mut buf = vec![0usize; len];
    let mut width = 1;
    while width < len {
        let mut start = 0;
        while start < len {
            let mid = (start + width).min(len);
            let end = (start + 2 * width).min(len);
            let (mut i, mut j, mut k) = (start, mid, start);
            while i < mid && j < end {
                // take from the right only when strictly smaller
                if cmp(order[j], order[i])? == Ordering::Less {
                    buf[k] = order[j];
                    j += 1;
                } else {
                    buf[k] = order[i];
                    i += 1;
                }
                k += 1;
            }
            buf[k..k + (mid - i)].copy_from_slice(&order[i..mid]);
            k += mid - i;
            buf[k..k + (end - j)].copy_from_slice(&order[j..end]);
            start = end;
        }
        std::mem::swap(order, &mut buf);
        width *= 2;
    }
    Ok(())
}

impl<W: Write> Interpreter<W> {
    pub(crate) fn call_builtin(
        &mut self,
        builtin: Builtin,
        args: Vec<Value>,
        kwargs: Kwargs,
    ) -> ScriptResult<Value> {
        let name = builtin.name();
        match builtin {
            Builtin::Print => {
                let [sep, end] = take_kwargs(name, kwargs, ["sep", "end"])?;
                let text_arg = |v: Option<Value>, key: &str, default: &str| match v {
                    None | Some(Value::None) => Ok(default.to_string()),
                    Some(Value::Str(s)) => Ok(s.to_string()),
                    Some(other) => Err(ScriptError::type_error(format!(
                        "{} must be None or a string, not {}",
                        key,
                        other.type_name()
                    ))),
                };
                let sep = text_arg(sep, "sep", " ")?;
                let end = text_arg(end, "end", "\n")?;
                let mut text = args
                    .iter()
                    .map(Value::to_display)
                    .collect::<Vec<_>>()
                    .join(&sep);
                text.push_str(&end);
                self.session.write_output(&text)?;
                Ok(Value::None)
            }
            Builtin::LogState => {
                no_kwargs(name, &kwargs)?;
                if args.is_empty() {
                    return Err(ScriptError::type_error(format!(
                        "{}() missing 1 required positional argument: 'arr'",
                        name
                    )));
                }
                if args.len() > 1 {
                    return Err(ScriptError::type_error(format!(
                        "{}() takes 1 positional argument but {} were given",
                        name,
                        args.len()
                    )));
                }
                let line = self.current_line;
                self.session.log_state(&args[0], line)?;
                Ok(Value::None)
            }
            Builtin::Len => {
                no_kwargs(name, &kwargs)?;
                exactly_one(name, &args)?;
                let len = match &args[0] {
                    Value::List(items) => items.borrow().len(),
                    Value::Tuple(items) => items.len(),
                    Value::Str(s) => s.chars().count(),
                    Value::Range { start, stop, step } => range_len(*start, *stop, *step),
                    other => {
                        return Err(ScriptError::type_error(format!(
                            "object of type '{}' has no len()",
                            other.type_name()
                        )))
                    }
                };
                Ok(Value::Int(i64::try_from(len).map_err(|_| ScriptError::Overflow)?))
            }
            Builtin::Range => {
                no_kwargs(name, &kwargs)?;
                arg_range(name, &args, 1, 3)?;
                let ints = args.iter().map(index_arg).collect::<ScriptResult<Vec<_>>>()?;
                let (start, stop, step) = match ints.as_slice() {
                    [stop] => (0, *stop, 1),
                    [start, stop] => (*start, *stop, 1),
                    [start, stop, step] => (*start, *stop, *step),
                    _ => unreachable!("arity checked above"),
                };
                if step == 0 {
                    return Err(ScriptError::value_error("range() arg 3 must not be zero"));
                }
                Ok(Value::Range { start, stop, step })
            }
            Builtin::Min | Builtin::Max => {
                let [key] = take_kwargs(name, kwargs, ["key"])?;
                let items = match args.len() {
                    0 => {
                        return Err(ScriptError::type_error(format!(
                            "{} expected at least 1 argument, got 0",
                            name
                        )))
                    }
                    1 => self.iterate(&args[0])?,
                    _ => args,
                };
                if items.is_empty() {
                    return Err(ScriptError::value_error(format!(
                        "{}() arg is an empty sequence",
                        name
                    )));
                }
                let keys = self.sort_keys(&items, key)?;
                let (op, want) = if builtin == Builtin::Min {
                    ("<", Ordering::Less)
                } else {
                    (">", Ordering::Greater)
                };
                let mut best = 0;
                for i in 1..items.len() {
                    if compare_values(&keys[i], &keys[best], op)? == want {
                        best = i;
                    }
                }
                Ok(items[best].clone())
            }
            Builtin::Abs => {
                no_kwargs(name, &kwargs)?;
                exactly_one(name, &args)?;
                match &args[0] {
                    Value::Float(f) => Ok(Value::Float(f.abs())),
                    other => match other.as_int() {
                        Some(i) => i.checked_abs().map(Value::Int).ok_or(ScriptError::Overflow),
                        None => Err(ScriptError::type_error(format!(
                            "bad operand type for abs(): '{}'",
                            other.type_name()
                        ))),
                    },
                }
            }
            Builtin::Int => {
                no_kwargs(name, &kwargs)?;
                arg_range(name, &args, 0, 1)?;
                let Some(value) = args.first() else {
                    return Ok(Value::Int(0));
                };
                to_int(value).map(Value::Int)
            }
            Builtin::Float => {
                no_kwargs(name, &kwargs)?;
                arg_range(name, &args, 0, 1)?;
                let Some(value) = args.first() else {
                    return Ok(Value::Float(0.0));
                };
                to_float(value).map(Value::Float)
            }
            Builtin::Str => {
                no_kwargs(name, &kwargs)?;
                arg_range(name, &args, 0, 1)?;
                Ok(Value::str(args.first().map(Value::to_display).unwrap_or_default()))
            }
            Builtin::Bool => {
                no_kwargs(name, &kwargs)?;
                arg_range(name, &args, 0, 1)?;
                Ok(Value::Bool(args.first().is_some_and(Value::truthy)))
            }
            Builtin::List | Builtin::Tuple => {
                no_kwargs(name, &kwargs)?;
                arg_range(name, &args, 0, 1)?;
                let items = match args.first() {
                    Some(v) => self.iterate(v)?,
                    None => Vec::new(),
                };
                Ok(if builtin == Builtin::List {
                    Value::list(items)
                } else {
                    Value::tuple(items)
                })
            }
            Builtin::Sorted => {
                let [key, reverse] = take_kwargs(name, kwargs, ["key", "reverse"])?;
                if args.len() != 1 {
                    return Err(ScriptError::type_error(format!(
                        "sorted expected 1 argument, got {}",
                        args.len()
                    )));
                }
                let items = self.iterate(&args[0])?;
                let reverse = reverse.is_some_and(|v| v.truthy());
                Ok(Value::list(self.sort_values(items, key, reverse)?))
            }
            Builtin::Sum => {
                let [start_kw] = take_kwargs(name, kwargs, ["start"])?;
                arg_range(name, &args, 1, 2)?;
                let mut total = args
                    .get(1)
                    .cloned()
                    .or(start_kw)
                    .unwrap_or(Value::Int(0));
                if let Value::Str(_) = total {
                    return Err(ScriptError::type_error(
                        "sum() can't sum strings [use ''.join(seq) instead]",
                    ));
                }
                for item in self.iterate(&args[0])? {
                    total = binary_op(BinOp::Add, &total, &item)?;
                }
                Ok(total)
            }
            Builtin::Reversed => {
                no_kwargs(name, &kwargs)?;
                exactly_one(name, &args)?;
                let mut items = self.iterate(&args[0])?;
                items.reverse();
                Ok(Value::list(items))
            }
            Builtin::Enumerate => {
                let [start_kw] = take_kwargs(name, kwargs, ["start"])?;
                arg_range(name, &args, 1, 2)?;
                let start = match args.get(1).or(start_kw.as_ref()) {
                    Some(v) => index_arg(v)?,
                    None => 0,
                };
                let items = self.iterate(&args[0])?;
                let mut pairs = Vec::with_capacity(items.len());
                for (i, item) in items.into_iter().enumerate() {
                    let n = i64::try_from(i)
                        .ok()
                        .and_then(|i| start.checked_add(i))
                        .ok_or(ScriptError::Overflow)?;
                    pairs.push(Value::tuple(vec![Value::Int(n), item]));
                }
                Ok(Value::list(pairs))
            }
        }
    }

    /// Apply `key` to every item, or use the items themselves.
    fn sort_keys(&mut self, items: &[Value], key: Option<Value>) -> ScriptResult<Vec<Value>> {
        match key {
            None | Some(Value::None) => Ok(items.to_vec()),
            Some(func) => items
                .iter()
                .map(|item| self.call_value(func.clone(), vec![item.clone()], Vec::new()))
                .collect(),
        }
    }

    fn sort_values(
        &mut self,
        items: Vec<Value>,
        key: Option<Value>,
        reverse: bool,
    ) -> ScriptResult<Vec<Value>> {
        let keys = self.sort_keys(&items, key)?;
        let mut order: Vec<usize> = (0..items.len()).collect();
        merge_sort_by(&mut order, |a, b| {
            let ord = compare_values(&keys[a], &keys[b], "<")?;
            Ok(if reverse { ord.reverse() } else { ord })
        })?;
        Ok(order.into_iter().map(|i| items[i].clone()).collect())
    }

    pub(crate) fn call_method(
        &mut self,
        object: &Value,
        method: &str,
        args: Vec<Value>,
        kwargs: Kwargs,
    ) -> ScriptResult<Value> {
        let Value::List(list) = object else {
            return Err(ScriptError::Attribute(format!(
                "'{}' object has no attribute '{}'",
                object.type_name(),
                method
            )));
        };
        let qualified = format!("list.{}", method);

        if method == "sort" {
            if !args.is_empty() {
                return Err(ScriptError::type_error(
                    "sort() takes no positional arguments",
                ));
            }
            let [key, reverse] = take_kwargs("sort", kwargs, ["key", "reverse"])?;
            let reverse = reverse.is_some_and(|v| v.truthy());
            let snapshot = list.borrow().clone();
            let sorted = self.sort_values(snapshot, key, reverse)?;
            *list.borrow_mut() = sorted;
            return Ok(Value::None);
        }

        no_kwargs(&qualified, &kwargs)?;
        let arity = |min: usize, max: usize| -> ScriptResult<()> {
            if (min..=max).contains(&args.len()) {
                return Ok(());
            }
            Err(ScriptError::type_error(match (min, max) {
                (0, 0) => format!(
                    "{}() takes no arguments ({} given)",
                    qualified,
                    args.len()
                ),
                (1, 1) => format!(
                    "{}() takes exactly one argument ({} given)",
                    qualified,
                    args.len()
                ),
                (lo, hi) if lo == hi => format!(
                    "{} expected {} arguments, got {}",
                    method,
                    lo,
                    args.len()
                ),
                (_, hi) => format!(
                    "{} expected at most {} argument{}, got {}",
                    method,
                    hi,
                    if hi == 1 { "" } else { "s" },
                    args.len()
                ),
            }))
        };

        match method {
            "append" => {
                arity(1, 1)?;
                list.borrow_mut().push(args[0].clone());
                Ok(Value::None)
            }
            "pop" => {
                arity(0, 1)?;
                let mut items = list.borrow_mut();
                if items.is_empty() {
                    return Err(ScriptError::index_error("pop from empty list"));
                }
                let len = items.len() as i64;
                let i = match args.first() {
                    Some(v) => index_arg(v)?,
                    None => -1,
                };
                let i = if i < 0 { i + len } else { i };
                if !(0..len).contains(&i) {
                    return Err(ScriptError::index_error("pop index out of range"));
                }
                Ok(items.remove(i as usize))
            }
            "insert" => {
                arity(2, 2)?;
                let i = index_arg(&args[0])?;
                let mut items = list.borrow_mut();
                let len = items.len() as i64;
                let at = if i < 0 { (i + len).max(0) } else { i.min(len) };
                items.insert(at as usize, args[1].clone());
                Ok(Value::None)
            }
            "extend" => {
                arity(1, 1)?;
                let extra = self.iterate(&args[0])?;
                list.borrow_mut().extend(extra);
                Ok(Value::None)
            }
            "copy" => {
                arity(0, 0)?;
                Ok(Value::list(list.borrow().clone()))
            }
            "reverse" => {
                arity(0, 0)?;
                list.borrow_mut().reverse();
                Ok(Value::None)
            }
            "clear" => {
                arity(0, 0)?;
                list.borrow_mut().clear();
                Ok(Value::None)
            }
            "index" => {
                arity(1, 1)?;
                list.borrow()
                    .iter()
                    .position(|v| values_equal(v, &args[0]))
                    .map(|i| Value::Int(i as i64))
                    .ok_or_else(|| {
                        ScriptError::value_error(format!("{} is not in list", args[0].repr()))
                    })
            }
            "count" => {
                arity(1, 1)?;
                let n = list
                    .borrow()
                    .iter()
                    .filter(|v| values_equal(v, &args[0]))
                    .count();
                Ok(Value::Int(n as i64))
            }
            _ => Err(ScriptError::Attribute(format!(
                "'list' object has no attribute '{}'",
                method
            ))),
        }
    }
}

fn to_int(value: &Value) -> ScriptResult<i64> {
    match value {
        Value::Float(f) => {
            if f.is_nan() {
                return Err(ScriptError::value_error("cannot convert float NaN to integer"));
            }
            let t = f.trunc();
            if t.is_infinite() || t < i64::MIN as f64 || t >= i64::MAX as f64 {
                return Err(ScriptError::Overflow);
            }
            Ok(t as i64)
        }
        Value::Str(s) => {
            let cleaned: String = s.trim().chars().filter(|c| *c != '_').collect();
            cleaned.parse::<i64>().map_err(|_| {
                ScriptError::value_error(format!(
                    "invalid literal for int() with base 10: {}",
                    value.repr()
                ))
            })
        }
        other => other.as_int().ok_or_else(|| {
            ScriptError::type_error(format!(
                "int() argument must be a string, a bytes-like object or a real number, not '{}'",
                other.type_name()
            ))
        }),
    }
}

fn to_float(value: &Value) -> ScriptResult<f64> {
    match value {
        Value::Str(s) => {
            // accepts `inf`, `-Infinity` and `nan` in any case
            s.trim().parse::<f64>().map_err(|_| {
                ScriptError::value_error(format!(
                    "could not convert string to float: {}",
                    value.repr()
                ))
            })
        }
        other => other.as_float().ok_or_else(|| {
            ScriptError::type_error(format!(
                "float() argument must be a string or a real number, not '{}'",
                other.type_name()
            ))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_knows_every_builtin() {
        for b in ALL {
            assert_eq!(Builtin::lookup(b.name()), Some(b));
        }
        assert_eq!(Builtin::lookup("log_state"), Some(Builtin::LogState));
        assert_eq!(Builtin::lookup("exec"), None);
    }

    #[test]
    fn merge_sort_is_stable() {
        let keys = [3, 1, 2, 1, 3, 0];
        let mut order: Vec<usize> = (0..keys.len()).collect();
        merge_sort_by(&mut order, |a, b| Ok(keys[a].cmp(&keys[b]))).unwrap();
        assert_eq!(order, vec![5, 1, 3, 2, 0, 4]);
    }

    #[test]
    fn merge_sort_stops_on_first_error() {
        let mut order: Vec<usize> = (0..4).collect();
        let err = merge_sort_by(&mut order, |_, _| Err(ScriptError::type_error("nope")));
        assert!(err.is_err());
    }

    #[test]
    fn numeric_conversions() {
        assert_eq!(to_int(&Value::Float(-2.7)).unwrap(), -2);
        assert_eq!(to_int(&Value::str(" 42 ")).unwrap(), 42);
        assert_eq!(
            to_int(&Value::str("4x")).unwrap_err().to_string(),
            "invalid literal for int() with base 10: '4x'"
        );
        assert_eq!(to_float(&Value::str("2.5")).unwrap(), 2.5);
        assert!(to_float(&Value::str("-inf")).unwrap().is_infinite());
    }
}
