//! Tree-walking interpreter for parsed sortscript programs.

use super::builtins::Builtin;
use super::value::{compare_values, range_len, values_equal, values_identical, Function, Value};
use crate::debugger::{ExecContext, Frame, TraceSession};
use crate::error::{ScriptError, ScriptResult};
use crate::parser::ast::{BoolOp, CmpOp, Expr, Program, Stmt, StmtKind, UnaryOp};
use crate::parser::lexer::BinOp;
use std::cmp::Ordering;
use std::io::Write;
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// How often (in executed statements) the deadline is checked.
const DEADLINE_CHECK_INTERVAL: u64 = 1024;

/// Longest list, tuple or string (in bytes) a single operation may build.
pub(crate) const MAX_SEQUENCE_LEN: usize = 10_000_000;

/// Control flow out of a statement.
enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

pub struct Interpreter<W: Write> {
    pub(crate) ctx: ExecContext,
    pub(crate) session: TraceSession<W>,
    /// Source line of the statement being executed.
    pub(crate) current_line: usize,
    recursion_limit: usize,
    timeout: Option<Duration>,
    started: Instant,
    ticks: u64,
}

impl<W: Write> Interpreter<W> {
    pub fn new(session: TraceSession<W>) -> Self {
        Self {
            ctx: ExecContext::new(),
            session,
            current_line: 0,
            recursion_limit: 1000,
            timeout: None,
            started: Instant::now(),
            ticks: 0,
        }
    }

    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn context(&self) -> &ExecContext {
        &self.ctx
    }

    pub fn into_session(self) -> TraceSession<W> {
        self.session
    }

    pub fn session_mut(&mut self) -> &mut TraceSession<W> {
        &mut self.session
    }

    /// Run every top-level statement in order.
    pub fn run(&mut self, program: &Program) -> ScriptResult<()> {
        self.started = Instant::now();
        debug!(statements = program.body.len(), "executing program");
        // top-level break/continue/return are rejected by the parser
        self.exec_block(&program.body)?;
        Ok(())
    }

    fn tick(&mut self) -> ScriptResult<()> {
        self.ticks += 1;
        if let Some(limit) = self.timeout {
            if self.ticks % DEADLINE_CHECK_INTERVAL == 0 && self.started.elapsed() >= limit {
                return Err(ScriptError::Timeout(limit.as_secs()));
            }
        }
        Ok(())
    }

    fn exec_block(&mut self, body: &[Stmt]) -> ScriptResult<Flow> {
        for stmt in body {
            match self.exec_stmt(stmt)? {
                Flow::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> ScriptResult<Flow> {
        self.current_line = stmt.line;
        self.tick()?;

        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.eval(expr)?;
            }
            StmtKind::Assign { targets, value } => {
                let value = self.eval(value)?;
                for target in targets {
                    self.assign(target, value.clone())?;
                }
            }
            StmtKind::AugAssign { target, op, value } => self.exec_aug_assign(target, *op, value)?,
            StmtKind::If { branches, orelse } => {
                for (cond, body) in branches {
                    if self.eval(cond)?.truthy() {
                        return self.exec_block(body);
                    }
                }
                return self.exec_block(orelse);
            }
            StmtKind::While { cond, body, orelse } => {
                loop {
                    self.current_line = stmt.line;
                    if !self.eval(cond)?.truthy() {
                        return self.exec_block(orelse);
                    }
                    match self.exec_block(body)? {
                        Flow::Break => break,
                        Flow::Continue | Flow::Normal => {}
                        ret @ Flow::Return(_) => return Ok(ret),
                    }
                    self.tick()?;
                }
            }
            StmtKind::For {
                target,
                iter,
                body,
                orelse,
            } => {
                let iterable = self.eval(iter)?;
                return self.exec_for(stmt.line, target, iterable, body, orelse);
            }
            StmtKind::Def(def) => {
                let defaults = def
                    .params
                    .iter()
                    .filter_map(|p| p.default.as_ref())
                    .map(|d| self.eval(d))
                    .collect::<ScriptResult<Vec<_>>>()?;
                let function = Function {
                    def: Rc::clone(def),
                    defaults,
                };
                self.ctx.assign(&def.name, Value::Function(Rc::new(function)));
            }
            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr)?,
                    None => Value::None,
                };
                return Ok(Flow::Return(value));
            }
            StmtKind::Global(names) => self.ctx.declare_global(names),
            StmtKind::Break => return Ok(Flow::Break),
            StmtKind::Continue => return Ok(Flow::Continue),
            StmtKind::Pass => {}
        }
        Ok(Flow::Normal)
    }

    fn exec_for(
        &mut self,
        line: usize,
        target: &Expr,
        iterable: Value,
        body: &[Stmt],
        orelse: &[Stmt],
    ) -> ScriptResult<Flow> {
        let mut index = 0usize;
        loop {
            let item = match &iterable {
                // re-read each round so mutations during the loop are seen
                Value::List(items) => match items.borrow().get(index) {
                    Some(v) => v.clone(),
                    None => break,
                },
                Value::Range { start, stop, step } => {
                    if index >= range_len(*start, *stop, *step) {
                        break;
                    }
                    Value::Int(range_item(*start, *step, index))
                }
                Value::Tuple(items) => match items.get(index) {
                    Some(v) => v.clone(),
                    None => break,
                },
                Value::Str(s) => match s.chars().nth(index) {
                    Some(c) => Value::str(c.to_string()),
                    None => break,
                },
                other => {
                    return Err(ScriptError::type_error(format!(
                        "'{}' object is not iterable",
                        other.type_name()
                    )))
                }
            };
            index += 1;

            self.current_line = line;
            self.assign(target, item)?;
            match self.exec_block(body)? {
                Flow::Break => return Ok(Flow::Normal),
                Flow::Continue | Flow::Normal => {}
                ret @ Flow::Return(_) => return Ok(ret),
            }
            self.tick()?;
        }
        self.exec_block(orelse)
    }

    fn exec_aug_assign(&mut self, target: &Expr, op: BinOp, value: &Expr) -> ScriptResult<()> {
        match target {
            Expr::Name(name) => {
                let current = self.lookup(name)?;
                let rhs = self.eval(value)?;
                let result = self.in_place_op(op, current, rhs)?;
                self.ctx.assign(name, result);
            }
            Expr::Index { object, index } => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                let current = self.get_item(&object, &index)?;
                let rhs = self.eval(value)?;
                let result = self.in_place_op(op, current, rhs)?;
                self.set_item(&object, &index, result)?;
            }
            Expr::Slice {
                object,
                lower,
                upper,
                step,
            } => {
                let object = self.eval(object)?;
                let bounds = self.eval_slice_bounds(lower, upper, step)?;
                let current = self.get_slice(&object, bounds)?;
                let rhs = self.eval(value)?;
                let result = self.in_place_op(op, current, rhs)?;
                self.set_slice(&object, bounds, result)?;
            }
            _ => return Err(ScriptError::syntax("illegal expression for augmented assignment", self.current_line)),
        }
        Ok(())
    }

    /// `+=` on a list extends it in place; everything else rebinds.
    fn in_place_op(&mut self, op: BinOp, current: Value, rhs: Value) -> ScriptResult<Value> {
        if let (BinOp::Add, Value::List(items)) = (op, &current) {
            let extra = self.iterate(&rhs)?;
            items.borrow_mut().extend(extra);
            return Ok(current);
        }
        if let (BinOp::Mul, Value::List(items)) = (op, &current) {
            if let Some(n) = rhs.as_int() {
                let snapshot = items.borrow().clone();
                let repeated = repeat_items(&snapshot, n)?;
                *items.borrow_mut() = repeated;
                return Ok(current);
            }
        }
        binary_op(op, &current, &rhs)
    }

    // ---- assignment ----

    pub(crate) fn assign(&mut self, target: &Expr, value: Value) -> ScriptResult<()> {
        match target {
            Expr::Name(name) => {
                self.ctx.assign(name, value);
                Ok(())
            }
            Expr::Index { object, index } => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                self.set_item(&object, &index, value)
            }
            Expr::Slice {
                object,
                lower,
                upper,
                step,
            } => {
                let object = self.eval(object)?;
                let bounds = self.eval_slice_bounds(lower, upper, step)?;
                self.set_slice(&object, bounds, value)
            }
            Expr::Tuple(targets) | Expr::List(targets) => {
                let items = self.iterate(&value)?;
                if items.len() > targets.len() {
                    return Err(ScriptError::value_error(format!(
                        "too many values to unpack (expected {})",
                        targets.len()
                    )));
                }
                if items.len() < targets.len() {
                    return Err(ScriptError::value_error(format!(
                        "not enough values to unpack (expected {}, got {})",
                        targets.len(),
                        items.len()
                    )));
                }
                for (target, item) in targets.iter().zip(items) {
                    self.assign(target, item)?;
                }
                Ok(())
            }
            _ => Err(ScriptError::syntax("cannot assign to expression", self.current_line)),
        }
    }

    pub(crate) fn set_item(&mut self, object: &Value, index: &Value, value: Value) -> ScriptResult<()> {
        match object {
            Value::List(items) => {
                let i = index.as_int().ok_or_else(|| {
                    ScriptError::type_error(format!(
                        "list indices must be integers or slices, not {}",
                        index.type_name()
                    ))
                })?;
                let mut items = items.borrow_mut();
                let len = items.len();
                let slot = normalize_index(i, len)
                    .ok_or_else(|| ScriptError::index_error("list assignment index out of range"))?;
                items[slot] = value;
                trace!(index = slot, "list element assigned");
                Ok(())
            }
            other => Err(ScriptError::type_error(format!(
                "'{}' object does not support item assignment",
                other.type_name()
            ))),
        }
    }

    fn set_slice(&mut self, object: &Value, bounds: SliceBounds, value: Value) -> ScriptResult<()> {
        let Value::List(items) = object else {
            return Err(ScriptError::type_error(format!(
                "'{}' object does not support item assignment",
                object.type_name()
            )));
        };
        let replacement = self.iterate(&value)?;
        let len = items.borrow().len();
        let step = bounds.step.unwrap_or(1);
        if step == 0 {
            return Err(ScriptError::value_error("slice step cannot be zero"));
        }

        if step == 1 {
            let (lo, hi) = bounds.resolve_contiguous(len);
            items.borrow_mut().splice(lo..hi, replacement);
            return Ok(());
        }

        let indices = slice_indices(len, bounds.lower, bounds.upper, step);
        if indices.len() != replacement.len() {
            return Err(ScriptError::value_error(format!(
                "attempt to assign sequence of size {} to extended slice of size {}",
                replacement.len(),
                indices.len()
            )));
        }
        let mut items = items.borrow_mut();
        for (slot, item) in indices.into_iter().zip(replacement) {
            items[slot] = item;
        }
        Ok(())
    }

    // ---- expressions ----

    fn lookup(&self, name: &str) -> ScriptResult<Value> {
        if let Some(v) = self.ctx.lookup(name) {
            return Ok(v);
        }
        Builtin::lookup(name)
            .map(Value::Builtin)
            .ok_or_else(|| ScriptError::Name(name.to_string()))
    }

    pub(crate) fn eval(&mut self, expr: &Expr) -> ScriptResult<Value> {
        match expr {
            Expr::Int(i) => Ok(Value::Int(*i)),
            Expr::Float(f) => Ok(Value::Float(*f)),
            Expr::Str(s) => Ok(Value::Str(Rc::clone(s))),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::NoneLit => Ok(Value::None),
            Expr::Name(name) => self.lookup(name),
            Expr::List(items) => {
                let values = self.eval_all(items)?;
                Ok(Value::list(values))
            }
            Expr::Tuple(items) => {
                let values = self.eval_all(items)?;
                Ok(Value::tuple(values))
            }
            Expr::Unary { op, operand } => {
                let v = self.eval(operand)?;
                unary_op(*op, &v)
            }
            Expr::Binary { op, left, right } => {
                let l = self.eval(left)?;
                let r = self.eval(right)?;
                binary_op(*op, &l, &r)
            }
            Expr::BoolOp { op, left, right } => {
                let l = self.eval(left)?;
                match (op, l.truthy()) {
                    (BoolOp::And, false) | (BoolOp::Or, true) => Ok(l),
                    _ => self.eval(right),
                }
            }
            Expr::Compare { first, rest } => {
                let mut left = self.eval(first)?;
                for (op, right) in rest {
                    let right = self.eval(right)?;
                    if !compare_op(*op, &left, &right)? {
                        return Ok(Value::Bool(false));
                    }
                    left = right;
                }
                Ok(Value::Bool(true))
            }
            Expr::IfExp { cond, then, orelse } => {
                if self.eval(cond)?.truthy() {
                    self.eval(then)
                } else {
                    self.eval(orelse)
                }
            }
            Expr::Index { object, index } => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                self.get_item(&object, &index)
            }
            Expr::Slice {
                object,
                lower,
                upper,
                step,
            } => {
                let object = self.eval(object)?;
                let bounds = self.eval_slice_bounds(lower, upper, step)?;
                self.get_slice(&object, bounds)
            }
            Expr::Call { func, args, kwargs } => {
                let callee = self.eval(func)?;
                let args = self.eval_all(args)?;
                let kwargs = self.eval_kwargs(kwargs)?;
                self.call_value(callee, args, kwargs)
            }
            Expr::MethodCall {
                object,
                method,
                args,
                kwargs,
            } => {
                let object = self.eval(object)?;
                let args = self.eval_all(args)?;
                let kwargs = self.eval_kwargs(kwargs)?;
                self.call_method(&object, method, args, kwargs)
            }
        }
    }

    fn eval_all(&mut self, exprs: &[Expr]) -> ScriptResult<Vec<Value>> {
        exprs.iter().map(|e| self.eval(e)).collect()
    }

    fn eval_kwargs(&mut self, kwargs: &[(String, Expr)]) -> ScriptResult<Vec<(String, Value)>> {
        kwargs
            .iter()
            .map(|(k, e)| Ok((k.clone(), self.eval(e)?)))
            .collect()
    }

    fn eval_slice_bounds(
        &mut self,
        lower: &Option<Box<Expr>>,
        upper: &Option<Box<Expr>>,
        step: &Option<Box<Expr>>,
    ) -> ScriptResult<SliceBounds> {
        let mut bound = |e: &Option<Box<Expr>>| -> ScriptResult<Option<i64>> {
            match e {
                None => Ok(None),
                Some(expr) => match self.eval(expr)? {
                    Value::None => Ok(None),
                    v => v.as_int().map(Some).ok_or_else(|| {
                        ScriptError::type_error("slice indices must be integers or None")
                    }),
                },
            }
        };
        Ok(SliceBounds {
            lower: bound(lower)?,
            upper: bound(upper)?,
            step: bound(step)?,
        })
    }

    pub(crate) fn get_item(&self, object: &Value, index: &Value) -> ScriptResult<Value> {
        let bad_index = |container: &str| {
            ScriptError::type_error(format!(
                "{} indices must be integers or slices, not {}",
                container,
                index.type_name()
            ))
        };
        match object {
            Value::List(items) => {
                let i = index.as_int().ok_or_else(|| bad_index("list"))?;
                let items = items.borrow();
                normalize_index(i, items.len())
                    .map(|slot| items[slot].clone())
                    .ok_or_else(|| ScriptError::index_error("list index out of range"))
            }
            Value::Tuple(items) => {
                let i = index.as_int().ok_or_else(|| bad_index("tuple"))?;
                normalize_index(i, items.len())
                    .map(|slot| items[slot].clone())
                    .ok_or_else(|| ScriptError::index_error("tuple index out of range"))
            }
            Value::Str(s) => {
                let i = index.as_int().ok_or_else(|| {
                    ScriptError::type_error(format!(
                        "string indices must be integers, not '{}'",
                        index.type_name()
                    ))
                })?;
                let count = s.chars().count();
                normalize_index(i, count)
                    .and_then(|slot| s.chars().nth(slot))
                    .map(|c| Value::str(c.to_string()))
                    .ok_or_else(|| ScriptError::index_error("string index out of range"))
            }
            Value::Range { start, stop, step } => {
                let i = index.as_int().ok_or_else(|| bad_index("range"))?;
                normalize_index(i, range_len(*start, *stop, *step))
                    .map(|slot| Value::Int(range_item(*start, *step, slot)))
                    .ok_or_else(|| ScriptError::index_error("range object index out of range"))
            }
            other => Err(ScriptError::type_error(format!(
                "'{}' object is not subscriptable",
                other.type_name()
            ))),
        }
    }

    fn get_slice(&self, object: &Value, bounds: SliceBounds) -> ScriptResult<Value> {
        let step = bounds.step.unwrap_or(1);
        if step == 0 {
            return Err(ScriptError::value_error("slice step cannot be zero"));
        }
        match object {
            Value::List(items) => {
                let items = items.borrow();
                let picked = slice_indices(items.len(), bounds.lower, bounds.upper, step)
                    .into_iter()
                    .map(|i| items[i].clone())
                    .collect();
                Ok(Value::list(picked))
            }
            Value::Tuple(items) => {
                let picked = slice_indices(items.len(), bounds.lower, bounds.upper, step)
                    .into_iter()
                    .map(|i| items[i].clone())
                    .collect();
                Ok(Value::tuple(picked))
            }
            Value::Str(s) => {
                let chars: Vec<char> = s.chars().collect();
                let picked: String = slice_indices(chars.len(), bounds.lower, bounds.upper, step)
                    .into_iter()
                    .map(|i| chars[i])
                    .collect();
                Ok(Value::str(picked))
            }
            Value::Range { .. } => {
                let items = self.iterate(object)?;
                let picked = slice_indices(items.len(), bounds.lower, bounds.upper, step)
                    .into_iter()
                    .map(|i| items[i].clone())
                    .collect();
                Ok(Value::list(picked))
            }
            other => Err(ScriptError::type_error(format!(
                "'{}' object is not subscriptable",
                other.type_name()
            ))),
        }
    }

    /// Materialize any iterable into a vector.
    pub(crate) fn iterate(&self, value: &Value) -> ScriptResult<Vec<Value>> {
        match value {
            Value::List(items) => Ok(items.borrow().clone()),
            Value::Tuple(items) => Ok(items.to_vec()),
            Value::Str(s) => Ok(s.chars().map(|c| Value::str(c.to_string())).collect()),
            Value::Range { start, stop, step } => {
                let len = range_len(*start, *stop, *step);
                check_sequence_len(len)?;
                Ok((0..len)
                    .map(|i| Value::Int(range_item(*start, *step, i)))
                    .collect())
            }
            other => Err(ScriptError::type_error(format!(
                "'{}' object is not iterable",
                other.type_name()
            ))),
        }
    }

    // ---- calls ----

    pub(crate) fn call_value(
        &mut self,
        callee: Value,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> ScriptResult<Value> {
        match callee {
            Value::Builtin(builtin) => self.call_builtin(builtin, args, kwargs),
            Value::Function(function) => self.call_function(&function, args, kwargs),
            other => Err(ScriptError::type_error(format!(
                "'{}' object is not callable",
                other.type_name()
            ))),
        }
    }

    fn call_function(
        &mut self,
        function: &Function,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> ScriptResult<Value> {
        if self.ctx.depth() >= self.recursion_limit {
            return Err(ScriptError::Recursion);
        }
        let call_line = self.current_line;
        let mut frame = Frame::new(function.name(), call_line);
        bind_arguments(function, args, kwargs, &mut frame)?;

        trace!(function = function.name(), depth = self.ctx.depth() + 1, "call");
        self.ctx.push_frame(frame);
        // on error the frame stays so the failing call stack can be logged
        let flow = self.exec_block(&function.def.body)?;
        self.ctx.pop_frame();
        self.current_line = call_line;

        Ok(match flow {
            Flow::Return(v) => v,
            _ => Value::None,
        })
    }
}

fn bind_arguments(
    function: &Function,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
    frame: &mut Frame,
) -> ScriptResult<()> {
    let name = function.name();
    let params = &function.def.params;
    let required = params.iter().filter(|p| p.default.is_none()).count();

    if args.len() > params.len() {
        let expected = if required == params.len() {
            format!("{}", params.len())
        } else {
            format!("from {} to {}", required, params.len())
        };
        let noun = if params.len() == 1 && required == params.len() {
            "argument"
        } else {
            "arguments"
        };
        let given = if args.len() == 1 { "was" } else { "were" };
        return Err(ScriptError::type_error(format!(
            "{}() takes {} positional {} but {} {} given",
            name,
            expected,
            noun,
            args.len(),
            given
        )));
    }

    let mut slots: Vec<Option<Value>> = vec![None; params.len()];
    for (slot, value) in slots.iter_mut().zip(args) {
        *slot = Some(value);
    }
    for (key, value) in kwargs {
        let Some(pos) = params.iter().position(|p| p.name == key) else {
            return Err(ScriptError::type_error(format!(
                "{}() got an unexpected keyword argument '{}'",
                name, key
            )));
        };
        if slots[pos].is_some() {
            return Err(ScriptError::type_error(format!(
                "{}() got multiple values for argument '{}'",
                name, key
            )));
        }
        slots[pos] = Some(value);
    }

    // defaults belong to the trailing parameters
    let first_default = params.len() - function.defaults.len();
    let mut missing = Vec::new();
    for (i, (param, slot)) in params.iter().zip(slots).enumerate() {
        let value = match slot {
            Some(v) => v,
            None if i >= first_default => function.defaults[i - first_default].clone(),
            None => {
                missing.push(format!("'{}'", param.name));
                continue;
            }
        };
        frame.locals.insert(param.name.clone(), value);
    }

    if !missing.is_empty() {
        let noun = if missing.len() == 1 { "argument" } else { "arguments" };
        return Err(ScriptError::type_error(format!(
            "{}() missing {} required positional {}: {}",
            name,
            missing.len(),
            noun,
            join_names(&missing)
        )));
    }
    Ok(())
}

fn join_names(names: &[String]) -> String {
    match names {
        [] => String::new(),
        [one] => one.clone(),
        [a, b] => format!("{} and {}", a, b),
        [init @ .., last] => format!("{}, and {}", init.join(", "), last),
    }
}

// ---- slicing helpers ----

#[derive(Debug, Clone, Copy)]
pub(crate) struct SliceBounds {
    lower: Option<i64>,
    upper: Option<i64>,
    step: Option<i64>,
}

impl SliceBounds {
    /// `[lo, hi)` for a step-1 slice, clamped and with `hi >= lo`.
    fn resolve_contiguous(&self, len: usize) -> (usize, usize) {
        let clamp = |v: Option<i64>, default: usize| -> usize {
            match v {
                None => default,
                Some(i) if i < 0 => usize::try_from(i + len as i64).unwrap_or(0),
                Some(i) => usize::try_from(i).unwrap_or(usize::MAX).min(len),
            }
        };
        let lo = clamp(self.lower, 0);
        let hi = clamp(self.upper, len).max(lo);
        (lo, hi)
    }
}

/// Indices selected by `[lower:upper:step]` on a sequence of `len` items.
fn slice_indices(len: usize, lower: Option<i64>, upper: Option<i64>, step: i64) -> Vec<usize> {
    let len = len as i64;
    let adjust = |v: i64, low: i64, high: i64| -> i64 {
        let v = if v < 0 { v + len } else { v };
        v.clamp(low, high)
    };

    let mut out = Vec::new();
    if step > 0 {
        let start = lower.map_or(0, |v| adjust(v, 0, len));
        let stop = upper.map_or(len, |v| adjust(v, 0, len));
        let mut i = start;
        while i < stop {
            out.push(i as usize);
            match i.checked_add(step) {
                Some(next) => i = next,
                None => break,
            }
        }
    } else {
        let start = lower.map_or(len - 1, |v| adjust(v, -1, len - 1));
        let stop = upper.map_or(-1, |v| adjust(v, -1, len - 1));
        let mut i = start;
        while i > stop {
            out.push(i as usize);
            match i.checked_add(step) {
                Some(next) => i = next,
                None => break,
            }
        }
    }
    out
}

fn normalize_index(i: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let idx = if i < 0 { i + len } else { i };
    if (0..len).contains(&idx) {
        Some(idx as usize)
    } else {
        None
    }
}

/// Item `index` of a range. Callers keep `index` below the range length, so
/// the result lies between `start` and `stop`.
pub(crate) fn range_item(start: i64, step: i64, index: usize) -> i64 {
    let value = i128::from(start) + i128::from(step) * index as i128;
    value as i64
}

// ---- operators ----

fn unary_op(op: UnaryOp, v: &Value) -> ScriptResult<Value> {
    let bad = |sym: &str| {
        ScriptError::type_error(format!(
            "bad operand type for unary {}: '{}'",
            sym,
            v.type_name()
        ))
    };
    match op {
        UnaryOp::Not => Ok(Value::Bool(!v.truthy())),
        UnaryOp::Neg => match v {
            Value::Float(f) => Ok(Value::Float(-f)),
            other => other
                .as_int()
                .ok_or_else(|| bad("-"))?
                .checked_neg()
                .map(Value::Int)
                .ok_or(ScriptError::Overflow),
        },
        UnaryOp::Pos => match v {
            Value::Float(f) => Ok(Value::Float(*f)),
            other => other.as_int().map(Value::Int).ok_or_else(|| bad("+")),
        },
        UnaryOp::Invert => v.as_int().map(|i| Value::Int(!i)).ok_or_else(|| bad("~")),
    }
}

fn unsupported(op: BinOp, l: &Value, r: &Value) -> ScriptError {
    ScriptError::type_error(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        op.symbol(),
        l.type_name(),
        r.type_name()
    ))
}

/// Reject sequences too long to build.
pub(crate) fn check_sequence_len(len: usize) -> ScriptResult<()> {
    if len > MAX_SEQUENCE_LEN {
        return Err(ScriptError::Memory(len));
    }
    Ok(())
}

fn repeat_items(items: &[Value], n: i64) -> ScriptResult<Vec<Value>> {
    let n = usize::try_from(n.max(0)).map_err(|_| ScriptError::Overflow)?;
    let total = items.len().checked_mul(n).ok_or(ScriptError::Overflow)?;
    check_sequence_len(total)?;
    let mut out = Vec::with_capacity(total);
    for _ in 0..n {
        out.extend(items.iter().cloned());
    }
    Ok(out)
}

pub(crate) fn binary_op(op: BinOp, l: &Value, r: &Value) -> ScriptResult<Value> {
    // integer arithmetic (bool counts as int)
    if let (Some(a), Some(b)) = (l.as_int(), r.as_int()) {
        return int_op(op, a, b).map_err(|e| match e {
            IntOpError::Unsupported => unsupported(op, l, r),
            IntOpError::Script(e) => e,
        });
    }

    if l.is_numeric() && r.is_numeric() {
        let (a, b) = (l.as_float().unwrap_or(0.0), r.as_float().unwrap_or(0.0));
        return float_op(op, a, b).map_err(|e| match e {
            IntOpError::Unsupported => unsupported(op, l, r),
            IntOpError::Script(e) => e,
        });
    }

    match (op, l, r) {
        (BinOp::Add, Value::Str(a), Value::Str(b)) => {
            let mut s = String::with_capacity(a.len() + b.len());
            s.push_str(a);
            s.push_str(b);
            Ok(Value::str(s))
        }
        (BinOp::Add, Value::Str(_), other) => Err(ScriptError::type_error(format!(
            "can only concatenate str (not \"{}\") to str",
            other.type_name()
        ))),
        (BinOp::Add, Value::List(a), Value::List(b)) => {
            let mut items = a.borrow().clone();
            items.extend(b.borrow().iter().cloned());
            Ok(Value::list(items))
        }
        (BinOp::Add, Value::List(_), other) => Err(ScriptError::type_error(format!(
            "can only concatenate list (not \"{}\") to list",
            other.type_name()
        ))),
        (BinOp::Add, Value::Tuple(a), Value::Tuple(b)) => {
            let mut items = a.to_vec();
            items.extend(b.iter().cloned());
            Ok(Value::tuple(items))
        }
        (BinOp::Mul, seq, n) | (BinOp::Mul, n, seq) if n.as_int().is_some() => {
            let count = n.as_int().unwrap_or(0);
            match seq {
                Value::List(items) => {
                    let snapshot = items.borrow().clone();
                    Ok(Value::list(repeat_items(&snapshot, count)?))
                }
                Value::Tuple(items) => Ok(Value::tuple(repeat_items(items, count)?)),
                Value::Str(s) => {
                    let count = usize::try_from(count.max(0)).map_err(|_| ScriptError::Overflow)?;
                    check_sequence_len(s.len().checked_mul(count).ok_or(ScriptError::Overflow)?)?;
                    Ok(Value::str(s.repeat(count)))
                }
                _ => Err(unsupported(op, l, r)),
            }
        }
        _ => Err(unsupported(op, l, r)),
    }
}

enum IntOpError {
    Unsupported,
    Script(ScriptError),
}

impl From<ScriptError> for IntOpError {
    fn from(e: ScriptError) -> Self {
        IntOpError::Script(e)
    }
}

fn int_op(op: BinOp, a: i64, b: i64) -> Result<Value, IntOpError> {
    let overflow = || IntOpError::Script(ScriptError::Overflow);
    let v = match op {
        BinOp::Add => a.checked_add(b).ok_or_else(overflow)?,
        BinOp::Sub => a.checked_sub(b).ok_or_else(overflow)?,
        BinOp::Mul => a.checked_mul(b).ok_or_else(overflow)?,
        BinOp::Div => {
            if b == 0 {
                return Err(ScriptError::ZeroDivision("division by zero".into()).into());
            }
            return Ok(Value::Float(a as f64 / b as f64));
        }
        BinOp::FloorDiv => {
            if b == 0 {
                return Err(
                    ScriptError::ZeroDivision("integer division or modulo by zero".into()).into(),
                );
            }
            let q = a.checked_div(b).ok_or_else(overflow)?;
            if a % b != 0 && ((a < 0) != (b < 0)) {
                q - 1
            } else {
                q
            }
        }
        BinOp::Mod => {
            if b == 0 {
                return Err(ScriptError::ZeroDivision("integer modulo by zero".into()).into());
            }
            let r = a.checked_rem(b).ok_or_else(overflow)?;
            if r != 0 && ((r < 0) != (b < 0)) {
                r + b
            } else {
                r
            }
        }
        BinOp::Pow => {
            if b < 0 {
                if a == 0 {
                    return Err(ScriptError::ZeroDivision(
                        "0.0 cannot be raised to a negative power".into(),
                    )
                    .into());
                }
                return Ok(Value::Float((a as f64).powf(b as f64)));
            }
            let exp = u32::try_from(b).map_err(|_| overflow())?;
            a.checked_pow(exp).ok_or_else(overflow)?
        }
        BinOp::BitAnd => a & b,
        BinOp::BitOr => a | b,
        BinOp::BitXor => a ^ b,
        BinOp::Shl | BinOp::Shr => {
            if b < 0 {
                return Err(ScriptError::value_error("negative shift count").into());
            }
            if op == BinOp::Shr {
                if b >= 64 {
                    if a < 0 {
                        -1
                    } else {
                        0
                    }
                } else {
                    a >> b
                }
            } else if a == 0 {
                0
            } else if b >= 64 {
                return Err(overflow());
            } else {
                let wide = i128::from(a) << b;
                i64::try_from(wide).map_err(|_| overflow())?
            }
        }
    };
    Ok(Value::Int(v))
}

fn float_op(op: BinOp, a: f64, b: f64) -> Result<Value, IntOpError> {
    let v = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => {
            if b == 0.0 {
                return Err(ScriptError::ZeroDivision("float division by zero".into()).into());
            }
            a / b
        }
        BinOp::FloorDiv => {
            if b == 0.0 {
                return Err(
                    ScriptError::ZeroDivision("float floor division by zero".into()).into(),
                );
            }
            (a / b).floor()
        }
        BinOp::Mod => {
            if b == 0.0 {
                return Err(ScriptError::ZeroDivision("float modulo".into()).into());
            }
            let r = a % b;
            if r != 0.0 && ((r < 0.0) != (b < 0.0)) {
                r + b
            } else {
                r
            }
        }
        BinOp::Pow => {
            if a == 0.0 && b < 0.0 {
                return Err(ScriptError::ZeroDivision(
                    "0.0 cannot be raised to a negative power".into(),
                )
                .into());
            }
            a.powf(b)
        }
        _ => return Err(IntOpError::Unsupported),
    };
    Ok(Value::Float(v))
}

fn contains(container: &Value, item: &Value) -> ScriptResult<bool> {
    match container {
        Value::List(items) => Ok(items.borrow().iter().any(|v| values_equal(v, item))),
        Value::Tuple(items) => Ok(items.iter().any(|v| values_equal(v, item))),
        Value::Str(s) => match item {
            Value::Str(needle) => Ok(s.contains(needle.as_ref())),
            other => Err(ScriptError::type_error(format!(
                "'in <string>' requires string as left operand, not {}",
                other.type_name()
            ))),
        },
        Value::Range { start, stop, step } => {
            let Some(v) = item.as_int().or_else(|| match item {
                Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
                _ => None,
            }) else {
                return Ok(false);
            };
            let len = range_len(*start, *stop, *step);
            let offset = i128::from(v) - i128::from(*start);
            let step = i128::from(*step);
            Ok(offset % step == 0 && {
                let idx = offset / step;
                idx >= 0 && (idx as u128) < len as u128
            })
        }
        other => Err(ScriptError::type_error(format!(
            "argument of type '{}' is not iterable",
            other.type_name()
        ))),
    }
}

fn compare_op(op: CmpOp, l: &Value, r: &Value) -> ScriptResult<bool> {
    let ordered = |want: fn(Ordering) -> bool| -> ScriptResult<bool> {
        // NaN compares false against everything
        let nan = |v: &Value| matches!(v, Value::Float(f) if f.is_nan());
        if (nan(l) && r.is_numeric()) || (nan(r) && l.is_numeric()) {
            return Ok(false);
        }
        compare_values(l, r, op.symbol()).map(want)
    };
    match op {
        CmpOp::Eq => Ok(values_equal(l, r)),
        CmpOp::Ne => Ok(!values_equal(l, r)),
        CmpOp::Lt => ordered(|o| o == Ordering::Less),
        CmpOp::Le => ordered(|o| o != Ordering::Greater),
        CmpOp::Gt => ordered(|o| o == Ordering::Greater),
        CmpOp::Ge => ordered(|o| o != Ordering::Less),
        CmpOp::In => contains(r, l),
        CmpOp::NotIn => contains(r, l).map(|b| !b),
        CmpOp::Is => Ok(values_identical(l, r)),
        CmpOp::IsNot => Ok(!values_identical(l, r)),
    }
}
