//! Tree-walking interpreter
//!
//! Runs the modelled subset of Python over the owned syntax tree. Every
//! statement, expression and iterated element costs one unit of fuel, and
//! user-level calls are bounded in depth, so any program halts. Constructs
//! outside the subset stop the run with [`EvalError::Unsupported`] instead of
//! guessing.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use canonize_syntax::{
    Arg, BoolOp, BinOp, Comprehension, ComprehensionKind, ExceptHandler, Expr, Module, Param,
    ParamKind, Stmt,
};
use serde::{Deserialize, Serialize};

use crate::builtins::builtin_value;
use crate::error::{EvalError, Exception};
use crate::ops::{binary, compare, unary};
use crate::value::{range_len, shared, Closure, FunctionBody, Num, Value};

/// Step and depth limits for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Budget {
    /// Steps available to one call
    pub fuel: u64,
    /// Deepest user-level call nesting
    pub max_depth: usize,
}

impl Default for Budget {
    fn default() -> Self {
        Self {
            fuel: 20_000,
            max_depth: 40,
        }
    }
}

impl Budget {
    /// Set fuel
    #[must_use]
    pub const fn with_fuel(mut self, fuel: u64) -> Self {
        self.fuel = fuel;
        self
    }

    /// Set maximum call depth
    #[must_use]
    pub const fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// How a call ended
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Normal return
    Returned(Value),
    /// Uncaught exception
    Raised(Exception),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Returned(value) => write!(f, "{}", value.repr()),
            Self::Raised(exception) => write!(f, "raised {exception}"),
        }
    }
}

/// Non-local exit from evaluation
pub(crate) enum Signal {
    /// Python exception, catchable by `try`
    Raise(Exception),
    /// Interpreter stop, never catchable
    Halt(EvalError),
}

impl From<EvalError> for Signal {
    fn from(error: EvalError) -> Self {
        Self::Halt(error)
    }
}

impl From<Exception> for Signal {
    fn from(exception: Exception) -> Self {
        Self::Raise(exception)
    }
}

pub(crate) type Exec<T> = Result<T, Signal>;

enum Flow {
    Next,
    Return(Value),
    Break,
    Continue,
}

/// Local scope of a call or comprehension
#[derive(Default)]
pub(crate) struct Scope {
    vars: HashMap<String, Value>,
    parent: Option<Env>,
    globals: HashSet<String>,
    nonlocals: HashSet<String>,
}

impl Scope {
    fn child(parent: Option<Env>) -> Env {
        Rc::new(RefCell::new(Self {
            parent,
            ..Self::default()
        }))
    }
}

pub(crate) type Env = Rc<RefCell<Scope>>;

/// Interpreter state for one module
pub struct Interpreter {
    budget: Budget,
    fuel: u64,
    depth: usize,
    globals: HashMap<String, Value>,
    handling: Vec<Exception>,
}

impl fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interpreter")
            .field("budget", &self.budget)
            .field("fuel", &self.fuel)
            .field("globals", &self.globals.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

fn halt_on_raise(signal: Signal) -> EvalError {
    match signal {
        Signal::Halt(error) => error,
        Signal::Raise(exception) => {
            EvalError::unsupported(format!("module-level code raised {exception}"))
        }
    }
}

impl Interpreter {
    /// Create an interpreter with a full budget
    #[must_use]
    pub fn new(budget: Budget) -> Self {
        Self {
            budget,
            fuel: budget.fuel,
            depth: 0,
            globals: HashMap::new(),
            handling: Vec::new(),
        }
    }

    /// Fuel left
    #[must_use]
    pub const fn remaining_fuel(&self) -> u64 {
        self.fuel
    }

    /// Execute the module's top-level statements
    ///
    /// # Errors
    /// Returns [`EvalError`] when a statement is outside the modelled subset,
    /// the budget runs out, or module-level code raises
    pub fn load(&mut self, module: &Module) -> Result<(), EvalError> {
        self.exec_block(&module.body, None)
            .map(|_| ())
            .map_err(halt_on_raise)
    }

    /// Call a loaded top-level function with positional arguments
    ///
    /// The budget is refilled first, so each call gets the full fuel.
    ///
    /// # Errors
    /// Returns [`EvalError`] when the function is missing or the run stops
    /// without a Python-level outcome
    pub fn call(&mut self, name: &str, args: Vec<Value>) -> Result<Outcome, EvalError> {
        let function = match self.globals.get(name) {
            Some(function @ Value::Function(_)) => function.clone(),
            _ => return Err(EvalError::MissingFunction(name.to_string())),
        };
        self.fuel = self.budget.fuel;
        self.depth = 0;
        match self.call_value(&function, args, Vec::new()) {
            Ok(value) => Ok(Outcome::Returned(value)),
            Err(Signal::Raise(exception)) => Ok(Outcome::Raised(exception)),
            Err(Signal::Halt(error)) => Err(error),
        }
    }

    pub(crate) fn charge(&mut self, units: u64) -> Exec<()> {
        if units > self.fuel {
            self.fuel = 0;
            return Err(EvalError::FuelExhausted.into());
        }
        self.fuel -= units;
        Ok(())
    }

    fn tick(&mut self) -> Exec<()> {
        self.charge(1)
    }

    // Names

    fn lookup(&self, env: Option<&Env>, name: &str) -> Exec<Value> {
        let mut scope = env.cloned();
        while let Some(current) = scope {
            let next = {
                let current = current.borrow();
                if current.globals.contains(name) {
                    break;
                }
                if let Some(value) = current.vars.get(name) {
                    return Ok(value.clone());
                }
                current.parent.clone()
            };
            scope = next;
        }
        if let Some(value) = self.globals.get(name) {
            return Ok(value.clone());
        }
        builtin_value(name).ok_or_else(|| Exception::name_error(name).into())
    }

    fn bind(&mut self, env: Option<&Env>, name: &str, value: Value) {
        let Some(env) = env else {
            self.globals.insert(name.to_string(), value);
            return;
        };
        let (is_global, is_nonlocal) = {
            let scope = env.borrow();
            (scope.globals.contains(name), scope.nonlocals.contains(name))
        };
        if is_global {
            self.globals.insert(name.to_string(), value);
            return;
        }
        if is_nonlocal {
            let mut scope = env.borrow().parent.clone();
            while let Some(current) = scope {
                if current.borrow().vars.contains_key(name) {
                    current.borrow_mut().vars.insert(name.to_string(), value);
                    return;
                }
                scope = current.borrow().parent.clone();
            }
        }
        env.borrow_mut().vars.insert(name.to_string(), value);
    }

    fn assign(&mut self, target: &Expr, value: Value, env: Option<&Env>) -> Exec<()> {
        match target {
            Expr::Name(name) => {
                self.bind(env, name, value);
                Ok(())
            }
            Expr::Tuple(targets) | Expr::List(targets) => {
                if targets.iter().any(|t| matches!(t, Expr::Starred(_))) {
                    return Err(EvalError::unsupported("starred assignment").into());
                }
                let values = self.iterate(&value)?;
                if values.len() != targets.len() {
                    return Err(Exception::value_error(format!(
                        "expected {} values to unpack, got {}",
                        targets.len(),
                        values.len()
                    ))
                    .into());
                }
                for (target, value) in targets.iter().zip(values) {
                    self.assign(target, value, env)?;
                }
                Ok(())
            }
            Expr::Subscript { value: container, index } => {
                let container = self.eval(container, env)?;
                if matches!(**index, Expr::Slice { .. }) {
                    return Err(EvalError::unsupported("slice assignment").into());
                }
                let index = self.eval(index, env)?;
                self.set_item(&container, index, value)
            }
            _ => Err(EvalError::unsupported("assignment target").into()),
        }
    }

    // Statements

    fn exec_block(&mut self, body: &[Stmt], env: Option<&Env>) -> Exec<Flow> {
        for stmt in body {
            match self.exec_stmt(stmt, env)? {
                Flow::Next => {}
                exit => return Ok(exit),
            }
        }
        Ok(Flow::Next)
    }

    #[allow(clippy::too_many_lines)]
    fn exec_stmt(&mut self, stmt: &Stmt, env: Option<&Env>) -> Exec<Flow> {
        self.tick()?;
        match stmt {
            Stmt::FunctionDef(def) => {
                if !def.decorators.is_empty() || def.is_async {
                    return Err(EvalError::unsupported("decorated or async function").into());
                }
                let function = self.closure(
                    def.name.clone(),
                    &def.params,
                    FunctionBody::Block(def.body.clone()),
                    env,
                )?;
                self.bind(env, &def.name, function);
            }
            Stmt::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr, env)?,
                    None => Value::None,
                };
                return Ok(Flow::Return(value));
            }
            Stmt::Assign { targets, value, .. } => {
                let value = self.eval(value, env)?;
                for target in targets {
                    self.assign(target, value.clone(), env)?;
                }
            }
            Stmt::AugAssign { target, op, value } => {
                let rhs = self.eval(value, env)?;
                let current = self.eval(target, env)?;
                let updated = match (&current, op) {
                    (Value::List(items), BinOp::Add) => {
                        let extra = self.iterate(&rhs)?;
                        items.borrow_mut().extend(extra);
                        current.clone()
                    }
                    _ => binary(*op, &current, &rhs)?,
                };
                self.assign(target, updated, env)?;
            }
            Stmt::Expr(expr) => {
                self.eval(expr, env)?;
            }
            Stmt::If { test, body, orelse } => {
                return if self.eval(test, env)?.truthy() {
                    self.exec_block(body, env)
                } else {
                    self.exec_block(orelse, env)
                };
            }
            Stmt::For {
                target,
                iter,
                body,
                orelse,
            } => {
                let iterable = self.eval(iter, env)?;
                for item in self.iterate(&iterable)? {
                    self.assign(target, item, env)?;
                    match self.exec_block(body, env)? {
                        Flow::Break => return Ok(Flow::Next),
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Next | Flow::Continue => {}
                    }
                }
                return self.exec_block(orelse, env);
            }
            Stmt::While { test, body, orelse } => {
                while self.eval(test, env)?.truthy() {
                    match self.exec_block(body, env)? {
                        Flow::Break => return Ok(Flow::Next),
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Next | Flow::Continue => {}
                    }
                }
                return self.exec_block(orelse, env);
            }
            Stmt::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => return self.exec_try(body, handlers, orelse, finalbody, env),
            Stmt::Raise { exc, .. } => {
                let exception = match exc {
                    None => self.handling.last().cloned().ok_or_else(|| {
                        Exception::new("RuntimeError", "No active exception to reraise")
                    })?,
                    Some(expr) => {
                        let value = self.eval(expr, env)?;
                        to_exception(value)?
                    }
                };
                return Err(Signal::Raise(exception));
            }
            Stmt::Assert { test, msg } => {
                if !self.eval(test, env)?.truthy() {
                    let message = match msg {
                        Some(msg) => self.eval(msg, env)?.to_str(),
                        None => String::new(),
                    };
                    return Err(Exception::new("AssertionError", message).into());
                }
            }
            Stmt::Global(names) => {
                if let Some(env) = env {
                    env.borrow_mut().globals.extend(names.iter().cloned());
                }
            }
            Stmt::Nonlocal(names) => {
                if let Some(env) = env {
                    env.borrow_mut().nonlocals.extend(names.iter().cloned());
                }
            }
            Stmt::Pass => {}
            Stmt::Break => return Ok(Flow::Break),
            Stmt::Continue => return Ok(Flow::Continue),
            Stmt::Import(_) | Stmt::ImportFrom { .. } => {
                return Err(EvalError::unsupported("import").into());
            }
            Stmt::Opaque { kind, .. } => return Err(EvalError::unsupported(kind.clone()).into()),
        }
        Ok(Flow::Next)
    }

    fn exec_try(
        &mut self,
        body: &[Stmt],
        handlers: &[ExceptHandler],
        orelse: &[Stmt],
        finalbody: &[Stmt],
        env: Option<&Env>,
    ) -> Exec<Flow> {
        let outcome = match self.exec_block(body, env) {
            Ok(Flow::Next) => self.exec_block(orelse, env),
            Ok(exit) => Ok(exit),
            Err(Signal::Raise(exception)) => self.handle(exception, handlers, env),
            Err(halt @ Signal::Halt(_)) => return Err(halt),
        };
        if finalbody.is_empty() {
            return outcome;
        }
        match self.exec_block(finalbody, env)? {
            Flow::Next => outcome,
            exit => Ok(exit),
        }
    }

    fn handle(
        &mut self,
        exception: Exception,
        handlers: &[ExceptHandler],
        env: Option<&Env>,
    ) -> Exec<Flow> {
        for handler in handlers {
            if !self.handler_matches(handler.ty.as_ref(), &exception, env)? {
                continue;
            }
            if let Some(name) = &handler.name {
                self.bind(env, name, Value::Exception(Rc::new(exception.clone())));
            }
            self.handling.push(exception);
            let result = self.exec_block(&handler.body, env);
            self.handling.pop();
            return result;
        }
        Err(Signal::Raise(exception))
    }

    fn handler_matches(
        &mut self,
        ty: Option<&Expr>,
        exception: &Exception,
        env: Option<&Env>,
    ) -> Exec<bool> {
        let Some(ty) = ty else {
            return Ok(true);
        };
        let catches = |value: &Value| {
            matches!(value, Value::ExceptionType(class) if exception.is_caught_by(class))
        };
        match self.eval(ty, env)? {
            Value::Tuple(classes) => Ok(classes.iter().any(catches)),
            class @ Value::ExceptionType(_) => Ok(catches(&class)),
            _ => Err(Exception::type_error(
                "catching classes that do not inherit from BaseException is not allowed",
            )
            .into()),
        }
    }

    // Expressions

    pub(crate) fn eval(&mut self, expr: &Expr, env: Option<&Env>) -> Exec<Value> {
        self.tick()?;
        Ok(match expr {
            Expr::Name(name) => self.lookup(env, name)?,
            Expr::Int(i) => Value::Int(*i),
            Expr::Float(f) => Value::Float(*f),
            Expr::Str(lit) if lit.bytes => return Err(EvalError::unsupported("bytes").into()),
            Expr::Str(lit) => Value::str(&lit.value),
            Expr::Bool(b) => Value::Bool(*b),
            Expr::NoneLit => Value::None,
            Expr::BinOp { left, op, right } => {
                let left = self.eval(left, env)?;
                let right = self.eval(right, env)?;
                binary(*op, &left, &right)?
            }
            Expr::Unary { op, operand } => {
                let operand = self.eval(operand, env)?;
                unary(*op, &operand)?
            }
            Expr::BoolOp { op, left, right } => {
                let left = self.eval(left, env)?;
                match (op, left.truthy()) {
                    (BoolOp::And, false) | (BoolOp::Or, true) => left,
                    _ => self.eval(right, env)?,
                }
            }
            Expr::Compare {
                left,
                ops,
                comparators,
            } => {
                let mut current = self.eval(left, env)?;
                for (op, comparator) in ops.iter().zip(comparators) {
                    let next = self.eval(comparator, env)?;
                    if !compare(*op, &current, &next)? {
                        return Ok(Value::Bool(false));
                    }
                    current = next;
                }
                Value::Bool(true)
            }
            Expr::Call { func, args } => self.eval_call(func, args, env)?,
            Expr::Attribute { value, attr } => Value::BoundMethod {
                receiver: Box::new(self.eval(value, env)?),
                name: Rc::from(attr.as_str()),
            },
            Expr::Subscript { value, index } => {
                let container = self.eval(value, env)?;
                if let Expr::Slice { lower, upper, step } = &**index {
                    let lower = self.eval_bound(lower.as_deref(), env)?;
                    let upper = self.eval_bound(upper.as_deref(), env)?;
                    let step = self.eval_bound(step.as_deref(), env)?;
                    slice(&container, lower, upper, step)?
                } else {
                    let index = self.eval(index, env)?;
                    get_item(&container, &index)?
                }
            }
            Expr::Slice { .. } => return Err(EvalError::unsupported("bare slice").into()),
            Expr::List(items) => Value::list(self.eval_items(items, env)?),
            Expr::Tuple(items) => Value::tuple(self.eval_items(items, env)?),
            Expr::Set(items) => {
                let items = self.eval_items(items, env)?;
                make_set(items)?
            }
            Expr::Dict(pairs) => {
                let mut entries = Vec::with_capacity(pairs.len());
                for (key, value) in pairs {
                    let key = self.eval(key, env)?;
                    let value = self.eval(value, env)?;
                    dict_insert(&mut entries, key, value)?;
                }
                Value::Dict(shared(entries))
            }
            Expr::Comprehension(comp) => self.comprehension(comp, env)?,
            Expr::IfExp { test, body, orelse } => {
                if self.eval(test, env)?.truthy() {
                    self.eval(body, env)?
                } else {
                    self.eval(orelse, env)?
                }
            }
            Expr::Lambda { params, body } => self.closure(
                "<lambda>".to_string(),
                params,
                FunctionBody::Expr((**body).clone()),
                env,
            )?,
            Expr::Starred(_) => return Err(EvalError::unsupported("starred expression").into()),
            Expr::Opaque(text) => return Err(EvalError::unsupported(text.clone()).into()),
        })
    }

    fn eval_bound(&mut self, bound: Option<&Expr>, env: Option<&Env>) -> Exec<Option<i64>> {
        let Some(bound) = bound else {
            return Ok(None);
        };
        match self.eval(bound, env)? {
            Value::None => Ok(None),
            value => match value.number() {
                Some(Num::Int(i)) => Ok(Some(i)),
                _ => Err(Exception::type_error(
                    "slice indices must be integers or None",
                )
                .into()),
            },
        }
    }

    fn eval_items(&mut self, items: &[Expr], env: Option<&Env>) -> Exec<Vec<Value>> {
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            if let Expr::Starred(inner) = item {
                let iterable = self.eval(inner, env)?;
                out.extend(self.iterate(&iterable)?);
            } else {
                out.push(self.eval(item, env)?);
            }
        }
        Ok(out)
    }

    fn eval_call(&mut self, func: &Expr, args: &[Arg], env: Option<&Env>) -> Exec<Value> {
        let callee = self.eval(func, env)?;
        let mut positional = Vec::with_capacity(args.len());
        let mut keywords = Vec::new();
        for arg in args {
            match arg {
                Arg::Positional(expr) => positional.push(self.eval(expr, env)?),
                Arg::Star(expr) => {
                    let iterable = self.eval(expr, env)?;
                    positional.extend(self.iterate(&iterable)?);
                }
                Arg::Keyword { name, value } => {
                    keywords.push((name.clone(), self.eval(value, env)?));
                }
                Arg::DoubleStar(_) => {
                    return Err(EvalError::unsupported("** arguments").into());
                }
            }
        }
        self.call_value(&callee, positional, keywords)
    }

    fn comprehension(&mut self, comp: &Comprehension, env: Option<&Env>) -> Exec<Value> {
        let scope = Scope::child(env.cloned());
        let mut produced = Vec::new();
        self.comprehend(comp, 0, &scope, &mut produced)?;
        Ok(match comp.kind {
            ComprehensionKind::List | ComprehensionKind::Generator => {
                Value::list(produced.into_iter().map(|(key, _)| key).collect())
            }
            ComprehensionKind::Set => make_set(produced.into_iter().map(|(key, _)| key).collect())?,
            ComprehensionKind::Dict => {
                let mut entries = Vec::with_capacity(produced.len());
                for (key, value) in produced {
                    dict_insert(&mut entries, key, value.unwrap_or(Value::None))?;
                }
                Value::Dict(shared(entries))
            }
        })
    }

    fn comprehend(
        &mut self,
        comp: &Comprehension,
        clause: usize,
        scope: &Env,
        out: &mut Vec<(Value, Option<Value>)>,
    ) -> Exec<()> {
        let Some(current) = comp.clauses.get(clause) else {
            let key = self.eval(&comp.element, Some(scope))?;
            let value = match &comp.value {
                Some(value) => Some(self.eval(value, Some(scope))?),
                None => None,
            };
            out.push((key, value));
            return Ok(());
        };
        let iterable = self.eval(&current.iter, Some(scope))?;
        'items: for item in self.iterate(&iterable)? {
            self.assign(&current.target, item, Some(scope))?;
            for condition in &current.ifs {
                if !self.eval(condition, Some(scope))?.truthy() {
                    continue 'items;
                }
            }
            self.comprehend(comp, clause + 1, scope, out)?;
        }
        Ok(())
    }

    // Calls

    fn closure(
        &mut self,
        name: String,
        params: &[Param],
        body: FunctionBody,
        env: Option<&Env>,
    ) -> Exec<Value> {
        let mut defaults = Vec::with_capacity(params.len());
        for param in params {
            defaults.push(match &param.default {
                Some(default) => Some(self.eval(default, env)?),
                None => None,
            });
        }
        Ok(Value::Function(Rc::new(Closure {
            name,
            params: params.to_vec(),
            defaults,
            body,
            env: env.cloned(),
        })))
    }

    pub(crate) fn call_value(
        &mut self,
        callee: &Value,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Exec<Value> {
        match callee {
            Value::Function(closure) => self.call_closure(closure, args, kwargs),
            Value::Builtin(name) => self.call_builtin(name, args, kwargs),
            Value::BoundMethod { receiver, name } => self.call_method(receiver, name, args, kwargs),
            Value::ExceptionType(class) => {
                let message = args.first().map(Value::to_str).unwrap_or_default();
                Ok(Value::Exception(Rc::new(Exception::new(*class, message))))
            }
            other => Err(Exception::type_error(format!(
                "'{}' object is not callable",
                other.type_name()
            ))
            .into()),
        }
    }

    fn call_closure(
        &mut self,
        closure: &Rc<Closure>,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Exec<Value> {
        if self.depth >= self.budget.max_depth {
            return Err(EvalError::DepthExceeded(self.budget.max_depth).into());
        }
        let env = Scope::child(closure.env.clone());
        bind_arguments(closure, &env, args, kwargs)?;
        self.depth += 1;
        let result = match &closure.body {
            FunctionBody::Block(body) => self.exec_block(body, Some(&env)).map(|flow| match flow {
                Flow::Return(value) => value,
                _ => Value::None,
            }),
            FunctionBody::Expr(expr) => self.eval(expr, Some(&env)),
        };
        self.depth -= 1;
        result
    }

    /// Elements of an iterable, charged one unit of fuel each
    pub(crate) fn iterate(&mut self, value: &Value) -> Exec<Vec<Value>> {
        let items: Vec<Value> = match value {
            Value::List(items) | Value::Set(items) => items.borrow().clone(),
            Value::Tuple(items) => items.to_vec(),
            Value::Str(s) => s.chars().map(|c| Value::str(c.to_string())).collect(),
            Value::Dict(entries) => entries.borrow().iter().map(|(k, _)| k.clone()).collect(),
            Value::Range { start, stop, step } => {
                let len = range_len(*start, *stop, *step);
                self.charge(len)?;
                let mut current = *start;
                return Ok((0..len)
                    .map(|_| {
                        let item = Value::Int(current);
                        current = current.saturating_add(*step);
                        item
                    })
                    .collect());
            }
            other => {
                return Err(Exception::type_error(format!(
                    "'{}' object is not iterable",
                    other.type_name()
                ))
                .into())
            }
        };
        self.charge(u64::try_from(items.len()).unwrap_or(u64::MAX))?;
        Ok(items)
    }

    fn set_item(&mut self, container: &Value, index: Value, value: Value) -> Exec<()> {
        match container {
            Value::List(items) => {
                let len = items.borrow().len();
                let at = normalize_index(&index, len, "list assignment index out of range")?;
                items.borrow_mut()[at] = value;
                Ok(())
            }
            Value::Dict(entries) => {
                dict_insert(&mut entries.borrow_mut(), index, value)?;
                Ok(())
            }
            other => Err(Exception::type_error(format!(
                "'{}' object does not support item assignment",
                other.type_name()
            ))
            .into()),
        }
    }
}

fn bind_arguments(
    closure: &Closure,
    env: &Env,
    args: Vec<Value>,
    mut kwargs: Vec<(String, Value)>,
) -> Exec<()> {
    let mut args = args.into_iter();
    let mut scope = env.borrow_mut();
    let mut keyword_only = false;
    for (param, default) in closure.params.iter().zip(&closure.defaults) {
        match param.kind {
            ParamKind::PositionalOnlyMarker => {}
            ParamKind::KeywordOnlyMarker => keyword_only = true,
            ParamKind::VarArgs => {
                scope
                    .vars
                    .insert(param.name.clone(), Value::tuple(args.by_ref().collect()));
                keyword_only = true;
            }
            ParamKind::KwArgs => {
                let entries = kwargs
                    .drain(..)
                    .map(|(key, value)| (Value::str(key), value))
                    .collect();
                scope.vars.insert(param.name.clone(), Value::Dict(shared(entries)));
            }
            ParamKind::Regular => {
                let positional = if keyword_only { None } else { args.next() };
                let value = match positional {
                    Some(value) => value,
                    None => match kwargs.iter().position(|(key, _)| *key == param.name) {
                        Some(at) => kwargs.remove(at).1,
                        None => default.clone().ok_or_else(|| {
                            Exception::type_error(format!(
                                "{}() missing required argument: '{}'",
                                closure.name, param.name
                            ))
                        })?,
                    },
                };
                scope.vars.insert(param.name.clone(), value);
            }
        }
    }
    if args.next().is_some() {
        return Err(Exception::type_error(format!(
            "{}() got too many positional arguments",
            closure.name
        ))
        .into());
    }
    if let Some((key, _)) = kwargs.first() {
        return Err(Exception::type_error(format!(
            "{}() got an unexpected keyword argument '{key}'",
            closure.name
        ))
        .into());
    }
    Ok(())
}

fn to_exception(value: Value) -> Result<Exception, Exception> {
    match value {
        Value::ExceptionType(class) => Ok(Exception::new(class, "")),
        Value::Exception(exception) => Ok((*exception).clone()),
        _ => Err(Exception::type_error(
            "exceptions must derive from BaseException",
        )),
    }
}

pub(crate) fn normalize_index(
    index: &Value,
    len: usize,
    message: &str,
) -> Result<usize, Exception> {
    let Some(Num::Int(i)) = index.number() else {
        return Err(Exception::type_error(format!(
            "indices must be integers, not {}",
            index.type_name()
        )));
    };
    let len = i64::try_from(len).unwrap_or(i64::MAX);
    let at = if i < 0 { i + len } else { i };
    if (0..len).contains(&at) {
        usize::try_from(at).map_err(|_| Exception::index_error(message))
    } else {
        Err(Exception::index_error(message))
    }
}

fn get_item(container: &Value, index: &Value) -> Result<Value, Exception> {
    match container {
        Value::List(items) => {
            let items = items.borrow();
            let at = normalize_index(index, items.len(), "list index out of range")?;
            Ok(items[at].clone())
        }
        Value::Tuple(items) => {
            let at = normalize_index(index, items.len(), "tuple index out of range")?;
            Ok(items[at].clone())
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let at = normalize_index(index, chars.len(), "string index out of range")?;
            Ok(Value::str(chars[at].to_string()))
        }
        Value::Range { start, stop, step } => {
            let len = usize::try_from(range_len(*start, *stop, *step)).unwrap_or(usize::MAX);
            let at = normalize_index(index, len, "range object index out of range")?;
            let offset = i64::try_from(at).unwrap_or(i64::MAX);
            Ok(Value::Int(start.saturating_add(offset.saturating_mul(*step))))
        }
        Value::Dict(entries) => entries
            .borrow()
            .iter()
            .find(|(key, _)| key.py_eq(index))
            .map(|(_, value)| value.clone())
            .ok_or_else(|| Exception::key_error(index.repr())),
        other => Err(Exception::type_error(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

fn slice_indices(
    len: usize,
    lower: Option<i64>,
    upper: Option<i64>,
    step: Option<i64>,
) -> Result<Vec<usize>, Exception> {
    let step = step.unwrap_or(1);
    if step == 0 {
        return Err(Exception::value_error("slice step cannot be zero"));
    }
    let len = i64::try_from(len).unwrap_or(i64::MAX);
    let clamp = |bound: i64, low: i64, high: i64| {
        let bound = if bound < 0 { bound + len } else { bound };
        bound.clamp(low, high)
    };
    let (start, stop) = if step > 0 {
        (
            lower.map_or(0, |b| clamp(b, 0, len)),
            upper.map_or(len, |b| clamp(b, 0, len)),
        )
    } else {
        (
            lower.map_or(len - 1, |b| clamp(b, -1, len - 1)),
            upper.map_or(-1, |b| clamp(b, -1, len - 1)),
        )
    };
    let mut out = Vec::new();
    let mut at = start;
    while (step > 0 && at < stop) || (step < 0 && at > stop) {
        out.push(usize::try_from(at).unwrap_or_default());
        at += step;
    }
    Ok(out)
}

fn slice(
    container: &Value,
    lower: Option<i64>,
    upper: Option<i64>,
    step: Option<i64>,
) -> Result<Value, Exception> {
    match container {
        Value::List(items) => {
            let items = items.borrow();
            let picked = slice_indices(items.len(), lower, upper, step)?;
            Ok(Value::list(picked.into_iter().map(|i| items[i].clone()).collect()))
        }
        Value::Tuple(items) => {
            let picked = slice_indices(items.len(), lower, upper, step)?;
            Ok(Value::tuple(picked.into_iter().map(|i| items[i].clone()).collect()))
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let picked = slice_indices(chars.len(), lower, upper, step)?;
            Ok(Value::str(picked.into_iter().map(|i| chars[i]).collect::<String>()))
        }
        other => Err(Exception::type_error(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

fn unhashable(value: &Value) -> Exception {
    Exception::type_error(format!("unhashable type: '{}'", value.type_name()))
}

pub(crate) fn dict_insert(
    entries: &mut Vec<(Value, Value)>,
    key: Value,
    value: Value,
) -> Result<(), Exception> {
    if !key.is_hashable() {
        return Err(unhashable(&key));
    }
    match entries.iter_mut().find(|(existing, _)| existing.py_eq(&key)) {
        Some((_, slot)) => *slot = value,
        None => entries.push((key, value)),
    }
    Ok(())
}

pub(crate) fn make_set(items: Vec<Value>) -> Result<Value, Exception> {
    let mut members: Vec<Value> = Vec::with_capacity(items.len());
    for item in items {
        if !item.is_hashable() {
            return Err(unhashable(&item));
        }
        if !members.iter().any(|member| member.py_eq(&item)) {
            members.push(item);
        }
    }
    Ok(Value::Set(shared(members)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use canonize_syntax::parse_module;
    use pretty_assertions::assert_eq;

    fn run(source: &str, name: &str, args: Vec<Value>) -> Result<Outcome, EvalError> {
        let module = parse_module(source).unwrap();
        let mut interpreter = Interpreter::new(Budget::default());
        interpreter.load(&module)?;
        interpreter.call(name, args)
    }

    fn returned(source: &str, args: Vec<Value>) -> Value {
        match run(source, "f", args).unwrap() {
            Outcome::Returned(value) => value,
            Outcome::Raised(exception) => panic!("raised {exception}"),
        }
    }

    fn raised(source: &str, args: Vec<Value>) -> String {
        match run(source, "f", args).unwrap() {
            Outcome::Raised(exception) => exception.class,
            Outcome::Returned(value) => panic!("returned {value:?}"),
        }
    }

    #[test]
    fn arithmetic_and_control_flow() {
        let source = "def f(n):\n    total = 0\n    for i in range(n):\n        if i % 2 == 0:\n            continue\n        total += i\n    return total\n";
        assert_eq!(returned(source, vec![Value::Int(10)]).repr(), "25");
    }

    #[test]
    fn recursion() {
        let source = "def f(n):\n    if n <= 1:\n        return 1\n    return n * f(n - 1)\n";
        assert_eq!(returned(source, vec![Value::Int(10)]).repr(), "3628800");
    }

    #[test]
    fn comprehensions_and_join() {
        let source = "def f(xs):\n    return ''.join(x.upper() for x in xs if x != 'b')\n";
        assert_eq!(returned(source, vec![Value::str("abc")]).repr(), "'AC'");
        let source = "def f(xs):\n    return {x: x * x for x in xs}\n";
        assert_eq!(
            returned(source, vec![Value::list(vec![Value::Int(2), Value::Int(3)])]).repr(),
            "{2: 4, 3: 9}"
        );
    }

    #[test]
    fn list_aliasing_is_visible() {
        let source = "def f():\n    a = []\n    b = a\n    b.append(1)\n    a += [2]\n    return b\n";
        assert_eq!(returned(source, vec![]).repr(), "[1, 2]");
    }

    #[test]
    fn exceptions_propagate_and_are_caught() {
        assert_eq!(raised("def f(x):\n    return x[3]\n", vec![Value::list(vec![])]), "IndexError");
        assert_eq!(raised("def f(x):\n    return 1 // x\n", vec![Value::Int(0)]), "ZeroDivisionError");
        let source = "def f(x):\n    try:\n        return 1 // x\n    except ArithmeticError as e:\n        return str(e)\n    finally:\n        x = 5\n";
        assert_eq!(returned(source, vec![Value::Int(0)]).repr(), "'division by zero'");
        let source = "def f(x):\n    if x < 0:\n        raise ValueError('negative')\n    return x\n";
        assert_eq!(raised(source, vec![Value::Int(-1)]), "ValueError");
    }

    #[test]
    fn closures_see_enclosing_scope() {
        let source = "def f(k):\n    def add(x):\n        return x + k\n    return list(map(add, [1, 2])) + [(lambda y: y * k)(3)]\n";
        assert_eq!(returned(source, vec![Value::Int(10)]).repr(), "[11, 12, 30]");
    }

    #[test]
    fn slicing_follows_python() {
        let xs = || Value::list((0..6).map(Value::Int).collect());
        assert_eq!(returned("def f(x):\n    return x[1:4]\n", vec![xs()]).repr(), "[1, 2, 3]");
        assert_eq!(returned("def f(x):\n    return x[::-2]\n", vec![xs()]).repr(), "[5, 3, 1]");
        assert_eq!(returned("def f(x):\n    return x[-2:]\n", vec![xs()]).repr(), "[4, 5]");
        let reversed = returned("def f(s):\n    return s[::-1]\n", vec![Value::str("abc")]);
        assert_eq!(reversed.repr(), "'cba'");
    }

    #[test]
    fn infinite_loop_runs_out_of_fuel() {
        let err = run("def f():\n    while True:\n        pass\n", "f", vec![]).unwrap_err();
        assert_eq!(err, EvalError::FuelExhausted);
    }

    #[test]
    fn runaway_recursion_hits_the_depth_bound() {
        let err = run("def f(n):\n    return f(n + 1)\n", "f", vec![Value::Int(0)]).unwrap_err();
        assert_eq!(err, EvalError::DepthExceeded(Budget::default().max_depth));
    }

    #[test]
    fn imports_are_unsupported() {
        let err = run("import re\ndef f():\n    return 1\n", "f", vec![]).unwrap_err();
        assert!(matches!(err, EvalError::Unsupported(_)));
    }

    #[test]
    fn missing_entry_point() {
        let err = run("def g():\n    return 1\n", "f", vec![]).unwrap_err();
        assert_eq!(err, EvalError::MissingFunction("f".to_string()));
    }

    #[test]
    fn arguments_bind_by_keyword_and_default() {
        let source = "def f(a, b=2, *rest, scale=1):\n    return (a + b + len(rest)) * scale\n";
        assert_eq!(returned(source, vec![Value::Int(1)]).repr(), "3");
        assert_eq!(
            returned(
                source,
                vec![Value::Int(1), Value::Int(1), Value::Int(9), Value::Int(9)],
            )
            .repr(),
            "4"
        );
    }
}
