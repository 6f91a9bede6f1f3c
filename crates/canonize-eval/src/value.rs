//! Runtime values

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use canonize_syntax::{Expr, Param, Stmt};

use crate::error::Exception;
use crate::interp::Env;

pub(crate) type Shared<T> = Rc<RefCell<T>>;

pub(crate) fn shared<T>(value: T) -> Shared<T> {
    Rc::new(RefCell::new(value))
}

/// Code of a user-defined function or lambda
#[derive(Debug)]
pub(crate) enum FunctionBody {
    Block(Vec<Stmt>),
    Expr(Expr),
}

/// User-defined function together with its defining scope
pub struct Closure {
    pub(crate) name: String,
    pub(crate) params: Vec<Param>,
    /// Evaluated defaults, parallel to `params`
    pub(crate) defaults: Vec<Option<Value>>,
    pub(crate) body: FunctionBody,
    /// `None` for module-level functions, which resolve free names in globals
    pub(crate) env: Option<Env>,
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<function {}>", self.name)
    }
}

/// Python value
///
/// Lists, sets and dicts are shared and mutable, so aliasing behaves as in
/// Python. Generators are materialized as lists.
#[derive(Clone)]
pub enum Value {
    /// `None`
    None,
    /// `bool`
    Bool(bool),
    /// `int`, limited to 64 bits; overflow stops the interpreter
    Int(i64),
    /// `float`
    Float(f64),
    /// `str`
    Str(Rc<str>),
    /// `list`
    List(Shared<Vec<Value>>),
    /// `tuple`
    Tuple(Rc<[Value]>),
    /// `set`, insertion-ordered
    Set(Shared<Vec<Value>>),
    /// `dict`, insertion-ordered
    Dict(Shared<Vec<(Value, Value)>>),
    /// `range(start, stop, step)`
    Range {
        /// First value
        start: i64,
        /// Exclusive bound
        stop: i64,
        /// Nonzero stride
        step: i64,
    },
    /// User-defined function
    Function(Rc<Closure>),
    /// Built-in function
    Builtin(&'static str),
    /// Method bound to its receiver
    BoundMethod {
        /// Receiver
        receiver: Box<Value>,
        /// Method name
        name: Rc<str>,
    },
    /// Exception class
    ExceptionType(&'static str),
    /// Exception instance
    Exception(Rc<Exception>),
}

/// Numeric view of a value; `bool` counts as `int`
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    #[allow(clippy::cast_precision_loss)]
    pub(crate) const fn as_f64(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }

    fn equals(self, other: Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            (a, b) => a.as_f64() == b.as_f64(),
        }
    }

    fn order(self, other: Self) -> Ordering {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.cmp(&b),
            (a, b) => a.as_f64().partial_cmp(&b.as_f64()).unwrap_or(Ordering::Equal),
        }
    }
}

pub(crate) fn range_len(start: i64, stop: i64, step: i64) -> u64 {
    let (start, stop, step) = (i128::from(start), i128::from(stop), i128::from(step));
    let len = if step > 0 && start < stop {
        (stop - start + step - 1) / step
    } else if step < 0 && start > stop {
        (start - stop - step - 1) / -step
    } else {
        0
    };
    u64::try_from(len).unwrap_or(u64::MAX)
}

fn float_repr(f: f64) -> String {
    if f.is_nan() {
        "nan".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "inf" } else { "-inf" }.to_string()
    } else if f == f.trunc() && f.abs() < 1e16 {
        format!("{f:.1}")
    } else {
        format!("{f}")
    }
}

fn str_repr(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
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

fn join_reprs<'v>(items: impl IntoIterator<Item = &'v Value>) -> String {
    items
        .into_iter()
        .map(Value::repr)
        .collect::<Vec<_>>()
        .join(", ")
}

fn seq_eq(a: &[Value], b: &[Value]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.py_eq(y))
}

fn seq_same(a: &[Value], b: &[Value]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_as(y))
}

fn seq_cmp(a: &[Value], b: &[Value]) -> Result<Ordering, Exception> {
    for (x, y) in a.iter().zip(b) {
        if !x.py_eq(y) {
            return x.py_cmp(y);
        }
    }
    Ok(a.len().cmp(&b.len()))
}

impl Value {
    /// `str` value
    #[must_use]
    pub fn str(s: impl AsRef<str>) -> Self {
        Self::Str(Rc::from(s.as_ref()))
    }

    /// Fresh `list`
    #[must_use]
    pub fn list(items: Vec<Value>) -> Self {
        Self::List(shared(items))
    }

    /// `tuple`
    #[must_use]
    pub fn tuple(items: Vec<Value>) -> Self {
        Self::Tuple(Rc::from(items))
    }

    /// Python type name
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::None => "NoneType",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::List(_) => "list",
            Self::Tuple(_) => "tuple",
            Self::Set(_) => "set",
            Self::Dict(_) => "dict",
            Self::Range { .. } => "range",
            Self::Function(_) => "function",
            Self::Builtin(_) => "builtin_function_or_method",
            Self::BoundMethod { .. } => "method",
            Self::ExceptionType(_) => "type",
            Self::Exception(_) => "exception",
        }
    }

    /// Python truthiness
    #[must_use]
    pub fn truthy(&self) -> bool {
        match self {
            Self::None => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::Str(s) => !s.is_empty(),
            Self::List(items) | Self::Set(items) => !items.borrow().is_empty(),
            Self::Tuple(items) => !items.is_empty(),
            Self::Dict(entries) => !entries.borrow().is_empty(),
            Self::Range { start, stop, step } => range_len(*start, *stop, *step) > 0,
            _ => true,
        }
    }

    pub(crate) const fn number(&self) -> Option<Num> {
        match self {
            Self::Bool(b) => Some(Num::Int(*b as i64)),
            Self::Int(i) => Some(Num::Int(*i)),
            Self::Float(f) => Some(Num::Float(*f)),
            _ => None,
        }
    }

    /// Python `==`
    #[must_use]
    pub fn py_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::List(a), Self::List(b)) => Rc::ptr_eq(a, b) || seq_eq(&a.borrow(), &b.borrow()),
            (Self::Tuple(a), Self::Tuple(b)) => seq_eq(a, b),
            (Self::Set(a), Self::Set(b)) => {
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len() && a.iter().all(|x| b.iter().any(|y| x.py_eq(y)))
            }
            (Self::Dict(a), Self::Dict(b)) => {
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len()
                    && a.iter().all(|(k, v)| {
                        b.iter().any(|(k2, v2)| k.py_eq(k2) && v.py_eq(v2))
                    })
            }
            (
                Self::Range { start, stop, step },
                Self::Range {
                    start: s2,
                    stop: e2,
                    step: t2,
                },
            ) => (start, stop, step) == (s2, e2, t2),
            (Self::Function(a), Self::Function(b)) => Rc::ptr_eq(a, b),
            (Self::Builtin(a), Self::Builtin(b))
            | (Self::ExceptionType(a), Self::ExceptionType(b)) => a == b,
            (Self::Exception(a), Self::Exception(b)) => Rc::ptr_eq(a, b),
            _ => match (self.number(), other.number()) {
                (Some(a), Some(b)) => a.equals(b),
                _ => false,
            },
        }
    }

    /// Strict equality for comparing program results: same type all the way down
    ///
    /// `1 == 1.0` and `True == 1` hold in Python but are not the same result.
    /// Two NaNs are the same result.
    #[must_use]
    pub fn same_as(&self, other: &Value) -> bool {
        if self.type_name() != other.type_name() {
            return false;
        }
        match (self, other) {
            (Self::Float(a), Self::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Self::List(a), Self::List(b)) => seq_same(&a.borrow(), &b.borrow()),
            (Self::Tuple(a), Self::Tuple(b)) => seq_same(a, b),
            (Self::Set(a), Self::Set(b)) => {
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len() && a.iter().all(|x| b.iter().any(|y| x.same_as(y)))
            }
            (Self::Dict(a), Self::Dict(b)) => {
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len()
                    && a.iter().all(|(k, v)| {
                        b.iter().any(|(k2, v2)| k.same_as(k2) && v.same_as(v2))
                    })
            }
            (Self::Exception(a), Self::Exception(b)) => a == b,
            _ => self.py_eq(other),
        }
    }

    /// Python ordering for `<`, `<=`, `>`, `>=`
    ///
    /// # Errors
    /// Returns a `TypeError` for unorderable operands
    pub fn py_cmp(&self, other: &Value) -> Result<Ordering, Exception> {
        match (self, other) {
            (Self::Str(a), Self::Str(b)) => Ok(a.cmp(b)),
            (Self::List(a), Self::List(b)) => seq_cmp(&a.borrow(), &b.borrow()),
            (Self::Tuple(a), Self::Tuple(b)) => seq_cmp(a, b),
            _ => match (self.number(), other.number()) {
                (Some(a), Some(b)) => Ok(a.order(b)),
                _ => Err(Exception::type_error(format!(
                    "'<' not supported between instances of '{}' and '{}'",
                    self.type_name(),
                    other.type_name()
                ))),
            },
        }
    }

    /// Whether the value may be a dict key or set member
    #[must_use]
    pub fn is_hashable(&self) -> bool {
        match self {
            Self::List(_) | Self::Set(_) | Self::Dict(_) => false,
            Self::Tuple(items) => items.iter().all(Value::is_hashable),
            _ => true,
        }
    }

    /// Python `str()`
    #[must_use]
    pub fn to_str(&self) -> String {
        match self {
            Self::Str(s) => s.to_string(),
            Self::Exception(e) => e.message.clone(),
            other => other.repr(),
        }
    }

    /// Python `repr()`
    #[must_use]
    pub fn repr(&self) -> String {
        match self {
            Self::None => "None".to_string(),
            Self::Bool(true) => "True".to_string(),
            Self::Bool(false) => "False".to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => float_repr(*f),
            Self::Str(s) => str_repr(s),
            Self::List(items) => format!("[{}]", join_reprs(items.borrow().iter())),
            Self::Tuple(items) if items.len() == 1 => format!("({},)", items[0].repr()),
            Self::Tuple(items) => format!("({})", join_reprs(items.iter())),
            Self::Set(items) if items.borrow().is_empty() => "set()".to_string(),
            Self::Set(items) => format!("{{{}}}", join_reprs(items.borrow().iter())),
            Self::Dict(entries) => {
                let body = entries
                    .borrow()
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k.repr(), v.repr()))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{{{body}}}")
            }
            Self::Range { start, stop, step } if *step == 1 => format!("range({start}, {stop})"),
            Self::Range { start, stop, step } => format!("range({start}, {stop}, {step})"),
            Self::Function(closure) => format!("<function {}>", closure.name),
            Self::Builtin(name) => format!("<built-in function {name}>"),
            Self::BoundMethod { receiver, name } => {
                format!("<bound method {}.{name}>", receiver.type_name())
            }
            Self::ExceptionType(name) => format!("<class '{name}'>"),
            Self::Exception(e) => format!("{}({})", e.class, str_repr(&e.message)),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_str())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::str(s)
    }
}
