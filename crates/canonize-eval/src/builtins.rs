//! Built-in functions and methods of the modelled subset

use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

use canonize_syntax::BinOp;

use crate::error::{EvalError, Exception, EXCEPTION_CLASSES};
use crate::interp::{dict_insert, make_set, normalize_index, Exec, Interpreter, Signal};
use crate::ops::binary;
use crate::value::{range_len, shared, Num, Value};

/// Built-in functions the interpreter implements
const BUILTIN_FUNCTIONS: &[&str] = &[
    "abs", "all", "any", "bool", "chr", "dict", "divmod", "enumerate", "filter", "float", "int",
    "isinstance", "len", "list", "map", "max", "min", "ord", "pow", "print", "range", "reversed",
    "round", "set", "sorted", "str", "sum", "tuple", "zip",
];

/// Value a name resolves to when no scope binds it
pub(crate) fn builtin_value(name: &str) -> Option<Value> {
    if let Some(found) = BUILTIN_FUNCTIONS.iter().find(|b| **b == name) {
        return Some(Value::Builtin(*found));
    }
    EXCEPTION_CLASSES
        .iter()
        .find(|class| **class == name)
        .copied()
        .map(Value::ExceptionType)
}

type Kwargs = Vec<(String, Value)>;

fn take_kwarg(kwargs: &mut Kwargs, name: &str) -> Option<Value> {
    let at = kwargs.iter().position(|(key, _)| key == name)?;
    Some(kwargs.remove(at).1)
}

fn reject_kwargs(function: &str, kwargs: &Kwargs) -> Result<(), Exception> {
    match kwargs.first() {
        Some((key, _)) => Err(Exception::type_error(format!(
            "{function}() got an unexpected keyword argument '{key}'"
        ))),
        None => Ok(()),
    }
}

fn arity(function: &str, args: &[Value], min: usize, max: usize) -> Result<(), Exception> {
    if (min..=max).contains(&args.len()) {
        Ok(())
    } else {
        Err(Exception::type_error(format!(
            "{function}() takes {min} to {max} arguments ({} given)",
            args.len()
        )))
    }
}

fn int_arg(value: &Value) -> Result<i64, Exception> {
    match value.number() {
        Some(Num::Int(i)) => Ok(i),
        _ => Err(Exception::type_error(format!(
            "'{}' object cannot be interpreted as an integer",
            value.type_name()
        ))),
    }
}

fn str_arg<'v>(value: &'v Value, function: &str) -> Result<&'v str, Exception> {
    match value {
        Value::Str(s) => Ok(s),
        other => Err(Exception::type_error(format!(
            "{function}() argument must be str, not {}",
            other.type_name()
        ))),
    }
}

/// Round half to even
fn round_half_even(f: f64) -> f64 {
    let rounded = f.round();
    if (f - f.trunc()).abs() == 0.5 && rounded % 2.0 != 0.0 {
        rounded - f.signum()
    } else {
        rounded
    }
}

#[allow(clippy::cast_possible_truncation)]
fn float_to_int(f: f64) -> Exec<i64> {
    if f.is_nan() {
        return Err(Exception::value_error("cannot convert float NaN to integer").into());
    }
    if !f.is_finite() || f.abs() >= 9.2e18 {
        return Err(EvalError::unsupported("integer overflow").into());
    }
    Ok(f as i64)
}

fn parse_int(text: &str) -> Result<i64, Exception> {
    text.trim()
        .replace('_', "")
        .parse::<i64>()
        .map_err(|_| {
            Exception::value_error(format!("invalid literal for int() with base 10: '{text}'"))
        })
}

impl Interpreter {
    #[allow(clippy::too_many_lines)]
    pub(crate) fn call_builtin(
        &mut self,
        name: &str,
        mut args: Vec<Value>,
        kwargs: Kwargs,
    ) -> Exec<Value> {
        self.charge(1)?;
        if matches!(name, "min" | "max" | "sorted") {
            return self.ordering_builtin(name, args, kwargs);
        }
        reject_kwargs(name, &kwargs)?;
        Ok(match name {
            "print" => Value::None,
            "len" => {
                arity(name, &args, 1, 1)?;
                let len = match &args[0] {
                    Value::Str(s) => s.chars().count(),
                    Value::List(items) | Value::Set(items) => items.borrow().len(),
                    Value::Tuple(items) => items.len(),
                    Value::Dict(entries) => entries.borrow().len(),
                    Value::Range { start, stop, step } => {
                        usize::try_from(range_len(*start, *stop, *step)).unwrap_or(usize::MAX)
                    }
                    other => {
                        return Err(Exception::type_error(format!(
                            "object of type '{}' has no len()",
                            other.type_name()
                        ))
                        .into())
                    }
                };
                Value::Int(i64::try_from(len).unwrap_or(i64::MAX))
            }
            "abs" => {
                arity(name, &args, 1, 1)?;
                match args[0].number() {
                    Some(Num::Int(i)) => Value::Int(
                        i.checked_abs()
                            .ok_or_else(|| EvalError::unsupported("integer overflow"))?,
                    ),
                    Some(Num::Float(f)) => Value::Float(f.abs()),
                    None => {
                        return Err(Exception::type_error(format!(
                            "bad operand type for abs(): '{}'",
                            args[0].type_name()
                        ))
                        .into())
                    }
                }
            }
            "bool" => {
                arity(name, &args, 0, 1)?;
                Value::Bool(args.first().is_some_and(Value::truthy))
            }
            "int" => {
                arity(name, &args, 0, 1)?;
                match args.first() {
                    None => Value::Int(0),
                    Some(Value::Str(s)) => Value::Int(parse_int(s)?),
                    Some(value) => match value.number() {
                        Some(Num::Int(i)) => Value::Int(i),
                        Some(Num::Float(f)) => Value::Int(float_to_int(f.trunc())?),
                        None => {
                            return Err(Exception::type_error(format!(
                                "int() argument must be a string or a number, not '{}'",
                                value.type_name()
                            ))
                            .into())
                        }
                    },
                }
            }
            "float" => {
                arity(name, &args, 0, 1)?;
                match args.first() {
                    None => Value::Float(0.0),
                    Some(Value::Str(s)) => Value::Float(s.trim().parse::<f64>().map_err(|_| {
                        Exception::value_error(format!("could not convert string to float: '{s}'"))
                    })?),
                    Some(value) => match value.number() {
                        Some(n) => Value::Float(n.as_f64()),
                        None => {
                            return Err(Exception::type_error(format!(
                                "float() argument must be a string or a number, not '{}'",
                                value.type_name()
                            ))
                            .into())
                        }
                    },
                }
            }
            "str" => {
                arity(name, &args, 0, 1)?;
                Value::str(args.first().map(Value::to_str).unwrap_or_default())
            }
            "list" | "tuple" | "set" => {
                arity(name, &args, 0, 1)?;
                let items = match args.first() {
                    Some(iterable) => self.iterate(iterable)?,
                    None => Vec::new(),
                };
                match name {
                    "list" => Value::list(items),
                    "tuple" => Value::tuple(items),
                    _ => make_set(items)?,
                }
            }
            "dict" => {
                arity(name, &args, 0, 1)?;
                let mut entries = Vec::new();
                match args.first() {
                    Some(Value::Dict(source)) => entries.clone_from(&source.borrow()),
                    Some(pairs) => {
                        for pair in self.iterate(pairs)? {
                            let pair = self.iterate(&pair)?;
                            let [key, value]: [Value; 2] = pair.try_into().map_err(|_| {
                                Exception::value_error(
                                    "dictionary update sequence element has wrong length",
                                )
                            })?;
                            dict_insert(&mut entries, key, value)?;
                        }
                    }
                    None => {}
                }
                Value::Dict(shared(entries))
            }
            "range" => {
                arity(name, &args, 1, 3)?;
                let bounds = args.iter().map(int_arg).collect::<Result<Vec<_>, _>>()?;
                let (start, stop, step) = match bounds.as_slice() {
                    [stop] => (0, *stop, 1),
                    [start, stop] => (*start, *stop, 1),
                    [start, stop, step] => (*start, *stop, *step),
                    _ => {
                        return Err(Exception::type_error("range expected 1 to 3 arguments").into())
                    }
                };
                if step == 0 {
                    return Err(Exception::value_error("range() arg 3 must not be zero").into());
                }
                Value::Range { start, stop, step }
            }
            "sum" => {
                arity(name, &args, 1, 2)?;
                let mut total = args.get(1).cloned().unwrap_or(Value::Int(0));
                if matches!(total, Value::Str(_)) {
                    return Err(Exception::type_error(
                        "sum() can't sum strings [use ''.join(seq) instead]",
                    )
                    .into());
                }
                for item in self.iterate(&args[0])? {
                    total = binary(BinOp::Add, &total, &item)?;
                }
                total
            }
            "reversed" => {
                arity(name, &args, 1, 1)?;
                let mut items = self.iterate(&args[0])?;
                items.reverse();
                Value::list(items)
            }
            "enumerate" => {
                arity(name, &args, 1, 2)?;
                let start = args.get(1).map(int_arg).transpose()?.unwrap_or(0);
                let items = self.iterate(&args[0])?;
                Value::list(
                    items
                        .into_iter()
                        .zip(start..)
                        .map(|(item, i)| Value::tuple(vec![Value::Int(i), item]))
                        .collect(),
                )
            }
            "zip" => {
                let mut columns = Vec::with_capacity(args.len());
                for arg in &args {
                    columns.push(self.iterate(arg)?);
                }
                let rows = columns.iter().map(Vec::len).min().unwrap_or(0);
                Value::list(
                    (0..rows)
                        .map(|row| Value::tuple(columns.iter().map(|c| c[row].clone()).collect()))
                        .collect(),
                )
            }
            "map" => {
                if args.len() < 2 {
                    let message = "map() must have at least two arguments.";
                    return Err(Exception::type_error(message).into());
                }
                let function = args.remove(0);
                let mut columns = Vec::with_capacity(args.len());
                for arg in &args {
                    columns.push(self.iterate(arg)?);
                }
                let rows = columns.iter().map(Vec::len).min().unwrap_or(0);
                let mut out = Vec::with_capacity(rows);
                for row in 0..rows {
                    let call_args = columns.iter().map(|c| c[row].clone()).collect();
                    out.push(self.call_value(&function, call_args, Vec::new())?);
                }
                Value::list(out)
            }
            "filter" => {
                arity(name, &args, 2, 2)?;
                let mut out = Vec::new();
                for item in self.iterate(&args[1])? {
                    let keep = match &args[0] {
                        Value::None => item.truthy(),
                        function => self
                            .call_value(function, vec![item.clone()], Vec::new())?
                            .truthy(),
                    };
                    if keep {
                        out.push(item);
                    }
                }
                Value::list(out)
            }
            "any" => {
                arity(name, &args, 1, 1)?;
                Value::Bool(self.iterate(&args[0])?.iter().any(Value::truthy))
            }
            "all" => {
                arity(name, &args, 1, 1)?;
                Value::Bool(self.iterate(&args[0])?.iter().all(Value::truthy))
            }
            "round" => {
                arity(name, &args, 1, 2)?;
                let digits = match args.get(1) {
                    None | Some(Value::None) => None,
                    Some(value) => Some(int_arg(value)?),
                };
                match (args[0].number(), digits) {
                    (Some(Num::Int(i)), _) => Value::Int(i),
                    (Some(Num::Float(f)), None) => Value::Int(float_to_int(round_half_even(f))?),
                    (Some(Num::Float(f)), Some(digits)) => {
                        let digits = i32::try_from(digits.clamp(-300, 300)).unwrap_or_default();
                        let scale = 10f64.powi(digits);
                        Value::Float(round_half_even(f * scale) / scale)
                    }
                    (None, _) => {
                        return Err(Exception::type_error(format!(
                            "type {} doesn't define __round__ method",
                            args[0].type_name()
                        ))
                        .into())
                    }
                }
            }
            "divmod" => {
                arity(name, &args, 2, 2)?;
                let q = binary(BinOp::FloorDiv, &args[0], &args[1])?;
                let r = binary(BinOp::Mod, &args[0], &args[1])?;
                Value::tuple(vec![q, r])
            }
            "pow" => {
                arity(name, &args, 2, 2)?;
                binary(BinOp::Pow, &args[0], &args[1])?
            }
            "ord" => {
                arity(name, &args, 1, 1)?;
                let s = str_arg(&args[0], name)?;
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Value::Int(i64::from(u32::from(c))),
                    _ => {
                        return Err(Exception::type_error(format!(
                            "ord() expected a character, but string of length {} found",
                            s.chars().count()
                        ))
                        .into())
                    }
                }
            }
            "chr" => {
                arity(name, &args, 1, 1)?;
                let code = int_arg(&args[0])?;
                let c = u32::try_from(code)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| Exception::value_error("chr() arg not in range(0x110000)"))?;
                Value::str(c.to_string())
            }
            "isinstance" => {
                arity(name, &args, 2, 2)?;
                let matches_type = |class: &Value| match class {
                    Value::Builtin(type_name) => *type_name == args[0].type_name()
                        || (*type_name == "int" && matches!(args[0], Value::Bool(_))),
                    Value::ExceptionType(class) => {
                        matches!(&args[0], Value::Exception(e) if e.is_caught_by(class))
                    }
                    _ => false,
                };
                Value::Bool(match &args[1] {
                    Value::Tuple(classes) => classes.iter().any(matches_type),
                    class => matches_type(class),
                })
            }
            other => return Err(EvalError::unsupported(format!("builtin {other}")).into()),
        })
    }

    fn ordering_builtin(
        &mut self,
        name: &str,
        args: Vec<Value>,
        mut kwargs: Kwargs,
    ) -> Exec<Value> {
        let key = take_kwarg(&mut kwargs, "key").filter(|key| !matches!(key, Value::None));
        let reverse = take_kwarg(&mut kwargs, "reverse").is_some_and(|r| r.truthy());
        let default = take_kwarg(&mut kwargs, "default");
        reject_kwargs(name, &kwargs)?;

        let items = match (name, args.as_slice()) {
            ("sorted" | "min" | "max", [iterable]) => self.iterate(iterable)?,
            ("min" | "max", [_, _, ..]) => args.clone(),
            _ => {
                return Err(Exception::type_error(format!(
                    "{name}() takes an iterable argument"
                ))
                .into())
            }
        };

        if name == "sorted" {
            let sorted = self.sort_values(items, key.as_ref(), reverse)?;
            return Ok(Value::list(sorted));
        }

        let keys = self.keys_for(&items, key.as_ref())?;
        let mut best: Option<usize> = None;
        for (i, candidate) in keys.iter().enumerate() {
            let Some(current) = best else {
                best = Some(i);
                continue;
            };
            let order = candidate.py_cmp(&keys[current])?;
            let better = if name == "min" {
                order == Ordering::Less
            } else {
                order == Ordering::Greater
            };
            if better {
                best = Some(i);
            }
        }
        match best {
            Some(i) => Ok(items[i].clone()),
            None => default.ok_or_else(|| {
                Exception::value_error(format!("{name}() arg is an empty sequence")).into()
            }),
        }
    }

    fn keys_for(&mut self, items: &[Value], key: Option<&Value>) -> Exec<Vec<Value>> {
        match key {
            None => Ok(items.to_vec()),
            Some(function) => items
                .iter()
                .map(|item| self.call_value(function, vec![item.clone()], Vec::new()))
                .collect(),
        }
    }

    /// Stable sort by key; the first comparison failure is raised
    fn sort_values(
        &mut self,
        items: Vec<Value>,
        key: Option<&Value>,
        reverse: bool,
    ) -> Exec<Vec<Value>> {
        let keys = self.keys_for(&items, key)?;
        let mut order: Vec<usize> = (0..items.len()).collect();
        let mut failure: Option<Exception> = None;
        order.sort_by(|&a, &b| {
            let (first, second) = if reverse { (b, a) } else { (a, b) };
            match keys[first].py_cmp(&keys[second]) {
                Ok(ordering) => ordering,
                Err(exception) => {
                    failure.get_or_insert(exception);
                    Ordering::Equal
                }
            }
        });
        if let Some(exception) = failure {
            return Err(Signal::Raise(exception));
        }
        let charge = u64::try_from(items.len()).unwrap_or(u64::MAX);
        self.charge(charge)?;
        Ok(order.into_iter().map(|i| items[i].clone()).collect())
    }

    pub(crate) fn call_method(
        &mut self,
        receiver: &Value,
        name: &str,
        args: Vec<Value>,
        kwargs: Kwargs,
    ) -> Exec<Value> {
        self.charge(1)?;
        match receiver {
            Value::List(items) => self.list_method(items, name, args, kwargs),
            Value::Str(s) => {
                reject_kwargs(name, &kwargs)?;
                self.str_method(s, name, &args)
            }
            Value::Dict(entries) => {
                reject_kwargs(name, &kwargs)?;
                dict_method(entries, name, args)
            }
            Value::Set(items) => {
                reject_kwargs(name, &kwargs)?;
                set_method(items, name, &args)
            }
            Value::Tuple(items) => {
                reject_kwargs(name, &kwargs)?;
                sequence_query(items, name, &args, receiver)
            }
            other => Err(Exception::attribute_error(other.type_name(), name).into()),
        }
    }

    fn list_method(
        &mut self,
        items: &Rc<RefCell<Vec<Value>>>,
        name: &str,
        mut args: Vec<Value>,
        mut kwargs: Kwargs,
    ) -> Exec<Value> {
        if name == "sort" {
            let key = take_kwarg(&mut kwargs, "key").filter(|key| !matches!(key, Value::None));
            let reverse = take_kwarg(&mut kwargs, "reverse").is_some_and(|r| r.truthy());
            reject_kwargs(name, &kwargs)?;
            let current = items.borrow().clone();
            let sorted = self.sort_values(current, key.as_ref(), reverse)?;
            *items.borrow_mut() = sorted;
            return Ok(Value::None);
        }
        reject_kwargs(name, &kwargs)?;
        match name {
            "append" => {
                arity(name, &args, 1, 1)?;
                items.borrow_mut().push(args.remove(0));
            }
            "extend" => {
                arity(name, &args, 1, 1)?;
                let extra = self.iterate(&args[0])?;
                items.borrow_mut().extend(extra);
            }
            "insert" => {
                arity(name, &args, 2, 2)?;
                let len = i64::try_from(items.borrow().len()).unwrap_or(i64::MAX);
                let at = int_arg(&args[0])?;
                let at = if at < 0 { (at + len).max(0) } else { at.min(len) };
                let at = usize::try_from(at).unwrap_or_default();
                items.borrow_mut().insert(at, args.remove(1));
            }
            "pop" => {
                arity(name, &args, 0, 1)?;
                let len = items.borrow().len();
                if len == 0 {
                    return Err(Exception::index_error("pop from empty list").into());
                }
                let at = match args.first() {
                    Some(index) => normalize_index(index, len, "pop index out of range")?,
                    None => len - 1,
                };
                return Ok(items.borrow_mut().remove(at));
            }
            "remove" => {
                arity(name, &args, 1, 1)?;
                let at = items
                    .borrow()
                    .iter()
                    .position(|item| item.py_eq(&args[0]))
                    .ok_or_else(|| Exception::value_error("list.remove(x): x not in list"))?;
                items.borrow_mut().remove(at);
            }
            "clear" => items.borrow_mut().clear(),
            "reverse" => items.borrow_mut().reverse(),
            "copy" => return Ok(Value::list(items.borrow().clone())),
            "index" | "count" => {
                let snapshot: Vec<Value> = items.borrow().clone();
                return sequence_query(&snapshot, name, &args, &Value::List(Rc::clone(items)));
            }
            _ => return Err(Exception::attribute_error("list", name).into()),
        }
        Ok(Value::None)
    }

    #[allow(clippy::too_many_lines)]
    fn str_method(&mut self, s: &str, name: &str, args: &[Value]) -> Exec<Value> {
        let text = |i: usize| -> Result<&str, Exception> {
            args.get(i)
                .ok_or_else(|| Exception::type_error(format!("{name}() missing argument")))
                .and_then(|value| str_arg(value, name))
        };
        let chars_arg = |args: &[Value]| -> Result<Option<Vec<char>>, Exception> {
            match args.first() {
                None | Some(Value::None) => Ok(None),
                Some(value) => Ok(Some(str_arg(value, name)?.chars().collect())),
            }
        };
        Ok(match name {
            "upper" => Value::str(s.to_uppercase()),
            "lower" => Value::str(s.to_lowercase()),
            "strip" | "lstrip" | "rstrip" => {
                let strip = chars_arg(args)?;
                let matches = |c: char| match &strip {
                    Some(set) => set.contains(&c),
                    None => c.is_whitespace(),
                };
                Value::str(match name {
                    "strip" => s.trim_matches(matches),
                    "lstrip" => s.trim_start_matches(matches),
                    _ => s.trim_end_matches(matches),
                })
            }
            "split" => {
                let parts: Vec<Value> = match args.first() {
                    None | Some(Value::None) => s.split_whitespace().map(Value::str).collect(),
                    Some(sep) => {
                        let sep = str_arg(sep, name)?;
                        if sep.is_empty() {
                            return Err(Exception::value_error("empty separator").into());
                        }
                        s.split(sep).map(Value::str).collect()
                    }
                };
                Value::list(parts)
            }
            "join" => {
                arity(name, args, 1, 1)?;
                let mut pieces = Vec::new();
                for item in self.iterate(&args[0])? {
                    match item {
                        Value::Str(piece) => pieces.push(piece),
                        other => {
                            return Err(Exception::type_error(format!(
                                "sequence item: expected str instance, {} found",
                                other.type_name()
                            ))
                            .into())
                        }
                    }
                }
                let joined = pieces.iter().map(|piece| &**piece).collect::<Vec<&str>>().join(s);
                self.charge(u64::try_from(joined.len() / 64).unwrap_or(u64::MAX))?;
                Value::str(joined)
            }
            "startswith" | "endswith" => {
                let probe = |prefix: &str| {
                    if name == "startswith" {
                        s.starts_with(prefix)
                    } else {
                        s.ends_with(prefix)
                    }
                };
                match args.first() {
                    Some(Value::Tuple(options)) => Value::Bool(
                        options
                            .iter()
                            .map(|option| str_arg(option, name))
                            .collect::<Result<Vec<_>, _>>()?
                            .into_iter()
                            .any(probe),
                    ),
                    _ => Value::Bool(probe(text(0)?)),
                }
            }
            "replace" => {
                arity(name, args, 2, 2)?;
                let replaced = s.replace(text(0)?, text(1)?);
                if replaced.len() > 1_000_000 {
                    return Err(EvalError::unsupported("oversized string").into());
                }
                Value::str(replaced)
            }
            "find" => {
                arity(name, args, 1, 1)?;
                let needle = text(0)?;
                Value::Int(s.find(needle).map_or(-1, |byte| {
                    i64::try_from(s[..byte].chars().count()).unwrap_or(i64::MAX)
                }))
            }
            "count" => {
                arity(name, args, 1, 1)?;
                let needle = text(0)?;
                let count = if needle.is_empty() {
                    s.chars().count() + 1
                } else {
                    s.matches(needle).count()
                };
                Value::Int(i64::try_from(count).unwrap_or(i64::MAX))
            }
            "isdigit" => Value::Bool(!s.is_empty() && s.chars().all(|c| c.is_ascii_digit())),
            "isalpha" => Value::Bool(!s.is_empty() && s.chars().all(char::is_alphabetic)),
            "isalnum" => Value::Bool(!s.is_empty() && s.chars().all(char::is_alphanumeric)),
            "isspace" => Value::Bool(!s.is_empty() && s.chars().all(char::is_whitespace)),
            "isupper" | "islower" => {
                let cased: Vec<char> = s.chars().filter(|c| c.is_alphabetic()).collect();
                Value::Bool(
                    !cased.is_empty()
                        && cased.iter().all(|c| {
                            if name == "isupper" {
                                c.is_uppercase()
                            } else {
                                c.is_lowercase()
                            }
                        }),
                )
            }
            "capitalize" => {
                let mut chars = s.chars();
                Value::str(match chars.next() {
                    Some(first) => {
                        first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                    }
                    None => String::new(),
                })
            }
            "title" => {
                let mut out = String::with_capacity(s.len());
                let mut boundary = true;
                for c in s.chars() {
                    if boundary {
                        out.extend(c.to_uppercase());
                    } else {
                        out.extend(c.to_lowercase());
                    }
                    boundary = !c.is_alphabetic();
                }
                Value::str(out)
            }
            "format" => return Err(EvalError::unsupported("str.format").into()),
            _ => return Err(Exception::attribute_error("str", name).into()),
        })
    }
}

fn dict_method(
    entries: &Rc<RefCell<Vec<(Value, Value)>>>,
    name: &str,
    args: Vec<Value>,
) -> Exec<Value> {
    let find = |key: &Value| entries.borrow().iter().position(|(k, _)| k.py_eq(key));
    Ok(match name {
        "get" => {
            arity(name, &args, 1, 2)?;
            match find(&args[0]) {
                Some(at) => entries.borrow()[at].1.clone(),
                None => args.get(1).cloned().unwrap_or(Value::None),
            }
        }
        "keys" => Value::list(entries.borrow().iter().map(|(k, _)| k.clone()).collect()),
        "values" => Value::list(entries.borrow().iter().map(|(_, v)| v.clone()).collect()),
        "items" => Value::list(
            entries
                .borrow()
                .iter()
                .map(|(k, v)| Value::tuple(vec![k.clone(), v.clone()]))
                .collect(),
        ),
        "setdefault" => {
            arity(name, &args, 1, 2)?;
            match find(&args[0]) {
                Some(at) => entries.borrow()[at].1.clone(),
                None => {
                    let default = args.get(1).cloned().unwrap_or(Value::None);
                    dict_insert(&mut entries.borrow_mut(), args[0].clone(), default.clone())?;
                    default
                }
            }
        }
        "pop" => {
            arity(name, &args, 1, 2)?;
            match find(&args[0]) {
                Some(at) => entries.borrow_mut().remove(at).1,
                None => match args.get(1) {
                    Some(default) => default.clone(),
                    None => return Err(Exception::key_error(args[0].repr()).into()),
                },
            }
        }
        "update" => {
            arity(name, &args, 1, 1)?;
            let Value::Dict(other) = &args[0] else {
                return Err(EvalError::unsupported("dict.update with non-dict").into());
            };
            let additions = other.borrow().clone();
            for (key, value) in additions {
                dict_insert(&mut entries.borrow_mut(), key, value)?;
            }
            Value::None
        }
        "copy" => Value::Dict(shared(entries.borrow().clone())),
        "clear" => {
            entries.borrow_mut().clear();
            Value::None
        }
        _ => return Err(Exception::attribute_error("dict", name).into()),
    })
}

fn set_method(items: &Rc<RefCell<Vec<Value>>>, name: &str, args: &[Value]) -> Exec<Value> {
    match name {
        "add" | "discard" | "remove" => {
            arity(name, args, 1, 1)?;
            let item = &args[0];
            if !item.is_hashable() {
                return Err(Exception::type_error(format!(
                    "unhashable type: '{}'",
                    item.type_name()
                ))
                .into());
            }
            let at = items.borrow().iter().position(|member| member.py_eq(item));
            match (name, at) {
                ("add", None) => items.borrow_mut().push(item.clone()),
                ("discard" | "remove", Some(at)) => {
                    items.borrow_mut().remove(at);
                }
                ("remove", None) => return Err(Exception::key_error(item.repr()).into()),
                _ => {}
            }
            Ok(Value::None)
        }
        "copy" => Ok(Value::Set(shared(items.borrow().clone()))),
        _ => Err(Exception::attribute_error("set", name).into()),
    }
}

fn sequence_query(items: &[Value], name: &str, args: &[Value], receiver: &Value) -> Exec<Value> {
    match name {
        "index" => {
            arity(name, args, 1, 1)?;
            items
                .iter()
                .position(|item| item.py_eq(&args[0]))
                .map(|at| Value::Int(i64::try_from(at).unwrap_or(i64::MAX)))
                .ok_or_else(|| {
                    Exception::value_error(format!(
                        "{}.index(x): x not in {}",
                        receiver.type_name(),
                        receiver.type_name()
                    ))
                    .into()
                })
        }
        "count" => {
            arity(name, args, 1, 1)?;
            let count = items.iter().filter(|item| item.py_eq(&args[0])).count();
            Ok(Value::Int(i64::try_from(count).unwrap_or(i64::MAX)))
        }
        _ => Err(Exception::attribute_error(receiver.type_name(), name).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::{Budget, Outcome};
    use canonize_syntax::parse_module;

    fn eval(body: &str) -> String {
        let source = format!("def f():\n    return {body}\n");
        let module = parse_module(&source).unwrap();
        let mut interpreter = Interpreter::new(Budget::default());
        interpreter.load(&module).unwrap();
        match interpreter.call("f", vec![]).unwrap() {
            Outcome::Returned(value) => value.repr(),
            Outcome::Raised(exception) => format!("raised {}", exception.class),
        }
    }

    #[test]
    fn sequence_builtins() {
        assert_eq!(eval("len([1, 2, 3])"), "3");
        assert_eq!(eval("sum([1, 2, 3], 10)"), "16");
        assert_eq!(eval("sorted([3, 1, 2], reverse=True)"), "[3, 2, 1]");
        assert_eq!(eval("sorted(['bb', 'a', 'ccc'], key=len)"), "['a', 'bb', 'ccc']");
        assert_eq!(eval("max([1, 5, 3])"), "5");
        assert_eq!(eval("min([], default=0)"), "0");
        assert_eq!(eval("list(enumerate('ab', 1))"), "[(1, 'a'), (2, 'b')]");
        assert_eq!(eval("list(zip([1, 2], 'xyz'))"), "[(1, 'x'), (2, 'y')]");
        assert_eq!(eval("list(reversed(range(3)))"), "[2, 1, 0]");
        assert_eq!(eval("any([0, '', 3])"), "True");
        assert_eq!(eval("all([])"), "True");
    }

    #[test]
    fn sort_is_stable_under_reverse() {
        assert_eq!(
            eval("sorted([(1, 'a'), (0, 'b'), (1, 'c')], key=lambda p: p[0], reverse=True)"),
            "[(1, 'a'), (1, 'c'), (0, 'b')]"
        );
    }

    #[test]
    fn numeric_conversions() {
        assert_eq!(eval("int('42')"), "42");
        assert_eq!(eval("int(-3.7)"), "-3");
        assert_eq!(eval("round(2.5)"), "2");
        assert_eq!(eval("round(3.5)"), "4");
        assert_eq!(eval("divmod(-7, 2)"), "(-4, 1)");
        assert_eq!(eval("int('x')"), "raised ValueError");
        assert_eq!(eval("max([])"), "raised ValueError");
    }

    #[test]
    fn string_methods() {
        assert_eq!(eval("'  Hi  '.strip().lower()"), "'hi'");
        assert_eq!(eval("'a,b,,c'.split(',')"), "['a', 'b', '', 'c']");
        assert_eq!(eval("' a  b '.split()"), "['a', 'b']");
        assert_eq!(eval("'-'.join(['x', 'y'])"), "'x-y'");
        assert_eq!(eval("'hello'.find('l')"), "2");
        assert_eq!(eval("'abc'.startswith(('x', 'a'))"), "True");
        assert_eq!(eval("'hello world'.title()"), "'Hello World'");
        assert_eq!(eval("'abc'.nope()"), "raised AttributeError");
    }

    #[test]
    fn container_methods() {
        assert_eq!(eval("{'a': 1}.get('b', 0)"), "0");
        assert_eq!(eval("{'a': 1}['b']"), "raised KeyError");
        assert_eq!(eval("[1, 2, 3].pop()"), "3");
        assert_eq!(eval("[].pop()"), "raised IndexError");
        assert_eq!(eval("(1, 2, 1).count(1)"), "2");
        assert_eq!(eval("isinstance(True, int)"), "True");
    }

    #[test]
    fn unknown_names_resolve_as_expected() {
        assert!(builtin_value("len").is_some());
        assert!(matches!(builtin_value("ValueError"), Some(Value::ExceptionType("ValueError"))));
        assert!(builtin_value("open").is_none());
    }
}
