//! Operator semantics

use std::rc::Rc;

use canonize_syntax::{BinOp, CmpOp, UnaryOp};

use crate::error::{EvalError, Exception};
use crate::interp::{Exec, Signal};
use crate::value::{range_len, Num, Value};

/// Longest sequence a repetition may build
const MAX_REPEAT: usize = 100_000;

fn overflow() -> Signal {
    EvalError::unsupported("integer overflow").into()
}

fn unsupported_operands(op: &str, left: &Value, right: &Value) -> Signal {
    Exception::type_error(format!(
        "unsupported operand type(s) for {op}: '{}' and '{}'",
        left.type_name(),
        right.type_name()
    ))
    .into()
}

fn floor_div(a: i64, b: i64) -> Option<i64> {
    let q = a.checked_div(b)?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        q.checked_sub(1)
    } else {
        Some(q)
    }
}

fn floor_mod(a: i64, b: i64) -> Option<i64> {
    let r = a.checked_rem(b)?;
    if r != 0 && ((r < 0) != (b < 0)) {
        r.checked_add(b)
    } else {
        Some(r)
    }
}

fn int_op(op: BinOp, a: i64, b: i64) -> Exec<Value> {
    let checked = |v: Option<i64>| v.map(Value::Int).ok_or_else(overflow);
    match op {
        BinOp::Add => checked(a.checked_add(b)),
        BinOp::Sub => checked(a.checked_sub(b)),
        BinOp::Mul => checked(a.checked_mul(b)),
        BinOp::Div => {
            if b == 0 {
                return Err(Exception::zero_division().into());
            }
            Ok(Value::Float(Num::Int(a).as_f64() / Num::Int(b).as_f64()))
        }
        BinOp::FloorDiv | BinOp::Mod if b == 0 => Err(Exception::zero_division().into()),
        BinOp::FloorDiv => checked(floor_div(a, b)),
        BinOp::Mod => checked(floor_mod(a, b)),
        BinOp::Pow => match u32::try_from(b) {
            Ok(exp) => checked(a.checked_pow(exp)),
            Err(_) if b < 0 => {
                if a == 0 {
                    return Err(Exception::zero_division().into());
                }
                Ok(Value::Float(Num::Int(a).as_f64().powf(Num::Int(b).as_f64())))
            }
            Err(_) => Err(overflow()),
        },
        BinOp::LShift | BinOp::RShift if b < 0 => {
            Err(Exception::value_error("negative shift count").into())
        }
        BinOp::LShift => {
            let shift = u32::try_from(b).map_err(|_| overflow())?;
            let shifted = a.checked_shl(shift).ok_or_else(overflow)?;
            if shifted >> shift == a {
                Ok(Value::Int(shifted))
            } else {
                Err(overflow())
            }
        }
        BinOp::RShift => Ok(Value::Int(a >> b.min(63))),
        BinOp::BitOr => Ok(Value::Int(a | b)),
        BinOp::BitXor => Ok(Value::Int(a ^ b)),
        BinOp::BitAnd => Ok(Value::Int(a & b)),
        BinOp::MatMul => Err(Exception::type_error("unsupported operand type(s) for @").into()),
    }
}

fn float_op(op: BinOp, a: f64, b: f64) -> Exec<Value> {
    let zero_guard = || -> Exec<()> {
        if b == 0.0 {
            Err(Exception::new("ZeroDivisionError", "float division by zero").into())
        } else {
            Ok(())
        }
    };
    let value = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => {
            zero_guard()?;
            a / b
        }
        BinOp::FloorDiv => {
            zero_guard()?;
            (a / b).floor()
        }
        BinOp::Mod => {
            zero_guard()?;
            a - b * (a / b).floor()
        }
        BinOp::Pow => a.powf(b),
        _ => {
            return Err(unsupported_operands(
                op.symbol(),
                &Value::Float(a),
                &Value::Float(b),
            ))
        }
    };
    Ok(Value::Float(value))
}

fn repeat<T: Clone>(items: &[T], times: i64) -> Exec<Vec<T>> {
    let times = usize::try_from(times.max(0)).map_err(|_| overflow())?;
    if items.len().saturating_mul(times) > MAX_REPEAT {
        return Err(EvalError::unsupported("oversized repetition").into());
    }
    Ok(items.iter().cloned().cycle().take(items.len() * times).collect())
}

/// `left op right`
pub(crate) fn binary(op: BinOp, left: &Value, right: &Value) -> Exec<Value> {
    if let (Some(a), Some(b)) = (left.number(), right.number()) {
        return match (a, b) {
            (Num::Int(a), Num::Int(b)) => int_op(op, a, b),
            (a, b) => float_op(op, a.as_f64(), b.as_f64()),
        };
    }
    match (op, left, right) {
        (BinOp::Add, Value::Str(a), Value::Str(b)) => Ok(Value::str(format!("{a}{b}"))),
        (BinOp::Add, Value::List(a), Value::List(b)) => {
            let mut items = a.borrow().clone();
            items.extend(b.borrow().iter().cloned());
            Ok(Value::list(items))
        }
        (BinOp::Add, Value::Tuple(a), Value::Tuple(b)) => {
            Ok(Value::tuple(a.iter().chain(b.iter()).cloned().collect()))
        }
        (BinOp::Mul, Value::Str(s), n) | (BinOp::Mul, n, Value::Str(s)) if n.number().is_some() => {
            let Some(Num::Int(times)) = n.number() else {
                return Err(unsupported_operands("*", left, right));
            };
            let chars: Vec<char> = s.chars().collect();
            Ok(Value::str(repeat(&chars, times)?.into_iter().collect::<String>()))
        }
        (BinOp::Mul, Value::List(items), n) | (BinOp::Mul, n, Value::List(items))
            if n.number().is_some() =>
        {
            let Some(Num::Int(times)) = n.number() else {
                return Err(unsupported_operands("*", left, right));
            };
            let items = items.borrow().clone();
            Ok(Value::list(repeat(&items, times)?))
        }
        (BinOp::Mul, Value::Tuple(items), n) | (BinOp::Mul, n, Value::Tuple(items))
            if n.number().is_some() =>
        {
            let Some(Num::Int(times)) = n.number() else {
                return Err(unsupported_operands("*", left, right));
            };
            Ok(Value::tuple(repeat(items, times)?))
        }
        (BinOp::Mod, Value::Str(_), _) => Err(EvalError::unsupported("%-formatting").into()),
        (BinOp::Sub, Value::Set(a), Value::Set(b)) => {
            let b = b.borrow();
            let items = a
                .borrow()
                .iter()
                .filter(|x| !b.iter().any(|y| x.py_eq(y)))
                .cloned()
                .collect();
            Ok(Value::Set(crate::value::shared(items)))
        }
        _ => Err(unsupported_operands(op.symbol(), left, right)),
    }
}

/// `op operand`
pub(crate) fn unary(op: UnaryOp, operand: &Value) -> Exec<Value> {
    if op == UnaryOp::Not {
        return Ok(Value::Bool(!operand.truthy()));
    }
    let bad = || -> Signal {
        Exception::type_error(format!(
            "bad operand type for unary {}: '{}'",
            op.symbol(),
            operand.type_name()
        ))
        .into()
    };
    match (op, operand.number().ok_or_else(bad)?) {
        (UnaryOp::Neg, Num::Int(i)) => i.checked_neg().map(Value::Int).ok_or_else(overflow),
        (UnaryOp::Neg, Num::Float(f)) => Ok(Value::Float(-f)),
        (UnaryOp::Pos, Num::Int(i)) => Ok(Value::Int(i)),
        (UnaryOp::Pos, Num::Float(f)) => Ok(Value::Float(f)),
        (UnaryOp::Invert, Num::Int(i)) => Ok(Value::Int(!i)),
        _ => Err(bad()),
    }
}

/// `item in container`
pub(crate) fn contains(container: &Value, item: &Value) -> Result<bool, Exception> {
    match container {
        Value::Str(haystack) => match item {
            Value::Str(needle) => Ok(haystack.contains(&**needle)),
            other => Err(Exception::type_error(format!(
                "'in <string>' requires string as left operand, not {}",
                other.type_name()
            ))),
        },
        Value::List(items) | Value::Set(items) => Ok(items.borrow().iter().any(|x| x.py_eq(item))),
        Value::Tuple(items) => Ok(items.iter().any(|x| x.py_eq(item))),
        Value::Dict(entries) => Ok(entries.borrow().iter().any(|(k, _)| k.py_eq(item))),
        Value::Range { start, stop, step } => Ok(match item.number() {
            Some(Num::Int(i)) => {
                let offset = i128::from(i) - i128::from(*start);
                let in_bounds = if *step > 0 {
                    i >= *start && i < *stop
                } else {
                    i <= *start && i > *stop
                };
                in_bounds && offset % i128::from(*step) == 0
            }
            _ => false,
        } && range_len(*start, *stop, *step) > 0),
        other => Err(Exception::type_error(format!(
            "argument of type '{}' is not iterable",
            other.type_name()
        ))),
    }
}

fn identical(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::None, Value::None) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::List(a), Value::List(b))
        | (Value::Set(a), Value::Set(b)) => Rc::ptr_eq(a, b),
        (Value::Dict(a), Value::Dict(b)) => Rc::ptr_eq(a, b),
        (Value::Tuple(a), Value::Tuple(b)) => Rc::ptr_eq(a, b),
        (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
        (Value::Builtin(a), Value::Builtin(b))
        | (Value::ExceptionType(a), Value::ExceptionType(b)) => a == b,
        (Value::Exception(a), Value::Exception(b)) => Rc::ptr_eq(a, b),
        _ => false,
    }
}

/// One link of a comparison chain
pub(crate) fn compare(op: CmpOp, left: &Value, right: &Value) -> Exec<bool> {
    Ok(match op {
        CmpOp::Eq => left.py_eq(right),
        CmpOp::NotEq => !left.py_eq(right),
        CmpOp::Lt => left.py_cmp(right)?.is_lt(),
        CmpOp::LtE => left.py_cmp(right)?.is_le(),
        CmpOp::Gt => left.py_cmp(right)?.is_gt(),
        CmpOp::GtE => left.py_cmp(right)?.is_ge(),
        CmpOp::Is => identical(left, right),
        CmpOp::IsNot => !identical(left, right),
        CmpOp::In => contains(right, left)?,
        CmpOp::NotIn => !contains(right, left)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn int(op: BinOp, a: i64, b: i64) -> Value {
        match binary(op, &Value::Int(a), &Value::Int(b)) {
            Ok(v) => v,
            Err(_) => panic!("{a} {} {b} failed", op.symbol()),
        }
    }

    #[test]
    fn integer_division_floors_toward_negative_infinity() {
        assert!(int(BinOp::FloorDiv, -7, 2).same_as(&Value::Int(-4)));
        assert!(int(BinOp::FloorDiv, 7, -2).same_as(&Value::Int(-4)));
        assert!(int(BinOp::Mod, -7, 2).same_as(&Value::Int(1)));
        assert!(int(BinOp::Mod, 7, -2).same_as(&Value::Int(-1)));
        assert!(int(BinOp::Div, 7, 2).same_as(&Value::Float(3.5)));
    }

    #[test]
    fn division_by_zero_raises() {
        let Err(Signal::Raise(exc)) = binary(BinOp::FloorDiv, &Value::Int(1), &Value::Int(0)) else {
            panic!("expected a raise");
        };
        assert_eq!(exc.class, "ZeroDivisionError");
    }

    #[test]
    fn overflow_halts_instead_of_wrapping() {
        let result = binary(BinOp::Pow, &Value::Int(10), &Value::Int(40));
        assert!(matches!(result, Err(Signal::Halt(EvalError::Unsupported(_)))));
    }

    #[test]
    fn sequence_operators() {
        let joined = binary(BinOp::Add, &Value::str("ab"), &Value::str("c")).ok().unwrap();
        assert_eq!(joined.to_str(), "abc");
        let repeated = binary(BinOp::Mul, &Value::Int(2), &Value::str("ab")).ok().unwrap();
        assert_eq!(repeated.to_str(), "abab");
        assert!(matches!(
            binary(BinOp::Add, &Value::Int(1), &Value::str("a")),
            Err(Signal::Raise(_))
        ));
    }

    #[test]
    fn membership_and_identity() {
        let xs = Value::list(vec![Value::Int(1), Value::Int(2)]);
        assert!(compare(CmpOp::In, &Value::Float(2.0), &xs).ok().unwrap());
        assert!(compare(CmpOp::Is, &xs, &xs.clone()).ok().unwrap());
        assert!(!compare(CmpOp::Is, &xs, &Value::list(vec![Value::Int(1), Value::Int(2)]))
            .ok()
            .unwrap());
        assert!(compare(CmpOp::In, &Value::Int(4), &Value::Range { start: 0, stop: 10, step: 2 })
            .ok()
            .unwrap());
    }

    #[test]
    fn list_and_tuple_repetition() {
        let xs = Value::list(vec![Value::Int(1), Value::str("a")]);
        let tripled = binary(BinOp::Mul, &xs, &Value::Int(3)).ok().unwrap();
        assert_eq!(tripled.repr(), "[1, 'a', 1, 'a', 1, 'a']");
        let pair = Value::tuple(vec![Value::Int(0)]);
        let empty = binary(BinOp::Mul, &Value::Int(-2), &pair).ok().unwrap();
        assert_eq!(empty.repr(), "()");
    }
}
