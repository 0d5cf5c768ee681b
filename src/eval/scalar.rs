//! Scalar semantics shared by both interpreters.
//!
//! Nulls propagate through arithmetic and comparisons, AND/OR use
//! three-valued logic, and only `true` passes a filter.

use std::cmp::Ordering;

use crate::error::{Error, Result};
use crate::provider::{AggregateKind, BinaryOp, Function, UnaryOp};
use crate::value::Value;

pub fn is_true(value: &Value) -> bool {
    matches!(value, Value::Bool(true))
}

pub fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value> {
    match op {
        BinaryOp::And => Ok(match (left.as_bool(), right.as_bool()) {
            (Some(false), _) | (_, Some(false)) => Value::Bool(false),
            (Some(true), Some(true)) => Value::Bool(true),
            _ => Value::Null,
        }),
        BinaryOp::Or => Ok(match (left.as_bool(), right.as_bool()) {
            (Some(true), _) | (_, Some(true)) => Value::Bool(true),
            (Some(false), Some(false)) => Value::Bool(false),
            _ => Value::Null,
        }),
        _ if left.is_null() || right.is_null() => Ok(Value::Null),
        op if op.is_comparison() => {
            let ord = left.total_cmp(right);
            Ok(Value::Bool(match op {
                BinaryOp::Eq => ord == Ordering::Equal,
                BinaryOp::NotEq => ord != Ordering::Equal,
                BinaryOp::Lt => ord == Ordering::Less,
                BinaryOp::LtEq => ord != Ordering::Greater,
                BinaryOp::Gt => ord == Ordering::Greater,
                _ => ord != Ordering::Less,
            }))
        }
        BinaryOp::Concat => match (left, right) {
            (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),
            _ => Err(type_error(op, left, right)),
        },
        BinaryOp::Like => match (left, right) {
            (Value::String(text), Value::String(pattern)) => {
                Ok(Value::Bool(like(text, pattern)))
            }
            _ => Err(type_error(op, left, right)),
        },
        _ => arithmetic(op, left, right),
    }
}

fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> Result<Value> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => {
            let (a, b) = (*a, *b);
            let result = match op {
                BinaryOp::Add => a.checked_add(b),
                BinaryOp::Subtract => a.checked_sub(b),
                BinaryOp::Multiply => a.checked_mul(b),
                BinaryOp::Divide | BinaryOp::Modulo if b == 0 => {
                    return Err(Error::Evaluation("division by zero".into()))
                }
                BinaryOp::Divide => a.checked_div(b),
                BinaryOp::Modulo => a.checked_rem(b),
                _ => return Err(type_error(op, left, right)),
            };
            result
                .map(Value::Int)
                .ok_or_else(|| Error::Evaluation(format!("integer overflow in {:?}", op)))
        }
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            let (a, b) = (as_f64(left), as_f64(right));
            let result = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Subtract => a - b,
                BinaryOp::Multiply => a * b,
                BinaryOp::Divide => a / b,
                BinaryOp::Modulo => a % b,
                _ => return Err(type_error(op, left, right)),
            };
            Ok(Value::Float(result))
        }
        _ => Err(type_error(op, left, right)),
    }
}

fn as_f64(value: &Value) -> f64 {
    match value {
        Value::Int(i) => *i as f64,
        Value::Float(f) => *f,
        _ => f64::NAN,
    }
}

fn type_error(op: BinaryOp, left: &Value, right: &Value) -> Error {
    Error::Evaluation(format!("cannot apply {:?} to {} and {}", op, left, right))
}

pub fn unary(op: UnaryOp, operand: &Value) -> Result<Value> {
    match (op, operand) {
        (_, Value::Null) => Ok(Value::Null),
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOp::Negate, Value::Int(i)) => i
            .checked_neg()
            .map(Value::Int)
            .ok_or_else(|| Error::Evaluation("integer overflow in negation".into())),
        (UnaryOp::Negate, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnaryOp::Negate, Value::Interval(d)) => Ok(Value::Interval(-*d)),
        (op, v) => Err(Error::Evaluation(format!("cannot apply {:?} to {}", op, v))),
    }
}

pub fn function(func: Function, args: &[Value]) -> Result<Value> {
    let arg = |i: usize| {
        args.get(i).ok_or_else(|| {
            Error::Evaluation(format!("{:?} expects at least {} arguments", func, i + 1))
        })
    };
    if func == Function::Coalesce {
        return Ok(args
            .iter()
            .find(|v| !v.is_null())
            .cloned()
            .unwrap_or(Value::Null));
    }
    if args.iter().any(Value::is_null) {
        return Ok(Value::Null);
    }
    let mismatch = || Error::Evaluation(format!("bad arguments to {:?}: {:?}", func, args));
    match func {
        Function::Upper => match arg(0)? {
            Value::String(s) => Ok(Value::String(s.to_uppercase())),
            _ => Err(mismatch()),
        },
        Function::Lower => match arg(0)? {
            Value::String(s) => Ok(Value::String(s.to_lowercase())),
            _ => Err(mismatch()),
        },
        Function::Length => match arg(0)? {
            Value::String(s) => Ok(Value::Int(s.chars().count() as i64)),
            _ => Err(mismatch()),
        },
        Function::Abs => match arg(0)? {
            Value::Int(i) => Ok(Value::Int(i.abs())),
            Value::Float(f) => Ok(Value::Float(f.abs())),
            _ => Err(mismatch()),
        },
        Function::Substring => match (arg(0)?, arg(1)?, arg(2)?) {
            (Value::String(s), Value::Int(start), Value::Int(len)) => {
                let skip = (start - 1).max(0) as usize;
                // characters before position 1 still count against the length
                let take = (len + (start - 1).min(0)).max(0) as usize;
                Ok(Value::String(s.chars().skip(skip).take(take).collect()))
            }
            _ => Err(mismatch()),
        },
        Function::AddInterval => match (arg(0)?, arg(1)?) {
            (Value::DateTime(t), Value::Interval(d)) => Ok(Value::DateTime(*t + *d)),
            (Value::Date(t), Value::Interval(d)) => t
                .and_hms_opt(0, 0, 0)
                .map(|midnight| Value::DateTime(midnight + *d))
                .ok_or_else(mismatch),
            _ => Err(mismatch()),
        },
        Function::Coalesce => Ok(Value::Null),
    }
}

/// SQL `LIKE` with `%` and `_`, case-sensitive, no escape character.
pub fn like(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    // matched[j]: pattern[..j] matches the text consumed so far
    let mut matched = vec![false; pattern.len() + 1];
    matched[0] = true;
    for j in 0..pattern.len() {
        matched[j + 1] = matched[j] && pattern[j] == '%';
    }
    for &c in &text {
        let mut next = vec![false; pattern.len() + 1];
        for j in 0..pattern.len() {
            next[j + 1] = match pattern[j] {
                '%' => next[j] || matched[j + 1],
                '_' => matched[j],
                p => matched[j] && p == c,
            };
        }
        matched = next;
    }
    matched[pattern.len()]
}

/// Every word of `query` occurs in one of `columns`, ignoring case.
pub fn full_text(columns: &[Value], query: &Value) -> Value {
    let Value::String(query) = query else {
        return Value::Null;
    };
    let haystack: Vec<String> = columns
        .iter()
        .filter_map(|v| match v {
            Value::String(s) => Some(s.to_lowercase()),
            _ => None,
        })
        .collect();
    let found = query
        .split_whitespace()
        .all(|word| haystack.iter().any(|h| h.contains(&word.to_lowercase())));
    Value::Bool(found)
}

/// Folds one aggregate over the values of its argument. `COUNT(*)` is
/// handled by the callers, which know the group size.
pub fn aggregate(kind: AggregateKind, values: impl IntoIterator<Item = Value>) -> Result<Value> {
    let values: Vec<Value> = values.into_iter().filter(|v| !v.is_null()).collect();
    match kind {
        AggregateKind::Count => Ok(Value::Int(values.len() as i64)),
        AggregateKind::Min => Ok(values.into_iter().min().unwrap_or(Value::Null)),
        AggregateKind::Max => Ok(values.into_iter().max().unwrap_or(Value::Null)),
        AggregateKind::Sum => {
            let mut total: Option<Value> = None;
            for v in values {
                total = Some(match total {
                    None => v,
                    Some(t) => binary(BinaryOp::Add, &t, &v)?,
                });
            }
            Ok(total.unwrap_or(Value::Null))
        }
        AggregateKind::Avg => {
            if values.is_empty() {
                return Ok(Value::Null);
            }
            let mut sum = 0.0;
            for v in &values {
                match v {
                    Value::Int(_) | Value::Float(_) => sum += as_f64(v),
                    other => {
                        return Err(Error::Evaluation(format!("cannot average {}", other)))
                    }
                }
            }
            Ok(Value::Float(sum / values.len() as f64))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_valued_logic() {
        let t = Value::Bool(true);
        let f = Value::Bool(false);
        assert_eq!(binary(BinaryOp::And, &Value::Null, &f).unwrap(), f);
        assert!(binary(BinaryOp::And, &Value::Null, &t).unwrap().is_null());
        assert_eq!(binary(BinaryOp::Or, &Value::Null, &t).unwrap(), t);
        assert!(binary(BinaryOp::Eq, &Value::Null, &Value::Null).unwrap().is_null());
    }

    #[test]
    fn test_like_wildcards() {
        assert!(like("Smith", "S%"));
        assert!(like("Smith", "_mi%h"));
        assert!(!like("Smith", "s%"));
        assert!(like("", "%"));
        assert!(!like("ab", "a"));
    }

    #[test]
    fn test_integer_division_by_zero() {
        assert!(binary(BinaryOp::Divide, &Value::Int(1), &Value::Int(0)).is_err());
        assert_eq!(
            binary(BinaryOp::Divide, &Value::Int(7), &Value::Int(2)).unwrap(),
            Value::Int(3)
        );
    }

    #[test]
    fn test_aggregates_over_empty_input() {
        assert!(aggregate(AggregateKind::Sum, vec![]).unwrap().is_null());
        assert!(aggregate(AggregateKind::Avg, vec![Value::Null]).unwrap().is_null());
        assert_eq!(
            aggregate(AggregateKind::Count, vec![Value::Null, Value::Int(1)]).unwrap(),
            Value::Int(1)
        );
        assert_eq!(
            aggregate(AggregateKind::Avg, vec![Value::Int(1), Value::Int(2)]).unwrap(),
            Value::Float(1.5)
        );
    }

    #[test]
    fn test_substring_is_one_based() {
        let s = Value::from("abcdef");
        assert_eq!(
            function(Function::Substring, &[s.clone(), Value::Int(2), Value::Int(3)]).unwrap(),
            Value::from("bcd")
        );
        assert_eq!(
            function(Function::Substring, &[s, Value::Int(0), Value::Int(2)]).unwrap(),
            Value::from("a")
        );
    }
}
