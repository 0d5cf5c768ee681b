//! Lowering of provider expressions and key ranges to SQL expressions.

use super::context::CompilationContext;
use crate::dom::SqlExpr;
use crate::error::{Error, Result};
use crate::provider::{BinaryOp, Cut, Expr, KeyRange, RangeSet};
use crate::value::Value;

/// Lowers `expr` with `Column(i)` bound to `columns[i]`.
///
/// With `parameterize` set (predicate positions) and literal
/// parameterization enabled in the context, non-null non-boolean literals
/// become bound parameters.
pub fn compile_expr(
    expr: &Expr,
    columns: &[SqlExpr],
    ctx: &mut CompilationContext,
    parameterize: bool,
) -> Result<SqlExpr> {
    let lower =
        |e: &Expr, ctx: &mut CompilationContext| compile_expr(e, columns, ctx, parameterize);
    Ok(match expr {
        Expr::Column(i) => columns.get(*i).cloned().ok_or_else(|| {
            Error::defect(
                ctx.path(),
                format!("column {} out of range (source has {})", i, columns.len()),
            )
        })?,
        Expr::Outer { param, column } => ctx.resolve(*param, *column)?,
        Expr::Literal(value) => lower_literal(value, ctx, parameterize),
        Expr::Binary { op, left, right } => {
            SqlExpr::binary(*op, lower(left, ctx)?, lower(right, ctx)?)
        }
        Expr::Unary { op, operand } => SqlExpr::Unary {
            op: *op,
            operand: Box::new(lower(operand, ctx)?),
        },
        Expr::IsNull { operand, negated } => SqlExpr::IsNull {
            operand: Box::new(lower(operand, ctx)?),
            negated: *negated,
        },
        Expr::Function { func, args } => SqlExpr::Function {
            func: *func,
            args: args
                .iter()
                .map(|a| lower(a, ctx))
                .collect::<Result<_>>()?,
        },
        Expr::Conditional {
            test,
            if_true,
            if_false,
        } => SqlExpr::Case {
            branches: vec![(lower(test, ctx)?, lower(if_true, ctx)?)],
            otherwise: Some(Box::new(lower(if_false, ctx)?)),
        },
        Expr::FullText { columns: cols, query } => SqlExpr::FullText {
            columns: cols
                .iter()
                .map(|c| lower(c, ctx))
                .collect::<Result<_>>()?,
            query: Box::new(lower(query, ctx)?),
        },
    })
}

fn lower_literal(value: &Value, ctx: &mut CompilationContext, parameterize: bool) -> SqlExpr {
    let bindable = !matches!(value, Value::Null | Value::Bool(_));
    if parameterize && bindable && ctx.parameterize_literals() {
        SqlExpr::Parameter(ctx.bind(value.clone()))
    } else {
        SqlExpr::Literal(value.clone())
    }
}

/// Condition selecting key tuples of `keys` that fall in `ranges`. Bound
/// values follow the same parameterization as predicate literals.
pub fn range_condition(
    keys: &[SqlExpr],
    ranges: &RangeSet,
    ctx: &mut CompilationContext,
) -> SqlExpr {
    let terms: Vec<SqlExpr> = ranges
        .ranges()
        .iter()
        .map(|r| key_range_condition(keys, r, ctx))
        .collect();
    SqlExpr::or_all(terms).unwrap_or(SqlExpr::Literal(Value::Bool(false)))
}

fn key_range_condition(keys: &[SqlExpr], range: &KeyRange, ctx: &mut CompilationContext) -> SqlExpr {
    if let Some(prefix) = range.point_prefix() {
        let eqs: Vec<SqlExpr> = keys
            .iter()
            .zip(prefix)
            .map(|(k, v)| SqlExpr::binary(BinaryOp::Eq, k.clone(), lower_literal(v, ctx, true)))
            .collect();
        return SqlExpr::and_all(eqs).unwrap_or(SqlExpr::Literal(Value::Bool(true)));
    }
    let lower = match &range.from {
        Cut::Below(k) => tuple_compare(keys, &bound(k, ctx), BinaryOp::Gt, true),
        Cut::Above(k) => tuple_compare(keys, &bound(k, ctx), BinaryOp::Gt, false),
        Cut::BelowAll => None,
        Cut::AboveAll => Some(SqlExpr::Literal(Value::Bool(false))),
    };
    let upper = match &range.to {
        Cut::Below(k) => tuple_compare(keys, &bound(k, ctx), BinaryOp::Lt, false),
        Cut::Above(k) => tuple_compare(keys, &bound(k, ctx), BinaryOp::Lt, true),
        Cut::AboveAll => None,
        Cut::BelowAll => Some(SqlExpr::Literal(Value::Bool(false))),
    };
    SqlExpr::and_all(lower.into_iter().chain(upper)).unwrap_or(SqlExpr::Literal(Value::Bool(true)))
}

/// Cut key values, each bound once and reused by every term that compares it.
fn bound(key: &[Value], ctx: &mut CompilationContext) -> Vec<SqlExpr> {
    key.iter().map(|v| lower_literal(v, ctx, true)).collect()
}

/// Lexicographic `keys[..n] op prefix` expanded into AND/OR terms:
/// `(k1 > v1) OR (k1 = v1 AND k2 > v2) OR ... OR (... AND kn >= vn)`.
fn tuple_compare(
    keys: &[SqlExpr],
    prefix: &[SqlExpr],
    strict: BinaryOp,
    inclusive: bool,
) -> Option<SqlExpr> {
    let n = prefix.len().min(keys.len());
    if n == 0 {
        return None;
    }
    let inclusive_op = match strict {
        BinaryOp::Gt => BinaryOp::GtEq,
        _ => BinaryOp::LtEq,
    };
    let mut terms = Vec::with_capacity(n);
    for i in 0..n {
        let op = if i == n - 1 && inclusive {
            inclusive_op
        } else {
            strict
        };
        let mut parts: Vec<SqlExpr> = (0..i)
            .map(|j| SqlExpr::binary(BinaryOp::Eq, keys[j].clone(), prefix[j].clone()))
            .collect();
        parts.push(SqlExpr::binary(op, keys[i].clone(), prefix[i].clone()));
        terms.extend(SqlExpr::and_all(parts));
    }
    SqlExpr::or_all(terms)
}
