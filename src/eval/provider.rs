/// Provider tree interpreter.
///
/// Row order follows the tree: scans return stored order, `Sort` is stable,
/// joins keep left-major order and `Distinct` keeps first occurrences.
use std::collections::{HashMap, HashSet};

use super::scalar;
use super::{Database, Row};
use crate::error::{Error, Result};
use crate::provider::{
    AggregateColumn, AggregateKind, ApplyParameter, ApplyType, BinaryOp, Direction, Expr,
    JoinType, Provider, ProviderRef, ScalarMode, SortKey,
};
use crate::value::Value;

/// Rows `provider` produces over `db`.
pub fn evaluate(provider: &ProviderRef, db: &Database) -> Result<Vec<Row>> {
    Evaluator {
        db,
        bindings: HashMap::new(),
    }
    .run(provider)
}

struct Evaluator<'a> {
    db: &'a Database,
    /// Current row of every enclosing apply.
    bindings: HashMap<ApplyParameter, Row>,
}

impl Evaluator<'_> {
    fn run(&mut self, provider: &ProviderRef) -> Result<Vec<Row>> {
        match provider.as_ref() {
            Provider::Index { table } => Ok(self.db.table(&table.name)?.rows.clone()),
            Provider::RangeScan {
                table,
                index,
                ranges,
            } => {
                let rows = &self.db.table(&table.name)?.rows;
                Ok(rows
                    .iter()
                    .filter(|row| {
                        let key: Vec<Value> = index
                            .key_columns
                            .iter()
                            .map(|k| row.get(k.column).cloned().unwrap_or(Value::Null))
                            .collect();
                        ranges.contains(&key)
                    })
                    .cloned()
                    .collect())
            }
            Provider::Raw { rows, .. } => Ok(rows.clone()),
            Provider::Filter { source, predicate } => {
                let mut out = Vec::new();
                for row in self.run(source)? {
                    if scalar::is_true(&self.expr(predicate, &row)?) {
                        out.push(row);
                    }
                }
                Ok(out)
            }
            Provider::Select { source, columns } => self
                .run(source)?
                .into_iter()
                .map(|row| {
                    columns
                        .iter()
                        .map(|&c| column(&row, c))
                        .collect::<Result<Row>>()
                })
                .collect(),
            Provider::Calculate { source, columns } => {
                let mut out = Vec::new();
                for mut row in self.run(source)? {
                    let mut added = Vec::with_capacity(columns.len());
                    for c in columns {
                        added.push(self.expr(&c.expr, &row)?);
                    }
                    row.extend(added);
                    out.push(row);
                }
                Ok(out)
            }
            Provider::Alias { source, .. } | Provider::Store { source, .. } => self.run(source),
            Provider::Sort { source, order } => {
                let mut rows = self.run(source)?;
                if let Some(bad) = order.iter().find(|k| rows.iter().any(|r| k.column >= r.len())) {
                    return Err(Error::Evaluation(format!(
                        "sort column {} out of range",
                        bad.column
                    )));
                }
                rows.sort_by(|a, b| compare_keys(a, b, order));
                Ok(rows)
            }
            Provider::Take { source, count } => {
                let mut rows = self.run(source)?;
                rows.truncate(usize::try_from(*count).unwrap_or(usize::MAX));
                Ok(rows)
            }
            Provider::Skip { source, count } => {
                let rows = self.run(source)?;
                let skip = usize::try_from(*count).unwrap_or(usize::MAX);
                Ok(rows.into_iter().skip(skip).collect())
            }
            Provider::Distinct { source } => {
                let mut seen = HashSet::new();
                Ok(self
                    .run(source)?
                    .into_iter()
                    .filter(|row| seen.insert(row.clone()))
                    .collect())
            }
            Provider::Join {
                left,
                right,
                join_type,
                pairs,
            } => {
                let right_width = right.header()?.len();
                let right_rows = self.run(right)?;
                let mut out = Vec::new();
                for l in self.run(left)? {
                    let mut matched = false;
                    for r in &right_rows {
                        let mut hit = true;
                        for &(a, b) in pairs {
                            let eq = scalar::binary(BinaryOp::Eq, &column(&l, a)?, &column(r, b)?)?;
                            hit &= scalar::is_true(&eq);
                        }
                        if hit {
                            matched = true;
                            out.push(concat(&l, r));
                        }
                    }
                    if !matched && *join_type == JoinType::LeftOuter {
                        out.push(pad(&l, right_width));
                    }
                }
                Ok(out)
            }
            Provider::PredicateJoin {
                left,
                right,
                join_type,
                predicate,
            } => {
                let right_width = right.header()?.len();
                let right_rows = self.run(right)?;
                let mut out = Vec::new();
                for l in self.run(left)? {
                    let mut matched = false;
                    for r in &right_rows {
                        let row = concat(&l, r);
                        if scalar::is_true(&self.expr(predicate, &row)?) {
                            matched = true;
                            out.push(row);
                        }
                    }
                    if !matched && *join_type == JoinType::LeftOuter {
                        out.push(pad(&l, right_width));
                    }
                }
                Ok(out)
            }
            Provider::Apply {
                left,
                right,
                parameter,
                apply_type,
                join_type,
            } => self.apply(left, right, *parameter, *apply_type, *join_type),
            Provider::Aggregate {
                source,
                group_by,
                aggregates,
            } => {
                let rows = self.run(source)?;
                aggregate(rows, group_by, aggregates)
            }
            Provider::Existence { source, .. } => {
                Ok(vec![vec![Value::Bool(!self.run(source)?.is_empty())]])
            }
        }
    }

    fn apply(
        &mut self,
        left: &ProviderRef,
        right: &ProviderRef,
        parameter: ApplyParameter,
        apply_type: ApplyType,
        join_type: JoinType,
    ) -> Result<Vec<Row>> {
        let right_width = right.header()?.len();
        let mut out = Vec::new();
        for l in self.run(left)? {
            let previous = self.bindings.insert(parameter, l.clone());
            let result = self.run(right);
            match previous {
                Some(row) => self.bindings.insert(parameter, row),
                None => self.bindings.remove(&parameter),
            };
            let mut matches = result?;

            match apply_type {
                ApplyType::Existence => {
                    let mut row = l;
                    row.push(Value::Bool(!matches.is_empty()));
                    out.push(row);
                    continue;
                }
                ApplyType::Scalar(ScalarMode::Single) if matches.len() > 1 => {
                    return Err(Error::Evaluation(format!(
                        "single-row apply produced {} rows",
                        matches.len()
                    )));
                }
                ApplyType::Scalar(_) => matches.truncate(1),
                ApplyType::All => {}
            }
            if matches.is_empty() {
                if join_type == JoinType::LeftOuter {
                    out.push(pad(&l, right_width));
                }
                continue;
            }
            out.extend(matches.iter().map(|r| concat(&l, r)));
        }
        Ok(out)
    }

    fn expr(&self, expr: &Expr, row: &[Value]) -> Result<Value> {
        match expr {
            Expr::Column(i) => column(row, *i),
            Expr::Outer { param, column: c } => {
                let bound = self.bindings.get(param).ok_or_else(|| {
                    Error::Evaluation(format!("parameter {} is not bound", param))
                })?;
                column(bound, *c)
            }
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Binary { op, left, right } => {
                scalar::binary(*op, &self.expr(left, row)?, &self.expr(right, row)?)
            }
            Expr::Unary { op, operand } => scalar::unary(*op, &self.expr(operand, row)?),
            Expr::IsNull { operand, negated } => {
                Ok(Value::Bool(self.expr(operand, row)?.is_null() != *negated))
            }
            Expr::Function { func, args } => {
                let args = args
                    .iter()
                    .map(|a| self.expr(a, row))
                    .collect::<Result<Vec<_>>>()?;
                scalar::function(*func, &args)
            }
            Expr::Conditional {
                test,
                if_true,
                if_false,
            } => {
                if scalar::is_true(&self.expr(test, row)?) {
                    self.expr(if_true, row)
                } else {
                    self.expr(if_false, row)
                }
            }
            Expr::FullText { columns, query } => {
                let columns = columns
                    .iter()
                    .map(|c| self.expr(c, row))
                    .collect::<Result<Vec<_>>>()?;
                Ok(scalar::full_text(&columns, &self.expr(query, row)?))
            }
        }
    }
}

fn column(row: &[Value], index: usize) -> Result<Value> {
    row.get(index).cloned().ok_or_else(|| {
        Error::Evaluation(format!(
            "column {} out of range (row has {})",
            index,
            row.len()
        ))
    })
}

fn concat(left: &[Value], right: &[Value]) -> Row {
    left.iter().chain(right).cloned().collect()
}

fn pad(left: &[Value], width: usize) -> Row {
    let mut row = left.to_vec();
    row.extend(std::iter::repeat(Value::Null).take(width));
    row
}

fn compare_keys(a: &[Value], b: &[Value], order: &[SortKey]) -> std::cmp::Ordering {
    for key in order {
        let ord = a[key.column].cmp(&b[key.column]);
        let ord = match key.direction {
            Direction::Ascending => ord,
            Direction::Descending => ord.reverse(),
        };
        if ord.is_ne() {
            return ord;
        }
    }
    std::cmp::Ordering::Equal
}

/// Groups in order of first appearance. Without grouping columns an empty
/// input still yields one row.
fn aggregate(
    rows: Vec<Row>,
    group_by: &[usize],
    aggregates: &[AggregateColumn],
) -> Result<Vec<Row>> {
    let mut order: Vec<Row> = Vec::new();
    let mut groups: HashMap<Row, Vec<Row>> = HashMap::new();
    for row in rows {
        let key = group_by
            .iter()
            .map(|&g| column(&row, g))
            .collect::<Result<Row>>()?;
        if !groups.contains_key(&key) {
            order.push(key.clone());
        }
        groups.entry(key).or_default().push(row);
    }
    if group_by.is_empty() && order.is_empty() {
        order.push(Vec::new());
        groups.insert(Vec::new(), Vec::new());
    }

    let mut out = Vec::with_capacity(order.len());
    for key in order {
        let members = groups.remove(&key).unwrap_or_default();
        let mut row = key;
        for agg in aggregates {
            let value = match (agg.kind, agg.column) {
                (AggregateKind::Count, None) => Value::Int(members.len() as i64),
                (kind, Some(c)) => scalar::aggregate(
                    kind,
                    members
                        .iter()
                        .map(|m| column(m, c))
                        .collect::<Result<Vec<_>>>()?,
                )?,
                (kind, None) => {
                    return Err(Error::Evaluation(format!(
                        "{:?} aggregate {} needs a column",
                        kind, agg.name
                    )))
                }
            };
            row.push(value);
        }
        out.push(row);
    }
    Ok(out)
}
