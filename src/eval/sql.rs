/// SQL DOM interpreter.
///
/// Runs a [`SqlSelect`] the way a database would: FROM, WHERE, GROUP BY,
/// window numbering, projection, DISTINCT, ORDER BY, OFFSET, LIMIT. Column
/// references resolve against the innermost table alias first, then against
/// enclosing queries, so correlated sub-selects and APPLY joins see their
/// outer rows.
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::scalar;
use super::{Database, Row};
use crate::dom::{SqlExpr, SqlJoinKind, SqlOrder, SqlSelect, SqlTable};
use crate::error::{Error, Result};
use crate::provider::AggregateKind;
use crate::value::Value;

/// Rows `select` returns over `db` with positional `parameters`.
pub fn execute(select: &SqlSelect, db: &Database, parameters: &[Value]) -> Result<Vec<Row>> {
    Executor { db, parameters }.select(select, None)
}

/// One aliased table's values in a source row.
#[derive(Debug, Clone)]
struct Bound {
    alias: String,
    names: Arc<Vec<String>>,
    values: Vec<Value>,
}

/// Relations visible to an expression, innermost query first.
struct Frame<'a> {
    relations: &'a [Bound],
    parent: Option<&'a Frame<'a>>,
}

impl Frame<'_> {
    fn lookup(&self, table: &str, name: &str) -> Result<Value> {
        if let Some(bound) = self.relations.iter().rev().find(|b| b.alias == table) {
            return bound
                .names
                .iter()
                .position(|n| n == name)
                .map(|i| bound.values[i].clone())
                .ok_or_else(|| Error::Evaluation(format!("{} has no column {}", table, name)));
        }
        match self.parent {
            Some(parent) => parent.lookup(table, name),
            None => Err(Error::Evaluation(format!("unknown column {}.{}", table, name))),
        }
    }
}

/// Per-row state an expression may read besides its frame.
#[derive(Clone, Copy)]
struct RowState<'a> {
    /// Source rows of the current group, for aggregates.
    group: Option<&'a [Vec<Bound>]>,
    row_number: Option<i64>,
}

const PLAIN: RowState<'static> = RowState {
    group: None,
    row_number: None,
};

struct Executor<'a> {
    db: &'a Database,
    parameters: &'a [Value],
}

impl Executor<'_> {
    fn select(&self, select: &SqlSelect, outer: Option<&Frame<'_>>) -> Result<Vec<Row>> {
        let mut sources = match &select.from {
            Some(table) => self.table(table, outer)?,
            None => vec![Vec::new()],
        };

        if let Some(filter) = &select.filter {
            let mut kept = Vec::with_capacity(sources.len());
            for row in sources {
                let frame = Frame {
                    relations: &row,
                    parent: outer,
                };
                if scalar::is_true(&self.expr(filter, &frame, PLAIN)?) {
                    kept.push(row);
                }
            }
            sources = kept;
        }

        // (output values, order keys) per result row
        let mut produced: Vec<(Row, Row)> = Vec::new();
        if select.is_grouped() {
            for group in self.groups(select, sources, outer)? {
                let (representative, members) = group;
                let frame = Frame {
                    relations: &representative,
                    parent: outer,
                };
                let state = RowState {
                    group: Some(members.as_slice()),
                    row_number: None,
                };
                produced.push(self.project(select, &frame, state)?);
            }
        } else {
            let numbers = self.row_numbers(select, &sources, outer)?;
            for (i, row) in sources.iter().enumerate() {
                let frame = Frame {
                    relations: row,
                    parent: outer,
                };
                let state = RowState {
                    group: None,
                    row_number: numbers.as_ref().map(|n| n[i]),
                };
                produced.push(self.project(select, &frame, state)?);
            }
        }

        if select.distinct {
            let mut seen = HashSet::new();
            produced.retain(|(values, _)| seen.insert(values.clone()));
        }
        if !select.order_by.is_empty() {
            produced.sort_by(|a, b| compare_keys(&a.1, &b.1, &select.order_by));
        }
        let offset = select.offset.map_or(0, |o| usize::try_from(o).unwrap_or(usize::MAX));
        let limit = select.limit.map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
        Ok(produced
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|(values, _)| values)
            .collect())
    }

    fn project(
        &self,
        select: &SqlSelect,
        frame: &Frame<'_>,
        state: RowState<'_>,
    ) -> Result<(Row, Row)> {
        let values = select
            .columns
            .iter()
            .map(|c| self.expr(&c.expr, frame, state))
            .collect::<Result<Row>>()?;
        let keys = select
            .order_by
            .iter()
            .map(|o| self.order_key(select, &o.expr, &values, frame, state))
            .collect::<Result<Row>>()?;
        Ok((values, keys))
    }

    /// ORDER BY may name an output alias as well as a source column.
    fn order_key(
        &self,
        select: &SqlSelect,
        expr: &SqlExpr,
        values: &[Value],
        frame: &Frame<'_>,
        state: RowState<'_>,
    ) -> Result<Value> {
        match self.expr(expr, frame, state) {
            Ok(v) => Ok(v),
            Err(err) => match expr {
                SqlExpr::Column { name, .. } => select
                    .columns
                    .iter()
                    .position(|c| &c.alias == name)
                    .map(|i| values[i].clone())
                    .ok_or(err),
                _ => Err(err),
            },
        }
    }

    /// Groups as (representative row, members) in order of first appearance.
    /// An ungrouped aggregate over no rows gets one group whose
    /// representative is all nulls.
    fn groups(
        &self,
        select: &SqlSelect,
        sources: Vec<Vec<Bound>>,
        outer: Option<&Frame<'_>>,
    ) -> Result<Vec<(Vec<Bound>, Vec<Vec<Bound>>)>> {
        let mut order: Vec<Row> = Vec::new();
        let mut groups: HashMap<Row, Vec<Vec<Bound>>> = HashMap::new();
        for row in sources {
            let frame = Frame {
                relations: &row,
                parent: outer,
            };
            let key = select
                .group_by
                .iter()
                .map(|g| self.expr(g, &frame, PLAIN))
                .collect::<Result<Row>>()?;
            if !groups.contains_key(&key) {
                order.push(key.clone());
            }
            groups.entry(key).or_default().push(row);
        }

        if select.group_by.is_empty() && order.is_empty() {
            let representative = match &select.from {
                Some(table) => self.null_row(table)?,
                None => Vec::new(),
            };
            return Ok(vec![(representative, Vec::new())]);
        }
        Ok(order
            .into_iter()
            .filter_map(|key| groups.remove(&key))
            .filter_map(|members| members.first().cloned().map(|first| (first, members)))
            .collect())
    }

    /// Row numbers per source row when a column uses `ROW_NUMBER()`.
    fn row_numbers(
        &self,
        select: &SqlSelect,
        sources: &[Vec<Bound>],
        outer: Option<&Frame<'_>>,
    ) -> Result<Option<Vec<i64>>> {
        // the compiler only emits ROW_NUMBER() as a whole column
        let window = select.columns.iter().find_map(|c| match &c.expr {
            SqlExpr::RowNumber { order_by } => Some(order_by.as_slice()),
            _ => None,
        });
        let Some(order_by) = window else {
            return Ok(None);
        };
        let mut keyed = Vec::with_capacity(sources.len());
        for (i, row) in sources.iter().enumerate() {
            let frame = Frame {
                relations: row,
                parent: outer,
            };
            let keys = order_by
                .iter()
                .map(|o| self.expr(&o.expr, &frame, PLAIN))
                .collect::<Result<Row>>()?;
            keyed.push((i, keys));
        }
        keyed.sort_by(|a, b| compare_keys(&a.1, &b.1, order_by));
        let mut numbers = vec![0; sources.len()];
        for (rank, (i, _)) in keyed.into_iter().enumerate() {
            numbers[i] = rank as i64 + 1;
        }
        Ok(Some(numbers))
    }

    fn table(&self, table: &SqlTable, outer: Option<&Frame<'_>>) -> Result<Vec<Vec<Bound>>> {
        match table {
            SqlTable::Table { name, alias, .. } => {
                let data = self.db.table(name)?;
                let names = Arc::new(data.columns.clone());
                Ok(data
                    .rows
                    .iter()
                    .map(|values| {
                        vec![Bound {
                            alias: alias.clone(),
                            names: Arc::clone(&names),
                            values: values.clone(),
                        }]
                    })
                    .collect())
            }
            SqlTable::Derived { query, alias } => {
                let names = Arc::new(query.column_aliases());
                Ok(self
                    .select(query, outer)?
                    .into_iter()
                    .map(|values| {
                        vec![Bound {
                            alias: alias.clone(),
                            names: Arc::clone(&names),
                            values,
                        }]
                    })
                    .collect())
            }
            SqlTable::Values {
                rows,
                columns,
                alias,
            } => {
                let names = Arc::new(columns.clone());
                Ok(rows
                    .iter()
                    .map(|values| {
                        vec![Bound {
                            alias: alias.clone(),
                            names: Arc::clone(&names),
                            values: values.clone(),
                        }]
                    })
                    .collect())
            }
            SqlTable::Join {
                kind,
                left,
                right,
                on,
            } => self.join(*kind, left, right, on.as_ref(), outer),
        }
    }

    fn join(
        &self,
        kind: SqlJoinKind,
        left: &SqlTable,
        right: &SqlTable,
        on: Option<&SqlExpr>,
        outer: Option<&Frame<'_>>,
    ) -> Result<Vec<Vec<Bound>>> {
        let lateral = matches!(kind, SqlJoinKind::CrossApply | SqlJoinKind::OuterApply);
        let keep_unmatched = matches!(kind, SqlJoinKind::LeftOuter | SqlJoinKind::OuterApply);
        let uncorrelated = if lateral {
            None
        } else {
            Some(self.table(right, outer)?)
        };

        let mut out = Vec::new();
        for l in self.table(left, outer)? {
            let correlated;
            let right_rows = match &uncorrelated {
                Some(rows) => rows,
                None => {
                    let frame = Frame {
                        relations: &l,
                        parent: outer,
                    };
                    correlated = self.table(right, Some(&frame))?;
                    &correlated
                }
            };
            let mut matched = false;
            for r in right_rows {
                let mut row = l.clone();
                row.extend(r.iter().cloned());
                let accepted = match on {
                    Some(condition) => {
                        let frame = Frame {
                            relations: &row,
                            parent: outer,
                        };
                        scalar::is_true(&self.expr(condition, &frame, PLAIN)?)
                    }
                    None => true,
                };
                if accepted {
                    matched = true;
                    out.push(row);
                }
            }
            if !matched && keep_unmatched {
                let mut row = l;
                row.extend(self.null_row(right)?);
                out.push(row);
            }
        }
        Ok(out)
    }

    /// All-null values for every relation `table` binds.
    fn null_row(&self, table: &SqlTable) -> Result<Vec<Bound>> {
        let nulls = |alias: &str, names: Vec<String>| Bound {
            alias: alias.to_string(),
            values: vec![Value::Null; names.len()],
            names: Arc::new(names),
        };
        match table {
            SqlTable::Table { name, alias, .. } => {
                Ok(vec![nulls(alias, self.db.table(name)?.columns.clone())])
            }
            SqlTable::Derived { query, alias } => Ok(vec![nulls(alias, query.column_aliases())]),
            SqlTable::Values { columns, alias, .. } => Ok(vec![nulls(alias, columns.clone())]),
            SqlTable::Join { left, right, .. } => {
                let mut row = self.null_row(left)?;
                row.extend(self.null_row(right)?);
                Ok(row)
            }
        }
    }

    fn expr(&self, expr: &SqlExpr, frame: &Frame<'_>, state: RowState<'_>) -> Result<Value> {
        match expr {
            SqlExpr::Column { table, name } => frame.lookup(table, name),
            SqlExpr::Literal(v) => Ok(v.clone()),
            SqlExpr::Parameter(i) => self
                .parameters
                .get(*i)
                .cloned()
                .ok_or_else(|| Error::Evaluation(format!("parameter {} is not bound", i))),
            SqlExpr::Binary { op, left, right } => scalar::binary(
                *op,
                &self.expr(left, frame, state)?,
                &self.expr(right, frame, state)?,
            ),
            SqlExpr::Unary { op, operand } => scalar::unary(*op, &self.expr(operand, frame, state)?),
            SqlExpr::IsNull { operand, negated } => Ok(Value::Bool(
                self.expr(operand, frame, state)?.is_null() != *negated,
            )),
            SqlExpr::Function { func, args } => {
                let args = args
                    .iter()
                    .map(|a| self.expr(a, frame, state))
                    .collect::<Result<Vec<_>>>()?;
                scalar::function(*func, &args)
            }
            SqlExpr::Aggregate { kind, arg } => {
                let members = state.group.ok_or_else(|| {
                    Error::Evaluation("aggregate outside a grouped select".into())
                })?;
                match (kind, arg) {
                    (AggregateKind::Count, None) => Ok(Value::Int(members.len() as i64)),
                    (kind, Some(arg)) => {
                        let mut values = Vec::with_capacity(members.len());
                        for member in members {
                            let frame = Frame {
                                relations: member,
                                parent: frame.parent,
                            };
                            values.push(self.expr(arg, &frame, PLAIN)?);
                        }
                        scalar::aggregate(*kind, values)
                    }
                    (kind, None) => Err(Error::Evaluation(format!(
                        "{:?} aggregate needs an argument",
                        kind
                    ))),
                }
            }
            SqlExpr::Case {
                branches,
                otherwise,
            } => {
                for (when, then) in branches {
                    if scalar::is_true(&self.expr(when, frame, state)?) {
                        return self.expr(then, frame, state);
                    }
                }
                match otherwise {
                    Some(e) => self.expr(e, frame, state),
                    None => Ok(Value::Null),
                }
            }
            SqlExpr::Exists(query) => Ok(Value::Bool(!self.select(query, Some(frame))?.is_empty())),
            SqlExpr::Subquery(query) => {
                let rows = self.select(query, Some(frame))?;
                match rows.as_slice() {
                    [] => Ok(Value::Null),
                    [row] => Ok(row.first().cloned().unwrap_or(Value::Null)),
                    _ => Err(Error::Evaluation(format!(
                        "scalar sub-select returned {} rows",
                        rows.len()
                    ))),
                }
            }
            SqlExpr::RowNumber { .. } => state
                .row_number
                .map(Value::Int)
                .ok_or_else(|| Error::Evaluation("ROW_NUMBER() outside a select list".into())),
            SqlExpr::FullText { columns, query } => {
                let columns = columns
                    .iter()
                    .map(|c| self.expr(c, frame, state))
                    .collect::<Result<Vec<_>>>()?;
                Ok(scalar::full_text(&columns, &self.expr(query, frame, state)?))
            }
        }
    }
}

fn compare_keys(a: &[Value], b: &[Value], order: &[SqlOrder]) -> std::cmp::Ordering {
    for (i, o) in order.iter().enumerate() {
        let ord = a[i].cmp(&b[i]);
        let ord = if o.ascending { ord } else { ord.reverse() };
        if ord.is_ne() {
            return ord;
        }
    }
    std::cmp::Ordering::Equal
}
