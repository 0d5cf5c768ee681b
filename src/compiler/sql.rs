//! Lowering of provider nodes to SQL fragments.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace};

use super::context::CompilationContext;
use super::expr::{compile_expr, range_condition};
use super::fragment::SqlFragment;
use super::{Compiler, ExecutableProvider, SourceCompiler};
use crate::dialect::capabilities::Pagination;
use crate::dialect::Capabilities;
use crate::dom::{SqlColumn, SqlExpr, SqlJoinKind, SqlSelect, SqlTable};
use crate::error::{Error, Result};
use crate::provider::{
    AggregateColumn, AggregateKind, ApplyType, BinaryOp, CalculatedColumn, Direction, Expr,
    Header, JoinType, Provider, ProviderRef, ScalarMode, SortKey, TableInfo,
};
use crate::value::Value;

/// Compiles every provider kind to a single SELECT, choosing constructs from
/// the target dialect's capabilities.
pub struct SqlCompiler {
    caps: Capabilities,
}

/// A fragment placed in a FROM clause.
struct JoinSource {
    table: SqlTable,
    columns: Vec<SqlExpr>,
    filter: Option<SqlExpr>,
}

impl SqlCompiler {
    pub fn new(caps: Capabilities) -> Self {
        Self { caps }
    }

    fn scan(
        &self,
        table: &TableInfo,
        hint: Option<&str>,
        header: Header,
        ctx: &mut CompilationContext,
    ) -> SqlFragment {
        let alias = ctx.aliases.next("a");
        let columns = table
            .columns
            .iter()
            .map(|c| SqlColumn {
                expr: SqlExpr::column(&alias, &c.name),
                alias: String::new(),
            })
            .collect();
        let hint = hint
            .filter(|_| self.caps.index_hint().is_some())
            .map(str::to_string);
        let select = SqlSelect {
            columns,
            from: Some(SqlTable::Table {
                name: table.name.clone(),
                alias,
                hint,
            }),
            ..SqlSelect::default()
        };
        SqlFragment::new(select, header)
    }

    fn raw(
        &self,
        rows: &[Vec<Value>],
        header: Header,
        ctx: &mut CompilationContext,
    ) -> Result<SqlFragment> {
        if let Some(bad) = rows.iter().find(|r| r.len() != header.len()) {
            return Err(Error::defect(
                ctx.path(),
                format!("raw row has {} values, header has {}", bad.len(), header.len()),
            ));
        }
        let alias = ctx.aliases.next("v");
        let names: Vec<String> = (0..header.len()).map(|i| format!("c{}", i)).collect();
        let columns = names
            .iter()
            .map(|n| SqlColumn {
                expr: SqlExpr::column(&alias, n),
                alias: String::new(),
            })
            .collect();
        let select = SqlSelect {
            columns,
            from: Some(SqlTable::Values {
                rows: rows.to_vec(),
                columns: names,
                alias,
            }),
            ..SqlSelect::default()
        };
        Ok(SqlFragment::new(select, header))
    }

    fn filter(
        &self,
        mut f: SqlFragment,
        predicate: &Expr,
        ctx: &mut CompilationContext,
    ) -> Result<SqlFragment> {
        if !f.is_plain() {
            f = f.wrap(ctx);
        }
        let condition = compile_expr(predicate, &f.column_exprs(), ctx, true)?;
        f.select.and_where(condition);
        Ok(f)
    }

    fn project(
        &self,
        mut f: SqlFragment,
        indexes: &[usize],
        header: Header,
        ctx: &mut CompilationContext,
    ) -> Result<SqlFragment> {
        if f.select.distinct {
            f = f.wrap(ctx);
        }
        let visible = f.visible();
        let mut columns = Vec::with_capacity(indexes.len());
        let mut moved: HashMap<usize, usize> = HashMap::new();
        for &i in indexes {
            if i >= visible {
                return Err(Error::defect(
                    ctx.path(),
                    format!("column {} out of range (source has {})", i, visible),
                ));
            }
            moved.entry(i).or_insert(columns.len());
            columns.push(f.select.columns[i].clone());
        }
        // ordering keys that are projected away stay as hidden columns
        for &(i, _) in &f.ordering {
            if !moved.contains_key(&i) {
                moved.insert(i, columns.len());
                columns.push(f.select.columns[i].clone());
            }
        }
        f.ordering = f
            .ordering
            .iter()
            .filter_map(|&(i, asc)| moved.get(&i).map(|&j| (j, asc)))
            .collect();
        f.select.columns = columns;
        f.header = header;
        f.relabel();
        Ok(f)
    }

    fn calculate(
        &self,
        mut f: SqlFragment,
        calculated: &[CalculatedColumn],
        header: Header,
        ctx: &mut CompilationContext,
    ) -> Result<SqlFragment> {
        if f.select.distinct {
            f = f.wrap(ctx);
        }
        let exprs = f.column_exprs();
        let visible = f.visible();
        let added = calculated
            .iter()
            .map(|c| {
                compile_expr(&c.expr, &exprs, ctx, false).map(|expr| SqlColumn {
                    expr,
                    alias: String::new(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let count = added.len();
        f.select.columns.splice(visible..visible, added);
        for entry in f.ordering.iter_mut() {
            if entry.0 >= visible {
                entry.0 += count;
            }
        }
        f.header = header;
        f.relabel();
        Ok(f)
    }

    fn sort(
        &self,
        mut f: SqlFragment,
        order: &[SortKey],
        ctx: &mut CompilationContext,
    ) -> Result<SqlFragment> {
        if f.select.has_paging() {
            f = f.wrap(ctx);
        }
        if let Some(bad) = order.iter().find(|k| k.column >= f.visible()) {
            return Err(Error::defect(
                ctx.path(),
                format!("sort column {} out of range", bad.column),
            ));
        }
        f.ordering = order
            .iter()
            .map(|k| (k.column, k.direction == Direction::Ascending))
            .collect();
        Ok(f)
    }

    /// Fragment with the same header and no rows.
    fn empty(&self, mut f: SqlFragment, ctx: &mut CompilationContext) -> SqlFragment {
        if !f.is_plain() {
            f = f.wrap(ctx);
        }
        f.select.and_where(SqlExpr::Literal(Value::Bool(false)));
        f
    }

    fn take(&self, mut f: SqlFragment, count: u64, ctx: &mut CompilationContext) -> SqlFragment {
        if count == 0 {
            return self.empty(f, ctx);
        }
        f.pin_ordering();
        f.select.limit = Some(f.select.limit.map_or(count, |l| l.min(count)));
        f
    }

    fn skip(&self, mut f: SqlFragment, count: u64, ctx: &mut CompilationContext) -> SqlFragment {
        if count == 0 {
            return f;
        }
        if self.caps.pagination() == Pagination::Top {
            return self.skip_by_row_number(f, count, ctx);
        }
        f.pin_ordering();
        f.select.offset = Some(f.select.offset.unwrap_or(0) + count);
        if let Some(limit) = f.select.limit {
            let remaining = limit.saturating_sub(count);
            if remaining == 0 {
                return self.empty(f, ctx);
            }
            f.select.limit = Some(remaining);
        }
        f
    }

    /// `ROW_NUMBER() OVER (ORDER BY ...)` as a hidden column, then a wrapper
    /// filtering on it. The wrapper is ordered by the row number so a later
    /// take renders as `TOP n ... ORDER BY rn`.
    fn skip_by_row_number(
        &self,
        mut f: SqlFragment,
        count: u64,
        ctx: &mut CompilationContext,
    ) -> SqlFragment {
        if !f.is_plain() {
            f = f.wrap(ctx);
        }
        let order_by = f.ordering_exprs();
        let rn = f.push_hidden(SqlExpr::RowNumber { order_by });
        let mut f = f.wrap(ctx);
        let rn_expr = f.select.columns[rn].expr.clone();
        f.select.and_where(SqlExpr::binary(
            BinaryOp::Gt,
            rn_expr,
            SqlExpr::Literal(Value::Int(count as i64)),
        ));
        f.ordering = vec![(rn, true)];
        f
    }

    fn distinct(&self, mut f: SqlFragment, ctx: &mut CompilationContext) -> SqlFragment {
        if f.select.has_paging() {
            f = f.wrap(ctx);
        }
        f.drop_hidden();
        f.select.distinct = true;
        f
    }

    fn aggregate(
        &self,
        mut f: SqlFragment,
        group_by: &[usize],
        aggregates: &[AggregateColumn],
        header: Header,
        ctx: &mut CompilationContext,
    ) -> Result<SqlFragment> {
        if !f.is_plain() {
            f = f.wrap(ctx);
        }
        let exprs = f.column_exprs();
        let column = |i: usize, ctx: &CompilationContext| {
            exprs.get(i).cloned().ok_or_else(|| {
                Error::defect(
                    ctx.path(),
                    format!("column {} out of range (source has {})", i, exprs.len()),
                )
            })
        };
        let groups = group_by
            .iter()
            .map(|&g| column(g, &*ctx))
            .collect::<Result<Vec<_>>>()?;
        let mut columns: Vec<SqlColumn> = groups
            .iter()
            .map(|g| SqlColumn {
                expr: g.clone(),
                alias: String::new(),
            })
            .collect();
        for agg in aggregates {
            let arg = match (agg.kind, agg.column) {
                (_, Some(c)) => Some(Box::new(column(c, &*ctx)?)),
                (AggregateKind::Count, None) => None,
                (kind, None) => {
                    return Err(Error::defect(
                        ctx.path(),
                        format!("{:?} aggregate {} needs a column", kind, agg.name),
                    ))
                }
            };
            columns.push(SqlColumn {
                expr: SqlExpr::Aggregate {
                    kind: agg.kind,
                    arg,
                },
                alias: String::new(),
            });
        }
        f.select.columns = columns;
        f.select.group_by = groups;
        f.ordering.clear();
        f.header = header;
        f.relabel();
        Ok(f)
    }

    fn existence(&self, f: SqlFragment, header: Header) -> SqlFragment {
        let select = SqlSelect {
            columns: vec![SqlColumn {
                expr: exists_case(f.into_subquery()),
                alias: String::new(),
            }],
            ..SqlSelect::default()
        };
        SqlFragment::new(select, header)
    }

    fn join(
        &self,
        left: JoinSource,
        right: JoinSource,
        join_type: JoinType,
        on: Option<SqlExpr>,
        header: Header,
    ) -> SqlFragment {
        let (kind, on, filter) = match join_type {
            JoinType::Inner => (
                if on.is_some() {
                    SqlJoinKind::Inner
                } else {
                    SqlJoinKind::Cross
                },
                on,
                SqlExpr::and_all(left.filter.into_iter().chain(right.filter)),
            ),
            JoinType::LeftOuter => (
                SqlJoinKind::LeftOuter,
                Some(
                    SqlExpr::and_all(on.into_iter().chain(right.filter))
                        .unwrap_or(SqlExpr::Literal(Value::Bool(true))),
                ),
                left.filter,
            ),
        };
        let columns = left
            .columns
            .into_iter()
            .chain(right.columns)
            .map(|expr| SqlColumn {
                expr,
                alias: String::new(),
            })
            .collect();
        let select = SqlSelect {
            columns,
            from: Some(SqlTable::Join {
                kind,
                left: Box::new(left.table),
                right: Box::new(right.table),
                on,
            }),
            filter,
            ..SqlSelect::default()
        };
        SqlFragment::new(select, header)
    }

    fn apply(
        &self,
        left: JoinSource,
        right: SqlFragment,
        apply_type: ApplyType,
        join_type: JoinType,
        header: Header,
        ctx: &mut CompilationContext,
    ) -> Result<SqlFragment> {
        let mut filter = left.filter;
        let mut columns = left.columns;
        let from = match (apply_type, self.caps.apply_syntax()) {
            (ApplyType::Existence, _) => {
                columns.push(exists_case(right.into_subquery()));
                left.table
            }
            (ApplyType::Scalar(_) | ApplyType::All, Some(_)) => {
                let right = match apply_type {
                    ApplyType::Scalar(ScalarMode::First) => self.take(right, 1, ctx),
                    _ => right,
                };
                let source = derived_source(right, ctx);
                columns.extend(source.columns);
                SqlTable::Join {
                    kind: match join_type {
                        JoinType::Inner => SqlJoinKind::CrossApply,
                        JoinType::LeftOuter => SqlJoinKind::OuterApply,
                    },
                    left: Box::new(left.table),
                    right: Box::new(source.table),
                    on: None,
                }
            }
            (ApplyType::Scalar(mode), None) => {
                let mut right = if right.select.distinct {
                    right.wrap(ctx)
                } else {
                    right
                };
                if mode == ScalarMode::First {
                    right = self.take(right, 1, ctx);
                }
                for i in 0..right.visible() {
                    let mut sub = right.select.clone();
                    sub.columns = vec![right.select.columns[i].clone()];
                    if !sub.has_paging() {
                        sub.order_by.clear();
                    }
                    columns.push(SqlExpr::Subquery(Box::new(sub)));
                }
                if join_type == JoinType::Inner {
                    let exists = SqlExpr::Exists(Box::new(right.into_subquery()));
                    filter = SqlExpr::and_all(filter.into_iter().chain(Some(exists)));
                }
                left.table
            }
            (ApplyType::All, None) => {
                return Err(Error::gap(
                    self.caps.dialect().to_string(),
                    "correlated table joins (APPLY/LATERAL)",
                    ctx.path(),
                ))
            }
        };
        let select = SqlSelect {
            columns: columns
                .into_iter()
                .map(|expr| SqlColumn {
                    expr,
                    alias: String::new(),
                })
                .collect(),
            from: Some(from),
            filter,
            ..SqlSelect::default()
        };
        Ok(SqlFragment::new(select, header))
    }
}

fn exists_case(query: SqlSelect) -> SqlExpr {
    SqlExpr::Case {
        branches: vec![(
            SqlExpr::Exists(Box::new(query)),
            SqlExpr::Literal(Value::Bool(true)),
        )],
        otherwise: Some(Box::new(SqlExpr::Literal(Value::Bool(false)))),
    }
}

/// Places `f` in a FROM clause, inlining its table and filter when it is a
/// plain select over a single table expression.
fn into_source(mut f: SqlFragment, ctx: &mut CompilationContext, allow_join: bool) -> JoinSource {
    let inline = f.is_plain()
        && match &f.select.from {
            Some(SqlTable::Table { .. } | SqlTable::Values { .. } | SqlTable::Derived { .. }) => {
                true
            }
            Some(SqlTable::Join { .. }) => allow_join,
            None => false,
        };
    if inline {
        let columns = f.column_exprs();
        if let Some(table) = f.select.from.take() {
            return JoinSource {
                table,
                columns,
                filter: f.select.filter.take(),
            };
        }
    }
    derived_source(f, ctx)
}

fn derived_source(f: SqlFragment, ctx: &mut CompilationContext) -> JoinSource {
    let alias = ctx.aliases.next("t");
    let visible = f.visible();
    let mut select = f.select;
    select.columns.truncate(visible);
    if !select.has_paging() {
        select.order_by.clear();
    }
    let columns = select
        .columns
        .iter()
        .map(|c| SqlExpr::column(&alias, &c.alias))
        .collect();
    JoinSource {
        table: SqlTable::Derived {
            query: Box::new(select),
            alias,
        },
        columns,
        filter: None,
    }
}

impl Compiler for SqlCompiler {
    fn name(&self) -> &str {
        "sql"
    }

    fn compile(
        &self,
        provider: &ProviderRef,
        ctx: &mut CompilationContext,
        sources: &dyn SourceCompiler,
    ) -> Result<Option<ExecutableProvider>> {
        if let Provider::Apply {
            apply_type: ApplyType::All,
            ..
        } = provider.as_ref()
        {
            if self.caps.apply_syntax().is_none() {
                debug!(
                    path = %ctx.path(),
                    dialect = %self.caps.dialect(),
                    "no table apply syntax, declining"
                );
                return Ok(None);
            }
        }

        let header = provider
            .header()
            .map_err(|e| Error::defect(ctx.path(), e.to_string()))?;
        let mut children = Vec::new();
        let mut child = |edge: &'static str,
                         p: &ProviderRef,
                         ctx: &mut CompilationContext|
         -> Result<SqlFragment> {
            let compiled = sources.compile_source(edge, p, ctx)?;
            let fragment = compiled.fragment.clone();
            children.push(compiled);
            Ok(fragment)
        };

        let fragment = match provider.as_ref() {
            Provider::Index { table } => self.scan(table, None, header, ctx),
            Provider::RangeScan {
                table,
                index,
                ranges,
            } => {
                let mut f = self.scan(table, Some(&index.name), header, ctx);
                let exprs = f.column_exprs();
                let keys = index
                    .key_columns
                    .iter()
                    .map(|k| {
                        exprs.get(k.column).cloned().ok_or_else(|| {
                            Error::defect(
                                ctx.path(),
                                format!(
                                    "index {} key column {} out of range",
                                    index.name, k.column
                                ),
                            )
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                if !ranges.is_full() {
                    f.select.and_where(range_condition(&keys, ranges, ctx));
                }
                f
            }
            Provider::Raw { rows, .. } => self.raw(rows, header, ctx)?,
            Provider::Filter { source, predicate } => {
                let f = child("source", source, ctx)?;
                self.filter(f, predicate, ctx)?
            }
            Provider::Select { source, columns } => {
                let f = child("source", source, ctx)?;
                self.project(f, columns, header, ctx)?
            }
            Provider::Calculate { source, columns } => {
                let f = child("source", source, ctx)?;
                self.calculate(f, columns, header, ctx)?
            }
            Provider::Alias { source, .. } => {
                let mut f = child("source", source, ctx)?;
                f.header = header;
                f.relabel();
                f
            }
            Provider::Sort { source, order } => {
                let f = child("source", source, ctx)?;
                self.sort(f, order, ctx)?
            }
            Provider::Take { source, count } => {
                let f = child("source", source, ctx)?;
                self.take(f, *count, ctx)
            }
            Provider::Skip { source, count } => {
                let f = child("source", source, ctx)?;
                self.skip(f, *count, ctx)
            }
            Provider::Distinct { source } => {
                let f = child("source", source, ctx)?;
                self.distinct(f, ctx)
            }
            Provider::Join {
                left,
                right,
                join_type,
                pairs,
            } => {
                let l = child("left", left, ctx)?;
                let r = child("right", right, ctx)?;
                let l = into_source(l, ctx, true);
                let r = into_source(r, ctx, false);
                let mut terms = Vec::with_capacity(pairs.len());
                for &(a, b) in pairs {
                    match (l.columns.get(a), r.columns.get(b)) {
                        (Some(x), Some(y)) => {
                            terms.push(SqlExpr::binary(BinaryOp::Eq, x.clone(), y.clone()))
                        }
                        _ => {
                            return Err(Error::defect(
                                ctx.path(),
                                format!("join pair ({}, {}) out of range", a, b),
                            ))
                        }
                    }
                }
                self.join(l, r, *join_type, SqlExpr::and_all(terms), header)
            }
            Provider::PredicateJoin {
                left,
                right,
                join_type,
                predicate,
            } => {
                let l = child("left", left, ctx)?;
                let r = child("right", right, ctx)?;
                let l = into_source(l, ctx, true);
                let r = into_source(r, ctx, false);
                let scope: Vec<SqlExpr> = l.columns.iter().chain(&r.columns).cloned().collect();
                let on = compile_expr(predicate, &scope, ctx, true)?;
                self.join(l, r, *join_type, Some(on), header)
            }
            Provider::Apply {
                left,
                right,
                parameter,
                apply_type,
                join_type,
            } => {
                let l = child("left", left, ctx)?;
                let l = into_source(l, ctx, true);
                ctx.push_binding(*parameter, l.columns.clone());
                let r = child("right", right, ctx);
                ctx.pop_binding(*parameter)?;
                self.apply(l, r?, *apply_type, *join_type, header, ctx)?
            }
            Provider::Aggregate {
                source,
                group_by,
                aggregates,
            } => {
                let f = child("source", source, ctx)?;
                self.aggregate(f, group_by, aggregates, header, ctx)?
            }
            Provider::Existence { source, .. } => {
                let f = child("source", source, ctx)?;
                self.existence(f, header)
            }
            Provider::Store { source, name } => {
                let f = child("source", source, ctx)?;
                let alias = ctx.aliases.named(name);
                f.wrap_as(alias)
            }
        };
        trace!(path = %ctx.path(), columns = fragment.visible(), "compiled");

        Ok(Some(ExecutableProvider {
            origin: Arc::clone(provider),
            fragment,
            sources: children,
            compiled_by: self.name().to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{CompiledQuery, CompilerChain, CompilerOptions};
    use crate::dialect::Dialect;
    use crate::dom::SqlStatement;
    use crate::provider::{table, Column, KeyRange, ProviderExt, RangeSet, TableBuilder, TableExt};
    use crate::value::ColumnType;

    fn compile(dialect: Dialect, root: &ProviderRef) -> Result<CompiledQuery> {
        let caps = Capabilities::resolve(dialect)?;
        CompilerChain::with_defaults(caps, CompilerOptions::default()).compile(root)
    }

    fn select(query: &CompiledQuery) -> &SqlSelect {
        match &query.statement {
            SqlStatement::Select(s) => s,
            other => panic!("expected select, got {:?}", other),
        }
    }

    fn range_scan(key: &str) -> ProviderRef {
        let person = TableBuilder::new("Person")
            .columns(&[("Id", ColumnType::Int), ("Email", ColumnType::String)])
            .primary_key(&[0])
            .index("IX_Email", &[1], true)
            .build();
        let index = Arc::clone(person.index("IX_Email").unwrap());
        Arc::new(Provider::RangeScan {
            table: person,
            index,
            ranges: RangeSet::from_ranges([KeyRange::point(vec![Value::from(key)])]),
        })
    }

    #[test]
    fn test_range_scan_hint_follows_dialect() {
        let root = range_scan("x@example.com");
        let q = compile(Dialect::sql_server(11), &root).unwrap();
        let s = select(&q);
        match &s.from {
            Some(SqlTable::Table { hint, .. }) => assert_eq!(hint.as_deref(), Some("IX_Email")),
            other => panic!("expected table, got {:?}", other),
        }
        assert!(s.filter.is_some());

        let q = compile(Dialect::postgres(11, 0), &root).unwrap();
        match &select(&q).from {
            Some(SqlTable::Table { hint, .. }) => assert!(hint.is_none()),
            other => panic!("expected table, got {:?}", other),
        }
    }

    #[test]
    fn test_existence_is_case_over_exists() {
        let t = table("T", &[("a", ColumnType::Int)]);
        let root = t
            .scan()
            .filter(Expr::eq(Expr::col(0), Expr::lit(1i64)))
            .existence("any");
        let q = compile(Dialect::sqlite(), &root).unwrap();
        let s = select(&q);
        assert!(s.from.is_none());
        assert_eq!(s.column_aliases(), vec!["any"]);
        match &s.columns[0].expr {
            SqlExpr::Case { branches, .. } => {
                assert!(matches!(branches[0].0, SqlExpr::Exists(_)))
            }
            other => panic!("expected CASE, got {:?}", other),
        }
    }

    #[test]
    fn test_raw_row_width_is_defect() {
        let root: ProviderRef = Arc::new(Provider::Raw {
            name: "r".into(),
            header: Header::new(vec![Column::new("a", ColumnType::Int)]),
            rows: vec![vec![Value::Int(1), Value::Int(2)]],
        });
        let err = compile(Dialect::sqlite(), &root).unwrap_err();
        assert!(matches!(err, Error::TranslationDefect { .. }), "{:?}", err);
    }

    #[test]
    fn test_distinct_after_take_wraps() {
        let t = table("T", &[("a", ColumnType::Int)]);
        let root = t.scan().sort(vec![SortKey::asc(0)]).take(3).distinct();
        let q = compile(Dialect::postgres(11, 0), &root).unwrap();
        let s = select(&q);
        assert!(s.distinct);
        assert_eq!(s.limit, None);
        match &s.from {
            Some(SqlTable::Derived { query, .. }) => assert_eq!(query.limit, Some(3)),
            other => panic!("expected derived table, got {:?}", other),
        }
    }

    #[test]
    fn test_aggregate_groups_and_counts() {
        let t = table("T", &[("a", ColumnType::Int), ("b", ColumnType::Int)]);
        let root = t.scan().aggregate(
            vec![1],
            vec![AggregateColumn {
                name: "n".into(),
                kind: AggregateKind::Count,
                column: None,
            }],
        );
        let q = compile(Dialect::mysql(8, 0), &root).unwrap();
        let s = select(&q);
        assert_eq!(s.group_by.len(), 1);
        assert_eq!(s.column_aliases(), vec!["b", "n"]);
        assert!(matches!(
            s.columns[1].expr,
            SqlExpr::Aggregate { arg: None, .. }
        ));
    }

    #[test]
    fn test_sum_without_column_is_defect() {
        let t = table("T", &[("a", ColumnType::Int)]);
        let root = t.scan().aggregate(
            vec![],
            vec![AggregateColumn {
                name: "s".into(),
                kind: AggregateKind::Sum,
                column: None,
            }],
        );
        assert!(compile(Dialect::sqlite(), &root).is_err());
    }

    #[test]
    fn test_left_join_keeps_right_filter_in_on() {
        let l = table("L", &[("id", ColumnType::Int)]);
        let r = table("R", &[("id", ColumnType::Int), ("flag", ColumnType::Bool)]);
        let root = l.scan().left_join(
            r.scan().filter(Expr::col(1)),
            vec![(0, 0)],
        );
        let q = compile(Dialect::postgres(11, 0), &root).unwrap();
        let s = select(&q);
        assert!(s.filter.is_none());
        match &s.from {
            Some(SqlTable::Join { kind, on, .. }) => {
                assert_eq!(*kind, SqlJoinKind::LeftOuter);
                assert!(matches!(on, Some(SqlExpr::Binary { op: BinaryOp::And, .. })));
            }
            other => panic!("expected join, got {:?}", other),
        }
    }

    #[test]
    fn test_take_zero_is_empty() {
        let t = table("T", &[("a", ColumnType::Int)]);
        let q = compile(Dialect::sqlite(), &t.scan().take(0)).unwrap();
        assert_eq!(
            select(&q).filter,
            Some(SqlExpr::Literal(Value::Bool(false)))
        );
    }
}
