//! SELECT, table expression and scalar expression rendering.

use super::{format_literal, Section, SqlNode, Translator, TranslatorContext};
use crate::dialect::capabilities::{
    ApplySyntax, BooleanStyle, ConcatStyle, DateAddStyle, FullTextStyle, IndexHintStyle,
    Pagination, Placeholder,
};
use crate::dialect::{Capability, Feature};
use crate::dom::{SqlExpr, SqlJoinKind, SqlOrder, SqlSelect, SqlTable};
use crate::error::{Error, Result};
use crate::provider::{AggregateKind, BinaryOp, Function, UnaryOp};
use crate::value::Value;

const SELECT_SECTIONS: [Section; 7] = [
    Section::Entry,
    Section::Columns,
    Section::From,
    Section::Where,
    Section::GroupBy,
    Section::OrderBy,
    Section::Paging,
];

impl Translator {
    /// Full SELECT text: each section translated in order, empty sections
    /// skipped.
    pub(super) fn select(&self, ctx: &mut TranslatorContext, select: &SqlSelect) -> Result<String> {
        ctx.enter("Select");
        let mut parts = Vec::new();
        for section in SELECT_SECTIONS {
            let text = self.translate(ctx, SqlNode::Select(select), section);
            match text {
                Ok(text) if !text.is_empty() => parts.push(text),
                Ok(_) => {}
                Err(e) => {
                    ctx.leave();
                    return Err(e);
                }
            }
        }
        ctx.leave();
        Ok(parts.join(" "))
    }

    pub(super) fn select_section(
        &self,
        ctx: &mut TranslatorContext,
        select: &SqlSelect,
        section: Section,
    ) -> Result<String> {
        match section {
            // SELECT [DISTINCT] [TOP n]
            Section::Entry => {
                let mut entry = String::from("SELECT");
                if select.distinct {
                    entry.push_str(" DISTINCT");
                }
                if let Some(top) = self.top(ctx, select)? {
                    entry.push_str(&format!(" TOP {}", top));
                }
                Ok(entry)
            }
            Section::Columns => {
                if select.columns.is_empty() {
                    return Ok(format!("NULL AS {}", self.quote("_empty")));
                }
                let mut items = Vec::with_capacity(select.columns.len());
                for column in &select.columns {
                    let expr = self.value(ctx, &column.expr)?;
                    items.push(format!("{} AS {}", expr, self.quote(&column.alias)));
                }
                Ok(items.join(", "))
            }
            Section::From => match &select.from {
                Some(table) => {
                    ctx.enter("From");
                    let text = self.table(ctx, table);
                    ctx.leave();
                    Ok(format!("FROM {}", text?))
                }
                None if select.filter.is_some() => Ok(self.dummy_from()),
                None => Ok(String::new()),
            },
            Section::Where => match &select.filter {
                Some(filter) => Ok(format!("WHERE {}", self.predicate(ctx, filter)?)),
                None => Ok(String::new()),
            },
            Section::GroupBy => {
                if select.group_by.is_empty() {
                    return Ok(String::new());
                }
                let groups = select
                    .group_by
                    .iter()
                    .map(|g| self.value(ctx, g))
                    .collect::<Result<Vec<_>>>()?;
                Ok(format!("GROUP BY {}", groups.join(", ")))
            }
            Section::OrderBy => {
                if !select.order_by.is_empty() {
                    return Ok(format!("ORDER BY {}", self.order_list(ctx, &select.order_by)?));
                }
                // OFFSET ... FETCH needs an ORDER BY to attach to
                if select.offset.is_some() && self.caps.pagination() == Pagination::OffsetFetch {
                    return Ok("ORDER BY (SELECT NULL)".to_string());
                }
                Ok(String::new())
            }
            Section::Paging => Ok(self.paging(select)),
            Section::Exit => Ok(String::new()),
            other => Err(Error::defect(
                ctx.path(),
                format!("Select has no {:?} section", other),
            )),
        }
    }

    /// Row count rendered as `TOP n`, if the dialect pages that way.
    fn top(&self, ctx: &TranslatorContext, select: &SqlSelect) -> Result<Option<u64>> {
        match self.caps.pagination() {
            Pagination::Top => {
                if select.offset.is_some() {
                    return Err(Error::defect(
                        ctx.path(),
                        format!("{} has no OFFSET; skip must be emulated", self.dialect()),
                    ));
                }
                Ok(select.limit)
            }
            Pagination::OffsetFetch if select.offset.is_none() => Ok(select.limit),
            _ => Ok(None),
        }
    }

    fn paging(&self, select: &SqlSelect) -> String {
        let mut parts = Vec::new();
        match self.caps.pagination() {
            Pagination::LimitOffset { unbounded } => {
                match (select.limit, select.offset, unbounded) {
                    (Some(limit), _, _) => parts.push(format!("LIMIT {}", limit)),
                    (None, Some(_), Some(all)) => parts.push(format!("LIMIT {}", all)),
                    _ => {}
                }
                if let Some(offset) = select.offset {
                    parts.push(format!("OFFSET {}", offset));
                }
            }
            Pagination::OffsetFetch => {
                if let Some(offset) = select.offset {
                    parts.push(format!("OFFSET {} ROWS", offset));
                    if let Some(limit) = select.limit {
                        parts.push(format!("FETCH NEXT {} ROWS ONLY", limit));
                    }
                }
            }
            Pagination::Top => {}
        }
        parts.join(" ")
    }

    fn dummy_from(&self) -> String {
        match self.caps.get(Feature::DummyTable) {
            Some(Capability::TypeName(name)) => format!("FROM {}", name),
            _ => String::new(),
        }
    }

    fn order_list(&self, ctx: &mut TranslatorContext, order: &[SqlOrder]) -> Result<String> {
        let items = order
            .iter()
            .map(|o| {
                let expr = self.value(ctx, &o.expr)?;
                Ok(format!("{} {}", expr, if o.ascending { "ASC" } else { "DESC" }))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(items.join(", "))
    }

    pub(super) fn table(&self, ctx: &mut TranslatorContext, table: &SqlTable) -> Result<String> {
        match table {
            SqlTable::Table { name, alias, hint } => {
                let mut text = format!("{} AS {}", self.quote(name), self.quote(alias));
                if let (Some(index), Some(style)) = (hint, self.caps.index_hint()) {
                    text.push_str(&match style {
                        IndexHintStyle::TableHint => format!(" WITH (INDEX({}))", self.quote(index)),
                        IndexHintStyle::ForceIndex => format!(" FORCE INDEX ({})", self.quote(index)),
                        IndexHintStyle::IndexedBy => format!(" INDEXED BY {}", self.quote(index)),
                    });
                }
                Ok(text)
            }
            SqlTable::Derived { query, alias } => {
                ctx.enter(format!("Derived({})", alias));
                let inner = self.select(ctx, query);
                ctx.leave();
                Ok(format!("({}) AS {}", inner?, self.quote(alias)))
            }
            SqlTable::Values {
                rows,
                columns,
                alias,
            } => self.values(ctx, rows, columns, alias),
            SqlTable::Join {
                kind,
                left,
                right,
                on,
            } => {
                ctx.enter("Join");
                let result = self.join(ctx, *kind, left, right, on.as_ref());
                ctx.leave();
                result
            }
        }
    }

    fn join(
        &self,
        ctx: &mut TranslatorContext,
        kind: SqlJoinKind,
        left: &SqlTable,
        right: &SqlTable,
        on: Option<&SqlExpr>,
    ) -> Result<String> {
        let l = self.table(ctx, left)?;
        let mut r = self.table(ctx, right)?;
        if matches!(right, SqlTable::Join { .. }) {
            r = format!("({})", r);
        }
        let condition = |ctx: &mut TranslatorContext| -> Result<String> {
            let on = on.ok_or_else(|| {
                Error::defect(ctx.path(), format!("{:?} join without a condition", kind))
            })?;
            self.predicate(ctx, on)
        };
        Ok(match kind {
            SqlJoinKind::Inner => format!("{} INNER JOIN {} ON {}", l, r, condition(ctx)?),
            SqlJoinKind::LeftOuter => format!("{} LEFT OUTER JOIN {} ON {}", l, r, condition(ctx)?),
            SqlJoinKind::Cross => format!("{} CROSS JOIN {}", l, r),
            SqlJoinKind::CrossApply | SqlJoinKind::OuterApply => {
                let outer = kind == SqlJoinKind::OuterApply;
                match self.caps.apply_syntax() {
                    Some(ApplySyntax::CrossApply) if outer => format!("{} OUTER APPLY {}", l, r),
                    Some(ApplySyntax::CrossApply) => format!("{} CROSS APPLY {}", l, r),
                    Some(ApplySyntax::Lateral) if outer => format!(
                        "{} LEFT OUTER JOIN LATERAL {} ON {}",
                        l,
                        r,
                        self.predicate_literal(ctx, &Value::Bool(true))?
                    ),
                    Some(ApplySyntax::Lateral) => format!("{} CROSS JOIN LATERAL {}", l, r),
                    None => {
                        return Err(Error::gap(
                            self.dialect().to_string(),
                            Feature::Apply.description(),
                            ctx.path(),
                        ))
                    }
                }
            }
        })
    }

    /// Inline rows: a `VALUES` constructor where supported, otherwise a
    /// UNION ALL of constant selects.
    fn values(
        &self,
        ctx: &mut TranslatorContext,
        rows: &[Vec<Value>],
        columns: &[String],
        alias: &str,
    ) -> Result<String> {
        let names: Vec<String> = columns.iter().map(|c| self.quote(c)).collect();
        let mut rendered = Vec::with_capacity(rows.len());
        for row in rows {
            let values = row
                .iter()
                .map(|v| format_literal(&self.caps, v, &ctx.path()))
                .collect::<Result<Vec<_>>>()?;
            rendered.push(values);
        }
        if rendered.is_empty() {
            let nulls: Vec<String> = names.iter().map(|n| format!("NULL AS {}", n)).collect();
            let mut select = format!("SELECT {}", nulls.join(", "));
            let from = self.dummy_from();
            if !from.is_empty() {
                select.push(' ');
                select.push_str(&from);
            }
            select.push_str(&format!(
                " WHERE {}",
                self.predicate_literal(ctx, &Value::Bool(false))?
            ));
            return Ok(format!("({}) AS {}", select, self.quote(alias)));
        }
        if self.caps.supports(Feature::ValuesTable) {
            let tuples: Vec<String> = rendered
                .iter()
                .map(|values| format!("({})", values.join(", ")))
                .collect();
            return Ok(format!(
                "(VALUES {}) AS {} ({})",
                tuples.join(", "),
                self.quote(alias),
                names.join(", ")
            ));
        }
        let selects: Vec<String> = rendered
            .iter()
            .map(|values| {
                let items: Vec<String> = values
                    .iter()
                    .zip(&names)
                    .map(|(v, n)| format!("{} AS {}", v, n))
                    .collect();
                format!("SELECT {}", items.join(", "))
            })
            .collect();
        Ok(format!("({}) AS {}", selects.join(" UNION ALL "), self.quote(alias)))
    }

    /// Boolean literal usable as a WHERE/ON condition.
    pub(super) fn predicate_literal(&self, ctx: &TranslatorContext, value: &Value) -> Result<String> {
        match (value, self.caps.boolean_style()) {
            (Value::Bool(b), BooleanStyle::Bit) => Ok(if *b { "1 = 1" } else { "1 = 0" }.to_string()),
            (v, _) => format_literal(&self.caps, v, &ctx.path()),
        }
    }

    /// Expression in a value position. Where booleans are bit values, a
    /// predicate becomes `CASE WHEN p THEN 1 ELSE 0 END`.
    pub(super) fn value(&self, ctx: &mut TranslatorContext, expr: &SqlExpr) -> Result<String> {
        if self.caps.boolean_style() == BooleanStyle::Bit && expr.is_predicate() {
            return Ok(format!("CASE WHEN {} THEN 1 ELSE 0 END", self.expr(ctx, expr)?));
        }
        self.expr(ctx, expr)
    }

    /// Expression in a boolean position. Where booleans are bit values, a
    /// bit-valued expression is compared with 1.
    pub(super) fn predicate(&self, ctx: &mut TranslatorContext, expr: &SqlExpr) -> Result<String> {
        if self.caps.boolean_style() != BooleanStyle::Bit || expr.is_predicate() {
            return self.expr(ctx, expr);
        }
        match expr {
            SqlExpr::Literal(v) => self.predicate_literal(ctx, v),
            other => Ok(format!("({} = 1)", self.expr(ctx, other)?)),
        }
    }

    /// Operand of an operator, parenthesized when it is itself an operation.
    fn operand(&self, ctx: &mut TranslatorContext, expr: &SqlExpr, boolean: bool) -> Result<String> {
        let text = if boolean {
            self.predicate(ctx, expr)?
        } else {
            self.value(ctx, expr)?
        };
        Ok(match expr {
            SqlExpr::Binary { .. } => format!("({})", text),
            _ => text,
        })
    }

    fn expr(&self, ctx: &mut TranslatorContext, expr: &SqlExpr) -> Result<String> {
        Ok(match expr {
            SqlExpr::Column { table, name } => format!("{}.{}", self.quote(table), self.quote(name)),
            SqlExpr::Literal(v) => format_literal(&self.caps, v, &ctx.path())?,
            SqlExpr::Parameter(i) => {
                ctx.bind(*i);
                match self.caps.placeholder() {
                    Placeholder::AtName => format!("@p{}", i),
                    Placeholder::Dollar => format!("${}", i + 1),
                    Placeholder::Question => "?".to_string(),
                }
            }
            SqlExpr::Binary { op, left, right } => self.binary(ctx, *op, left, right)?,
            SqlExpr::Unary { op, operand } => match op {
                UnaryOp::Not => format!("NOT ({})", self.predicate(ctx, operand)?),
                UnaryOp::Negate => format!("-({})", self.value(ctx, operand)?),
            },
            SqlExpr::IsNull { operand, negated } => format!(
                "{} IS {}NULL",
                self.operand(ctx, operand, false)?,
                if *negated { "NOT " } else { "" }
            ),
            SqlExpr::Function { func, args } => self.function(ctx, *func, args)?,
            SqlExpr::Aggregate { kind, arg } => {
                let arg = match arg {
                    Some(a) => self.operand(ctx, a, false)?,
                    None => "*".to_string(),
                };
                match kind {
                    AggregateKind::Count => format!("COUNT({})", arg),
                    AggregateKind::Sum => format!("SUM({})", arg),
                    AggregateKind::Min => format!("MIN({})", arg),
                    AggregateKind::Max => format!("MAX({})", arg),
                    // integer averages would truncate
                    AggregateKind::Avg => format!("AVG({} * 1.0)", arg),
                }
            }
            SqlExpr::Case {
                branches,
                otherwise,
            } => {
                let mut text = String::from("CASE");
                for (when, then) in branches {
                    let when = self.predicate(ctx, when)?;
                    let then = self.value(ctx, then)?;
                    text.push_str(&format!(" WHEN {} THEN {}", when, then));
                }
                if let Some(e) = otherwise {
                    text.push_str(&format!(" ELSE {}", self.value(ctx, e)?));
                }
                text.push_str(" END");
                text
            }
            SqlExpr::Exists(query) => format!("EXISTS ({})", self.subquery(ctx, query)?),
            SqlExpr::Subquery(query) => format!("({})", self.subquery(ctx, query)?),
            SqlExpr::RowNumber { order_by } => {
                let order = if order_by.is_empty() {
                    "(SELECT NULL)".to_string()
                } else {
                    self.order_list(ctx, order_by)?
                };
                format!("ROW_NUMBER() OVER (ORDER BY {})", order)
            }
            SqlExpr::FullText { columns, query } => self.full_text(ctx, columns, query)?,
        })
    }

    fn subquery(&self, ctx: &mut TranslatorContext, query: &SqlSelect) -> Result<String> {
        ctx.enter("Subquery");
        let text = self.select(ctx, query);
        ctx.leave();
        text
    }

    fn binary(
        &self,
        ctx: &mut TranslatorContext,
        op: BinaryOp,
        left: &SqlExpr,
        right: &SqlExpr,
    ) -> Result<String> {
        let boolean = matches!(op, BinaryOp::And | BinaryOp::Or);
        let l = self.operand(ctx, left, boolean)?;
        let r = self.operand(ctx, right, boolean)?;
        let symbol = match op {
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Like => "LIKE",
            BinaryOp::Concat => {
                return Ok(match self.concat_style(ctx)? {
                    ConcatStyle::Plus => format!("{} + {}", l, r),
                    ConcatStyle::Pipes => format!("{} || {}", l, r),
                    ConcatStyle::Function => format!("CONCAT({}, {})", l, r),
                })
            }
        };
        Ok(format!("{} {} {}", l, symbol, r))
    }

    fn concat_style(&self, ctx: &TranslatorContext) -> Result<ConcatStyle> {
        match self.caps.require(Feature::Concat, &ctx.path())? {
            Capability::Concat(style) => Ok(style),
            other => Err(Error::Config(format!("concat capability {:?}", other))),
        }
    }

    fn function(&self, ctx: &mut TranslatorContext, func: Function, args: &[SqlExpr]) -> Result<String> {
        let rendered = args
            .iter()
            .map(|a| self.value(ctx, a))
            .collect::<Result<Vec<_>>>()?;
        let arity = |n: usize| -> Result<()> {
            if rendered.len() == n {
                Ok(())
            } else {
                Err(Error::defect(
                    ctx.path(),
                    format!("{:?} takes {} arguments, got {}", func, n, rendered.len()),
                ))
            }
        };
        let name = match func {
            Function::Upper => "UPPER",
            Function::Lower => "LOWER",
            Function::Abs => "ABS",
            Function::Coalesce => "COALESCE",
            Function::Length => self.caps.function_name(Feature::Length, &ctx.path())?,
            Function::Substring => {
                arity(3)?;
                self.caps.function_name(Feature::Substring, &ctx.path())?
            }
            Function::AddInterval => {
                arity(2)?;
                return self.add_interval(ctx, &rendered[0], &rendered[1]);
            }
        };
        Ok(format!("{}({})", name, rendered.join(", ")))
    }

    fn add_interval(&self, ctx: &TranslatorContext, datetime: &str, interval: &str) -> Result<String> {
        let style = match self.caps.require(Feature::DateAdd, &ctx.path())? {
            Capability::DateAdd(style) => style,
            other => return Err(Error::Config(format!("date add capability {:?}", other))),
        };
        Ok(match style {
            // ticks split into whole days and milliseconds to stay in int range
            DateAddStyle::DateAddFunction => format!(
                "DATEADD(ms, ({} / 10000) % 86400000, DATEADD(day, {} / 864000000000, {}))",
                interval, interval, datetime
            ),
            DateAddStyle::Plus => format!("({} + {})", datetime, interval),
            DateAddStyle::DateAddMicrosecond => {
                format!("DATE_ADD({}, INTERVAL {} MICROSECOND)", datetime, interval)
            }
            DateAddStyle::Strftime => format!(
                "strftime('%Y-%m-%d %H:%M:%f', {}, ({} / 1000000.0) || ' seconds')",
                datetime, interval
            ),
        })
    }

    fn full_text(
        &self,
        ctx: &mut TranslatorContext,
        columns: &[SqlExpr],
        query: &SqlExpr,
    ) -> Result<String> {
        let style = match self.caps.require(Feature::FullText, &ctx.path())? {
            Capability::FullText(style) => style,
            other => return Err(Error::Config(format!("full-text capability {:?}", other))),
        };
        let cols = columns
            .iter()
            .map(|c| self.value(ctx, c))
            .collect::<Result<Vec<_>>>()?;
        let query = self.value(ctx, query)?;
        Ok(match style {
            FullTextStyle::FreeText => format!("FREETEXT(({}), {})", cols.join(", "), query),
            FullTextStyle::TsQuery => format!(
                "to_tsvector({}) @@ plainto_tsquery({})",
                cols.join(" || ' ' || "),
                query
            ),
            FullTextStyle::MatchAgainst => format!("MATCH ({}) AGAINST ({})", cols.join(", "), query),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::dom::{SqlColumn, SqlStatement};

    fn translator(dialect: Dialect) -> Translator {
        Translator::new(dialect).unwrap()
    }

    fn scan(name: &str, alias: &str) -> SqlTable {
        SqlTable::Table {
            name: name.into(),
            alias: alias.into(),
            hint: None,
        }
    }

    fn column(expr: SqlExpr, alias: &str) -> SqlColumn {
        SqlColumn {
            expr,
            alias: alias.into(),
        }
    }

    fn paged(limit: Option<u64>, offset: Option<u64>) -> SqlSelect {
        SqlSelect {
            columns: vec![column(SqlExpr::column("a0", "Id"), "Id")],
            from: Some(scan("T", "a0")),
            order_by: vec![SqlOrder {
                expr: SqlExpr::column("a0", "Id"),
                ascending: true,
            }],
            limit,
            offset,
            ..SqlSelect::default()
        }
    }

    fn render(t: &Translator, s: SqlSelect) -> String {
        t.render(&SqlStatement::Select(s)).unwrap().sql
    }

    #[test]
    fn test_pagination_styles() {
        assert_eq!(
            render(&translator(Dialect::postgres(11, 0)), paged(Some(5), Some(3))),
            "SELECT \"a0\".\"Id\" AS \"Id\" FROM \"T\" AS \"a0\" ORDER BY \"a0\".\"Id\" ASC LIMIT 5 OFFSET 3"
        );
        assert_eq!(
            render(&translator(Dialect::sql_server(11)), paged(Some(5), Some(3))),
            "SELECT [a0].[Id] AS [Id] FROM [T] AS [a0] ORDER BY [a0].[Id] ASC OFFSET 3 ROWS FETCH NEXT 5 ROWS ONLY"
        );
        assert_eq!(
            render(&translator(Dialect::sql_server(10)), paged(Some(5), None)),
            "SELECT TOP 5 [a0].[Id] AS [Id] FROM [T] AS [a0] ORDER BY [a0].[Id] ASC"
        );
        assert_eq!(
            render(&translator(Dialect::mysql(8, 0)), paged(None, Some(3))),
            "SELECT `a0`.`Id` AS `Id` FROM `T` AS `a0` ORDER BY `a0`.`Id` ASC LIMIT 18446744073709551615 OFFSET 3"
        );
    }

    #[test]
    fn test_offset_without_native_paging_is_defect() {
        let t = translator(Dialect::sql_server(9));
        let err = t.render(&SqlStatement::Select(paged(None, Some(3)))).unwrap_err();
        assert!(matches!(err, Error::TranslationDefect { .. }));
    }

    #[test]
    fn test_bit_booleans_convert_between_positions() {
        let t = translator(Dialect::sql_server(11));
        let flag = SqlExpr::column("a0", "Active");
        let select = SqlSelect {
            columns: vec![column(
                SqlExpr::binary(BinaryOp::Gt, SqlExpr::column("a0", "Id"), SqlExpr::Literal(Value::Int(1))),
                "big",
            )],
            from: Some(scan("T", "a0")),
            filter: Some(SqlExpr::and(flag, SqlExpr::Literal(Value::Bool(true)))),
            ..SqlSelect::default()
        };
        assert_eq!(
            render(&t, select),
            "SELECT CASE WHEN [a0].[Id] > 1 THEN 1 ELSE 0 END AS [big] FROM [T] AS [a0] WHERE ([a0].[Active] = 1) AND 1 = 1"
        );
    }

    #[test]
    fn test_apply_syntax_per_dialect() {
        let derived = SqlTable::Derived {
            query: Box::new(SqlSelect {
                columns: vec![column(SqlExpr::column("a1", "Qty"), "Qty")],
                from: Some(scan("Items", "a1")),
                ..SqlSelect::default()
            }),
            alias: "t2".into(),
        };
        let select = SqlSelect {
            columns: vec![column(SqlExpr::column("t2", "Qty"), "Qty")],
            from: Some(SqlTable::Join {
                kind: SqlJoinKind::OuterApply,
                left: Box::new(scan("Orders", "a0")),
                right: Box::new(derived),
                on: None,
            }),
            ..SqlSelect::default()
        };
        let mssql = render(&translator(Dialect::sql_server(11)), select.clone());
        assert!(mssql.contains("[Orders] AS [a0] OUTER APPLY (SELECT"));
        let pg = render(&translator(Dialect::postgres(9, 3)), select.clone());
        assert!(pg.contains("LEFT OUTER JOIN LATERAL (SELECT"));
        assert!(pg.ends_with("ON TRUE"));
        let err = translator(Dialect::postgres(9, 1))
            .render(&SqlStatement::Select(select))
            .unwrap_err();
        assert!(matches!(err, Error::CapabilityGap { .. }));
    }

    #[test]
    fn test_values_fallback_without_constructor() {
        let select = SqlSelect {
            columns: vec![column(SqlExpr::column("v0", "c0"), "x")],
            from: Some(SqlTable::Values {
                rows: vec![vec![Value::Int(1)], vec![Value::Int(2)]],
                columns: vec!["c0".into()],
                alias: "v0".into(),
            }),
            ..SqlSelect::default()
        };
        let my = render(&translator(Dialect::mysql(8, 0)), select.clone());
        assert!(my.contains("(SELECT 1 AS `c0` UNION ALL SELECT 2 AS `c0`) AS `v0`"));
        let pg = render(&translator(Dialect::postgres(11, 0)), select);
        assert!(pg.contains("(VALUES (1), (2)) AS \"v0\" (\"c0\")"));
    }

    #[test]
    fn test_parameter_placeholders() {
        let select = SqlSelect {
            columns: vec![column(SqlExpr::column("a0", "Id"), "Id")],
            from: Some(scan("T", "a0")),
            filter: Some(SqlExpr::and(
                SqlExpr::binary(BinaryOp::Eq, SqlExpr::column("a0", "Id"), SqlExpr::Parameter(1)),
                SqlExpr::binary(BinaryOp::Eq, SqlExpr::column("a0", "Id"), SqlExpr::Parameter(0)),
            )),
            ..SqlSelect::default()
        };
        let pg = translator(Dialect::postgres(11, 0))
            .render(&SqlStatement::Select(select.clone()))
            .unwrap();
        assert!(pg.sql.contains("$2") && pg.sql.contains("$1"));
        let lite = translator(Dialect::sqlite())
            .render(&SqlStatement::Select(select))
            .unwrap();
        assert_eq!(lite.parameter_order, vec![1, 0]);
        assert_eq!(lite.sql.matches('?').count(), 2);
    }

    #[test]
    fn test_date_add_and_full_text() {
        let add = SqlExpr::Function {
            func: Function::AddInterval,
            args: vec![
                SqlExpr::column("a0", "At"),
                SqlExpr::Literal(Value::Interval(chrono::Duration::seconds(1))),
            ],
        };
        let mut ctx = TranslatorContext::new();
        let pg = translator(Dialect::postgres(11, 0));
        assert_eq!(
            pg.value(&mut ctx, &add).unwrap(),
            "(\"a0\".\"At\" + INTERVAL '0 days 00:00:01.000000')"
        );
        let lite = translator(Dialect::sqlite());
        let text = SqlExpr::FullText {
            columns: vec![SqlExpr::column("a0", "Body")],
            query: Box::new(SqlExpr::Literal(Value::from("rust"))),
        };
        assert!(matches!(
            lite.predicate(&mut ctx, &text),
            Err(Error::CapabilityGap { .. })
        ));
        let my = translator(Dialect::mysql(8, 0));
        assert_eq!(
            my.predicate(&mut ctx, &text).unwrap(),
            "MATCH (`a0`.`Body`) AGAINST ('rust')"
        );
    }

    #[test]
    fn test_index_hint_rendering() {
        let table = SqlTable::Table {
            name: "Person".into(),
            alias: "a0".into(),
            hint: Some("IX_Email".into()),
        };
        let mut ctx = TranslatorContext::new();
        assert_eq!(
            translator(Dialect::sql_server(11)).table(&mut ctx, &table).unwrap(),
            "[Person] AS [a0] WITH (INDEX([IX_Email]))"
        );
        assert_eq!(
            translator(Dialect::sqlite()).table(&mut ctx, &table).unwrap(),
            "\"Person\" AS \"a0\" INDEXED BY \"IX_Email\""
        );
        assert_eq!(
            translator(Dialect::postgres(11, 0)).table(&mut ctx, &table).unwrap(),
            "\"Person\" AS \"a0\""
        );
    }
}
