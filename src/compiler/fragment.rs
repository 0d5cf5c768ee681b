//! Compiled SQL fragments.
//!
//! A fragment is a complete SELECT whose first `header.len()` columns are the
//! provider's columns. Trailing columns are hidden: they only exist so that
//! ordering survives projections and row-number paging. Parents either merge
//! into the fragment's select or wrap it as a derived table.

use super::context::CompilationContext;
use crate::dom::{SqlColumn, SqlExpr, SqlOrder, SqlSelect, SqlTable};
use crate::provider::Header;

#[derive(Debug, Clone, PartialEq)]
pub struct SqlFragment {
    pub select: SqlSelect,
    pub header: Header,
    /// Row order as (select column index, ascending).
    pub ordering: Vec<(usize, bool)>,
}

impl SqlFragment {
    pub fn new(select: SqlSelect, header: Header) -> Self {
        let mut fragment = Self {
            select,
            header,
            ordering: Vec::new(),
        };
        fragment.relabel();
        fragment
    }

    pub fn visible(&self) -> usize {
        self.header.len()
    }

    pub fn hidden(&self) -> usize {
        self.select.columns.len() - self.visible()
    }

    /// Expressions of the visible columns, in the select's own scope.
    pub fn column_exprs(&self) -> Vec<SqlExpr> {
        self.select.columns[..self.visible()]
            .iter()
            .map(|c| c.expr.clone())
            .collect()
    }

    /// A select a row-level operator can merge into: no grouping, paging,
    /// distinct or window function.
    pub fn is_plain(&self) -> bool {
        !self.select.distinct
            && !self.select.is_grouped()
            && !self.select.has_paging()
            && !self.select.has_window()
    }

    /// Reassigns column aliases: visible columns from header names, hidden
    /// columns as `_h<n>`, all unique within the select.
    pub fn relabel(&mut self) {
        let visible = self.visible();
        let mut used: Vec<String> = Vec::with_capacity(self.select.columns.len());
        for (i, column) in self.select.columns.iter_mut().enumerate() {
            let base = match self.header.columns.get(i) {
                Some(c) if i < visible => c.name.clone(),
                _ => "_h".to_string(),
            };
            let mut alias = base.clone();
            let mut n = 1;
            while used.contains(&alias) {
                alias = format!("{}_{}", base, n);
                n += 1;
            }
            used.push(alias.clone());
            column.alias = alias;
        }
    }

    /// Makes this fragment a derived table under a fresh alias.
    pub fn wrap(self, ctx: &mut CompilationContext) -> SqlFragment {
        let alias = ctx.aliases.next("t");
        self.wrap_as(alias)
    }

    pub fn wrap_as(mut self, alias: String) -> SqlFragment {
        if !self.select.has_paging() {
            self.select.order_by.clear();
        }
        let columns = self
            .select
            .columns
            .iter()
            .map(|c| SqlColumn {
                expr: SqlExpr::column(&alias, &c.alias),
                alias: c.alias.clone(),
            })
            .collect();
        let outer = SqlSelect {
            columns,
            from: Some(SqlTable::Derived {
                query: Box::new(self.select),
                alias,
            }),
            ..SqlSelect::default()
        };
        SqlFragment {
            select: outer,
            header: self.header,
            ordering: self.ordering,
        }
    }

    /// Drops hidden columns together with any ordering that needs them.
    pub fn drop_hidden(&mut self) {
        let visible = self.visible();
        self.select.columns.truncate(visible);
        let keep = self
            .ordering
            .iter()
            .take_while(|(i, _)| *i < visible)
            .count();
        self.ordering.truncate(keep);
    }

    pub fn push_hidden(&mut self, expr: SqlExpr) -> usize {
        self.select.columns.push(SqlColumn {
            expr,
            alias: String::new(),
        });
        self.relabel();
        self.select.columns.len() - 1
    }

    /// ORDER BY items for the current ordering. Constant keys are skipped:
    /// they do not order anything and some dialects read them as positions.
    pub fn ordering_exprs(&self) -> Vec<SqlOrder> {
        self.ordering
            .iter()
            .filter_map(|&(i, ascending)| {
                let expr = self.select.columns.get(i)?.expr.clone();
                match expr {
                    SqlExpr::Literal(_) | SqlExpr::Parameter(_) => None,
                    expr => Some(SqlOrder { expr, ascending }),
                }
            })
            .collect()
    }

    /// Pins the current ordering into the select before paging is added.
    pub fn pin_ordering(&mut self) {
        if !self.select.has_paging() {
            self.select.order_by = self.ordering_exprs();
        }
    }

    /// Final statement: ordering re-applied, hidden columns removed.
    pub fn finish(mut self) -> SqlSelect {
        self.select.order_by = self.ordering_exprs();
        let visible = self.visible();
        self.select.columns.truncate(visible);
        self.select
    }

    /// Sub-select usable under EXISTS: hidden columns and non-paging ORDER
    /// BY removed.
    pub fn into_subquery(mut self) -> SqlSelect {
        if !self.select.has_paging() {
            self.select.order_by.clear();
        }
        if !self.select.distinct {
            let visible = self.visible();
            self.select.columns.truncate(visible);
        }
        self.select
    }
}
