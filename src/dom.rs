/// Vendor-agnostic SQL DOM.
///
/// The compiler lowers provider trees into these nodes and the translator
/// renders them per dialect. Nodes are plain owned trees: a fragment that is
/// reused somewhere else is cloned, never shared mutably.
use serde::Serialize;

use crate::provider::{AggregateKind, BinaryOp, Function, UnaryOp};
use crate::value::{ColumnType, Value};

/// A SELECT statement or sub-select.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SqlSelect {
    pub distinct: bool,
    pub columns: Vec<SqlColumn>,
    pub from: Option<SqlTable>,
    pub filter: Option<SqlExpr>,
    pub group_by: Vec<SqlExpr>,
    pub order_by: Vec<SqlOrder>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlColumn {
    pub expr: SqlExpr,
    pub alias: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlOrder {
    pub expr: SqlExpr,
    pub ascending: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SqlJoinKind {
    Inner,
    LeftOuter,
    Cross,
    /// Correlated join; the right side sees the left side's columns.
    CrossApply,
    OuterApply,
}

/// Table expression in a FROM clause.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SqlTable {
    Table {
        name: String,
        alias: String,
        /// Index the scan should use.
        hint: Option<String>,
    },
    Derived {
        query: Box<SqlSelect>,
        alias: String,
    },
    /// Inline rows.
    Values {
        rows: Vec<Vec<Value>>,
        columns: Vec<String>,
        alias: String,
    },
    Join {
        kind: SqlJoinKind,
        left: Box<SqlTable>,
        right: Box<SqlTable>,
        on: Option<SqlExpr>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SqlExpr {
    Column {
        table: String,
        name: String,
    },
    Literal(Value),
    /// Bound query parameter by position in the parameter list.
    Parameter(usize),
    Binary {
        op: BinaryOp,
        left: Box<SqlExpr>,
        right: Box<SqlExpr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<SqlExpr>,
    },
    IsNull {
        operand: Box<SqlExpr>,
        negated: bool,
    },
    Function {
        func: Function,
        args: Vec<SqlExpr>,
    },
    /// `None` argument means `COUNT(*)`.
    Aggregate {
        kind: AggregateKind,
        arg: Option<Box<SqlExpr>>,
    },
    Case {
        branches: Vec<(SqlExpr, SqlExpr)>,
        otherwise: Option<Box<SqlExpr>>,
    },
    Exists(Box<SqlSelect>),
    /// Scalar sub-select.
    Subquery(Box<SqlSelect>),
    RowNumber {
        order_by: Vec<SqlOrder>,
    },
    FullText {
        columns: Vec<SqlExpr>,
        query: Box<SqlExpr>,
    },
}

impl SqlExpr {
    pub fn column(table: &str, name: &str) -> SqlExpr {
        SqlExpr::Column {
            table: table.to_string(),
            name: name.to_string(),
        }
    }

    pub fn binary(op: BinaryOp, left: SqlExpr, right: SqlExpr) -> SqlExpr {
        SqlExpr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn and(left: SqlExpr, right: SqlExpr) -> SqlExpr {
        SqlExpr::binary(BinaryOp::And, left, right)
    }

    pub fn or(left: SqlExpr, right: SqlExpr) -> SqlExpr {
        SqlExpr::binary(BinaryOp::Or, left, right)
    }

    /// AND of optional terms.
    pub fn and_all(terms: impl IntoIterator<Item = SqlExpr>) -> Option<SqlExpr> {
        terms.into_iter().reduce(SqlExpr::and)
    }

    pub fn or_all(terms: impl IntoIterator<Item = SqlExpr>) -> Option<SqlExpr> {
        terms.into_iter().reduce(SqlExpr::or)
    }

    /// True when the expression is boolean-valued by construction.
    pub fn is_predicate(&self) -> bool {
        match self {
            SqlExpr::Binary { op, .. } => op.is_predicate(),
            SqlExpr::Unary { op, .. } => *op == UnaryOp::Not,
            SqlExpr::IsNull { .. } | SqlExpr::Exists(_) | SqlExpr::FullText { .. } => true,
            _ => false,
        }
    }

    pub fn has_window(&self) -> bool {
        let mut found = false;
        self.visit_shallow(&mut |e| {
            if matches!(e, SqlExpr::RowNumber { .. }) {
                found = true;
            }
        });
        found
    }

    /// Pre-order visit that does not descend into sub-selects.
    pub fn visit_shallow(&self, f: &mut impl FnMut(&SqlExpr)) {
        f(self);
        match self {
            SqlExpr::Column { .. }
            | SqlExpr::Literal(_)
            | SqlExpr::Parameter(_)
            | SqlExpr::Exists(_)
            | SqlExpr::Subquery(_) => {}
            SqlExpr::Binary { left, right, .. } => {
                left.visit_shallow(f);
                right.visit_shallow(f);
            }
            SqlExpr::Unary { operand, .. } | SqlExpr::IsNull { operand, .. } => {
                operand.visit_shallow(f)
            }
            SqlExpr::Function { args, .. } => args.iter().for_each(|a| a.visit_shallow(f)),
            SqlExpr::Aggregate { arg, .. } => {
                if let Some(arg) = arg {
                    arg.visit_shallow(f);
                }
            }
            SqlExpr::Case {
                branches,
                otherwise,
            } => {
                for (when, then) in branches {
                    when.visit_shallow(f);
                    then.visit_shallow(f);
                }
                if let Some(e) = otherwise {
                    e.visit_shallow(f);
                }
            }
            SqlExpr::RowNumber { order_by } => {
                order_by.iter().for_each(|o| o.expr.visit_shallow(f))
            }
            SqlExpr::FullText { columns, query } => {
                columns.iter().for_each(|c| c.visit_shallow(f));
                query.visit_shallow(f);
            }
        }
    }
}

impl SqlSelect {
    /// Adds a conjunct to the WHERE clause.
    pub fn and_where(&mut self, condition: SqlExpr) {
        self.filter = Some(match self.filter.take() {
            Some(existing) => SqlExpr::and(existing, condition),
            None => condition,
        });
    }

    pub fn column_aliases(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.alias.clone()).collect()
    }

    pub fn has_paging(&self) -> bool {
        self.limit.is_some() || self.offset.is_some()
    }

    pub fn is_grouped(&self) -> bool {
        !self.group_by.is_empty() || self.columns.iter().any(|c| {
            let mut agg = false;
            c.expr.visit_shallow(&mut |e| agg |= matches!(e, SqlExpr::Aggregate { .. }));
            agg
        })
    }

    pub fn has_window(&self) -> bool {
        self.columns.iter().any(|c| c.expr.has_window())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SqlIdentity {
    pub seed: i64,
    pub increment: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlColumnDef {
    pub name: String,
    pub ty: ColumnType,
    /// Maximum length for string columns.
    pub length: Option<u32>,
    pub nullable: bool,
    pub identity: Option<SqlIdentity>,
}

impl SqlColumnDef {
    pub fn new(name: &str, ty: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            ty,
            length: None,
            nullable: true,
            identity: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlCreateTable {
    pub name: String,
    pub columns: Vec<SqlColumnDef>,
    pub primary_key: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlIndexColumn {
    pub name: String,
    pub ascending: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlCreateIndex {
    pub name: String,
    pub table: String,
    pub unique: bool,
    pub columns: Vec<SqlIndexColumn>,
    pub included: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlDropTable {
    pub name: String,
    pub if_exists: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlCreateSequence {
    pub name: String,
    pub start: i64,
    pub increment: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PartitionAction {
    Split(Value),
    Merge(Value),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlAlterPartitionFunction {
    pub name: String,
    pub action: PartitionAction,
}

/// Top-level statement handed to the translator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SqlStatement {
    Select(SqlSelect),
    CreateTable(SqlCreateTable),
    CreateIndex(SqlCreateIndex),
    DropTable(SqlDropTable),
    CreateSequence(SqlCreateSequence),
    AlterPartitionFunction(SqlAlterPartitionFunction),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_and_where_accumulates() {
        let mut s = SqlSelect::default();
        s.and_where(SqlExpr::Literal(Value::Bool(true)));
        s.and_where(SqlExpr::Literal(Value::Bool(false)));
        assert!(matches!(
            s.filter,
            Some(SqlExpr::Binary {
                op: BinaryOp::And,
                ..
            })
        ));
    }

    #[test]
    fn test_grouped_detection() {
        let mut s = SqlSelect::default();
        s.columns.push(SqlColumn {
            expr: SqlExpr::Aggregate {
                kind: AggregateKind::Count,
                arg: None,
            },
            alias: "n".into(),
        });
        assert!(s.is_grouped());
        assert!(!s.has_window());
    }

    #[test]
    fn test_window_inside_subquery_not_counted() {
        let inner = SqlSelect {
            columns: vec![SqlColumn {
                expr: SqlExpr::RowNumber { order_by: vec![] },
                alias: "rn".into(),
            }],
            ..SqlSelect::default()
        };
        let e = SqlExpr::Subquery(Box::new(inner));
        assert!(!e.has_window());
    }
}
