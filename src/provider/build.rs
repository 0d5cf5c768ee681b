//! Fluent construction of provider trees and table descriptions.
//!
//! Used by tests, benchmarks and embedding code that builds trees by hand
//! instead of deserializing them.

use std::sync::Arc;

use super::expr::Expr;
use super::types::*;
use crate::value::ColumnType;

/// Table with the given columns and a primary key on the first column.
pub fn table(name: &str, columns: &[(&str, ColumnType)]) -> Arc<TableInfo> {
    TableBuilder::new(name)
        .columns(columns)
        .primary_key(&[0])
        .build()
}

/// Builder for [`TableInfo`] with its indexes.
pub struct TableBuilder {
    info: TableInfo,
}

impl TableBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            info: TableInfo {
                name: name.to_string(),
                columns: Vec::new(),
                indexes: Vec::new(),
            },
        }
    }

    pub fn columns(mut self, columns: &[(&str, ColumnType)]) -> Self {
        self.info
            .columns
            .extend(columns.iter().map(|(n, t)| Column::new(*n, *t)));
        self
    }

    pub fn primary_key(mut self, key: &[usize]) -> Self {
        let index = IndexInfo {
            name: format!("PK_{}", self.info.name),
            table: self.info.name.clone(),
            key_columns: key.iter().map(|&c| SortKey::asc(c)).collect(),
            primary: true,
            unique: true,
            statistics: None,
        };
        self.info.indexes.insert(0, Arc::new(index));
        self
    }

    pub fn index(mut self, name: &str, key: &[usize], unique: bool) -> Self {
        let index = IndexInfo {
            name: name.to_string(),
            table: self.info.name.clone(),
            key_columns: key.iter().map(|&c| SortKey::asc(c)).collect(),
            primary: false,
            unique,
            statistics: None,
        };
        self.info.indexes.push(Arc::new(index));
        self
    }

    /// Attach statistics to an already declared index.
    pub fn statistics(mut self, index: &str, statistics: IndexStatistics) -> Self {
        for entry in self.info.indexes.iter_mut() {
            if entry.name == index {
                let mut updated = IndexInfo::clone(entry);
                updated.statistics = Some(statistics.clone());
                *entry = Arc::new(updated);
            }
        }
        self
    }

    pub fn build(self) -> Arc<TableInfo> {
        Arc::new(self.info)
    }
}

/// Entry point for building a scan over a table.
pub trait TableExt {
    fn scan(&self) -> ProviderRef;
}

impl TableExt for Arc<TableInfo> {
    fn scan(&self) -> ProviderRef {
        Arc::new(Provider::Index {
            table: Arc::clone(self),
        })
    }
}

/// Fluent operators over a provider reference.
pub trait ProviderExt {
    fn filter(self, predicate: Expr) -> ProviderRef;
    fn select(self, columns: Vec<usize>) -> ProviderRef;
    fn calculate(self, name: &str, ty: ColumnType, expr: Expr) -> ProviderRef;
    fn alias(self, alias: &str) -> ProviderRef;
    fn sort(self, order: Vec<SortKey>) -> ProviderRef;
    fn take(self, count: u64) -> ProviderRef;
    fn skip(self, count: u64) -> ProviderRef;
    fn distinct(self) -> ProviderRef;
    fn join(self, right: ProviderRef, pairs: Vec<(usize, usize)>) -> ProviderRef;
    fn left_join(self, right: ProviderRef, pairs: Vec<(usize, usize)>) -> ProviderRef;
    fn predicate_join(self, right: ProviderRef, join_type: JoinType, predicate: Expr)
        -> ProviderRef;
    fn apply(
        self,
        right: ProviderRef,
        parameter: ApplyParameter,
        apply_type: ApplyType,
        join_type: JoinType,
    ) -> ProviderRef;
    fn aggregate(self, group_by: Vec<usize>, aggregates: Vec<AggregateColumn>) -> ProviderRef;
    fn existence(self, column_name: &str) -> ProviderRef;
    fn store(self, name: &str) -> ProviderRef;
}

impl ProviderExt for ProviderRef {
    fn filter(self, predicate: Expr) -> ProviderRef {
        Arc::new(Provider::Filter {
            source: self,
            predicate,
        })
    }

    fn select(self, columns: Vec<usize>) -> ProviderRef {
        Arc::new(Provider::Select {
            source: self,
            columns,
        })
    }

    fn calculate(self, name: &str, ty: ColumnType, expr: Expr) -> ProviderRef {
        Arc::new(Provider::Calculate {
            source: self,
            columns: vec![CalculatedColumn {
                name: name.to_string(),
                ty,
                expr,
            }],
        })
    }

    fn alias(self, alias: &str) -> ProviderRef {
        Arc::new(Provider::Alias {
            source: self,
            alias: alias.to_string(),
        })
    }

    fn sort(self, order: Vec<SortKey>) -> ProviderRef {
        Arc::new(Provider::Sort {
            source: self,
            order,
        })
    }

    fn take(self, count: u64) -> ProviderRef {
        Arc::new(Provider::Take {
            source: self,
            count,
        })
    }

    fn skip(self, count: u64) -> ProviderRef {
        Arc::new(Provider::Skip {
            source: self,
            count,
        })
    }

    fn distinct(self) -> ProviderRef {
        Arc::new(Provider::Distinct { source: self })
    }

    fn join(self, right: ProviderRef, pairs: Vec<(usize, usize)>) -> ProviderRef {
        Arc::new(Provider::Join {
            left: self,
            right,
            join_type: JoinType::Inner,
            pairs,
        })
    }

    fn left_join(self, right: ProviderRef, pairs: Vec<(usize, usize)>) -> ProviderRef {
        Arc::new(Provider::Join {
            left: self,
            right,
            join_type: JoinType::LeftOuter,
            pairs,
        })
    }

    fn predicate_join(
        self,
        right: ProviderRef,
        join_type: JoinType,
        predicate: Expr,
    ) -> ProviderRef {
        Arc::new(Provider::PredicateJoin {
            left: self,
            right,
            join_type,
            predicate,
        })
    }

    fn apply(
        self,
        right: ProviderRef,
        parameter: ApplyParameter,
        apply_type: ApplyType,
        join_type: JoinType,
    ) -> ProviderRef {
        Arc::new(Provider::Apply {
            left: self,
            right,
            parameter,
            apply_type,
            join_type,
        })
    }

    fn aggregate(self, group_by: Vec<usize>, aggregates: Vec<AggregateColumn>) -> ProviderRef {
        Arc::new(Provider::Aggregate {
            source: self,
            group_by,
            aggregates,
        })
    }

    fn existence(self, column_name: &str) -> ProviderRef {
        Arc::new(Provider::Existence {
            source: self,
            column_name: column_name.to_string(),
        })
    }

    fn store(self, name: &str) -> ProviderRef {
        Arc::new(Provider::Store {
            source: self,
            name: name.to_string(),
        })
    }
}
