//! Provider tree types.
//!
//! A provider is one node of the relational algebra handed over by the
//! upstream query translator. The tree is:
//! - Immutable (every rewrite builds new nodes, unchanged subtrees are shared)
//! - Positional (columns are addressed by index into the source header)
//! - Thread-safe to share (`Arc` children, no interior mutability)

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::expr::Expr;
use super::range::RangeSet;
use crate::error::{Error, Result};
use crate::value::{ColumnType, Value};

/// Shared, immutable reference to a provider node.
pub type ProviderRef = Arc<Provider>;

/// One node of the relational algebra.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Provider {
    /// Full scan of a table through its primary index.
    Index { table: Arc<TableInfo> },
    /// Scan of one index restricted to a set of key ranges.
    RangeScan {
        table: Arc<TableInfo>,
        index: Arc<IndexInfo>,
        ranges: RangeSet,
    },
    /// Inline rows.
    Raw {
        name: String,
        header: Header,
        rows: Vec<Vec<Value>>,
    },
    Filter {
        source: ProviderRef,
        predicate: Expr,
    },
    /// Projection by column index.
    Select {
        source: ProviderRef,
        columns: Vec<usize>,
    },
    /// Appends computed columns after the source columns.
    Calculate {
        source: ProviderRef,
        columns: Vec<CalculatedColumn>,
    },
    /// Renames every exposed column to `alias.name`.
    Alias { source: ProviderRef, alias: String },
    Sort {
        source: ProviderRef,
        order: Vec<SortKey>,
    },
    Take { source: ProviderRef, count: u64 },
    Skip { source: ProviderRef, count: u64 },
    Distinct { source: ProviderRef },
    /// Equi-join on pairs of (left column, right column).
    Join {
        left: ProviderRef,
        right: ProviderRef,
        join_type: JoinType,
        pairs: Vec<(usize, usize)>,
    },
    /// Join on an arbitrary predicate over `left ++ right` columns.
    PredicateJoin {
        left: ProviderRef,
        right: ProviderRef,
        join_type: JoinType,
        predicate: Expr,
    },
    /// Correlated evaluation of `right` for every row of `left`.
    Apply {
        left: ProviderRef,
        right: ProviderRef,
        parameter: ApplyParameter,
        apply_type: ApplyType,
        join_type: JoinType,
    },
    Aggregate {
        source: ProviderRef,
        group_by: Vec<usize>,
        aggregates: Vec<AggregateColumn>,
    },
    /// Single row, single boolean column: does the source have any rows.
    Existence {
        source: ProviderRef,
        column_name: String,
    },
    /// Materialization boundary.
    Store { source: ProviderRef, name: String },
}

/// Reference-free correlation token of one `Apply` binding site.
///
/// Identifiers are handed out by a [`ParameterArena`] and are unique within
/// the tree that arena built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplyParameter(pub u32);

impl fmt::Display for ApplyParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@p{}", self.0)
    }
}

/// Allocates apply parameters for one tree.
#[derive(Debug, Default)]
pub struct ParameterArena {
    next: u32,
}

impl ParameterArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> ApplyParameter {
        let p = ApplyParameter(self.next);
        self.next += 1;
        p
    }
}

/// How many right rows an `Apply` produces per left row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyType {
    /// Appends one boolean column: whether the right side has rows.
    Existence,
    /// At most one right row.
    Scalar(ScalarMode),
    /// Every right row.
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarMode {
    /// The first right row; more rows are ignored.
    First,
    /// The only right row; more rows are a data error.
    Single,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinType {
    #[default]
    Inner,
    LeftOuter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub column: usize,
    #[serde(default)]
    pub direction: Direction,
}

impl SortKey {
    pub fn asc(column: usize) -> Self {
        Self {
            column,
            direction: Direction::Ascending,
        }
    }

    pub fn desc(column: usize) -> Self {
        Self {
            column,
            direction: Direction::Descending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatedColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ColumnType,
    pub expr: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateKind {
    Count,
    Sum,
    Min,
    Max,
    Avg,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateColumn {
    pub name: String,
    pub kind: AggregateKind,
    /// `None` only for `Count`, meaning `COUNT(*)`.
    #[serde(default)]
    pub column: Option<usize>,
}

/// One column exposed by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Ordered list of columns exposed by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Header {
    pub columns: Vec<Column>,
}

impl Header {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column(&self, index: usize) -> Result<&Column> {
        self.columns.get(index).ok_or_else(|| {
            Error::InvalidProvider(format!(
                "column {} out of range (header has {})",
                index,
                self.columns.len()
            ))
        })
    }

    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn concat(&self, other: &Header) -> Header {
        let mut columns = self.columns.clone();
        columns.extend(other.columns.iter().cloned());
        Header { columns }
    }

    pub fn select(&self, indexes: &[usize]) -> Result<Header> {
        let columns = indexes
            .iter()
            .map(|&i| self.column(i).cloned())
            .collect::<Result<Vec<_>>>()?;
        Ok(Header { columns })
    }

    pub fn aliased(&self, alias: &str) -> Header {
        Header {
            columns: self
                .columns
                .iter()
                .map(|c| Column::new(format!("{}.{}", alias, c.name), c.ty))
                .collect(),
        }
    }
}

/// Physical table description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    pub name: String,
    pub columns: Vec<Column>,
    /// Declaration order matters: it breaks cost ties during index selection.
    #[serde(default)]
    pub indexes: Vec<Arc<IndexInfo>>,
}

impl TableInfo {
    pub fn header(&self) -> Header {
        Header::new(self.columns.clone())
    }

    pub fn primary_index(&self) -> Option<&Arc<IndexInfo>> {
        self.indexes.iter().find(|i| i.primary)
    }

    pub fn index(&self, name: &str) -> Option<&Arc<IndexInfo>> {
        self.indexes.iter().find(|i| i.name == name)
    }
}

/// Index description. Identity is `(table, name)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexInfo {
    pub name: String,
    pub table: String,
    /// Key columns as indexes into the table columns.
    pub key_columns: Vec<SortKey>,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub statistics: Option<IndexStatistics>,
}

impl PartialEq for IndexInfo {
    fn eq(&self, other: &Self) -> bool {
        self.table == other.table && self.name == other.name
    }
}

impl Eq for IndexInfo {}

impl Hash for IndexInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.table.hash(state);
        self.name.hash(state);
    }
}

impl IndexInfo {
    /// A point on every key column of a unique index matches at most one row.
    pub fn is_unique_key(&self) -> bool {
        self.primary || self.unique
    }
}

/// Sampled key distribution used by the cost evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexStatistics {
    pub row_count: u64,
    /// Key tuples sampled uniformly from the index.
    #[serde(default)]
    pub sample: Vec<Vec<Value>>,
}

impl Provider {
    /// Short node label used in diagnostics, e.g. `Index(Person)`.
    pub fn label(&self) -> String {
        match self {
            Provider::Index { table } => format!("Index({})", table.name),
            Provider::RangeScan { index, .. } => format!("RangeScan({}.{})", index.table, index.name),
            Provider::Raw { name, .. } => format!("Raw({})", name),
            Provider::Store { name, .. } => format!("Store({})", name),
            Provider::Alias { alias, .. } => format!("Alias({})", alias),
            other => other.kind_name().to_string(),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Provider::Index { .. } => "Index",
            Provider::RangeScan { .. } => "RangeScan",
            Provider::Raw { .. } => "Raw",
            Provider::Filter { .. } => "Filter",
            Provider::Select { .. } => "Select",
            Provider::Calculate { .. } => "Calculate",
            Provider::Alias { .. } => "Alias",
            Provider::Sort { .. } => "Sort",
            Provider::Take { .. } => "Take",
            Provider::Skip { .. } => "Skip",
            Provider::Distinct { .. } => "Distinct",
            Provider::Join { .. } => "Join",
            Provider::PredicateJoin { .. } => "PredicateJoin",
            Provider::Apply { .. } => "Apply",
            Provider::Aggregate { .. } => "Aggregate",
            Provider::Existence { .. } => "Existence",
            Provider::Store { .. } => "Store",
        }
    }

    /// Columns exposed by this node.
    pub fn header(&self) -> Result<Header> {
        match self {
            Provider::Index { table } | Provider::RangeScan { table, .. } => Ok(table.header()),
            Provider::Raw { header, .. } => Ok(header.clone()),
            Provider::Filter { source, .. }
            | Provider::Sort { source, .. }
            | Provider::Take { source, .. }
            | Provider::Skip { source, .. }
            | Provider::Distinct { source }
            | Provider::Store { source, .. } => source.header(),
            Provider::Select { source, columns } => source.header()?.select(columns),
            Provider::Calculate { source, columns } => {
                let mut header = source.header()?;
                header
                    .columns
                    .extend(columns.iter().map(|c| Column::new(c.name.clone(), c.ty)));
                Ok(header)
            }
            Provider::Alias { source, alias } => Ok(source.header()?.aliased(alias)),
            Provider::Join { left, right, .. } | Provider::PredicateJoin { left, right, .. } => {
                Ok(left.header()?.concat(&right.header()?))
            }
            Provider::Apply {
                left,
                right,
                apply_type,
                ..
            } => match apply_type {
                ApplyType::Existence => {
                    let mut header = left.header()?;
                    header.columns.push(Column::new("exists", ColumnType::Bool));
                    Ok(header)
                }
                _ => Ok(left.header()?.concat(&right.header()?)),
            },
            Provider::Aggregate {
                source,
                group_by,
                aggregates,
            } => {
                let source_header = source.header()?;
                let mut header = source_header.select(group_by)?;
                for agg in aggregates {
                    let ty = match (agg.kind, agg.column) {
                        (AggregateKind::Count, _) => ColumnType::Int,
                        (AggregateKind::Avg, _) => ColumnType::Float,
                        (_, Some(c)) => source_header.column(c)?.ty,
                        (kind, None) => {
                            return Err(Error::InvalidProvider(format!(
                                "{:?} aggregate {} needs a column",
                                kind, agg.name
                            )))
                        }
                    };
                    header.columns.push(Column::new(agg.name.clone(), ty));
                }
                Ok(header)
            }
            Provider::Existence { column_name, .. } => Ok(Header::new(vec![Column::new(
                column_name.clone(),
                ColumnType::Bool,
            )])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person() -> Arc<TableInfo> {
        Arc::new(TableInfo {
            name: "Person".into(),
            columns: vec![
                Column::new("Id", ColumnType::Int),
                Column::new("Email", ColumnType::String),
            ],
            indexes: vec![],
        })
    }

    #[test]
    fn test_alias_header() {
        let p = Provider::Alias {
            source: Arc::new(Provider::Index { table: person() }),
            alias: "p".into(),
        };
        assert_eq!(p.header().unwrap().names(), vec!["p.Id", "p.Email"]);
    }

    #[test]
    fn test_select_out_of_range() {
        let p = Provider::Select {
            source: Arc::new(Provider::Index { table: person() }),
            columns: vec![0, 5],
        };
        assert!(matches!(p.header(), Err(Error::InvalidProvider(_))));
    }

    #[test]
    fn test_aggregate_header_types() {
        let p = Provider::Aggregate {
            source: Arc::new(Provider::Index { table: person() }),
            group_by: vec![1],
            aggregates: vec![
                AggregateColumn {
                    name: "n".into(),
                    kind: AggregateKind::Count,
                    column: None,
                },
                AggregateColumn {
                    name: "max_id".into(),
                    kind: AggregateKind::Max,
                    column: Some(0),
                },
            ],
        };
        let header = p.header().unwrap();
        assert_eq!(header.names(), vec!["Email", "n", "max_id"]);
        assert_eq!(header.columns[1].ty, ColumnType::Int);
        assert_eq!(header.columns[2].ty, ColumnType::Int);
    }

    #[test]
    fn test_index_identity() {
        let a = IndexInfo {
            name: "IX_Email".into(),
            table: "Person".into(),
            key_columns: vec![SortKey::asc(1)],
            primary: false,
            unique: true,
            statistics: None,
        };
        let mut b = a.clone();
        b.unique = false;
        assert_eq!(a, b);
    }
}
