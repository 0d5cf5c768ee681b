/// Reference interpreters.
///
/// Two in-memory evaluators over the same [`Database`]: one runs a provider
/// tree directly, the other runs the SQL DOM the compiler produced. A query
/// compiles correctly when both return the same rows. Neither is tuned for
/// speed; joins are nested loops and every sub-select is re-run per row.
pub mod provider;
pub mod scalar;
pub mod sql;

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::provider::TableInfo;
use crate::value::Value;

pub use provider::evaluate;
pub use sql::execute;

pub type Row = Vec<Value>;

/// Stored rows of one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableData {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

/// Named tables with rows in insertion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Database {
    tables: HashMap<String, TableData>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `rows` for `table`, replacing earlier rows.
    pub fn insert(&mut self, table: &TableInfo, rows: Vec<Row>) -> Result<()> {
        if let Some(bad) = rows.iter().find(|r| r.len() != table.columns.len()) {
            return Err(Error::Evaluation(format!(
                "row for {} has {} values, table has {} columns",
                table.name,
                bad.len(),
                table.columns.len()
            )));
        }
        self.tables.insert(
            table.name.clone(),
            TableData {
                columns: table.columns.iter().map(|c| c.name.clone()).collect(),
                rows,
            },
        );
        Ok(())
    }

    pub fn with_table(mut self, table: &Arc<TableInfo>, rows: Vec<Row>) -> Result<Self> {
        self.insert(table, rows)?;
        Ok(self)
    }

    pub fn table(&self, name: &str) -> Result<&TableData> {
        self.tables
            .get(name)
            .ok_or_else(|| Error::Evaluation(format!("unknown table {}", name)))
    }
}

/// Rows as a multiset, for comparing results whose order is unspecified.
pub fn sorted(mut rows: Vec<Row>) -> Vec<Row> {
    rows.sort();
    rows
}
