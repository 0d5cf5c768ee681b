/// Syntax check of emitted SQL.
///
/// Parses rendered text with the `sqlparser` dialect of the target vendor.
/// This only catches malformed text; it says nothing about whether the
/// server would accept the statement.
use sqlparser::dialect::{
    Dialect as ParserDialect, MsSqlDialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect,
};
use sqlparser::parser::Parser as SqlParser;

use crate::dialect::{Dialect, Vendor};
use crate::error::{Error, Result};

fn parser_dialect(vendor: Vendor) -> Box<dyn ParserDialect> {
    match vendor {
        Vendor::SqlServer => Box::new(MsSqlDialect {}),
        Vendor::PostgreSql => Box::new(PostgreSqlDialect {}),
        Vendor::MySql => Box::new(MySqlDialect {}),
        Vendor::Sqlite => Box::new(SQLiteDialect {}),
    }
}

/// Parses `sql` as `dialect` and returns the number of statements.
pub fn check_syntax(dialect: Dialect, sql: &str) -> Result<usize> {
    let parser = parser_dialect(dialect.vendor);
    let statements = SqlParser::parse_sql(parser.as_ref(), sql)
        .map_err(|e| Error::Syntax(format!("{}: {}", dialect, e)))?;
    Ok(statements.len())
}
