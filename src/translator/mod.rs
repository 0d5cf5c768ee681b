/// Translator: SQL DOM → dialect SQL text.
///
/// Every rendering decision goes through [`Translator::translate`], which
/// takes the node and the *section* of it being rendered. Multi-part nodes
/// (a SELECT, a CREATE INDEX) are rendered by translating each of their
/// sections in order, so a dialect difference stays local to one section.
/// Dialect differences themselves come from the capability table; nothing
/// here matches on a vendor.
pub mod ddl;
pub mod literal;
pub mod select;
pub mod verify;

use serde::Serialize;
use tracing::trace;

use crate::dialect::capabilities::QuoteStyle;
use crate::dialect::{Capabilities, Dialect};
use crate::dom::{
    SqlAlterPartitionFunction, SqlCreateIndex, SqlCreateSequence, SqlCreateTable, SqlDropTable,
    SqlExpr, SqlSelect, SqlStatement, SqlTable,
};
use crate::error::{Error, Result};
use crate::value::Value;

pub use literal::{format_literal, parse_literal};
pub use verify::check_syntax;

/// Part of a node being rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Entry,
    Exit,
    Columns,
    From,
    Where,
    GroupBy,
    OrderBy,
    Paging,
    /// Expression in a boolean position (WHERE, ON, CASE WHEN).
    Predicate,
    /// Expression in a value position (select list, arguments).
    Value,
    ColumnsEntry,
    ColumnsExit,
    Included,
}

/// Node handed to [`Translator::translate`].
#[derive(Debug, Clone, Copy)]
pub enum SqlNode<'a> {
    Select(&'a SqlSelect),
    Table(&'a SqlTable),
    Expr(&'a SqlExpr),
    Literal(&'a Value),
    Identifier(&'a str),
    CreateTable(&'a SqlCreateTable),
    CreateIndex(&'a SqlCreateIndex),
    DropTable(&'a SqlDropTable),
    CreateSequence(&'a SqlCreateSequence),
    AlterPartitionFunction(&'a SqlAlterPartitionFunction),
}

impl SqlNode<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            SqlNode::Select(_) => "Select",
            SqlNode::Table(_) => "Table",
            SqlNode::Expr(_) => "Expr",
            SqlNode::Literal(_) => "Literal",
            SqlNode::Identifier(_) => "Identifier",
            SqlNode::CreateTable(_) => "CreateTable",
            SqlNode::CreateIndex(_) => "CreateIndex",
            SqlNode::DropTable(_) => "DropTable",
            SqlNode::CreateSequence(_) => "CreateSequence",
            SqlNode::AlterPartitionFunction(_) => "AlterPartitionFunction",
        }
    }
}

/// Per-statement rendering state.
#[derive(Debug, Default)]
pub struct TranslatorContext {
    path: Vec<String>,
    parameter_order: Vec<usize>,
}

impl TranslatorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&mut self, segment: impl Into<String>) {
        self.path.push(segment.into());
    }

    pub fn leave(&mut self) {
        self.path.pop();
    }

    /// DOM path of the node being rendered, e.g. `Select/From/Join/Derived`.
    pub fn path(&self) -> String {
        self.path.join("/")
    }

    /// Records that the next placeholder in the text binds `parameter`.
    pub fn bind(&mut self, parameter: usize) {
        self.parameter_order.push(parameter);
    }

    pub fn parameter_order(&self) -> &[usize] {
        &self.parameter_order
    }
}

/// Rendered statement text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rendered {
    pub sql: String,
    /// Parameter index for each placeholder, in text order.
    pub parameter_order: Vec<usize>,
}

/// Renders DOM nodes for one dialect.
#[derive(Debug, Clone)]
pub struct Translator {
    caps: Capabilities,
}

impl Translator {
    pub fn new(dialect: Dialect) -> Result<Self> {
        Ok(Self::with_capabilities(Capabilities::resolve(dialect)?))
    }

    pub fn with_capabilities(caps: Capabilities) -> Self {
        Self { caps }
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    pub fn dialect(&self) -> Dialect {
        self.caps.dialect()
    }

    /// Renders one section of one node.
    pub fn translate(
        &self,
        ctx: &mut TranslatorContext,
        node: SqlNode<'_>,
        section: Section,
    ) -> Result<String> {
        match (node, section) {
            (SqlNode::Select(s), section) => self.select_section(ctx, s, section),
            (SqlNode::Table(t), Section::Entry) => self.table(ctx, t),
            (SqlNode::Expr(e), Section::Value) => self.value(ctx, e),
            (SqlNode::Expr(e), Section::Predicate) => self.predicate(ctx, e),
            (SqlNode::Literal(v), Section::Value) => format_literal(&self.caps, v, &ctx.path()),
            (SqlNode::Literal(v), Section::Predicate) => self.predicate_literal(ctx, v),
            (SqlNode::Identifier(name), Section::Entry) => Ok(self.quote(name)),
            (SqlNode::CreateTable(t), section) => self.create_table_section(ctx, t, section),
            (SqlNode::CreateIndex(i), section) => self.create_index_section(ctx, i, section),
            (SqlNode::DropTable(d), Section::Entry) => self.drop_table(ctx, d),
            (SqlNode::CreateSequence(s), Section::Entry) => self.create_sequence(ctx, s),
            (SqlNode::AlterPartitionFunction(a), Section::Entry) => {
                self.alter_partition_function(ctx, a)
            }
            (node, section) => Err(Error::defect(
                ctx.path(),
                format!("{} has no {:?} section", node.kind(), section),
            )),
        }
    }

    /// Renders a whole statement.
    pub fn render(&self, statement: &SqlStatement) -> Result<Rendered> {
        let mut ctx = TranslatorContext::new();
        let sql = match statement {
            SqlStatement::Select(s) => self.select(&mut ctx, s)?,
            SqlStatement::CreateTable(t) => self.create_table(&mut ctx, t)?,
            SqlStatement::CreateIndex(i) => self.create_index(&mut ctx, i)?,
            SqlStatement::DropTable(d) => {
                self.translate(&mut ctx, SqlNode::DropTable(d), Section::Entry)?
            }
            SqlStatement::CreateSequence(s) => {
                self.translate(&mut ctx, SqlNode::CreateSequence(s), Section::Entry)?
            }
            SqlStatement::AlterPartitionFunction(a) => self.translate(
                &mut ctx,
                SqlNode::AlterPartitionFunction(a),
                Section::Entry,
            )?,
        };
        trace!(dialect = %self.dialect(), %sql, "rendered statement");
        Ok(Rendered {
            sql,
            parameter_order: ctx.parameter_order,
        })
    }

    /// Quotes an identifier, doubling the closing quote character inside it.
    pub fn quote(&self, name: &str) -> String {
        match self.caps.quote_style() {
            QuoteStyle::Brackets => format!("[{}]", name.replace(']', "]]")),
            QuoteStyle::DoubleQuotes => format!("\"{}\"", name.replace('"', "\"\"")),
            QuoteStyle::Backticks => format!("`{}`", name.replace('`', "``")),
        }
    }
}
