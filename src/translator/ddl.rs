//! DDL rendering: tables with identity columns, indexes, sequences and
//! partition functions.

use super::literal::quote_string;
use super::{format_literal, Section, SqlNode, Translator, TranslatorContext};
use crate::dialect::capabilities::{DropIfExistsStyle, IdentitySyntax, StringEscape, StringPrefix};
use crate::dialect::{Capability, Feature};
use crate::dom::{
    PartitionAction, SqlAlterPartitionFunction, SqlColumnDef, SqlCreateIndex, SqlCreateSequence,
    SqlCreateTable, SqlDropTable,
};
use crate::error::{Error, Result};
use crate::value::ColumnType;

const CREATE_INDEX_SECTIONS: [Section; 5] = [
    Section::Entry,
    Section::ColumnsEntry,
    Section::Columns,
    Section::ColumnsExit,
    Section::Included,
];

impl Translator {
    pub(super) fn create_table(
        &self,
        ctx: &mut TranslatorContext,
        table: &SqlCreateTable,
    ) -> Result<String> {
        ctx.enter(format!("CreateTable({})", table.name));
        let result = [Section::Entry, Section::Columns, Section::Exit]
            .into_iter()
            .map(|s| self.translate(ctx, SqlNode::CreateTable(table), s))
            .collect::<Result<Vec<_>>>();
        ctx.leave();
        Ok(result?.concat())
    }

    pub(super) fn create_table_section(
        &self,
        ctx: &mut TranslatorContext,
        table: &SqlCreateTable,
        section: Section,
    ) -> Result<String> {
        let identity = self.identity_syntax(ctx)?;
        match section {
            Section::Entry => Ok(format!("CREATE TABLE {} (", self.quote(&table.name))),
            Section::Columns => {
                let mut items = table
                    .columns
                    .iter()
                    .map(|c| self.column_def(ctx, table, c, identity))
                    .collect::<Result<Vec<_>>>()?;
                // SQLite declares the key inline on the AUTOINCREMENT column
                let inline_key = identity == IdentitySyntax::Autoincrement
                    && table.columns.iter().any(|c| c.identity.is_some());
                if !table.primary_key.is_empty() && !inline_key {
                    let keys: Vec<String> = table.primary_key.iter().map(|k| self.quote(k)).collect();
                    items.push(format!("PRIMARY KEY ({})", keys.join(", ")));
                }
                Ok(items.join(", "))
            }
            Section::Exit => {
                let seed = table
                    .columns
                    .iter()
                    .filter_map(|c| c.identity)
                    .map(|i| i.seed)
                    .find(|&seed| seed != 1);
                match (identity, seed) {
                    (IdentitySyntax::AutoIncrement, Some(seed)) => {
                        Ok(format!(") AUTO_INCREMENT = {}", seed))
                    }
                    _ => Ok(")".to_string()),
                }
            }
            other => Err(Error::defect(
                ctx.path(),
                format!("CreateTable has no {:?} section", other),
            )),
        }
    }

    fn identity_syntax(&self, ctx: &TranslatorContext) -> Result<IdentitySyntax> {
        match self.caps.require(Feature::Identity, &ctx.path())? {
            Capability::Identity(syntax) => Ok(syntax),
            other => Err(Error::Config(format!("identity capability {:?}", other))),
        }
    }

    fn column_type(&self, ctx: &TranslatorContext, column: &SqlColumnDef) -> Result<String> {
        let path = ctx.path();
        match (column.ty, column.length) {
            (ColumnType::String, Some(n)) => Ok(format!(
                "{}({})",
                self.caps.type_name(Feature::BoundedString, &path)?,
                n
            )),
            (ty, _) => Ok(self.caps.type_name(Feature::Type(ty), &path)?.to_string()),
        }
    }

    fn column_def(
        &self,
        ctx: &TranslatorContext,
        table: &SqlCreateTable,
        column: &SqlColumnDef,
        syntax: IdentitySyntax,
    ) -> Result<String> {
        let name = self.quote(&column.name);
        let ty = self.column_type(ctx, column)?;
        let not_null = if column.nullable { "" } else { " NOT NULL" };
        let identity = match column.identity {
            Some(identity) => identity,
            None => return Ok(format!("{} {}{}", name, ty, not_null)),
        };
        let gap = |what: &str| {
            Error::gap(
                self.dialect().to_string(),
                format!("identity columns with {}", what),
                ctx.path(),
            )
        };
        let unit_step = identity.increment == 1;
        Ok(match syntax {
            IdentitySyntax::Identity => format!(
                "{} {} IDENTITY({}, {}) NOT NULL",
                name, ty, identity.seed, identity.increment
            ),
            IdentitySyntax::Serial => {
                if identity.seed != 1 || !unit_step {
                    return Err(gap("a custom seed or increment"));
                }
                let serial = if column.ty == ColumnType::Int { "BIGSERIAL" } else { "SERIAL" };
                format!("{} {} NOT NULL", name, serial)
            }
            IdentitySyntax::Generated => format!(
                "{} {} GENERATED BY DEFAULT AS IDENTITY (START WITH {} INCREMENT BY {}) NOT NULL",
                name, ty, identity.seed, identity.increment
            ),
            IdentitySyntax::AutoIncrement => {
                if !unit_step {
                    return Err(gap("an increment other than 1"));
                }
                format!("{} {} NOT NULL AUTO_INCREMENT", name, ty)
            }
            IdentitySyntax::Autoincrement => {
                if identity.seed != 1 || !unit_step {
                    return Err(gap("a custom seed or increment"));
                }
                let sole_key = table.primary_key.is_empty()
                    || (table.primary_key.len() == 1 && table.primary_key[0] == column.name);
                if !sole_key {
                    return Err(gap("a composite primary key"));
                }
                format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", name)
            }
        })
    }

    pub(super) fn create_index(
        &self,
        ctx: &mut TranslatorContext,
        index: &SqlCreateIndex,
    ) -> Result<String> {
        ctx.enter(format!("CreateIndex({})", index.name));
        let result = CREATE_INDEX_SECTIONS
            .into_iter()
            .map(|s| self.translate(ctx, SqlNode::CreateIndex(index), s))
            .collect::<Result<Vec<_>>>();
        ctx.leave();
        Ok(result?.concat())
    }

    pub(super) fn create_index_section(
        &self,
        ctx: &mut TranslatorContext,
        index: &SqlCreateIndex,
        section: Section,
    ) -> Result<String> {
        match section {
            Section::Entry => Ok(format!(
                "CREATE {}INDEX {} ON {}",
                if index.unique { "UNIQUE " } else { "" },
                self.quote(&index.name),
                self.quote(&index.table)
            )),
            Section::ColumnsEntry => Ok(" (".to_string()),
            Section::Columns => {
                if index.columns.is_empty() {
                    return Err(Error::defect(ctx.path(), "index without key columns"));
                }
                let columns: Vec<String> = index
                    .columns
                    .iter()
                    .map(|c| {
                        format!(
                            "{} {}",
                            self.quote(&c.name),
                            if c.ascending { "ASC" } else { "DESC" }
                        )
                    })
                    .collect();
                Ok(columns.join(", "))
            }
            Section::ColumnsExit => Ok(")".to_string()),
            Section::Included => {
                if index.included.is_empty() {
                    return Ok(String::new());
                }
                self.caps.require(Feature::IncludedColumns, &ctx.path())?;
                let included: Vec<String> = index.included.iter().map(|c| self.quote(c)).collect();
                Ok(format!(" INCLUDE ({})", included.join(", ")))
            }
            other => Err(Error::defect(
                ctx.path(),
                format!("CreateIndex has no {:?} section", other),
            )),
        }
    }

    pub(super) fn drop_table(&self, ctx: &mut TranslatorContext, drop: &SqlDropTable) -> Result<String> {
        let name = self.quote(&drop.name);
        if !drop.if_exists {
            return Ok(format!("DROP TABLE {}", name));
        }
        match self.caps.require(Feature::DropTableIfExists, &ctx.path())? {
            Capability::DropIfExists(DropIfExistsStyle::Native) => {
                Ok(format!("DROP TABLE IF EXISTS {}", name))
            }
            Capability::DropIfExists(DropIfExistsStyle::ObjectIdCheck) => {
                let national = StringEscape {
                    backslash: false,
                    prefix: StringPrefix::National,
                };
                Ok(format!(
                    "IF OBJECT_ID({}, N'U') IS NOT NULL DROP TABLE {}",
                    quote_string(national, &drop.name),
                    name
                ))
            }
            other => Err(Error::Config(format!("drop table capability {:?}", other))),
        }
    }

    pub(super) fn create_sequence(
        &self,
        ctx: &mut TranslatorContext,
        sequence: &SqlCreateSequence,
    ) -> Result<String> {
        self.caps.require(Feature::Sequences, &ctx.path())?;
        Ok(format!(
            "CREATE SEQUENCE {} START WITH {} INCREMENT BY {}",
            self.quote(&sequence.name),
            sequence.start,
            sequence.increment
        ))
    }

    pub(super) fn alter_partition_function(
        &self,
        ctx: &mut TranslatorContext,
        alter: &SqlAlterPartitionFunction,
    ) -> Result<String> {
        self.caps.require(Feature::PartitionSplitMerge, &ctx.path())?;
        let (verb, boundary) = match &alter.action {
            PartitionAction::Split(v) => ("SPLIT", v),
            PartitionAction::Merge(v) => ("MERGE", v),
        };
        Ok(format!(
            "ALTER PARTITION FUNCTION {}() {} RANGE ({})",
            self.quote(&alter.name),
            verb,
            format_literal(&self.caps, boundary, &ctx.path())?
        ))
    }
}
