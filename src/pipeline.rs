//! End-to-end compilation: provider tree → pre-compilation passes →
//! compiler chain → dialect SQL.

use serde::Serialize;
use tracing::{debug, info};

use crate::compiler::{CompiledQuery, CompilerChain, CompilerOptions};
use crate::config::Config;
use crate::dialect::capabilities::Placeholder;
use crate::dialect::{Capabilities, Dialect};
use crate::error::{Error, Result};
use crate::precompile::CompositePreCompiler;
use crate::provider::ProviderRef;
use crate::translator::Translator;
use crate::value::Value;

/// Command text ready for the connection layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Command {
    pub dialect: String,
    pub sql: String,
    /// Values for the placeholders: by index for numbered or named
    /// placeholders, in text order for `?`.
    pub parameters: Vec<Value>,
    pub columns: Vec<String>,
}

/// A configured pipeline. Stateless between calls and shareable across
/// threads; every compilation gets its own context.
pub struct QueryPipeline {
    precompiler: CompositePreCompiler,
    compiler: CompilerChain,
    translator: Translator,
}

impl QueryPipeline {
    pub fn new(config: &Config) -> Result<Self> {
        let caps = Capabilities::resolve(config.dialect.target)?;
        Ok(Self {
            precompiler: CompositePreCompiler::with_defaults(&config.precompile, &config.cost),
            compiler: CompilerChain::with_defaults(
                caps.clone(),
                CompilerOptions::from(&config.compiler),
            ),
            translator: Translator::with_capabilities(caps),
        })
    }

    /// Default configuration for `dialect`.
    pub fn for_dialect(dialect: Dialect) -> Result<Self> {
        let mut config = Config::default();
        config.dialect.target = dialect;
        Self::new(&config)
    }

    pub fn dialect(&self) -> Dialect {
        self.translator.dialect()
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    pub fn pass_names(&self) -> Vec<&str> {
        self.precompiler.pass_names()
    }

    pub fn precompile(&self, root: &ProviderRef) -> Result<ProviderRef> {
        self.precompiler.process(root)
    }

    /// Pre-compiles and compiles `root` to a SQL DOM statement.
    pub fn compile_query(&self, root: &ProviderRef) -> Result<CompiledQuery> {
        let rewritten = self.precompile(root)?;
        self.compiler.compile(&rewritten)
    }

    pub fn compile(&self, root: &ProviderRef) -> Result<Command> {
        let query = self.compile_query(root)?;
        let rendered = self.translator.render(&query.statement)?;
        let parameters = match self.translator.capabilities().placeholder() {
            // numbered and named placeholders bind by index
            Placeholder::Dollar | Placeholder::AtName => query.parameters.clone(),
            Placeholder::Question => rendered
                .parameter_order
                .iter()
                .map(|&i| {
                    query.parameters.get(i).cloned().ok_or_else(|| {
                        Error::defect(
                            "Select",
                            format!(
                                "placeholder binds parameter {} of {}",
                                i,
                                query.parameters.len()
                            ),
                        )
                    })
                })
                .collect::<Result<Vec<_>>>()?,
        };
        debug!(parameters = parameters.len(), "bound parameters");
        info!(dialect = %self.dialect(), bytes = rendered.sql.len(), "query compiled");
        Ok(Command {
            dialect: self.dialect().to_string(),
            sql: rendered.sql,
            parameters,
            columns: query.header.names(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::provider::{
        table, Expr, Provider, ProviderExt, TableBuilder, TableExt, TableInfo,
    };
    use crate::value::ColumnType;

    /// No indexes, so every placeholder comes from the filter predicates.
    fn heap() -> Arc<TableInfo> {
        TableBuilder::new("T")
            .columns(&[("a", ColumnType::Int), ("b", ColumnType::String)])
            .build()
    }

    #[test]
    fn test_parameters_follow_placeholders() {
        let mut config = Config::default();
        config.compiler.parameterize_literals = true;
        config.dialect.target = Dialect::postgres(11, 0);
        let pipeline = QueryPipeline::new(&config).unwrap();
        let t = heap();
        let root = t
            .scan()
            .filter(Expr::eq(Expr::col(1), Expr::lit("x")))
            .filter(Expr::eq(Expr::col(0), Expr::lit(7i64)));
        let command = pipeline.compile(&root).unwrap();
        assert_eq!(command.columns, vec!["a", "b"]);
        assert_eq!(command.parameters.len(), 2);
        assert!(command.sql.contains("$1"), "{}", command.sql);
        assert!(!command.sql.contains("'x'"), "{}", command.sql);
    }

    #[test]
    fn test_question_placeholders_bind_in_text_order() {
        let mut config = Config::default();
        config.compiler.parameterize_literals = true;
        config.dialect.target = Dialect::sqlite();
        let pipeline = QueryPipeline::new(&config).unwrap();
        let t = heap();
        let root = t
            .scan()
            .filter(Expr::and(
                Expr::eq(Expr::col(1), Expr::lit("x")),
                Expr::eq(Expr::col(0), Expr::lit(7i64)),
            ));
        let command = pipeline.compile(&root).unwrap();
        assert_eq!(command.parameters, vec![Value::from("x"), Value::Int(7)]);
        assert_eq!(command.sql.matches('?').count(), 2);
    }

    #[test]
    fn test_range_scan_bounds_are_parameters() {
        let mut config = Config::default();
        config.compiler.parameterize_literals = true;
        config.dialect.target = Dialect::sqlite();
        let pipeline = QueryPipeline::new(&config).unwrap();
        let t = table("T", &[("a", ColumnType::Int), ("b", ColumnType::String)]);
        let root = t.scan().filter(Expr::eq(Expr::col(0), Expr::lit(4242i64)));
        let rewritten = pipeline.precompile(&root).unwrap();
        let Provider::Filter { source, .. } = rewritten.as_ref() else {
            panic!("expected filter, got {:?}", rewritten)
        };
        assert!(matches!(source.as_ref(), Provider::RangeScan { .. }), "{:?}", source);
        let command = pipeline.compile(&root).unwrap();
        assert!(!command.sql.contains("4242"), "{}", command.sql);
        assert_eq!(command.sql.matches('?').count(), command.parameters.len());
        assert!(command.parameters.len() >= 2, "{:?}", command.parameters);
        assert!(command.parameters.iter().all(|v| *v == Value::Int(4242)));
    }

    #[test]
    fn test_unknown_version_rejected() {
        assert!(QueryPipeline::for_dialect(Dialect::sql_server(7)).is_err());
    }

    #[test]
    fn test_default_passes() {
        let pipeline = QueryPipeline::new(&Config::default()).unwrap();
        assert_eq!(
            pipeline.pass_names(),
            vec!["simplifier", "apply_corrector", "index_selection"]
        );
    }
}
