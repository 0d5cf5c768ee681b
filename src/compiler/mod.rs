/// Compiler: provider tree → SQL DOM.
///
/// Compilation walks the tree bottom-up. Every node is offered to the
/// compilers of a [`CompilerChain`] in order; the first one that returns a
/// fragment wins, a compiler that cannot handle the node declines with
/// `Ok(None)`. Children are compiled through [`SourceCompiler`], so each
/// compiler decides which of its children it needs and in which
/// correlation scope.
pub mod context;
pub mod expr;
pub mod fragment;
pub mod sql;

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::dialect::Capabilities;
use crate::dom::SqlStatement;
use crate::error::{Error, Result};
use crate::provider::{Header, NodePath, ProviderRef};
use crate::value::Value;

pub use context::CompilationContext;
pub use fragment::SqlFragment;
pub use sql::SqlCompiler;

/// One compilation strategy.
pub trait Compiler: Send + Sync {
    /// Name of the compiler, used in logs and in [`ExecutableProvider`].
    fn name(&self) -> &str;

    /// Compiles `provider`, or returns `Ok(None)` when this compiler does not
    /// handle it in the current dialect.
    fn compile(
        &self,
        provider: &ProviderRef,
        ctx: &mut CompilationContext,
        sources: &dyn SourceCompiler,
    ) -> Result<Option<ExecutableProvider>>;
}

/// Compiles child nodes on behalf of a [`Compiler`].
pub trait SourceCompiler {
    fn compile_source(
        &self,
        edge: &'static str,
        provider: &ProviderRef,
        ctx: &mut CompilationContext,
    ) -> Result<Arc<ExecutableProvider>>;
}

/// Result of compiling one provider node.
#[derive(Debug, Clone)]
pub struct ExecutableProvider {
    pub origin: ProviderRef,
    pub fragment: SqlFragment,
    pub sources: Vec<Arc<ExecutableProvider>>,
    /// Name of the compiler that produced this node, `cache` for reuse.
    pub compiled_by: String,
}

impl ExecutableProvider {
    /// Number of nodes in the executable tree.
    pub fn node_count(&self) -> usize {
        1 + self.sources.iter().map(|s| s.node_count()).sum::<usize>()
    }
}

/// Output of a whole compilation.
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    pub root: Arc<ExecutableProvider>,
    pub statement: SqlStatement,
    pub parameters: Vec<Value>,
    pub header: Header,
    pub cache_hits: usize,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CompilerOptions {
    /// Bind non-null, non-boolean literals in predicates as parameters.
    pub parameterize_literals: bool,
}

/// Ordered list of compilers.
pub struct CompilerChain {
    compilers: Vec<Box<dyn Compiler>>,
    options: CompilerOptions,
}

impl CompilerChain {
    pub fn new(options: CompilerOptions) -> Self {
        Self {
            compilers: Vec::new(),
            options,
        }
    }

    /// Chain with the SQL compiler for `caps`.
    pub fn with_defaults(caps: Capabilities, options: CompilerOptions) -> Self {
        let mut chain = Self::new(options);
        chain.add_compiler(Box::new(SqlCompiler::new(caps)));
        chain
    }

    pub fn add_compiler(&mut self, compiler: Box<dyn Compiler>) {
        self.compilers.push(compiler);
    }

    pub fn context(&self) -> CompilationContext {
        CompilationContext::new(self.options.parameterize_literals)
    }

    /// Compiles a whole tree into one SELECT statement.
    pub fn compile(&self, root: &ProviderRef) -> Result<CompiledQuery> {
        let mut ctx = self.context();
        let compiled = self.compile_at(root, NodePath::root(root), &mut ctx)?;
        let header = compiled.fragment.header.clone();
        let statement = SqlStatement::Select(compiled.fragment.clone().finish());
        info!(
            nodes = root.node_count(),
            cache_hits = ctx.cache_hits(),
            "compiled provider tree"
        );
        Ok(CompiledQuery {
            root: compiled,
            statement,
            parameters: ctx.take_parameters(),
            header,
            cache_hits: ctx.cache_hits(),
        })
    }

    fn compile_at(
        &self,
        provider: &ProviderRef,
        path: NodePath,
        ctx: &mut CompilationContext,
    ) -> Result<Arc<ExecutableProvider>> {
        if let Some(hit) = ctx.cached(provider) {
            debug!(path = %path, "reusing compiled subtree");
            // the same fragment appears twice in one statement, so it needs
            // its own table alias
            let fragment = hit.fragment.clone().wrap(ctx);
            return Ok(Arc::new(ExecutableProvider {
                origin: Arc::clone(provider),
                fragment,
                sources: vec![hit],
                compiled_by: "cache".to_string(),
            }));
        }

        ctx.enter(path);
        let result = self.try_compilers(provider, ctx);
        ctx.leave();

        let compiled = Arc::new(result?);
        ctx.store(provider, Arc::clone(&compiled));
        Ok(compiled)
    }

    fn try_compilers(
        &self,
        provider: &ProviderRef,
        ctx: &mut CompilationContext,
    ) -> Result<ExecutableProvider> {
        let sources = ChainSources { chain: self };
        for compiler in &self.compilers {
            match compiler.compile(provider, ctx, &sources)? {
                Some(compiled) => return Ok(compiled),
                None => debug!(
                    compiler = compiler.name(),
                    path = %ctx.path(),
                    "compiler declined"
                ),
            }
        }
        Err(Error::NoCompiler {
            path: ctx.path(),
            kind: provider.kind_name().to_string(),
        })
    }
}

struct ChainSources<'a> {
    chain: &'a CompilerChain,
}

impl SourceCompiler for ChainSources<'_> {
    fn compile_source(
        &self,
        edge: &'static str,
        provider: &ProviderRef,
        ctx: &mut CompilationContext,
    ) -> Result<Arc<ExecutableProvider>> {
        let path = ctx.current_path().child(edge, provider);
        self.chain.compile_at(provider, path, ctx)
    }
}
