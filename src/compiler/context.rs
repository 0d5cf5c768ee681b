//! Per-compilation mutable state.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::ExecutableProvider;
use crate::dom::SqlExpr;
use crate::error::{Error, Result};
use crate::provider::{ApplyParameter, NodePath, ProviderRef};
use crate::value::Value;

/// Hands out table aliases that are unique within one statement.
#[derive(Debug, Default)]
pub struct AliasGenerator {
    next: usize,
    used: HashSet<String>,
}

impl AliasGenerator {
    /// Fresh alias `prefix<n>`.
    pub fn next(&mut self, prefix: &str) -> String {
        loop {
            let alias = format!("{}{}", prefix, self.next);
            self.next += 1;
            if self.used.insert(alias.clone()) {
                return alias;
            }
        }
    }

    /// `base` itself when unused, otherwise `base_<n>`.
    pub fn named(&mut self, base: &str) -> String {
        let base: String = base
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
            .collect();
        if self.used.insert(base.clone()) {
            return base;
        }
        self.next(&format!("{}_", base))
    }
}

/// Column expressions of the outer row bound to an apply parameter.
#[derive(Debug, Clone)]
struct Binding {
    param: ApplyParameter,
    columns: Vec<SqlExpr>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    node: usize,
    scope: Vec<ApplyParameter>,
}

/// State of one compilation: aliases, the correlation stack, the subtree
/// cache and bound literal parameters. Never shared between compilations.
#[derive(Default)]
pub struct CompilationContext {
    pub aliases: AliasGenerator,
    bindings: Vec<Binding>,
    cache: HashMap<CacheKey, Arc<ExecutableProvider>>,
    cache_hits: usize,
    parameters: Vec<Value>,
    parameterize_literals: bool,
    paths: Vec<NodePath>,
}

impl CompilationContext {
    pub fn new(parameterize_literals: bool) -> Self {
        Self {
            parameterize_literals,
            ..Self::default()
        }
    }

    pub fn parameterize_literals(&self) -> bool {
        self.parameterize_literals
    }

    pub fn push_binding(&mut self, param: ApplyParameter, columns: Vec<SqlExpr>) {
        self.bindings.push(Binding { param, columns });
    }

    /// Pops the innermost binding, which must belong to `param`.
    pub fn pop_binding(&mut self, param: ApplyParameter) -> Result<()> {
        match self.bindings.pop() {
            Some(b) if b.param == param => Ok(()),
            Some(b) => Err(Error::defect(
                self.path(),
                format!("correlation scope of {} closed while {} is innermost", param, b.param),
            )),
            None => Err(Error::defect(
                self.path(),
                format!("correlation scope of {} closed twice", param),
            )),
        }
    }

    /// Outer column expression for `param`, innermost binding first.
    pub fn resolve(&self, param: ApplyParameter, column: usize) -> Result<SqlExpr> {
        let binding = self
            .bindings
            .iter()
            .rev()
            .find(|b| b.param == param)
            .ok_or_else(|| Error::defect(self.path(), format!("{} is not in scope", param)))?;
        binding.columns.get(column).cloned().ok_or_else(|| {
            Error::defect(
                self.path(),
                format!(
                    "{} column {} out of range (outer row has {})",
                    param,
                    column,
                    binding.columns.len()
                ),
            )
        })
    }

    /// Registers a literal as a bound parameter and returns its position.
    pub fn bind(&mut self, value: Value) -> usize {
        self.parameters.push(value);
        self.parameters.len() - 1
    }

    pub fn parameters(&self) -> &[Value] {
        &self.parameters
    }

    pub fn take_parameters(&mut self) -> Vec<Value> {
        std::mem::take(&mut self.parameters)
    }

    fn cache_key(&self, node: &ProviderRef) -> CacheKey {
        CacheKey {
            node: Arc::as_ptr(node) as usize,
            scope: self.bindings.iter().map(|b| b.param).collect(),
        }
    }

    pub fn cached(&mut self, node: &ProviderRef) -> Option<Arc<ExecutableProvider>> {
        let hit = self.cache.get(&self.cache_key(node)).cloned();
        if hit.is_some() {
            self.cache_hits += 1;
        }
        hit
    }

    pub fn store(&mut self, node: &ProviderRef, compiled: Arc<ExecutableProvider>) {
        let key = self.cache_key(node);
        self.cache.insert(key, compiled);
    }

    pub fn cache_hits(&self) -> usize {
        self.cache_hits
    }

    pub fn enter(&mut self, path: NodePath) {
        self.paths.push(path);
    }

    pub fn leave(&mut self) {
        self.paths.pop();
    }

    pub fn current_path(&self) -> NodePath {
        self.paths.last().cloned().unwrap_or_default()
    }

    /// Rendered path of the node being compiled, for diagnostics.
    pub fn path(&self) -> String {
        self.current_path().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases_unique() {
        let mut aliases = AliasGenerator::default();
        let a = aliases.next("a");
        let b = aliases.next("a");
        assert_ne!(a, b);
        assert_eq!(aliases.named("orders"), "orders");
        assert_ne!(aliases.named("orders"), "orders");
        assert_eq!(aliases.named("my store"), "my_store");
    }

    #[test]
    fn test_innermost_binding_wins() {
        let mut ctx = CompilationContext::default();
        let p = ApplyParameter(0);
        ctx.push_binding(p, vec![SqlExpr::column("a0", "Id")]);
        ctx.push_binding(p, vec![SqlExpr::column("a5", "Id")]);
        assert_eq!(ctx.resolve(p, 0).unwrap(), SqlExpr::column("a5", "Id"));
        ctx.pop_binding(p).unwrap();
        assert_eq!(ctx.resolve(p, 0).unwrap(), SqlExpr::column("a0", "Id"));
    }

    #[test]
    fn test_strict_scope_pop() {
        let mut ctx = CompilationContext::default();
        ctx.push_binding(ApplyParameter(1), vec![]);
        assert!(ctx.pop_binding(ApplyParameter(2)).is_err());
        assert!(ctx.resolve(ApplyParameter(1), 0).is_err());
    }
}
