/// Pre-compilation: provider tree → provider tree.
///
/// Passes run in the configured order, each one receiving the tree the
/// previous pass returned. A pass never mutates its input; unchanged
/// subtrees come back as the same `Arc`.
pub mod apply_corrector;
pub mod index;
pub mod simplifier;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::provider::ProviderRef;

pub use apply_corrector::ApplyProviderCorrector;
pub use index::cost::{CostModel, DefaultCostEvaluator};
pub use index::IndexOptimizer;
pub use simplifier::ProviderSimplifier;

/// A single rewrite pass over a provider tree.
///
/// # Example
///
/// ```ignore
/// struct DropStores;
///
/// impl PreCompiler for DropStores {
///     fn name(&self) -> &str { "drop_stores" }
///     fn process(&self, root: &ProviderRef) -> Result<ProviderRef> {
///         transform_up(root, &mut |node, _| Ok(match node.as_ref() {
///             Provider::Store { source, .. } => Some(Arc::clone(source)),
///             _ => None,
///         }))
///     }
/// }
/// ```
pub trait PreCompiler: Send + Sync {
    /// Unique name identifying this pass.
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Rewrite `root`, returning it unchanged if nothing applies.
    fn process(&self, root: &ProviderRef) -> Result<ProviderRef>;
}

/// Which of the built-in passes run, and how.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrecompileOptions {
    /// Fail when an Apply cannot be rewritten into a join.
    pub strict_apply_correction: bool,
    pub index_selection: bool,
    pub simplify: bool,
}

impl Default for PrecompileOptions {
    fn default() -> Self {
        Self {
            strict_apply_correction: false,
            index_selection: true,
            simplify: true,
        }
    }
}

/// Ordered pipeline of pre-compilation passes.
#[derive(Default)]
pub struct CompositePreCompiler {
    passes: Vec<Box<dyn PreCompiler>>,
}

impl CompositePreCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simplifier, Apply corrector, then index selection.
    pub fn with_defaults(options: &PrecompileOptions, cost: &CostModel) -> Self {
        let mut composite = Self::new();
        if options.simplify {
            composite.add_pass(Box::new(ProviderSimplifier));
        }
        composite.add_pass(Box::new(ApplyProviderCorrector::new(
            options.strict_apply_correction,
        )));
        if options.index_selection {
            composite.add_pass(Box::new(IndexOptimizer::new(Box::new(
                DefaultCostEvaluator::new(cost.clone()),
            ))));
        }
        composite
    }

    pub fn add_pass(&mut self, pass: Box<dyn PreCompiler>) {
        self.passes.push(pass);
    }

    /// Run every pass in order.
    pub fn process(&self, root: &ProviderRef) -> Result<ProviderRef> {
        let mut current = root.clone();
        for pass in &self.passes {
            let next = pass.process(&current).map_err(|e| Error::Pass {
                pass: pass.name().to_string(),
                source: Box::new(e),
            })?;
            debug!(
                pass = pass.name(),
                changed = !std::sync::Arc::ptr_eq(&next, &current),
                nodes = next.node_count(),
                "pre-compiler pass finished"
            );
            current = next;
        }
        Ok(current)
    }

    pub fn pass_names(&self) -> Vec<&str> {
        self.passes.iter().map(|p| p.name()).collect()
    }
}

impl PreCompiler for CompositePreCompiler {
    fn name(&self) -> &str {
        "composite"
    }

    fn process(&self, root: &ProviderRef) -> Result<ProviderRef> {
        CompositePreCompiler::process(self, root)
    }
}
