//! Structural traversal and bottom-up rewriting of provider trees.
//!
//! Rewrites never mutate nodes: a node is rebuilt only when one of its
//! children changed, otherwise the original `Arc` is returned so unchanged
//! subtrees stay shared between the input and output trees.

use std::fmt;
use std::sync::Arc;

use super::types::{Provider, ProviderRef};
use crate::error::Result;

/// Location of a node in the tree, rendered as `Apply/right/Filter`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodePath {
    segments: Vec<String>,
}

impl NodePath {
    pub fn root(provider: &Provider) -> Self {
        Self {
            segments: vec![provider.label()],
        }
    }

    /// Path of a child reached through the edge named `edge`.
    pub fn child(&self, edge: &str, provider: &Provider) -> Self {
        let mut segments = self.segments.clone();
        if edge != "source" {
            segments.push(edge.to_string());
        }
        segments.push(provider.label());
        Self { segments }
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

impl Provider {
    /// Children with their edge names (`source`, `left`, `right`).
    pub fn children(&self) -> Vec<(&'static str, &ProviderRef)> {
        match self {
            Provider::Index { .. } | Provider::RangeScan { .. } | Provider::Raw { .. } => vec![],
            Provider::Filter { source, .. }
            | Provider::Select { source, .. }
            | Provider::Calculate { source, .. }
            | Provider::Alias { source, .. }
            | Provider::Sort { source, .. }
            | Provider::Take { source, .. }
            | Provider::Skip { source, .. }
            | Provider::Distinct { source }
            | Provider::Aggregate { source, .. }
            | Provider::Existence { source, .. }
            | Provider::Store { source, .. } => vec![("source", source)],
            Provider::Join { left, right, .. }
            | Provider::PredicateJoin { left, right, .. }
            | Provider::Apply { left, right, .. } => vec![("left", left), ("right", right)],
        }
    }

    /// Copy of this node with its children replaced, in `children()` order.
    pub fn with_children(&self, mut children: Vec<ProviderRef>) -> Provider {
        let mut next = || children.remove(0);
        match self {
            Provider::Index { .. } | Provider::RangeScan { .. } | Provider::Raw { .. } => {
                self.clone()
            }
            Provider::Filter { predicate, .. } => Provider::Filter {
                source: next(),
                predicate: predicate.clone(),
            },
            Provider::Select { columns, .. } => Provider::Select {
                source: next(),
                columns: columns.clone(),
            },
            Provider::Calculate { columns, .. } => Provider::Calculate {
                source: next(),
                columns: columns.clone(),
            },
            Provider::Alias { alias, .. } => Provider::Alias {
                source: next(),
                alias: alias.clone(),
            },
            Provider::Sort { order, .. } => Provider::Sort {
                source: next(),
                order: order.clone(),
            },
            Provider::Take { count, .. } => Provider::Take {
                source: next(),
                count: *count,
            },
            Provider::Skip { count, .. } => Provider::Skip {
                source: next(),
                count: *count,
            },
            Provider::Distinct { .. } => Provider::Distinct { source: next() },
            Provider::Aggregate {
                group_by,
                aggregates,
                ..
            } => Provider::Aggregate {
                source: next(),
                group_by: group_by.clone(),
                aggregates: aggregates.clone(),
            },
            Provider::Existence { column_name, .. } => Provider::Existence {
                source: next(),
                column_name: column_name.clone(),
            },
            Provider::Store { name, .. } => Provider::Store {
                source: next(),
                name: name.clone(),
            },
            Provider::Join {
                join_type, pairs, ..
            } => Provider::Join {
                left: next(),
                right: next(),
                join_type: *join_type,
                pairs: pairs.clone(),
            },
            Provider::PredicateJoin {
                join_type,
                predicate,
                ..
            } => Provider::PredicateJoin {
                left: next(),
                right: next(),
                join_type: *join_type,
                predicate: predicate.clone(),
            },
            Provider::Apply {
                parameter,
                apply_type,
                join_type,
                ..
            } => Provider::Apply {
                left: next(),
                right: next(),
                parameter: *parameter,
                apply_type: *apply_type,
                join_type: *join_type,
            },
        }
    }

    /// Number of nodes in the tree (shared subtrees counted per occurrence).
    pub fn node_count(&self) -> usize {
        1 + self
            .children()
            .iter()
            .map(|(_, c)| c.node_count())
            .sum::<usize>()
    }
}

/// Rewrite `root` bottom-up. `f` sees each node after its children were
/// rewritten and returns `Some(replacement)` or `None` to keep the node.
pub fn transform_up<F>(root: &ProviderRef, f: &mut F) -> Result<ProviderRef>
where
    F: FnMut(&ProviderRef, &NodePath) -> Result<Option<ProviderRef>>,
{
    transform_up_at(root, &NodePath::root(root), f)
}

fn transform_up_at<F>(node: &ProviderRef, path: &NodePath, f: &mut F) -> Result<ProviderRef>
where
    F: FnMut(&ProviderRef, &NodePath) -> Result<Option<ProviderRef>>,
{
    let children = node.children();
    let mut rewritten = Vec::with_capacity(children.len());
    let mut changed = false;
    for (edge, child) in &children {
        let new_child = transform_up_at(child, &path.child(edge, child), f)?;
        changed |= !Arc::ptr_eq(&new_child, child);
        rewritten.push(new_child);
    }
    let current = if changed {
        Arc::new(node.with_children(rewritten))
    } else {
        Arc::clone(node)
    };
    Ok(f(&current, path)?.unwrap_or(current))
}
