/// Apply → PredicateJoin rewriting.
///
/// An `Apply` re-evaluates its right side once per left row. When every use
/// of the apply parameter in the right subtree is a filter conjunct that can
/// be lifted to the top of that subtree, the conjuncts become the predicate
/// of an ordinary join and the right side no longer depends on the left row.
///
/// Lifting walks down through `Filter`, `Select`, `Calculate`, `Alias` and
/// `Sort`, into both sides of inner joins, and into the left side of outer
/// joins. A parameter reaching anything else (aggregation, paging,
/// `Distinct`, `Existence`, `Store`, a nested `Apply`, a computed column or
/// a column the projection drops) makes the node uncorrectable.
use std::sync::Arc;

use tracing::{debug, warn};

use super::PreCompiler;
use crate::error::{Error, Result};
use crate::provider::{
    transform_up, ApplyParameter, ApplyType, Expr, JoinType, NodePath, Provider, ProviderExt,
    ProviderRef, ScalarMode,
};

pub struct ApplyProviderCorrector {
    strict: bool,
}

impl ApplyProviderCorrector {
    /// With `strict`, an Apply that cannot be corrected fails the pass;
    /// otherwise it is left in place.
    pub fn new(strict: bool) -> Self {
        Self { strict }
    }
}

impl PreCompiler for ApplyProviderCorrector {
    fn name(&self) -> &str {
        "apply_corrector"
    }

    fn description(&self) -> &str {
        "Rewrites correlated Apply nodes into predicate joins"
    }

    fn process(&self, root: &ProviderRef) -> Result<ProviderRef> {
        transform_up(root, &mut |node, path| {
            let Provider::Apply {
                left,
                right,
                parameter,
                apply_type,
                join_type,
            } = node.as_ref()
            else {
                return Ok(None);
            };
            match correct(left, right, *parameter, *apply_type, *join_type, path) {
                Ok(join) => {
                    debug!(path = %path, parameter = %parameter, "apply rewritten into join");
                    Ok(Some(join))
                }
                Err(Fault { path, reason }) if self.strict => {
                    Err(Error::correction_fault(path, reason))
                }
                Err(Fault { path, reason }) => {
                    warn!(%path, %reason, "apply left uncorrected");
                    Ok(None)
                }
            }
        })
    }
}

struct Fault {
    path: String,
    reason: String,
}

impl Fault {
    fn at(path: &NodePath, reason: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

type Extracted = std::result::Result<(ProviderRef, Vec<Expr>), Fault>;

fn correct(
    left: &ProviderRef,
    right: &ProviderRef,
    parameter: ApplyParameter,
    apply_type: ApplyType,
    join_type: JoinType,
    path: &NodePath,
) -> std::result::Result<ProviderRef, Fault> {
    match apply_type {
        ApplyType::All | ApplyType::Scalar(ScalarMode::Single) => {}
        ApplyType::Scalar(ScalarMode::First) => {
            return Err(Fault::at(path, "first-row apply narrows cardinality"))
        }
        ApplyType::Existence => return Err(Fault::at(path, "existence apply adds a column")),
    }
    let left_width = left
        .header()
        .map_err(|e| Fault::at(path, e.to_string()))?
        .len();
    let right_path = path.child("right", right);
    let (new_right, terms) = extract(right, parameter, &right_path)?;
    if uses_parameter(&new_right, parameter) {
        return Err(Fault::at(&right_path, "parameter left in the right subtree"));
    }
    // outer references become left columns, right columns shift past them
    let predicate = Expr::conjunction(terms)
        .map(|p| {
            p.transform(&mut |e| match e {
                Expr::Column(i) => Some(Expr::Column(left_width + i)),
                Expr::Outer { param, column } if *param == parameter => Some(Expr::Column(*column)),
                _ => None,
            })
        })
        .unwrap_or_else(|| Expr::lit(true));
    Ok(Arc::clone(left).predicate_join(new_right, join_type, predicate))
}

/// Lifts the conjuncts using `parameter` out of `node`. The returned terms
/// address the columns of the returned provider.
fn extract(node: &ProviderRef, parameter: ApplyParameter, path: &NodePath) -> Extracted {
    if !uses_parameter(node, parameter) {
        return Ok((Arc::clone(node), Vec::new()));
    }
    let source_path = |source: &ProviderRef| path.child("source", source);
    match node.as_ref() {
        Provider::Filter { source, predicate } => {
            let (new_source, mut terms) = extract(source, parameter, &source_path(source))?;
            let (lifted, kept): (Vec<Expr>, Vec<Expr>) = predicate
                .conjuncts()
                .into_iter()
                .partition(|t| t.references(parameter));
            terms.extend(lifted);
            let provider = match Expr::conjunction(kept) {
                Some(predicate) => Arc::new(Provider::Filter {
                    source: new_source,
                    predicate,
                }),
                None => new_source,
            };
            Ok((provider, terms))
        }
        Provider::Select { source, columns } => {
            let (new_source, terms) = extract(source, parameter, &source_path(source))?;
            let terms = terms
                .into_iter()
                .map(|t| {
                    t.remap_columns(|c| columns.iter().position(|&s| s == c)).ok_or_else(|| {
                        Fault::at(path, "correlated column is not projected")
                    })
                })
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok((
                Arc::new(Provider::Select {
                    source: new_source,
                    columns: columns.clone(),
                }),
                terms,
            ))
        }
        Provider::Calculate { source, columns } => {
            if columns.iter().any(|c| c.expr.references(parameter)) {
                return Err(Fault::at(path, "parameter used in a computed column"));
            }
            let (new_source, terms) = extract(source, parameter, &source_path(source))?;
            Ok((Arc::new(node.with_children(vec![new_source])), terms))
        }
        Provider::Alias { source, .. } | Provider::Sort { source, .. } => {
            let (new_source, terms) = extract(source, parameter, &source_path(source))?;
            Ok((Arc::new(node.with_children(vec![new_source])), terms))
        }
        Provider::Join {
            left,
            right,
            join_type,
            ..
        } => {
            let (l, r, terms) = extract_join(left, right, *join_type, parameter, path)?;
            Ok((Arc::new(node.with_children(vec![l, r])), terms))
        }
        Provider::PredicateJoin {
            left,
            right,
            join_type,
            predicate,
        } => {
            let (lifted, kept): (Vec<Expr>, Vec<Expr>) = predicate
                .conjuncts()
                .into_iter()
                .partition(|t| t.references(parameter));
            if !lifted.is_empty() && *join_type == JoinType::LeftOuter {
                return Err(Fault::at(path, "parameter used in an outer join condition"));
            }
            let (l, r, mut terms) = extract_join(left, right, *join_type, parameter, path)?;
            terms.extend(lifted);
            Ok((
                l.predicate_join(
                    r,
                    *join_type,
                    Expr::conjunction(kept).unwrap_or_else(|| Expr::lit(true)),
                ),
                terms,
            ))
        }
        Provider::Aggregate { .. } => Err(Fault::at(path, "parameter used under an aggregate")),
        Provider::Take { .. } | Provider::Skip { .. } => {
            Err(Fault::at(path, "parameter used under paging"))
        }
        Provider::Distinct { .. } => Err(Fault::at(path, "parameter used under distinct")),
        Provider::Existence { .. } => Err(Fault::at(path, "parameter used under existence")),
        Provider::Store { .. } => Err(Fault::at(path, "parameter used under a store")),
        Provider::Apply { .. } => Err(Fault::at(path, "parameter used in a nested apply")),
        Provider::Index { .. } | Provider::RangeScan { .. } | Provider::Raw { .. } => {
            Ok((Arc::clone(node), Vec::new()))
        }
    }
}

fn extract_join(
    left: &ProviderRef,
    right: &ProviderRef,
    join_type: JoinType,
    parameter: ApplyParameter,
    path: &NodePath,
) -> std::result::Result<(ProviderRef, ProviderRef, Vec<Expr>), Fault> {
    let (l, mut terms) = extract(left, parameter, &path.child("left", left))?;
    let right_path = path.child("right", right);
    if join_type == JoinType::LeftOuter && uses_parameter(right, parameter) {
        return Err(Fault::at(&right_path, "parameter used in the optional side of an outer join"));
    }
    let (r, right_terms) = extract(right, parameter, &right_path)?;
    let left_width = l
        .header()
        .map_err(|e| Fault::at(path, e.to_string()))?
        .len();
    terms.extend(right_terms.into_iter().map(|t| {
        t.transform(&mut |e| match e {
            Expr::Column(i) => Some(Expr::Column(left_width + i)),
            _ => None,
        })
    }));
    Ok((l, r, terms))
}

/// True when any expression in the subtree references `parameter`.
pub fn uses_parameter(node: &Provider, parameter: ApplyParameter) -> bool {
    let here = match node {
        Provider::Filter { predicate, .. } | Provider::PredicateJoin { predicate, .. } => {
            predicate.references(parameter)
        }
        Provider::Calculate { columns, .. } => columns.iter().any(|c| c.expr.references(parameter)),
        _ => false,
    };
    here || node
        .children()
        .into_iter()
        .any(|(_, child)| uses_parameter(child, parameter))
}
