/// Normalization pass.
///
/// - `Select` of every source column in order → the source
/// - `Filter(true)` → the source
/// - `Filter(p, Filter(q, x))` → `Filter(q AND p, x)`
use std::sync::Arc;

use super::PreCompiler;
use crate::error::Result;
use crate::provider::{transform_up, Expr, Provider, ProviderRef};

pub struct ProviderSimplifier;

impl PreCompiler for ProviderSimplifier {
    fn name(&self) -> &str {
        "simplifier"
    }

    fn description(&self) -> &str {
        "Removes identity projections and trivial filters, merges stacked filters"
    }

    fn process(&self, root: &ProviderRef) -> Result<ProviderRef> {
        transform_up(root, &mut |node, _| simplify(node))
    }
}

fn simplify(node: &ProviderRef) -> Result<Option<ProviderRef>> {
    match node.as_ref() {
        Provider::Select { source, columns } => {
            let width = source.header()?.len();
            let identity =
                columns.len() == width && columns.iter().enumerate().all(|(i, &c)| i == c);
            Ok(identity.then(|| Arc::clone(source)))
        }
        Provider::Filter { source, predicate } if predicate.is_true_literal() => {
            Ok(Some(Arc::clone(source)))
        }
        Provider::Filter { source, predicate } => match source.as_ref() {
            Provider::Filter {
                source: inner,
                predicate: inner_predicate,
            } => Ok(Some(Arc::new(Provider::Filter {
                source: Arc::clone(inner),
                predicate: Expr::and(inner_predicate.clone(), predicate.clone()),
            }))),
            _ => Ok(None),
        },
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{table, ProviderExt, TableExt};
    use crate::value::ColumnType;

    fn t() -> Arc<crate::provider::TableInfo> {
        table("T", &[("a", ColumnType::Int), ("b", ColumnType::Int)])
    }

    #[test]
    fn test_merges_stacked_filters() {
        let root = t()
            .scan()
            .filter(Expr::eq(Expr::col(0), Expr::lit(1i64)))
            .filter(Expr::eq(Expr::col(1), Expr::lit(2i64)))
            .filter(Expr::lit(true));
        let out = ProviderSimplifier.process(&root).unwrap();
        match out.as_ref() {
            Provider::Filter { source, predicate } => {
                assert_eq!(source.kind_name(), "Index");
                assert_eq!(predicate.conjuncts().len(), 2);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_identity_select_removed_reorder_kept() {
        let scan = t().scan();
        let out = ProviderSimplifier
            .process(&scan.clone().select(vec![0, 1]))
            .unwrap();
        assert!(Arc::ptr_eq(&out, &scan));
        let swapped = scan.select(vec![1, 0]);
        let out = ProviderSimplifier.process(&swapped).unwrap();
        assert!(Arc::ptr_eq(&out, &swapped));
    }

    #[test]
    fn test_normal_form_is_fixed_point() {
        let root = t()
            .scan()
            .filter(Expr::eq(Expr::col(0), Expr::lit(1i64)))
            .filter(Expr::eq(Expr::col(1), Expr::lit(2i64)))
            .select(vec![1]);
        let once = ProviderSimplifier.process(&root).unwrap();
        let twice = ProviderSimplifier.process(&once).unwrap();
        assert_eq!(once, twice);
        assert!(Arc::ptr_eq(&once, &twice));
    }
}
