/// Index selection pass.
///
/// Finds chains of `Filter` (and `Alias`) nodes over a table scan, extracts
/// the key ranges their predicates imply on each index of the table, and
/// replaces the scan with a `RangeScan` of the cheapest index. Each chain is
/// handled once from its top, so stacked filters choose among all indexes
/// with every predicate in view. The filters stay in place, so the rewritten
/// tree returns the same rows.
pub mod cost;
pub mod extract;
pub mod selector;

use std::sync::Arc;

use tracing::debug;

use super::PreCompiler;
use crate::error::Result;
use crate::provider::{Expr, Provider, ProviderRef, TableInfo};

use cost::CostEvaluator;
use extract::extract_ranges;
use selector::{CostBasedSelector, IndexSelector};

pub struct IndexOptimizer {
    selector: CostBasedSelector,
}

impl IndexOptimizer {
    pub fn new(evaluator: Box<dyn CostEvaluator>) -> Self {
        Self {
            selector: CostBasedSelector::new(evaluator),
        }
    }

    /// Walks top-down so every Filter/Alias chain is seen whole from its
    /// topmost node, with all of its predicates.
    fn optimize(&self, node: &ProviderRef) -> ProviderRef {
        if matches!(node.as_ref(), Provider::Filter { .. }) {
            if let Some((table, predicates, scan)) = filter_chain(node) {
                return self
                    .rewrite(node, table, &predicates, scan)
                    .unwrap_or_else(|| Arc::clone(node));
            }
        }
        let children = node.children();
        let mut rewritten = Vec::with_capacity(children.len());
        let mut changed = false;
        for (_, child) in &children {
            let new_child = self.optimize(child);
            changed |= !Arc::ptr_eq(&new_child, child);
            rewritten.push(new_child);
        }
        if changed {
            Arc::new(node.with_children(rewritten))
        } else {
            Arc::clone(node)
        }
    }

    fn rewrite(
        &self,
        node: &ProviderRef,
        table: &Arc<TableInfo>,
        predicates: &[&Expr],
        scan: &ProviderRef,
    ) -> Option<ProviderRef> {
        let candidates: Vec<_> = predicates
            .iter()
            .flat_map(|p| extract_ranges(p, table))
            .collect();

        // a range scan given as input keeps its index and can only narrow
        if let Provider::RangeScan { index, ranges, .. } = scan.as_ref() {
            let narrowed = candidates
                .iter()
                .filter(|c| c.index == *index)
                .fold(ranges.clone(), |acc, c| acc.intersect(&c.ranges));
            if narrowed == *ranges {
                return None;
            }
            let scan = Arc::new(Provider::RangeScan {
                table: Arc::clone(table),
                index: Arc::clone(index),
                ranges: narrowed,
            });
            return Some(replace_scan(node, scan));
        }

        let selected = self.selector.select(table, &candidates);
        let (index, info) = selected.into_iter().next()?;
        debug!(
            table = %table.name,
            index = %index.name,
            ranges = %info.ranges,
            cost = info.cost.cost,
            "index selected"
        );
        let scan = Arc::new(Provider::RangeScan {
            table: Arc::clone(table),
            index,
            ranges: info.ranges,
        });
        Some(replace_scan(node, scan))
    }
}

/// Predicates of a Filter/Alias chain ending in a table scan, with the
/// scanned table and the scan node.
fn filter_chain(node: &ProviderRef) -> Option<(&Arc<TableInfo>, Vec<&Expr>, &ProviderRef)> {
    let mut predicates = Vec::new();
    let mut current = node;
    loop {
        match current.as_ref() {
            Provider::Filter { source, predicate } => {
                predicates.push(predicate);
                current = source;
            }
            Provider::Alias { source, .. } => current = source,
            Provider::Index { table } | Provider::RangeScan { table, .. } => {
                return Some((table, predicates, current))
            }
            _ => return None,
        }
    }
}

/// Rebuilds the Filter/Alias chain above a new scan.
fn replace_scan(node: &ProviderRef, scan: ProviderRef) -> ProviderRef {
    match node.as_ref() {
        Provider::Filter { source, .. } | Provider::Alias { source, .. } => {
            Arc::new(node.with_children(vec![replace_scan(source, scan)]))
        }
        _ => scan,
    }
}

impl PreCompiler for IndexOptimizer {
    fn name(&self) -> &str {
        "index_selection"
    }

    fn description(&self) -> &str {
        "Replaces filtered table scans with range scans of the cheapest index"
    }

    fn process(&self, root: &ProviderRef) -> Result<ProviderRef> {
        Ok(self.optimize(root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::precompile::index::cost::DefaultCostEvaluator;
    use crate::provider::{BinaryOp, ProviderExt, TableBuilder, TableExt};
    use crate::value::{ColumnType, Value};

    fn optimizer() -> IndexOptimizer {
        IndexOptimizer::new(Box::new(DefaultCostEvaluator::default()))
    }

    fn person() -> Arc<TableInfo> {
        TableBuilder::new("Person")
            .columns(&[
                ("Id", ColumnType::Int),
                ("Email", ColumnType::String),
                ("FirstName", ColumnType::String),
                ("LastName", ColumnType::String),
            ])
            .primary_key(&[0])
            .index("IX_Email", &[1], true)
            .index("IX_Name", &[2, 3], false)
            .build()
    }

    #[test]
    fn test_filter_over_alias_gets_range_scan() {
        let root = person()
            .scan()
            .alias("p")
            .filter(Expr::eq(Expr::col(1), Expr::lit("x@example.com")));
        let out = optimizer().process(&root).unwrap();
        let Provider::Filter { source, predicate } = out.as_ref() else {
            panic!("expected filter, got {:?}", out)
        };
        assert_eq!(
            *predicate,
            Expr::eq(Expr::col(1), Expr::lit("x@example.com"))
        );
        let Provider::Alias { source, .. } = source.as_ref() else {
            panic!("expected alias, got {:?}", source)
        };
        match source.as_ref() {
            Provider::RangeScan { index, ranges, .. } => {
                assert_eq!(index.name, "IX_Email");
                assert!(ranges.contains(&[Value::from("x@example.com")]));
            }
            other => panic!("expected range scan, got {:?}", other),
        }
    }

    #[test]
    fn test_unrestricted_filter_untouched() {
        let root = person()
            .scan()
            .filter(Expr::binary(BinaryOp::Like, Expr::col(1), Expr::lit("%x")));
        let out = optimizer().process(&root).unwrap();
        assert!(Arc::ptr_eq(&out, &root));
    }

    #[test]
    fn test_stacked_filters_narrow_once() {
        let root = person()
            .scan()
            .filter(Expr::binary(BinaryOp::GtEq, Expr::col(0), Expr::lit(10i64)))
            .filter(Expr::binary(BinaryOp::Lt, Expr::col(0), Expr::lit(20i64)));
        let out = optimizer().process(&root).unwrap();
        let again = optimizer().process(&out).unwrap();
        assert!(Arc::ptr_eq(&out, &again));
        let mut scan = &out;
        while let Provider::Filter { source, .. } = scan.as_ref() {
            scan = source;
        }
        match scan.as_ref() {
            Provider::RangeScan { ranges, .. } => {
                assert!(ranges.contains(&[Value::Int(15)]));
                assert!(!ranges.contains(&[Value::Int(5)]));
                assert!(!ranges.contains(&[Value::Int(20)]));
            }
            other => panic!("expected range scan, got {:?}", other),
        }
    }

    fn scan_below(node: &ProviderRef) -> &ProviderRef {
        match node.as_ref() {
            Provider::Filter { source, .. } | Provider::Alias { source, .. } => scan_below(source),
            _ => node,
        }
    }

    #[test]
    fn test_outer_filter_can_pick_a_different_index() {
        // the inner filter alone would pick the primary key
        let root = person()
            .scan()
            .filter(Expr::binary(BinaryOp::Gt, Expr::col(0), Expr::lit(0i64)))
            .alias("p")
            .filter(Expr::eq(Expr::col(1), Expr::lit("x")));
        let out = optimizer().process(&root).unwrap();
        match scan_below(&out).as_ref() {
            Provider::RangeScan { index, ranges, .. } => {
                assert_eq!(index.name, "IX_Email");
                assert!(ranges.contains(&[Value::from("x")]));
                assert!(!ranges.contains(&[Value::from("y")]));
            }
            other => panic!("expected range scan, got {:?}", other),
        }
        let Provider::Filter { source, .. } = out.as_ref() else {
            panic!("expected filter, got {:?}", out)
        };
        assert!(matches!(source.as_ref(), Provider::Alias { .. }));
    }

    #[test]
    fn test_chain_and_merged_filter_agree() {
        let stacked = person()
            .scan()
            .filter(Expr::binary(BinaryOp::Gt, Expr::col(0), Expr::lit(0i64)))
            .filter(Expr::eq(Expr::col(1), Expr::lit("x")));
        let merged = person().scan().filter(Expr::and(
            Expr::binary(BinaryOp::Gt, Expr::col(0), Expr::lit(0i64)),
            Expr::eq(Expr::col(1), Expr::lit("x")),
        ));
        let name = |root: &ProviderRef| {
            let out = optimizer().process(root).unwrap();
            match scan_below(&out).as_ref() {
                Provider::RangeScan { index, .. } => index.name.clone(),
                other => panic!("expected range scan, got {:?}", other),
            }
        };
        assert_eq!(name(&stacked), name(&merged));
    }
}
