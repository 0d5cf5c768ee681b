/// Cost-based choice of one index per filtered table scan.
use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use super::cost::{CostEvaluator, CostInfo};
use super::extract::ExtractionResult;
use crate::provider::{IndexInfo, RangeSet, TableInfo};

/// Ranges chosen for one index with their estimated cost.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeSetInfo {
    pub ranges: RangeSet,
    pub cost: CostInfo,
}

pub trait IndexSelector {
    /// Picks the index to scan for `table` given the ranges extracted from
    /// its filters. An empty map means a full scan.
    fn select(
        &self,
        table: &TableInfo,
        candidates: &[ExtractionResult],
    ) -> HashMap<Arc<IndexInfo>, RangeSetInfo>;
}

pub struct CostBasedSelector {
    evaluator: Box<dyn CostEvaluator>,
}

impl CostBasedSelector {
    pub fn new(evaluator: Box<dyn CostEvaluator>) -> Self {
        Self { evaluator }
    }

    /// Cost of scanning the whole table through its primary index.
    pub fn full_scan_cost(&self, table: &TableInfo) -> Option<CostInfo> {
        table
            .primary_index()
            .or_else(|| table.indexes.first())
            .map(|index| self.evaluator.evaluate(index, &RangeSet::full()))
    }
}

impl IndexSelector for CostBasedSelector {
    fn select(
        &self,
        table: &TableInfo,
        candidates: &[ExtractionResult],
    ) -> HashMap<Arc<IndexInfo>, RangeSetInfo> {
        // ranges from every filter on the same index are intersected
        let mut best: Option<(&Arc<IndexInfo>, RangeSetInfo)> = None;
        for index in &table.indexes {
            let ranges = candidates
                .iter()
                .filter(|c| c.index == *index)
                .map(|c| &c.ranges)
                .fold(RangeSet::full(), |acc, r| acc.intersect(r));
            if ranges.is_full() {
                continue;
            }
            let cost = self.evaluator.evaluate(index, &ranges);
            let candidate = RangeSetInfo { ranges, cost };
            let better = match &best {
                None => true,
                Some((current, info)) => match cost.cost.total_cmp(&info.cost.cost) {
                    std::cmp::Ordering::Less => true,
                    std::cmp::Ordering::Greater => false,
                    // earlier declaration already holds the tie unless it is not primary
                    std::cmp::Ordering::Equal => index.primary && !current.primary,
                },
            };
            if better {
                best = Some((index, candidate));
            }
        }

        let mut selected = HashMap::new();
        if let Some((index, info)) = best {
            let beats_full_scan = self
                .full_scan_cost(table)
                .map_or(true, |full| info.cost.cost < full.cost);
            if beats_full_scan {
                selected.insert(Arc::clone(index), info);
            }
        }
        selected
    }
}
