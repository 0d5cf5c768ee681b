/// Cost model for index range scans.
///
/// Cost is `access_overhead[pattern] + estimated_rows * row_cost`. Row
/// estimates come from the index's key sample when statistics exist, and
/// from the shape of the ranges otherwise. Both estimates never grow when the
/// range set shrinks.
use serde::{Deserialize, Serialize};

use crate::provider::{Cut, IndexInfo, KeyRange, RangeSet};

/// How an index is read, cheapest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessPattern {
    /// Nothing to read.
    Empty,
    /// Every range is a full key of a unique index.
    Point,
    Range,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostInfo {
    pub estimated_rows: f64,
    pub access: AccessPattern,
    pub cost: f64,
}

pub trait CostEvaluator: Send + Sync {
    fn evaluate(&self, index: &IndexInfo, ranges: &RangeSet) -> CostInfo;
}

/// Fixed cost of opening each access pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessOverhead {
    pub empty: f64,
    pub point: f64,
    pub range: f64,
    pub full: f64,
}

impl Default for AccessOverhead {
    fn default() -> Self {
        Self {
            empty: 0.0,
            point: 1.0,
            range: 4.0,
            full: 8.0,
        }
    }
}

impl AccessOverhead {
    fn of(&self, access: AccessPattern) -> f64 {
        match access {
            AccessPattern::Empty => self.empty,
            AccessPattern::Point => self.point,
            AccessPattern::Range => self.range,
            AccessPattern::Full => self.full,
        }
    }
}

/// Tunable parameters of [`DefaultCostEvaluator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostModel {
    pub row_cost: f64,
    pub access_overhead: AccessOverhead,
    /// Table size assumed when an index has no statistics.
    pub default_row_count: u64,
    /// Fraction of rows matching one equality on a non-unique key column.
    pub equality_selectivity: f64,
    /// Fraction of rows matching a range bounded on both sides.
    pub bounded_selectivity: f64,
    /// Fraction of rows matching a range bounded on one side.
    pub open_selectivity: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            row_cost: 1.0,
            access_overhead: AccessOverhead::default(),
            default_row_count: 1000,
            equality_selectivity: 0.1,
            bounded_selectivity: 0.1,
            open_selectivity: 0.3,
        }
    }
}

pub struct DefaultCostEvaluator {
    model: CostModel,
}

impl DefaultCostEvaluator {
    pub fn new(model: CostModel) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &CostModel {
        &self.model
    }

    fn access_pattern(index: &IndexInfo, ranges: &RangeSet) -> AccessPattern {
        if ranges.is_empty() {
            AccessPattern::Empty
        } else if ranges.is_full() {
            AccessPattern::Full
        } else if index.is_unique_key()
            && ranges.ranges().iter().all(|r| {
                r.point_prefix()
                    .is_some_and(|p| p.len() >= index.key_columns.len())
            })
        {
            AccessPattern::Point
        } else {
            AccessPattern::Range
        }
    }

    /// Rows an index read returns. Never grows when `ranges` shrinks: the
    /// sample estimate counts sampled keys inside the set, and the shape
    /// estimate is the cheapest cover of the set by hulls of adjacent ranges.
    fn estimate_rows(&self, index: &IndexInfo, ranges: &RangeSet, access: AccessPattern) -> f64 {
        if access == AccessPattern::Empty {
            return 0.0;
        }
        let rows = match index.statistics.as_ref().filter(|s| !s.sample.is_empty()) {
            Some(stats) => {
                let hits = stats.sample.iter().filter(|key| ranges.contains(key)).count();
                let fraction = hits as f64 / stats.sample.len() as f64;
                (stats.row_count as f64 * fraction).max(1.0)
            }
            None => {
                let total = index
                    .statistics
                    .as_ref()
                    .map(|s| s.row_count)
                    .unwrap_or(self.model.default_row_count) as f64;
                (total * self.cover_fraction(ranges.ranges())).max(1.0)
            }
        };
        match access {
            // one row per key, but never more than a range read would see
            AccessPattern::Point => rows.min(ranges.ranges().len() as f64),
            _ => rows,
        }
    }

    /// Minimum over all groupings of adjacent ranges of the summed hull
    /// fractions. Grouping every range alone gives the plain sum and one
    /// group gives the enclosing hull.
    fn cover_fraction(&self, ranges: &[KeyRange]) -> f64 {
        // best[j]: cheapest cover of ranges[..j]
        let mut best = vec![0.0f64; ranges.len() + 1];
        for j in 1..=ranges.len() {
            let cheapest = (0..j)
                .map(|i| best[i] + self.span_fraction(&ranges[i].from, &ranges[j - 1].to))
                .fold(f64::INFINITY, f64::min);
            best[j] = cheapest;
        }
        best[ranges.len()].min(1.0)
    }

    /// Fraction of rows between two cuts. Shrinks with every key column the
    /// bounds share, so a range inside another never gets a larger fraction.
    fn span_fraction(&self, from: &Cut, to: &Cut) -> f64 {
        let equality = self.model.equality_selectivity.max(0.0).min(1.0);
        let bounded = self.model.bounded_selectivity.max(equality).min(1.0);
        let open = self.model.open_selectivity.max(bounded).min(1.0);
        let (lo, hi) = match (from.key(), to.key()) {
            (Some(lo), Some(hi)) => (lo, hi),
            (None, None) => return 1.0,
            _ => return open,
        };
        let shared = lo.iter().zip(hi).take_while(|(a, b)| a == b).count();
        let tail = if shared == lo.len() && shared == hi.len() {
            if matches!((from, to), (Cut::Below(_), Cut::Above(_))) {
                1.0
            } else {
                open
            }
        } else if shared < lo.len() && shared < hi.len() {
            bounded
        } else {
            // one bound stops at the shared prefix
            open
        };
        equality.powi(shared as i32) * tail
    }
}

impl Default for DefaultCostEvaluator {
    fn default() -> Self {
        Self::new(CostModel::default())
    }
}

impl CostEvaluator for DefaultCostEvaluator {
    fn evaluate(&self, index: &IndexInfo, ranges: &RangeSet) -> CostInfo {
        let access = Self::access_pattern(index, ranges);
        let estimated_rows = self.estimate_rows(index, ranges, access);
        CostInfo {
            estimated_rows,
            access,
            cost: self.model.access_overhead.of(access) + estimated_rows * self.model.row_cost,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{Cut, IndexStatistics, SortKey};
    use crate::value::Value;

    fn index(unique: bool, statistics: Option<IndexStatistics>) -> IndexInfo {
        IndexInfo {
            name: "IX".into(),
            table: "T".into(),
            key_columns: vec![SortKey::asc(0)],
            primary: false,
            unique,
            statistics,
        }
    }

    fn between(lo: i64, hi: i64) -> RangeSet {
        RangeSet::from_ranges(vec![KeyRange::new(
            Cut::Below(vec![Value::Int(lo)]),
            Cut::Above(vec![Value::Int(hi)]),
        )])
    }

    #[test]
    fn test_access_pattern_ranks() {
        let eval = DefaultCostEvaluator::default();
        let unique = index(true, None);
        let point = RangeSet::from_ranges(vec![KeyRange::point(vec![Value::Int(4)])]);
        assert_eq!(eval.evaluate(&unique, &RangeSet::empty()).access, AccessPattern::Empty);
        assert_eq!(eval.evaluate(&unique, &point).access, AccessPattern::Point);
        assert_eq!(eval.evaluate(&unique, &between(1, 9)).access, AccessPattern::Range);
        assert_eq!(eval.evaluate(&unique, &RangeSet::full()).access, AccessPattern::Full);
        assert_eq!(eval.evaluate(&index(false, None), &point).access, AccessPattern::Range);
        assert!(AccessPattern::Point < AccessPattern::Range);
    }

    #[test]
    fn test_sampled_cost_is_monotonic() {
        let stats = IndexStatistics {
            row_count: 10_000,
            sample: (0..100).map(|i| vec![Value::Int(i)]).collect(),
        };
        let ix = index(false, Some(stats));
        let eval = DefaultCostEvaluator::default();
        let mut previous = eval.evaluate(&ix, &RangeSet::full()).cost;
        for hi in (0..100).rev().step_by(7) {
            let cost = eval.evaluate(&ix, &between(0, hi)).cost;
            assert!(cost <= previous, "cost grew from {} to {}", previous, cost);
            previous = cost;
        }
    }

    #[test]
    fn test_shape_estimates_nest() {
        let eval = DefaultCostEvaluator::default();
        let ix = index(false, None);
        let point = RangeSet::from_ranges(vec![KeyRange::point(vec![Value::Int(4)])]);
        let open = RangeSet::from_ranges(vec![KeyRange::new(
            Cut::Below(vec![Value::Int(1)]),
            Cut::AboveAll,
        )]);
        let p = eval.evaluate(&ix, &point).cost;
        let b = eval.evaluate(&ix, &between(1, 9)).cost;
        let o = eval.evaluate(&ix, &open).cost;
        let f = eval.evaluate(&ix, &RangeSet::full()).cost;
        assert!(p <= b && b <= o && o <= f);
    }

    #[test]
    fn test_split_ranges_cost_no_more_than_their_hull() {
        let eval = DefaultCostEvaluator::default();
        let wide = between(1, 9);
        let split = between(1, 2).union(&between(5, 6));
        let points = RangeSet::from_ranges((1..=3).map(|i| KeyRange::point(vec![Value::Int(i)])));
        for ix in [index(false, None), index(true, None)] {
            let wide_cost = eval.evaluate(&ix, &wide).cost;
            assert!(split.is_subset_of(&wide) && points.is_subset_of(&wide));
            assert!(eval.evaluate(&ix, &split).cost <= wide_cost);
            assert!(eval.evaluate(&ix, &points).cost <= wide_cost);
        }
    }

    #[test]
    fn test_point_rows_capped_by_sample() {
        // three unique keys, none of them in the sample
        let stats = IndexStatistics {
            row_count: 10,
            sample: (100..110).map(|i| vec![Value::Int(i)]).collect(),
        };
        let ix = index(true, Some(stats));
        let eval = DefaultCostEvaluator::default();
        let points = RangeSet::from_ranges((1..=3).map(|i| KeyRange::point(vec![Value::Int(i)])));
        let info = eval.evaluate(&ix, &points);
        assert_eq!(info.access, AccessPattern::Point);
        assert!(info.cost <= eval.evaluate(&ix, &between(1, 3)).cost);
    }

    #[test]
    fn test_misordered_model_stays_monotonic() {
        let model = CostModel {
            equality_selectivity: 0.5,
            bounded_selectivity: 0.05,
            open_selectivity: 0.01,
            ..CostModel::default()
        };
        let eval = DefaultCostEvaluator::new(model);
        let ix = index(false, None);
        let point = RangeSet::from_ranges(vec![KeyRange::point(vec![Value::Int(4)])]);
        let open = RangeSet::from_ranges(vec![KeyRange::new(
            Cut::Below(vec![Value::Int(1)]),
            Cut::AboveAll,
        )]);
        let p = eval.evaluate(&ix, &point).cost;
        let b = eval.evaluate(&ix, &between(1, 9)).cost;
        let o = eval.evaluate(&ix, &open).cost;
        assert!(p <= b && b <= o, "{} {} {}", p, b, o);
    }

    /// Small deterministic generator for randomized range sets.
    struct Lcg(u64);

    impl Lcg {
        fn below(&mut self, n: u64) -> u64 {
            self.0 = self
                .0
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            (self.0 >> 33) % n
        }

        fn value(&mut self) -> Value {
            Value::Int(self.below(20) as i64)
        }

        fn key(&mut self, width: usize) -> Vec<Value> {
            (0..width).map(|_| self.value()).collect()
        }

        fn range(&mut self, width: usize) -> KeyRange {
            match self.below(6) {
                0 => KeyRange::point(self.key(width)),
                1 => KeyRange::point(vec![self.value()]),
                2 => {
                    let lo = self.key(width);
                    KeyRange::new(Cut::Below(lo), Cut::Above(self.key(width)))
                }
                3 if width > 1 => {
                    let prefix = self.value();
                    let lo = self.value();
                    // k1 = prefix AND k2 > lo
                    KeyRange::new(Cut::Above(vec![prefix.clone(), lo]), Cut::Above(vec![prefix]))
                }
                4 => KeyRange::new(Cut::BelowAll, Cut::Below(self.key(width))),
                _ => KeyRange::new(Cut::Above(self.key(width)), Cut::AboveAll),
            }
        }

        fn set(&mut self, width: usize) -> RangeSet {
            let count = 1 + self.below(4);
            RangeSet::from_ranges((0..count).map(|_| self.range(width)).collect::<Vec<_>>())
        }
    }

    #[test]
    fn test_subset_never_costs_more() {
        let mut rng = Lcg(0x5eed);
        let eval = DefaultCostEvaluator::default();
        for width in [1usize, 2] {
            let stats = IndexStatistics {
                row_count: 5_000,
                sample: (0..200)
                    .map(|_| rng.key(width))
                    .collect(),
            };
            let mut indexes = Vec::new();
            for unique in [false, true] {
                for statistics in [None, Some(stats.clone())] {
                    let mut ix = index(unique, statistics);
                    ix.key_columns = (0..width).map(SortKey::asc).collect();
                    indexes.push(ix);
                }
            }
            for _ in 0..500 {
                let wide = rng.set(width);
                let narrow = wide.intersect(&rng.set(width));
                assert!(narrow.is_subset_of(&wide), "{} not within {}", narrow, wide);
                for ix in &indexes {
                    let (n, w) = (eval.evaluate(ix, &narrow), eval.evaluate(ix, &wide));
                    assert!(
                        n.cost <= w.cost + 1e-9,
                        "{} costs {} but its superset {} costs {} (unique {}, sampled {})",
                        narrow,
                        n.cost,
                        wide,
                        w.cost,
                        ix.unique,
                        ix.statistics.is_some()
                    );
                }
            }
        }
    }
}
