//! Key range sets over index key tuples.
//!
//! A range bound is a [`Cut`]: a position in the ordered key space that lies
//! just below or just above every tuple starting with a given key prefix.
//! Prefix cuts make compound keys work naturally: `k1 = 5` is the range
//! `Below([5])..Above([5])`, and `k1 = 5 AND k2 > 3` is
//! `Above([5, 3])..Above([5])`.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cut {
    BelowAll,
    Below(Vec<Value>),
    Above(Vec<Value>),
    AboveAll,
}

impl Cut {
    fn rank(&self) -> u8 {
        match self {
            Cut::BelowAll => 0,
            Cut::Below(_) | Cut::Above(_) => 1,
            Cut::AboveAll => 2,
        }
    }

    pub fn key(&self) -> Option<&[Value]> {
        match self {
            Cut::Below(k) | Cut::Above(k) => Some(k.as_slice()),
            _ => None,
        }
    }

    /// True when the cut lies below the full key tuple `key`.
    pub fn is_below(&self, key: &[Value]) -> bool {
        match self {
            Cut::BelowAll => true,
            Cut::AboveAll => false,
            Cut::Below(prefix) | Cut::Above(prefix) => {
                for (a, b) in prefix.iter().zip(key) {
                    match a.cmp(b) {
                        Ordering::Less => return true,
                        Ordering::Greater => return false,
                        Ordering::Equal => {}
                    }
                }
                matches!(self, Cut::Below(_))
            }
        }
    }
}

impl Ord for Cut {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b) = match (self, other) {
            (Cut::Below(a) | Cut::Above(a), Cut::Below(b) | Cut::Above(b)) => (a, b),
            _ => return self.rank().cmp(&other.rank()),
        };
        for (x, y) in a.iter().zip(b) {
            match x.cmp(y) {
                Ordering::Equal => {}
                non_eq => return non_eq,
            }
        }
        let self_below = matches!(self, Cut::Below(_));
        let other_below = matches!(other, Cut::Below(_));
        match a.len().cmp(&b.len()) {
            Ordering::Equal => match (self_below, other_below) {
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                _ => Ordering::Equal,
            },
            // the shorter prefix encloses every extension of itself
            Ordering::Less => {
                if self_below {
                    Ordering::Less
                } else {
                    Ordering::Greater
                }
            }
            Ordering::Greater => {
                if other_below {
                    Ordering::Greater
                } else {
                    Ordering::Less
                }
            }
        }
    }
}

impl PartialOrd for Cut {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Contiguous set of key tuples strictly between two cuts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRange {
    pub from: Cut,
    pub to: Cut,
}

impl KeyRange {
    pub fn new(from: Cut, to: Cut) -> Self {
        Self { from, to }
    }

    pub fn full() -> Self {
        Self::new(Cut::BelowAll, Cut::AboveAll)
    }

    /// Every tuple starting with `prefix`.
    pub fn point(prefix: Vec<Value>) -> Self {
        Self::new(Cut::Below(prefix.clone()), Cut::Above(prefix))
    }

    pub fn is_empty(&self) -> bool {
        self.from >= self.to
    }

    pub fn is_full(&self) -> bool {
        self.from == Cut::BelowAll && self.to == Cut::AboveAll
    }

    /// The prefix when the range is exactly "every tuple starting with it".
    pub fn point_prefix(&self) -> Option<&[Value]> {
        match (&self.from, &self.to) {
            (Cut::Below(a), Cut::Above(b)) if a == b => Some(a.as_slice()),
            _ => None,
        }
    }

    pub fn contains(&self, key: &[Value]) -> bool {
        self.from.is_below(key) && !self.to.is_below(key)
    }

    pub fn intersect(&self, other: &KeyRange) -> KeyRange {
        KeyRange::new(
            self.from.clone().max(other.from.clone()),
            self.to.clone().min(other.to.clone()),
        )
    }

    fn encloses(&self, other: &KeyRange) -> bool {
        self.from <= other.from && other.to <= self.to
    }
}

/// Normalized union of disjoint, non-touching, sorted key ranges.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RangeSet {
    ranges: Vec<KeyRange>,
}

impl RangeSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn full() -> Self {
        Self {
            ranges: vec![KeyRange::full()],
        }
    }

    pub fn from_ranges(ranges: impl IntoIterator<Item = KeyRange>) -> Self {
        let mut ranges: Vec<KeyRange> = ranges.into_iter().filter(|r| !r.is_empty()).collect();
        ranges.sort_by(|a, b| a.from.cmp(&b.from).then_with(|| a.to.cmp(&b.to)));
        let mut merged: Vec<KeyRange> = Vec::with_capacity(ranges.len());
        for range in ranges {
            match merged.last_mut() {
                Some(last) if range.from <= last.to => {
                    if range.to > last.to {
                        last.to = range.to;
                    }
                }
                _ => merged.push(range),
            }
        }
        Self { ranges: merged }
    }

    pub fn ranges(&self) -> &[KeyRange] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// "No restriction": the set covers the whole key space.
    pub fn is_full(&self) -> bool {
        self.ranges.len() == 1 && self.ranges[0].is_full()
    }

    pub fn union(&self, other: &RangeSet) -> RangeSet {
        RangeSet::from_ranges(self.ranges.iter().chain(&other.ranges).cloned())
    }

    pub fn intersect(&self, other: &RangeSet) -> RangeSet {
        RangeSet::from_ranges(
            self.ranges
                .iter()
                .flat_map(|a| other.ranges.iter().map(move |b| a.intersect(b))),
        )
    }

    pub fn contains(&self, key: &[Value]) -> bool {
        self.ranges.iter().any(|r| r.contains(key))
    }

    pub fn is_subset_of(&self, other: &RangeSet) -> bool {
        self.ranges
            .iter()
            .all(|r| other.ranges.iter().any(|o| o.encloses(r)))
    }
}

impl fmt::Display for Cut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |k: &[Value]| {
            k.iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        match self {
            Cut::BelowAll => write!(f, "-inf"),
            Cut::AboveAll => write!(f, "+inf"),
            Cut::Below(k) => write!(f, "[{}", join(k)),
            Cut::Above(k) => write!(f, "{}]", join(k)),
        }
    }
}

impl fmt::Display for RangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ranges.is_empty() {
            return write!(f, "{{}}");
        }
        let parts: Vec<String> = self
            .ranges
            .iter()
            .map(|r| format!("({} .. {})", r.from, r.to))
            .collect();
        write!(f, "{}", parts.join(" | "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(i: i64) -> Value {
        Value::Int(i)
    }

    #[test]
    fn test_prefix_cut_ordering() {
        let below5 = Cut::Below(vec![int(5)]);
        let above5 = Cut::Above(vec![int(5)]);
        let above53 = Cut::Above(vec![int(5), int(3)]);
        assert!(below5 < above53);
        assert!(above53 < above5);
        assert!(Cut::BelowAll < below5);
        assert!(above5 < Cut::AboveAll);
    }

    #[test]
    fn test_compound_range_contains() {
        // k1 = 5 AND k2 > 3
        let r = KeyRange::new(Cut::Above(vec![int(5), int(3)]), Cut::Above(vec![int(5)]));
        assert!(r.contains(&[int(5), int(4)]));
        assert!(!r.contains(&[int(5), int(3)]));
        assert!(!r.contains(&[int(6), int(0)]));
    }

    #[test]
    fn test_union_merges_touching_ranges() {
        let a = KeyRange::new(Cut::BelowAll, Cut::Above(vec![int(5)]));
        let b = KeyRange::new(Cut::Above(vec![int(5)]), Cut::AboveAll);
        let set = RangeSet::from_ranges(vec![a, b]);
        assert!(set.is_full());
    }

    #[test]
    fn test_empty_intersection() {
        let lt3 = RangeSet::from_ranges(vec![KeyRange::new(Cut::BelowAll, Cut::Below(vec![int(3)]))]);
        let gt5 = RangeSet::from_ranges(vec![KeyRange::new(Cut::Above(vec![int(5)]), Cut::AboveAll)]);
        assert!(lt3.intersect(&gt5).is_empty());
        assert_eq!(lt3.union(&gt5).ranges().len(), 2);
    }

    #[test]
    fn test_subset() {
        let point = RangeSet::from_ranges(vec![KeyRange::point(vec![int(4)])]);
        let wide = RangeSet::from_ranges(vec![KeyRange::new(
            Cut::Below(vec![int(1)]),
            Cut::Above(vec![int(10)]),
        )]);
        assert!(point.is_subset_of(&wide));
        assert!(!wide.is_subset_of(&point));
        assert!(RangeSet::empty().is_subset_of(&point));
        assert_eq!(point.ranges()[0].point_prefix(), Some(&[int(4)][..]));
    }
}
