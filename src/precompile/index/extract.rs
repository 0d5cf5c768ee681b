/// Range extraction: filter predicate → key ranges per index.
///
/// The predicate is normalized to disjunctive normal form. Each conjunction
/// restricts an index to one key range built from an equality prefix on the
/// leading key columns and at most one bounded column after it; the
/// disjunction is the union of those ranges. Atoms that do not restrict a
/// key column are ignored, so the result over-approximates the rows the
/// predicate accepts and the filter must stay above the scan.
use std::sync::Arc;

use crate::provider::{
    BinaryOp, Cut, Expr, IndexInfo, KeyRange, RangeSet, TableInfo, UnaryOp,
};
use crate::value::Value;

/// Disjunctions larger than this give up on narrowing.
pub const MAX_DNF_TERMS: usize = 32;

/// Ranges one predicate implies on one index.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    pub index: Arc<IndexInfo>,
    pub ranges: RangeSet,
}

/// Ranges `predicate` implies on every index of `table`.
pub fn extract_ranges(predicate: &Expr, table: &TableInfo) -> Vec<ExtractionResult> {
    let dnf = to_dnf(predicate);
    table
        .indexes
        .iter()
        .map(|index| ExtractionResult {
            index: Arc::clone(index),
            ranges: match &dnf {
                Some(terms) => RangeSet::from_ranges(
                    terms.iter().map(|conjunction| conjunction_range(conjunction, index, table)),
                ),
                None => RangeSet::full(),
            },
        })
        .collect()
}

/// `None` when the normal form exceeds [`MAX_DNF_TERMS`].
pub fn to_dnf(expr: &Expr) -> Option<Vec<Vec<Expr>>> {
    match expr {
        Expr::Binary {
            op: BinaryOp::Or,
            left,
            right,
        } => {
            let mut terms = to_dnf(left)?;
            terms.extend(to_dnf(right)?);
            (terms.len() <= MAX_DNF_TERMS).then_some(terms)
        }
        Expr::Binary {
            op: BinaryOp::And,
            left,
            right,
        } => {
            let l = to_dnf(left)?;
            let r = to_dnf(right)?;
            if l.len() * r.len() > MAX_DNF_TERMS {
                return None;
            }
            Some(
                l.iter()
                    .flat_map(|a| {
                        r.iter().map(move |b| {
                            let mut conjunction = a.clone();
                            conjunction.extend(b.iter().cloned());
                            conjunction
                        })
                    })
                    .collect(),
            )
        }
        // NOT over AND/OR is kept as an opaque atom
        Expr::Unary {
            op: UnaryOp::Not,
            operand,
        } => match operand.as_ref() {
            Expr::Literal(Value::Bool(b)) => Some(vec![vec![Expr::lit(!*b)]]),
            _ => Some(vec![vec![expr.clone()]]),
        },
        atom => Some(vec![vec![atom.clone()]]),
    }
}

/// `column op value` with the column on the left.
fn comparison(atom: &Expr) -> Option<(usize, BinaryOp, &Value)> {
    let Expr::Binary { op, left, right } = atom else {
        return None;
    };
    if !op.is_comparison() || *op == BinaryOp::NotEq {
        return None;
    }
    match (left.as_ref(), right.as_ref()) {
        (Expr::Column(c), Expr::Literal(v)) if !v.is_null() => Some((*c, *op, v)),
        (Expr::Literal(v), Expr::Column(c)) if !v.is_null() => Some((*c, op.flipped(), v)),
        _ => None,
    }
}

fn conjunction_range(atoms: &[Expr], index: &IndexInfo, table: &TableInfo) -> KeyRange {
    if atoms
        .iter()
        .any(|a| matches!(a, Expr::Literal(Value::Bool(false))))
    {
        return KeyRange::new(Cut::AboveAll, Cut::BelowAll);
    }
    let constraints: Vec<(usize, BinaryOp, &Value)> = atoms
        .iter()
        .filter_map(comparison)
        .filter(|(c, _, v)| {
            // a literal of another type would compare by type rank
            let column_ty = table.columns.get(*c).map(|col| col.ty);
            match (column_ty, v.column_type()) {
                (Some(a), Some(b)) => a == b || (a.is_numeric() && b.is_numeric()),
                _ => false,
            }
        })
        .collect();

    let mut prefix: Vec<Value> = Vec::new();
    let mut range = KeyRange::full();
    for key in &index.key_columns {
        let on_key: Vec<(BinaryOp, &Value)> = constraints
            .iter()
            .filter(|(c, _, _)| *c == key.column)
            .map(|(_, op, v)| (*op, *v))
            .collect();
        let equal: Vec<&Value> = on_key
            .iter()
            .filter(|(op, _)| *op == BinaryOp::Eq)
            .map(|(_, v)| *v)
            .collect();
        if let Some(first) = equal.first() {
            if equal.iter().any(|v| v != first) {
                return KeyRange::new(Cut::AboveAll, Cut::BelowAll);
            }
            prefix.push((*first).clone());
            range = KeyRange::point(prefix.clone());
            continue;
        }
        for (op, v) in on_key {
            let mut key = prefix.clone();
            key.push(v.clone());
            let bound = match op {
                BinaryOp::Gt => KeyRange::new(Cut::Above(key), Cut::AboveAll),
                BinaryOp::GtEq => KeyRange::new(Cut::Below(key), Cut::AboveAll),
                BinaryOp::Lt => KeyRange::new(Cut::BelowAll, Cut::Below(key)),
                BinaryOp::LtEq => KeyRange::new(Cut::BelowAll, Cut::Above(key)),
                _ => continue,
            };
            range = range.intersect(&bound);
        }
        break;
    }
    range
}
