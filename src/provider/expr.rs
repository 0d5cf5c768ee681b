//! Predicate and calculation expressions over provider columns.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::types::ApplyParameter;
use crate::value::Value;

/// Core expression type. Recursive to support arbitrary nesting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    /// Column of the current source by position.
    Column(usize),
    /// Column of the row bound to an apply parameter.
    Outer {
        param: ApplyParameter,
        column: usize,
    },
    Literal(Value),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    IsNull {
        operand: Box<Expr>,
        negated: bool,
    },
    Function {
        func: Function,
        args: Vec<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        if_true: Box<Expr>,
        if_false: Box<Expr>,
    },
    /// Full-text match of `query` against `columns`.
    FullText {
        columns: Vec<Expr>,
        query: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    // Comparison
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    // Logical
    And,
    Or,
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    // String
    Concat,
    Like,
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::NotEq
                | BinaryOp::Lt
                | BinaryOp::LtEq
                | BinaryOp::Gt
                | BinaryOp::GtEq
        )
    }

    /// True when the operator yields a boolean.
    pub fn is_predicate(self) -> bool {
        self.is_comparison() || matches!(self, BinaryOp::And | BinaryOp::Or | BinaryOp::Like)
    }

    /// The operator with its operands swapped: `a < b` ⇔ `b > a`.
    pub fn flipped(self) -> BinaryOp {
        match self {
            BinaryOp::Lt => BinaryOp::Gt,
            BinaryOp::LtEq => BinaryOp::GtEq,
            BinaryOp::Gt => BinaryOp::Lt,
            BinaryOp::GtEq => BinaryOp::LtEq,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    Not,
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Function {
    Upper,
    Lower,
    Length,
    Abs,
    Coalesce,
    /// `substring(text, start, length)`, 1-based start.
    Substring,
    /// `datetime + interval`.
    AddInterval,
}

impl Expr {
    pub fn col(index: usize) -> Expr {
        Expr::Column(index)
    }

    pub fn outer(param: ApplyParameter, column: usize) -> Expr {
        Expr::Outer { param, column }
    }

    pub fn lit(value: impl Into<Value>) -> Expr {
        Expr::Literal(value.into())
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn eq(left: Expr, right: Expr) -> Expr {
        Expr::binary(BinaryOp::Eq, left, right)
    }

    pub fn and(left: Expr, right: Expr) -> Expr {
        Expr::binary(BinaryOp::And, left, right)
    }

    pub fn or(left: Expr, right: Expr) -> Expr {
        Expr::binary(BinaryOp::Or, left, right)
    }

    pub fn not(operand: Expr) -> Expr {
        Expr::Unary {
            op: UnaryOp::Not,
            operand: Box::new(operand),
        }
    }

    pub fn func(func: Function, args: Vec<Expr>) -> Expr {
        Expr::Function { func, args }
    }

    pub fn is_true_literal(&self) -> bool {
        matches!(self, Expr::Literal(Value::Bool(true)))
    }

    /// True when the expression yields a boolean by construction.
    pub fn is_predicate(&self) -> bool {
        match self {
            Expr::Binary { op, .. } => op.is_predicate(),
            Expr::Unary { op, .. } => *op == UnaryOp::Not,
            Expr::IsNull { .. } | Expr::FullText { .. } => true,
            _ => false,
        }
    }

    /// Split a conjunction into its top-level terms.
    pub fn conjuncts(&self) -> Vec<Expr> {
        let mut out = Vec::new();
        collect_conjuncts(self, &mut out);
        out
    }

    /// Join terms with `AND`; `None` for an empty list.
    pub fn conjunction(terms: Vec<Expr>) -> Option<Expr> {
        terms.into_iter().reduce(Expr::and)
    }

    fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Column(_) | Expr::Outer { .. } | Expr::Literal(_) => vec![],
            Expr::Binary { left, right, .. } => vec![&**left, &**right],
            Expr::Unary { operand, .. } | Expr::IsNull { operand, .. } => vec![&**operand],
            Expr::Function { args, .. } => args.iter().collect(),
            Expr::Conditional {
                test,
                if_true,
                if_false,
            } => vec![&**test, &**if_true, &**if_false],
            Expr::FullText { columns, query } => {
                let mut v: Vec<&Expr> = columns.iter().collect();
                v.push(&**query);
                v
            }
        }
    }

    /// Pre-order visit of every node.
    pub fn visit(&self, f: &mut impl FnMut(&Expr)) {
        f(self);
        for child in self.children() {
            child.visit(f);
        }
    }

    pub fn columns(&self) -> BTreeSet<usize> {
        let mut set = BTreeSet::new();
        self.visit(&mut |e| {
            if let Expr::Column(i) = e {
                set.insert(*i);
            }
        });
        set
    }

    pub fn parameters(&self) -> BTreeSet<ApplyParameter> {
        let mut set = BTreeSet::new();
        self.visit(&mut |e| {
            if let Expr::Outer { param, .. } = e {
                set.insert(*param);
            }
        });
        set
    }

    pub fn references(&self, param: ApplyParameter) -> bool {
        let mut found = false;
        self.visit(&mut |e| {
            if matches!(e, Expr::Outer { param: p, .. } if *p == param) {
                found = true;
            }
        });
        found
    }

    /// Top-down rewrite: `f` may replace a node (its replacement is not
    /// revisited); otherwise children are rewritten.
    pub fn try_transform<E>(
        &self,
        f: &mut impl FnMut(&Expr) -> Result<Option<Expr>, E>,
    ) -> Result<Expr, E> {
        if let Some(replacement) = f(self)? {
            return Ok(replacement);
        }
        Ok(match self {
            Expr::Column(_) | Expr::Outer { .. } | Expr::Literal(_) => self.clone(),
            Expr::Binary { op, left, right } => Expr::Binary {
                op: *op,
                left: Box::new(left.try_transform(f)?),
                right: Box::new(right.try_transform(f)?),
            },
            Expr::Unary { op, operand } => Expr::Unary {
                op: *op,
                operand: Box::new(operand.try_transform(f)?),
            },
            Expr::IsNull { operand, negated } => Expr::IsNull {
                operand: Box::new(operand.try_transform(f)?),
                negated: *negated,
            },
            Expr::Function { func, args } => Expr::Function {
                func: *func,
                args: args
                    .iter()
                    .map(|a| a.try_transform(f))
                    .collect::<Result<_, E>>()?,
            },
            Expr::Conditional {
                test,
                if_true,
                if_false,
            } => Expr::Conditional {
                test: Box::new(test.try_transform(f)?),
                if_true: Box::new(if_true.try_transform(f)?),
                if_false: Box::new(if_false.try_transform(f)?),
            },
            Expr::FullText { columns, query } => Expr::FullText {
                columns: columns
                    .iter()
                    .map(|c| c.try_transform(f))
                    .collect::<Result<_, E>>()?,
                query: Box::new(query.try_transform(f)?),
            },
        })
    }

    /// Rewrite with an infallible replacement function.
    pub fn transform(&self, f: &mut impl FnMut(&Expr) -> Option<Expr>) -> Expr {
        match self.try_transform::<std::convert::Infallible>(&mut |e| Ok(f(e))) {
            Ok(e) => e,
            Err(never) => match never {},
        }
    }

    /// Renumber column references; `None` from `map` aborts the rewrite.
    pub fn remap_columns(&self, map: impl Fn(usize) -> Option<usize>) -> Option<Expr> {
        self.try_transform(&mut |e| match e {
            Expr::Column(i) => map(*i).map(|j| Some(Expr::Column(j))).ok_or(()),
            _ => Ok(None),
        })
        .ok()
    }
}

fn collect_conjuncts(expr: &Expr, out: &mut Vec<Expr>) {
    match expr {
        Expr::Binary {
            op: BinaryOp::And,
            left,
            right,
        } => {
            collect_conjuncts(left, out);
            collect_conjuncts(right, out);
        }
        other => out.push(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conjuncts_round_trip() {
        let e = Expr::and(
            Expr::eq(Expr::col(0), Expr::lit(1i64)),
            Expr::and(
                Expr::eq(Expr::col(1), Expr::lit("x")),
                Expr::eq(Expr::col(2), Expr::lit(true)),
            ),
        );
        let terms = e.conjuncts();
        assert_eq!(terms.len(), 3);
        let rebuilt = Expr::conjunction(terms).unwrap();
        assert_eq!(rebuilt.columns(), e.columns());
    }

    #[test]
    fn test_references_parameter() {
        let p = ApplyParameter(3);
        let e = Expr::eq(Expr::col(0), Expr::outer(p, 2));
        assert!(e.references(p));
        assert!(!e.references(ApplyParameter(4)));
        assert_eq!(e.parameters().len(), 1);
    }

    #[test]
    fn test_remap_columns() {
        let e = Expr::eq(Expr::col(0), Expr::col(2));
        let shifted = e.remap_columns(|i| Some(i + 10)).unwrap();
        assert_eq!(shifted, Expr::eq(Expr::col(10), Expr::col(12)));
        assert!(e.remap_columns(|i| (i == 0).then_some(0)).is_none());
    }

    #[test]
    fn test_flipped_comparison() {
        assert_eq!(BinaryOp::Lt.flipped(), BinaryOp::Gt);
        assert_eq!(BinaryOp::Eq.flipped(), BinaryOp::Eq);
    }
}
