//! Logical expression tree.

use std::collections::BTreeSet;

use fedra_core::Value;
use serde::{Deserialize, Serialize};

use super::SubqueryExpr;

/// Scalar operator applied by a [`LogicalExpr::Call`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    Not,
    IsNull,
    IsNotNull,
    Add,
    Sub,
    Mul,
    Div,
    Neg,
}

impl ScalarOp {
    /// Check if this is a comparison operator.
    pub const fn is_comparison(&self) -> bool {
        matches!(
            self,
            Self::Eq | Self::NotEq | Self::Lt | Self::LtEq | Self::Gt | Self::GtEq
        )
    }

    /// Check if this is a range comparison (`<`, `<=`, `>`, `>=`).
    pub const fn is_range(&self) -> bool {
        matches!(self, Self::Lt | Self::LtEq | Self::Gt | Self::GtEq)
    }

    /// Check if this operator produces a boolean.
    pub const fn is_predicate(&self) -> bool {
        self.is_comparison()
            || matches!(
                self,
                Self::And | Self::Or | Self::Not | Self::IsNull | Self::IsNotNull
            )
    }

    /// Operator with operands swapped (`a < b` == `b > a`).
    pub const fn commute(&self) -> Self {
        match self {
            Self::Lt => Self::Gt,
            Self::LtEq => Self::GtEq,
            Self::Gt => Self::Lt,
            Self::GtEq => Self::LtEq,
            other => *other,
        }
    }

    /// SQL spelling of the operator.
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Not => "NOT",
            Self::IsNull => "IS NULL",
            Self::IsNotNull => "IS NOT NULL",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Neg => "-",
        }
    }
}

impl std::fmt::Display for ScalarOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Logical expression over the columns of an operator's input.
///
/// Column references are positional (`$0`, `$1`, ...), relative to the
/// concatenated input row of the operator that owns the expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LogicalExpr {
    /// Reference to an input column by position.
    InputRef(usize),
    /// Literal value.
    Literal(Value),
    /// Scalar operator applied to arguments.
    Call { op: ScalarOp, args: Vec<LogicalExpr> },
    /// Nested query.
    Subquery(SubqueryExpr),
}

impl LogicalExpr {
    pub fn call(op: ScalarOp, args: Vec<LogicalExpr>) -> Self {
        Self::Call { op, args }
    }

    fn binary(self, op: ScalarOp, other: LogicalExpr) -> Self {
        Self::call(op, vec![self, other])
    }

    pub fn eq(self, other: LogicalExpr) -> Self {
        self.binary(ScalarOp::Eq, other)
    }

    pub fn not_eq(self, other: LogicalExpr) -> Self {
        self.binary(ScalarOp::NotEq, other)
    }

    pub fn lt(self, other: LogicalExpr) -> Self {
        self.binary(ScalarOp::Lt, other)
    }

    pub fn lt_eq(self, other: LogicalExpr) -> Self {
        self.binary(ScalarOp::LtEq, other)
    }

    pub fn gt(self, other: LogicalExpr) -> Self {
        self.binary(ScalarOp::Gt, other)
    }

    pub fn gt_eq(self, other: LogicalExpr) -> Self {
        self.binary(ScalarOp::GtEq, other)
    }

    pub fn and(self, other: LogicalExpr) -> Self {
        self.binary(ScalarOp::And, other)
    }

    pub fn or(self, other: LogicalExpr) -> Self {
        self.binary(ScalarOp::Or, other)
    }

    pub fn add(self, other: LogicalExpr) -> Self {
        self.binary(ScalarOp::Add, other)
    }

    pub fn sub(self, other: LogicalExpr) -> Self {
        self.binary(ScalarOp::Sub, other)
    }

    pub fn mul(self, other: LogicalExpr) -> Self {
        self.binary(ScalarOp::Mul, other)
    }

    pub fn div(self, other: LogicalExpr) -> Self {
        self.binary(ScalarOp::Div, other)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self::call(ScalarOp::Not, vec![self])
    }

    pub fn is_null(self) -> Self {
        Self::call(ScalarOp::IsNull, vec![self])
    }

    pub fn is_not_null(self) -> Self {
        Self::call(ScalarOp::IsNotNull, vec![self])
    }

    /// Position of the referenced column, if this is a bare input reference.
    pub fn as_input_ref(&self) -> Option<usize> {
        match self {
            Self::InputRef(i) => Some(*i),
            _ => None,
        }
    }

    /// Every input column referenced by this expression.
    ///
    /// References inside a subquery belong to the subquery's own plan and
    /// are not collected; an `IN` needle is.
    pub fn input_refs(&self) -> BTreeSet<usize> {
        let mut refs = BTreeSet::new();
        self.collect_refs(&mut refs);
        refs
    }

    fn collect_refs(&self, refs: &mut BTreeSet<usize>) {
        match self {
            Self::InputRef(i) => {
                refs.insert(*i);
            }
            Self::Literal(_) => {}
            Self::Call { args, .. } => args.iter().for_each(|a| a.collect_refs(refs)),
            Self::Subquery(sub) => {
                if let Some(needle) = sub.needle() {
                    needle.collect_refs(refs);
                }
            }
        }
    }

    /// Rewrite every input reference through `f`.
    pub fn remap(&self, f: &dyn Fn(usize) -> usize) -> Self {
        match self {
            Self::InputRef(i) => Self::InputRef(f(*i)),
            Self::Literal(v) => Self::Literal(v.clone()),
            Self::Call { op, args } => Self::Call {
                op: *op,
                args: args.iter().map(|a| a.remap(f)).collect(),
            },
            Self::Subquery(sub) => Self::Subquery(sub.remap_needle(f)),
        }
    }

    /// Shift every input reference by `offset` (which may be negative).
    pub fn shift(&self, offset: isize) -> Self {
        self.remap(&|i| i.saturating_add_signed(offset))
    }

    /// Replace every input reference `$i` with `exprs[i]`.
    ///
    /// Returns `None` when a reference has no replacement.
    pub fn substitute(&self, exprs: &[LogicalExpr]) -> Option<Self> {
        match self {
            Self::InputRef(i) => exprs.get(*i).cloned(),
            Self::Literal(v) => Some(Self::Literal(v.clone())),
            Self::Call { op, args } => Some(Self::Call {
                op: *op,
                args: args
                    .iter()
                    .map(|a| a.substitute(exprs))
                    .collect::<Option<Vec<_>>>()?,
            }),
            Self::Subquery(_) => None,
        }
    }

    /// Split a conjunction into its conjuncts.
    pub fn conjuncts(self) -> Vec<LogicalExpr> {
        match self {
            Self::Call {
                op: ScalarOp::And,
                args,
            } => args.into_iter().flat_map(Self::conjuncts).collect(),
            other => vec![other],
        }
    }

    /// Combine expressions with AND. Returns `None` for an empty list.
    pub fn conjunction(exprs: impl IntoIterator<Item = LogicalExpr>) -> Option<Self> {
        exprs.into_iter().reduce(|acc, e| acc.and(e))
    }

    pub fn contains_subquery(&self) -> bool {
        match self {
            Self::Subquery(_) => true,
            Self::Call { args, .. } => args.iter().any(Self::contains_subquery),
            Self::InputRef(_) | Self::Literal(_) => false,
        }
    }

    /// Whether every input reference falls in `lo..hi`.
    pub fn refs_within(&self, lo: usize, hi: usize) -> bool {
        self.input_refs().iter().all(|&i| i >= lo && i < hi)
    }
}

impl std::fmt::Display for LogicalExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InputRef(i) => write!(f, "${i}"),
            Self::Literal(v) => write!(f, "{}", v.to_sql_literal()),
            Self::Call { op, args } => match (op, args.as_slice()) {
                (ScalarOp::IsNull | ScalarOp::IsNotNull, [arg]) => write!(f, "({arg} {op})"),
                (ScalarOp::Not | ScalarOp::Neg, [arg]) => write!(f, "{op}({arg})"),
                (_, [l, r]) => write!(f, "({l} {op} {r})"),
                _ => {
                    write!(f, "{op}(")?;
                    for (i, a) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{a}")?;
                    }
                    write!(f, ")")
                }
            },
            Self::Subquery(sub) => write!(f, "{sub}"),
        }
    }
}

/// Reference to input column `index`.
pub fn col(index: usize) -> LogicalExpr {
    LogicalExpr::InputRef(index)
}

/// Literal expression.
pub fn lit(value: impl Into<Value>) -> LogicalExpr {
    LogicalExpr::Literal(value.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conjuncts_flatten() {
        let e = col(0).eq(lit(1i64)).and(col(1).gt(lit(2i64)).and(col(2).is_null()));
        let parts = e.conjuncts();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[2], col(2).is_null());

        let back = LogicalExpr::conjunction(parts).unwrap();
        assert_eq!(back.input_refs().into_iter().collect::<Vec<_>>(), vec![0, 1, 2]);
        assert!(LogicalExpr::conjunction(Vec::new()).is_none());
    }

    #[test]
    fn test_remap_and_shift() {
        let e = col(3).eq(col(0));
        assert_eq!(e.shift(-0), e);
        assert_eq!(e.shift(2), col(5).eq(col(2)));
        assert_eq!(e.remap(&|i| if i == 3 { 0 } else { 3 }), col(0).eq(col(3)));
    }

    #[test]
    fn test_substitute() {
        let e = col(1).gt(lit(10i64));
        let exprs = vec![col(4), col(7).add(lit(1i64))];
        assert_eq!(
            e.substitute(&exprs),
            Some(col(7).add(lit(1i64)).gt(lit(10i64)))
        );
        assert_eq!(col(5).substitute(&exprs), None);
    }

    #[test]
    fn test_display() {
        let e = col(0).eq(lit("a")).and(col(1).is_not_null());
        assert_eq!(e.to_string(), "(($0 = 'a') AND ($1 IS NOT NULL))");
    }

    #[test]
    fn test_refs_within() {
        let e = col(2).eq(col(3));
        assert!(e.refs_within(2, 4));
        assert!(!e.refs_within(0, 3));
        assert!(lit(1i64).refs_within(0, 0));
    }
}
