//! Join operator.

use serde::{Deserialize, Serialize};

use crate::expr::{LogicalExpr, ScalarOp};

/// Join semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum JoinType {
    #[default]
    Inner,
    Left,
    Right,
    Full,
}

impl std::fmt::Display for JoinType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inner => write!(f, "INNER"),
            Self::Left => write!(f, "LEFT"),
            Self::Right => write!(f, "RIGHT"),
            Self::Full => write!(f, "FULL"),
        }
    }
}

/// Join of two inputs.
///
/// The condition is evaluated over the concatenated row: columns
/// `0..left_width` come from the left input, the rest from the right.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinOp {
    pub condition: LogicalExpr,
    pub join_type: JoinType,
}

/// Equi-join key pairs and the remaining predicate of a join condition.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JoinKeys {
    /// `(left column, right column)`; right positions are relative to the right input.
    pub pairs: Vec<(usize, usize)>,
    /// Conjuncts that are not column equalities across the two inputs.
    pub residual: Option<LogicalExpr>,
}

impl JoinOp {
    pub fn inner(condition: LogicalExpr) -> Self {
        Self {
            condition,
            join_type: JoinType::Inner,
        }
    }

    /// Split the condition into equi-join pairs and a residual predicate.
    pub fn split_keys(&self, left_width: usize) -> JoinKeys {
        let mut keys = JoinKeys::default();
        let mut residual = Vec::new();
        for conjunct in self.condition.clone().conjuncts() {
            match equi_pair(&conjunct, left_width) {
                Some(pair) => keys.pairs.push(pair),
                None if conjunct == LogicalExpr::Literal(true.into()) => {}
                None => residual.push(conjunct),
            }
        }
        keys.residual = LogicalExpr::conjunction(residual);
        keys
    }
}

fn equi_pair(expr: &LogicalExpr, left_width: usize) -> Option<(usize, usize)> {
    let LogicalExpr::Call {
        op: ScalarOp::Eq,
        args,
    } = expr
    else {
        return None;
    };
    let [a, b] = args.as_slice() else {
        return None;
    };
    let (a, b) = (a.as_input_ref()?, b.as_input_ref()?);
    match (a < left_width, b < left_width) {
        (true, false) => Some((a, b - left_width)),
        (false, true) => Some((b, a - left_width)),
        _ => None,
    }
}
