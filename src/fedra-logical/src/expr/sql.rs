//! Rendering expressions as SQL for remote sources.
//!
//! Expressions become `sqlparser` AST nodes; the text comes from the AST's
//! `Display`, with parentheses wherever the plan's grouping differs from
//! SQL operator precedence.

use fedra_core::Value;
use sqlparser::ast::{BinaryOperator, Expr as SqlExpr, Ident, UnaryOperator};
use sqlparser::dialect::GenericDialect;
use sqlparser::keywords::{
    ALL_KEYWORDS, ALL_KEYWORDS_INDEX, RESERVED_FOR_COLUMN_ALIAS, RESERVED_FOR_TABLE_ALIAS,
};
use sqlparser::parser::Parser;

use super::{LogicalExpr, ScalarOp};

const ATOM: u8 = 9;
const COMPARISON: u8 = 4;

impl LogicalExpr {
    /// Build the SQL expression against the given column names.
    ///
    /// Returns `None` when the expression cannot be shipped to a remote
    /// source: subqueries, references outside `columns`, column names that
    /// cannot be quoted and non-finite floats.
    pub fn to_sql_expr(&self, columns: &[String]) -> Option<SqlExpr> {
        match self {
            Self::InputRef(i) => columns
                .get(*i)
                .and_then(|c| sql_ident(c))
                .map(SqlExpr::Identifier),
            Self::Literal(v) => literal(v),
            Self::Call { op, args } => {
                let args = args
                    .iter()
                    .map(|a| a.to_sql_expr(columns))
                    .collect::<Option<Vec<_>>>()?;
                call(*op, args)
            }
            Self::Subquery(_) => None,
        }
    }

    /// Render against the given column names.
    pub fn to_sql(&self, columns: &[String]) -> Option<String> {
        self.to_sql_expr(columns).map(|e| e.to_string())
    }
}

/// Identifier for a table or column name.
///
/// Plain lowercase names stay bare; reserved words and anything else are
/// double-quoted. Empty names and names containing `"` or NUL are rejected.
pub fn sql_ident(name: &str) -> Option<Ident> {
    if name.is_empty() || name.contains('"') || name.contains('\0') {
        return None;
    }
    let plain = name.starts_with(|c: char| c.is_ascii_lowercase() || c == '_')
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if plain && !is_reserved(name) {
        Some(Ident::new(name))
    } else {
        Some(Ident::with_quote('"', name))
    }
}

fn is_reserved(name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    ALL_KEYWORDS
        .binary_search(&upper.as_str())
        .ok()
        .and_then(|i| ALL_KEYWORDS_INDEX.get(i))
        .is_some_and(|kw| {
            RESERVED_FOR_COLUMN_ALIAS.contains(kw) || RESERVED_FOR_TABLE_ALIAS.contains(kw)
        })
}

fn literal(value: &Value) -> Option<SqlExpr> {
    if matches!(value, Value::Float64(f) if !f.is_finite()) {
        return None;
    }
    Parser::new(&GenericDialect {})
        .try_with_sql(&value.to_sql_literal())
        .and_then(|mut parser| parser.parse_expr())
        .ok()
}

fn call(op: ScalarOp, args: Vec<SqlExpr>) -> Option<SqlExpr> {
    let mut args = args.into_iter();
    match op {
        ScalarOp::Not | ScalarOp::Neg => {
            let op = if op == ScalarOp::Not {
                UnaryOperator::Not
            } else {
                UnaryOperator::Minus
            };
            Some(SqlExpr::UnaryOp {
                op,
                expr: Box::new(nest_unless_atom(args.next()?)),
            })
        }
        ScalarOp::IsNull => Some(SqlExpr::IsNull(Box::new(nest_unless_atom(args.next()?)))),
        ScalarOp::IsNotNull => Some(SqlExpr::IsNotNull(Box::new(nest_unless_atom(
            args.next()?,
        )))),
        _ => {
            let operator = binary_operator(op)?;
            let first = args.next()?;
            let mut expr = binary(first, operator.clone(), args.next()?);
            // AND / OR are variadic and fold left
            for next in args {
                expr = binary(expr, operator.clone(), next);
            }
            Some(expr)
        }
    }
}

fn binary(left: SqlExpr, op: BinaryOperator, right: SqlExpr) -> SqlExpr {
    let p = binary_precedence(&op);
    let l = precedence(&left);
    let r = precedence(&right);
    let left = if l < p || (l == p && p == COMPARISON) {
        nest(left)
    } else {
        left
    };
    // operators are left-associative, so an equal-precedence right side keeps its parentheses
    let right = if r <= p { nest(right) } else { right };
    SqlExpr::BinaryOp {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}

fn nest(expr: SqlExpr) -> SqlExpr {
    SqlExpr::Nested(Box::new(expr))
}

fn nest_unless_atom(expr: SqlExpr) -> SqlExpr {
    if precedence(&expr) < ATOM {
        nest(expr)
    } else {
        expr
    }
}

fn binary_operator(op: ScalarOp) -> Option<BinaryOperator> {
    Some(match op {
        ScalarOp::Eq => BinaryOperator::Eq,
        ScalarOp::NotEq => BinaryOperator::NotEq,
        ScalarOp::Lt => BinaryOperator::Lt,
        ScalarOp::LtEq => BinaryOperator::LtEq,
        ScalarOp::Gt => BinaryOperator::Gt,
        ScalarOp::GtEq => BinaryOperator::GtEq,
        ScalarOp::And => BinaryOperator::And,
        ScalarOp::Or => BinaryOperator::Or,
        ScalarOp::Add => BinaryOperator::Plus,
        ScalarOp::Sub => BinaryOperator::Minus,
        ScalarOp::Mul => BinaryOperator::Multiply,
        ScalarOp::Div => BinaryOperator::Divide,
        ScalarOp::Not | ScalarOp::Neg | ScalarOp::IsNull | ScalarOp::IsNotNull => return None,
    })
}

fn binary_precedence(op: &BinaryOperator) -> u8 {
    match op {
        BinaryOperator::Or => 1,
        BinaryOperator::And => 2,
        BinaryOperator::Plus | BinaryOperator::Minus => 6,
        BinaryOperator::Multiply | BinaryOperator::Divide => 7,
        _ => COMPARISON,
    }
}

fn precedence(expr: &SqlExpr) -> u8 {
    match expr {
        SqlExpr::BinaryOp { op, .. } => binary_precedence(op),
        SqlExpr::UnaryOp {
            op: UnaryOperator::Not,
            ..
        } => 3,
        SqlExpr::IsNull(_) | SqlExpr::IsNotNull(_) => 5,
        SqlExpr::UnaryOp { .. } => 8,
        _ => ATOM,
    }
}
