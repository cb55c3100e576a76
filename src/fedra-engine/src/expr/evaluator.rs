//! Row-level evaluation of logical expressions.

use std::cmp::Ordering;

use common_error::{FedraError, FedraResult};
use fedra_core::{CompositeKey, Row, Value};
use fedra_logical::{LogicalExpr, ScalarOp};

/// An expression validated against an input width, ready to evaluate.
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledExpr {
    Column(usize),
    Literal(Value),
    Unary(ScalarOp, Box<CompiledExpr>),
    Binary(ScalarOp, Box<CompiledExpr>, Box<CompiledExpr>),
    And(Vec<CompiledExpr>),
    Or(Vec<CompiledExpr>),
}

impl CompiledExpr {
    /// Compile `expr` for rows of `width` columns.
    pub fn compile(expr: &LogicalExpr, width: usize) -> FedraResult<Self> {
        match expr {
            LogicalExpr::InputRef(i) if *i < width => Ok(Self::Column(*i)),
            LogicalExpr::InputRef(i) => Err(FedraError::planning(format!(
                "column ${i} out of range for {width} input columns"
            ))),
            LogicalExpr::Literal(v) => Ok(Self::Literal(v.clone())),
            LogicalExpr::Subquery(_) => Err(FedraError::unsupported_expression(format!(
                "subquery cannot be evaluated per row: {expr}"
            ))),
            LogicalExpr::Call { op, args } => {
                let args = args
                    .iter()
                    .map(|a| Self::compile(a, width))
                    .collect::<FedraResult<Vec<_>>>()?;
                Self::call(*op, args)
            }
        }
    }

    fn call(op: ScalarOp, mut args: Vec<CompiledExpr>) -> FedraResult<Self> {
        match op {
            ScalarOp::And | ScalarOp::Or if !args.is_empty() => Ok(if op == ScalarOp::And {
                Self::And(args)
            } else {
                Self::Or(args)
            }),
            ScalarOp::Not | ScalarOp::IsNull | ScalarOp::IsNotNull | ScalarOp::Neg
                if args.len() == 1 =>
            {
                let arg = args.remove(0);
                Ok(Self::Unary(op, Box::new(arg)))
            }
            ScalarOp::Eq
            | ScalarOp::NotEq
            | ScalarOp::Lt
            | ScalarOp::LtEq
            | ScalarOp::Gt
            | ScalarOp::GtEq
            | ScalarOp::Add
            | ScalarOp::Sub
            | ScalarOp::Mul
            | ScalarOp::Div
                if args.len() == 2 =>
            {
                let right = args.remove(1);
                let left = args.remove(0);
                Ok(Self::Binary(op, Box::new(left), Box::new(right)))
            }
            _ => Err(FedraError::unsupported_expression(format!(
                "{} with {} arguments",
                op.symbol(),
                args.len()
            ))),
        }
    }

    /// Evaluate against one row's values.
    pub fn evaluate(&self, values: &[Value]) -> FedraResult<Value> {
        match self {
            Self::Column(i) => values.get(*i).cloned().ok_or_else(|| {
                FedraError::execution(format!("row has no column ${i} ({} columns)", values.len()))
            }),
            Self::Literal(v) => Ok(v.clone()),
            Self::And(args) => {
                let mut saw_null = false;
                for arg in args {
                    match truth(&arg.evaluate(values)?)? {
                        Some(false) => return Ok(Value::Bool(false)),
                        Some(true) => {}
                        None => saw_null = true,
                    }
                }
                Ok(if saw_null { Value::Null } else { Value::Bool(true) })
            }
            Self::Or(args) => {
                let mut saw_null = false;
                for arg in args {
                    match truth(&arg.evaluate(values)?)? {
                        Some(true) => return Ok(Value::Bool(true)),
                        Some(false) => {}
                        None => saw_null = true,
                    }
                }
                Ok(if saw_null { Value::Null } else { Value::Bool(false) })
            }
            Self::Unary(op, arg) => unary(*op, arg.evaluate(values)?),
            Self::Binary(op, left, right) => {
                binary(*op, &left.evaluate(values)?, &right.evaluate(values)?)
            }
        }
    }
}

/// SQL truth value: `None` is unknown.
fn truth(value: &Value) -> FedraResult<Option<bool>> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(*b)),
        other => Err(FedraError::type_error(format!(
            "expected Bool, got {}",
            other.type_name()
        ))),
    }
}

fn unary(op: ScalarOp, value: Value) -> FedraResult<Value> {
    match op {
        ScalarOp::IsNull => Ok(Value::Bool(value.is_null())),
        ScalarOp::IsNotNull => Ok(Value::Bool(!value.is_null())),
        ScalarOp::Not => Ok(truth(&value)?.map_or(Value::Null, |b| Value::Bool(!b))),
        ScalarOp::Neg => match value {
            Value::Null => Ok(Value::Null),
            Value::Int64(i) => i
                .checked_neg()
                .map(Value::Int64)
                .ok_or_else(|| FedraError::execution("integer overflow in negation")),
            Value::Float64(f) => Ok(Value::Float64(-f)),
            other => Err(FedraError::type_error(format!(
                "cannot negate {}",
                other.type_name()
            ))),
        },
        _ => Err(FedraError::internal(format!("{op} is not a unary operator"))),
    }
}

fn binary(op: ScalarOp, left: &Value, right: &Value) -> FedraResult<Value> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }
    match op {
        ScalarOp::Eq
        | ScalarOp::NotEq
        | ScalarOp::Lt
        | ScalarOp::LtEq
        | ScalarOp::Gt
        | ScalarOp::GtEq => {
            let ordering = left.sql_cmp(right).ok_or_else(|| {
                FedraError::type_error(format!(
                    "cannot compare {} with {}",
                    left.type_name(),
                    right.type_name()
                ))
            })?;
            let result = match op {
                ScalarOp::Eq => ordering == Ordering::Equal,
                ScalarOp::NotEq => ordering != Ordering::Equal,
                ScalarOp::Lt => ordering == Ordering::Less,
                ScalarOp::LtEq => ordering != Ordering::Greater,
                ScalarOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            };
            Ok(Value::Bool(result))
        }
        ScalarOp::Add | ScalarOp::Sub | ScalarOp::Mul | ScalarOp::Div => {
            arithmetic(op, left, right)
        }
        _ => Err(FedraError::internal(format!("{op} is not a binary operator"))),
    }
}

fn arithmetic(op: ScalarOp, left: &Value, right: &Value) -> FedraResult<Value> {
    if let (Value::Int64(a), Value::Int64(b)) = (left, right) {
        let result = match op {
            ScalarOp::Add => a.checked_add(*b),
            ScalarOp::Sub => a.checked_sub(*b),
            ScalarOp::Mul => a.checked_mul(*b),
            _ if *b == 0 => return Err(FedraError::execution("division by zero")),
            _ => a.checked_div(*b),
        };
        return result
            .map(Value::Int64)
            .ok_or_else(|| FedraError::execution(format!("integer overflow in {a} {op} {b}")));
    }

    let (Some(a), Some(b)) = (left.as_float64(), right.as_float64()) else {
        return Err(FedraError::type_error(format!(
            "cannot apply {op} to {} and {}",
            left.type_name(),
            right.type_name()
        )));
    };
    let result = match op {
        ScalarOp::Add => a + b,
        ScalarOp::Sub => a - b,
        ScalarOp::Mul => a * b,
        _ if b == 0.0 => return Err(FedraError::execution("division by zero")),
        _ => a / b,
    };
    Ok(Value::Float64(result))
}

// =============================================================================
// Row functions
// =============================================================================

/// Row filter compiled from a boolean expression.
///
/// Rows for which the condition is false or unknown are rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct RowPredicate {
    expr: CompiledExpr,
}

impl RowPredicate {
    pub fn compile(condition: &LogicalExpr, width: usize) -> FedraResult<Self> {
        Ok(Self {
            expr: CompiledExpr::compile(condition, width)?,
        })
    }

    pub fn test(&self, row: &Row) -> FedraResult<bool> {
        self.test_values(row.values())
    }

    pub fn test_values(&self, values: &[Value]) -> FedraResult<bool> {
        Ok(truth(&self.expr.evaluate(values)?)? == Some(true))
    }
}

/// Computes one output column of a projection.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionFn {
    expr: CompiledExpr,
}

impl ProjectionFn {
    pub fn compile(expr: &LogicalExpr, width: usize) -> FedraResult<Self> {
        Ok(Self {
            expr: CompiledExpr::compile(expr, width)?,
        })
    }

    pub fn apply(&self, row: &Row) -> FedraResult<Value> {
        self.expr.evaluate(row.values())
    }
}

/// Extracts a hash key from fixed column positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyExtractor {
    columns: Vec<usize>,
}

impl KeyExtractor {
    pub fn new(columns: Vec<usize>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[usize] {
        &self.columns
    }

    pub fn extract(&self, row: &Row) -> CompositeKey {
        CompositeKey::extract(row.values(), &self.columns)
    }
}
