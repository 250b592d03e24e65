//! Operator definitions for expressions.

use std::cmp::Ordering;

/// Integer arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithmeticOperator {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// Error raised by an arithmetic operator itself (operands already coerced)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DivisionByZero;

impl ArithmeticOperator {
    /// Apply the operator with two's-complement wraparound.
    ///
    /// `i32::MIN / -1` wraps to `i32::MIN` and `i32::MIN % -1` is `0`.
    pub fn apply(&self, left: i32, right: i32) -> Result<i32, DivisionByZero> {
        match self {
            ArithmeticOperator::Add => Ok(left.wrapping_add(right)),
            ArithmeticOperator::Sub => Ok(left.wrapping_sub(right)),
            ArithmeticOperator::Mul => Ok(left.wrapping_mul(right)),
            ArithmeticOperator::Div => {
                if right == 0 {
                    Err(DivisionByZero)
                } else {
                    Ok(left.wrapping_div(right))
                }
            }
            ArithmeticOperator::Mod => {
                if right == 0 {
                    Err(DivisionByZero)
                } else {
                    Ok(left.wrapping_rem(right))
                }
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArithmeticOperator::Add => "+",
            ArithmeticOperator::Sub => "-",
            ArithmeticOperator::Mul => "*",
            ArithmeticOperator::Div => "/",
            ArithmeticOperator::Mod => "%",
        }
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOperator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl ComparisonOperator {
    /// Whether this operator is defined between two Booleans
    pub fn is_equality(&self) -> bool {
        matches!(self, ComparisonOperator::Eq | ComparisonOperator::Ne)
    }

    /// Decide the operator from the ordering of its operands
    pub fn test(&self, ordering: Ordering) -> bool {
        match self {
            ComparisonOperator::Eq => ordering == Ordering::Equal,
            ComparisonOperator::Ne => ordering != Ordering::Equal,
            ComparisonOperator::Lt => ordering == Ordering::Less,
            ComparisonOperator::Le => ordering != Ordering::Greater,
            ComparisonOperator::Gt => ordering == Ordering::Greater,
            ComparisonOperator::Ge => ordering != Ordering::Less,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOperator::Eq => "=",
            ComparisonOperator::Ne => "<>",
            ComparisonOperator::Lt => "<",
            ComparisonOperator::Le => "<=",
            ComparisonOperator::Gt => ">",
            ComparisonOperator::Ge => ">=",
        }
    }
}

/// Boolean connectives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOperator {
    And,
    Or,
    Xor,
}

impl LogicalOperator {
    /// The left operand value that decides the result on its own, if any
    pub fn short_circuit_on(&self) -> Option<bool> {
        match self {
            LogicalOperator::And => Some(false),
            LogicalOperator::Or => Some(true),
            LogicalOperator::Xor => None,
        }
    }

    pub fn apply(&self, left: bool, right: bool) -> bool {
        match self {
            LogicalOperator::And => left && right,
            LogicalOperator::Or => left || right,
            LogicalOperator::Xor => left != right,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalOperator::And => "AND",
            LogicalOperator::Or => "OR",
            LogicalOperator::Xor => "XOR",
        }
    }
}

/// Unary operators supported in expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Not,
    Negate,
}

impl UnaryOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOperator::Not => "NOT",
            UnaryOperator::Negate => "-",
        }
    }
}
