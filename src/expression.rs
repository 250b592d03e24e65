//! Expression trees and their evaluation.
//!
//! This module provides:
//! - Expression AST representation with source spans
//! - Operators and LIKE pattern compilation
//! - Evaluation against an [`EvaluationRuntime`](crate::runtime::EvaluationRuntime)

pub mod error;
pub mod eval;
pub mod expr;
pub mod like;
pub mod operator;

pub use error::{ErrorKind, EvaluationError, EvaluationResult, FunctionError};
pub use eval::{evaluate, ExpressionEvaluator};
pub use expr::{Expression, ExpressionKind, Identifier};
pub use like::{LikePattern, LikePatternError};
pub use operator::{ArithmeticOperator, ComparisonOperator, LogicalOperator, UnaryOperator};
