//! Expression AST definitions.

use crate::expression::like::{LikePattern, LikePatternError};
use crate::expression::operator::{
    ArithmeticOperator, ComparisonOperator, LogicalOperator, UnaryOperator,
};
use crate::span::SourceSpan;
use crate::value::Value;

/// Reference to an event attribute by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    pub name: String,
    pub span: SourceSpan,
}

impl Identifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            span: SourceSpan::detached(),
        }
    }

    pub fn with_span(name: impl Into<String>, span: SourceSpan) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

/// Node variants of an expression tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpressionKind {
    /// Literal constant value
    Literal(Value),

    /// Attribute lookup
    Identifier(String),

    /// NOT or unary minus
    Unary {
        op: UnaryOperator,
        operand: Box<Expression>,
    },

    /// Integer arithmetic
    Arithmetic {
        op: ArithmeticOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },

    /// Comparison with implicit coercion
    Comparison {
        op: ComparisonOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },

    /// AND, OR, XOR
    Logical {
        op: LogicalOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },

    /// EXISTS attribute
    Exists(Identifier),

    /// value IN (set...)
    In {
        value: Box<Expression>,
        set: Vec<Expression>,
    },

    /// value LIKE 'pattern'
    Like {
        value: Box<Expression>,
        pattern: LikePattern,
    },

    /// Function call
    Call { name: String, args: Vec<Expression> },
}

/// Expression tree node.
///
/// Trees are immutable once built and can be evaluated from many threads at
/// once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub span: SourceSpan,
}

impl Expression {
    pub fn new(kind: ExpressionKind, span: SourceSpan) -> Self {
        Self { kind, span }
    }

    /// Replace the span of this node
    pub fn with_span(mut self, span: SourceSpan) -> Self {
        self.span = span;
        self
    }

    fn spanning(kind: ExpressionKind, first: &SourceSpan, last: &SourceSpan) -> Self {
        Self::new(kind, first.merge(last))
    }

    /// Create a literal expression
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::new(ExpressionKind::Literal(value.into()), SourceSpan::detached())
    }

    /// Create an attribute reference
    pub fn identifier(name: impl Into<String>) -> Self {
        Self::new(
            ExpressionKind::Identifier(name.into()),
            SourceSpan::detached(),
        )
    }

    pub fn unary(op: UnaryOperator, operand: Expression) -> Self {
        let span = operand.span.clone();
        Self::new(
            ExpressionKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        )
    }

    /// Create a NOT expression
    pub fn not_expr(operand: Expression) -> Self {
        Self::unary(UnaryOperator::Not, operand)
    }

    /// Create a unary minus expression
    pub fn negate(operand: Expression) -> Self {
        Self::unary(UnaryOperator::Negate, operand)
    }

    pub fn arithmetic(op: ArithmeticOperator, left: Expression, right: Expression) -> Self {
        let (first, last) = (left.span.clone(), right.span.clone());
        Self::spanning(
            ExpressionKind::Arithmetic {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            &first,
            &last,
        )
    }

    pub fn comparison(op: ComparisonOperator, left: Expression, right: Expression) -> Self {
        let (first, last) = (left.span.clone(), right.span.clone());
        Self::spanning(
            ExpressionKind::Comparison {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            &first,
            &last,
        )
    }

    pub fn logical(op: LogicalOperator, left: Expression, right: Expression) -> Self {
        let (first, last) = (left.span.clone(), right.span.clone());
        Self::spanning(
            ExpressionKind::Logical {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            &first,
            &last,
        )
    }

    /// Create an AND expression
    pub fn and(left: Expression, right: Expression) -> Self {
        Self::logical(LogicalOperator::And, left, right)
    }

    /// Create an OR expression
    pub fn or(left: Expression, right: Expression) -> Self {
        Self::logical(LogicalOperator::Or, left, right)
    }

    pub fn xor(left: Expression, right: Expression) -> Self {
        Self::logical(LogicalOperator::Xor, left, right)
    }

    /// Create an equality expression
    pub fn eq(left: Expression, right: Expression) -> Self {
        Self::comparison(ComparisonOperator::Eq, left, right)
    }

    /// Create a not-equal expression
    pub fn ne(left: Expression, right: Expression) -> Self {
        Self::comparison(ComparisonOperator::Ne, left, right)
    }

    pub fn lt(left: Expression, right: Expression) -> Self {
        Self::comparison(ComparisonOperator::Lt, left, right)
    }

    pub fn le(left: Expression, right: Expression) -> Self {
        Self::comparison(ComparisonOperator::Le, left, right)
    }

    pub fn gt(left: Expression, right: Expression) -> Self {
        Self::comparison(ComparisonOperator::Gt, left, right)
    }

    pub fn ge(left: Expression, right: Expression) -> Self {
        Self::comparison(ComparisonOperator::Ge, left, right)
    }

    /// Create an addition expression
    pub fn add_expr(left: Expression, right: Expression) -> Self {
        Self::arithmetic(ArithmeticOperator::Add, left, right)
    }

    /// Create a subtraction expression
    pub fn sub_expr(left: Expression, right: Expression) -> Self {
        Self::arithmetic(ArithmeticOperator::Sub, left, right)
    }

    /// Create a multiplication expression
    pub fn mul_expr(left: Expression, right: Expression) -> Self {
        Self::arithmetic(ArithmeticOperator::Mul, left, right)
    }

    /// Create a division expression
    pub fn div_expr(left: Expression, right: Expression) -> Self {
        Self::arithmetic(ArithmeticOperator::Div, left, right)
    }

    /// Create a remainder expression
    pub fn mod_expr(left: Expression, right: Expression) -> Self {
        Self::arithmetic(ArithmeticOperator::Mod, left, right)
    }

    /// Create an EXISTS expression
    pub fn exists(identifier: Identifier) -> Self {
        let span = identifier.span.clone();
        Self::new(ExpressionKind::Exists(identifier), span)
    }

    /// Create an IN expression
    pub fn in_list(value: Expression, set: Vec<Expression>) -> Self {
        let last = set
            .last()
            .map(|e| e.span.clone())
            .unwrap_or_else(|| value.span.clone());
        let first = value.span.clone();
        Self::spanning(
            ExpressionKind::In {
                value: Box::new(value),
                set,
            },
            &first,
            &last,
        )
    }

    /// Create a LIKE expression, compiling the pattern
    pub fn like(value: Expression, pattern: &str) -> Result<Self, LikePatternError> {
        let pattern = LikePattern::new(pattern)?;
        let span = value.span.clone();
        Ok(Self::new(
            ExpressionKind::Like {
                value: Box::new(value),
                pattern,
            },
            span,
        ))
    }

    /// Create a function call
    pub fn call(name: impl Into<String>, args: Vec<Expression>) -> Self {
        let span = match (args.first(), args.last()) {
            (Some(first), Some(last)) => first.span.merge(&last.span),
            _ => SourceSpan::detached(),
        };
        Self::new(
            ExpressionKind::Call {
                name: name.into(),
                args,
            },
            span,
        )
    }

    /// Names of all attributes this expression reads, in first-use order
    pub fn referenced_attributes(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_attributes(&mut names);
        names
    }

    fn collect_attributes<'a>(&'a self, names: &mut Vec<&'a str>) {
        match &self.kind {
            ExpressionKind::Literal(_) => {}
            ExpressionKind::Identifier(name) => push_unique(names, name),
            ExpressionKind::Exists(identifier) => push_unique(names, &identifier.name),
            ExpressionKind::Unary { operand, .. } => operand.collect_attributes(names),
            ExpressionKind::Arithmetic { left, right, .. }
            | ExpressionKind::Comparison { left, right, .. }
            | ExpressionKind::Logical { left, right, .. } => {
                left.collect_attributes(names);
                right.collect_attributes(names);
            }
            ExpressionKind::In { value, set } => {
                value.collect_attributes(names);
                for element in set {
                    element.collect_attributes(names);
                }
            }
            ExpressionKind::Like { value, .. } => value.collect_attributes(names),
            ExpressionKind::Call { args, .. } => {
                for arg in args {
                    arg.collect_attributes(names);
                }
            }
        }
    }
}

fn push_unique<'a>(names: &mut Vec<&'a str>, name: &'a str) {
    if !names.contains(&name) {
        names.push(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_expression_builders() {
        let expr = Expression::literal(10);
        assert_eq!(expr.kind, ExpressionKind::Literal(Value::Integer(10)));
        assert!(expr.span.is_detached());

        let expr = Expression::add_expr(Expression::identifier("amount"), Expression::literal(5));
        assert!(matches!(
            expr.kind,
            ExpressionKind::Arithmetic {
                op: ArithmeticOperator::Add,
                ..
            }
        ));

        let expr = Expression::and(
            Expression::eq(Expression::identifier("type"), Expression::literal("x")),
            Expression::exists(Identifier::new("subject")),
        );
        assert!(matches!(
            expr.kind,
            ExpressionKind::Logical {
                op: LogicalOperator::And,
                ..
            }
        ));

        assert!(Expression::like(Expression::identifier("type"), "a%").is_ok());
        assert!(Expression::like(Expression::identifier("type"), "a\\").is_err());
    }

    #[test]
    fn test_builders_merge_spans() {
        let source: Arc<str> = Arc::from("a + b");
        let left = Expression::identifier("a").with_span(SourceSpan::new(source.clone(), 0, 1));
        let right = Expression::identifier("b").with_span(SourceSpan::new(source, 4, 5));
        let expr = Expression::add_expr(left, right);
        assert_eq!(expr.span.text(), "a + b");
        assert_eq!(expr.span.start(), 0);
        assert_eq!(expr.span.end(), 5);
    }

    #[test]
    fn test_referenced_attributes() {
        let expr = Expression::or(
            Expression::and(
                Expression::gt(Expression::identifier("amount"), Expression::literal(100)),
                Expression::exists(Identifier::new("subject")),
            ),
            Expression::in_list(
                Expression::call("LOWER", vec![Expression::identifier("type")]),
                vec![Expression::identifier("amount"), Expression::literal("x")],
            ),
        );
        assert_eq!(
            expr.referenced_attributes(),
            vec!["amount", "subject", "type"]
        );
    }
}
