//! Compiled filters: parse once, evaluate against many events.

use crate::expression::{evaluate, EvaluationError, EvaluationResult, Expression};
use crate::runtime::{EvaluationRuntime, FunctionRegistry};
use crate::sql::{ParseError, Parser};
use crate::value::Value;
use log::debug;
use std::fmt;
use std::str::FromStr;

/// Predicate over any runtime. Evaluation errors count as no match.
pub type Predicate = Box<dyn Fn(&dyn EvaluationRuntime) -> bool + Send + Sync + 'static>;

/// A parsed filter expression.
///
/// Filters are immutable and can be shared between threads behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    source: String,
    expression: Expression,
}

impl Filter {
    /// Compile a filter whose calls resolve against the built-in functions
    pub fn compile(source: &str) -> Result<Self, ParseError> {
        let expression = Parser::new(source)?.parse()?;
        debug!("Compiled filter `{}`", source);
        Ok(Self::new(source, expression))
    }

    /// Compile a filter whose calls resolve against `functions`.
    ///
    /// The runtime used for evaluation must offer the same functions, see
    /// [`EventRuntime`](crate::event::EventRuntime).
    pub fn compile_with(source: &str, functions: &FunctionRegistry) -> Result<Self, ParseError> {
        let expression = Parser::with_functions(source, functions)?.parse()?;
        debug!("Compiled filter `{}` with custom functions", source);
        Ok(Self::new(source, expression))
    }

    /// Wrap an already built expression
    pub fn from_expression(expression: Expression) -> Self {
        let source = expression.span.text().to_string();
        Self::new(source, expression)
    }

    fn new(source: impl Into<String>, expression: Expression) -> Self {
        Self {
            source: source.into(),
            expression,
        }
    }

    /// The filter text as given
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    /// Evaluate to whatever value the expression produces
    pub fn evaluate<R: EvaluationRuntime + ?Sized>(&self, runtime: &R) -> EvaluationResult<Value> {
        evaluate(&self.expression, runtime)
    }

    /// Evaluate and require a Boolean result
    pub fn matches<R: EvaluationRuntime + ?Sized>(&self, runtime: &R) -> EvaluationResult<bool> {
        self.evaluate(runtime)?.into_boolean().map_err(|err| {
            EvaluationError::type_mismatch(err, "filter result", &self.expression.span)
        })
    }

    /// Turn the filter into a predicate
    pub fn into_predicate(self) -> Predicate {
        Box::new(move |runtime: &dyn EvaluationRuntime| match self.matches(runtime) {
            Ok(matched) => matched,
            Err(err) => {
                debug!("Filter `{}` failed: {}", self.source, err);
                false
            }
        })
    }
}

impl FromStr for Filter {
    type Err = ParseError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        Filter::compile(source)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Event, EventRuntime};
    use crate::expression::ErrorKind;
    use crate::runtime::FunctionDescriptor;
    use crate::value::ValueKind;

    fn order(amount: i32) -> Event {
        Event::new()
            .with("type", "order.created")
            .with("source", "/shop/eu")
            .with("amount", amount)
    }

    #[test]
    fn test_compile_and_match() {
        let filter = Filter::compile("type LIKE 'order.%' AND amount >= 100").unwrap();
        assert_eq!(filter.source(), "type LIKE 'order.%' AND amount >= 100");
        assert!(filter.matches(&order(100)).unwrap());
        assert!(!filter.matches(&order(99)).unwrap());

        let filter: Filter = "EXISTS subject".parse().unwrap();
        assert!(!filter.matches(&order(1)).unwrap());
    }

    #[test]
    fn test_evaluate_non_boolean() {
        let filter = Filter::compile("amount * 2").unwrap();
        assert_eq!(filter.evaluate(&order(21)).unwrap(), Value::Integer(42));

        let err = filter.matches(&order(21)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeMismatch);
        assert_eq!(err.span.text(), "amount * 2");
    }

    #[test]
    fn test_predicate_treats_errors_as_no_match() {
        let predicate = Filter::compile("amount / divisor > 1")
            .unwrap()
            .into_predicate();

        assert!(predicate(&order(10).with("divisor", 2)));
        assert!(!predicate(&order(10).with("divisor", 0)));
        assert!(!predicate(&order(10)));
    }

    #[test]
    fn test_custom_functions() {
        let mut registry = FunctionRegistry::with_builtins();
        registry.register(FunctionDescriptor::new(
            "REGION",
            vec![ValueKind::String],
            ValueKind::String,
            |args| {
                let source = args[0].to_string();
                Ok(Value::from(source.rsplit('/').next().unwrap_or_default()))
            },
        ));

        let filter = Filter::compile_with("REGION(source) = 'eu'", &registry).unwrap();
        let event = order(1);
        assert!(filter
            .matches(&EventRuntime::new(&event, &registry))
            .unwrap());

        // The default runtime does not know REGION
        let err = filter.matches(&event).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownFunction);

        assert!(Filter::compile("REGION(source) = 'eu'").is_err());
    }

    #[test]
    fn test_from_expression() {
        let expr = Expression::gt(Expression::identifier("amount"), Expression::literal(5));
        let filter = Filter::from_expression(expr);
        assert!(filter.matches(&order(6)).unwrap());
    }

    #[test]
    fn test_filter_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Filter>();
        assert_send_sync::<Predicate>();
    }
}
