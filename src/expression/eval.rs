//! Expression evaluation implementation.
//!
//! The evaluator walks the tree recursively and stops at the first error.
//! Operands are always evaluated left to right, so for a given tree and
//! runtime the same error is reported every time.

use crate::expression::operator::DivisionByZero;
use crate::expression::{
    ArithmeticOperator, ComparisonOperator, ErrorKind, EvaluationError, EvaluationResult,
    Expression, ExpressionKind, LikePattern, LogicalOperator, UnaryOperator,
};
use crate::runtime::{select_overload, EvaluationRuntime};
use crate::value::{Value, ValueKind};

/// Evaluator for expressions against one runtime
pub struct ExpressionEvaluator<'a, R: EvaluationRuntime + ?Sized> {
    runtime: &'a R,
}

impl<'a, R: EvaluationRuntime + ?Sized> ExpressionEvaluator<'a, R> {
    /// Create a new evaluator bound to `runtime`
    pub fn new(runtime: &'a R) -> Self {
        Self { runtime }
    }

    /// Evaluate an expression and return the result
    pub fn evaluate(&self, expr: &Expression) -> EvaluationResult<Value> {
        match &expr.kind {
            ExpressionKind::Literal(value) => Ok(value.clone()),

            ExpressionKind::Identifier(name) => self
                .runtime
                .resolve(name)
                .ok_or_else(|| EvaluationError::missing_attribute(name, &expr.span)),

            ExpressionKind::Unary { op, operand } => self.evaluate_unary(*op, operand),

            ExpressionKind::Arithmetic { op, left, right } => {
                self.evaluate_arithmetic(*op, left, right, expr)
            }

            ExpressionKind::Comparison { op, left, right } => {
                let left_val = self.evaluate(left)?;
                let right_val = self.evaluate(right)?;
                let result = self.compare_values(*op, left_val, left, right_val, right, expr)?;
                Ok(Value::Boolean(result))
            }

            ExpressionKind::Logical { op, left, right } => self.evaluate_logical(*op, left, right),

            ExpressionKind::Exists(identifier) => Ok(Value::Boolean(
                self.runtime.resolve(&identifier.name).is_some(),
            )),

            ExpressionKind::In { value, set } => self.evaluate_in(value, set, expr),

            ExpressionKind::Like { value, pattern } => self.evaluate_like(value, pattern),

            ExpressionKind::Call { name, args } => self.evaluate_call(name, args, expr),
        }
    }

    /// Evaluate a unary operation
    fn evaluate_unary(&self, op: UnaryOperator, operand: &Expression) -> EvaluationResult<Value> {
        let value = self.evaluate(operand)?;
        let context = format!("operand of {}", op.as_str());
        match op {
            UnaryOperator::Not => {
                let b = boolean_operand(value, operand, &context)?;
                Ok(Value::Boolean(!b))
            }
            UnaryOperator::Negate => {
                let n = integer_operand(value, operand, &context)?;
                Ok(Value::Integer(n.wrapping_neg()))
            }
        }
    }

    fn evaluate_arithmetic(
        &self,
        op: ArithmeticOperator,
        left: &Expression,
        right: &Expression,
        node: &Expression,
    ) -> EvaluationResult<Value> {
        self.evaluate_integer_binary(op.as_str(), left, right, node, |a, b| op.apply(a, b))
    }

    /// Shared shape of every operator taking two Integers and producing one:
    /// evaluate both sides, coerce both, then apply.
    fn evaluate_integer_binary<F>(
        &self,
        symbol: &str,
        left: &Expression,
        right: &Expression,
        node: &Expression,
        apply: F,
    ) -> EvaluationResult<Value>
    where
        F: FnOnce(i32, i32) -> Result<i32, DivisionByZero>,
    {
        let left_val = self.evaluate(left)?;
        let right_val = self.evaluate(right)?;

        let a = integer_operand(left_val, left, &format!("left operand of {}", symbol))?;
        let b = integer_operand(right_val, right, &format!("right operand of {}", symbol))?;

        apply(a, b).map(Value::Integer).map_err(|DivisionByZero| {
            EvaluationError::new(ErrorKind::DivisionByZero, "division by zero", &node.span)
        })
    }

    /// AND and OR stop once the left side decides the result; XOR always
    /// evaluates both sides.
    fn evaluate_logical(
        &self,
        op: LogicalOperator,
        left: &Expression,
        right: &Expression,
    ) -> EvaluationResult<Value> {
        let left_val = self.evaluate(left)?;
        let a = boolean_operand(left_val, left, &format!("left operand of {}", op.as_str()))?;

        if op.short_circuit_on() == Some(a) {
            return Ok(Value::Boolean(a));
        }

        let right_val = self.evaluate(right)?;
        let b = boolean_operand(right_val, right, &format!("right operand of {}", op.as_str()))?;
        Ok(Value::Boolean(op.apply(a, b)))
    }

    /// Compare two values, coercing them to a common kind.
    ///
    /// Integer wins over String, String over Boolean. Booleans only support
    /// `=` and `<>`.
    fn compare_values(
        &self,
        op: ComparisonOperator,
        left: Value,
        left_expr: &Expression,
        right: Value,
        right_expr: &Expression,
        node: &Expression,
    ) -> EvaluationResult<bool> {
        let ordering = match (left, right) {
            (Value::Boolean(a), Value::Boolean(b)) => {
                if !op.is_equality() {
                    return Err(EvaluationError::new(
                        ErrorKind::TypeMismatch,
                        format!("operator {} is not defined for Boolean operands", op.as_str()),
                        &node.span,
                    ));
                }
                a.cmp(&b)
            }
            (left, right)
                if left.kind() == ValueKind::Integer || right.kind() == ValueKind::Integer =>
            {
                let context = format!("operand of {}", op.as_str());
                let a = integer_operand(left, left_expr, &context)?;
                let b = integer_operand(right, right_expr, &context)?;
                a.cmp(&b)
            }
            (left, right) => left.into_string().cmp(&right.into_string()),
        };

        Ok(op.test(ordering))
    }

    /// Membership test. Elements are evaluated in order and the first error
    /// aborts, even when a later element would have matched.
    fn evaluate_in(
        &self,
        value: &Expression,
        set: &[Expression],
        node: &Expression,
    ) -> EvaluationResult<Value> {
        let needle = self.evaluate(value)?;

        for element in set {
            let candidate = self.evaluate(element)?;
            if self.compare_values(
                ComparisonOperator::Eq,
                needle.clone(),
                value,
                candidate,
                element,
                node,
            )? {
                return Ok(Value::Boolean(true));
            }
        }

        Ok(Value::Boolean(false))
    }

    fn evaluate_like(&self, value: &Expression, pattern: &LikePattern) -> EvaluationResult<Value> {
        let text = self.evaluate(value)?.into_string();
        Ok(Value::Boolean(pattern.matches(&text)))
    }

    fn evaluate_call(
        &self,
        name: &str,
        args: &[Expression],
        node: &Expression,
    ) -> EvaluationResult<Value> {
        let overloads = self.runtime.lookup_function(name).ok_or_else(|| {
            EvaluationError::new(
                ErrorKind::UnknownFunction,
                format!("unknown function {}", name),
                &node.span,
            )
        })?;

        let function = select_overload(overloads, args.len()).ok_or_else(|| {
            EvaluationError::new(
                ErrorKind::InvalidArgument,
                format!(
                    "function {} does not accept {} argument(s)",
                    name,
                    args.len()
                ),
                &node.span,
            )
        })?;

        let mut values = Vec::with_capacity(args.len());
        for (index, arg) in args.iter().enumerate() {
            let kind = function.parameter_kind(index).ok_or_else(|| {
                EvaluationError::new(
                    ErrorKind::InvalidArgument,
                    format!("unexpected argument {} for {}", index + 1, function.name),
                    &arg.span,
                )
            })?;
            let value = self.evaluate(arg)?;
            let value = value.coerce(kind).map_err(|err| {
                EvaluationError::type_mismatch(
                    err,
                    &format!("argument {} of {}", index + 1, function.name),
                    &arg.span,
                )
            })?;
            values.push(value);
        }

        let result = function.invoke(&values).map_err(|err| {
            EvaluationError::new(
                err.kind,
                format!("{}: {}", function.name, err.message),
                &node.span,
            )
        })?;

        result.coerce(function.return_kind).map_err(|err| {
            EvaluationError::type_mismatch(
                err,
                &format!("result of {}", function.name),
                &node.span,
            )
        })
    }
}

fn integer_operand(value: Value, operand: &Expression, context: &str) -> EvaluationResult<i32> {
    value
        .into_integer()
        .map_err(|err| EvaluationError::type_mismatch(err, context, &operand.span))
}

fn boolean_operand(value: Value, operand: &Expression, context: &str) -> EvaluationResult<bool> {
    value
        .into_boolean()
        .map_err(|err| EvaluationError::type_mismatch(err, context, &operand.span))
}

/// Helper function to evaluate an expression against a runtime
pub fn evaluate<R: EvaluationRuntime + ?Sized>(
    expr: &Expression,
    runtime: &R,
) -> EvaluationResult<Value> {
    ExpressionEvaluator::new(runtime).evaluate(expr)
}
