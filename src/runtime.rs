//! The per-evaluation capability the evaluator consumes: attribute lookup and
//! function resolution.

use crate::expression::FunctionError;
use crate::functions;
use crate::value::{Value, ValueKind};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Signature of a function implementation. Arguments are already coerced to
/// the declared parameter kinds.
pub type FunctionImpl = dyn Fn(&[Value]) -> Result<Value, FunctionError> + Send + Sync;

/// A callable function overload
#[derive(Clone)]
pub struct FunctionDescriptor {
    pub name: String,
    /// Fixed leading parameters
    pub parameter_kinds: Vec<ValueKind>,
    /// Kind of any number of trailing arguments, if the function is variadic
    pub variadic: Option<ValueKind>,
    pub return_kind: ValueKind,
    invoke: Arc<FunctionImpl>,
}

impl FunctionDescriptor {
    pub fn new<F>(
        name: impl Into<String>,
        parameter_kinds: Vec<ValueKind>,
        return_kind: ValueKind,
        invoke: F,
    ) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, FunctionError> + Send + Sync + 'static,
    {
        Self {
            name: name.into().to_ascii_uppercase(),
            parameter_kinds,
            variadic: None,
            return_kind,
            invoke: Arc::new(invoke),
        }
    }

    /// Accept any number of trailing arguments of `kind`
    pub fn variadic(mut self, kind: ValueKind) -> Self {
        self.variadic = Some(kind);
        self
    }

    pub fn accepts_arity(&self, arity: usize) -> bool {
        if self.variadic.is_some() {
            arity >= self.parameter_kinds.len()
        } else {
            arity == self.parameter_kinds.len()
        }
    }

    /// Declared kind of the argument at `index`
    pub fn parameter_kind(&self, index: usize) -> Option<ValueKind> {
        self.parameter_kinds.get(index).copied().or(self.variadic)
    }

    pub fn invoke(&self, args: &[Value]) -> Result<Value, FunctionError> {
        (self.invoke)(args)
    }

    /// Human readable signature such as `LEFT(String, Integer) -> String`
    pub fn signature(&self) -> String {
        let mut params: Vec<String> = self
            .parameter_kinds
            .iter()
            .map(|kind| kind.to_string())
            .collect();
        if let Some(kind) = self.variadic {
            params.push(format!("{}...", kind));
        }
        format!("{}({}) -> {}", self.name, params.join(", "), self.return_kind)
    }
}

impl fmt::Debug for FunctionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.signature())
    }
}

/// Function overloads keyed by case-insensitive name
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Vec<FunctionDescriptor>>,
}

impl FunctionRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in function library
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        functions::register_builtins(&mut registry);
        registry
    }

    /// Add an overload. An existing overload with the same arity shape is
    /// replaced.
    pub fn register(&mut self, descriptor: FunctionDescriptor) {
        let overloads = self.functions.entry(descriptor.name.clone()).or_default();
        overloads.retain(|existing| {
            existing.parameter_kinds.len() != descriptor.parameter_kinds.len()
                || existing.variadic.is_some() != descriptor.variadic.is_some()
        });
        overloads.push(descriptor);
    }

    pub fn lookup(&self, name: &str) -> Option<&[FunctionDescriptor]> {
        self.functions
            .get(&name.to_ascii_uppercase())
            .map(|overloads| overloads.as_slice())
    }

    /// Overload of `name` taking `arity` arguments
    pub fn resolve(&self, name: &str, arity: usize) -> Option<&FunctionDescriptor> {
        select_overload(self.lookup(name)?, arity)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(|name| name.as_str())
    }
}

/// Pick the overload for a call with `arity` arguments; fixed-arity overloads
/// win over variadic ones.
pub fn select_overload(
    overloads: &[FunctionDescriptor],
    arity: usize,
) -> Option<&FunctionDescriptor> {
    overloads
        .iter()
        .find(|f| f.variadic.is_none() && f.accepts_arity(arity))
        .or_else(|| overloads.iter().find(|f| f.accepts_arity(arity)))
}

/// The shared built-in registry
pub fn builtin_functions() -> &'static FunctionRegistry {
    static BUILTINS: OnceLock<FunctionRegistry> = OnceLock::new();
    BUILTINS.get_or_init(FunctionRegistry::with_builtins)
}

/// Everything an evaluation needs from its surroundings.
///
/// One runtime is bound to one event. The evaluator only reads from it; any
/// blocking or side effects come from the implementation.
pub trait EvaluationRuntime {
    /// Look up an attribute. `None` means the attribute is not present, which
    /// is different from an empty string or zero.
    fn resolve(&self, name: &str) -> Option<Value>;

    /// Overloads registered under `name`
    fn lookup_function(&self, name: &str) -> Option<&[FunctionDescriptor]> {
        builtin_functions().lookup(name)
    }
}

impl<R: EvaluationRuntime + ?Sized> EvaluationRuntime for &R {
    fn resolve(&self, name: &str) -> Option<Value> {
        (**self).resolve(name)
    }

    fn lookup_function(&self, name: &str) -> Option<&[FunctionDescriptor]> {
        (**self).lookup_function(name)
    }
}

impl EvaluationRuntime for HashMap<String, Value> {
    fn resolve(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}
