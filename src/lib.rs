pub mod event;
pub mod expression;
pub mod filter;
pub mod functions;
pub mod runtime;
pub mod span;
pub mod sql;
pub mod value;

pub use event::{Event, EventRuntime};
pub use expression::{evaluate, ErrorKind, EvaluationError, Expression};
pub use filter::Filter;
pub use runtime::{EvaluationRuntime, FunctionDescriptor, FunctionRegistry};
pub use value::{Value, ValueKind};
