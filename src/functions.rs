//! Built-in function library.
//!
//! String positions and lengths count Unicode scalar values, not bytes.

use crate::expression::FunctionError;
use crate::runtime::{FunctionDescriptor, FunctionRegistry};
use crate::value::Value;
use crate::value::ValueKind::{Boolean, Integer, String as Text};

/// Install every built-in into `registry`
pub fn register_builtins(registry: &mut FunctionRegistry) {
    registry.register(FunctionDescriptor::new("ABS", vec![Integer], Integer, abs));
    registry.register(FunctionDescriptor::new("LENGTH", vec![Text], Integer, length));
    registry.register(FunctionDescriptor::new("CONCAT", vec![], Text, concat).variadic(Text));
    registry.register(
        FunctionDescriptor::new("CONCAT_WS", vec![Text], Text, concat_ws).variadic(Text),
    );
    registry.register(FunctionDescriptor::new("LOWER", vec![Text], Text, lower));
    registry.register(FunctionDescriptor::new("UPPER", vec![Text], Text, upper));
    registry.register(FunctionDescriptor::new("TRIM", vec![Text], Text, trim));
    registry.register(FunctionDescriptor::new("LEFT", vec![Text, Integer], Text, left));
    registry.register(FunctionDescriptor::new("RIGHT", vec![Text, Integer], Text, right));
    registry.register(FunctionDescriptor::new(
        "SUBSTRING",
        vec![Text, Integer],
        Text,
        substring,
    ));
    registry.register(FunctionDescriptor::new(
        "SUBSTRING",
        vec![Text, Integer, Integer],
        Text,
        substring,
    ));
    registry.register(FunctionDescriptor::new("INT", vec![Text], Integer, to_int));
    registry.register(FunctionDescriptor::new("BOOL", vec![Text], Boolean, to_bool));
    registry.register(FunctionDescriptor::new("STRING", vec![Text], Text, to_string));
    registry.register(FunctionDescriptor::new("IS_INT", vec![Text], Boolean, is_int));
    registry.register(FunctionDescriptor::new("IS_BOOL", vec![Text], Boolean, is_bool));
}

fn int_arg(args: &[Value], index: usize) -> Result<i32, FunctionError> {
    match args.get(index) {
        Some(value) => Ok(value.clone().into_integer()?),
        None => Err(FunctionError::invalid_argument(format!(
            "missing argument {}",
            index + 1
        ))),
    }
}

fn str_arg(args: &[Value], index: usize) -> Result<&str, FunctionError> {
    match args.get(index) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(FunctionError::type_mismatch(format!(
            "argument {} must be a String, got {}",
            index + 1,
            other.kind()
        ))),
        None => Err(FunctionError::invalid_argument(format!(
            "missing argument {}",
            index + 1
        ))),
    }
}

fn abs(args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::Integer(int_arg(args, 0)?.wrapping_abs()))
}

fn length(args: &[Value]) -> Result<Value, FunctionError> {
    let count = str_arg(args, 0)?.chars().count();
    Ok(Value::Integer(i32::try_from(count).unwrap_or(i32::MAX)))
}

fn concat(args: &[Value]) -> Result<Value, FunctionError> {
    let mut out = String::new();
    for index in 0..args.len() {
        out.push_str(str_arg(args, index)?);
    }
    Ok(Value::String(out))
}

fn concat_ws(args: &[Value]) -> Result<Value, FunctionError> {
    let separator = str_arg(args, 0)?;
    let parts = (1..args.len())
        .map(|index| str_arg(args, index))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::String(parts.join(separator)))
}

fn lower(args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::String(str_arg(args, 0)?.to_lowercase()))
}

fn upper(args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::String(str_arg(args, 0)?.to_uppercase()))
}

fn trim(args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::String(str_arg(args, 0)?.trim().to_string()))
}

fn non_negative_length(length: i32) -> Result<usize, FunctionError> {
    usize::try_from(length).map_err(|_| {
        FunctionError::invalid_argument(format!("length must not be negative, got {}", length))
    })
}

fn left(args: &[Value]) -> Result<Value, FunctionError> {
    let text = str_arg(args, 0)?;
    let length = non_negative_length(int_arg(args, 1)?)?;
    Ok(Value::String(text.chars().take(length).collect()))
}

fn right(args: &[Value]) -> Result<Value, FunctionError> {
    let text = str_arg(args, 0)?;
    let length = non_negative_length(int_arg(args, 1)?)?;
    let skip = text.chars().count().saturating_sub(length);
    Ok(Value::String(text.chars().skip(skip).collect()))
}

/// SUBSTRING(text, pos [, len]) with a 1-based `pos`; a negative `pos`
/// counts from the end of the string.
fn substring(args: &[Value]) -> Result<Value, FunctionError> {
    let text = str_arg(args, 0)?;
    let position = int_arg(args, 1)?;
    let char_count = text.chars().count();

    let start = if position > 0 {
        position as usize - 1
    } else if position < 0 {
        char_count
            .checked_sub(position.unsigned_abs() as usize)
            .ok_or_else(|| out_of_range(position, char_count))?
    } else {
        return Err(out_of_range(position, char_count));
    };
    if start >= char_count {
        return Err(out_of_range(position, char_count));
    }

    let taken: String = if args.len() > 2 {
        let length = non_negative_length(int_arg(args, 2)?)?;
        text.chars().skip(start).take(length).collect()
    } else {
        text.chars().skip(start).collect()
    };
    Ok(Value::String(taken))
}

fn out_of_range(position: i32, char_count: usize) -> FunctionError {
    FunctionError::invalid_argument(format!(
        "position {} is out of range for a string of length {}",
        position, char_count
    ))
}

fn to_int(args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::Integer(int_arg(args, 0)?))
}

fn parse_bool(text: &str) -> Option<bool> {
    if text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn to_bool(args: &[Value]) -> Result<Value, FunctionError> {
    let text = str_arg(args, 0)?;
    parse_bool(text).map(Value::Boolean).ok_or_else(|| {
        FunctionError::type_mismatch(format!("cannot convert '{}' to Boolean", text))
    })
}

fn to_string(args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::String(str_arg(args, 0)?.to_string()))
}

fn is_int(args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::Boolean(str_arg(args, 0)?.parse::<i32>().is_ok()))
}

fn is_bool(args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::Boolean(parse_bool(str_arg(args, 0)?).is_some()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::ErrorKind;

    fn call(name: &str, args: Vec<Value>) -> Result<Value, FunctionError> {
        let registry = FunctionRegistry::with_builtins();
        let function = registry
            .resolve(name, args.len())
            .unwrap_or_else(|| panic!("no overload of {} for {} args", name, args.len()));
        function.invoke(&args)
    }

    fn s(text: &str) -> Value {
        Value::from(text)
    }

    #[test]
    fn test_abs() {
        assert_eq!(call("ABS", vec![Value::Integer(-5)]), Ok(Value::Integer(5)));
        assert_eq!(call("abs", vec![Value::Integer(7)]), Ok(Value::Integer(7)));
        assert_eq!(
            call("ABS", vec![Value::Integer(i32::MIN)]),
            Ok(Value::Integer(i32::MIN))
        );
    }

    #[test]
    fn test_string_functions() {
        assert_eq!(call("LENGTH", vec![s("héllo")]), Ok(Value::Integer(5)));
        assert_eq!(call("LENGTH", vec![s("")]), Ok(Value::Integer(0)));
        assert_eq!(call("LOWER", vec![s("AbC")]), Ok(s("abc")));
        assert_eq!(call("UPPER", vec![s("AbC")]), Ok(s("ABC")));
        assert_eq!(call("TRIM", vec![s("  x y  ")]), Ok(s("x y")));
    }

    #[test]
    fn test_concat() {
        assert_eq!(call("CONCAT", vec![]), Ok(s("")));
        assert_eq!(call("CONCAT", vec![s("a"), s("b"), s("c")]), Ok(s("abc")));
        assert_eq!(
            call("CONCAT_WS", vec![s("-"), s("a"), s("b")]),
            Ok(s("a-b"))
        );
        assert_eq!(call("CONCAT_WS", vec![s(",")]), Ok(s("")));
    }

    #[test]
    fn test_left_right() {
        assert_eq!(call("LEFT", vec![s("abcdef"), Value::Integer(3)]), Ok(s("abc")));
        assert_eq!(call("LEFT", vec![s("ab"), Value::Integer(10)]), Ok(s("ab")));
        assert_eq!(call("RIGHT", vec![s("abcdef"), Value::Integer(2)]), Ok(s("ef")));
        assert_eq!(call("RIGHT", vec![s("ab"), Value::Integer(10)]), Ok(s("ab")));
        assert_eq!(call("RIGHT", vec![s("ab"), Value::Integer(0)]), Ok(s("")));

        let err = call("LEFT", vec![s("ab"), Value::Integer(-1)]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_substring() {
        let text = s("event.created");
        assert_eq!(
            call("SUBSTRING", vec![text.clone(), Value::Integer(7)]),
            Ok(s("created"))
        );
        assert_eq!(
            call("SUBSTRING", vec![text.clone(), Value::Integer(1), Value::Integer(5)]),
            Ok(s("event"))
        );
        assert_eq!(
            call("SUBSTRING", vec![text.clone(), Value::Integer(-7)]),
            Ok(s("created"))
        );
        assert_eq!(
            call(
                "SUBSTRING",
                vec![text.clone(), Value::Integer(-7), Value::Integer(3)]
            ),
            Ok(s("cre"))
        );
        assert_eq!(
            call(
                "SUBSTRING",
                vec![text.clone(), Value::Integer(10), Value::Integer(100)]
            ),
            Ok(s("ated"))
        );

        for position in [0, 14, -14] {
            let err =
                call("SUBSTRING", vec![text.clone(), Value::Integer(position)]).unwrap_err();
            assert_eq!(err.kind, ErrorKind::InvalidArgument, "position {}", position);
        }

        let err =
            call("SUBSTRING", vec![text, Value::Integer(1), Value::Integer(-1)]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_casts() {
        assert_eq!(call("INT", vec![s("-12")]), Ok(Value::Integer(-12)));
        assert_eq!(
            call("INT", vec![s("twelve")]).unwrap_err().kind,
            ErrorKind::TypeMismatch
        );
        assert_eq!(call("BOOL", vec![s("TRUE")]), Ok(Value::Boolean(true)));
        assert_eq!(call("BOOL", vec![s("false")]), Ok(Value::Boolean(false)));
        assert_eq!(
            call("BOOL", vec![s("yes")]).unwrap_err().kind,
            ErrorKind::TypeMismatch
        );
        assert_eq!(call("STRING", vec![s("x")]), Ok(s("x")));
    }

    #[test]
    fn test_predicates() {
        assert_eq!(call("IS_INT", vec![s("42")]), Ok(Value::Boolean(true)));
        assert_eq!(call("IS_INT", vec![s("4.2")]), Ok(Value::Boolean(false)));
        assert_eq!(call("IS_BOOL", vec![s("False")]), Ok(Value::Boolean(true)));
        assert_eq!(call("IS_BOOL", vec![s("1")]), Ok(Value::Boolean(false)));
    }

    #[test]
    fn test_registry_contents() {
        let registry = FunctionRegistry::with_builtins();
        assert_eq!(registry.lookup("SUBSTRING").unwrap().len(), 2);
        assert!(registry.resolve("LEFT", 1).is_none());
        assert!(registry.resolve("CONCAT", 0).is_some());
        assert!(registry.resolve("concat_ws", 0).is_none());
        assert_eq!(registry.names().count(), 15);
    }
}
