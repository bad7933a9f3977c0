//! Template functions (global functions available in templates)

use minijinja::{Error, ErrorKind, State, Value};

/// Name under which the free-form variables are exposed in the context
pub const VARIABLES_KEY: &str = "variables";

/// Look up a free-form variable, with an optional default
///
/// Usage: {{ variable("name") }} or {{ variable("replicas", 1) }}
pub fn variable(state: &State, key: String, default: Option<Value>) -> Result<Value, Error> {
    let found = state
        .lookup(VARIABLES_KEY)
        .and_then(|vars| vars.get_attr(&key).ok())
        .filter(|v| !v.is_undefined());

    match (found, default) {
        (Some(value), _) => Ok(value),
        (None, Some(default)) => Ok(default),
        (None, None) => Err(Error::new(
            ErrorKind::UndefinedError,
            format!("variable '{}' is not defined", key),
        )),
    }
}

/// Fail with a custom error message
///
/// Usage: {{ fail("Something went wrong") }}
pub fn fail(message: String) -> Result<Value, Error> {
    Err(Error::new(ErrorKind::InvalidOperation, message))
}

/// Create a list from values
///
/// Usage: {{ list("a", "b", "c") }}
pub fn list(args: Vec<Value>) -> Value {
    Value::from(args)
}

/// Create a dict from key-value pairs
///
/// Usage: {{ dict("app", "web", "tier", "frontend") }}
pub fn dict(args: Vec<Value>) -> Result<Value, Error> {
    if args.len() % 2 != 0 {
        return Err(Error::new(
            ErrorKind::InvalidOperation,
            "dict requires an even number of arguments (key-value pairs)",
        ));
    }

    let mut pairs = Vec::with_capacity(args.len() / 2);
    for chunk in args.chunks(2) {
        let key = chunk[0]
            .as_str()
            .ok_or_else(|| Error::new(ErrorKind::InvalidOperation, "dict keys must be strings"))?;
        pairs.push((key.to_string(), chunk[1].clone()));
    }

    Ok(Value::from_iter(pairs))
}

/// Return the first value that is defined, non-null and not an empty string
///
/// Usage: {{ coalesce(variables.tag, "latest") }}
pub fn coalesce(args: Vec<Value>) -> Value {
    args.into_iter()
        .find(|arg| !arg.is_undefined() && !arg.is_none() && arg.as_str() != Some(""))
        .unwrap_or(Value::UNDEFINED)
}

/// Ternary operator
///
/// Usage: {{ ternary("yes", "no", variables.enabled) }}
pub fn ternary(true_val: Value, false_val: Value, condition: Value) -> Value {
    if condition.is_true() {
        true_val
    } else {
        false_val
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fail() {
        let err = fail("boom".to_string()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);
    }

    #[test]
    fn test_dict() {
        let d = dict(vec![Value::from("a"), Value::from(1)]).unwrap();
        assert_eq!(d.get_attr("a").unwrap(), Value::from(1));

        assert!(dict(vec![Value::from("a")]).is_err());
        assert!(dict(vec![Value::from(1), Value::from(2)]).is_err());
    }

    #[test]
    fn test_coalesce() {
        let v = coalesce(vec![Value::UNDEFINED, Value::from(""), Value::from("x")]);
        assert_eq!(v, Value::from("x"));
        assert!(coalesce(vec![Value::UNDEFINED]).is_undefined());
    }

    #[test]
    fn test_ternary() {
        assert_eq!(
            ternary(Value::from("y"), Value::from("n"), Value::from(true)),
            Value::from("y")
        );
        assert_eq!(
            ternary(Value::from("y"), Value::from("n"), Value::from(false)),
            Value::from("n")
        );
    }
}
