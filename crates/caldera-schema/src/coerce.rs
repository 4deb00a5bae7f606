use crate::kind::{ArgKind, StructSchema};
use serde_json::{Map, Value};
use tracing::debug;

/// Loosely-typed argument mapping as delivered by the controller.
pub type Args = Map<String, Value>;

/// Coerce every argument to the kind its schema declares.
///
/// Controller-supplied property values arrive as strings regardless of the
/// type the remote operation expects. Coercion is infallible: a value that
/// cannot be converted is passed through unchanged and the remote API itself
/// reports the type error. Argument names missing from the schema also pass
/// through unchanged, since schemas may be incomplete.
pub fn coerce_args(args: &Args, schema: &StructSchema) -> Args {
    args.iter()
        .map(|(name, value)| match schema.get(name) {
            Some(kind) => (name.clone(), coerce_value(value, kind)),
            None => {
                debug!("no schema entry for argument '{name}', passing through");
                (name.clone(), value.clone())
            }
        })
        .collect()
}

/// Coerce a single value to `kind`, recursing through structures and lists.
pub fn coerce_value(value: &Value, kind: &ArgKind) -> Value {
    match kind {
        ArgKind::Integer => coerce_integer(value),
        ArgKind::Boolean => coerce_boolean(value),
        ArgKind::String => value.clone(),
        ArgKind::Structure(members) => match value {
            Value::Object(map) => Value::Object(coerce_args(map, members)),
            _ => value.clone(),
        },
        ArgKind::List(element) => match value {
            Value::Array(items) => {
                Value::Array(items.iter().map(|item| coerce_value(item, element)).collect())
            }
            _ => value.clone(),
        },
    }
}

fn coerce_integer(value: &Value) -> Value {
    match value {
        Value::String(text) => match text.trim().parse::<i64>() {
            Ok(number) => Value::from(number),
            Err(_) => value.clone(),
        },
        _ => value.clone(),
    }
}

fn coerce_boolean(value: &Value) -> Value {
    match value {
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => value.clone(),
        },
        _ => value.clone(),
    }
}
