use serde_json::Value;

/// Walk a dotted path (e.g. `"Pipeline.Id"`) through nested objects of a
/// response document. Returns `None` as soon as a segment is missing or the
/// current value is not an object.
pub fn select<'a>(document: &'a Value, query: &str) -> Option<&'a Value> {
    let mut current = document;
    for segment in query.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Like [`select`], rendering the selected value as a string.
///
/// String values are returned as-is; other scalars use their JSON rendering,
/// so a numeric physical id still yields a usable opaque string.
pub fn select_string(document: &Value, query: &str) -> Option<String> {
    match select(document, query)? {
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}
