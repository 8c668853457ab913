//! Stock preparers applied to raw input before validation.

use serde_json::Value;

/// Compose preparers, applied left to right.
pub fn preparer_chain<I, F>(preparers: I) -> impl Fn(Value) -> Value + Send + Sync
where
    I: IntoIterator<Item = F>,
    F: Fn(Value) -> Value + Send + Sync,
{
    let preparers: Vec<F> = preparers.into_iter().collect();
    move |value| preparers.iter().fold(value, |value, prepare| prepare(value))
}

/// Trim surrounding whitespace from strings.
pub fn strip(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.trim().to_string()),
        other => other,
    }
}

pub fn lowercase(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.to_lowercase()),
        other => other,
    }
}

/// Empty or whitespace-only strings become null.
pub fn blank_as_null(value: Value) -> Value {
    match value {
        Value::String(s) if s.trim().is_empty() => Value::Null,
        other => other,
    }
}
