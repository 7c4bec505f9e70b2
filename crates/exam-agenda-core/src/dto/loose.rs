//! Lenient scalar deserializers for backend payloads.
//!
//! The backend is not consistent about scalar types: ids arrive as numbers or
//! numeric strings, flags as booleans, `0`/`1` or strings.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Number or numeric string; anything else is `None`.
pub fn id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Ok(value_to_id(&Value::deserialize(deserializer)?))
}

/// Boolean, `0`/`1`, or `"true"`/`"1"`/`"sim"`.
pub fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(value_to_flag(&Value::deserialize(deserializer)?))
}

/// String or number rendered as text; `null` is empty.
pub fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(value_to_text(&Value::deserialize(deserializer)?))
}

pub fn value_to_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn value_to_flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64() == Some(1),
        Value::String(s) => matches!(s.trim().to_lowercase().as_str(), "true" | "1" | "sim" | "s"),
        _ => false,
    }
}

pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}
