// SPDX-License-Identifier: AGPL-3.0-or-later

//! Lenient scalar reads over nvme-cli JSON documents.
//!
//! Document *structure* is checked strictly (see [`parse_document`]); leaf
//! values are not. A missing or oddly-typed leaf reads as zero, since each
//! nvme-cli release adds or renames fields without notice.

use serde_json::Value;

use crate::error::{ExporterError, Result};

/// Parse raw command output, naming the document in the error.
pub fn parse_document(raw: &str, context: &str) -> Result<Value> {
    serde_json::from_str(raw).map_err(|e| ExporterError::invalid_json(context, e))
}

/// Read `key` of `value` as a float; zero if absent or not numeric.
pub fn field_f64(value: &Value, key: &str) -> f64 {
    value.get(key).map(as_f64).unwrap_or(0.0)
}

/// Read `key` of `value` as an integer; zero if absent or not numeric.
pub fn field_i64(value: &Value, key: &str) -> i64 {
    value.get(key).map(as_i64).unwrap_or(0)
}

/// Read `key` of `value` as a string; empty if absent.
///
/// Numbers are rendered, so a legacy `"NameSpace": 1` reads as `"1"`.
pub fn field_str(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Coerce a scalar to `f64` (booleans count as 0/1, numeric strings parse).
pub fn as_f64(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::Bool(true) => 1.0,
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Coerce a scalar to `i64`, truncating floats.
pub fn as_i64(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|u| u.min(i64::MAX as u64) as i64))
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Value::Bool(true) => 1,
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
                .unwrap_or(0)
        }
        _ => 0,
    }
}

/// Elements of `value[key]` if it is an array; nothing otherwise.
pub fn array_at<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}
