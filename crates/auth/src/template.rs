//! Query-template merging.
//!
//! Merge policy, applied left to right over the effective privileges:
//! - object + object: merged key by key, recursively;
//! - array + array: union, keeping the earlier elements first and appending
//!   later elements that are not already present;
//! - anything else (scalars, `null`, mismatched types): the later value wins.

use serde_json::{Map, Value};

use datagate_core::{AuthError, AuthResult};

use crate::Privilege;

/// Parse a privilege's stored template.
///
/// Returns `Ok(None)` for absent or blank templates. Anything that is not a
/// JSON object is an internal data error.
pub fn parse_template(privilege: &Privilege) -> AuthResult<Option<Map<String, Value>>> {
    let Some(raw) = privilege.query_template.as_deref() else {
        return Ok(None);
    };
    if raw.trim().is_empty() {
        return Ok(None);
    }

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(Some(map)),
        Ok(Value::Null) => Ok(None),
        Ok(other) => {
            tracing::error!(privilege = %privilege.name, template = %raw, "stored query template is not an object");
            Err(AuthError::application(format!(
                "query template of privilege '{}' is a {}, expected an object",
                privilege.name,
                json_kind(&other)
            )))
        }
        Err(e) => {
            tracing::error!(privilege = %privilege.name, template = %raw, error = %e, "cannot parse stored query template");
            Err(AuthError::application(format!(
                "query template of privilege '{}' is not valid JSON: {e}",
                privilege.name
            )))
        }
    }
}

/// Merge `later` into `earlier` following the module policy.
pub fn merge_values(earlier: Value, later: Value) -> Value {
    match (earlier, later) {
        (Value::Object(a), Value::Object(b)) => Value::Object(merge_maps(a, b)),
        (Value::Array(mut a), Value::Array(b)) => {
            for item in b {
                if !a.contains(&item) {
                    a.push(item);
                }
            }
            Value::Array(a)
        }
        (_, later) => later,
    }
}

pub fn merge_maps(mut earlier: Map<String, Value>, later: Map<String, Value>) -> Map<String, Value> {
    for (key, value) in later {
        let merged = match earlier.remove(&key) {
            Some(existing) => merge_values(existing, value),
            None => value,
        };
        earlier.insert(key, merged);
    }
    earlier
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
