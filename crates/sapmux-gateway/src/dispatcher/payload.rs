//! Request payloads and response normalization

use serde_json::{json, Map, Value};

use sapmux_core::{EdmType, EntitySchema, ODataVersion, SapMuxError, SapMuxResult};

/// Request body for create/update
///
/// V2 JSON carries `Edm.Int64` and `Edm.Decimal` as strings, so numbers for
/// those types are converted.
pub fn build_payload(
    schema: &EntitySchema,
    parameters: &Map<String, Value>,
    version: ODataVersion,
    include_keys: bool,
) -> Value {
    let body: Map<String, Value> = parameters
        .iter()
        .filter_map(|(name, value)| {
            let property = schema.property(name)?;
            if property.is_key && !include_keys {
                return None;
            }
            let value = match (version, &property.edm_type, value) {
                (ODataVersion::V2, EdmType::Int64 | EdmType::Decimal, Value::Number(n)) => {
                    Value::String(n.to_string())
                }
                _ => value.clone(),
            };
            Some((name.clone(), value))
        })
        .collect();
    Value::Object(body)
}

/// `{"results": [...], "count": n}` from a V2 or V4 collection body
pub fn normalize_collection(body: Value) -> SapMuxResult<Value> {
    let (rows, total) = match body {
        Value::Object(mut root) => {
            if let Some(Value::Object(mut d)) = root.remove("d") {
                let total = d.remove("__count").and_then(as_count);
                match d.remove("results") {
                    Some(Value::Array(rows)) => (rows, total),
                    _ => return Err(unexpected("V2 collection without 'd.results'")),
                }
            } else if let Some(Value::Array(rows)) = root.remove("value") {
                (rows, root.remove("@odata.count").and_then(as_count))
            } else {
                return Err(unexpected("collection body has neither 'd.results' nor 'value'"));
            }
        }
        Value::Array(rows) => (rows, None),
        _ => return Err(unexpected("collection body is not a JSON object")),
    };

    let results: Vec<Value> = rows.into_iter().map(strip_annotations).collect();
    let count = results.len();
    let mut out = json!({
        "results": results,
        "count": count,
    });
    if let Some(total) = total {
        out["totalCount"] = json!(total);
    }
    Ok(out)
}

/// Bare record from a V2 `{"d": {...}}` or V4 entity body
pub fn normalize_entity(body: Value) -> SapMuxResult<Value> {
    match body {
        Value::Object(mut root) => {
            let record = match root.remove("d") {
                Some(d @ Value::Object(_)) => d,
                Some(_) => return Err(unexpected("'d' is not an object")),
                None => Value::Object(root),
            };
            Ok(strip_annotations(record))
        }
        _ => Err(unexpected("entity body is not a JSON object")),
    }
}

/// Drop `__metadata`, `__deferred` links and `@odata.*` control information
pub fn strip_annotations(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let cleaned: Map<String, Value> = map
                .into_iter()
                .filter(|(k, _)| !k.starts_with("__metadata") && !k.contains("@odata."))
                .filter(|(_, v)| !is_deferred(v))
                .map(|(k, v)| (k, strip_annotations(v)))
                .collect();
            Value::Object(cleaned)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(strip_annotations).collect()),
        other => other,
    }
}

fn is_deferred(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|o| o.len() == 1 && o.contains_key("__deferred"))
}

fn as_count(value: Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn unexpected(message: &str) -> SapMuxError {
    SapMuxError::RemoteUnexpectedResponse {
        status: None,
        message: message.to_string(),
    }
}
