//! Query options and key predicates

use serde_json::{Map, Value};

use sapmux_core::{EdmType, EntitySchema, ODataVersion, Operation, QueryOptions};

/// System query pairs for an operation, `$` prefix added here and only here
///
/// Collection reads take every option; single-entity reads only `select` and
/// `expand`; writes take none.
pub fn build_query(options: &QueryOptions, operation: Operation) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut push = |name: &str, value: Option<String>| {
        if let Some(value) = value.as_deref().and_then(|v| clean_value(name, v)) {
            pairs.push((format!("${}", name), value));
        }
    };

    match operation {
        Operation::Read => {
            push("filter", options.filter.clone());
            push("select", options.select.clone());
            push("expand", options.expand.clone());
            push("orderby", options.orderby.clone());
            push("top", options.top.map(|n| n.to_string()));
            push("skip", options.skip.map(|n| n.to_string()));
        }
        Operation::ReadSingle => {
            push("select", options.select.clone());
            push("expand", options.expand.clone());
        }
        Operation::Create | Operation::Update | Operation::Delete => {}
    }
    pairs
}

/// Trim, drop empties, and strip a `$name=` the caller may have included anyway
fn clean_value(name: &str, raw: &str) -> Option<String> {
    let value = raw.trim();
    let with_dollar = format!("${}=", name);
    let value = match value.get(..with_dollar.len()) {
        Some(head) if head.eq_ignore_ascii_case(&with_dollar) => value[with_dollar.len()..].trim(),
        _ => value,
    };
    (!value.is_empty()).then(|| value.to_string())
}

/// `('ACME001')` for a single key, `(CustomerID='1',Language='EN')` for composites
///
/// Callers validate key presence first; a missing key renders as `null`.
pub fn key_predicate(
    schema: &EntitySchema,
    parameters: &Map<String, Value>,
    version: ODataVersion,
) -> String {
    let parts: Vec<(String, String)> = schema
        .key_descriptors()
        .map(|p| {
            let value = parameters.get(&p.name).unwrap_or(&Value::Null);
            (p.name.clone(), format_literal(value, &p.edm_type, version))
        })
        .collect();

    match parts.as_slice() {
        [(_, literal)] => format!("({})", literal),
        _ => format!(
            "({})",
            parts
                .iter()
                .map(|(name, literal)| format!("{}={}", name, literal))
                .collect::<Vec<_>>()
                .join(",")
        ),
    }
}

/// Key values keyed by property name, in key order
pub fn key_values(schema: &EntitySchema, parameters: &Map<String, Value>) -> Map<String, Value> {
    schema
        .key_properties
        .iter()
        .filter_map(|k| parameters.get(k).map(|v| (k.clone(), v.clone())))
        .collect()
}

fn format_literal(value: &Value, edm_type: &EdmType, version: ODataVersion) -> String {
    let raw = match value {
        Value::Null => return "null".to_string(),
        Value::Bool(b) => return b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    if edm_type.is_numeric() || *edm_type == EdmType::Boolean {
        return raw;
    }

    let typed_prefix = match (version, edm_type) {
        (ODataVersion::V2, EdmType::Guid) => Some("guid"),
        (ODataVersion::V2, EdmType::DateTime) => Some("datetime"),
        (ODataVersion::V2, EdmType::DateTimeOffset) => Some("datetimeoffset"),
        (ODataVersion::V2, EdmType::Time) => Some("time"),
        (ODataVersion::V4, EdmType::Guid)
        | (ODataVersion::V4, EdmType::Date)
        | (ODataVersion::V4, EdmType::DateTimeOffset)
        | (ODataVersion::V4, EdmType::Time) => return urlencoding::encode(&raw).into_owned(),
        _ => None,
    };

    let quoted = format!("'{}'", urlencoding::encode(&raw.replace('\'', "''")));
    match typed_prefix {
        Some(prefix) => format!("{}{}", prefix, quoted),
        None => quoted,
    }
}
