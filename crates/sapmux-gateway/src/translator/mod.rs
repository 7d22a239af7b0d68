//! Schema Translator
//!
//! Converts a resolved [`EntitySchema`] into:
//! - a JSON-Schema description of the `parameters` an operation accepts
//! - the validation verdict for one [`OperationRequest`]
//!
//! Property order always follows the schema's declaration order.

mod validation;

pub use validation::validate;

use serde_json::{json, Map, Value};

use sapmux_core::{EdmType, EntitySchema, Operation, PropertyDescriptor};

/// JSON-Schema description of an entity's parameters
///
/// `required` lists the key properties (needed to address a single entity);
/// create-time requirements are reported separately since they depend on the
/// operation.
pub fn to_tool_input_schema(schema: &EntitySchema) -> Value {
    let mut description = format!(
        "Properties of {} (entity set {}). Keys: {}.",
        schema.entity_name,
        schema.entity_set,
        schema.key_properties.join(", ")
    );
    let create_required = create_required_fields(schema);
    if !create_required.is_empty() {
        description.push_str(&format!(
            " Required on create: {}.",
            create_required.join(", ")
        ));
    }

    json!({
        "type": "object",
        "description": description,
        "properties": property_schemas(schema.properties.iter()),
        "required": schema.key_properties,
        "additionalProperties": false,
    })
}

/// Parameter schema for one specific operation (used by per-entity tools)
pub fn operation_input_schema(schema: &EntitySchema, operation: Operation) -> Value {
    let (properties, required): (Vec<&PropertyDescriptor>, Vec<String>) = match operation {
        Operation::Read => (Vec::new(), Vec::new()),
        Operation::ReadSingle | Operation::Delete => (
            schema.key_descriptors().collect(),
            schema.key_properties.clone(),
        ),
        Operation::Create => (
            schema.properties.iter().filter(|p| !p.computed).collect(),
            create_required_fields(schema),
        ),
        Operation::Update => (
            schema.properties.iter().filter(|p| !p.computed || p.is_key).collect(),
            schema.key_properties.clone(),
        ),
    };

    let mut root = Map::new();
    root.insert("type".into(), json!("object"));
    let mut props = property_schemas(properties.into_iter());
    if matches!(operation, Operation::Read | Operation::ReadSingle) {
        if let Value::Object(map) = &mut props {
            for (name, option) in query_option_schemas(operation) {
                map.insert(name, option);
            }
        }
    }
    root.insert("properties".into(), props);
    if !required.is_empty() {
        root.insert("required".into(), json!(required));
    }
    Value::Object(root)
}

/// Non-nullable, non-computed, non-defaulted properties in declaration order
pub fn create_required_fields(schema: &EntitySchema) -> Vec<String> {
    schema
        .properties
        .iter()
        .filter(|p| p.required_on_create())
        .map(|p| p.name.clone())
        .collect()
}

fn property_schemas<'a>(properties: impl Iterator<Item = &'a PropertyDescriptor>) -> Value {
    let map: Map<String, Value> = properties
        .map(|p| (p.name.clone(), property_schema(p)))
        .collect();
    Value::Object(map)
}

fn property_schema(property: &PropertyDescriptor) -> Value {
    let mut out = Map::new();
    let (json_type, format) = json_type(&property.edm_type);
    if let Some(json_type) = json_type {
        out.insert("type".into(), json!(json_type));
    }
    if let Some(format) = format {
        out.insert("format".into(), json!(format));
    }
    if let Some(max_length) = property.max_length {
        if json_type == Some("string") {
            out.insert("maxLength".into(), json!(max_length));
        }
    }

    let mut description = property
        .label
        .clone()
        .unwrap_or_else(|| property.name.clone());
    description.push_str(&format!(" (edm: {}", property.edm_type));
    if property.is_key {
        description.push_str(", key");
    }
    if !property.nullable {
        description.push_str(", not null");
    }
    description.push(')');
    out.insert("description".into(), json!(description));

    if property.computed {
        out.insert("readOnly".into(), json!(true));
    }
    if let Some(default) = &property.default_value {
        out.insert("default".into(), json!(default));
    }
    Value::Object(out)
}

/// JSON type and format for an EDM type; `None` type means "any"
fn json_type(edm: &EdmType) -> (Option<&'static str>, Option<&'static str>) {
    match edm {
        EdmType::String => (Some("string"), None),
        EdmType::Boolean => (Some("boolean"), None),
        EdmType::Byte | EdmType::SByte | EdmType::Int16 | EdmType::Int32 | EdmType::Int64 => {
            (Some("integer"), None)
        }
        EdmType::Decimal | EdmType::Single | EdmType::Double => (Some("number"), None),
        EdmType::Guid => (Some("string"), Some("uuid")),
        EdmType::Date => (Some("string"), Some("date")),
        EdmType::DateTime | EdmType::DateTimeOffset => (Some("string"), Some("date-time")),
        EdmType::Time => (Some("string"), Some("time")),
        EdmType::Duration => (Some("string"), Some("duration")),
        EdmType::Binary => (Some("string"), Some("byte")),
        EdmType::Complex => (Some("object"), None),
        EdmType::Collection => (Some("array"), None),
        EdmType::Stream | EdmType::Unknown => (None, None),
    }
}

fn query_option_schemas(operation: Operation) -> Vec<(String, Value)> {
    let mut options = vec![
        (
            "selectString".to_string(),
            json!({"type": "string", "description": "Comma-separated properties to return (no $ prefix)"}),
        ),
        (
            "expandString".to_string(),
            json!({"type": "string", "description": "Navigation properties to expand (no $ prefix)"}),
        ),
    ];
    if operation == Operation::Read {
        options.extend([
            (
                "filterString".to_string(),
                json!({"type": "string", "description": "OData filter expression, e.g. CustomerName eq 'ACME'"}),
            ),
            (
                "orderbyString".to_string(),
                json!({"type": "string", "description": "Sort order, e.g. CreationDate desc"}),
            ),
            (
                "topNumber".to_string(),
                json!({"type": "integer", "minimum": 0, "description": "Maximum number of records"}),
            ),
            (
                "skipNumber".to_string(),
                json!({"type": "integer", "minimum": 0, "description": "Records to skip"}),
            ),
        ]);
    }
    options
}
