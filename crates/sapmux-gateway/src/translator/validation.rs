//! Request validation against a resolved schema
//!
//! Checks run in a fixed order and the first failing check decides the error:
//! 1. capability (`CapabilityDenied`)
//! 2. required fields on create/update (`MissingRequiredField`)
//! 3. key completeness for single-entity operations (`MissingKey`)
//! 4. unknown property names (`UnknownProperty`)

use serde_json::Value;

use sapmux_core::{EntitySchema, Operation, OperationRequest, SapMuxError, SapMuxResult};

pub fn validate(request: &OperationRequest, schema: &EntitySchema) -> SapMuxResult<()> {
    let operation = request.operation;
    let capability = operation.required_capability();
    if !schema.capabilities.allows(capability) {
        return Err(SapMuxError::CapabilityDenied {
            entity_name: schema.entity_name.clone(),
            operation: operation.to_string(),
            capability: capability.to_string(),
        });
    }

    let missing_fields = missing_required(request, schema);
    if !missing_fields.is_empty() {
        return Err(SapMuxError::MissingRequiredField {
            entity_name: schema.entity_name.clone(),
            fields: missing_fields,
        });
    }

    if operation.requires_key() {
        let missing_keys: Vec<String> = schema
            .key_properties
            .iter()
            .filter(|k| is_absent(request.parameters.get(k.as_str())))
            .cloned()
            .collect();
        if !missing_keys.is_empty() {
            return Err(SapMuxError::MissingKey {
                entity_name: schema.entity_name.clone(),
                keys: missing_keys,
            });
        }
    }

    let unknown: Vec<String> = request
        .parameters
        .keys()
        .filter(|name| schema.property(name).is_none())
        .cloned()
        .collect();
    if !unknown.is_empty() {
        return Err(SapMuxError::UnknownProperty {
            entity_name: schema.entity_name.clone(),
            properties: unknown,
        });
    }

    Ok(())
}

/// Create: every required-on-create property must carry a value.
/// Update: a non-nullable, non-key property must not be set to `null`
/// (keys are reported as missing keys instead).
fn missing_required(request: &OperationRequest, schema: &EntitySchema) -> Vec<String> {
    match request.operation {
        Operation::Create => schema
            .properties
            .iter()
            .filter(|p| p.required_on_create())
            .filter(|p| is_absent(request.parameters.get(&p.name)))
            .map(|p| p.name.clone())
            .collect(),
        Operation::Update => schema
            .properties
            .iter()
            .filter(|p| !p.is_key && !p.nullable)
            .filter(|p| matches!(request.parameters.get(&p.name), Some(Value::Null)))
            .map(|p| p.name.clone())
            .collect(),
        _ => Vec::new(),
    }
}

fn is_absent(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}
