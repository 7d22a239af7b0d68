//! Tool argument types and response projections

use serde::Deserialize;
use serde_json::{json, Map, Value};

use sapmux_core::{
    CatalogSearch, EntitySchema, Operation, QueryOptions, ServiceDescriptor,
};

use crate::translator;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverParams {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetMetadataParams {
    pub service_id: String,
    pub entity_name: String,
}

/// Query options as they appear on the wire, without `$` prefixes
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryArgs {
    #[serde(default, alias = "filter")]
    pub filter_string: Option<String>,
    #[serde(default, alias = "select")]
    pub select_string: Option<String>,
    #[serde(default, alias = "expand")]
    pub expand_string: Option<String>,
    #[serde(default, alias = "orderby")]
    pub orderby_string: Option<String>,
    #[serde(default, alias = "top")]
    pub top_number: Option<u32>,
    #[serde(default, alias = "skip")]
    pub skip_number: Option<u32>,
}

impl QueryArgs {
    pub fn into_options(self) -> QueryOptions {
        QueryOptions {
            filter: self.filter_string,
            select: self.select_string,
            expand: self.expand_string,
            orderby: self.orderby_string,
            top: self.top_number,
            skip: self.skip_number,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteParams {
    pub service_id: String,
    pub entity_name: String,
    pub operation: Operation,
    #[serde(flatten)]
    pub query: QueryArgs,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

/// Arguments of a per-entity tool: the target is implied by the tool name
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityToolArgs {
    #[serde(flatten)]
    pub query: QueryArgs,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

pub(crate) fn discover_response(search: &CatalogSearch, total_services: usize) -> Value {
    let matches: Vec<Value> = search
        .matches
        .iter()
        .map(|m| {
            json!({
                "type": "service",
                "service": {
                    "serviceId": m.service.service_id,
                    "serviceName": m.service.service_name,
                    "entityCount": m.entities.len(),
                    "categories": m.service.categories,
                },
                "entities": m
                    .entities
                    .iter()
                    .map(|e| json!({"entityName": e.entity_name}))
                    .collect::<Vec<_>>(),
            })
        })
        .collect();

    json!({
        "matches": matches,
        "fallback": search.fallback,
        "totalServices": total_services,
    })
}

pub(crate) fn metadata_response(service: &ServiceDescriptor, schema: &EntitySchema) -> Value {
    let properties: Vec<Value> = schema
        .properties
        .iter()
        .map(|p| {
            let mut out = json!({
                "name": p.name,
                "type": p.edm_type.as_str(),
                "nullable": p.nullable,
                "maxLength": p.max_length,
                "isKey": p.is_key,
            });
            if let Some(label) = &p.label {
                out["label"] = json!(label);
            }
            out
        })
        .collect();

    json!({
        "service": {
            "serviceId": service.service_id,
            "serviceName": service.service_name,
            "description": service.description,
            "odataVersion": service.odata_version.as_str(),
        },
        "entity": {
            "name": schema.entity_name,
            "entitySet": schema.entity_set,
            "namespace": schema.namespace,
            "keyProperties": schema.key_properties,
            "propertyCount": schema.properties.len(),
        },
        "capabilities": {
            "readable": schema.capabilities.readable,
            "creatable": schema.capabilities.creatable,
            "updatable": schema.capabilities.updatable,
            "deletable": schema.capabilities.deletable,
        },
        "properties": properties,
        "inputSchema": translator::to_tool_input_schema(schema),
    })
}
