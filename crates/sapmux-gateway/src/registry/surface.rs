//! Tool surfaces
//!
//! A surface decides which tools are listed and how a tool name plus its
//! arguments map onto the three registry operations. One surface is chosen
//! from [`RegistryMode`] when the registry is built.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use parking_lot::RwLock;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use sapmux_core::{Operation, RegistryMode};

use super::params::{DiscoverParams, EntityToolArgs, ExecuteParams, GetMetadataParams};
use super::{RegistryCore, ToolCallError};
use crate::translator;

pub const DISCOVER_TOOL: &str = "discover";
pub const GET_METADATA_TOOL: &str = "getMetadata";
pub const EXECUTE_TOOL: &str = "executeOperation";

const QUERY_ARGUMENTS: [&str; 6] = [
    "filterString",
    "selectString",
    "expandString",
    "orderbyString",
    "topNumber",
    "skipNumber",
];

/// Schema resolutions running at once while registering per-entity tools
const REGISTRATION_CONCURRENCY: usize = 8;

/// A tool call mapped onto a registry operation
#[derive(Debug, Clone)]
pub enum ToolInvocation {
    Discover(DiscoverParams),
    GetMetadata(GetMetadataParams),
    Execute(ExecuteParams),
}

#[async_trait]
pub trait ToolSurface: Send + Sync {
    fn mode(&self) -> RegistryMode;

    /// Build the tool definitions (name, description, inputSchema)
    async fn register(&self, core: &RegistryCore) -> Vec<Value>;

    fn route(&self, name: &str, arguments: Value) -> Result<ToolInvocation, ToolCallError>;
}

pub fn surface_for(mode: RegistryMode) -> Box<dyn ToolSurface> {
    match mode {
        RegistryMode::Hierarchical => Box::new(HierarchicalSurface),
        RegistryMode::Flat => Box::new(FlatSurface::default()),
    }
}

fn parse<T: serde::de::DeserializeOwned>(tool: &str, arguments: Value) -> Result<T, ToolCallError> {
    let arguments = if arguments.is_null() {
        json!({})
    } else {
        arguments
    };
    serde_json::from_value(arguments).map_err(|e| ToolCallError::InvalidArguments {
        tool: tool.to_string(),
        message: e.to_string(),
    })
}

// ============================================================================
// Hierarchical: discover → getMetadata → executeOperation
// ============================================================================

pub struct HierarchicalSurface;

#[async_trait]
impl ToolSurface for HierarchicalSurface {
    fn mode(&self) -> RegistryMode {
        RegistryMode::Hierarchical
    }

    async fn register(&self, _core: &RegistryCore) -> Vec<Value> {
        vec![discover_tool(), get_metadata_tool(), execute_tool()]
    }

    fn route(&self, name: &str, arguments: Value) -> Result<ToolInvocation, ToolCallError> {
        match name {
            DISCOVER_TOOL => Ok(ToolInvocation::Discover(parse(name, arguments)?)),
            GET_METADATA_TOOL => Ok(ToolInvocation::GetMetadata(parse(name, arguments)?)),
            EXECUTE_TOOL => Ok(ToolInvocation::Execute(parse(name, arguments)?)),
            _ => Err(ToolCallError::UnknownTool(name.to_string())),
        }
    }
}

fn discover_tool() -> Value {
    json!({
        "name": DISCOVER_TOOL,
        "description": "Level 1: search the SAP OData service catalog. Returns matching services \
            with their entity names only (no properties). An unmatched query returns the whole \
            catalog. Next step: getMetadata for the entity you need.",
        "inputSchema": {
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "Text matched against service ids, names, descriptions, categories and entity names"},
                "category": {"type": "string", "description": "Restrict to one category (e.g. business-partner, sales, finance)"},
                "limit": {"type": "integer", "minimum": 1, "description": "Maximum number of services"}
            }
        }
    })
}

fn get_metadata_tool() -> Value {
    json!({
        "name": GET_METADATA_TOOL,
        "description": "Level 2: full schema of one entity: properties in declaration order, \
            key properties, capabilities (readable/creatable/updatable/deletable) and the JSON \
            schema of the parameters executeOperation accepts.",
        "inputSchema": {
            "type": "object",
            "properties": {
                "serviceId": {"type": "string", "description": "Service id from discover"},
                "entityName": {"type": "string", "description": "Entity name from discover"}
            },
            "required": ["serviceId", "entityName"]
        }
    })
}

fn execute_tool() -> Value {
    json!({
        "name": EXECUTE_TOOL,
        "description": "Level 3: run a CRUD operation against an entity. Query options are given \
            without the $ prefix. read-single, update and delete need every key property in \
            parameters. create, update and delete require an authenticated user.",
        "inputSchema": {
            "type": "object",
            "properties": {
                "serviceId": {"type": "string"},
                "entityName": {"type": "string"},
                "operation": {
                    "type": "string",
                    "enum": Operation::ALL.iter().map(|o| o.as_str()).collect::<Vec<_>>()
                },
                "filterString": {"type": "string", "description": "OData filter expression, e.g. CustomerName eq 'ACME'"},
                "selectString": {"type": "string", "description": "Comma-separated properties to return"},
                "expandString": {"type": "string", "description": "Navigation properties to expand"},
                "orderbyString": {"type": "string", "description": "Sort order, e.g. CreationDate desc"},
                "topNumber": {"type": "integer", "minimum": 0},
                "skipNumber": {"type": "integer", "minimum": 0},
                "parameters": {"type": "object", "description": "Key values and property values, named as in getMetadata"}
            },
            "required": ["serviceId", "entityName", "operation"]
        }
    })
}

// ============================================================================
// Flat: one tool per entity and operation
// ============================================================================

/// Tool target: service, entity and the operation the tool performs
type EntityTarget = (String, String, Operation);

#[derive(Default)]
pub struct FlatSurface {
    targets: RwLock<HashMap<String, EntityTarget>>,
}

/// Suffix used in per-entity tool names
pub fn operation_suffix(operation: Operation) -> &'static str {
    match operation {
        Operation::Read => "read",
        Operation::ReadSingle => "get",
        Operation::Create => "create",
        Operation::Update => "update",
        Operation::Delete => "delete",
    }
}

/// `{serviceId}__{entityName}__{suffix}` restricted to `[A-Za-z0-9_-]`
pub fn entity_tool_name(service_id: &str, entity_name: &str, operation: Operation) -> String {
    let sanitize = |s: &str| -> String {
        s.chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    };
    format!(
        "{}__{}__{}",
        sanitize(service_id),
        sanitize(entity_name),
        operation_suffix(operation)
    )
}

#[async_trait]
impl ToolSurface for FlatSurface {
    fn mode(&self) -> RegistryMode {
        RegistryMode::Flat
    }

    async fn register(&self, core: &RegistryCore) -> Vec<Value> {
        let entities: Vec<(String, String)> = core
            .catalog
            .services()
            .iter()
            .flat_map(|s| {
                s.entity_names
                    .iter()
                    .map(move |e| (s.service_id.clone(), e.clone()))
            })
            .collect();

        let resolved: Vec<_> = stream::iter(entities)
            .map(|(service_id, entity_name)| async move {
                let result = core.resolver.resolve(&service_id, &entity_name).await;
                (service_id, entity_name, result)
            })
            .buffered(REGISTRATION_CONCURRENCY)
            .collect()
            .await;

        let mut tools = Vec::new();
        let mut targets = HashMap::new();
        for (service_id, entity_name, result) in resolved {
            let schema = match result {
                Ok(schema) => schema,
                Err(e) => {
                    warn!(
                        "[Registry] Skipping tools for {}/{}: {}",
                        service_id, entity_name, e
                    );
                    continue;
                }
            };

            for operation in Operation::ALL {
                if !schema.capabilities.allows(operation.required_capability()) {
                    continue;
                }
                if operation == Operation::ReadSingle && core.settings.disable_read_entity_tool {
                    continue;
                }

                let name = entity_tool_name(&service_id, &entity_name, operation);
                if targets.contains_key(&name) {
                    warn!("[Registry] Duplicate tool name {}, keeping the first", name);
                    continue;
                }
                tools.push(json!({
                    "name": name,
                    "description": format!(
                        "{} {} ({} in {})",
                        operation_suffix(operation),
                        entity_name,
                        schema.entity_set,
                        service_id
                    ),
                    "inputSchema": entity_tool_schema(&schema, operation),
                }));
                targets.insert(name, (service_id.clone(), entity_name.clone(), operation));
            }
        }

        info!(
            "[Registry] Registered {} per-entity tools (read-single {})",
            tools.len(),
            if core.settings.disable_read_entity_tool {
                "suppressed"
            } else {
                "enabled"
            }
        );
        *self.targets.write() = targets;
        tools
    }

    fn route(&self, name: &str, arguments: Value) -> Result<ToolInvocation, ToolCallError> {
        let (service_id, entity_name, operation) = self
            .targets
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| ToolCallError::UnknownTool(name.to_string()))?;
        debug!("[Registry] {} → {}/{} {}", name, service_id, entity_name, operation);

        let args: EntityToolArgs = parse(name, arguments)?;
        Ok(ToolInvocation::Execute(ExecuteParams {
            service_id,
            entity_name,
            operation,
            query: args.query,
            parameters: args.parameters,
        }))
    }
}

/// Per-entity tool schema: query options at the top level, properties under `parameters`
fn entity_tool_schema(schema: &sapmux_core::EntitySchema, operation: Operation) -> Value {
    let operation_schema = translator::operation_input_schema(schema, operation);
    let mut properties = serde_json::Map::new();
    let mut parameters = serde_json::Map::new();
    parameters.insert("type".into(), json!("object"));
    let mut entity_props = serde_json::Map::new();

    if let Some(props) = operation_schema["properties"].as_object() {
        for (name, prop) in props {
            if QUERY_ARGUMENTS.contains(&name.as_str()) {
                properties.insert(name.clone(), prop.clone());
            } else {
                entity_props.insert(name.clone(), prop.clone());
            }
        }
    }

    if !entity_props.is_empty() {
        parameters.insert("properties".into(), Value::Object(entity_props));
        if let Some(required) = operation_schema.get("required") {
            parameters.insert("required".into(), required.clone());
        }
        properties.insert("parameters".into(), Value::Object(parameters));
    }

    let mut root = json!({"type": "object", "properties": properties});
    if operation_schema.get("required").is_some() {
        root["required"] = json!(["parameters"]);
    }
    root
}
