//! SapMux MCP Handler
//!
//! Implements the MCP ServerHandler trait on top of the [`ToolRegistry`]:
//! tools come from the registry's surface, resources are the catalog views.

use rmcp::{
    model::*,
    service::{NotificationContext, RequestContext},
    ErrorData as McpError, RoleServer, ServerHandler,
};
use serde_json::Value;
use tracing::{debug, info};

use super::context::{call_auth, extract_credential};
use crate::logging::ToolCallTrace;
use crate::registry::{ToolCallError, ToolRegistry};
use sapmux_core::AuthContext;

const INSTRUCTIONS: &str = "SapMux exposes SAP OData services through progressive discovery. \
    1) discover: find services and entity names by keyword or category. \
    2) getMetadata: load one entity's properties, keys and capabilities. \
    3) executeOperation: read, read-single, create, update or delete using the exact \
    property names from step 2. Query options are passed without the $ prefix. \
    Failures return {\"error\": {\"kind\", \"message\"}}; on MissingKey, MissingRequiredField \
    or UnknownProperty fix the parameters, on AuthenticationRequired ask the user to sign in.";

/// One handler per MCP session, holding that session's registry view
#[derive(Clone)]
pub struct SapMuxHandler {
    pub registry: ToolRegistry,
}

impl SapMuxHandler {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }
}

/// `serviceId/entityName operation` for the trace line, when present
fn call_target(arguments: &Value) -> Option<String> {
    let service_id = arguments.get("serviceId")?.as_str()?;
    let entity_name = arguments.get("entityName")?.as_str()?;
    Some(match arguments.get("operation").and_then(Value::as_str) {
        Some(operation) => format!("{}/{} {}", service_id, entity_name, operation),
        None => format!("{}/{}", service_id, entity_name),
    })
}

impl ServerHandler for SapMuxHandler {
    fn get_info(&self) -> ServerInfo {
        use rmcp::model::{ResourcesCapability, ToolsCapability};

        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities::builder()
                .enable_tools_with(ToolsCapability {
                    list_changed: Some(false),
                })
                .enable_resources_with(ResourcesCapability {
                    subscribe: Some(false),
                    list_changed: Some(false),
                })
                .build(),
            server_info: Implementation {
                name: "sapmux".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(INSTRUCTIONS.to_string()),
        }
    }

    async fn on_initialized(&self, context: NotificationContext<RoleServer>) {
        // Session default; per-call headers still override it
        if let Some(credential) = extract_credential(&context.extensions) {
            self.registry
                .set_auth(AuthContext::with_credential(credential));
            info!("[MCP] Session initialized with caller credential");
        } else {
            info!("[MCP] Session initialized");
        }
    }

    async fn list_tools(
        &self,
        _params: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        let tools: Vec<Tool> = self
            .registry
            .tools()
            .into_iter()
            .filter_map(|json| serde_json::from_value(json).ok())
            .collect();

        debug!(count = tools.len(), "list_tools");
        Ok(ListToolsResult::with_all_items(tools))
    }

    async fn call_tool(
        &self,
        params: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let arguments = Value::Object(params.arguments.unwrap_or_default());
        let trace = ToolCallTrace::new(&params.name).with_target(call_target(&arguments));
        trace.log_entry();

        let result = self
            .registry
            .call_tool(&params.name, arguments, call_auth(&context.extensions))
            .await;

        match result {
            Ok(value) => {
                trace.log_exit(None);
                let text = serde_json::to_string_pretty(&value).map_err(|e| {
                    McpError::internal_error(format!("Failed to serialize result: {}", e), None)
                })?;
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(ToolCallError::Failed(e)) => {
                trace.log_exit(Some(e.kind().as_str()));
                Ok(CallToolResult::error(vec![Content::text(
                    e.to_json().to_string(),
                )]))
            }
            Err(e) => {
                trace.log_exit(Some("invalid request"));
                Err(McpError::invalid_params(e.to_string(), None))
            }
        }
    }

    async fn list_resources(
        &self,
        _params: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        let resources: Vec<Resource> = self
            .registry
            .resources()
            .into_iter()
            .filter_map(|json| serde_json::from_value(json).ok())
            .collect();

        debug!(count = resources.len(), "list_resources");
        Ok(ListResourcesResult::with_all_items(resources))
    }

    async fn read_resource(
        &self,
        params: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        let body = self.registry.read_resource(&params.uri).ok_or_else(|| {
            McpError::invalid_params(format!("Resource '{}' not found", params.uri), None)
        })?;

        let text = serde_json::to_string_pretty(&body).map_err(|e| {
            McpError::internal_error(format!("Failed to serialize resource: {}", e), None)
        })?;
        let contents: Vec<ResourceContents> = serde_json::from_value(serde_json::json!([{
            "uri": params.uri,
            "mimeType": "application/json",
            "text": text,
        }]))
        .map_err(|e| McpError::internal_error(format!("Invalid resource contents: {}", e), None))?;

        Ok(ReadResourceResult { contents })
    }
}
