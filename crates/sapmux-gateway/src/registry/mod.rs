//! Tool Registry
//!
//! Exposes the three progressive-discovery operations (`discover`,
//! `getMetadata`, `executeOperation`) over the catalog, resolver and
//! dispatcher, plus the read-only catalog resources.
//!
//! The registry core is shared by every MCP session. Each session gets its
//! own credential slot from [`ToolRegistry::for_session`]; a credential passed
//! with an individual call always takes precedence over the session's.

mod params;
mod surface;

pub use params::{DiscoverParams, EntityToolArgs, ExecuteParams, GetMetadataParams, QueryArgs};
pub use surface::{
    entity_tool_name, operation_suffix, surface_for, FlatSurface, HierarchicalSurface,
    ToolInvocation, ToolSurface, DISCOVER_TOOL, EXECUTE_TOOL, GET_METADATA_TOOL,
};

use parking_lot::RwLock;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

use sapmux_core::{
    AuthContext, CatalogQuery, OperationRequest, RegistryMode, SapMuxConfig, SapMuxError,
    SapMuxResult, ServiceCatalog,
};

use crate::dispatcher::OperationDispatcher;
use crate::resolver::MetadataResolver;

pub const CATALOG_RESOURCE_URI: &str = "sap://services";
const SERVICE_RESOURCE_PREFIX: &str = "sap://services/";

/// Registration-time switches
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistrySettings {
    pub mode: RegistryMode,
    /// Suppress every read-single shortcut tool
    pub disable_read_entity_tool: bool,
}

impl RegistrySettings {
    pub fn from_config(config: &SapMuxConfig) -> Self {
        Self {
            mode: config.registry_mode,
            disable_read_entity_tool: config.disable_read_entity_tool,
        }
    }
}

/// Components shared by all sessions
pub struct RegistryCore {
    pub catalog: Arc<ServiceCatalog>,
    pub resolver: Arc<MetadataResolver>,
    pub dispatcher: Arc<OperationDispatcher>,
    pub settings: RegistrySettings,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ToolCallError {
    #[error("invalid arguments for '{tool}': {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error(transparent)]
    Failed(#[from] SapMuxError),
}

#[derive(Clone)]
pub struct ToolRegistry {
    core: Arc<RegistryCore>,
    surface: Arc<dyn ToolSurface>,
    tools: Arc<RwLock<Vec<Value>>>,
    session_auth: Arc<RwLock<AuthContext>>,
}

impl ToolRegistry {
    pub fn new(core: RegistryCore) -> Self {
        let surface: Arc<dyn ToolSurface> = Arc::from(surface_for(core.settings.mode));
        Self {
            core: Arc::new(core),
            surface,
            tools: Arc::new(RwLock::new(Vec::new())),
            session_auth: Arc::new(RwLock::new(AuthContext::anonymous())),
        }
    }

    /// Same tools and caches, fresh anonymous credential slot
    pub fn for_session(&self) -> Self {
        Self {
            core: self.core.clone(),
            surface: self.surface.clone(),
            tools: self.tools.clone(),
            session_auth: Arc::new(RwLock::new(AuthContext::anonymous())),
        }
    }

    pub fn mode(&self) -> RegistryMode {
        self.surface.mode()
    }

    pub fn catalog(&self) -> &Arc<ServiceCatalog> {
        &self.core.catalog
    }

    /// Bind the tool set of the configured surface
    ///
    /// Per-entity tools resolve every entity's schema here, so the call may
    /// take as long as the slowest metadata fetch.
    pub async fn register_all(&self) -> usize {
        let tools = self.surface.register(&self.core).await;
        let count = tools.len();
        *self.tools.write() = tools;
        info!(
            "[Registry] {} tools registered ({} mode, {} services)",
            count,
            self.mode().as_str(),
            self.core.catalog.len()
        );
        count
    }

    pub fn tools(&self) -> Vec<Value> {
        self.tools.read().clone()
    }

    /// Replace this session's credential; `None` or a blank token clears it
    pub fn set_credential(&self, token: Option<String>) {
        let auth = AuthContext::from_token(token);
        debug!(
            "[Registry] Session credential {}",
            if auth.is_authenticated() { "set" } else { "cleared" }
        );
        *self.session_auth.write() = auth;
    }

    pub fn set_auth(&self, auth: AuthContext) {
        *self.session_auth.write() = auth;
    }

    pub fn session_auth(&self) -> AuthContext {
        self.session_auth.read().clone()
    }

    /// Route a tool call by name
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
        call_auth: AuthContext,
    ) -> Result<Value, ToolCallError> {
        match self.surface.route(name, arguments)? {
            ToolInvocation::Discover(params) => Ok(self.discover(params)),
            ToolInvocation::GetMetadata(params) => Ok(self.get_metadata(params).await?),
            ToolInvocation::Execute(params) => Ok(self.execute_operation(params, call_auth).await?),
        }
    }

    /// Level 1: catalog search, never empty while the catalog has services
    pub fn discover(&self, params: DiscoverParams) -> Value {
        let mut query = CatalogQuery {
            query: params.query,
            category: params.category,
            limit: None,
        };
        if let Some(limit) = params.limit {
            query = query.with_limit(limit);
        }
        let search = self.core.catalog.search(&query);
        params::discover_response(&search, self.core.catalog.len())
    }

    /// Level 2: full schema of one entity
    pub async fn get_metadata(&self, params: GetMetadataParams) -> SapMuxResult<Value> {
        let schema = self
            .core
            .resolver
            .resolve(&params.service_id, &params.entity_name)
            .await?;
        let service = self
            .core
            .catalog
            .get(&params.service_id)
            .ok_or_else(|| SapMuxError::entity_not_found(&params.service_id, &params.entity_name))?;
        Ok(params::metadata_response(service, &schema))
    }

    /// Level 3: validate and run one operation
    pub async fn execute_operation(
        &self,
        params: ExecuteParams,
        call_auth: AuthContext,
    ) -> SapMuxResult<Value> {
        let schema = self
            .core
            .resolver
            .resolve(&params.service_id, &params.entity_name)
            .await?;

        let auth = call_auth.or(&self.session_auth.read());
        let request = OperationRequest::new(params.service_id, params.entity_name, params.operation)
            .with_query(params.query.into_options())
            .with_parameters(params.parameters)
            .with_auth(auth);

        self.core.dispatcher.execute(&request, &schema).await
    }

    /// Resource descriptors (`uri`, `name`, `description`, `mimeType`)
    pub fn resources(&self) -> Vec<Value> {
        let mut resources = vec![json!({
            "uri": CATALOG_RESOURCE_URI,
            "name": "SAP service catalog",
            "description": "All discovered OData services with their entity names",
            "mimeType": "application/json",
        })];
        resources.extend(self.core.catalog.services().iter().map(|s| {
            json!({
                "uri": format!("{}{}", SERVICE_RESOURCE_PREFIX, s.service_id),
                "name": s.service_name,
                "description": format!("{} ({} entities)", s.service_id, s.entity_names.len()),
                "mimeType": "application/json",
            })
        }));
        resources
    }

    /// JSON body of a catalog resource, `None` for unknown URIs
    pub fn read_resource(&self, uri: &str) -> Option<Value> {
        if uri == CATALOG_RESOURCE_URI {
            let services: Vec<Value> = self
                .core
                .catalog
                .services()
                .iter()
                .map(|s| {
                    json!({
                        "serviceId": s.service_id,
                        "serviceName": s.service_name,
                        "odataVersion": s.odata_version.as_str(),
                        "categories": s.categories,
                        "entityCount": s.entity_names.len(),
                    })
                })
                .collect();
            return Some(json!({
                "services": services,
                "categories": self.core.catalog.categories(),
            }));
        }

        let service_id = uri.strip_prefix(SERVICE_RESOURCE_PREFIX)?;
        let service = self.core.catalog.get(service_id)?;
        serde_json::to_value(service).ok()
    }
}
