//! SapMux Gateway
//!
//! MCP server that exposes SAP OData services through progressive discovery:
//! - Metadata Resolver with per-entity single-flight caching
//! - Schema Translator (JSON schemas and request validation)
//! - Operation Dispatcher with an HTTP execution collaborator
//! - Tool Registry with hierarchical and per-entity tool surfaces
//! - rmcp handler served over Streamable HTTP or stdio

pub mod dispatcher;
pub mod logging;
pub mod mcp;
pub mod registry;
pub mod resolver;
pub mod server;
pub mod translator;

pub use dispatcher::{AuthPolicy, HttpODataExecutor, OperationDispatcher};
pub use mcp::SapMuxHandler;
pub use registry::{
    DiscoverParams, ExecuteParams, GetMetadataParams, RegistryCore, RegistrySettings,
    ToolCallError, ToolRegistry,
};
pub use resolver::{MetadataResolver, SchemaKey};
pub use server::{
    DependenciesBuilder, GatewayConfig, GatewayDependencies, GatewayServer, ServiceContainer,
    StartupOrchestrator,
};
