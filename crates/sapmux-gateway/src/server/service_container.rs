//! Service Container - holds all initialized services
//!
//! Built once the catalog is populated; every MCP session shares these.

use std::sync::Arc;

use sapmux_core::{SapMuxConfig, ServiceCatalog};

use super::dependencies::GatewayDependencies;
use crate::dispatcher::{AuthPolicy, OperationDispatcher};
use crate::registry::{RegistryCore, RegistrySettings, ToolRegistry};
use crate::resolver::MetadataResolver;

#[derive(Clone)]
pub struct ServiceContainer {
    pub catalog: Arc<ServiceCatalog>,
    pub resolver: Arc<MetadataResolver>,
    pub dispatcher: Arc<OperationDispatcher>,
    /// Root registry; sessions derive their own view from it
    pub registry: ToolRegistry,
}

impl ServiceContainer {
    pub fn initialize(
        deps: &GatewayDependencies,
        catalog: ServiceCatalog,
        config: &SapMuxConfig,
    ) -> Self {
        let catalog = Arc::new(catalog);
        let resolver = Arc::new(MetadataResolver::new(
            catalog.clone(),
            deps.metadata_source.clone(),
        ));
        let dispatcher = Arc::new(OperationDispatcher::new(
            catalog.clone(),
            deps.executor.clone(),
            AuthPolicy::from_config(config),
        ));

        let registry = ToolRegistry::new(RegistryCore {
            catalog: catalog.clone(),
            resolver: resolver.clone(),
            dispatcher: dispatcher.clone(),
            settings: RegistrySettings::from_config(config),
        });

        Self {
            catalog,
            resolver,
            dispatcher,
            registry,
        }
    }
}
