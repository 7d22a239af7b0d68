//! Dependency Injection Container
//!
//! The three external collaborators the gateway talks through. Production
//! wiring comes from [`GatewayDependencies::from_config`]; tests inject mocks
//! through [`DependenciesBuilder`].

use anyhow::{Context as _, Result};
use std::sync::Arc;
use tracing::info;

use sapmux_core::{
    FileCatalogDiscovery, HttpMetadataSource, MetadataSource, ODataExecutor,
    SapCatalogDiscovery, SapHttpClient, SapMuxConfig, ServiceDiscovery,
};

use crate::dispatcher::HttpODataExecutor;

#[derive(Clone)]
pub struct GatewayDependencies {
    /// `None` when neither a catalog file nor a base URL is configured
    pub discovery: Option<Arc<dyn ServiceDiscovery>>,
    pub metadata_source: Arc<dyn MetadataSource>,
    pub executor: Arc<dyn ODataExecutor>,
}

impl GatewayDependencies {
    /// SAP-backed collaborators sharing one HTTP client
    pub fn from_config(config: &SapMuxConfig) -> Result<Self> {
        let http = SapHttpClient::from_config(config).context("Failed to create SAP HTTP client")?;

        let discovery: Option<Arc<dyn ServiceDiscovery>> =
            match (&config.catalog_file, &config.base_url) {
                (Some(path), _) => {
                    info!("[Startup] Service catalog from file {}", path.display());
                    Some(Arc::new(
                        FileCatalogDiscovery::new(path.clone())
                            .with_filter(config.service_filter.clone()),
                    ))
                }
                (None, Some(base_url)) => {
                    info!("[Startup] Service catalog from {}", base_url);
                    Some(Arc::new(SapCatalogDiscovery::new(
                        base_url.clone(),
                        http.clone(),
                        config.service_filter.clone(),
                    )))
                }
                (None, None) => None,
            };

        Ok(Self {
            discovery,
            metadata_source: Arc::new(HttpMetadataSource::new(http.clone())),
            executor: Arc::new(HttpODataExecutor::new(http)),
        })
    }
}

/// Builder for GatewayDependencies
#[derive(Default)]
pub struct DependenciesBuilder {
    discovery: Option<Arc<dyn ServiceDiscovery>>,
    metadata_source: Option<Arc<dyn MetadataSource>>,
    executor: Option<Arc<dyn ODataExecutor>>,
}

impl DependenciesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_discovery(mut self, discovery: Arc<dyn ServiceDiscovery>) -> Self {
        self.discovery = Some(discovery);
        self
    }

    pub fn with_metadata_source(mut self, source: Arc<dyn MetadataSource>) -> Self {
        self.metadata_source = Some(source);
        self
    }

    pub fn with_executor(mut self, executor: Arc<dyn ODataExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn build(self) -> Result<GatewayDependencies, String> {
        Ok(GatewayDependencies {
            discovery: self.discovery,
            metadata_source: self
                .metadata_source
                .ok_or("metadata_source is required")?,
            executor: self.executor.ok_or("executor is required")?,
        })
    }
}
