//! Startup Orchestrator - populates the service catalog
//!
//! Discovery is bounded by the configured timeout. Neither a timeout nor a
//! discovery error stops the server: both leave an empty, still searchable
//! catalog.

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use sapmux_core::{SapMuxError, ServiceCatalog, ServiceDiscovery};

/// Outcome of catalog population
#[derive(Debug)]
pub struct CatalogLoadResult {
    pub catalog: ServiceCatalog,
    /// Why the catalog is empty, when discovery did not complete
    pub degraded: Option<String>,
}

pub struct StartupOrchestrator {
    discovery: Option<Arc<dyn ServiceDiscovery>>,
    timeout: Duration,
}

impl StartupOrchestrator {
    pub fn new(discovery: Option<Arc<dyn ServiceDiscovery>>, timeout: Duration) -> Self {
        Self { discovery, timeout }
    }

    pub async fn populate_catalog(&self) -> CatalogLoadResult {
        let Some(discovery) = &self.discovery else {
            warn!("[Startup] No discovery source configured, starting with an empty catalog");
            return CatalogLoadResult {
                catalog: ServiceCatalog::empty(),
                degraded: Some("no discovery source configured".to_string()),
            };
        };

        info!(
            "[Startup] Discovering services (timeout {}s)...",
            self.timeout.as_secs()
        );
        let started = std::time::Instant::now();

        match tokio::time::timeout(self.timeout, discovery.discover()).await {
            Ok(Ok(services)) => {
                let catalog = ServiceCatalog::new(services);
                info!(
                    "[Startup] ✓ {} services discovered in {}ms",
                    catalog.len(),
                    started.elapsed().as_millis()
                );
                CatalogLoadResult {
                    catalog,
                    degraded: None,
                }
            }
            Ok(Err(e)) => {
                warn!("[Startup] Service discovery failed: {:#}", e);
                CatalogLoadResult {
                    catalog: ServiceCatalog::empty(),
                    degraded: Some(format!("discovery failed: {}", e)),
                }
            }
            Err(_) => {
                let error = SapMuxError::DiscoveryTimeout(self.timeout);
                warn!("[Startup] {} ({})", error, error.kind());
                CatalogLoadResult {
                    catalog: ServiceCatalog::empty(),
                    degraded: Some(error.to_string()),
                }
            }
        }
    }
}
