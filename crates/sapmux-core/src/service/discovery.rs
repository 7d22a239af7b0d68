//! Discovery collaborators
//!
//! - `SapCatalogDiscovery`: SAP Gateway catalog service + per-service `$metadata`
//! - `FileCatalogDiscovery`: static JSON catalog on disk
//!
//! Both apply the include/exclude service filter. Timeouts are the caller's
//! concern (startup wraps discovery in `tokio::time::timeout`).

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use super::{HttpMetadataSource, SapHttpClient};
use crate::collaborator::ServiceDiscovery;
use crate::domain::{ServiceDescriptor, ServiceFilter};

const CATALOG_PATH: &str = "/sap/opu/odata/IWFND/CATALOGSERVICE;v=2/ServiceCollection";
const METADATA_CONCURRENCY: usize = 8;

/// Keyword → category table; first matching keywords win, a service may land in several
const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    ("business-partner", &["BUSINESS_PARTNER", "BUPA", "CUSTOMER", "SUPPLIER", "VENDOR"]),
    ("sales", &["SALES", "BILLING", "QUOTATION", "CONTRACT"]),
    ("procurement", &["PURCHAS", "PROCUREMENT", "REQUISITION", "SOURCING"]),
    ("product", &["PRODUCT", "MATERIAL", "BOM"]),
    ("finance", &["FINANC", "JOURNAL", "GLACCOUNT", "GL_ACCOUNT", "COSTCENTER", "COST_CENTER", "LEDGER"]),
    ("logistics", &["STOCK", "INVENTORY", "WAREHOUSE", "DELIVERY", "SHIPMENT"]),
    ("manufacturing", &["PRODUCTION", "MANUFACTUR", "PLANNED_ORDER", "MAINTENANCE"]),
    ("hr", &["EMPLOYEE", "WORKFORCE", "PERSONNEL", "TIMESHEET"]),
];

/// Assign categories from keywords in the service id and title
pub fn categorize(service_id: &str, title: &str) -> BTreeSet<String> {
    let haystack = format!("{} {}", service_id, title)
        .to_uppercase()
        .replace(' ', "_");

    let mut categories: BTreeSet<String> = CATEGORY_KEYWORDS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| haystack.contains(k)))
        .map(|(category, _)| category.to_string())
        .collect();
    if categories.is_empty() {
        categories.insert("other".to_string());
    }
    categories
}

// ============================================
// SAP Gateway catalog
// ============================================

#[derive(Debug, Deserialize)]
struct CatalogEnvelope {
    d: CatalogResults,
}

#[derive(Debug, Deserialize)]
struct CatalogResults {
    results: Vec<CatalogEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CatalogEntry {
    technical_service_name: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    service_url: String,
}

/// Reads the SAP Gateway catalog service, then lists each service's entities
pub struct SapCatalogDiscovery {
    base_url: String,
    http: SapHttpClient,
    metadata: HttpMetadataSource,
    filter: ServiceFilter,
}

impl SapCatalogDiscovery {
    pub fn new(base_url: impl Into<String>, http: SapHttpClient, filter: ServiceFilter) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            metadata: HttpMetadataSource::new(http.clone()),
            http,
            filter,
        }
    }

    async fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>> {
        let url = format!("{}{}?$format=json", self.base_url, CATALOG_PATH);
        info!("[Discovery] Fetching SAP service catalog from {}", url);

        let body = self.http.get_text(&url, "application/json").await?;
        let envelope: CatalogEnvelope =
            serde_json::from_str(&body).context("Failed to parse catalog service response")?;
        Ok(envelope.d.results)
    }

    fn absolute_url(&self, service_url: &str) -> String {
        if service_url.starts_with("http://") || service_url.starts_with("https://") {
            service_url.trim_end_matches('/').to_string()
        } else {
            format!(
                "{}/{}",
                self.base_url,
                service_url.trim_start_matches('/').trim_end_matches('/')
            )
        }
    }

    async fn describe(&self, entry: CatalogEntry) -> Option<ServiceDescriptor> {
        let service_url = self.absolute_url(&entry.service_url);
        let document = match self.metadata.fetch_document(&service_url).await {
            Ok(document) => document,
            Err(e) => {
                warn!(
                    "[Discovery] Skipping {}: metadata unavailable: {:#}",
                    entry.technical_service_name, e
                );
                return None;
            }
        };

        let title = entry
            .title
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| entry.technical_service_name.clone());
        let categories = categorize(&entry.technical_service_name, &title);

        Some(
            ServiceDescriptor::new(&entry.technical_service_name, title, service_url)
                .with_description(entry.description.unwrap_or_default())
                .with_version(document.version)
                .with_categories(categories)
                .with_entities(document.entity_names()),
        )
    }
}

#[async_trait]
impl ServiceDiscovery for SapCatalogDiscovery {
    async fn discover(&self) -> Result<Vec<ServiceDescriptor>> {
        let entries = self.fetch_catalog().await?;
        let total = entries.len();

        let selected: Vec<CatalogEntry> = entries
            .into_iter()
            .filter(|e| self.filter.matches(&e.technical_service_name))
            .take(self.filter.max_services.unwrap_or(usize::MAX))
            .collect();
        debug!(
            "[Discovery] {} of {} catalog services pass the filter",
            selected.len(),
            total
        );

        let services: Vec<ServiceDescriptor> = stream::iter(selected)
            .map(|entry| self.describe(entry))
            .buffered(METADATA_CONCURRENCY)
            .filter_map(|s| async move { s })
            .collect()
            .await;

        info!("[Discovery] Discovered {} services", services.len());
        Ok(services)
    }
}

// ============================================
// Static catalog file
// ============================================

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    List(Vec<ServiceDescriptor>),
    Wrapped { services: Vec<ServiceDescriptor> },
}

/// Loads service descriptors from a JSON file
pub struct FileCatalogDiscovery {
    path: PathBuf,
    filter: ServiceFilter,
}

impl FileCatalogDiscovery {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            filter: ServiceFilter::default(),
        }
    }

    pub fn with_filter(mut self, filter: ServiceFilter) -> Self {
        self.filter = filter;
        self
    }
}

#[async_trait]
impl ServiceDiscovery for FileCatalogDiscovery {
    async fn discover(&self) -> Result<Vec<ServiceDescriptor>> {
        info!("[Discovery] Loading catalog file {:?}", self.path);

        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read catalog file {:?}", self.path))?;
        let file: CatalogFile = serde_json::from_str(&content)
            .with_context(|| format!("Invalid catalog file {:?}", self.path))?;

        let services = match file {
            CatalogFile::List(services) | CatalogFile::Wrapped { services } => services,
        };

        Ok(services
            .into_iter()
            .filter(|s| self.filter.matches(&s.service_id))
            .take(self.filter.max_services.unwrap_or(usize::MAX))
            .map(|mut s| {
                if s.categories.is_empty() {
                    s.categories = categorize(&s.service_id, &s.service_name);
                }
                s
            })
            .collect())
    }
}
