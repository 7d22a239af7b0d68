//! Service Catalog Cache
//!
//! Minimal-footprint list of every discovered service and its entities.
//! Populated once at startup and only read afterwards, so it is shared as a
//! plain `Arc<ServiceCatalog>` without locking.
//!
//! A search that matches nothing answers with the whole catalog instead of an
//! empty list, so the caller always has something to continue from.

use std::collections::{BTreeSet, HashSet};
use tracing::{debug, warn};

use crate::domain::{EntitySummary, ServiceDescriptor};

/// Parameters of a catalog search
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogQuery {
    pub query: Option<String>,
    pub category: Option<String>,
    pub limit: Option<usize>,
}

impl CatalogQuery {
    pub fn text(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Default::default()
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// One service in a search result, with its complete entity list
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogMatch {
    pub service: ServiceDescriptor,
    pub entities: Vec<EntitySummary>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogSearch {
    pub matches: Vec<CatalogMatch>,
    /// Nothing matched, so `matches` is the full catalog
    pub fallback: bool,
}

#[derive(Debug, Default)]
pub struct ServiceCatalog {
    services: Vec<ServiceDescriptor>,
}

impl ServiceCatalog {
    /// Build from discovered services; later duplicates of a service id are dropped
    pub fn new(services: Vec<ServiceDescriptor>) -> Self {
        let mut seen = HashSet::new();
        let mut unique = Vec::with_capacity(services.len());
        for service in services {
            if seen.insert(service.service_id.clone()) {
                unique.push(service);
            } else {
                warn!(
                    "[Catalog] Duplicate service id '{}' ignored",
                    service.service_id
                );
            }
        }
        Self { services: unique }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn services(&self) -> &[ServiceDescriptor] {
        &self.services
    }

    pub fn get(&self, service_id: &str) -> Option<&ServiceDescriptor> {
        self.services.iter().find(|s| s.service_id == service_id)
    }

    pub fn contains_entity(&self, service_id: &str, entity_name: &str) -> bool {
        self.get(service_id)
            .is_some_and(|s| s.has_entity(entity_name))
    }

    /// Every category used by at least one service
    pub fn categories(&self) -> BTreeSet<String> {
        self.services
            .iter()
            .flat_map(|s| s.categories.iter().cloned())
            .collect()
    }

    /// Case-insensitive substring search over service id, name, description,
    /// categories and entity names
    pub fn search(&self, query: &CatalogQuery) -> CatalogSearch {
        let needle = query
            .query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase);
        let category = query
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_lowercase);

        let hits: Vec<&ServiceDescriptor> = self
            .services
            .iter()
            .filter(|s| {
                category
                    .as_deref()
                    .map_or(true, |c| s.categories.iter().any(|sc| sc.to_lowercase() == c))
            })
            .filter(|s| needle.as_deref().map_or(true, |n| service_matches(s, n)))
            .collect();

        let fallback = hits.is_empty() && !self.services.is_empty();
        let selected: Vec<&ServiceDescriptor> = if fallback {
            debug!(
                "[Catalog] No match for query={:?} category={:?}, returning full catalog",
                query.query, query.category
            );
            self.services.iter().collect()
        } else {
            hits
        };

        let matches = selected
            .into_iter()
            .take(query.limit.unwrap_or(usize::MAX))
            .map(|s| CatalogMatch {
                service: s.clone(),
                entities: s.entity_summaries(),
            })
            .collect();

        CatalogSearch { matches, fallback }
    }
}

fn service_matches(service: &ServiceDescriptor, needle: &str) -> bool {
    let contains = |text: &str| text.to_lowercase().contains(needle);
    contains(&service.service_id)
        || contains(&service.service_name)
        || contains(&service.description)
        || service.categories.iter().any(|c| contains(c))
        || service.entity_names.iter().any(|e| contains(e))
}
