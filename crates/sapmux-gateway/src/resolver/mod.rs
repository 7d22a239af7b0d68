//! Metadata Resolver
//!
//! Resolves `(serviceId, entityName)` to a normalized [`EntitySchema`],
//! fetching through the [`MetadataSource`] on first use and caching the result
//! for the lifetime of the process.
//!
//! Concurrent callers for the same key share one upstream fetch:
//! - `schemas` holds completed schemas (first success wins, never replaced)
//! - `in_flight` holds the shared future of a running fetch
//!
//! A finished fetch publishes into `schemas` *before* it leaves `in_flight`,
//! so a caller never finds both maps empty while a result exists. Failures are
//! handed to every waiting caller but never cached.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::Arc;
use tracing::{debug, info, warn};

use sapmux_core::{
    EntitySchema, MetadataSource, SapMuxError, SapMuxResult, ServiceCatalog, ServiceDescriptor,
};

type SchemaFuture = Shared<BoxFuture<'static, SapMuxResult<Arc<EntitySchema>>>>;

/// Cache key for one entity of one service
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaKey {
    pub service_id: String,
    pub entity_name: String,
}

impl SchemaKey {
    pub fn new(service_id: impl Into<String>, entity_name: impl Into<String>) -> Self {
        Self {
            service_id: service_id.into(),
            entity_name: entity_name.into(),
        }
    }
}

impl std::fmt::Display for SchemaKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.service_id, self.entity_name)
    }
}

pub struct MetadataResolver {
    catalog: Arc<ServiceCatalog>,
    source: Arc<dyn MetadataSource>,
    schemas: Arc<DashMap<SchemaKey, Arc<EntitySchema>>>,
    in_flight: Arc<DashMap<SchemaKey, SchemaFuture>>,
}

impl MetadataResolver {
    pub fn new(catalog: Arc<ServiceCatalog>, source: Arc<dyn MetadataSource>) -> Self {
        Self {
            catalog,
            source,
            schemas: Arc::new(DashMap::new()),
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// Resolve the schema, fetching it if this is the first request for the key
    pub async fn resolve(
        &self,
        service_id: &str,
        entity_name: &str,
    ) -> SapMuxResult<Arc<EntitySchema>> {
        let service = self
            .catalog
            .get(service_id)
            .filter(|s| s.has_entity(entity_name))
            .ok_or_else(|| SapMuxError::entity_not_found(service_id, entity_name))?;

        let key = SchemaKey::new(service_id, entity_name);
        if let Some(schema) = self.schemas.get(&key) {
            debug!("[Resolver] Cache hit for {}", key);
            return Ok(schema.value().clone());
        }

        let fetch = match self.in_flight.entry(key.clone()) {
            Entry::Occupied(entry) => {
                debug!("[Resolver] Joining in-flight fetch for {}", key);
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                // Re-check under the in-flight shard lock: a fetch may have
                // completed between the cache miss above and this point.
                if let Some(schema) = self.schemas.get(&key) {
                    return Ok(schema.value().clone());
                }
                let fetch = self.start_fetch(key.clone(), service.clone());
                entry.insert(fetch.clone());
                fetch
            }
        };

        fetch.await
    }

    fn start_fetch(&self, key: SchemaKey, service: ServiceDescriptor) -> SchemaFuture {
        let source = self.source.clone();
        let schemas = self.schemas.clone();
        let in_flight = self.in_flight.clone();

        async move {
            info!("[Resolver] Fetching metadata for {}", key);
            let result = source
                .fetch_schema(&service, &key.entity_name)
                .await
                .map_err(|e| format!("{:#}", e))
                .and_then(|schema| {
                    if schema.key_properties.is_empty() || !schema.keys_are_consistent() {
                        Err("schema has no usable key properties".to_string())
                    } else {
                        Ok(Arc::new(schema))
                    }
                })
                .map_err(|message| SapMuxError::MetadataFetchError {
                    service_id: key.service_id.clone(),
                    entity_name: key.entity_name.clone(),
                    message,
                });

            match &result {
                Ok(schema) => {
                    schemas.entry(key.clone()).or_insert_with(|| schema.clone());
                }
                Err(e) => warn!("[Resolver] {}", e),
            }
            in_flight.remove(&key);

            // Whatever is cached now is the canonical value for this key
            match result {
                Ok(_) => schemas
                    .get(&key)
                    .map(|s| s.value().clone())
                    .ok_or_else(|| SapMuxError::MetadataFetchError {
                        service_id: key.service_id.clone(),
                        entity_name: key.entity_name.clone(),
                        message: "schema disappeared from cache".to_string(),
                    }),
                Err(e) => Err(e),
            }
        }
        .boxed()
        .shared()
    }

    /// Already-resolved schema, without triggering a fetch
    pub fn cached(&self, service_id: &str, entity_name: &str) -> Option<Arc<EntitySchema>> {
        self.schemas
            .get(&SchemaKey::new(service_id, entity_name))
            .map(|s| s.value().clone())
    }

    pub fn cached_count(&self) -> usize {
        self.schemas.len()
    }

    pub fn catalog(&self) -> &Arc<ServiceCatalog> {
        &self.catalog
    }
}
