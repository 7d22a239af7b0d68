//! `$metadata` fetcher
//!
//! One document per service URL: entities of the same service share a single
//! fetch and parse. Failed fetches are dropped so the next call retries.
//! Per-entity schema caching belongs to the resolver.

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::Arc;
use tracing::{debug, info};

use super::SapHttpClient;
use crate::collaborator::MetadataSource;
use crate::domain::{EntitySchema, ServiceDescriptor};
use crate::edm::MetadataDocument;

type DocumentFuture = Shared<BoxFuture<'static, Result<Arc<MetadataDocument>, String>>>;

pub struct HttpMetadataSource {
    http: SapHttpClient,
    documents: Arc<DashMap<String, DocumentFuture>>,
}

impl HttpMetadataSource {
    pub fn new(http: SapHttpClient) -> Self {
        Self {
            http,
            documents: Arc::new(DashMap::new()),
        }
    }

    /// Fetch and parse `{service_url}/$metadata`, bypassing the memo
    pub async fn fetch_document(&self, service_url: &str) -> Result<MetadataDocument> {
        fetch_document(&self.http, service_url).await
    }

    /// Memoized document for `service_url`
    pub async fn document(&self, service_url: &str) -> Result<Arc<MetadataDocument>> {
        let key = service_url.trim_end_matches('/').to_string();
        let fetch = self
            .documents
            .entry(key.clone())
            .or_insert_with(|| self.start_fetch(key.clone()))
            .value()
            .clone();

        fetch.await.map_err(anyhow::Error::msg)
    }

    fn start_fetch(&self, key: String) -> DocumentFuture {
        let http = self.http.clone();
        let documents = self.documents.clone();

        async move {
            let result = fetch_document(&http, &key)
                .await
                .map(Arc::new)
                .map_err(|e| format!("{:#}", e));
            if result.is_err() {
                debug!("[Metadata] Dropping failed document for {}", key);
                documents.remove(&key);
            }
            result
        }
        .boxed()
        .shared()
    }
}

async fn fetch_document(http: &SapHttpClient, service_url: &str) -> Result<MetadataDocument> {
    let url = format!("{}/$metadata", service_url.trim_end_matches('/'));
    info!("[Metadata] Fetching {}", url);

    let xml = http.get_text(&url, "application/xml").await?;
    MetadataDocument::parse(&xml).with_context(|| format!("Invalid metadata at {}", url))
}

#[async_trait]
impl MetadataSource for HttpMetadataSource {
    async fn fetch_schema(
        &self,
        service: &ServiceDescriptor,
        entity_name: &str,
    ) -> Result<EntitySchema> {
        let document = self.document(&service.service_url).await?;
        document.entity_schema(&service.service_id, entity_name)
    }
}
