//! External collaborators
//!
//! The catalog, resolver and dispatcher never talk to SAP directly. They go
//! through these traits so that tests (and alternative backends such as a
//! static catalog file) can stand in for the real system.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{Credential, EntitySchema, ODataVersion, SapMuxResult, ServiceDescriptor};

/// Enumerates the OData services available on the remote system
#[async_trait]
pub trait ServiceDiscovery: Send + Sync {
    async fn discover(&self) -> anyhow::Result<Vec<ServiceDescriptor>>;
}

/// Produces the schema of one entity from the service's metadata
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn fetch_schema(
        &self,
        service: &ServiceDescriptor,
        entity_name: &str,
    ) -> anyhow::Result<EntitySchema>;
}

/// Performs one HTTP exchange against an OData service
///
/// Implementations classify failures into the remote error kinds
/// (`RemoteFault`, `RemoteUnavailable`, `RemoteUnexpectedResponse`).
#[async_trait]
pub trait ODataExecutor: Send + Sync {
    async fn execute(
        &self,
        request: ODataRequest,
        credential: Option<&Credential>,
    ) -> SapMuxResult<ODataResponse>;
}

/// HTTP verbs used against OData services
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ODataMethod {
    Get,
    Post,
    Patch,
    /// V2 partial update (sent as POST with `X-HTTP-Method: MERGE`)
    Merge,
    Delete,
}

impl ODataMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Merge => "MERGE",
            Self::Delete => "DELETE",
        }
    }

    pub fn is_modifying(&self) -> bool {
        !matches!(self, Self::Get)
    }
}

impl std::fmt::Display for ODataMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully built OData request, relative to a service root
#[derive(Debug, Clone, PartialEq)]
pub struct ODataRequest {
    pub method: ODataMethod,
    pub service_url: String,
    /// Resource path below the service root (`A_Customer('1')`)
    pub path: String,
    /// Query pairs, names already `$`-prefixed where they are system options
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub version: ODataVersion,
}

impl ODataRequest {
    pub fn new(
        method: ODataMethod,
        service: &ServiceDescriptor,
        path: impl Into<String>,
    ) -> Self {
        Self {
            method,
            service_url: service.service_url.clone(),
            path: path.into(),
            query: Vec::new(),
            body: None,
            version: service.odata_version,
        }
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Service root joined with the resource path, without the query
    pub fn resource_url(&self) -> String {
        format!(
            "{}/{}",
            self.service_url.trim_end_matches('/'),
            self.path.trim_start_matches('/')
        )
    }

    /// Query string with values percent-encoded
    pub fn query_string(&self) -> String {
        self.query
            .iter()
            .map(|(name, value)| format!("{}={}", name, urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Raw response of an OData exchange
#[derive(Debug, Clone, PartialEq)]
pub struct ODataResponse {
    pub status: u16,
    /// Parsed JSON body; `None` for `204 No Content`
    pub body: Option<Value>,
}

impl ODataResponse {
    pub fn new(status: u16, body: Option<Value>) -> Self {
        Self { status, body }
    }

    pub fn no_content() -> Self {
        Self {
            status: 204,
            body: None,
        }
    }
}
