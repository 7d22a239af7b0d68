//! Operation Dispatcher
//!
//! Turns a validated [`OperationRequest`] into one OData exchange (two for an
//! update answered with `204 No Content`) and normalizes the result.
//!
//! Authentication tiers:
//! - `create`/`update`/`delete` run only with the caller's credential
//! - `read`/`read-single` fall back to the technical credential when the
//!   policy allows it
//!
//! Remote failures are returned as classified by the executor and never retried.

mod http;
mod payload;
mod query;

pub use http::{classify_failure, HttpODataExecutor};
pub use payload::{normalize_collection, normalize_entity, strip_annotations};
pub use query::{build_query, key_predicate};

use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

use sapmux_core::{
    Credential, EntitySchema, ODataExecutor, ODataMethod, ODataRequest, ODataResponse,
    ODataVersion, Operation, OperationRequest, SapMuxConfig, SapMuxError, SapMuxResult,
    ServiceCatalog, ServiceDescriptor,
};

use crate::translator;

/// Which credential a call may run with
#[derive(Debug, Clone, Default)]
pub struct AuthPolicy {
    pub technical_credential: Option<Credential>,
    pub allow_technical_read: bool,
}

impl AuthPolicy {
    pub fn from_config(config: &SapMuxConfig) -> Self {
        Self {
            technical_credential: config.technical_credential.clone(),
            allow_technical_read: config.allow_technical_read,
        }
    }

    /// Credential for `request`, or `AuthenticationRequired`
    pub fn credential_for<'a>(&'a self, request: &'a OperationRequest) -> SapMuxResult<&'a Credential> {
        if let Some(credential) = request.auth.credential() {
            return Ok(credential);
        }
        if !request.operation.is_mutating() && self.allow_technical_read {
            if let Some(technical) = &self.technical_credential {
                return Ok(technical);
            }
        }
        Err(SapMuxError::authentication_required(
            request.operation.to_string(),
        ))
    }
}

pub struct OperationDispatcher {
    catalog: Arc<ServiceCatalog>,
    executor: Arc<dyn ODataExecutor>,
    policy: AuthPolicy,
}

impl OperationDispatcher {
    pub fn new(
        catalog: Arc<ServiceCatalog>,
        executor: Arc<dyn ODataExecutor>,
        policy: AuthPolicy,
    ) -> Self {
        Self {
            catalog,
            executor,
            policy,
        }
    }

    /// Validate, authenticate, and run one operation against the remote service
    pub async fn execute(
        &self,
        request: &OperationRequest,
        schema: &EntitySchema,
    ) -> SapMuxResult<Value> {
        translator::validate(request, schema)?;
        let credential = self.policy.credential_for(request)?;

        let service = self.catalog.get(&request.service_id).ok_or_else(|| {
            SapMuxError::entity_not_found(&request.service_id, &request.entity_name)
        })?;

        info!(
            "[Dispatcher] {} {}/{} ({})",
            request.operation,
            service.service_id,
            schema.entity_set,
            service.odata_version
        );

        match request.operation {
            Operation::Read => self.read(service, schema, request, credential).await,
            Operation::ReadSingle => self.read_single(service, schema, request, credential).await,
            Operation::Create => self.create(service, schema, request, credential).await,
            Operation::Update => self.update(service, schema, request, credential).await,
            Operation::Delete => self.delete(service, schema, request, credential).await,
        }
    }

    async fn read(
        &self,
        service: &ServiceDescriptor,
        schema: &EntitySchema,
        request: &OperationRequest,
        credential: &Credential,
    ) -> SapMuxResult<Value> {
        let odata = ODataRequest::new(ODataMethod::Get, service, schema.entity_set.clone())
            .with_query(build_query(&request.query, Operation::Read));
        let response = self.executor.execute(odata, Some(credential)).await?;
        normalize_collection(require_body(response)?)
    }

    async fn read_single(
        &self,
        service: &ServiceDescriptor,
        schema: &EntitySchema,
        request: &OperationRequest,
        credential: &Credential,
    ) -> SapMuxResult<Value> {
        let odata = ODataRequest::new(ODataMethod::Get, service, entity_path(service, schema, request))
            .with_query(build_query(&request.query, Operation::ReadSingle));
        let response = self.executor.execute(odata, Some(credential)).await?;
        normalize_entity(require_body(response)?)
    }

    async fn create(
        &self,
        service: &ServiceDescriptor,
        schema: &EntitySchema,
        request: &OperationRequest,
        credential: &Credential,
    ) -> SapMuxResult<Value> {
        let body = payload::build_payload(schema, &request.parameters, service.odata_version, true);
        let odata = ODataRequest::new(ODataMethod::Post, service, schema.entity_set.clone())
            .with_body(body);
        let response = self.executor.execute(odata, Some(credential)).await?;
        match response.body {
            Some(body) => normalize_entity(body),
            // Some services answer 204 with a Location header only
            None => Ok(Value::Object(query::key_values(schema, &request.parameters))),
        }
    }

    async fn update(
        &self,
        service: &ServiceDescriptor,
        schema: &EntitySchema,
        request: &OperationRequest,
        credential: &Credential,
    ) -> SapMuxResult<Value> {
        let method = match service.odata_version {
            ODataVersion::V2 => ODataMethod::Merge,
            ODataVersion::V4 => ODataMethod::Patch,
        };
        let path = entity_path(service, schema, request);
        let body = payload::build_payload(schema, &request.parameters, service.odata_version, false);
        let odata = ODataRequest::new(method, service, path.clone()).with_body(body);
        let response = self.executor.execute(odata, Some(credential)).await?;

        if let Some(body) = response.body {
            return normalize_entity(body);
        }

        debug!("[Dispatcher] Update returned no body, re-reading {}", path);
        let reread = ODataRequest::new(ODataMethod::Get, service, path);
        let response = self.executor.execute(reread, Some(credential)).await?;
        normalize_entity(require_body(response)?)
    }

    async fn delete(
        &self,
        service: &ServiceDescriptor,
        schema: &EntitySchema,
        request: &OperationRequest,
        credential: &Credential,
    ) -> SapMuxResult<Value> {
        let odata = ODataRequest::new(ODataMethod::Delete, service, entity_path(service, schema, request));
        self.executor.execute(odata, Some(credential)).await?;
        Ok(json!({
            "deleted": true,
            "entity": schema.entity_name,
            "key": query::key_values(schema, &request.parameters),
        }))
    }
}

fn entity_path(service: &ServiceDescriptor, schema: &EntitySchema, request: &OperationRequest) -> String {
    format!(
        "{}{}",
        schema.entity_set,
        key_predicate(schema, &request.parameters, service.odata_version)
    )
}

fn require_body(response: ODataResponse) -> SapMuxResult<Value> {
    response
        .body
        .ok_or_else(|| SapMuxError::RemoteUnexpectedResponse {
            status: Some(response.status),
            message: "expected a response body".to_string(),
        })
}
