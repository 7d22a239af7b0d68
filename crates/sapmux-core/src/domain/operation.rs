//! OperationRequest - one generic CRUD call against an entity

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{AuthContext, Capability};

/// CRUD operation kinds accepted by `executeOperation`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    /// Collection query
    Read,
    /// Single entity by key
    #[serde(alias = "read_single", alias = "readSingle")]
    ReadSingle,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Self::Read,
        Self::ReadSingle,
        Self::Create,
        Self::Update,
        Self::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::ReadSingle => "read-single",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    pub fn required_capability(&self) -> Capability {
        match self {
            Self::Read | Self::ReadSingle => Capability::Readable,
            Self::Create => Capability::Creatable,
            Self::Update => Capability::Updatable,
            Self::Delete => Capability::Deletable,
        }
    }

    /// Addresses one entity, so the full key must be supplied
    pub fn requires_key(&self) -> bool {
        matches!(self, Self::ReadSingle | Self::Update | Self::Delete)
    }

    /// Changes remote state and therefore needs the caller's own credential
    pub fn is_mutating(&self) -> bool {
        matches!(self, Self::Create | Self::Update | Self::Delete)
    }
}

impl std::str::FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "read" => Ok(Self::Read),
            "read-single" | "read_single" | "readsingle" => Ok(Self::ReadSingle),
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            _ => Err(format!("Unknown operation '{}'", s)),
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OData system query options, supplied without their `$` prefix
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryOptions {
    pub filter: Option<String>,
    pub select: Option<String>,
    pub expand: Option<String>,
    pub orderby: Option<String>,
    pub top: Option<u32>,
    pub skip: Option<u32>,
}

impl QueryOptions {
    pub fn is_empty(&self) -> bool {
        self.filter.is_none()
            && self.select.is_none()
            && self.expand.is_none()
            && self.orderby.is_none()
            && self.top.is_none()
            && self.skip.is_none()
    }
}

/// One `executeOperation` call, constructed per invocation and never persisted
#[derive(Debug, Clone)]
pub struct OperationRequest {
    pub service_id: String,
    pub entity_name: String,
    pub operation: Operation,
    pub query: QueryOptions,
    pub parameters: Map<String, Value>,
    pub auth: AuthContext,
}

impl OperationRequest {
    pub fn new(
        service_id: impl Into<String>,
        entity_name: impl Into<String>,
        operation: Operation,
    ) -> Self {
        Self {
            service_id: service_id.into(),
            entity_name: entity_name.into(),
            operation,
            query: QueryOptions::default(),
            parameters: Map::new(),
            auth: AuthContext::anonymous(),
        }
    }

    pub fn with_query(mut self, query: QueryOptions) -> Self {
        self.query = query;
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn with_parameters(mut self, parameters: Map<String, Value>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_auth(mut self, auth: AuthContext) -> Self {
        self.auth = auth;
        self
    }
}
