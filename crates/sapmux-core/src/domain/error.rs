//! Error kinds surfaced to tool callers
//!
//! Every failure carries a kind the calling model can branch on: refetch
//! metadata, fix parameters, or report that authentication is required.

use serde_json::{json, Value};
use std::time::Duration;

/// Result alias for operations that fail with a caller-visible kind
pub type SapMuxResult<T> = Result<T, SapMuxError>;

/// Stable, machine-readable error kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    DiscoveryTimeout,
    EntityNotFound,
    MetadataFetchError,
    CapabilityDenied,
    MissingRequiredField,
    MissingKey,
    UnknownProperty,
    AuthenticationRequired,
    RemoteFault,
    RemoteUnavailable,
    RemoteUnexpectedResponse,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DiscoveryTimeout => "DiscoveryTimeout",
            Self::EntityNotFound => "EntityNotFound",
            Self::MetadataFetchError => "MetadataFetchError",
            Self::CapabilityDenied => "CapabilityDenied",
            Self::MissingRequiredField => "MissingRequiredField",
            Self::MissingKey => "MissingKey",
            Self::UnknownProperty => "UnknownProperty",
            Self::AuthenticationRequired => "AuthenticationRequired",
            Self::RemoteFault => "RemoteFault",
            Self::RemoteUnavailable => "RemoteUnavailable",
            Self::RemoteUnexpectedResponse => "RemoteUnexpectedResponse",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SapMuxError {
    #[error("service discovery timed out after {0:?}; continuing with an empty catalog")]
    DiscoveryTimeout(Duration),

    #[error("entity '{entity_name}' not found in service '{service_id}'")]
    EntityNotFound {
        service_id: String,
        entity_name: String,
    },

    #[error("failed to load metadata for {service_id}/{entity_name}: {message}")]
    MetadataFetchError {
        service_id: String,
        entity_name: String,
        message: String,
    },

    #[error("operation '{operation}' is not allowed on '{entity_name}': entity is not {capability}")]
    CapabilityDenied {
        entity_name: String,
        operation: String,
        capability: String,
    },

    #[error("missing required field(s) for '{entity_name}': {}", .fields.join(", "))]
    MissingRequiredField {
        entity_name: String,
        fields: Vec<String>,
    },

    #[error("missing key propert(ies) for '{entity_name}': {}", .keys.join(", "))]
    MissingKey {
        entity_name: String,
        keys: Vec<String>,
    },

    #[error("unknown propert(ies) for '{entity_name}': {}", .properties.join(", "))]
    UnknownProperty {
        entity_name: String,
        properties: Vec<String>,
    },

    #[error("operation '{operation}' requires an authenticated user{}", .reason.as_ref().map(|r| format!(": {}", r)).unwrap_or_default())]
    AuthenticationRequired {
        operation: String,
        /// Set when a credential was supplied but cannot be used
        reason: Option<String>,
    },

    #[error("remote service returned HTTP {status}: {message}")]
    RemoteFault {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("remote service unavailable: {message}")]
    RemoteUnavailable { message: String },

    #[error("unexpected response from remote service{}: {message}", .status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default())]
    RemoteUnexpectedResponse { status: Option<u16>, message: String },
}

impl SapMuxError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DiscoveryTimeout(_) => ErrorKind::DiscoveryTimeout,
            Self::EntityNotFound { .. } => ErrorKind::EntityNotFound,
            Self::MetadataFetchError { .. } => ErrorKind::MetadataFetchError,
            Self::CapabilityDenied { .. } => ErrorKind::CapabilityDenied,
            Self::MissingRequiredField { .. } => ErrorKind::MissingRequiredField,
            Self::MissingKey { .. } => ErrorKind::MissingKey,
            Self::UnknownProperty { .. } => ErrorKind::UnknownProperty,
            Self::AuthenticationRequired { .. } => ErrorKind::AuthenticationRequired,
            Self::RemoteFault { .. } => ErrorKind::RemoteFault,
            Self::RemoteUnavailable { .. } => ErrorKind::RemoteUnavailable,
            Self::RemoteUnexpectedResponse { .. } => ErrorKind::RemoteUnexpectedResponse,
        }
    }

    pub fn authentication_required(operation: impl Into<String>) -> Self {
        Self::AuthenticationRequired {
            operation: operation.into(),
            reason: None,
        }
    }

    pub fn entity_not_found(service_id: &str, entity_name: &str) -> Self {
        Self::EntityNotFound {
            service_id: service_id.to_string(),
            entity_name: entity_name.to_string(),
        }
    }

    /// Structured body returned to the tool caller
    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "kind": self.kind().as_str(),
            "message": self.to_string(),
        });

        let details = match self {
            Self::MissingRequiredField { fields, .. } => Some(("fields", json!(fields))),
            Self::MissingKey { keys, .. } => Some(("keys", json!(keys))),
            Self::UnknownProperty { properties, .. } => Some(("properties", json!(properties))),
            Self::RemoteFault { status, code, .. } => {
                if let Some(code) = code {
                    body["code"] = json!(code);
                }
                Some(("status", json!(status)))
            }
            Self::RemoteUnexpectedResponse {
                status: Some(status),
                ..
            } => Some(("status", json!(status))),
            _ => None,
        };
        if let Some((field, value)) = details {
            body[field] = value;
        }

        json!({ "error": body })
    }
}
