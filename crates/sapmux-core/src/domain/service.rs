//! ServiceDescriptor entity - one discovered OData service

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// OData protocol version spoken by a service
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum ODataVersion {
    #[default]
    #[serde(rename = "v2", alias = "2.0", alias = "V2")]
    V2,
    #[serde(rename = "v4", alias = "4.0", alias = "V4")]
    V4,
}

impl ODataVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V2 => "v2",
            Self::V4 => "v4",
        }
    }

    /// Parse from an EDMX `Version` attribute or a catalog hint
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "v2" | "2" | "2.0" | "1.0" | "3.0" => Some(Self::V2),
            "v4" | "4" | "4.0" | "4.01" => Some(Self::V4),
            _ => None,
        }
    }
}

impl std::fmt::Display for ODataVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A discovered OData service
///
/// Created once per service during discovery and never mutated afterwards.
/// Owned by the service catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDescriptor {
    /// Technical service id (e.g. `API_BUSINESS_PARTNER`)
    pub service_id: String,

    /// Human-readable title
    pub service_name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub odata_version: ODataVersion,

    /// Root URL of the service (entity sets and `$metadata` hang off it)
    pub service_url: String,

    #[serde(default)]
    pub categories: BTreeSet<String>,

    /// Addressable entity names, in metadata declaration order
    #[serde(default)]
    pub entity_names: Vec<String>,
}

impl ServiceDescriptor {
    pub fn new(
        service_id: impl Into<String>,
        service_name: impl Into<String>,
        service_url: impl Into<String>,
    ) -> Self {
        Self {
            service_id: service_id.into(),
            service_name: service_name.into(),
            description: String::new(),
            odata_version: ODataVersion::default(),
            service_url: service_url.into(),
            categories: BTreeSet::new(),
            entity_names: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_version(mut self, version: ODataVersion) -> Self {
        self.odata_version = version;
        self
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_entities<I, S>(mut self, entities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entity_names = entities.into_iter().map(Into::into).collect();
        self
    }

    pub fn has_entity(&self, entity_name: &str) -> bool {
        self.entity_names.iter().any(|e| e == entity_name)
    }

    /// Minimal projection used in discovery responses
    pub fn entity_summaries(&self) -> Vec<EntitySummary> {
        self.entity_names
            .iter()
            .map(|name| EntitySummary {
                service_id: self.service_id.clone(),
                entity_name: name.clone(),
            })
            .collect()
    }
}

/// Minimal `(serviceId, entityName)` projection
///
/// Derived from a ServiceDescriptor on demand, never stored on its own.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct EntitySummary {
    pub service_id: String,
    pub entity_name: String,
}
