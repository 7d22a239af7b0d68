//! EntitySchema entity - fully resolved schema of one OData entity type

use serde::{Deserialize, Serialize};

/// Normalized EDM type vocabulary
///
/// OData V2 and V4 spell some primitive types differently (`Edm.DateTime` vs
/// `Edm.DateTimeOffset`, `Edm.Time` vs `Edm.TimeOfDay`). Everything downstream
/// of the parser works on this stable set instead of raw EDM names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdmType {
    String,
    Boolean,
    Byte,
    SByte,
    Int16,
    Int32,
    Int64,
    Decimal,
    Single,
    Double,
    Guid,
    Date,
    DateTime,
    DateTimeOffset,
    Time,
    Duration,
    Binary,
    Stream,
    Complex,
    Collection,
    Unknown,
}

impl EdmType {
    /// Normalize a raw EDM type name (`Edm.String`, `Collection(Edm.Int32)`, `ns.Address`)
    pub fn from_edm(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.starts_with("Collection(") {
            return Self::Collection;
        }
        match raw.strip_prefix("Edm.") {
            Some(primitive) => match primitive {
                "String" => Self::String,
                "Boolean" => Self::Boolean,
                "Byte" => Self::Byte,
                "SByte" => Self::SByte,
                "Int16" => Self::Int16,
                "Int32" => Self::Int32,
                "Int64" => Self::Int64,
                "Decimal" => Self::Decimal,
                "Single" => Self::Single,
                "Double" => Self::Double,
                "Guid" => Self::Guid,
                "Date" => Self::Date,
                "DateTime" => Self::DateTime,
                "DateTimeOffset" => Self::DateTimeOffset,
                "Time" | "TimeOfDay" => Self::Time,
                "Duration" => Self::Duration,
                "Binary" => Self::Binary,
                "Stream" => Self::Stream,
                _ => Self::Unknown,
            },
            None if raw.contains('.') => Self::Complex,
            None => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Byte => "byte",
            Self::SByte => "sbyte",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Decimal => "decimal",
            Self::Single => "single",
            Self::Double => "double",
            Self::Guid => "guid",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::DateTimeOffset => "datetimeoffset",
            Self::Time => "time",
            Self::Duration => "duration",
            Self::Binary => "binary",
            Self::Stream => "stream",
            Self::Complex => "complex",
            Self::Collection => "collection",
            Self::Unknown => "unknown",
        }
    }

    /// Whether literals of this type are written without quotes in key predicates
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Byte
                | Self::SByte
                | Self::Int16
                | Self::Int32
                | Self::Int64
                | Self::Decimal
                | Self::Single
                | Self::Double
        )
    }
}

impl std::fmt::Display for EdmType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One property of an entity type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDescriptor {
    pub name: String,
    pub edm_type: EdmType,
    pub nullable: bool,
    pub max_length: Option<u32>,
    pub is_key: bool,
    /// Display label (`sap:label` or `Core.Description`)
    #[serde(default)]
    pub label: Option<String>,
    /// Server-side default (`DefaultValue`)
    #[serde(default)]
    pub default_value: Option<String>,
    /// Filled by the server, never supplied on create
    #[serde(default)]
    pub computed: bool,
}

impl PropertyDescriptor {
    pub fn new(name: impl Into<String>, edm_type: EdmType) -> Self {
        Self {
            name: name.into(),
            edm_type,
            nullable: true,
            max_length: None,
            is_key: false,
            label: None,
            default_value: None,
            computed: false,
        }
    }

    /// Keys are never nullable
    pub fn key(mut self) -> Self {
        self.is_key = true;
        self.nullable = false;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn with_max_length(mut self, max_length: u32) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    /// Must be present in a create payload
    pub fn required_on_create(&self) -> bool {
        !self.nullable && !self.computed && self.default_value.is_none()
    }
}

/// Which operations an entity supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub readable: bool,
    pub creatable: bool,
    pub updatable: bool,
    pub deletable: bool,
}

impl Default for Capabilities {
    /// Without annotations only reading is assumed
    fn default() -> Self {
        Self {
            readable: true,
            creatable: false,
            updatable: false,
            deletable: false,
        }
    }
}

impl Capabilities {
    pub fn all() -> Self {
        Self {
            readable: true,
            creatable: true,
            updatable: true,
            deletable: true,
        }
    }

    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::Readable => self.readable,
            Capability::Creatable => self.creatable,
            Capability::Updatable => self.updatable,
            Capability::Deletable => self.deletable,
        }
    }
}

/// A single capability flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Readable,
    Creatable,
    Updatable,
    Deletable,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Readable => "readable",
            Self::Creatable => "creatable",
            Self::Updatable => "updatable",
            Self::Deletable => "deletable",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fully resolved entity schema
///
/// Built lazily on the first metadata request for `(service_id, entity_name)`
/// and cached for the lifetime of the process.
///
/// Invariant: `key_properties` is non-empty and every entry names a property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySchema {
    pub service_id: String,
    pub entity_name: String,
    pub entity_set: String,
    pub namespace: String,
    pub key_properties: Vec<String>,
    /// In declaration order
    pub properties: Vec<PropertyDescriptor>,
    pub capabilities: Capabilities,
}

impl EntitySchema {
    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn key_descriptors(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.key_properties
            .iter()
            .filter_map(move |key| self.property(key))
    }

    /// Check the key invariant
    pub fn keys_are_consistent(&self) -> bool {
        !self.key_properties.is_empty()
            && self
                .key_properties
                .iter()
                .all(|key| self.properties.iter().any(|p| &p.name == key))
    }
}
