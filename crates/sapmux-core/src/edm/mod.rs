//! OData EDM (EDMX) metadata parsing
//!
//! Turns a raw `$metadata` document into owned, normalized structures:
//! - Entity types with their keys and properties (declaration order kept)
//! - Entity sets, linked to their entity type
//! - Capabilities from SAP V2 attributes or the V4 Capabilities vocabulary
//!
//! Only addressable entity types (those exposed through an entity set) are
//! reported; everything else in the document is ignored.

mod annotations;

use anyhow::{anyhow, Context as _, Result};
use roxmltree::{Document, Node};
use std::collections::HashMap;

use crate::domain::{Capabilities, EdmType, EntitySchema, ODataVersion, PropertyDescriptor};
use annotations::{sap_attr, CapabilityHints, TermValue};

pub(crate) const SAP_NAMESPACE: &str = "http://www.sap.com/Protocols/SAPData";

/// Parsed `$metadata` document
#[derive(Debug, Clone)]
pub struct MetadataDocument {
    pub version: ODataVersion,
    pub entity_types: Vec<EntityTypeDef>,
    pub entity_sets: Vec<EntitySetDef>,
}

#[derive(Debug, Clone)]
pub struct EntityTypeDef {
    pub name: String,
    pub namespace: String,
    pub keys: Vec<String>,
    pub properties: Vec<PropertyDescriptor>,
}

#[derive(Debug, Clone)]
pub struct EntitySetDef {
    pub name: String,
    /// Unqualified entity type name
    pub entity_type: String,
    pub capabilities: Capabilities,
}

impl MetadataDocument {
    /// Parse an EDMX document
    pub fn parse(xml: &str) -> Result<Self> {
        let doc = Document::parse(xml).context("Metadata document is not well-formed XML")?;
        let root = doc.root_element();
        if !root.has_tag_name("Edmx") {
            return Err(anyhow!(
                "Expected an Edmx root element, found '{}'",
                root.tag_name().name()
            ));
        }

        let version = root
            .attribute("Version")
            .and_then(ODataVersion::parse)
            .unwrap_or_default();

        let schemas: Vec<Node> = doc
            .descendants()
            .filter(|n| n.is_element() && n.has_tag_name("Schema"))
            .collect();
        if schemas.is_empty() {
            return Err(anyhow!("Metadata document contains no Schema element"));
        }

        // Out-of-line annotations (`<Annotations Target="...">`), keyed by target path
        let external = annotations::collect_external(&schemas);

        let mut entity_types = Vec::new();
        let mut entity_sets = Vec::new();

        for schema in &schemas {
            let namespace = schema.attribute("Namespace").unwrap_or_default().to_string();

            for node in schema.children().filter(|c| c.has_tag_name("EntityType")) {
                entity_types.push(parse_entity_type(node, &namespace, &external)?);
            }

            for container in schema.children().filter(|c| c.has_tag_name("EntityContainer")) {
                let container_name = container.attribute("Name").unwrap_or_default();
                for set in container.children().filter(|c| c.has_tag_name("EntitySet")) {
                    let Some(name) = set.attribute("Name") else {
                        continue;
                    };
                    let Some(qualified_type) = set.attribute("EntityType") else {
                        continue;
                    };
                    let targets = [
                        format!("{}.{}/{}", namespace, container_name, name),
                        format!("{}/{}", container_name, name),
                    ];
                    let hints = CapabilityHints::from_entity_set(set, &external, &targets);
                    entity_sets.push(EntitySetDef {
                        name: name.to_string(),
                        entity_type: unqualified(qualified_type).to_string(),
                        capabilities: hints.resolve(),
                    });
                }
            }
        }

        Ok(Self {
            version,
            entity_types,
            entity_sets,
        })
    }

    /// Addressable entity type names in declaration order
    pub fn entity_names(&self) -> Vec<String> {
        self.entity_types
            .iter()
            .filter(|t| self.entity_set_for(&t.name).is_some())
            .map(|t| t.name.clone())
            .collect()
    }

    fn entity_set_for(&self, type_name: &str) -> Option<&EntitySetDef> {
        self.entity_sets.iter().find(|s| s.entity_type == type_name)
    }

    /// Build the schema for one entity (matched by type name, then entity set name)
    pub fn entity_schema(&self, service_id: &str, entity_name: &str) -> Result<EntitySchema> {
        let (entity_type, entity_set) = self
            .entity_types
            .iter()
            .find_map(|t| {
                (t.name == entity_name)
                    .then(|| self.entity_set_for(&t.name).map(|s| (t, s)))
                    .flatten()
            })
            .or_else(|| {
                self.entity_sets
                    .iter()
                    .find(|s| s.name == entity_name)
                    .and_then(|s| {
                        self.entity_types
                            .iter()
                            .find(|t| t.name == s.entity_type)
                            .map(|t| (t, s))
                    })
            })
            .ok_or_else(|| {
                anyhow!(
                    "Entity '{}' is not exposed by the metadata of '{}'",
                    entity_name,
                    service_id
                )
            })?;

        if entity_type.keys.is_empty() {
            return Err(anyhow!("Entity type '{}' declares no key", entity_type.name));
        }

        let schema = EntitySchema {
            service_id: service_id.to_string(),
            entity_name: entity_name.to_string(),
            entity_set: entity_set.name.clone(),
            namespace: entity_type.namespace.clone(),
            key_properties: entity_type.keys.clone(),
            properties: entity_type.properties.clone(),
            capabilities: entity_set.capabilities,
        };

        if !schema.keys_are_consistent() {
            return Err(anyhow!(
                "Entity type '{}' references key properties it does not declare",
                entity_type.name
            ));
        }
        Ok(schema)
    }
}

fn parse_entity_type(
    node: Node,
    namespace: &str,
    external: &HashMap<String, Vec<TermValue>>,
) -> Result<EntityTypeDef> {
    let name = node
        .attribute("Name")
        .ok_or_else(|| anyhow!("EntityType without a Name attribute in '{}'", namespace))?
        .to_string();

    let keys: Vec<String> = node
        .children()
        .filter(|c| c.has_tag_name("Key"))
        .flat_map(|key| key.children().filter(|c| c.has_tag_name("PropertyRef")))
        .filter_map(|r| r.attribute("Name").map(str::to_string))
        .collect();

    let mut properties = Vec::new();
    for prop in node.children().filter(|c| c.has_tag_name("Property")) {
        let Some(prop_name) = prop.attribute("Name") else {
            continue;
        };
        let raw_type = prop.attribute("Type").unwrap_or("Edm.String");

        let mut descriptor = PropertyDescriptor::new(prop_name, EdmType::from_edm(raw_type));
        descriptor.nullable = prop.attribute("Nullable").map_or(true, |v| v != "false");
        descriptor.max_length = prop.attribute("MaxLength").and_then(|v| v.parse().ok());
        descriptor.default_value = prop.attribute("DefaultValue").map(str::to_string);
        descriptor.is_key = keys.iter().any(|k| k == prop_name);
        if descriptor.is_key {
            descriptor.nullable = false;
        }

        let target = format!("{}.{}/{}", namespace, name, prop_name);
        let terms = annotations::terms_for(prop, external, &[target]);

        descriptor.label = sap_attr(prop, "label").or_else(|| {
            terms
                .iter()
                .find(|t| t.term == "Label" || t.term == "Description")
                .and_then(|t| t.string.clone())
        });

        descriptor.computed = sap_attr(prop, "creatable").as_deref() == Some("false")
            || terms
                .iter()
                .any(|t| t.term == "Computed" && t.bool_value().unwrap_or(true));

        properties.push(descriptor);
    }

    Ok(EntityTypeDef {
        name,
        namespace: namespace.to_string(),
        keys,
        properties,
    })
}

/// `API_BUSINESS_PARTNER.Customer` -> `Customer`
fn unqualified(qualified: &str) -> &str {
    qualified.rsplit('.').next().unwrap_or(qualified)
}
