//! Vocabulary annotations and SAP attribute hints

use roxmltree::Node;
use std::collections::HashMap;

use super::SAP_NAMESPACE;
use crate::domain::Capabilities;

/// Value of a `sap:*` attribute on a node
pub(crate) fn sap_attr(node: Node, local: &str) -> Option<String> {
    node.attributes()
        .find(|a| a.name() == local && a.namespace() == Some(SAP_NAMESPACE))
        .map(|a| a.value().to_string())
}

/// One `<Annotation>` reduced to what the parser needs
#[derive(Debug, Clone, Default)]
pub(crate) struct TermValue {
    /// Unqualified term name (`InsertRestrictions`, `Computed`, `Label`)
    pub term: String,
    pub string: Option<String>,
    pub boolean: Option<bool>,
    /// `PropertyValue` entries of an inline record
    pub record: Vec<(String, Option<bool>)>,
}

impl TermValue {
    fn from_node(node: Node) -> Option<Self> {
        let term = node.attribute("Term")?;
        let term = term.rsplit('.').next().unwrap_or(term).to_string();

        let string = node
            .attribute("String")
            .map(str::to_string)
            .or_else(|| child_text(node, "String"));
        let boolean = bool_of(node);

        let record = node
            .children()
            .filter(|c| c.has_tag_name("Record"))
            .flat_map(|r| r.children().filter(|c| c.has_tag_name("PropertyValue")))
            .filter_map(|pv| Some((pv.attribute("Property")?.to_string(), bool_of(pv))))
            .collect();

        Some(Self {
            term,
            string,
            boolean,
            record,
        })
    }

    pub fn bool_value(&self) -> Option<bool> {
        self.boolean
    }

    /// Boolean record member; a record that omits the member means `true`
    fn record_flag(&self, property: &str) -> bool {
        self.record
            .iter()
            .find(|(name, _)| name == property)
            .map_or(true, |(_, value)| value.unwrap_or(true))
    }
}

fn bool_of(node: Node) -> Option<bool> {
    node.attribute("Bool")
        .map(str::to_string)
        .or_else(|| child_text(node, "Bool"))
        .map(|v| v.trim() == "true")
}

fn child_text(node: Node, tag: &str) -> Option<String> {
    node.children()
        .find(|c| c.has_tag_name(tag))
        .and_then(|c| c.text())
        .map(|t| t.trim().to_string())
}

/// Gather `<Annotations Target="...">` blocks, with alias-qualified targets
/// rewritten to their namespace
pub(crate) fn collect_external(schemas: &[Node]) -> HashMap<String, Vec<TermValue>> {
    let aliases: Vec<(String, String)> = schemas
        .iter()
        .filter_map(|s| {
            Some((
                s.attribute("Alias")?.to_string(),
                s.attribute("Namespace")?.to_string(),
            ))
        })
        .collect();

    let mut external: HashMap<String, Vec<TermValue>> = HashMap::new();
    for block in schemas
        .iter()
        .flat_map(|s| s.children().filter(|c| c.has_tag_name("Annotations")))
    {
        let Some(target) = block.attribute("Target") else {
            continue;
        };
        let target = aliases
            .iter()
            .find_map(|(alias, ns)| {
                target
                    .strip_prefix(alias.as_str())
                    .filter(|rest| rest.starts_with('.'))
                    .map(|rest| format!("{}{}", ns, rest))
            })
            .unwrap_or_else(|| target.to_string());

        external.entry(target).or_default().extend(
            block
                .children()
                .filter(|c| c.has_tag_name("Annotation"))
                .filter_map(TermValue::from_node),
        );
    }
    external
}

/// Inline annotations of `node` plus any external ones aimed at `targets`
pub(crate) fn terms_for(
    node: Node,
    external: &HashMap<String, Vec<TermValue>>,
    targets: &[String],
) -> Vec<TermValue> {
    let mut terms: Vec<TermValue> = node
        .children()
        .filter(|c| c.has_tag_name("Annotation"))
        .filter_map(TermValue::from_node)
        .collect();
    for target in targets {
        if let Some(found) = external.get(target) {
            terms.extend(found.iter().cloned());
        }
    }
    terms
}

/// Capability evidence gathered for one entity set
///
/// Vocabulary terms win over SAP attributes. With no evidence at all, only
/// reading is allowed.
pub(crate) struct CapabilityHints {
    terms: Vec<TermValue>,
    sap: HashMap<&'static str, bool>,
}

impl CapabilityHints {
    pub fn from_entity_set(
        set: Node,
        external: &HashMap<String, Vec<TermValue>>,
        targets: &[String],
    ) -> Self {
        let mut sap = HashMap::new();
        for flag in ["creatable", "updatable", "deletable"] {
            let value = match sap_attr(set, flag) {
                Some(v) => Some(v == "true"),
                // `sap:updatable-path` means "decided per instance", so possible
                None => sap_attr(set, &format!("{}-path", flag)).map(|_| true),
            };
            if let Some(value) = value {
                sap.insert(flag, value);
            }
        }

        Self {
            terms: terms_for(set, external, targets),
            sap,
        }
    }

    fn term_flag(&self, term: &str, property: &str) -> Option<bool> {
        self.terms
            .iter()
            .find(|t| t.term == term)
            .map(|t| t.record_flag(property))
    }

    pub fn resolve(&self) -> Capabilities {
        let defaults = Capabilities::default();
        Capabilities {
            readable: self
                .term_flag("ReadRestrictions", "Readable")
                .unwrap_or(defaults.readable),
            creatable: self
                .term_flag("InsertRestrictions", "Insertable")
                .or_else(|| self.sap.get("creatable").copied())
                .unwrap_or(defaults.creatable),
            updatable: self
                .term_flag("UpdateRestrictions", "Updatable")
                .or_else(|| self.sap.get("updatable").copied())
                .unwrap_or(defaults.updatable),
            deletable: self
                .term_flag("DeleteRestrictions", "Deletable")
                .or_else(|| self.sap.get("deletable").copied())
                .unwrap_or(defaults.deletable),
        }
    }
}
