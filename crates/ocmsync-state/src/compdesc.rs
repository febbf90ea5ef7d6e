//! Component descriptor model (schema v2)
//!
//! The persistence layer only depends on name, version and the canonical
//! encoded form. The model keeps the remaining fields typed enough for
//! callers to mutate resources, sources, references and labels.
//!
//! Encoding is always YAML. Decoding accepts YAML and, being a superset,
//! JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashSet};

/// Supported descriptor schema version
pub const SCHEMA_VERSION: &str = "v2";

/// Errors for descriptor encoding and decoding
#[derive(Debug, thiserror::Error)]
pub enum CompDescError {
    /// YAML/JSON syntax or shape error
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Schema version other than v2
    #[error("unsupported schema version: '{0}'")]
    UnsupportedSchemaVersion(String),

    /// Two elements share one identity
    #[error("duplicate {kind} identity: {identity}")]
    DuplicateIdentity { kind: &'static str, identity: String },

    /// Required field empty
    #[error("missing {0}")]
    Missing(&'static str),
}

/// Component descriptor document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDescriptor {
    /// Document metadata
    pub meta: Metadata,
    /// Component content
    pub component: ComponentSpec,
}

/// Descriptor document metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Schema version of the document
    #[serde(rename = "schemaVersion")]
    pub schema_version: String,
}

/// Component content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSpec {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub repository_contexts: Vec<JsonValue>,
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub component_references: Vec<ComponentReference>,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

/// Named label with arbitrary value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub value: JsonValue,
}

impl Label {
    /// Create label
    pub fn new(name: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Identity and labels shared by resources, sources and references
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementMeta {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_identity: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<Label>,
}

impl ElementMeta {
    /// Create element meta without extra identity
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            extra_identity: BTreeMap::new(),
            labels: Vec::new(),
        }
    }

    /// Identity string: name plus sorted extra identity
    #[must_use]
    pub fn identity(&self) -> String {
        let mut id = self.name.clone();
        for (k, v) in &self.extra_identity {
            id.push_str(&format!(",{k}={v}"));
        }
        id
    }
}

/// Whether a resource is built by the component or taken from elsewhere
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceRelation {
    #[default]
    Local,
    External,
}

/// Deliverable artifact of a component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(flatten)]
    pub meta: ElementMeta,
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default)]
    pub relation: ResourceRelation,
    /// Access specification, opaque to this layer
    pub access: JsonValue,
}

/// Source of a component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    #[serde(flatten)]
    pub meta: ElementMeta,
    #[serde(rename = "type")]
    pub source_type: String,
    /// Access specification, opaque to this layer
    pub access: JsonValue,
}

/// Reference to another component version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentReference {
    #[serde(flatten)]
    pub meta: ElementMeta,
    pub component_name: String,
}

impl ComponentDescriptor {
    /// Create empty descriptor for a component version
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            meta: Metadata {
                schema_version: SCHEMA_VERSION.to_string(),
            },
            component: ComponentSpec {
                name: name.into(),
                version: version.into(),
                provider: String::new(),
                labels: Vec::new(),
                repository_contexts: Vec::new(),
                sources: Vec::new(),
                component_references: Vec::new(),
                resources: Vec::new(),
            },
        }
    }

    /// Component name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.component.name
    }

    /// Component version
    #[inline]
    #[must_use]
    pub fn version(&self) -> &str {
        &self.component.version
    }

    /// Find resource by identity
    #[must_use]
    pub fn resource(&self, meta: &ElementMeta) -> Option<&Resource> {
        let id = meta.identity();
        self.component
            .resources
            .iter()
            .find(|r| r.meta.identity() == id)
    }

    /// Add resource, replacing one with the same identity
    pub fn set_resource(&mut self, resource: Resource) {
        let id = resource.meta.identity();
        match self
            .component
            .resources
            .iter_mut()
            .find(|r| r.meta.identity() == id)
        {
            Some(existing) => *existing = resource,
            None => self.component.resources.push(resource),
        }
    }

    /// Set or replace a component label
    pub fn set_label(&mut self, label: Label) {
        match self
            .component
            .labels
            .iter_mut()
            .find(|l| l.name == label.name)
        {
            Some(existing) => *existing = label,
            None => self.component.labels.push(label),
        }
    }

    /// Check document invariants
    ///
    /// # Errors
    /// Returns error on empty name/version or duplicate element identities
    pub fn validate(&self) -> Result<(), CompDescError> {
        if self.component.name.is_empty() {
            return Err(CompDescError::Missing("component name"));
        }
        if self.component.version.is_empty() {
            return Err(CompDescError::Missing("component version"));
        }
        unique("resource", self.component.resources.iter().map(|r| &r.meta))?;
        unique("source", self.component.sources.iter().map(|s| &s.meta))?;
        unique(
            "reference",
            self.component.component_references.iter().map(|r| &r.meta),
        )?;
        Ok(())
    }
}

fn unique<'a>(
    kind: &'static str,
    metas: impl Iterator<Item = &'a ElementMeta>,
) -> Result<(), CompDescError> {
    let mut seen = HashSet::new();
    for meta in metas {
        let identity = meta.identity();
        if !seen.insert(identity.clone()) {
            return Err(CompDescError::DuplicateIdentity { kind, identity });
        }
    }
    Ok(())
}

/// Encode descriptor to its canonical YAML form
///
/// # Errors
/// Returns error if the descriptor is invalid or serialization fails
pub fn encode(desc: &ComponentDescriptor) -> Result<Vec<u8>, CompDescError> {
    desc.validate()?;
    Ok(serde_yaml::to_string(desc)?.into_bytes())
}

/// Decode descriptor from YAML or JSON
///
/// # Errors
/// Returns error on syntax errors or unsupported schema versions
pub fn decode(data: &[u8]) -> Result<ComponentDescriptor, CompDescError> {
    let desc: ComponentDescriptor = serde_yaml::from_slice(data)?;
    if desc.meta.schema_version != SCHEMA_VERSION {
        return Err(CompDescError::UnsupportedSchemaVersion(
            desc.meta.schema_version,
        ));
    }
    Ok(desc)
}
