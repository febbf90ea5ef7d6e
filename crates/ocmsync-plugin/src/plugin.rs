//! Plugin registry: uploaders and their accepted target types

use crate::error::{PluginError, PluginResult};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;
use std::sync::Arc;

/// Credential properties handed to an uploader
pub type Credentials = BTreeMap<String, String>;

/// A decoded upload target specification
///
/// Always a JSON object carrying a registered `type`.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetSpec {
    target_type: String,
    raw: JsonValue,
}

impl TargetSpec {
    /// Registered type the specification declares
    #[inline]
    #[must_use]
    pub fn target_type(&self) -> &str {
        &self.target_type
    }

    /// Attribute of the specification by key
    #[inline]
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&JsonValue> {
        self.raw.get(key)
    }

    /// String attribute, or a target specification error naming the key
    pub fn required_str(&self, key: &str) -> PluginResult<&str> {
        self.field(key).and_then(JsonValue::as_str).ok_or_else(|| {
            PluginError::target(format!("{}: missing string field {key:?}", self.target_type))
        })
    }

    /// Raw specification
    #[inline]
    #[must_use]
    pub fn as_json(&self) -> &JsonValue {
        &self.raw
    }
}

/// Everything an uploader receives for one `put`
#[derive(Debug, Clone, Copy)]
pub struct UploadRequest<'a> {
    pub artifact_type: &'a str,
    pub media_type: &'a str,
    pub hint: &'a str,
    pub target: &'a TargetSpec,
    pub credentials: &'a Credentials,
    pub data: &'a [u8],
}

/// Stores blobs at an upload target and reports how to access them
pub trait Uploader: Send + Sync + Debug {
    /// Name used to select the uploader on the command line
    fn name(&self) -> &str;

    /// Target specification types this uploader accepts
    fn target_types(&self) -> &[&str];

    /// Upload the request data, returning the access specification
    fn upload(&self, plugin: &Plugin, request: &UploadRequest<'_>) -> PluginResult<JsonValue>;
}

/// Registry of uploaders exposed by this plugin
#[derive(Debug, Default)]
pub struct Plugin {
    name: String,
    version: String,
    uploaders: BTreeMap<String, Arc<dyn Uploader>>,
    target_types: BTreeSet<String>,
}

impl Plugin {
    /// Empty registry
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Self::default()
        }
    }

    /// Plugin name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Plugin version
    #[inline]
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Register an uploader and the target types it accepts
    ///
    /// A later registration under the same name replaces the earlier one.
    pub fn register_uploader(&mut self, uploader: Arc<dyn Uploader>) {
        self.target_types
            .extend(uploader.target_types().iter().map(|t| (*t).to_string()));
        let name = uploader.name().to_string();
        if self.uploaders.insert(name.clone(), uploader).is_some() {
            tracing::warn!("Uploader {} registered twice, keeping the latest", name);
        }
    }

    /// Register an uploader, builder style
    #[must_use]
    pub fn with_uploader(mut self, uploader: Arc<dyn Uploader>) -> Self {
        self.register_uploader(uploader);
        self
    }

    /// Uploader registered under `name`
    #[must_use]
    pub fn get_uploader(&self, name: &str) -> Option<&Arc<dyn Uploader>> {
        self.uploaders.get(name)
    }

    /// Names of all registered uploaders, sorted
    pub fn uploader_names(&self) -> impl Iterator<Item = &str> {
        self.uploaders.keys().map(String::as_str)
    }

    /// Validate a raw specification against the registered target types
    ///
    /// # Errors
    /// Returns [`PluginError::TargetSpecification`] if the value is not an
    /// object, has no string `type`, or names an unregistered type.
    pub fn decode_upload_target_specification(&self, raw: &JsonValue) -> PluginResult<TargetSpec> {
        if !raw.is_object() {
            return Err(PluginError::target("specification must be an object"));
        }
        let target_type = raw
            .get("type")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| PluginError::target("missing type"))?;
        if !self.target_types.contains(target_type) {
            return Err(PluginError::target(format!(
                "unknown target type {target_type:?}"
            )));
        }
        Ok(TargetSpec {
            target_type: target_type.to_string(),
            raw: raw.clone(),
        })
    }
}
