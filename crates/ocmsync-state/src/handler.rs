//! Encode/decode/compare strategy for persisted objects

use crate::compdesc::{self, ComponentDescriptor};
use crate::error::StateResult;

/// Converts between an object and its persisted bytes
///
/// `equivalent` is the only authority on whether a commit is a no-op.
/// Byte or digest equality of encodings is never consulted.
pub trait StateHandler {
    /// The in-memory object
    type Object: Clone;

    /// Value used when nothing has been persisted yet
    fn initial(&self) -> Self::Object;

    /// Serialize, possibly normalizing the object first
    ///
    /// # Errors
    /// Returns error if the object cannot be encoded
    fn encode(&self, object: &mut Self::Object) -> StateResult<Vec<u8>>;

    /// Deserialize persisted bytes
    ///
    /// # Errors
    /// Returns error if the bytes are not a valid encoding
    fn decode(&self, data: &[u8]) -> StateResult<Self::Object>;

    /// Whether two objects need no write between them
    fn equivalent(&self, a: &Self::Object, b: &Self::Object) -> bool;
}

/// Handler for component descriptors of one component version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentStateHandler {
    name: String,
    version: String,
}

impl ComponentStateHandler {
    /// Handler stamping `name` and `version` on every encoded descriptor
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Component name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Component version
    #[inline]
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }
}

impl StateHandler for ComponentStateHandler {
    type Object = ComponentDescriptor;

    fn initial(&self) -> ComponentDescriptor {
        ComponentDescriptor::new(self.name.clone(), self.version.clone())
    }

    fn encode(&self, object: &mut ComponentDescriptor) -> StateResult<Vec<u8>> {
        object.component.name.clone_from(&self.name);
        object.component.version.clone_from(&self.version);
        Ok(compdesc::encode(object)?)
    }

    fn decode(&self, data: &[u8]) -> StateResult<ComponentDescriptor> {
        Ok(compdesc::decode(data)?)
    }

    fn equivalent(&self, a: &ComponentDescriptor, b: &ComponentDescriptor) -> bool {
        a == b
    }
}
