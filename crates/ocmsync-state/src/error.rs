//! Error types for state synchronization
//!
//! The taxonomy separates conditions callers must tell apart:
//! - not-found: nothing persisted yet, recovered by seeding the initial value
//! - wrong-kind: the location holds some other artifact, never overwritten
//! - malformed data: config, layer reference or tar content is broken

use crate::compdesc::CompDescError;
use ocmsync_blob::BlobError;

/// Errors raised while loading or storing state
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// No state exists yet at the target location
    #[error("component version not found")]
    NotFound,

    /// The location holds an artifact of a different kind
    #[error("artifact is no component: {0}")]
    NotAComponent(String),

    /// Config record is structurally valid JSON but unusable
    #[error("invalid component descriptor config: {0}")]
    InvalidConfig(String),

    /// Config record is not valid JSON
    #[error("malformed component descriptor config: {0}")]
    ConfigJson(#[source] serde_json::Error),

    /// Layer media type outside the recognized set
    #[error("invalid component descriptor media type: '{0}'")]
    InvalidMediaType(String),

    /// Tar archive has no component descriptor entry
    #[error("no component descriptor found in tar")]
    TarEntryMissing,

    /// Tar archive could not be read
    #[error("unable to read tar: {0}")]
    TarRead(#[source] std::io::Error),

    /// Tar archive could not be written
    #[error("unable to write tar: {0}")]
    TarWrite(#[source] std::io::Error),

    /// Descriptor encode/decode failed
    #[error("component descriptor: {0}")]
    Descriptor(#[from] CompDescError),

    /// Blob or manifest access failed
    #[error("blob access: {0}")]
    Blob(#[from] BlobError),

    /// Write attempted on a read-only state
    #[error("state is read-only")]
    ReadOnly,

    /// Backend-specific failure
    #[error("backend: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StateError {
    /// Check if the error only signals absent state
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Wrap a backend-specific error
    pub fn backend(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Backend(source.into())
    }
}

/// Result type alias for state operations
pub type StateResult<T> = Result<T, StateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_and_wrong_kind_are_distinct() {
        assert!(StateError::NotFound.is_not_found());
        assert!(!StateError::NotAComponent("application/x".to_string()).is_not_found());
    }

    #[test]
    fn not_a_component_display() {
        let err = StateError::NotAComponent("application/vnd.other".to_string());
        assert_eq!(err.to_string(), "artifact is no component: application/vnd.other");
    }

    #[test]
    fn blob_error_converts() {
        let err: StateError = BlobError::NoConfig.into();
        assert!(matches!(err, StateError::Blob(BlobError::NoConfig)));
    }
}
