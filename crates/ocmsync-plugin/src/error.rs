//! Error types for the plugin command boundary

use std::error::Error as StdError;

/// Errors raised while handling a plugin command
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    /// The repository specification argument is not valid YAML or JSON
    #[error("invalid repository specification: {0}")]
    InvalidSpecification(#[source] serde_yaml::Error),

    /// The `--credentials` argument is not a YAML string map
    #[error("invalid credentials: {0}")]
    InvalidCredentials(#[source] serde_yaml::Error),

    /// A `--credential` flag is not of the form `key=value`
    #[error("invalid credential {0:?}: expected key=value")]
    InvalidCredential(String),

    /// The decoded specification is not an accepted upload target
    #[error("target specification: {0}")]
    TargetSpecification(String),

    /// No uploader registered for the request
    #[error("uploader not found: {0}")]
    UploaderNotFound(String),

    /// The uploader failed
    #[error("upload failed: {0}")]
    UploadFailed(#[source] Box<dyn StdError + Send + Sync>),

    /// Reading input or writing output failed
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Access specification serialization failed
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PluginError {
    /// Target specification error with a message
    pub fn target(msg: impl Into<String>) -> Self {
        Self::TargetSpecification(msg.into())
    }

    /// Wrap an uploader failure
    pub fn upload_failed(source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::UploadFailed(source.into())
    }

    /// Not-found error naming the requested `artifactType:mediaType`
    pub fn uploader_not_found(artifact_type: &str, media_type: &str) -> Self {
        Self::UploaderNotFound(format!("{artifact_type}:{media_type}"))
    }
}

/// Result type alias for plugin operations
pub type PluginResult<T> = Result<T, PluginError>;
