//! Error types for blob and manifest access

use crate::digest::{Digest, DigestError};

/// Errors raised by blob stores and manifest accessors
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    /// No blob stored for the digest
    #[error("blob not found: {0}")]
    NotFound(Digest),

    /// The manifest has no config descriptor
    #[error("manifest has no config blob")]
    NoConfig,

    /// Stored bytes do not hash to the requested digest
    #[error("digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: Digest, actual: Digest },

    /// Digest parsing failed
    #[error("invalid digest: {0}")]
    InvalidDigest(#[from] DigestError),

    /// Manifest (de)serialization failed
    #[error("manifest json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for blob operations
pub type BlobResult<T> = Result<T, BlobError>;
