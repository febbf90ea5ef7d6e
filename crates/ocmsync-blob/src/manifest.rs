//! OCI manifest model and manifest access
//!
//! Only the fields the persistence layer consumes are modelled:
//! `config` and `layers` descriptors (media type, digest, size) plus
//! annotations, which are carried through untouched.

use crate::blob::{Blob, BlobAccess, MemoryBlobStore};
use crate::digest::Digest;
use crate::error::{BlobError, BlobResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// OCI image manifest media type
pub const MANIFEST_MEDIA_TYPE: &str = "application/vnd.oci.image.manifest.v1+json";

/// OCI content descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    /// Media type of the referenced content
    pub media_type: String,
    /// Digest of the referenced content
    pub digest: Digest,
    /// Size of the referenced content in bytes
    pub size: u64,
    /// Arbitrary metadata
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl Descriptor {
    /// Create descriptor without annotations
    #[must_use]
    pub fn new(media_type: impl Into<String>, digest: Digest, size: u64) -> Self {
        Self {
            media_type: media_type.into(),
            digest,
            size,
            annotations: BTreeMap::new(),
        }
    }
}

/// OCI image manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Always 2
    pub schema_version: u32,
    /// Manifest media type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    /// Config blob descriptor; `None` for a manifest that holds nothing yet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Descriptor>,
    /// Ordered layer descriptors
    #[serde(default)]
    pub layers: Vec<Descriptor>,
    /// Arbitrary metadata
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl Manifest {
    /// Empty manifest without config or layers
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Media type of the config descriptor, empty if absent
    #[inline]
    #[must_use]
    pub fn config_media_type(&self) -> &str {
        self.config.as_ref().map_or("", |c| c.media_type.as_str())
    }

    /// Parse manifest JSON
    ///
    /// # Errors
    /// Returns error if the document is not a valid manifest
    pub fn from_json(data: &[u8]) -> BlobResult<Self> {
        Ok(serde_json::from_slice(data)?)
    }

    /// Serialize manifest JSON
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn to_json(&self) -> BlobResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            schema_version: 2,
            media_type: Some(MANIFEST_MEDIA_TYPE.to_string()),
            config: None,
            layers: Vec::new(),
            annotations: BTreeMap::new(),
        }
    }
}

/// Access to one manifest and the blobs it references
pub trait ManifestAccess {
    /// Current manifest
    fn manifest(&self) -> &Manifest;

    /// Mutable manifest
    fn manifest_mut(&mut self) -> &mut Manifest;

    /// Fetch a blob referenced by this manifest
    ///
    /// # Errors
    /// Returns [`BlobError::NotFound`] if the blob is unknown
    fn get_blob(&self, digest: &Digest) -> BlobResult<Blob>;

    /// Store a blob so the manifest may reference it
    ///
    /// # Errors
    /// Returns error if the backend rejects the write
    fn add_blob(&mut self, blob: &Blob) -> BlobResult<()>;

    /// Fetch the config blob, labelled with the config media type
    ///
    /// # Errors
    /// Returns [`BlobError::NoConfig`] if the manifest has no config
    fn get_config_blob(&self) -> BlobResult<Blob> {
        let config = self.manifest().config.as_ref().ok_or(BlobError::NoConfig)?;
        let blob = self.get_blob(&config.digest)?;
        Ok(blob.with_media_type(config.media_type.clone()))
    }
}

/// Manifest held in memory, blobs in a shared [`BlobAccess`]
#[derive(Debug)]
pub struct MemoryManifestAccess<B: BlobAccess = MemoryBlobStore> {
    manifest: Manifest,
    store: Arc<B>,
}

impl MemoryManifestAccess<MemoryBlobStore> {
    /// Empty manifest over a fresh in-memory store
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Manifest::new(), Arc::new(MemoryBlobStore::new()))
    }
}

impl<B: BlobAccess> MemoryManifestAccess<B> {
    /// Wrap a manifest and the store holding its blobs
    #[must_use]
    pub fn new(manifest: Manifest, store: Arc<B>) -> Self {
        Self { manifest, store }
    }

    /// Shared blob store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<B> {
        &self.store
    }

    /// Take the manifest out
    #[inline]
    #[must_use]
    pub fn into_manifest(self) -> Manifest {
        self.manifest
    }
}

impl<B: BlobAccess> ManifestAccess for MemoryManifestAccess<B> {
    fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    fn manifest_mut(&mut self) -> &mut Manifest {
        &mut self.manifest
    }

    fn get_blob(&self, digest: &Digest) -> BlobResult<Blob> {
        let blob = self.store.get(digest)?;
        if blob.digest() != *digest {
            return Err(BlobError::DigestMismatch {
                expected: *digest,
                actual: blob.digest(),
            });
        }
        Ok(blob)
    }

    fn add_blob(&mut self, blob: &Blob) -> BlobResult<()> {
        let digest = self.store.put(blob.data(), blob.media_type())?;
        if digest != blob.digest() {
            return Err(BlobError::DigestMismatch {
                expected: blob.digest(),
                actual: digest,
            });
        }
        Ok(())
    }
}

impl<M: ManifestAccess + ?Sized> ManifestAccess for &mut M {
    fn manifest(&self) -> &Manifest {
        (**self).manifest()
    }

    fn manifest_mut(&mut self) -> &mut Manifest {
        (**self).manifest_mut()
    }

    fn get_blob(&self, digest: &Digest) -> BlobResult<Blob> {
        (**self).get_blob(digest)
    }

    fn add_blob(&mut self, blob: &Blob) -> BlobResult<()> {
        (**self).add_blob(blob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_manifest_has_no_config() {
        let manifest = Manifest::new();
        assert_eq!(manifest.schema_version, 2);
        assert!(manifest.config.is_none());
        assert_eq!(manifest.config_media_type(), "");
    }

    #[test]
    fn manifest_json_uses_oci_field_names() {
        let mut manifest = Manifest::new();
        let blob = Blob::new("application/x-config", b"{}".to_vec());
        manifest.config = Some(blob.descriptor());
        let json: serde_json::Value =
            serde_json::from_slice(&manifest.to_json().unwrap()).unwrap();
        assert_eq!(json["schemaVersion"], 2);
        assert_eq!(json["config"]["mediaType"], "application/x-config");
        assert_eq!(json["config"]["digest"], blob.digest().to_string());
        assert_eq!(json["config"]["size"], 2);
    }

    #[test]
    fn manifest_without_config_parses() {
        let manifest = Manifest::from_json(br#"{"schemaVersion":2,"layers":[]}"#).unwrap();
        assert!(manifest.config.is_none());
    }

    #[test]
    fn config_blob_requires_config() {
        let access = MemoryManifestAccess::empty();
        assert!(matches!(access.get_config_blob(), Err(BlobError::NoConfig)));
    }

    #[test]
    fn config_blob_is_labelled_with_descriptor_media_type() {
        let mut access = MemoryManifestAccess::empty();
        let blob = Blob::new("application/octet-stream", b"cfg".to_vec());
        access.add_blob(&blob).unwrap();
        access.manifest_mut().config =
            Some(Descriptor::new("application/x-config", blob.digest(), blob.size()));

        let config = access.get_config_blob().unwrap();
        assert_eq!(config.media_type(), "application/x-config");
        assert_eq!(config.data(), b"cfg");
    }
}
