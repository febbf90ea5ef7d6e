//! Blobs and digest-addressed blob storage
//!
//! A [`Blob`] is an immutable byte sequence labelled with a media type.
//! [`BlobAccess`] is the storage seam consumed by manifest accessors;
//! [`MemoryBlobStore`] is the in-process implementation.

use crate::digest::Digest;
use crate::error::{BlobError, BlobResult};
use crate::manifest::Descriptor;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Immutable media-typed byte sequence
///
/// # Invariants
/// - `digest` is always `Digest::compute(&data)`
#[derive(Clone, PartialEq, Eq)]
pub struct Blob {
    media_type: String,
    digest: Digest,
    data: Arc<[u8]>,
}

impl Blob {
    /// Create blob (computes digest)
    #[must_use]
    pub fn new(media_type: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        let data = data.into();
        Self {
            media_type: media_type.into(),
            digest: Digest::compute(&data),
            data,
        }
    }

    /// Media type label
    #[inline]
    #[must_use]
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Content digest
    #[inline]
    #[must_use]
    pub fn digest(&self) -> Digest {
        self.digest
    }

    /// Blob content
    #[inline]
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Content size in bytes
    #[inline]
    #[must_use]
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Same content under a different media type
    #[must_use]
    pub fn with_media_type(self, media_type: impl Into<String>) -> Self {
        Self {
            media_type: media_type.into(),
            ..self
        }
    }

    /// OCI descriptor for this blob
    #[must_use]
    pub fn descriptor(&self) -> Descriptor {
        Descriptor::new(self.media_type.clone(), self.digest, self.size())
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blob")
            .field("media_type", &self.media_type)
            .field("digest", &self.digest.to_string())
            .field("size", &self.data.len())
            .finish()
    }
}

/// Content-addressed blob storage
///
/// # Contract
/// - `put` is idempotent: storing identical bytes yields the same digest
/// - `get` returns exactly the bytes stored under the digest
pub trait BlobAccess: Send + Sync {
    /// Fetch the blob stored under `digest`
    ///
    /// # Errors
    /// Returns [`BlobError::NotFound`] if nothing is stored under the digest
    fn get(&self, digest: &Digest) -> BlobResult<Blob>;

    /// Store bytes labelled with a media type, returning their digest
    ///
    /// # Errors
    /// Returns error if the backend rejects the write
    fn put(&self, data: &[u8], media_type: &str) -> BlobResult<Digest>;

    /// Check whether a digest is stored
    fn contains(&self, digest: &Digest) -> bool {
        self.get(digest).is_ok()
    }
}

/// In-memory blob store
///
/// Thread-safe; counts every `put` so callers can observe write traffic.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<Digest, Blob>>,
    writes: AtomicUsize,
}

impl MemoryBlobStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `put` calls served so far
    #[inline]
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of distinct blobs stored
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    /// Check if store is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }
}

impl BlobAccess for MemoryBlobStore {
    fn get(&self, digest: &Digest) -> BlobResult<Blob> {
        self.blobs
            .read()
            .get(digest)
            .cloned()
            .ok_or(BlobError::NotFound(*digest))
    }

    fn put(&self, data: &[u8], media_type: &str) -> BlobResult<Digest> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let blob = Blob::new(media_type, data);
        let digest = blob.digest();
        self.blobs.write().entry(digest).or_insert(blob);
        Ok(digest)
    }

    fn contains(&self, digest: &Digest) -> bool {
        self.blobs.read().contains_key(digest)
    }
}

impl<B: BlobAccess + ?Sized> BlobAccess for Arc<B> {
    fn get(&self, digest: &Digest) -> BlobResult<Blob> {
        (**self).get(digest)
    }

    fn put(&self, data: &[u8], media_type: &str) -> BlobResult<Digest> {
        (**self).put(data, media_type)
    }

    fn contains(&self, digest: &Digest) -> bool {
        (**self).contains(digest)
    }
}
