//! ocmsync Blob Layer
//!
//! Digest-addressed blobs and the OCI manifest structures that reference them.
//!
//! # Core Concepts
//!
//! - [`Digest`]: sha256 digest in `sha256:<hex>` form
//! - [`Blob`]: media-typed immutable bytes
//! - [`BlobAccess`]: content-addressed storage seam
//! - [`Manifest`] / [`Descriptor`]: OCI manifest model
//! - [`ManifestAccess`]: one manifest plus its blobs
//!
//! # Example
//!
//! ```rust
//! use ocmsync_blob::{BlobAccess, MemoryBlobStore};
//!
//! let store = MemoryBlobStore::new();
//! let digest = store.put(b"hello", "text/plain").unwrap();
//! assert_eq!(store.get(&digest).unwrap().data(), b"hello");
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod blob;
mod digest;
mod error;
mod manifest;

pub use blob::{Blob, BlobAccess, MemoryBlobStore};
pub use digest::{Digest, DigestError, SHA256};
pub use error::{BlobError, BlobResult};
pub use manifest::{Descriptor, Manifest, ManifestAccess, MemoryManifestAccess, MANIFEST_MEDIA_TYPE};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
