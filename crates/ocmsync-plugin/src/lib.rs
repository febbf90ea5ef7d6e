//! ocmsync Upload Plugin
//!
//! Command boundary of an upload plugin: a host invokes the plugin binary
//! with `upload put <name> <specification>`, streams the blob on stdin and
//! reads the resulting access specification from stdout.
//!
//! # Core Concepts
//!
//! - [`Plugin`]: registry of [`Uploader`]s and the target types they accept
//! - [`run_put`]: the `upload put` command, one JSON line on success
//! - [`FileUploader`]: built-in uploader writing to a local directory
//!
//! # Example
//!
//! ```rust
//! use ocmsync_plugin::{run_put, FileUploader, Plugin, PutArgs};
//! use std::sync::Arc;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let plugin = Plugin::new("ocmsync", "0.1.0").with_uploader(Arc::new(FileUploader));
//! let args = PutArgs {
//!     name: "file".to_string(),
//!     specification: serde_json::json!({ "type": "file/v1", "path": dir.path() }).to_string(),
//!     ..PutArgs::default()
//! };
//!
//! let mut out = Vec::new();
//! run_put(&plugin, &args, &b"hello"[..], &mut out).unwrap();
//! assert!(String::from_utf8(out).unwrap().contains("\"type\":\"file/v1\""));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod error;
mod file;
mod plugin;
mod put;

pub use error::{PluginError, PluginResult};
pub use file::{FileUploader, FILE_TARGET_TYPE, FILE_UPLOADER_NAME};
pub use plugin::{Credentials, Plugin, TargetSpec, UploadRequest, Uploader};
pub use put::{run_put, PutArgs};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Plugin with the built-in uploaders registered
#[must_use]
pub fn default_plugin() -> Plugin {
    Plugin::new("ocmsync", VERSION).with_uploader(std::sync::Arc::new(FileUploader))
}
