//! ocmsync State Layer
//!
//! Generic load/mutate/commit cycle for serialized objects, the component
//! descriptor model and the OCI manifest backend.
//!
//! # Core Concepts
//!
//! - [`StateHandler`]: encode/decode/equivalence strategy
//! - [`StateAccess`]: backend holding the serialized bytes
//! - [`State`]: session that writes only when something changed
//! - [`OciStateAccess`]: backend over an OCI manifest
//!
//! # Example
//!
//! ```rust
//! use ocmsync_blob::MemoryManifestAccess;
//! use ocmsync_state::{new_state, AccessMode, CommitOutcome};
//!
//! let mut state = new_state(AccessMode::ReadWrite, "acme.org/x", "1.0.0", MemoryManifestAccess::empty());
//! state.get_mut().unwrap().component.provider = "acme".to_string();
//! assert_eq!(state.write().unwrap(), CommitOutcome::Updated);
//! assert_eq!(state.write().unwrap(), CommitOutcome::NoOp);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod access;
pub mod compdesc;
mod error;
mod handler;
pub mod mediatype;
mod oci;
mod state;
pub mod tarball;

pub use access::StateAccess;
pub use compdesc::ComponentDescriptor;
pub use error::{StateError, StateResult};
pub use handler::{ComponentStateHandler, StateHandler};
pub use mediatype::{ConfigKind, ConfigMediaType, LayerMediaType, COMPONENT_DESCRIPTOR_FILE_NAME};
pub use oci::{new_state, ComponentDescriptorConfig, ComponentState, OciStateAccess};
pub use state::{AccessMode, CommitOutcome, State};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
