//! ocmsync Git Backend
//!
//! Git repository client over a pluggable working-tree filesystem, and a
//! [`StateAccess`](ocmsync_state::StateAccess) that persists state as a file
//! in that working tree.
//!
//! # Core Concepts
//!
//! - [`Client`]: open-or-clone-or-initialize, refresh (fetch + fast-forward),
//!   update (stage + commit + push)
//! - [`Context`]: cancellation and deadlines for network operations
//! - [`VirtualFs`]: filesystem hosting the working tree
//! - [`GitStateAccess`]: state stored as a committed file
//!
//! # Example
//!
//! ```rust,no_run
//! use ocmsync_git::{Client, ClientOptions, Context};
//!
//! let client = Client::new(ClientOptions::new("https://example.com/repo.git")).unwrap();
//! let ctx = Context::background();
//! client.refresh(&ctx).unwrap();
//! client.update(&ctx, "sync", true).unwrap();
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod access;
mod client;
pub mod constants;
mod context;
mod error;
pub mod fs;
mod options;
mod remote;

pub use access::GitStateAccess;
pub use client::{Client, NoOpReason, RepoHandle, SyncOutcome};
pub use context::Context;
pub use error::{GitError, GitResult};
pub use fs::{FsEntry, GitFs, OsFs, TempFs, VirtualFs};
pub use options::{AuthMethod, Author, ClientOptions};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
