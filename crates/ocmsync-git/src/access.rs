//! [`StateAccess`] over a file in a git working tree

use crate::client::Client;
use crate::constants::DEFAULT_COMMIT_MESSAGE;
use crate::context::Context;
use ocmsync_blob::{Blob, Digest};
use ocmsync_state::{
    LayerMediaType, StateAccess, StateError, StateResult, COMPONENT_DESCRIPTOR_FILE_NAME,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Stores serialized state as a worktree file, committing on every write
#[derive(Debug)]
pub struct GitStateAccess {
    client: Arc<Client>,
    path: PathBuf,
    message: String,
    push: bool,
    ctx: Context,
}

impl GitStateAccess {
    /// Access `component-descriptor.yaml` at the worktree root, pushing on write
    #[must_use]
    pub fn new(client: Arc<Client>) -> Self {
        Self {
            client,
            path: PathBuf::from(COMPONENT_DESCRIPTOR_FILE_NAME),
            message: DEFAULT_COMMIT_MESSAGE.to_string(),
            push: true,
            ctx: Context::background(),
        }
    }

    /// Store the state at a worktree-relative path
    #[inline]
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    /// Commit message used for every write
    #[inline]
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Push after each commit
    #[inline]
    #[must_use]
    pub fn with_push(mut self, push: bool) -> Self {
        self.push = push;
        self
    }

    /// Context for network operations
    #[inline]
    #[must_use]
    pub fn with_context(mut self, ctx: Context) -> Self {
        self.ctx = ctx;
        self
    }

    /// Worktree-relative path of the state file
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Underlying client
    #[inline]
    #[must_use]
    pub fn client(&self) -> &Arc<Client> {
        &self.client
    }
}

impl StateAccess for GitStateAccess {
    fn get(&self) -> StateResult<Blob> {
        let fs = self.client.worktree(&self.ctx).map_err(StateError::backend)?;
        match fs.read(&self.path) {
            Ok(data) => Ok(Blob::new(LayerMediaType::Yaml.as_str(), data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StateError::NotFound),
            Err(e) => Err(StateError::backend(e)),
        }
    }

    fn put(&mut self, data: &[u8]) -> StateResult<()> {
        let fs = self.client.worktree(&self.ctx).map_err(StateError::backend)?;
        fs.write(&self.path, data).map_err(StateError::backend)?;
        let outcome = self
            .client
            .update(&self.ctx, &self.message, self.push)
            .map_err(StateError::backend)?;
        tracing::debug!("Stored {} ({:?})", self.path.display(), outcome);
        Ok(())
    }

    fn digest(&self) -> Option<Digest> {
        let fs = self.client.filesystem()?;
        fs.read(&self.path).ok().map(|data| Digest::compute(&data))
    }
}
