//! Error types for git repository access

/// Errors raised by the git client
#[derive(Debug, thiserror::Error)]
pub enum GitError {
    /// Configured reference is not a valid full reference name
    #[error("invalid reference '{0}'")]
    InvalidReference(String),

    /// Configured commit is not a hex object id
    #[error("invalid commit '{0}'")]
    InvalidCommit(String),

    /// Configured reference does not exist on a non-empty remote
    #[error("reference '{0}' not found on remote")]
    ReferenceNotFound(String),

    /// Filesystem swap attempted after the repository was opened
    #[error("repository already open, filesystem cannot be changed")]
    AlreadyOpen,

    /// Context cancelled or deadline expired
    #[error("operation cancelled")]
    Cancelled,

    /// Remote history diverged from local history
    #[error("non-fast-forward update of '{0}'")]
    NonFastForward(String),

    /// Fast-forward would overwrite uncommitted worktree changes
    #[error("local changes would be overwritten by update of '{0}'")]
    UncommittedChanges(String),

    /// Remote refused a pushed reference
    #[error("push of '{reference}' rejected: {status}")]
    PushRejected { reference: String, status: String },

    /// Eager repository setup failed
    #[error("failed to setup repository '{url}': {source}")]
    Setup {
        url: String,
        #[source]
        source: Box<GitError>,
    },

    /// Worktree filesystem failure
    #[error("filesystem: {0}")]
    Filesystem(#[from] std::io::Error),

    /// Options document could not be parsed
    #[error("invalid client options: {0}")]
    Options(#[from] serde_yaml::Error),

    /// libgit2 failure
    #[error("git: {0}")]
    Git(#[from] git2::Error),
}

impl GitError {
    /// Wrap an error raised during setup
    pub fn setup(url: impl Into<String>, source: GitError) -> Self {
        Self::Setup {
            url: url.into(),
            source: Box::new(source),
        }
    }

    /// Check if the operation was aborted through its context
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::Setup { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}

/// Result type alias for git operations
pub type GitResult<T> = Result<T, GitError>;
