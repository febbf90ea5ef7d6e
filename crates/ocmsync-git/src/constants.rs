//! Git client constants

/// Name of the single remote a client works with
pub const DEFAULT_REMOTE_NAME: &str = "origin";

/// Local branch the worktree is checked out on
pub const DEFAULT_WORKTREE_BRANCH: &str = "refs/heads/ocm";

/// Repository storage directory below the worktree root
pub const GIT_DIR_NAME: &str = ".git";

/// Commit identity used when neither options nor git config provide one
pub const FALLBACK_AUTHOR_NAME: &str = "ocmsync";

/// See [`FALLBACK_AUTHOR_NAME`]
pub const FALLBACK_AUTHOR_EMAIL: &str = "ocmsync@localhost";

/// Default commit message of the git state backend
pub const DEFAULT_COMMIT_MESSAGE: &str = "update component descriptor";

/// Credential callback attempts before giving up
pub(crate) const MAX_CREDENTIAL_ATTEMPTS: u32 = 3;
