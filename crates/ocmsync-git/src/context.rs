//! Cancellation and deadlines for network operations

use crate::error::{GitError, GitResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cancellation token with an optional deadline
///
/// Clones share the cancellation flag. Network operations poll
/// [`Context::is_done`] from libgit2 callbacks and abort the transfer.
#[derive(Debug, Clone, Default)]
pub struct Context {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Context {
    /// Context that is never done unless cancelled
    #[must_use]
    pub fn background() -> Self {
        Self::default()
    }

    /// Context that expires after `timeout`
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::background().with_deadline(Instant::now() + timeout)
    }

    /// Same cancellation flag, with a deadline
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Cancel this context and all its clones
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Check if cancelled or past the deadline
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst) || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Fail fast if done
    ///
    /// # Errors
    /// Returns [`GitError::Cancelled`] if the context is done
    pub fn check(&self) -> GitResult<()> {
        if self.is_done() {
            return Err(GitError::Cancelled);
        }
        Ok(())
    }

    /// Map a libgit2 error, reporting aborts caused by this context as cancellation
    pub(crate) fn git_error(&self, err: git2::Error) -> GitError {
        if self.is_done() {
            GitError::Cancelled
        } else {
            GitError::Git(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn background_is_not_done() {
        assert!(!Context::background().is_done());
        assert!(Context::background().check().is_ok());
    }

    #[test]
    fn cancel_reaches_clones() {
        let ctx = Context::background();
        let clone = ctx.clone();
        ctx.cancel();
        assert!(clone.is_done());
        assert!(matches!(clone.check(), Err(GitError::Cancelled)));
    }

    #[test]
    fn expired_deadline_is_done() {
        let ctx = Context::with_timeout(Duration::ZERO);
        assert!(ctx.is_done());
    }

    #[test]
    fn libgit2_errors_map_to_cancelled_once_done() {
        let ctx = Context::background();
        let err = git2::Error::from_str("user cancelled");
        assert!(matches!(ctx.git_error(err), GitError::Git(_)));
        ctx.cancel();
        let err = git2::Error::from_str("user cancelled");
        assert!(matches!(ctx.git_error(err), GitError::Cancelled));
    }
}
