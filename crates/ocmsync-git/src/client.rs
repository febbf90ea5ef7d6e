//! Git repository client
//!
//! A [`Client`] owns one working tree on a [`VirtualFs`] and one remote
//! named [`DEFAULT_REMOTE_NAME`]. The repository is opened, cloned or
//! initialized on first use and cached for the client's lifetime.
//!
//! # Lifecycle
//!
//! ```text
//! Unbound --setup(fs)--> Bound(fs) --repository()--> Open { fs, repo }
//!    \___________________repository()___________________/^
//! ```
//!
//! An unbound client hosts its repository in a [`TempFs`].

use crate::constants::{
    DEFAULT_REMOTE_NAME, DEFAULT_WORKTREE_BRANCH, FALLBACK_AUTHOR_EMAIL, FALLBACK_AUTHOR_NAME,
    GIT_DIR_NAME,
};
use crate::context::Context;
use crate::error::{GitError, GitResult};
use crate::fs::{FsEntry, GitFs, TempFs, VirtualFs};
use crate::options::ClientOptions;
use crate::remote;
use git2::build::CheckoutBuilder;
use git2::{
    AutotagOption, Commit, ConfigLevel, Direction, ErrorCode, FetchOptions, IndexAddOption, Oid,
    PushOptions, Reference, Remote, Repository, RepositoryInitOptions, Signature,
};
use parking_lot::Mutex;
use std::cell::RefCell;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Shared handle to an open repository
pub type RepoHandle = Arc<Mutex<Repository>>;

/// Why a sync operation changed nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoOpReason {
    /// The remote has no commits or lacks the upstream reference
    RemoteEmpty,
    /// Local and remote already agree
    AlreadyUpToDate,
    /// The worktree has no changes to commit
    EmptyCommit,
}

/// Result of [`Client::refresh`] and [`Client::update`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Something was fetched, committed or pushed
    Updated,
    /// Nothing to do
    NoOp(NoOpReason),
}

impl SyncOutcome {
    /// Check if anything changed
    #[inline]
    #[must_use]
    pub const fn is_updated(self) -> bool {
        matches!(self, Self::Updated)
    }
}

enum Binding {
    Unbound,
    Bound(Arc<dyn VirtualFs>),
    Open {
        fs: Arc<dyn VirtualFs>,
        repo: RepoHandle,
    },
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unbound => f.write_str("Unbound"),
            Self::Bound(fs) => f.debug_tuple("Bound").field(&fs.root()).finish(),
            Self::Open { fs, .. } => f.debug_struct("Open").field("root", &fs.root()).finish(),
        }
    }
}

/// References the remote holds, as seen through the last fetch
#[derive(Debug, Default)]
struct RemoteRefs {
    refs: Vec<String>,
    default_branch: Option<String>,
}

impl RemoteRefs {
    /// Remote branches and tags mirrored into `repo`, sorted
    fn collect(repo: &Repository) -> GitResult<Self> {
        let prefix = format!("refs/remotes/{DEFAULT_REMOTE_NAME}/");
        let mut refs = Vec::new();
        for reference in repo.references()? {
            let reference = reference?;
            let Some(name) = reference.name() else {
                continue;
            };
            match name.strip_prefix(&prefix) {
                Some("HEAD") => {}
                Some(branch) => refs.push(format!("refs/heads/{branch}")),
                None if name.starts_with("refs/tags/") => refs.push(name.to_string()),
                None => {}
            }
        }
        refs.sort();
        Ok(Self {
            refs,
            default_branch: None,
        })
    }
    fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    fn contains(&self, name: &str) -> bool {
        self.refs.iter().any(|r| r == name)
    }

    fn default_head(&self) -> Option<String> {
        self.default_branch
            .clone()
            .filter(|b| self.contains(b))
            .or_else(|| {
                ["refs/heads/main", "refs/heads/master"]
                    .into_iter()
                    .find(|b| self.contains(b))
                    .map(str::to_string)
            })
            .or_else(|| {
                self.refs
                    .iter()
                    .find(|r| r.starts_with("refs/heads/"))
                    .cloned()
            })
    }
}

/// Git client bound to one remote and one working tree
pub struct Client {
    options: ClientOptions,
    binding: Mutex<Binding>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("options", &self.options)
            .field("binding", &*self.binding.lock())
            .finish()
    }
}

impl Client {
    /// Create client; nothing is opened until first use
    ///
    /// # Errors
    /// - [`GitError::InvalidReference`] if `reference` is set but not a valid
    ///   full reference name
    /// - [`GitError::InvalidCommit`] if `commit` is set but not a hex object id
    pub fn new(options: ClientOptions) -> GitResult<Self> {
        if !options.reference.is_empty() && !Reference::is_valid_name(&options.reference) {
            return Err(GitError::InvalidReference(options.reference));
        }
        if !options.commit.is_empty()
            && (!options.commit.chars().all(|c| c.is_ascii_hexdigit())
                || Oid::from_str(&options.commit).is_err())
        {
            return Err(GitError::InvalidCommit(options.commit));
        }
        Ok(Self {
            options,
            binding: Mutex::new(Binding::Unbound),
        })
    }

    /// Client options
    #[inline]
    #[must_use]
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Filesystem hosting the working tree, if one is bound
    #[must_use]
    pub fn filesystem(&self) -> Option<Arc<dyn VirtualFs>> {
        match &*self.binding.lock() {
            Binding::Unbound => None,
            Binding::Bound(fs) | Binding::Open { fs, .. } => Some(Arc::clone(fs)),
        }
    }

    /// Bind a filesystem and open the repository on it
    ///
    /// An existing repository in `fs` is reused.
    ///
    /// # Errors
    /// - [`GitError::AlreadyOpen`] if a repository is already open
    /// - [`GitError::Setup`] wrapping any failure of [`Client::repository`]
    pub fn setup(&self, fs: Arc<dyn VirtualFs>) -> GitResult<()> {
        {
            let mut binding = self.binding.lock();
            if matches!(*binding, Binding::Open { .. }) {
                return Err(GitError::AlreadyOpen);
            }
            *binding = Binding::Bound(fs);
        }
        self.repository(&Context::background())
            .map(|_| ())
            .map_err(|e| GitError::setup(&self.options.url, e))
    }

    /// Open, clone or initialize the repository
    ///
    /// Concurrent callers serialize on the client and observe the same
    /// cached handle.
    ///
    /// # Errors
    /// Returns any filesystem, network or libgit2 failure
    pub fn repository(&self, ctx: &Context) -> GitResult<RepoHandle> {
        self.open(ctx).map(|(_, repo)| repo)
    }

    /// Filesystem of the opened working tree
    ///
    /// # Errors
    /// Same as [`Client::repository`]
    pub fn worktree(&self, ctx: &Context) -> GitResult<Arc<dyn VirtualFs>> {
        self.open(ctx).map(|(fs, _)| fs)
    }

    /// Fetch the upstream reference and fast-forward the worktree
    ///
    /// Local modifications the update does not touch are kept.
    ///
    /// # Errors
    /// - [`GitError::NonFastForward`] if local history diverged
    /// - [`GitError::UncommittedChanges`] if local modifications would be
    ///   overwritten; nothing is changed in that case
    /// - [`GitError::Cancelled`] if `ctx` is done
    pub fn refresh(&self, ctx: &Context) -> GitResult<SyncOutcome> {
        let handle = self.repository(ctx)?;
        let repo = handle.lock();
        let local = head_ref(&repo)?;
        let upstream = upstream_of(&repo, &local)?;

        self.fetch_all(ctx, &repo)?;
        let Some(target) = reference_oid(&repo, &tracking_ref(&upstream))? else {
            tracing::debug!("Remote has no {}, nothing to refresh", upstream);
            return Ok(SyncOutcome::NoOp(NoOpReason::RemoteEmpty));
        };
        let fetched = repo.find_annotated_commit(target)?;
        let (analysis, _) = repo.merge_analysis(&[&fetched])?;

        if analysis.is_up_to_date() {
            tracing::debug!("{} already up to date", local);
            return Ok(SyncOutcome::NoOp(NoOpReason::AlreadyUpToDate));
        }
        if !analysis.is_fast_forward() && !analysis.is_unborn() {
            return Err(GitError::NonFastForward(upstream));
        }

        let commit = repo.find_commit(target)?;
        let mut checkout = CheckoutBuilder::new();
        checkout.safe();
        match repo.checkout_tree(commit.as_object(), Some(&mut checkout)) {
            Ok(()) => {}
            Err(e) if e.code() == ErrorCode::Conflict => {
                return Err(GitError::UncommittedChanges(upstream));
            }
            Err(e) => return Err(e.into()),
        }

        match repo.find_reference(&local) {
            Ok(mut reference) => {
                reference.set_target(target, "refresh: fast-forward")?;
            }
            Err(e) if e.code() == ErrorCode::NotFound => {
                repo.reference(&local, target, true, "refresh: fast-forward")?;
            }
            Err(e) => return Err(e.into()),
        }
        repo.set_head(&local)?;
        tracing::info!("Fast-forwarded {} to {}", local, target);
        Ok(SyncOutcome::Updated)
    }

    /// Stage all changes, commit and optionally push
    ///
    /// # Errors
    /// - [`GitError::PushRejected`] if the remote refuses the update
    /// - [`GitError::Cancelled`] if `ctx` is done
    pub fn update(&self, ctx: &Context, message: &str, push: bool) -> GitResult<SyncOutcome> {
        let handle = self.repository(ctx)?;
        let repo = handle.lock();

        let mut index = repo.index()?;
        index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
        index.update_all(["*"].iter(), None)?;
        index.write()?;
        let tree_id = index.write_tree()?;

        let parent = match repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
                None
            }
            Err(e) => return Err(e.into()),
        };
        let unchanged = match &parent {
            Some(parent) => parent.tree_id() == tree_id,
            None => index.is_empty(),
        };
        if unchanged {
            tracing::debug!("Nothing to commit");
            return Ok(SyncOutcome::NoOp(NoOpReason::EmptyCommit));
        }

        let tree = repo.find_tree(tree_id)?;
        let signature = signature(&repo)?;
        let parents: Vec<&Commit<'_>> = parent.iter().collect();
        let oid = repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?;
        tracing::info!("Committed {}", oid);

        if !push {
            return Ok(SyncOutcome::Updated);
        }
        self.push(ctx, &repo)
    }

    /// Entries at the worktree root, without the repository storage
    ///
    /// # Errors
    /// Returns any failure of [`Client::repository`] or of listing the root
    pub fn top_level_dirs(&self, ctx: &Context) -> GitResult<Vec<FsEntry>> {
        let fs = self.worktree(ctx)?;
        let mut entries = fs.read_dir(Path::new(""))?;
        entries.retain(|e| e.name != GIT_DIR_NAME);
        Ok(entries)
    }

    fn open(&self, ctx: &Context) -> GitResult<(Arc<dyn VirtualFs>, RepoHandle)> {
        let mut binding = self.binding.lock();
        let fs: Arc<dyn VirtualFs> = match &*binding {
            Binding::Open { fs, repo } => return Ok((Arc::clone(fs), Arc::clone(repo))),
            Binding::Bound(fs) => Arc::clone(fs),
            Binding::Unbound => Arc::new(TempFs::new()?),
        };

        let repo = self.open_or_create(ctx, &GitFs::bridge(fs.as_ref()))?;
        self.apply_author(&repo)?;

        let repo = Arc::new(Mutex::new(repo));
        *binding = Binding::Open {
            fs: Arc::clone(&fs),
            repo: Arc::clone(&repo),
        };
        Ok((fs, repo))
    }

    fn open_or_create(&self, ctx: &Context, git_fs: &GitFs) -> GitResult<Repository> {
        if let Some(repo) = git_fs.open()? {
            tracing::debug!("Opened existing repository at {}", git_fs.worktree().display());
            return Ok(repo);
        }

        ctx.check()?;
        let fresh = !git_fs.storage().exists();
        let result = self.create(ctx, git_fs);
        if result.is_err() && fresh {
            if let Err(e) = std::fs::remove_dir_all(git_fs.storage()) {
                tracing::warn!(
                    "Failed to remove partial repository {}: {}",
                    git_fs.storage().display(),
                    e
                );
            }
        }
        result
    }

    /// Initialize storage, mirror the remote and check out the upstream
    ///
    /// An empty remote leaves the repository without commits.
    fn create(&self, ctx: &Context, git_fs: &GitFs) -> GitResult<Repository> {
        let branch = self.initial_branch();
        let mut init = RepositoryInitOptions::new();
        init.initial_head(branch);
        let repo = Repository::init_opts(git_fs.worktree(), &init)?;
        repo.remote(DEFAULT_REMOTE_NAME, &self.options.url)?;
        self.fetch_all(ctx, &repo)?;

        let mut remote_refs = RemoteRefs::collect(&repo)?;
        if remote_refs.is_empty() {
            set_upstream(&repo, branch, branch)?;
            tracing::info!(
                "Remote {} is empty, initialized repository on {}",
                self.options.url,
                branch
            );
            return Ok(repo);
        }

        if self.options.reference.is_empty() {
            remote_refs.default_branch = self.remote_default_branch(ctx)?;
        }
        self.checkout_upstream(&repo, &remote_refs)?;
        Ok(repo)
    }

    /// Branch the worktree is initialized on
    fn initial_branch(&self) -> &str {
        if self.options.reference.starts_with("refs/heads/") {
            &self.options.reference
        } else {
            DEFAULT_WORKTREE_BRANCH
        }
    }

    /// Create the worktree branch at the upstream (or pinned) commit
    ///
    /// Files already present in the worktree are kept; they show up as
    /// local modifications of the checked out commit.
    fn checkout_upstream(&self, repo: &Repository, remote_refs: &RemoteRefs) -> GitResult<()> {
        let upstream = if self.options.reference.is_empty() {
            remote_refs
                .default_head()
                .ok_or_else(|| GitError::ReferenceNotFound("HEAD".to_string()))?
        } else if remote_refs.contains(&self.options.reference) {
            self.options.reference.clone()
        } else {
            return Err(GitError::ReferenceNotFound(self.options.reference.clone()));
        };

        let target = if self.options.commit.is_empty() {
            repo.find_reference(&tracking_ref(&upstream))?
                .peel_to_commit()?
                .id()
        } else {
            Oid::from_str(&self.options.commit)?
        };
        let commit = repo.find_commit(target)?;

        // HEAD is still unborn, so every file of the commit counts as added
        // and existing worktree files conflict instead of being replaced.
        let mut checkout = CheckoutBuilder::new();
        checkout.safe().allow_conflicts(true).recreate_missing(true);
        repo.checkout_tree(commit.as_object(), Some(&mut checkout))?;

        repo.branch(short_branch(DEFAULT_WORKTREE_BRANCH), &commit, true)?;
        repo.set_head(DEFAULT_WORKTREE_BRANCH)?;
        let mut index = repo.index()?;
        index.read_tree(&commit.tree()?)?;
        index.write()?;

        set_upstream(repo, DEFAULT_WORKTREE_BRANCH, &upstream)?;
        tracing::info!(
            "Cloned {} ({}), checked out {} on {}",
            self.options.url,
            upstream,
            target,
            DEFAULT_WORKTREE_BRANCH
        );
        Ok(())
    }

    fn apply_author(&self, repo: &Repository) -> GitResult<()> {
        let author = &self.options.author;
        if author.is_empty() {
            return Ok(());
        }
        let mut config = repo.config()?.open_level(ConfigLevel::Local)?;
        if let Some(name) = author.name.as_deref().filter(|n| !n.is_empty()) {
            config.set_str("user.name", name)?;
        }
        if let Some(email) = author.email.as_deref().filter(|e| !e.is_empty()) {
            config.set_str("user.email", email)?;
        }
        Ok(())
    }

    /// Default branch advertised by the remote, if any
    fn remote_default_branch(&self, ctx: &Context) -> GitResult<Option<String>> {
        ctx.check()?;
        let mut remote = Remote::create_detached(self.options.url.as_str())?;
        let connection = remote
            .connect_auth(
                Direction::Fetch,
                Some(remote::callbacks(ctx, &self.options.auth)),
                None,
            )
            .map_err(|e| ctx.git_error(e))?;
        Ok(connection
            .default_branch()
            .ok()
            .and_then(|b| b.as_str().map(str::to_string)))
    }

    /// Mirror all remote branches and tags
    fn fetch_all(&self, ctx: &Context, repo: &Repository) -> GitResult<()> {
        self.fetch(
            ctx,
            repo,
            &[
                format!("+refs/heads/*:refs/remotes/{DEFAULT_REMOTE_NAME}/*"),
                "+refs/tags/*:refs/tags/*".to_string(),
            ],
        )
    }

    fn fetch(&self, ctx: &Context, repo: &Repository, refspecs: &[String]) -> GitResult<()> {
        ctx.check()?;
        let mut remote = repo.find_remote(DEFAULT_REMOTE_NAME)?;
        let mut options = FetchOptions::new();
        options
            .remote_callbacks(remote::callbacks(ctx, &self.options.auth))
            .download_tags(AutotagOption::All);
        remote
            .fetch(refspecs, Some(&mut options), None)
            .map_err(|e| ctx.git_error(e))
    }

    fn push(&self, ctx: &Context, repo: &Repository) -> GitResult<SyncOutcome> {
        let local = head_ref(repo)?;
        let upstream = upstream_of(repo, &local)?;
        let tracking = tracking_ref(&upstream);
        let local_oid = repo.refname_to_id(&local)?;

        self.fetch_all(ctx, repo)?;
        if let Some(remote_oid) = reference_oid(repo, &tracking)? {
            if remote_oid == local_oid {
                tracing::debug!("{} already pushed", local);
                return Ok(SyncOutcome::NoOp(NoOpReason::AlreadyUpToDate));
            }
            if !repo.graph_descendant_of(local_oid, remote_oid)? {
                return Err(GitError::PushRejected {
                    reference: upstream,
                    status: "non-fast-forward".to_string(),
                });
            }
        }

        ctx.check()?;
        let rejected = RefCell::new(None);
        let mut callbacks = remote::callbacks(ctx, &self.options.auth);
        callbacks.push_update_reference(|reference, status| {
            if let Some(status) = status {
                *rejected.borrow_mut() = Some((reference.to_string(), status.to_string()));
            }
            Ok(())
        });
        let mut options = PushOptions::new();
        options.remote_callbacks(callbacks);

        let mut remote = repo.find_remote(DEFAULT_REMOTE_NAME)?;
        match remote.push(&[format!("{local}:{upstream}")], Some(&mut options)) {
            Ok(()) => {}
            Err(e) if e.code() == ErrorCode::NotFastForward => {
                return Err(GitError::PushRejected {
                    reference: upstream,
                    status: e.message().to_string(),
                })
            }
            Err(e) => return Err(ctx.git_error(e)),
        }
        if let Some((reference, status)) = rejected.take() {
            return Err(GitError::PushRejected { reference, status });
        }

        repo.reference(&tracking, local_oid, true, "push")?;
        tracing::info!("Pushed {} to {} {}", local, DEFAULT_REMOTE_NAME, upstream);
        Ok(SyncOutcome::Updated)
    }
}

fn short_branch(reference: &str) -> &str {
    reference.strip_prefix("refs/heads/").unwrap_or(reference)
}

/// Local name under which a remote reference is fetched
fn tracking_ref(upstream: &str) -> String {
    match upstream.strip_prefix("refs/heads/") {
        Some(branch) => format!("refs/remotes/{DEFAULT_REMOTE_NAME}/{branch}"),
        None => upstream.to_string(),
    }
}

fn reference_oid(repo: &Repository, name: &str) -> GitResult<Option<Oid>> {
    match repo.refname_to_id(name) {
        Ok(oid) => Ok(Some(oid)),
        Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn head_ref(repo: &Repository) -> GitResult<String> {
    repo.find_reference("HEAD")?
        .symbolic_target()
        .map(str::to_string)
        .ok_or_else(|| GitError::Git(git2::Error::from_str("HEAD is detached")))
}

fn set_upstream(repo: &Repository, local: &str, upstream: &str) -> GitResult<()> {
    let mut config = repo.config()?.open_level(ConfigLevel::Local)?;
    let branch = short_branch(local);
    config.set_str(&format!("branch.{branch}.remote"), DEFAULT_REMOTE_NAME)?;
    config.set_str(&format!("branch.{branch}.merge"), upstream)?;
    Ok(())
}

fn upstream_of(repo: &Repository, local: &str) -> GitResult<String> {
    let key = format!("branch.{}.merge", short_branch(local));
    match repo.config()?.get_string(&key) {
        Ok(upstream) => Ok(upstream),
        Err(e) if e.code() == ErrorCode::NotFound => Ok(local.to_string()),
        Err(e) => Err(e.into()),
    }
}

fn signature(repo: &Repository) -> GitResult<Signature<'static>> {
    match repo.signature() {
        Ok(signature) => Ok(signature),
        Err(e) if e.code() == ErrorCode::NotFound => {
            let config = repo.config()?;
            let value = |key: &str, fallback: &str| {
                config
                    .get_string(key)
                    .ok()
                    .filter(|v| !v.is_empty())
                    .unwrap_or_else(|| fallback.to_string())
            };
            let name = value("user.name", FALLBACK_AUTHOR_NAME);
            let email = value("user.email", FALLBACK_AUTHOR_EMAIL);
            tracing::warn!("Incomplete commit identity, committing as {} <{}>", name, email);
            Ok(Signature::now(&name, &email)?)
        }
        Err(e) => Err(e.into()),
    }
}
