//! Client lifecycle against local bare remotes

use ocmsync_git::constants::DEFAULT_WORKTREE_BRANCH;
use ocmsync_git::{Client, ClientOptions, Context, GitError, NoOpReason, OsFs, SyncOutcome};
use ocmsync_test_utils::{
    branch_tip, commit_count, commit_files, empty_remote, file_at_tip, seeded_remote,
};
use pretty_assertions::assert_eq;
use std::path::Path;
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::TempDir;

fn options(remote: &Path) -> ClientOptions {
    ClientOptions::new(remote.to_str().unwrap()).with_author("tester", "tester@example.com")
}

fn client_on(remote: &Path, reference: &str, worktree: &TempDir) -> Client {
    let client = Client::new(options(remote).with_ref(reference)).unwrap();
    client
        .setup(Arc::new(OsFs::new(worktree.path()).unwrap()))
        .unwrap();
    client
}

#[test]
fn empty_remote_initializes_without_commits() {
    let remote = empty_remote();
    let client = Client::new(options(remote.path())).unwrap();
    let ctx = Context::background();

    let repo = client.repository(&ctx).unwrap();
    assert_eq!(commit_count(&repo.lock()), 0);
    assert_eq!(
        client.refresh(&ctx).unwrap(),
        SyncOutcome::NoOp(NoOpReason::RemoteEmpty)
    );
}

#[test]
fn first_update_on_empty_remote_is_pushed() {
    let remote = empty_remote();
    let client = Client::new(options(remote.path())).unwrap();
    let ctx = Context::background();

    let fs = client.worktree(&ctx).unwrap();
    fs.write(Path::new("hello.txt"), b"hi").unwrap();
    assert_eq!(client.update(&ctx, "first", true).unwrap(), SyncOutcome::Updated);

    assert!(branch_tip(remote.path(), "ocm").is_some());
    assert_eq!(
        file_at_tip(remote.path(), "ocm", "hello.txt").as_deref(),
        Some(&b"hi"[..])
    );
}

#[test]
fn empty_remote_with_configured_branch_pushes_there() {
    let remote = empty_remote();
    let client = Client::new(options(remote.path()).with_ref("refs/heads/store")).unwrap();
    let ctx = Context::background();

    client
        .worktree(&ctx)
        .unwrap()
        .write(Path::new("a"), b"1")
        .unwrap();
    client.update(&ctx, "first", true).unwrap();

    assert!(branch_tip(remote.path(), "store").is_some());
    assert!(branch_tip(remote.path(), "ocm").is_none());
}

#[test]
fn clone_checks_out_dedicated_branch_at_head() {
    let (remote, head) = seeded_remote(&[("README", "seed")]);
    let worktree = TempDir::new().unwrap();
    let client = client_on(remote.path(), "refs/heads/main", &worktree);

    let repo = client.repository(&Context::background()).unwrap();
    {
        let repo = repo.lock();
        let current = repo.head().unwrap();
        assert_eq!(current.name(), Some(DEFAULT_WORKTREE_BRANCH));
        assert_eq!(current.target(), Some(head));
    }
    assert_eq!(std::fs::read(worktree.path().join("README")).unwrap(), b"seed");

    let again = client.repository(&Context::background()).unwrap();
    assert!(Arc::ptr_eq(&repo, &again));
}

#[test]
fn clone_without_reference_follows_remote_head() {
    let (remote, head) = seeded_remote(&[("README", "seed")]);
    let client = Client::new(options(remote.path())).unwrap();

    let repo = client.repository(&Context::background()).unwrap();
    assert_eq!(repo.lock().head().unwrap().target(), Some(head));
}

#[test]
fn clone_checks_out_pinned_commit() {
    let (remote, first) = seeded_remote(&[("v", "1")]);
    let bare = git2::Repository::open_bare(remote.path()).unwrap();
    commit_files(&bare, "main", &[("v", "2")], "second");

    let client = Client::new(
        options(remote.path())
            .with_ref("refs/heads/main")
            .with_commit(first.to_string()),
    )
    .unwrap();
    let ctx = Context::background();

    let repo = client.repository(&ctx).unwrap();
    assert_eq!(repo.lock().head().unwrap().target(), Some(first));
    assert_eq!(client.worktree(&ctx).unwrap().read(Path::new("v")).unwrap(), b"1");
}

#[test]
fn clone_reaches_commit_pinned_on_other_branch() {
    let (remote, _) = seeded_remote(&[("v", "main")]);
    let bare = git2::Repository::open_bare(remote.path()).unwrap();
    let side = commit_files(&bare, "side", &[("v", "side")], "side");

    let client = Client::new(
        options(remote.path())
            .with_ref("refs/heads/main")
            .with_commit(side.to_string()),
    )
    .unwrap();
    let ctx = Context::background();

    let repo = client.repository(&ctx).unwrap();
    assert_eq!(repo.lock().head().unwrap().target(), Some(side));
    assert_eq!(client.worktree(&ctx).unwrap().read(Path::new("v")).unwrap(), b"side");
}

#[test]
fn clone_keeps_existing_worktree_files() {
    let (remote, head) = seeded_remote(&[("README", "seed"), ("LICENSE", "mit")]);
    let worktree = TempDir::new().unwrap();
    std::fs::write(worktree.path().join("README"), b"pre-existing").unwrap();
    std::fs::write(worktree.path().join("notes"), b"mine").unwrap();

    let client = client_on(remote.path(), "refs/heads/main", &worktree);

    assert_eq!(
        std::fs::read(worktree.path().join("README")).unwrap(),
        b"pre-existing"
    );
    assert_eq!(std::fs::read(worktree.path().join("notes")).unwrap(), b"mine");
    assert_eq!(std::fs::read(worktree.path().join("LICENSE")).unwrap(), b"mit");
    let repo = client.repository(&Context::background()).unwrap();
    assert_eq!(repo.lock().head().unwrap().target(), Some(head));
}

#[test]
fn concurrent_callers_share_one_handle() {
    let (remote, head) = seeded_remote(&[("README", "seed")]);
    let client = Arc::new(Client::new(options(remote.path())).unwrap());
    let start = Arc::new(Barrier::new(8));

    let threads: Vec<_> = (0..8)
        .map(|_| {
            let client = Arc::clone(&client);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                client.repository(&Context::background()).unwrap()
            })
        })
        .collect();
    let handles: Vec<_> = threads.into_iter().map(|t| t.join().unwrap()).collect();

    for handle in &handles[1..] {
        assert!(Arc::ptr_eq(&handles[0], handle));
    }
    assert!(Arc::ptr_eq(
        &handles[0],
        &client.repository(&Context::background()).unwrap()
    ));
    assert_eq!(handles[0].lock().head().unwrap().target(), Some(head));
}

#[test]
fn missing_reference_on_remote_fails() {
    let (remote, _) = seeded_remote(&[("README", "seed")]);
    let client = Client::new(options(remote.path()).with_ref("refs/heads/absent")).unwrap();
    assert!(matches!(
        client.repository(&Context::background()),
        Err(GitError::ReferenceNotFound(r)) if r == "refs/heads/absent"
    ));
}

#[test]
fn refresh_on_current_repository_changes_nothing() {
    let (remote, _) = seeded_remote(&[("README", "seed")]);
    let worktree = TempDir::new().unwrap();
    let client = client_on(remote.path(), "refs/heads/main", &worktree);

    assert_eq!(
        client.refresh(&Context::background()).unwrap(),
        SyncOutcome::NoOp(NoOpReason::AlreadyUpToDate)
    );
    assert_eq!(std::fs::read(worktree.path().join("README")).unwrap(), b"seed");
}

#[test]
fn refresh_fast_forwards_to_remote() {
    let (remote, _) = seeded_remote(&[("README", "seed")]);
    let worktree = TempDir::new().unwrap();
    let client = client_on(remote.path(), "refs/heads/main", &worktree);

    let bare = git2::Repository::open_bare(remote.path()).unwrap();
    let tip = commit_files(&bare, "main", &[("NEW", "fresh")], "advance");

    assert_eq!(
        client.refresh(&Context::background()).unwrap(),
        SyncOutcome::Updated
    );
    assert_eq!(std::fs::read(worktree.path().join("NEW")).unwrap(), b"fresh");
    let repo = client.repository(&Context::background()).unwrap();
    assert_eq!(repo.lock().head().unwrap().target(), Some(tip));
}

#[test]
fn refresh_rejects_diverged_history() {
    let (remote, _) = seeded_remote(&[("README", "seed")]);
    let worktree = TempDir::new().unwrap();
    let client = client_on(remote.path(), "refs/heads/main", &worktree);
    let ctx = Context::background();

    std::fs::write(worktree.path().join("local"), b"mine").unwrap();
    client.update(&ctx, "local", false).unwrap();
    let bare = git2::Repository::open_bare(remote.path()).unwrap();
    commit_files(&bare, "main", &[("remote", "theirs")], "remote");

    assert!(matches!(
        client.refresh(&ctx),
        Err(GitError::NonFastForward(r)) if r == "refs/heads/main"
    ));
}

#[test]
fn refresh_keeps_unrelated_local_edits() {
    let (remote, _) = seeded_remote(&[("README", "seed")]);
    let worktree = TempDir::new().unwrap();
    let client = client_on(remote.path(), "refs/heads/main", &worktree);

    std::fs::write(worktree.path().join("README"), b"my uncommitted edit").unwrap();
    let bare = git2::Repository::open_bare(remote.path()).unwrap();
    commit_files(&bare, "main", &[("OTHER", "theirs")], "other");

    assert_eq!(
        client.refresh(&Context::background()).unwrap(),
        SyncOutcome::Updated
    );
    assert_eq!(
        std::fs::read(worktree.path().join("README")).unwrap(),
        b"my uncommitted edit"
    );
    assert_eq!(std::fs::read(worktree.path().join("OTHER")).unwrap(), b"theirs");
}

#[test]
fn refresh_refuses_to_overwrite_local_edits() {
    let (remote, seed) = seeded_remote(&[("README", "seed")]);
    let worktree = TempDir::new().unwrap();
    let client = client_on(remote.path(), "refs/heads/main", &worktree);

    std::fs::write(worktree.path().join("README"), b"my uncommitted edit").unwrap();
    let bare = git2::Repository::open_bare(remote.path()).unwrap();
    commit_files(&bare, "main", &[("README", "theirs")], "conflict");

    let ctx = Context::background();
    assert!(matches!(
        client.refresh(&ctx),
        Err(GitError::UncommittedChanges(r)) if r == "refs/heads/main"
    ));
    assert_eq!(
        std::fs::read(worktree.path().join("README")).unwrap(),
        b"my uncommitted edit"
    );
    let repo = client.repository(&ctx).unwrap();
    assert_eq!(repo.lock().head().unwrap().target(), Some(seed));
}

#[test]
fn partial_author_keeps_configured_email() {
    let (remote, _) = seeded_remote(&[("README", "seed")]);
    let worktree = TempDir::new().unwrap();
    let client = Client::new(
        ClientOptions::new(remote.path().to_str().unwrap()).with_author("", "bot@example.com"),
    )
    .unwrap();
    client
        .setup(Arc::new(OsFs::new(worktree.path()).unwrap()))
        .unwrap();
    let ctx = Context::background();

    std::fs::write(worktree.path().join("README"), b"bot change").unwrap();
    assert_eq!(client.update(&ctx, "bot", false).unwrap(), SyncOutcome::Updated);

    let repo = client.repository(&ctx).unwrap();
    let repo = repo.lock();
    let commit = repo.head().unwrap().peel_to_commit().unwrap();
    assert_eq!(commit.author().email(), Some("bot@example.com"));
    assert!(!commit.author().name().unwrap_or_default().is_empty());
}

#[test]
fn first_push_from_empty_remote_is_cloned_by_next_client() {
    let remote = empty_remote();
    let ctx = Context::background();

    let first = Client::new(options(remote.path())).unwrap();
    first
        .worktree(&ctx)
        .unwrap()
        .write(Path::new("hello.txt"), b"hi")
        .unwrap();
    first.update(&ctx, "first", true).unwrap();
    assert_eq!(
        first.refresh(&ctx).unwrap(),
        SyncOutcome::NoOp(NoOpReason::AlreadyUpToDate)
    );

    let second = Client::new(options(remote.path()).with_ref(DEFAULT_WORKTREE_BRANCH)).unwrap();
    assert_eq!(
        second.worktree(&ctx).unwrap().read(Path::new("hello.txt")).unwrap(),
        b"hi"
    );
}

#[test]
fn update_pushes_to_upstream_branch() {
    let (remote, seed) = seeded_remote(&[("README", "seed")]);
    let worktree = TempDir::new().unwrap();
    let client = client_on(remote.path(), "refs/heads/main", &worktree);
    let ctx = Context::background();

    std::fs::write(worktree.path().join("README"), b"changed").unwrap();
    assert_eq!(client.update(&ctx, "change", true).unwrap(), SyncOutcome::Updated);

    let tip = branch_tip(remote.path(), "main").unwrap();
    assert_ne!(tip, seed);
    assert_eq!(
        file_at_tip(remote.path(), "main", "README").as_deref(),
        Some(&b"changed"[..])
    );
    let commit = git2::Repository::open_bare(remote.path())
        .unwrap()
        .find_commit(tip)
        .unwrap()
        .author()
        .name()
        .map(str::to_string);
    assert_eq!(commit.as_deref(), Some("tester"));
}

#[test]
fn update_without_changes_is_noop() {
    let (remote, _) = seeded_remote(&[("README", "seed")]);
    let worktree = TempDir::new().unwrap();
    let client = client_on(remote.path(), "refs/heads/main", &worktree);

    assert_eq!(
        client.update(&Context::background(), "nothing", true).unwrap(),
        SyncOutcome::NoOp(NoOpReason::EmptyCommit)
    );
}

#[test]
fn update_stages_deletions() {
    let (remote, _) = seeded_remote(&[("README", "seed"), ("gone", "x")]);
    let worktree = TempDir::new().unwrap();
    let client = client_on(remote.path(), "refs/heads/main", &worktree);

    std::fs::remove_file(worktree.path().join("gone")).unwrap();
    client.update(&Context::background(), "delete", true).unwrap();
    assert!(file_at_tip(remote.path(), "main", "gone").is_none());
    assert!(file_at_tip(remote.path(), "main", "README").is_some());
}

#[test]
fn update_without_push_keeps_remote() {
    let (remote, seed) = seeded_remote(&[("README", "seed")]);
    let worktree = TempDir::new().unwrap();
    let client = client_on(remote.path(), "refs/heads/main", &worktree);
    let ctx = Context::background();

    std::fs::write(worktree.path().join("README"), b"local").unwrap();
    assert_eq!(client.update(&ctx, "local", false).unwrap(), SyncOutcome::Updated);
    assert_eq!(branch_tip(remote.path(), "main"), Some(seed));

    std::fs::write(worktree.path().join("README"), b"later").unwrap();
    assert_eq!(client.update(&ctx, "later", true).unwrap(), SyncOutcome::Updated);
    assert_ne!(branch_tip(remote.path(), "main"), Some(seed));
}

#[test]
fn push_behind_remote_is_rejected() {
    let (remote, _) = seeded_remote(&[("README", "seed")]);
    let worktree = TempDir::new().unwrap();
    let client = client_on(remote.path(), "refs/heads/main", &worktree);

    let bare = git2::Repository::open_bare(remote.path()).unwrap();
    commit_files(&bare, "main", &[("remote", "theirs")], "remote");

    std::fs::write(worktree.path().join("local"), b"mine").unwrap();
    assert!(matches!(
        client.update(&Context::background(), "local", true),
        Err(GitError::PushRejected { .. })
    ));
}

#[test]
fn existing_worktree_is_reopened() {
    let (remote, _) = seeded_remote(&[("README", "seed")]);
    let worktree = TempDir::new().unwrap();
    let first = client_on(remote.path(), "refs/heads/main", &worktree);
    std::fs::write(worktree.path().join("local"), b"mine").unwrap();
    first.update(&Context::background(), "local", false).unwrap();
    let local_head = first
        .repository(&Context::background())
        .unwrap()
        .lock()
        .head()
        .unwrap()
        .target();
    drop(first);

    let second = client_on(remote.path(), "refs/heads/main", &worktree);
    let repo = second.repository(&Context::background()).unwrap();
    assert_eq!(repo.lock().head().unwrap().target(), local_head);
}

#[test]
fn setup_after_open_is_rejected() {
    let (remote, _) = seeded_remote(&[("README", "seed")]);
    let worktree = TempDir::new().unwrap();
    let client = client_on(remote.path(), "refs/heads/main", &worktree);

    let other = TempDir::new().unwrap();
    assert!(matches!(
        client.setup(Arc::new(OsFs::new(other.path()).unwrap())),
        Err(GitError::AlreadyOpen)
    ));
}

#[test]
fn setup_failure_names_url() {
    let missing = TempDir::new().unwrap().path().join("missing");
    let client = Client::new(options(&missing)).unwrap();
    let worktree = TempDir::new().unwrap();

    let err = client
        .setup(Arc::new(OsFs::new(worktree.path()).unwrap()))
        .unwrap_err();
    assert!(matches!(err, GitError::Setup { ref url, .. } if url == missing.to_str().unwrap()));
}

#[test]
fn cancelled_context_aborts_clone() {
    let (remote, _) = seeded_remote(&[("README", "seed")]);
    let client = Client::new(options(remote.path())).unwrap();
    let ctx = Context::background();
    ctx.cancel();

    let err = client.repository(&ctx).err().unwrap();
    assert!(err.is_cancelled());
    assert!(client.repository(&Context::background()).is_ok());
}

#[test]
fn top_level_dirs_hide_repository_storage() {
    let (remote, _) = seeded_remote(&[("README", "seed")]);
    let worktree = TempDir::new().unwrap();
    let client = client_on(remote.path(), "refs/heads/main", &worktree);
    std::fs::create_dir(worktree.path().join("blobs")).unwrap();

    let names: Vec<String> = client
        .top_level_dirs(&Context::background())
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, vec!["README".to_string(), "blobs".to_string()]);
}
