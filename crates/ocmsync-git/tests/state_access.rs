//! Component descriptor state persisted in a git working tree

use ocmsync_git::{Client, ClientOptions, GitStateAccess, OsFs};
use ocmsync_state::compdesc::{self, Label};
use ocmsync_state::{
    AccessMode, CommitOutcome, ComponentStateHandler, State, StateAccess, StateError,
    COMPONENT_DESCRIPTOR_FILE_NAME,
};
use ocmsync_test_utils::{
    branch_tip, empty_remote, file_at_tip, sample_descriptor, seeded_remote, SAMPLE_NAME,
    SAMPLE_VERSION,
};
use pretty_assertions::assert_eq;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn client(remote: &Path, worktree: &TempDir) -> Arc<Client> {
    let client = Client::new(
        ClientOptions::new(remote.to_str().unwrap()).with_author("tester", "tester@example.com"),
    )
    .unwrap();
    client
        .setup(Arc::new(OsFs::new(worktree.path()).unwrap()))
        .unwrap();
    Arc::new(client)
}

fn state(access: GitStateAccess) -> State<GitStateAccess, ComponentStateHandler> {
    State::new(
        AccessMode::ReadWrite,
        access,
        ComponentStateHandler::new(SAMPLE_NAME, SAMPLE_VERSION),
    )
}

#[test]
fn missing_file_is_not_found() {
    let remote = empty_remote();
    let worktree = TempDir::new().unwrap();
    let access = GitStateAccess::new(client(remote.path(), &worktree));

    assert!(matches!(access.get(), Err(StateError::NotFound)));
    assert!(access.digest().is_none());
}

#[test]
fn write_commits_and_pushes_descriptor() {
    let remote = empty_remote();
    let worktree = TempDir::new().unwrap();
    let mut state = state(GitStateAccess::new(client(remote.path(), &worktree)));

    *state.get_mut().unwrap() = sample_descriptor();
    assert_eq!(state.write().unwrap(), CommitOutcome::Updated);
    assert_eq!(state.write().unwrap(), CommitOutcome::NoOp);

    let pushed = file_at_tip(remote.path(), "ocm", COMPONENT_DESCRIPTOR_FILE_NAME).unwrap();
    assert_eq!(compdesc::decode(&pushed).unwrap(), sample_descriptor());
    assert!(state.digest().is_some());
}

#[test]
fn descriptor_survives_a_fresh_clone() {
    let (remote, _) = seeded_remote(&[("README", "seed")]);

    let first = TempDir::new().unwrap();
    let mut writer = state(GitStateAccess::new(client(remote.path(), &first)));
    writer
        .get_mut()
        .unwrap()
        .set_label(Label::new("stage", "release"));
    writer.write().unwrap();

    let second = TempDir::new().unwrap();
    let mut reader = state(GitStateAccess::new(client(remote.path(), &second)));
    let desc = reader.read().unwrap();
    assert_eq!(desc.component.labels, vec![Label::new("stage", "release")]);
}

#[test]
fn unpushed_writes_stay_local() {
    let (remote, seed) = seeded_remote(&[("README", "seed")]);
    let worktree = TempDir::new().unwrap();
    let mut state = state(
        GitStateAccess::new(client(remote.path(), &worktree))
            .with_push(false)
            .with_message("local only"),
    );

    state.write().unwrap();
    assert_eq!(branch_tip(remote.path(), "main"), Some(seed));
    assert!(worktree.path().join(COMPONENT_DESCRIPTOR_FILE_NAME).exists());
}

#[test]
fn custom_path_is_used() {
    let remote = empty_remote();
    let worktree = TempDir::new().unwrap();
    let mut state = state(
        GitStateAccess::new(client(remote.path(), &worktree)).with_path("descriptors/cd.yaml"),
    );

    state.write().unwrap();
    assert!(worktree.path().join("descriptors/cd.yaml").exists());
}
