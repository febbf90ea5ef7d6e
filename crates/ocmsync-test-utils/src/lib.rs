//! Testing utilities for ocmsync workspace
//!
//! Shared fixtures: sample descriptors, prepared manifests and git remotes.

#![allow(missing_docs)]

use git2::{Commit, Oid, Repository, Signature};
use ocmsync_blob::{Blob, ManifestAccess, MemoryManifestAccess};
use ocmsync_state::compdesc::{ElementMeta, Label, Resource, ResourceRelation};
use ocmsync_state::ComponentDescriptor;
use std::path::Path;
use tempfile::TempDir;

pub const SAMPLE_NAME: &str = "acme.org/sample";
pub const SAMPLE_VERSION: &str = "1.0.0";

pub fn sample_descriptor() -> ComponentDescriptor {
    let mut desc = ComponentDescriptor::new(SAMPLE_NAME, SAMPLE_VERSION);
    desc.component.provider = "acme".to_string();
    desc.set_label(Label::new("team", "platform"));
    desc.set_resource(Resource {
        meta: ElementMeta::new("chart", "1.0.0"),
        resource_type: "helmChart".to_string(),
        relation: ResourceRelation::Local,
        access: serde_json::json!({"type": "localBlob", "localReference": "sha256:00"}),
    });
    desc
}

/// Manifest whose config blob carries the given media type
pub fn manifest_with_config(media_type: &str) -> MemoryManifestAccess {
    let mut access = MemoryManifestAccess::empty();
    let config = Blob::new(media_type, b"{}".to_vec());
    access.add_blob(&config).unwrap();
    access.manifest_mut().config = Some(config.descriptor());
    access
}

/// Bare repository without any commits
pub fn empty_remote() -> TempDir {
    let dir = TempDir::new().unwrap();
    Repository::init_bare(dir.path()).unwrap();
    dir
}

/// Bare repository with one commit on `refs/heads/main`, HEAD pointing at it
pub fn seeded_remote(files: &[(&str, &str)]) -> (TempDir, Oid) {
    let dir = empty_remote();
    let repo = Repository::open_bare(dir.path()).unwrap();
    let oid = commit_files(&repo, "main", files, "initial");
    repo.set_head("refs/heads/main").unwrap();
    (dir, oid)
}

/// Commit top-level files on top of `branch` in any repository
pub fn commit_files(repo: &Repository, branch: &str, files: &[(&str, &str)], message: &str) -> Oid {
    let refname = format!("refs/heads/{branch}");
    let parent = repo
        .find_reference(&refname)
        .ok()
        .and_then(|r| r.peel_to_commit().ok());
    let base = parent.as_ref().map(|c| c.tree().unwrap());

    let mut builder = repo.treebuilder(base.as_ref()).unwrap();
    for (name, data) in files {
        let blob = repo.blob(data.as_bytes()).unwrap();
        builder.insert(name, blob, 0o100_644).unwrap();
    }
    let tree = repo.find_tree(builder.write().unwrap()).unwrap();
    let sig = Signature::now("fixture", "fixture@example.com").unwrap();
    let parents: Vec<&Commit<'_>> = parent.iter().collect();
    repo.commit(Some(&refname), &sig, &sig, message, &tree, &parents)
        .unwrap()
}

/// Tip of a branch in the repository at `path`
pub fn branch_tip(path: &Path, branch: &str) -> Option<Oid> {
    let repo = Repository::open(path).unwrap();
    let reference = repo.find_reference(&format!("refs/heads/{branch}")).ok()?;
    reference.target()
}

/// Content of a top-level file at the tip of a branch
pub fn file_at_tip(path: &Path, branch: &str, file: &str) -> Option<Vec<u8>> {
    let repo = Repository::open(path).unwrap();
    let commit = repo
        .find_reference(&format!("refs/heads/{branch}"))
        .ok()?
        .peel_to_commit()
        .ok()?;
    let entry = commit.tree().ok()?.get_name(file)?.to_object(&repo).ok()?;
    entry.as_blob().map(|b| b.content().to_vec())
}

/// Number of commits reachable from HEAD, zero for an unborn HEAD
pub fn commit_count(repo: &Repository) -> usize {
    let Ok(head) = repo.head() else { return 0 };
    let Some(oid) = head.target() else { return 0 };
    let mut walk = repo.revwalk().unwrap();
    walk.push(oid).unwrap();
    walk.count()
}
