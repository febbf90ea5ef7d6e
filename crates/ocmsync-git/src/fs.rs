//! Virtual filesystems hosting a repository
//!
//! A [`VirtualFs`] is rooted at a directory; all paths are resolved below
//! that root and may not escape it. libgit2 needs real paths, so the
//! ephemeral default is a temporary directory ([`TempFs`]) rather than an
//! in-memory tree.

use crate::constants::GIT_DIR_NAME;
use crate::error::GitResult;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tempfile::TempDir;

/// Directory entry
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct FsEntry {
    /// File name
    pub name: String,
    /// Whether the entry is a directory
    pub is_dir: bool,
}

/// Filesystem rooted at a directory
pub trait VirtualFs: Send + Sync + fmt::Debug {
    /// Root directory
    fn root(&self) -> &Path;

    /// Resolve a path relative to the root
    ///
    /// Leading `/` is ignored; `..` components are rejected.
    ///
    /// # Errors
    /// Returns [`io::ErrorKind::InvalidInput`] for escaping paths
    fn resolve(&self, path: &Path) -> io::Result<PathBuf> {
        let mut resolved = self.root().to_path_buf();
        for component in path.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
                Component::ParentDir => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("path escapes filesystem root: {}", path.display()),
                    ))
                }
            }
        }
        Ok(resolved)
    }

    /// Read a file
    ///
    /// # Errors
    /// Returns [`io::ErrorKind::NotFound`] if the file is absent
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(self.resolve(path)?)
    }

    /// Write a file, creating parent directories
    ///
    /// # Errors
    /// Returns any I/O error
    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        let path = self.resolve(path)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, data)
    }

    /// Check if a path exists
    fn exists(&self, path: &Path) -> bool {
        self.resolve(path).is_ok_and(|p| p.exists())
    }

    /// Remove a file
    ///
    /// # Errors
    /// Returns any I/O error
    fn remove(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(self.resolve(path)?)
    }

    /// List a directory, sorted by name
    ///
    /// # Errors
    /// Returns any I/O error
    fn read_dir(&self, path: &Path) -> io::Result<Vec<FsEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(self.resolve(path)?)? {
            let entry = entry?;
            entries.push(FsEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: entry.file_type()?.is_dir(),
            });
        }
        entries.sort();
        Ok(entries)
    }
}

/// Filesystem over an existing host directory
#[derive(Debug, Clone)]
pub struct OsFs {
    root: PathBuf,
}

impl OsFs {
    /// Root at `root`, creating it if needed
    ///
    /// # Errors
    /// Returns error if the directory cannot be created
    pub fn new(root: impl Into<PathBuf>) -> GitResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }
}

impl VirtualFs for OsFs {
    fn root(&self) -> &Path {
        &self.root
    }
}

/// Filesystem over a temporary directory, removed on drop
#[derive(Debug)]
pub struct TempFs {
    dir: TempDir,
}

impl TempFs {
    /// Fresh empty temporary directory
    ///
    /// # Errors
    /// Returns error if the directory cannot be created
    pub fn new() -> GitResult<Self> {
        Ok(Self {
            dir: tempfile::Builder::new().prefix("ocmsync-").tempdir()?,
        })
    }
}

impl VirtualFs for TempFs {
    fn root(&self) -> &Path {
        self.dir.path()
    }
}

/// Worktree and storage locations of a repository hosted on a [`VirtualFs`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitFs {
    worktree: PathBuf,
    storage: PathBuf,
}

impl GitFs {
    /// Worktree at the filesystem root, storage in [`GIT_DIR_NAME`] below it
    #[must_use]
    pub fn bridge(fs: &dyn VirtualFs) -> Self {
        let worktree = fs.root().to_path_buf();
        let storage = worktree.join(GIT_DIR_NAME);
        Self { worktree, storage }
    }

    /// Worktree root
    #[inline]
    #[must_use]
    pub fn worktree(&self) -> &Path {
        &self.worktree
    }

    /// Repository storage directory
    #[inline]
    #[must_use]
    pub fn storage(&self) -> &Path {
        &self.storage
    }

    /// Open the repository if the storage exists
    ///
    /// # Errors
    /// Returns error if storage exists but cannot be opened
    pub fn open(&self) -> GitResult<Option<git2::Repository>> {
        if !self.storage.exists() {
            return Ok(None);
        }
        match git2::Repository::open(&self.worktree) {
            Ok(repo) => Ok(Some(repo)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
