//! Client configuration

use crate::error::GitResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Commit identity; each part falls back to git config when unset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Author {
    /// Check if neither part is set
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        let unset = |part: &Option<String>| part.as_deref().map_or(true, str::is_empty);
        unset(&self.name) && unset(&self.email)
    }
}

/// Credentials presented to the remote
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AuthMethod {
    /// Anonymous access
    #[default]
    None,
    /// HTTP basic credentials
    UserPassword { username: String, password: String },
    /// SSH private key file
    SshKey {
        username: String,
        #[serde(rename = "privateKey")]
        private_key: PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        passphrase: Option<String>,
    },
    /// Keys held by a running SSH agent
    SshAgent { username: String },
}

impl fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::UserPassword { username, .. } => f
                .debug_struct("UserPassword")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::SshKey {
                username,
                private_key,
                ..
            } => f
                .debug_struct("SshKey")
                .field("username", username)
                .field("private_key", private_key)
                .finish_non_exhaustive(),
            Self::SshAgent { username } => f
                .debug_struct("SshAgent")
                .field("username", username)
                .finish(),
        }
    }
}

/// Options of a [`Client`](crate::Client)
///
/// # Example
///
/// ```rust
/// use ocmsync_git::ClientOptions;
///
/// let opts = ClientOptions::from_yaml(
///     "url: https://example.com/repo.git\nref: refs/heads/main\nauthor:\n  name: bot\n",
/// )
/// .unwrap();
/// assert_eq!(opts.reference, "refs/heads/main");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientOptions {
    /// Remote URL or local path
    pub url: String,
    /// Full reference to follow (`refs/heads/<b>` or `refs/tags/<t>`);
    /// empty means the remote's default branch
    #[serde(rename = "ref", skip_serializing_if = "String::is_empty")]
    pub reference: String,
    /// Commit to check out instead of the reference head
    #[serde(skip_serializing_if = "String::is_empty")]
    pub commit: String,
    #[serde(skip_serializing_if = "Author::is_empty")]
    pub author: Author,
    pub auth: AuthMethod,
}

impl ClientOptions {
    /// Options for a remote URL
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Parse options from YAML (or JSON)
    ///
    /// # Errors
    /// Returns [`GitError::Options`](crate::GitError::Options) on malformed input
    pub fn from_yaml(data: &str) -> GitResult<Self> {
        Ok(serde_yaml::from_str(data)?)
    }

    /// Replace the remote URL
    #[inline]
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the full reference name to track
    #[inline]
    #[must_use]
    pub fn with_ref(mut self, reference: impl Into<String>) -> Self {
        self.reference = reference.into();
        self
    }

    /// Pin the initial checkout to a commit
    #[inline]
    #[must_use]
    pub fn with_commit(mut self, commit: impl Into<String>) -> Self {
        self.commit = commit.into();
        self
    }

    /// Set the commit identity; empty parts are left to git config
    #[inline]
    #[must_use]
    pub fn with_author(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        let part = |value: String| Some(value).filter(|v| !v.is_empty());
        self.author = Author {
            name: part(name.into()),
            email: part(email.into()),
        };
        self
    }

    /// Set the credentials presented to the remote
    #[inline]
    #[must_use]
    pub fn with_auth(mut self, auth: AuthMethod) -> Self {
        self.auth = auth;
        self
    }
}
