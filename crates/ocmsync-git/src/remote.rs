//! libgit2 remote callbacks: credentials and cancellation

use crate::constants::MAX_CREDENTIAL_ATTEMPTS;
use crate::context::Context;
use crate::options::AuthMethod;
use git2::{Cred, CredentialType, RemoteCallbacks};

/// Callbacks presenting `auth` and aborting once `ctx` is done
pub(crate) fn callbacks<'a>(ctx: &'a Context, auth: &'a AuthMethod) -> RemoteCallbacks<'a> {
    let mut callbacks = RemoteCallbacks::new();
    let mut attempts = 0;
    callbacks.credentials(move |url, username_from_url, allowed| {
        if ctx.is_done() {
            return Err(git2::Error::from_str("operation cancelled"));
        }
        attempts += 1;
        if attempts > MAX_CREDENTIAL_ATTEMPTS {
            return Err(git2::Error::from_str(&format!(
                "authentication to {url} failed after {MAX_CREDENTIAL_ATTEMPTS} attempts"
            )));
        }
        credentials(auth, username_from_url, allowed)
    });
    callbacks.transfer_progress(move |_| !ctx.is_done());
    callbacks.sideband_progress(move |_| !ctx.is_done());
    callbacks.push_negotiation(move |_| {
        if ctx.is_done() {
            Err(git2::Error::from_str("operation cancelled"))
        } else {
            Ok(())
        }
    });
    callbacks
}

fn credentials(
    auth: &AuthMethod,
    username_from_url: Option<&str>,
    allowed: CredentialType,
) -> Result<Cred, git2::Error> {
    match auth {
        AuthMethod::UserPassword { username, password }
            if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) =>
        {
            Cred::userpass_plaintext(username, password)
        }
        AuthMethod::SshKey { username, .. } | AuthMethod::SshAgent { username }
            if allowed.contains(CredentialType::USERNAME) =>
        {
            Cred::username(username_from_url.unwrap_or(username))
        }
        AuthMethod::SshKey {
            username,
            private_key,
            passphrase,
        } if allowed.contains(CredentialType::SSH_KEY) => Cred::ssh_key(
            username_from_url.unwrap_or(username),
            None,
            private_key,
            passphrase.as_deref(),
        ),
        AuthMethod::SshAgent { username } if allowed.contains(CredentialType::SSH_KEY) => {
            Cred::ssh_key_from_agent(username_from_url.unwrap_or(username))
        }
        _ if allowed.contains(CredentialType::DEFAULT) => Cred::default(),
        _ => Err(git2::Error::from_str(
            "remote requires credentials not provided by the configured auth method",
        )),
    }
}
