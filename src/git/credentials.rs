//! Credential storage and selection.
//!
//! Credentials are registered per `(user, host)` and looked up either directly
//! from a repository address or by scanning a repository's configured remotes.
//! The registry only stores and selects; the handshake itself is libgit2's job,
//! driven through `remote_callbacks`.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::RwLock;

use git2::{Cred, CredentialType, RemoteCallbacks};

use crate::error::{Result, VfsError};
use crate::git::address::RepositoryAddress;
use crate::models::RemoteSpec;

/// libgit2 re-invokes the credentials callback after a rejection.
const MAX_CREDENTIAL_ATTEMPTS: usize = 3;

/// Authentication material for one `(user, host)` pair.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    SshKey {
        username: String,
        public_key: Option<PathBuf>,
        private_key: PathBuf,
        passphrase: Option<String>,
    },
    SshAgent {
        username: String,
    },
    UserPass {
        username: String,
        password: String,
    },
}

impl Credential {
    pub fn ssh_key(username: impl Into<String>, private_key: impl Into<PathBuf>) -> Self {
        Credential::SshKey {
            username: username.into(),
            public_key: None,
            private_key: private_key.into(),
            passphrase: None,
        }
    }

    pub fn user_pass(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credential::UserPass {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        match self {
            Credential::SshKey { username, .. }
            | Credential::SshAgent { username }
            | Credential::UserPass { username, .. } => username,
        }
    }

    fn to_cred(&self, username_from_url: Option<&str>, allowed: CredentialType) -> std::result::Result<Cred, git2::Error> {
        let username = username_from_url.unwrap_or(self.username());
        if allowed.contains(CredentialType::USERNAME) {
            return Cred::username(username);
        }
        match self {
            Credential::SshKey {
                public_key,
                private_key,
                passphrase,
                ..
            } => Cred::ssh_key(
                username,
                public_key.as_deref(),
                private_key,
                passphrase.as_deref(),
            ),
            Credential::SshAgent { .. } => Cred::ssh_key_from_agent(username),
            Credential::UserPass { username, password } => Cred::userpass_plaintext(username, password),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::SshKey {
                username,
                private_key,
                ..
            } => f
                .debug_struct("SshKey")
                .field("username", username)
                .field("private_key", private_key)
                .field("passphrase", &"****")
                .finish(),
            Credential::SshAgent { username } => f.debug_struct("SshAgent").field("username", username).finish(),
            Credential::UserPass { username, .. } => f
                .debug_struct("UserPass")
                .field("username", username)
                .field("password", &"****")
                .finish(),
        }
    }
}

/// Callbacks for fetch/push. Without a credential the operation runs anonymously.
pub fn remote_callbacks(credential: Option<&Credential>) -> RemoteCallbacks<'_> {
    let mut callbacks = RemoteCallbacks::new();
    if let Some(credential) = credential {
        let mut attempts = 0;
        callbacks.credentials(move |url, username_from_url, allowed| {
            attempts += 1;
            if attempts > MAX_CREDENTIAL_ATTEMPTS {
                tracing::warn!("credentials for {} rejected {} times", url, MAX_CREDENTIAL_ATTEMPTS);
                return Err(git2::Error::from_str("authentication failed: credentials rejected"));
            }
            credential.to_cred(username_from_url, allowed)
        });
    }
    callbacks
}

/// Outcome of scanning a repository's remotes for a usable credential.
#[derive(Debug, Clone, Default)]
pub struct CredentialResolution {
    /// Credential of the first remote address with a registered `(user, host)`.
    pub credential: Option<Credential>,
    /// That address, or the last address examined when nothing matched.
    pub address: Option<RepositoryAddress>,
}

impl CredentialResolution {
    pub fn found(&self) -> bool {
        self.credential.is_some()
    }
}

/// Concurrent `(user, host) -> Credential` map. The latest registration wins.
#[derive(Debug, Default)]
pub struct CredentialRegistry {
    credentials: RwLock<HashMap<(String, String), Credential>>,
}

impl CredentialRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, user: &str, host: &str, credential: Credential) -> Result<()> {
        let mut map = self
            .credentials
            .write()
            .map_err(|_| VfsError::Internal("Lock poisoned".to_string()))?;
        map.insert((user.to_string(), host.to_string()), credential);
        tracing::debug!("registered credential for {}@{}", user, host);
        Ok(())
    }

    pub fn get(&self, user: &str, host: &str) -> Option<Credential> {
        let map = self.credentials.read().ok()?;
        map.get(&(user.to_string(), host.to_string())).cloned()
    }

    pub fn remove(&self, user: &str, host: &str) -> Option<Credential> {
        let mut map = self.credentials.write().ok()?;
        map.remove(&(user.to_string(), host.to_string()))
    }

    pub fn len(&self) -> usize {
        self.credentials.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Credential registered for an address's own `(user, host)`.
    pub fn get_for_address(&self, address: &RepositoryAddress) -> Option<Credential> {
        self.get(address.username(), address.host())
    }

    /// Walks remotes in declaration order, and each remote's addresses in order,
    /// returning the first address that has a registered credential.
    ///
    /// Addresses that do not parse are skipped. When nothing matches, the last
    /// parsed address is returned without a credential so the caller can still
    /// try anonymously.
    pub fn resolve_for_repository(&self, remotes: &[RemoteSpec]) -> CredentialResolution {
        let mut last = None;
        for remote in remotes {
            for url in &remote.urls {
                let address = match RepositoryAddress::parse(url) {
                    Ok(address) => address,
                    Err(e) => {
                        tracing::debug!("skipping remote {} address {}: {}", remote.name, url, e);
                        continue;
                    }
                };
                if let Some(credential) = self.get_for_address(&address) {
                    return CredentialResolution {
                        credential: Some(credential),
                        address: Some(address),
                    };
                }
                last = Some(address);
            }
        }
        CredentialResolution {
            credential: None,
            address: last,
        }
    }
}
