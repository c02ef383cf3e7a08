//! Shared state for every repository operation.
//!
//! `VfsContext` bundles the configuration, the credential registry and the pull
//! throttle. Build one at the top of the application and pass it (or clones of
//! it) wherever repositories are opened; clones share the registry and throttle.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::error::{Result, VfsError};
use crate::git::credentials::{Credential, CredentialRegistry};
use crate::git::locator::{PathResolver, split_locator};
use crate::git::repository::RepositoryHandle;
use crate::git::throttle::PullThrottle;
use crate::models::AuthorshipIndex;

#[derive(Debug, Clone)]
pub struct VfsContext {
    config: Arc<Config>,
    resolver: PathResolver,
    credentials: Arc<CredentialRegistry>,
    throttle: Arc<PullThrottle>,
}

impl VfsContext {
    pub fn new(config: Config) -> Self {
        Self {
            resolver: PathResolver::new(config.mirror_root.clone()),
            throttle: Arc::new(PullThrottle::new(config.pull_cooldown)),
            credentials: Arc::new(CredentialRegistry::new()),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn credentials(&self) -> &CredentialRegistry {
        &self.credentials
    }

    pub fn throttle(&self) -> &PullThrottle {
        &self.throttle
    }

    pub fn register_credential(&self, user: &str, host: &str, credential: Credential) -> Result<()> {
        self.credentials.register(user, host, credential)
    }

    pub fn open(&self, locator: &str) -> Result<RepositoryHandle> {
        RepositoryHandle::open(self, locator)
    }

    pub fn local_path(&self, locator: &str) -> Result<PathBuf> {
        self.resolver.local_path(locator)
    }

    /// Contents of the file a locator points at.
    pub fn read_file(&self, locator: &str) -> Result<Vec<u8>> {
        let relative = file_part(locator)?;
        self.open(locator)?.read(relative)
    }

    /// Writes and stages a file; nothing is committed.
    pub fn write_file(&self, locator: &str, content: &[u8]) -> Result<()> {
        let relative = file_part(locator)?;
        self.open(locator)?.write(relative, content)
    }

    /// Deletes and stages the removal of each file, in order.
    pub fn delete_files<S: AsRef<str>>(&self, locators: &[S]) -> Result<()> {
        for locator in locators {
            let locator = locator.as_ref();
            let relative = file_part(locator)?;
            self.open(locator)?.delete(&[relative])?;
        }
        Ok(())
    }

    pub fn exists(&self, locator: &str) -> Result<bool> {
        let relative = file_part(locator)?;
        self.open(locator)?.exists(relative)
    }

    pub fn authorship(&self, locator: &str) -> Result<AuthorshipIndex> {
        let relative = file_part(locator)?;
        self.open(locator)?.authorship(relative)
    }

    /// Commits and pushes all pending changes of a locator's repository as the
    /// configured default author.
    pub fn push(&self, locator: &str, message: &str) -> Result<()> {
        self.open(locator)?
            .commit_and_push(message, &self.config.default_author)
    }
}

impl Default for VfsContext {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

fn file_part(locator: &str) -> Result<&str> {
    match split_locator(locator) {
        ("", _) => Err(VfsError::InvalidAddress(locator.to_string())),
        (_, "") => Err(VfsError::InvalidPath(format!("{} names no file", locator))),
        (_, relative) => Ok(relative),
    }
}
