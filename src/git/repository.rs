use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{BranchType, ErrorCode, FetchOptions, ObjectType, Repository};

use crate::context::VfsContext;
use crate::error::{Result, VfsError};
use crate::git::address::RepositoryAddress;
use crate::git::credentials::{Credential, remote_callbacks};
use crate::git::locator::{normalize_relative_path, split_locator};
use crate::git::sync::PullOutcome;
use crate::models::RemoteSpec;

/// Name given to the remote a mirror was cloned from.
pub const REMOTE_NAME: &str = "origin";

/// A session over one local mirror.
///
/// Credential, remote address and branch are resolved once in `open` and never
/// change afterwards. Handles on the same mirror are not serialized against each
/// other; callers keep to one writer per mirror.
pub struct RepositoryHandle {
    repo: Mutex<Repository>,
    context: VfsContext,
    address: RepositoryAddress,
    mirror_dir: PathBuf,
    pub(crate) remote_url: String,
    pub(crate) credential: Option<Credential>,
    pub(crate) branch: String,
}

impl RepositoryHandle {
    /// Opens the mirror for a locator's repository, cloning it first if absent.
    pub fn open(context: &VfsContext, locator: &str) -> Result<Self> {
        let address_str = match split_locator(locator) {
            ("", _) => locator,
            (address, _) => address,
        };
        let address = RepositoryAddress::parse(address_str)?;
        let mirror_dir = context.resolver().mirror_dir(address_str)?;
        let direct = context.credentials().get_for_address(&address);

        let repo = match Repository::open(&mirror_dir) {
            Ok(repo) => repo,
            Err(e) if e.code() == ErrorCode::NotFound || !mirror_dir.exists() => {
                clone_mirror(&address, &mirror_dir, direct.as_ref())?
            }
            Err(e) => return Err(e.into()),
        };

        let branch = head_branch(&repo)?;

        let (credential, remote_url) = match direct {
            Some(credential) => {
                tracing::debug!("using credential registered for {}@{}", address.username(), address.host());
                (Some(credential), address.as_str().to_string())
            }
            None => {
                let remotes = RemoteSpec::list(&repo)?;
                let resolution = context.credentials().resolve_for_repository(&remotes);
                if resolution.found() {
                    tracing::debug!("using credential resolved from remotes of {}", mirror_dir.display());
                } else {
                    tracing::debug!("no credential for {}, continuing anonymously", address);
                }
                let remote_url = resolution
                    .address
                    .map(|a| a.as_str().to_string())
                    .unwrap_or_else(|| address.as_str().to_string());
                (resolution.credential, remote_url)
            }
        };

        Ok(Self {
            repo: Mutex::new(repo),
            context: context.clone(),
            address,
            mirror_dir,
            remote_url,
            credential,
            branch,
        })
    }

    pub fn with_repo<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Repository) -> Result<T>,
    {
        let repo = self.repo.lock().map_err(|_| VfsError::Internal("Lock poisoned".to_string()))?;
        f(&repo)
    }

    pub fn address(&self) -> &RepositoryAddress {
        &self.address
    }

    pub fn mirror_dir(&self) -> &Path {
        &self.mirror_dir
    }

    /// Branch HEAD pointed at when the handle was opened.
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Address used for pull and push.
    pub fn remote_url(&self) -> &str {
        &self.remote_url
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    /// Reads a file from the working tree, refreshing the mirror first unless
    /// the pull throttle says a refresh happened recently.
    pub fn read(&self, relative: &str) -> Result<Vec<u8>> {
        let relative = normalize_relative_path(relative)?;

        let key = self.mirror_dir.to_string_lossy();
        if self.context.throttle().allow(&key) {
            tracing::debug!("refreshing {}", key);
            self.checkout()?;
            if self.pull()? == PullOutcome::NonFastForward {
                return Err(VfsError::NonFastForward(self.branch.clone()));
            }
        } else {
            tracing::debug!("refresh of {} throttled", key);
        }

        fs::read(self.mirror_dir.join(&relative)).map_err(|e| not_found_as(e, &relative))
    }

    /// Creates or truncates a file, writes `content` and stages it.
    pub fn write(&self, relative: &str, content: &[u8]) -> Result<()> {
        let relative = normalize_relative_path(relative)?;
        let path = self.mirror_dir.join(&relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&path)?;
            file.write_all(content)?;
        }

        self.with_repo(|repo| {
            let mut index = repo.index()?;
            index.add_path(Path::new(&relative))?;
            index.write()?;
            Ok(())
        })
    }

    /// Removes files from the working tree and stages the removals.
    /// Stops at the first file that cannot be removed.
    pub fn delete<S: AsRef<str>>(&self, relatives: &[S]) -> Result<()> {
        self.with_repo(|repo| {
            let mut index = repo.index()?;
            for relative in relatives {
                let relative = normalize_relative_path(relative.as_ref())?;
                fs::remove_file(self.mirror_dir.join(&relative)).map_err(|e| not_found_as(e, &relative))?;
                index.remove_path(Path::new(&relative))?;
            }
            index.write()?;
            Ok(())
        })
    }

    /// Whether `relative` is a file in the HEAD commit.
    pub fn exists(&self, relative: &str) -> Result<bool> {
        let relative = normalize_relative_path(relative)?;
        self.with_repo(|repo| {
            let head = match repo.head() {
                Ok(head) => head,
                Err(e) if e.code() == ErrorCode::UnbornBranch => return Ok(false),
                Err(e) => return Err(e.into()),
            };
            let tree = head.peel_to_tree()?;
            match tree.get_path(Path::new(&relative)) {
                Ok(entry) => Ok(entry.kind() == Some(ObjectType::Blob)),
                Err(e) if e.code() == ErrorCode::NotFound => Ok(false),
                Err(e) => Err(e.into()),
            }
        })
    }

    /// Creates a local branch from `origin/<name>` when that exists, else from
    /// HEAD, tracking `origin/<name>`. Existing branches are left alone.
    pub fn create_branch(&self, name: &str) -> Result<()> {
        self.with_repo(|repo| {
            match repo.find_branch(name, BranchType::Local) {
                Ok(_) => return Ok(()),
                Err(e) if e.code() == ErrorCode::NotFound => {}
                Err(e) => return Err(e.into()),
            }

            let remote_ref = format!("refs/remotes/{}/{}", REMOTE_NAME, name);
            let commit = match repo.find_reference(&remote_ref) {
                Ok(reference) => reference.peel_to_commit()?,
                Err(e) if e.code() == ErrorCode::NotFound => repo.head()?.peel_to_commit()?,
                Err(e) => return Err(e.into()),
            };
            repo.branch(name, &commit, false)?;

            let mut config = repo.config()?;
            config.set_str(&format!("branch.{}.remote", name), REMOTE_NAME)?;
            config.set_str(&format!("branch.{}.merge", name), &format!("refs/heads/{}", name))?;
            tracing::info!("created branch {} at {}", name, commit.id());
            Ok(())
        })
    }

    /// Forced checkout of HEAD, discarding working tree changes.
    pub fn checkout(&self) -> Result<()> {
        self.with_repo(|repo| {
            match repo.head() {
                Ok(_) => {}
                Err(e) if e.code() == ErrorCode::UnbornBranch => return Ok(()),
                Err(e) => return Err(e.into()),
            }
            repo.checkout_head(Some(CheckoutBuilder::new().force()))?;
            Ok(())
        })
    }
}

fn clone_mirror(
    address: &RepositoryAddress,
    mirror_dir: &Path,
    credential: Option<&Credential>,
) -> Result<Repository> {
    if let Some(parent) = mirror_dir.parent() {
        fs::create_dir_all(parent)?;
    }
    tracing::info!("Cloning {} into {}", address.as_str(), mirror_dir.display());

    let mut fetch_options = FetchOptions::new();
    fetch_options.remote_callbacks(remote_callbacks(credential));

    let mut builder = RepoBuilder::new();
    builder.fetch_options(fetch_options);
    Ok(builder.clone(address.as_str(), mirror_dir)?)
}

/// Branch name HEAD refers to, also for a freshly cloned empty repository.
fn head_branch(repo: &Repository) -> Result<String> {
    match repo.head() {
        Ok(head) => Ok(head
            .name()
            .unwrap_or("HEAD")
            .trim_start_matches("refs/heads/")
            .to_string()),
        Err(e) if e.code() == ErrorCode::UnbornBranch => {
            let head = repo.find_reference("HEAD")?;
            let target = head
                .symbolic_target()
                .ok_or_else(|| VfsError::Internal("HEAD is neither born nor symbolic".to_string()))?;
            Ok(target.trim_start_matches("refs/heads/").to_string())
        }
        Err(e) => Err(e.into()),
    }
}

fn not_found_as(e: std::io::Error, relative: &str) -> VfsError {
    if e.kind() == std::io::ErrorKind::NotFound {
        VfsError::FileNotFound(relative.to_string())
    } else {
        VfsError::Io(e)
    }
}
