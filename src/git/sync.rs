//! Network-facing operations: pull, commit, push.
//!
//! Pull is fetch of the current branch followed by a fast-forward when possible.
//! "Already up to date" is a normal outcome. "Non-fast-forward" is reported to
//! the caller, which decides whether it matters: `commit_and_push` tolerates it,
//! `read` does not.

use git2::build::CheckoutBuilder;
use git2::{Direction, ErrorCode, FetchOptions, IndexAddOption, Oid, PushOptions, Repository, Signature, StatusOptions};

use crate::error::{Result, VfsError};
use crate::git::credentials::remote_callbacks;
use crate::git::repository::RepositoryHandle;
use crate::models::Identity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullOutcome {
    FastForwarded,
    AlreadyUpToDate,
    /// Local and remote have diverged; nothing was changed locally.
    NonFastForward,
}

impl RepositoryHandle {
    /// Fetches the current branch from the remote and fast-forwards to it.
    ///
    /// A remote without the branch (an empty repository, or a branch not pushed
    /// yet) leaves the mirror alone and reports `AlreadyUpToDate`.
    pub fn pull(&self) -> Result<PullOutcome> {
        let outcome = self.with_repo(|repo| {
            let mut remote = repo.remote_anonymous(&self.remote_url)?;
            let refname = format!("refs/heads/{}", self.branch);

            let advertised = {
                let connection = remote.connect_auth(
                    Direction::Fetch,
                    Some(remote_callbacks(self.credential.as_ref())),
                    None,
                )?;
                let found = connection.list()?.iter().any(|head| head.name() == refname);
                found
            };
            if !advertised {
                tracing::debug!("{} has no {}, nothing to pull", self.remote_url, refname);
                return Ok(PullOutcome::AlreadyUpToDate);
            }

            let mut fetch_options = FetchOptions::new();
            fetch_options.remote_callbacks(remote_callbacks(self.credential.as_ref()));
            remote.fetch(&[refname.as_str()], Some(&mut fetch_options), None)?;

            let fetch_head = repo.find_reference("FETCH_HEAD")?;
            let fetch_commit = repo.reference_to_annotated_commit(&fetch_head)?;
            let (analysis, _) = repo.merge_analysis(&[&fetch_commit])?;

            if analysis.is_up_to_date() {
                Ok(PullOutcome::AlreadyUpToDate)
            } else if analysis.is_fast_forward() || analysis.is_unborn() {
                fast_forward(repo, &self.branch, fetch_commit.id())?;
                Ok(PullOutcome::FastForwarded)
            } else {
                Ok(PullOutcome::NonFastForward)
            }
        })?;
        tracing::debug!("pull {} ({}): {:?}", self.remote_url, self.branch, outcome);
        Ok(outcome)
    }

    /// Pushes the current branch to the same-named branch on the remote.
    pub fn push(&self) -> Result<()> {
        self.with_repo(|repo| {
            let mut remote = repo.remote_anonymous(&self.remote_url)?;
            let refspec = format!("refs/heads/{0}:refs/heads/{0}", self.branch);

            let mut rejection: Option<(String, String)> = None;
            {
                let mut callbacks = remote_callbacks(self.credential.as_ref());
                callbacks.push_update_reference(|reference, status| {
                    if let Some(message) = status {
                        rejection = Some((reference.to_string(), message.to_string()));
                    }
                    Ok(())
                });
                let mut push_options = PushOptions::new();
                push_options.remote_callbacks(callbacks);
                remote.push(&[refspec.as_str()], Some(&mut push_options))?;
            }

            if let Some((reference, message)) = rejection {
                return Err(VfsError::PushRejected { reference, message });
            }
            tracing::info!("pushed {} to {}", self.branch, self.remote_url);
            Ok(())
        })
    }

    /// True when neither the index nor the working tree differ from HEAD.
    pub fn is_clean(&self) -> Result<bool> {
        self.with_repo(|repo| {
            let mut options = StatusOptions::new();
            options
                .include_untracked(true)
                .recurse_untracked_dirs(true)
                .include_ignored(false);
            Ok(repo.statuses(Some(&mut options))?.is_empty())
        })
    }

    /// Stages every change in the working tree, removals included.
    pub fn stage_all(&self) -> Result<()> {
        self.with_repo(stage_all)
    }

    /// Commits all pending changes as `author`, pulls, then pushes.
    ///
    /// Does nothing when there is nothing to commit. An author without an email
    /// is rejected before anything is staged.
    pub fn commit_and_push(&self, message: &str, author: &Identity) -> Result<()> {
        if self.is_clean()? {
            tracing::debug!("{} is clean, nothing to commit", self.mirror_dir().display());
            return Ok(());
        }
        if !author.has_email() {
            return Err(VfsError::EmptyIdentity);
        }

        let oid = self.with_repo(|repo| commit_all(repo, message, author))?;
        tracing::info!("committed {} on {}", oid, self.branch);

        match self.pull()? {
            PullOutcome::NonFastForward => {
                tracing::warn!("{} diverged from {}, pushing anyway", self.branch, self.remote_url)
            }
            PullOutcome::AlreadyUpToDate | PullOutcome::FastForwarded => {}
        }
        self.push()
    }
}

fn stage_all(repo: &Repository) -> Result<()> {
    let mut index = repo.index()?;
    index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
    index.update_all(["*"].iter(), None)?;
    index.write()?;
    Ok(())
}

fn commit_all(repo: &Repository, message: &str, author: &Identity) -> Result<Oid> {
    stage_all(repo)?;
    let tree_id = repo.index()?.write_tree()?;
    let tree = repo.find_tree(tree_id)?;

    let signature = Signature::now(author.display_name(), author.email.trim())?;
    let parent = match repo.head() {
        Ok(head) => Some(head.peel_to_commit()?),
        Err(e) if e.code() == ErrorCode::UnbornBranch => None,
        Err(e) => return Err(e.into()),
    };
    let parents: Vec<&git2::Commit> = parent.iter().collect();

    Ok(repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?)
}

fn fast_forward(repo: &Repository, branch: &str, target: Oid) -> Result<()> {
    let refname = format!("refs/heads/{}", branch);
    match repo.find_reference(&refname) {
        Ok(mut reference) => {
            reference.set_target(target, "pull: fast-forward")?;
        }
        Err(e) if e.code() == ErrorCode::NotFound => {
            repo.reference(&refname, target, true, "pull: initial")?;
        }
        Err(e) => return Err(e.into()),
    }
    repo.set_head(&refname)?;
    repo.checkout_head(Some(CheckoutBuilder::new().force()))?;
    Ok(())
}

