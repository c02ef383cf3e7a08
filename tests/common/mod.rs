#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use git2::build::RepoBuilder;
use git2::{Oid, Repository, RepositoryInitOptions, Signature};
use tempfile::TempDir;

use git_vfs::{Config, Identity, VfsContext};

pub const BRANCH: &str = "main";

static SCRATCH: AtomicUsize = AtomicUsize::new(0);

/// A bare "remote" repository plus a context whose mirrors live in the same tempdir.
pub struct Fixture {
    pub dir: TempDir,
    pub remote_url: String,
    pub ctx: VfsContext,
}

impl Fixture {
    /// Remote seeded with one commit containing `files`, authored by `author`.
    pub fn new(files: &[(&str, &str)], author: &Identity) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let remote_url = seed_remote(dir.path(), files, author);
        let ctx = Self::context_for(dir.path());
        Self { dir, remote_url, ctx }
    }

    /// Remote with no commits and no branches.
    pub fn empty() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let remote = dir.path().join("remote.git");
        Repository::init_bare(&remote).unwrap();
        let ctx = Self::context_for(dir.path());
        Self {
            remote_url: file_url(&remote),
            dir,
            ctx,
        }
    }

    /// A fresh context over the same mirror root, with its own throttle.
    pub fn context_for(root: &Path) -> VfsContext {
        let config = Config::default()
            .with_mirror_root(root.join("mirrors"))
            .with_pull_cooldown(Duration::from_secs(3600))
            .with_default_author(Identity::new("robot", "robot@example.com"));
        VfsContext::new(config)
    }

    pub fn fresh_context(&self) -> VfsContext {
        Self::context_for(self.dir.path())
    }

    pub fn locator(&self, relative: &str) -> String {
        format!("{}/{}", self.remote_url, relative)
    }

    pub fn remote_path(&self) -> PathBuf {
        self.dir.path().join("remote.git")
    }

    /// Tip of `main` on the remote.
    pub fn remote_head(&self) -> Oid {
        let repo = Repository::open_bare(self.remote_path()).unwrap();
        let reference = repo.find_reference(&format!("refs/heads/{}", BRANCH)).unwrap();
        reference.target().unwrap()
    }

    /// Commits `files` to the remote from a separate clone, as another user would.
    pub fn commit_to_remote(&self, files: &[(&str, &str)], author: &Identity) -> Oid {
        self.commit_to_remote_branch(BRANCH, files, author)
    }

    /// Commits on top of the remote's `main` and pushes the result to `branch`.
    pub fn commit_to_remote_branch(&self, branch: &str, files: &[(&str, &str)], author: &Identity) -> Oid {
        let n = SCRATCH.fetch_add(1, Ordering::SeqCst);
        let work = self.dir.path().join(format!("scratch-{}", n));
        let repo = RepoBuilder::new().clone(&self.remote_url, &work).unwrap();
        let oid = commit_files(&repo, files, author);
        let mut remote = repo.find_remote("origin").unwrap();
        let refspec = format!("refs/heads/{}:refs/heads/{}", BRANCH, branch);
        remote.push(&[refspec.as_str()], None).unwrap();
        oid
    }
}

pub fn file_url(path: &Path) -> String {
    format!("file://{}", path.display())
}

fn seed_remote(root: &Path, files: &[(&str, &str)], author: &Identity) -> String {
    let seed = root.join("seed");
    let mut options = RepositoryInitOptions::new();
    options.initial_head(BRANCH);
    let repo = Repository::init_opts(&seed, &options).unwrap();
    commit_files(&repo, files, author);

    let remote = root.join("remote.git");
    RepoBuilder::new()
        .bare(true)
        .clone(&file_url(&seed), &remote)
        .unwrap();
    file_url(&remote)
}

pub fn commit_files(repo: &Repository, files: &[(&str, &str)], author: &Identity) -> Oid {
    let workdir = repo.workdir().unwrap().to_path_buf();
    let mut index = repo.index().unwrap();
    for (path, content) in files {
        let full = workdir.join(path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(&full, content).unwrap();
        index.add_path(Path::new(path)).unwrap();
    }
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let signature = Signature::now(&author.name, &author.email).unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    repo.commit(Some("HEAD"), &signature, &signature, "seed", &tree, &parents)
        .unwrap()
}

pub fn alice() -> Identity {
    Identity::new("Alice", "alice@example.com")
}

pub fn bob() -> Identity {
    Identity::new("Bob", "bob@example.com")
}
