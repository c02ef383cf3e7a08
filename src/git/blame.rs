use std::path::Path;

use chrono::{DateTime, Utc};
use git2::{BlameOptions, ErrorCode};

use crate::error::{Result, VfsError};
use crate::git::locator::normalize_relative_path;
use crate::git::repository::RepositoryHandle;
use crate::models::{AuthorshipIndex, LineRecord};

impl RepositoryHandle {
    /// Per-line authorship of `relative` as of HEAD.
    pub fn authorship(&self, relative: &str) -> Result<AuthorshipIndex> {
        let normalized = normalize_relative_path(relative)?;
        let relative = normalized.as_str();
        self.with_repo(|repo| {
            let head = repo.head()?.peel_to_commit()?;
            let entry = head.tree()?.get_path(Path::new(relative)).map_err(|e| {
                if e.code() == ErrorCode::NotFound {
                    VfsError::FileNotFound(relative.to_string())
                } else {
                    VfsError::Git(e)
                }
            })?;
            let blob = repo
                .find_blob(entry.id())
                .map_err(|_| VfsError::InvalidPath(format!("{} is not a file", relative)))?;
            let text = String::from_utf8_lossy(blob.content());

            let mut options = BlameOptions::new();
            options.newest_commit(head.id());
            let blame = repo.blame_file(Path::new(relative), Some(&mut options))?;

            let mut lines = Vec::new();
            for (i, line) in text.lines().enumerate() {
                let line_number = i + 1;
                let hunk = blame.get_line(line_number).ok_or_else(|| {
                    VfsError::Internal(format!("no blame for line {} of {}", line_number, relative))
                })?;
                let signature = hunk.final_signature();
                lines.push(LineRecord {
                    line_number,
                    text: line.to_string(),
                    author: signature.email().unwrap_or("").to_string(),
                    author_name: signature.name().unwrap_or("Unknown").to_string(),
                    commit_oid: hunk.final_commit_id().to_string(),
                    timestamp: DateTime::<Utc>::from_timestamp(signature.when().seconds(), 0)
                        .unwrap_or_default(),
                });
            }

            Ok(AuthorshipIndex::new(relative, head.id().to_string(), lines))
        })
    }
}

impl AuthorshipIndex {
    /// Blames `relative` at the handle's HEAD.
    pub fn build(handle: &RepositoryHandle, relative: &str) -> Result<Self> {
        handle.authorship(relative)
    }
}
