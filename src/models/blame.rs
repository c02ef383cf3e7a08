//! Per-line authorship data.
//!
//! An `AuthorshipIndex` is a read-only view over one blame result: the lines of a
//! file at HEAD, numbered from 1 in file order, each carrying the author that last
//! touched it. Built by `git::blame`, queried here.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Result, VfsError};

/// Blame information for a single line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineRecord {
    /// Line number (1-indexed)
    pub line_number: usize,
    /// Line content without the trailing newline
    pub text: String,
    /// Email of the author who last modified this line; used as the author identifier
    pub author: String,
    /// Display name of that author
    pub author_name: String,
    /// OID of the commit that last modified this line (empty for uncommitted text)
    pub commit_oid: String,
    /// When this line was last modified
    pub timestamp: DateTime<Utc>,
}

/// Deduplicated, unordered set of author identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuthorSet(HashSet<String>);

impl AuthorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, author: impl Into<String>) -> bool {
        self.0.insert(author.into())
    }

    pub fn contains(&self, author: &str) -> bool {
        self.0.contains(author)
    }

    /// True when `author` is the one and only member.
    pub fn only(&self, author: &str) -> bool {
        self.0.len() == 1 && self.0.contains(author)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for AuthorSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Authorship of every line of one file.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorshipIndex {
    /// Repository-relative path of the file
    pub path: String,
    /// Commit OID the blame was computed at (empty for `from_text`)
    pub commit: String,
    lines: Vec<LineRecord>,
}

impl AuthorshipIndex {
    pub fn new(path: impl Into<String>, commit: impl Into<String>, lines: Vec<LineRecord>) -> Self {
        Self {
            path: path.into(),
            commit: commit.into(),
            lines,
        }
    }

    /// Attributes every line of `text` to `author`, stamped now.
    ///
    /// Useful for content that has not been committed yet and so has no blame.
    pub fn from_text(path: impl Into<String>, text: &str, author: &str) -> Self {
        let now = Utc::now();
        let lines = text
            .lines()
            .enumerate()
            .map(|(i, line)| LineRecord {
                line_number: i + 1,
                text: line.to_string(),
                author: author.to_string(),
                author_name: author.to_string(),
                commit_oid: String::new(),
                timestamp: now,
            })
            .collect();
        Self::new(path, String::new(), lines)
    }

    pub fn lines(&self) -> &[LineRecord] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Record for 1-based line `n`.
    pub fn get_line(&self, n: usize) -> Result<&LineRecord> {
        if n == 0 || n > self.lines.len() {
            return Err(VfsError::OutOfRange {
                line: n,
                total: self.lines.len(),
            });
        }
        Ok(&self.lines[n - 1])
    }

    /// Authors of lines `start..=end`, after clamping the range to the file.
    ///
    /// Returns an empty set when the clamped range is empty.
    pub fn authors_in_range(&self, start: usize, end: usize) -> AuthorSet {
        let start = start.max(1);
        let end = end.min(self.lines.len());
        if start > end {
            return AuthorSet::new();
        }
        self.lines[start - 1..end]
            .iter()
            .map(|line| line.author.clone())
            .collect()
    }
}
