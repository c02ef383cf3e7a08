//! Error types for every virtual file-storage operation.
//!
//! Defines `VfsError` with one variant per failure kind callers can branch on:
//! - `InvalidAddress` → the repository part of a locator is neither a URL nor SCP form
//! - `FileNotFound` → a read of a path that does not exist yet
//! - `EmptyIdentity` → commit attempted without an author email
//! - `OutOfRange` → authorship query beyond the blamed line count
//! - `Git` → any backend failure (network, transport, object store), unchanged
//!
//! "Already up to date" and "non-fast-forward" pull outcomes are not errors here;
//! they are absorbed by the operations that tolerate them.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VfsError {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid repository address: {0}")]
    InvalidAddress(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Author email must not be empty")]
    EmptyIdentity,

    #[error("Line {line} out of range (file has {total} lines)")]
    OutOfRange { line: usize, total: usize },

    #[error("Non-fast-forward update on branch {0}")]
    NonFastForward(String),

    #[error("Push of {reference} rejected: {message}")]
    PushRejected { reference: String, message: String },

    #[error("No repository root found above {0}")]
    RepositoryRootNotFound(PathBuf),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl VfsError {
    /// True when the error means "this file does not exist yet".
    pub fn is_not_found(&self) -> bool {
        match self {
            VfsError::FileNotFound(_) => true,
            VfsError::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            VfsError::Git(e) => e.code() == git2::ErrorCode::NotFound,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, VfsError>;
