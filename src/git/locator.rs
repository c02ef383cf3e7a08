//! Locator resolution.
//!
//! A locator is `<repository-address>.git<relative-path>`, e.g.
//! `git@host.com:org/repo.git/dir/file.md`. The first `.git` ends the address;
//! without one the whole string is a repository-relative path.
//!
//! Each repository address maps to one mirror directory under the configured
//! root: `<root>/<host>/<path without .git>`.

use std::path::{Component, Path, PathBuf};

use crate::error::{Result, VfsError};
use crate::git::address::RepositoryAddress;

/// Marks the root of a repository, both inside locators and on disk.
pub const REPOSITORY_MARKER: &str = ".git";

/// Splits a locator into `(address, relative_path)` at the first marker.
///
/// The address keeps the marker; the relative path loses its leading separators.
pub fn split_locator(locator: &str) -> (&str, &str) {
    match locator.find(REPOSITORY_MARKER) {
        Some(index) => {
            let (address, rest) = locator.split_at(index + REPOSITORY_MARKER.len());
            (address, rest.trim_start_matches(['/', '\\']))
        }
        None => ("", locator),
    }
}

/// Cleans a repository-relative path into the `a/b/c` form git expects.
///
/// `.` segments are dropped. Empty paths, paths that would escape the working
/// tree and paths inside `.git` are rejected.
pub fn normalize_relative_path(path: &str) -> Result<String> {
    let mut segments = Vec::new();
    for component in Path::new(path).components() {
        match component {
            Component::Normal(segment) => segments.push(segment.to_string_lossy().into_owned()),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(VfsError::InvalidPath(path.to_string()));
            }
        }
    }
    match segments.first() {
        None => Err(VfsError::InvalidPath(path.to_string())),
        Some(first) if first == REPOSITORY_MARKER => Err(VfsError::InvalidPath(path.to_string())),
        Some(_) => Ok(segments.join("/")),
    }
}

#[derive(Debug, Clone)]
pub struct PathResolver {
    mirror_root: PathBuf,
}

impl PathResolver {
    pub fn new(mirror_root: impl Into<PathBuf>) -> Self {
        Self {
            mirror_root: mirror_root.into(),
        }
    }

    pub fn mirror_root(&self) -> &Path {
        &self.mirror_root
    }

    /// Local mirror directory for a repository address (or a full locator).
    pub fn mirror_dir(&self, address: &str) -> Result<PathBuf> {
        let address = match split_locator(address) {
            ("", _) => address,
            (prefix, _) => prefix,
        };
        let parsed = RepositoryAddress::parse(address)?;

        let path = parsed.path().trim_matches('/');
        let path = path.strip_suffix(REPOSITORY_MARKER).unwrap_or(path);

        let mut dir = self.mirror_root.clone();
        let host = parsed.host().trim_matches('/');
        if !host.is_empty() {
            dir.push(host);
        }
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            if segment == "." || segment == ".." {
                return Err(VfsError::InvalidAddress(address.to_string()));
            }
            dir.push(segment);
        }
        Ok(dir)
    }

    /// Absolute local path of the file a locator points at.
    pub fn local_path(&self, locator: &str) -> Result<PathBuf> {
        let (address, relative) = split_locator(locator);
        if address.is_empty() {
            return Err(VfsError::InvalidAddress(locator.to_string()));
        }
        let dir = self.mirror_dir(address)?;
        if relative.is_empty() {
            return Ok(dir);
        }
        Ok(dir.join(normalize_relative_path(relative)?))
    }

    /// Repository-relative path of a local file, found by walking up to the
    /// nearest directory that contains a `.git` directory.
    pub fn recover_relative_path(&self, local: &Path) -> Result<String> {
        let mut current = local;
        let mut segments = Vec::new();
        loop {
            let name = current
                .file_name()
                .ok_or_else(|| VfsError::RepositoryRootNotFound(local.to_path_buf()))?;
            segments.push(name.to_string_lossy().into_owned());

            let parent = current
                .parent()
                .ok_or_else(|| VfsError::RepositoryRootNotFound(local.to_path_buf()))?;
            if parent.join(REPOSITORY_MARKER).is_dir() {
                segments.reverse();
                return Ok(segments.join("/"));
            }
            current = parent;
        }
    }

    /// Repository-relative path from either a local path under the mirror root
    /// or a locator.
    pub fn repository_path(&self, locator_or_local: &str) -> Result<String> {
        let candidate = Path::new(locator_or_local);
        if candidate.is_absolute() && candidate.starts_with(&self.mirror_root) {
            return self.recover_relative_path(candidate);
        }
        let (_, relative) = split_locator(locator_or_local);
        Ok(relative.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_at_first_marker() {
        let (address, relative) = split_locator("git@host.com:org/repo.git/dir/file.md");
        assert_eq!(address, "git@host.com:org/repo.git");
        assert_eq!(relative, "dir/file.md");

        let (address, relative) = split_locator("ssh://git@h:2221/go/coupon.git//doc/a.md");
        assert_eq!(address, "ssh://git@h:2221/go/coupon.git");
        assert_eq!(relative, "doc/a.md");
    }

    #[test]
    fn split_without_marker_is_all_path() {
        assert_eq!(split_locator("doc/a.md"), ("", "doc/a.md"));
        assert_eq!(split_locator(""), ("", ""));
    }

    #[test]
    fn split_is_stable_under_recombination() {
        for locator in [
            "git@host.com:org/repo.git/dir/file.md",
            "https://host.com/org/repo.git/a/b/c.txt",
            "ssh://git@host.com:22/x.git",
        ] {
            let (address, relative) = split_locator(locator);
            let recombined = format!("{}/{}", address, relative);
            assert_eq!(split_locator(&recombined), (address, relative));
        }
    }

    #[test]
    fn relative_paths_stay_inside_the_tree() {
        assert_eq!(normalize_relative_path("doc/a.md").unwrap(), "doc/a.md");
        assert_eq!(normalize_relative_path("./doc/a.md").unwrap(), "doc/a.md");
        assert_eq!(normalize_relative_path("doc/./a.md").unwrap(), "doc/a.md");
        assert_eq!(normalize_relative_path("doc//a.md").unwrap(), "doc/a.md");
        for bad in ["", ".", "../a.md", "doc/../../a.md", "/etc/passwd", ".git/config", "./.git/config"] {
            assert!(matches!(normalize_relative_path(bad), Err(VfsError::InvalidPath(_))), "{}", bad);
        }
    }

    #[test]
    fn mirror_dir_uses_host_and_path() {
        let resolver = PathResolver::new("/tmp/dml");
        assert_eq!(
            resolver.mirror_dir("git@host.com:org/repo.git").unwrap(),
            PathBuf::from("/tmp/dml/host.com/org/repo")
        );
        assert_eq!(
            resolver.mirror_dir("ssh://git@host.com:2221/org/repo.git").unwrap(),
            PathBuf::from("/tmp/dml/host.com/org/repo")
        );
    }

    #[test]
    fn mirror_dir_keeps_hosts_apart() {
        let resolver = PathResolver::new("/tmp/dml");
        let a = resolver.mirror_dir("a.example:/org/repo.git").unwrap();
        let b = resolver.mirror_dir("b.example:/org/repo.git").unwrap();
        assert_eq!(a, PathBuf::from("/tmp/dml/a.example/org/repo"));
        assert_eq!(b, PathBuf::from("/tmp/dml/b.example/org/repo"));
        assert_ne!(a, b);
    }

    #[test]
    fn mirror_dir_ignores_marker_and_trailing_slash() {
        let resolver = PathResolver::new("/tmp/dml");
        let expected = resolver.mirror_dir("https://host.com/org/repo").unwrap();
        for address in [
            "https://host.com/org/repo.git",
            "https://host.com/org/repo/",
            "https://host.com/org/repo.git/",
        ] {
            assert_eq!(resolver.mirror_dir(address).unwrap(), expected, "{}", address);
        }
    }

    #[test]
    fn mirror_dir_accepts_full_locator() {
        let resolver = PathResolver::new("/tmp/dml");
        assert_eq!(
            resolver.mirror_dir("git@host.com:org/repo.git/dir/file.md").unwrap(),
            PathBuf::from("/tmp/dml/host.com/org/repo")
        );
    }

    #[test]
    fn mirror_dir_rejects_escaping_paths() {
        let resolver = PathResolver::new("/tmp/dml");
        assert!(resolver.mirror_dir("git@host.com:../../etc.git").is_err());
    }

    #[test]
    fn local_path_joins_relative_part() {
        let resolver = PathResolver::new("/tmp/dml");
        assert_eq!(
            resolver.local_path("git@host.com:org/repo.git/dir/file.md").unwrap(),
            PathBuf::from("/tmp/dml/host.com/org/repo/dir/file.md")
        );
        assert!(resolver.local_path("git@host.com:org/repo.git/../x").is_err());
        assert!(resolver.local_path("dir/file.md").is_err());
    }

    #[test]
    fn recover_walks_up_to_marker() {
        let root = tempfile::tempdir().unwrap();
        let repo = root.path().join("host.com/org/repo");
        std::fs::create_dir_all(repo.join(".git")).unwrap();
        std::fs::create_dir_all(repo.join("doc/admin")).unwrap();

        let resolver = PathResolver::new(root.path());
        let relative = resolver
            .recover_relative_path(&repo.join("doc/admin/add.md"))
            .unwrap();
        assert_eq!(relative, "doc/admin/add.md");

        let relative = resolver
            .repository_path(repo.join("top.md").to_str().unwrap())
            .unwrap();
        assert_eq!(relative, "top.md");
    }

    #[test]
    fn recover_without_marker_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let resolver = PathResolver::new(root.path());
        let err = resolver
            .recover_relative_path(&root.path().join("no/repo/here.md"))
            .unwrap_err();
        assert!(matches!(err, VfsError::RepositoryRootNotFound(_)));
    }

    #[test]
    fn repository_path_from_locator() {
        let resolver = PathResolver::new("/tmp/dml");
        assert_eq!(
            resolver.repository_path("git@host.com:org/repo.git/dir/file.md").unwrap(),
            "dir/file.md"
        );
        assert_eq!(resolver.repository_path("dir/file.md").unwrap(), "dir/file.md");
    }
}
