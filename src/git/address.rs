//! Repository address parsing.
//!
//! Accepts either standard URL syntax (`ssh://git@host:2221/org/repo.git`,
//! `https://host/org/repo.git`, `file:///srv/repo.git`) or SCP-style syntax
//! (`git@host:org/repo.git`), which is normalized to scheme `ssh`.
//! Parsing never touches the network.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::error::{Result, VfsError};

/// `[user@]host:path`, with an optional slash after the colon.
static SCP_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:([^@]+)@)?([^:]+):/?(.+)$").expect("SCP pattern compiles"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryAddress {
    raw: String,
    scheme: String,
    user: Option<String>,
    host: String,
    port: Option<u16>,
    /// Path without its leading slash, e.g. `org/repo.git`
    path: String,
}

impl RepositoryAddress {
    pub fn parse(address: &str) -> Result<Self> {
        let address = address.trim();
        if address.is_empty() {
            return Err(VfsError::InvalidAddress("empty address".to_string()));
        }

        // `host.com:org/repo.git` and `host.com:/org/repo.git` both parse as URLs
        // with scheme `host.com` and no host; only `file` URLs may lack a host.
        if let Ok(url) = Url::parse(address) {
            let has_host = url.host_str().is_some_and(|h| !h.is_empty());
            if !url.cannot_be_a_base() && (has_host || url.scheme() == "file") {
                return Ok(Self::from_url(address, &url));
            }
        }

        Self::parse_scp(address).ok_or_else(|| VfsError::InvalidAddress(address.to_string()))
    }

    fn from_url(raw: &str, url: &Url) -> Self {
        let user = Some(url.username())
            .filter(|u| !u.is_empty())
            .map(str::to_string);
        Self {
            raw: raw.to_string(),
            scheme: url.scheme().to_string(),
            user,
            host: url.host_str().unwrap_or("").to_string(),
            port: url.port(),
            path: url.path().trim_start_matches('/').to_string(),
        }
    }

    fn parse_scp(raw: &str) -> Option<Self> {
        let caps = SCP_PATTERN.captures(raw)?;
        let user = caps.get(1).map(|m| m.as_str().to_string());
        let host = caps.get(2)?.as_str().to_string();
        let path = caps.get(3)?.as_str();
        // query and fragment are not part of a repository path
        let path = path.split(['?', '#']).next().unwrap_or(path);

        Some(Self {
            raw: raw.to_string(),
            scheme: "ssh".to_string(),
            user,
            host,
            port: None,
            path: path.trim_start_matches('/').to_string(),
        })
    }

    /// The address exactly as supplied; this is what gets handed to git.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// User name, or `""` when the address carries none.
    pub fn username(&self) -> &str {
        self.user.as_deref().unwrap_or("")
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for RepositoryAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://", self.scheme)?;
        if let Some(user) = &self.user {
            write!(f, "{}@", user)?;
        }
        write!(f, "{}", self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        write!(f, "/{}", self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scp_form_becomes_ssh() {
        let addr = RepositoryAddress::parse("git@host.com:org/repo.git").unwrap();
        assert_eq!(addr.scheme(), "ssh");
        assert_eq!(addr.username(), "git");
        assert_eq!(addr.host(), "host.com");
        assert_eq!(addr.port(), None);
        assert_eq!(addr.path(), "org/repo.git");
        assert_eq!(addr.as_str(), "git@host.com:org/repo.git");
        assert_eq!(addr.to_string(), "ssh://git@host.com/org/repo.git");
    }

    #[test]
    fn scp_form_without_user() {
        let addr = RepositoryAddress::parse("host.com:/org/repo.git").unwrap();
        assert_eq!(addr.scheme(), "ssh");
        assert_eq!(addr.username(), "");
        assert_eq!(addr.host(), "host.com");
        assert_eq!(addr.path(), "org/repo.git");
        assert_eq!(addr.to_string(), "ssh://host.com/org/repo.git");
    }

    #[test]
    fn hostless_url_falls_back_to_scp() {
        let addr = RepositoryAddress::parse("a.example:/org/repo.git").unwrap();
        assert_eq!(addr.scheme(), "ssh");
        assert_eq!(addr.host(), "a.example");

        let addr = RepositoryAddress::parse("mirror:org/repo.git").unwrap();
        assert_eq!(addr.scheme(), "ssh");
        assert_eq!(addr.host(), "mirror");
    }

    #[test]
    fn url_form_keeps_port_and_user() {
        let addr = RepositoryAddress::parse("ssh://git@gitea.example.com:2221/go/coupon.git").unwrap();
        assert_eq!(addr.scheme(), "ssh");
        assert_eq!(addr.username(), "git");
        assert_eq!(addr.host(), "gitea.example.com");
        assert_eq!(addr.port(), Some(2221));
        assert_eq!(addr.path(), "go/coupon.git");
    }

    #[test]
    fn https_and_file_urls() {
        let addr = RepositoryAddress::parse("https://github.com/org/repo.git").unwrap();
        assert_eq!(addr.scheme(), "https");
        assert_eq!(addr.username(), "");
        assert_eq!(addr.host(), "github.com");

        let addr = RepositoryAddress::parse("file:///srv/git/repo.git").unwrap();
        assert_eq!(addr.scheme(), "file");
        assert_eq!(addr.host(), "");
        assert_eq!(addr.path(), "srv/git/repo.git");
    }

    #[test]
    fn scp_query_is_dropped() {
        let addr = RepositoryAddress::parse("git@host.com:org/repo.git?ref=main").unwrap();
        assert_eq!(addr.path(), "org/repo.git");
    }

    #[test]
    fn rejects_unparseable_input() {
        assert!(matches!(
            RepositoryAddress::parse("not an address"),
            Err(VfsError::InvalidAddress(_))
        ));
        assert!(matches!(RepositoryAddress::parse("   "), Err(VfsError::InvalidAddress(_))));
    }
}
