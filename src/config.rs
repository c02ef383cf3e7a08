//! Process-wide settings.
//!
//! Loaded from a JSON file or built in code:
//!
//! ```json
//! {
//!   "mirror_root": "/var/cache/git-vfs",
//!   "pull_cooldown_secs": 300,
//!   "default_author": { "name": "robot", "email": "robot@example.com" }
//! }
//! ```
//!
//! Every field is optional.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, VfsError};
use crate::models::Identity;

pub const DEFAULT_MIRROR_ROOT: &str = "/tmp/dml";
pub const DEFAULT_PULL_COOLDOWN: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory under which every repository mirror lives
    pub mirror_root: PathBuf,
    /// Minimum time between network refreshes of one mirror
    pub pull_cooldown: Duration,
    /// Author used when a caller does not supply one
    pub default_author: Identity,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawConfig {
    mirror_root: Option<PathBuf>,
    pull_cooldown_secs: Option<u64>,
    default_author: Option<Identity>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mirror_root: PathBuf::from(DEFAULT_MIRROR_ROOT),
            pull_cooldown: DEFAULT_PULL_COOLDOWN,
            default_author: Identity::default(),
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawConfig =
            serde_json::from_str(json).map_err(|e| VfsError::Config(e.to_string()))?;
        let defaults = Config::default();
        Ok(Self {
            mirror_root: raw.mirror_root.unwrap_or(defaults.mirror_root),
            pull_cooldown: raw
                .pull_cooldown_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.pull_cooldown),
            default_author: raw.default_author.unwrap_or(defaults.default_author),
        }
        .normalized())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| VfsError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&contents)
    }

    pub fn with_mirror_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.mirror_root = root.into();
        self
    }

    pub fn with_pull_cooldown(mut self, cooldown: Duration) -> Self {
        self.pull_cooldown = cooldown;
        self.normalized()
    }

    pub fn with_default_author(mut self, author: Identity) -> Self {
        self.default_author = author;
        self
    }

    fn normalized(mut self) -> Self {
        if self.pull_cooldown.is_zero() {
            self.pull_cooldown = DEFAULT_PULL_COOLDOWN;
        }
        self
    }
}
