//! Virtual file storage on top of git repositories.
//!
//! Files are addressed by a locator that combines a repository address and a
//! path inside it:
//!
//! ```text
//! git@github.com:org/docs.git/guide/intro.md
//! ssh://git@gitea.example.com:2221/go/coupon.git/doc/admin/add.md
//! ```
//!
//! Opening a locator clones the repository into a local mirror on first use,
//! refreshes it at most once per cooldown, and picks credentials from the
//! registry held by the `VfsContext`.
//!
//! ```no_run
//! use git_vfs::{Config, Credential, VfsContext};
//!
//! # fn main() -> git_vfs::Result<()> {
//! let ctx = VfsContext::new(Config::default());
//! ctx.register_credential("git", "github.com", Credential::ssh_key("git", "/home/me/.ssh/id_ed25519"))?;
//! let bytes = ctx.read_file("git@github.com:org/docs.git/guide/intro.md")?;
//! # let _ = bytes;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod git;
pub mod models;

pub use config::Config;
pub use context::VfsContext;
pub use error::{Result, VfsError};
pub use git::{Credential, CredentialRegistry, PathResolver, PullOutcome, PullThrottle, RepositoryAddress, RepositoryHandle};
pub use models::{AuthorSet, AuthorshipIndex, Identity, LineRecord};
