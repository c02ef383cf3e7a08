//! Plain data types shared across the crate.
//!
//! - `blame`: LineRecord, AuthorSet and the AuthorshipIndex queries
//! - `identity`: commit author name/email
//! - `remote`: remote name plus its declared addresses, as read from repository config

pub mod blame;
pub mod identity;
pub mod remote;

pub use blame::*;
pub use identity::*;
pub use remote::*;
