pub mod address;
pub mod blame;
pub mod credentials;
pub mod locator;
pub mod repository;
pub mod sync;
pub mod throttle;

pub use address::RepositoryAddress;
pub use credentials::{Credential, CredentialRegistry, CredentialResolution};
pub use locator::{PathResolver, REPOSITORY_MARKER, split_locator};
pub use repository::RepositoryHandle;
pub use sync::PullOutcome;
pub use throttle::PullThrottle;
