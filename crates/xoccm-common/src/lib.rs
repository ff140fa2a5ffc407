//! Common types for the Xen Orchestra cloud controller manager: errors,
//! provider identifiers, well-known labels and event publishing

#![deny(missing_docs)]

pub mod error;
pub mod events;
pub mod labels;
pub mod provider_id;
pub mod telemetry;

pub use error::{Error, ProviderIdError};
pub use provider_id::{ProviderId, PROVIDER_NAME};

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Component name reported on Events and used as the patch field manager
pub const CONTROLLER_NAME: &str = "cloud-node-label-sync-controller";
