//! Xen Orchestra side of the cloud controller manager
//!
//! [`XoClient`] reads VM records over the REST API. [`Instances`] maps
//! cluster nodes onto those records and derives the metadata the label sync
//! controller reconciles.

#![deny(missing_docs)]

pub mod client;
pub mod config;
pub mod instance;
pub mod inventory;
pub mod resolver;
pub mod smbios;

pub use client::XoClient;
pub use config::XoConfig;
pub use instance::InstanceMetadata;
pub use inventory::{PowerState, VmInventory, VmRecord};
pub use resolver::{Instances, ResolvedInstance};
