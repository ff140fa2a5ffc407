//! Error types for the Xen Orchestra cloud controller manager
//!
//! Errors are structured with fields to aid debugging in production.
//! Each variant carries the node name, VM id or pool ids involved so that a
//! single log line is enough to locate the offending object.

use thiserror::Error;
use uuid::Uuid;

/// Default context value when no specific context is available
pub const UNKNOWN_CONTEXT: &str = "unknown";

/// Failures decoding a provider identifier string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderIdError {
    /// Identifier is empty or belongs to another provider
    #[error("foreign providerID or empty \"{0}\"")]
    ForeignOrEmpty(String),

    /// Identifier carries our scheme but not the `scheme://pool/vm` shape
    #[error("providerID \"{raw}\" didn't match expected format \"{scheme}://PoolID/InstanceID\"")]
    Malformed {
        /// The raw identifier
        raw: String,
        /// The registered scheme
        scheme: String,
    },

    /// VM segment is not a UUID
    #[error("InstanceID has to be a UUID, but got \"{0}\"")]
    InvalidVmId(String),

    /// Pool segment is present but not a UUID
    #[error("PoolID has to be a UUID, but got \"{0}\"")]
    InvalidPoolId(String),
}

/// Main error type for node identity and label sync operations
#[derive(Debug, Error)]
pub enum Error {
    /// Provider identifier could not be decoded
    #[error("invalid provider id: {source}")]
    ProviderId {
        /// The underlying decode failure
        #[from]
        source: ProviderIdError,
    },

    /// Node carries neither a provider identifier nor a usable system UUID
    #[error("cannot resolve identity of node {node}: {message}")]
    IdentityUnresolvable {
        /// Name of the node
        node: String,
        /// Why the identity could not be derived
        message: String,
    },

    /// The VM backing a node does not exist in the inventory
    #[error("instance {vm_id} not found for node {node}")]
    InstanceNotFound {
        /// Name of the node
        node: String,
        /// VM id that was looked up
        vm_id: String,
    },

    /// The inventory returned a VM that disagrees with the declared identifier
    #[error(
        "identity mismatch for node {node}: vm {vm_id} pool {actual_pool} does not match declared pool {declared_pool}"
    )]
    IdentityMismatch {
        /// Name of the node
        node: String,
        /// VM id that was looked up
        vm_id: Uuid,
        /// Pool decoded from the provider identifier
        declared_pool: Uuid,
        /// Pool reported by the inventory
        actual_pool: Uuid,
    },

    /// Inventory transport failure
    #[error("transport error [{context}]: {message}")]
    Transport {
        /// Operation that failed (e.g. "get_vm", "list_vms")
        context: String,
        /// Description of what failed
        message: String,
    },

    /// The node update collaborator did not persist a staged label change
    #[error("failed to update labels on node {node}: {message}")]
    ExternalUpdate {
        /// Name of the node
        node: String,
        /// Description of what failed
        message: String,
    },

    /// Kubernetes API error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// The node cache never became ready
    #[error("node cache sync failed: {message}")]
    CacheSync {
        /// Description of what failed
        message: String,
    },

    /// Invalid configuration
    #[error("configuration error: {message}")]
    Config {
        /// Description of what's invalid
        message: String,
    },
}

impl Error {
    /// Create an identity-unresolvable error for a node
    pub fn unresolvable(node: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::IdentityUnresolvable {
            node: node.into(),
            message: msg.into(),
        }
    }

    /// Create an instance-not-found error
    pub fn not_found(node: impl Into<String>, vm_id: impl ToString) -> Self {
        Self::InstanceNotFound {
            node: node.into(),
            vm_id: vm_id.to_string(),
        }
    }

    /// Create a transport error with the given message
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport {
            context: UNKNOWN_CONTEXT.to_string(),
            message: msg.into(),
        }
    }

    /// Create a transport error with operation context
    pub fn transport_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Transport {
            context: context.into(),
            message: msg.into(),
        }
    }

    /// Create an external update error for a node
    pub fn external_update(node: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ExternalUpdate {
            node: node.into(),
            message: msg.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// True when the error means the VM is gone, not that it is unreachable
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::InstanceNotFound { .. })
    }

    /// Check if this error is retryable
    ///
    /// Identifier and configuration problems need a human to fix them.
    /// Transport and update failures are retried on the next tick.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::ProviderId { .. } => false,
            Error::IdentityUnresolvable { .. } => false,
            Error::InstanceNotFound { .. } => false,
            Error::IdentityMismatch { .. } => false,
            Error::Transport { .. } => true,
            Error::ExternalUpdate { .. } => true,
            Error::Kube { source } => {
                // 4xx responses will not change by retrying
                !matches!(
                    source,
                    kube::Error::Api(ae) if (400..500).contains(&ae.code)
                )
            }
            Error::CacheSync { .. } => false,
            Error::Config { .. } => false,
        }
    }

    /// Get the node name if this error is associated with a specific node
    pub fn node(&self) -> Option<&str> {
        match self {
            Error::IdentityUnresolvable { node, .. }
            | Error::InstanceNotFound { node, .. }
            | Error::IdentityMismatch { node, .. }
            | Error::ExternalUpdate { node, .. } => Some(node),
            _ => None,
        }
    }
}
