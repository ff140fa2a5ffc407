//! Provider identifier codec
//!
//! A node references its backing VM through `spec.providerID`, encoded as
//! `xenorchestra://<poolID>/<vmID>`. A VM without a known pool keeps the
//! separator and leaves the segment empty: `xenorchestra:///<vmID>`.

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

use crate::error::ProviderIdError;

/// Registered provider name, also the identifier scheme
pub const PROVIDER_NAME: &str = "xenorchestra";

/// Decoded `(pool, vm)` pair referenced by a node
///
/// A nil `pool_id` means the identifier carried an empty pool segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProviderId {
    /// Pool the VM belongs to, nil when unknown
    pub pool_id: Uuid,
    /// The VM itself
    pub vm_id: Uuid,
}

impl ProviderId {
    /// Build an identifier; the VM id is not checked for nilness
    pub fn new(pool_id: Uuid, vm_id: Uuid) -> Self {
        Self { pool_id, vm_id }
    }

    /// Decode a raw `spec.providerID` value
    pub fn parse(raw: &str) -> Result<Self, ProviderIdError> {
        if !is_managed(raw) {
            return Err(ProviderIdError::ForeignOrEmpty(raw.to_string()));
        }

        let malformed = || ProviderIdError::Malformed {
            raw: raw.to_string(),
            scheme: PROVIDER_NAME.to_string(),
        };

        let rest = raw
            .strip_prefix(PROVIDER_NAME)
            .and_then(|r| r.strip_prefix("://"))
            .ok_or_else(malformed)?;
        let (pool, vm) = rest.split_once('/').ok_or_else(malformed)?;
        if vm.is_empty() || vm.contains('/') {
            return Err(malformed());
        }

        let vm_id =
            Uuid::parse_str(vm).map_err(|_| ProviderIdError::InvalidVmId(vm.to_string()))?;
        let pool_id = if pool.is_empty() {
            Uuid::nil()
        } else {
            Uuid::parse_str(pool).map_err(|_| ProviderIdError::InvalidPoolId(pool.to_string()))?
        };

        Ok(Self { pool_id, vm_id })
    }

    /// Whether a pool segment was present
    pub fn has_pool(&self) -> bool {
        !self.pool_id.is_nil()
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.pool_id.is_nil() {
            write!(f, "{}:///{}", PROVIDER_NAME, self.vm_id)
        } else {
            write!(f, "{}://{}/{}", PROVIDER_NAME, self.pool_id, self.vm_id)
        }
    }
}

impl FromStr for ProviderId {
    type Err = ProviderIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// True when `raw` is non-empty and starts with our scheme name
///
/// Nodes whose identifier fails this check belong to another provider.
pub fn is_managed(raw: &str) -> bool {
    !raw.is_empty() && raw.starts_with(PROVIDER_NAME)
}
