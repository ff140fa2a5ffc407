//! VM inventory capability and record model
//!
//! The resolver only needs two inventory operations, so the Xen Orchestra
//! client is hidden behind [`VmInventory`] and never exposed directly.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(test)]
use mockall::automock;

use xoccm_common::Error;

/// VM power state as reported by Xen Orchestra
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerState {
    /// Running
    Running,
    /// Cleanly shut down
    Halted,
    /// Paused by the hypervisor
    Paused,
    /// Suspended to disk
    Suspended,
    /// Any state this controller does not know about
    #[default]
    #[serde(other)]
    Unknown,
}

/// vCPU settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmCpus {
    /// Maximum vCPU count
    #[serde(default)]
    pub max: u32,
    /// Current vCPU count
    #[serde(default)]
    pub number: u32,
}

/// Memory settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmMemory {
    /// Memory size in bytes
    #[serde(default)]
    pub size: u64,
}

/// A VM in the Xen Orchestra inventory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawVmRecord")]
pub struct VmRecord {
    /// VM uuid
    pub id: Uuid,
    /// Pool the VM belongs to
    #[serde(rename = "$pool")]
    pub pool_id: Uuid,
    /// Human-readable VM name
    pub name_label: String,
    /// Host currently running the VM
    #[serde(rename = "$container")]
    pub container: String,
    /// vCPU settings
    #[serde(rename = "CPUs")]
    pub cpus: VmCpus,
    /// Memory settings
    pub memory: VmMemory,
    /// Current power state
    pub power_state: PowerState,
}

/// Wire shape of a VM object
///
/// Full objects carry both `$pool` and the deprecated `$poolId`, so they
/// cannot share one field.
#[derive(Deserialize)]
struct RawVmRecord {
    id: Uuid,
    #[serde(rename = "$pool", default)]
    pool: Option<Uuid>,
    #[serde(rename = "$poolId", default)]
    pool_legacy: Option<Uuid>,
    #[serde(default)]
    name_label: String,
    #[serde(rename = "$container", default)]
    container: String,
    #[serde(rename = "CPUs", default)]
    cpus: VmCpus,
    #[serde(default)]
    memory: VmMemory,
    #[serde(default)]
    power_state: PowerState,
}

impl From<RawVmRecord> for VmRecord {
    fn from(raw: RawVmRecord) -> Self {
        Self {
            id: raw.id,
            pool_id: raw.pool.or(raw.pool_legacy).unwrap_or_default(),
            name_label: raw.name_label,
            container: raw.container,
            cpus: raw.cpus,
            memory: raw.memory,
            power_state: raw.power_state,
        }
    }
}

/// Read-only view of the VM inventory
#[cfg_attr(test, automock)]
#[async_trait]
pub trait VmInventory: Send + Sync {
    /// Fetch a VM by id
    ///
    /// Returns `Ok(None)` when the inventory reports the VM does not exist.
    /// Any other failure is an error.
    async fn get_by_id(&self, id: Uuid) -> Result<Option<VmRecord>, Error>;

    /// List VMs matching an inventory filter expression (e.g. `name_label:foo`)
    ///
    /// `limit` of `None` means no limit.
    async fn list(&self, filter: &str, limit: Option<usize>) -> Result<Vec<VmRecord>, Error>;
}
