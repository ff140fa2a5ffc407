//! Node to VM identity resolution
//!
//! A node is matched to its VM in one of two ways:
//!
//! 1. **Declared**: `spec.providerID` is `xenorchestra://pool/vm`. The VM is
//!    fetched by id and must still live in the declared pool.
//! 2. **First registration**: no provider ID yet. The VM id is taken from the
//!    SMBIOS system UUID the kubelet reports, trying the verbatim value first
//!    and then the byte-order-corrected one. No pool check is possible.
//!
//! Nodes whose provider ID belongs to another provider are unmanaged and are
//! reported as such, not as an error.

use std::sync::Arc;

use k8s_openapi::api::core::v1::Node;
use kube::ResourceExt;
use uuid::Uuid;

use xoccm_common::labels::ANNOTATION_PROVIDED_IP_ADDR;
use xoccm_common::provider_id::is_managed;
use xoccm_common::{Error, ProviderId};

use crate::instance::InstanceMetadata;
use crate::inventory::{PowerState, VmInventory, VmRecord};
use crate::smbios::swap_smbios_uuid;

/// A node matched to its VM
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedInstance {
    /// The VM as currently reported by the inventory
    pub vm: VmRecord,
    /// Pool of the VM, which is the node's region
    pub pool_id: Uuid,
    /// Provider ID the node carries, or should carry
    pub provider_id: String,
}

/// Instance lookups for cluster nodes
#[derive(Clone)]
pub struct Instances {
    inventory: Arc<dyn VmInventory>,
}

impl Instances {
    /// Create a resolver over the given inventory
    pub fn new(inventory: Arc<dyn VmInventory>) -> Self {
        Self { inventory }
    }

    /// Find the VM backing `node`
    ///
    /// Returns `Ok(None)` for nodes owned by another provider. A VM that no
    /// longer exists is reported as [`Error::InstanceNotFound`].
    pub async fn resolve(&self, node: &Node) -> Result<Option<ResolvedInstance>, Error> {
        let name = node.name_any();
        match declared_provider_id(node) {
            None => self.resolve_by_system_uuid(&name, node).await.map(Some),
            Some(raw) if !is_managed(raw) => Ok(None),
            Some(raw) => self.resolve_declared(&name, raw).await.map(Some),
        }
    }

    async fn resolve_declared(&self, name: &str, raw: &str) -> Result<ResolvedInstance, Error> {
        let declared = ProviderId::parse(raw)?;

        let vm = self
            .inventory
            .get_by_id(declared.vm_id)
            .await?
            .ok_or_else(|| Error::not_found(name, declared.vm_id))?;

        if vm.id != declared.vm_id || vm.pool_id != declared.pool_id {
            return Err(Error::IdentityMismatch {
                node: name.to_string(),
                vm_id: declared.vm_id,
                declared_pool: declared.pool_id,
                actual_pool: vm.pool_id,
            });
        }

        Ok(ResolvedInstance {
            pool_id: vm.pool_id,
            provider_id: raw.to_string(),
            vm,
        })
    }

    async fn resolve_by_system_uuid(
        &self,
        name: &str,
        node: &Node,
    ) -> Result<ResolvedInstance, Error> {
        let reported = system_uuid(node)
            .ok_or_else(|| Error::unresolvable(name, "node has no providerID and no SystemUUID"))?;
        let reported = Uuid::parse_str(reported)
            .map_err(|e| Error::unresolvable(name, format!("invalid SystemUUID format: {e}")))?;

        let corrected = swap_smbios_uuid(reported);
        let candidates = if corrected == reported {
            vec![reported]
        } else {
            vec![reported, corrected]
        };

        for candidate in candidates {
            if let Some(vm) = self.inventory.get_by_id(candidate).await? {
                return Ok(ResolvedInstance {
                    pool_id: vm.pool_id,
                    provider_id: ProviderId::new(vm.pool_id, vm.id).to_string(),
                    vm,
                });
            }
        }

        Err(Error::not_found(name, reported))
    }

    /// Build the instance metadata for `node`
    ///
    /// Unmanaged nodes get empty metadata.
    pub async fn instance_metadata(&self, node: &Node) -> Result<InstanceMetadata, Error> {
        let Some(resolved) = self.resolve(node).await? else {
            return Ok(InstanceMetadata::default());
        };

        let name = node.name_any();
        let provided_ips = node
            .annotations()
            .get(ANNOTATION_PROVIDED_IP_ADDR)
            .map(String::as_str);

        Ok(InstanceMetadata::for_vm(
            &name,
            provided_ips,
            resolved.provider_id,
            &resolved.vm,
        ))
    }

    /// Whether the VM backing `node` still exists
    ///
    /// Nodes without a provider ID, or with a foreign one, are assumed to
    /// exist: they are not ours to delete.
    pub async fn instance_exists(&self, node: &Node) -> Result<bool, Error> {
        match declared_provider_id(node) {
            Some(raw) if is_managed(raw) => {}
            _ => return Ok(true),
        }

        match self.resolve(node).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Whether the VM backing `node` is powered off
    ///
    /// Nodes without a provider ID, or with a foreign one, are never reported
    /// as shut down. A missing VM is an error.
    pub async fn instance_shutdown(&self, node: &Node) -> Result<bool, Error> {
        match declared_provider_id(node) {
            Some(raw) if is_managed(raw) => {}
            _ => return Ok(false),
        }

        match self.resolve(node).await? {
            Some(resolved) => Ok(resolved.vm.power_state != PowerState::Running),
            None => Ok(false),
        }
    }

    /// Find a VM by exact `name_label` across all pools
    pub async fn find_vm_by_name(&self, name: &str) -> Result<(VmRecord, Uuid), Error> {
        let vms = self
            .inventory
            .list(&format!("name_label:{name}"), None)
            .await?;

        vms.into_iter()
            .find(|vm| vm.name_label == name)
            .map(|vm| {
                let pool_id = vm.pool_id;
                (vm, pool_id)
            })
            .ok_or_else(|| Error::not_found(name, format!("name_label={name}")))
    }
}

/// Non-empty `spec.providerID`
pub fn declared_provider_id(node: &Node) -> Option<&str> {
    node.spec
        .as_ref()
        .and_then(|spec| spec.provider_id.as_deref())
        .filter(|id| !id.is_empty())
}

fn system_uuid(node: &Node) -> Option<&str> {
    node.status
        .as_ref()
        .and_then(|status| status.node_info.as_ref())
        .map(|info| info.system_uuid.trim())
        .filter(|id| !id.is_empty())
}
