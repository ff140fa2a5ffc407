//! Instance metadata derived from a VM record
//!
//! Pure helpers: nothing here talks to the inventory or logs.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::NodeAddress;

use xoccm_common::labels::{
    XO_LABEL_TOPOLOGY_HOST_ID, XO_LABEL_TOPOLOGY_POOL_ID, XO_LABEL_VM_NAME_LABEL,
};

use crate::inventory::VmRecord;

/// Maximum length of a Kubernetes label value
pub const MAX_LABEL_VALUE_LEN: usize = 63;

/// Node address type for kubelet-provided IPs
pub const ADDRESS_INTERNAL_IP: &str = "InternalIP";
/// Node address type for the node hostname
pub const ADDRESS_HOSTNAME: &str = "Hostname";

const GIB: u64 = 1024 * 1024 * 1024;

/// Everything the inventory tells us about a node, recomputed every cycle
///
/// The default value is the "unmanaged node" result: no identifier and no
/// labels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceMetadata {
    /// Encoded provider identifier
    pub provider_id: String,
    /// Node addresses, provided IPs first then the hostname
    pub node_addresses: Vec<NodeAddress>,
    /// `<cpus>vCPU-<mem>GB`
    pub instance_type: String,
    /// Host currently running the VM
    pub zone: String,
    /// Pool id
    pub region: String,
    /// Sanitized labels under the reserved namespace
    pub additional_labels: BTreeMap<String, String>,
}

impl InstanceMetadata {
    /// Assemble metadata for a resolved VM
    ///
    /// `provided_ips` is the raw value of the provided-node-ip annotation.
    pub fn for_vm(
        node_name: &str,
        provided_ips: Option<&str>,
        provider_id: String,
        vm: &VmRecord,
    ) -> Self {
        let additional_labels = BTreeMap::from([
            (
                XO_LABEL_VM_NAME_LABEL.to_string(),
                sanitize_label_value(&vm.name_label),
            ),
            (
                XO_LABEL_TOPOLOGY_POOL_ID.to_string(),
                sanitize_label_value(&vm.pool_id.to_string()),
            ),
            (
                XO_LABEL_TOPOLOGY_HOST_ID.to_string(),
                sanitize_label_value(&vm.container),
            ),
        ]);

        Self {
            provider_id,
            node_addresses: node_addresses(node_name, provided_ips),
            instance_type: instance_type(vm),
            zone: vm.container.clone(),
            region: vm.pool_id.to_string(),
            additional_labels,
        }
    }

    /// True for the unmanaged-node result
    pub fn is_empty(&self) -> bool {
        self.provider_id.is_empty() && self.additional_labels.is_empty()
    }
}

/// Format the instance type of a VM as `<cpus>vCPU-<memory GiB>GB`
///
/// Memory is truncated to whole GiB, so 1.9 GiB renders as `1GB`.
pub fn instance_type(vm: &VmRecord) -> String {
    format!("{}vCPU-{}GB", vm.cpus.max, vm.memory.size / GIB)
}

/// Turn free text into a legal label value
///
/// Characters outside `[A-Za-z0-9_.-]` become `-`, non-alphanumeric
/// characters are stripped from both ends, and the result is cut to
/// [`MAX_LABEL_VALUE_LEN`].
///
/// Non-ASCII letters are replaced too: label values must be ASCII.
pub fn sanitize_label_value(s: &str) -> String {
    let replaced: String = s
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '-'
            }
        })
        .collect();

    let trimmed = replaced.trim_matches(|c: char| !c.is_ascii_alphanumeric());
    let truncated = &trimmed[..trimmed.len().min(MAX_LABEL_VALUE_LEN)];

    // Truncation can expose a trailing separator
    truncated
        .trim_end_matches(|c: char| !c.is_ascii_alphanumeric())
        .to_string()
}

/// Provided IPs in annotation order followed by the hostname
pub fn node_addresses(node_name: &str, provided_ips: Option<&str>) -> Vec<NodeAddress> {
    let mut addresses: Vec<NodeAddress> = provided_ips
        .into_iter()
        .flat_map(|ips| ips.split(','))
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(|ip| NodeAddress {
            type_: ADDRESS_INTERNAL_IP.to_string(),
            address: ip.to_string(),
        })
        .collect();

    addresses.push(NodeAddress {
        type_: ADDRESS_HOSTNAME.to_string(),
        address: node_name.to_string(),
    });
    addresses
}
