//! Well-known label, taint and annotation keys

/// Reserved label namespace owned by this controller
pub const XO_LABEL_NAMESPACE: &str = "k8s.xenorchestra";

/// Sanitized VM `name_label`
pub const XO_LABEL_VM_NAME_LABEL: &str = "vm.k8s.xenorchestra/name_label";
/// Sanitized pool id the VM currently runs in
pub const XO_LABEL_TOPOLOGY_POOL_ID: &str = "topology.k8s.xenorchestra/pool_id";
/// Sanitized host id the VM currently runs on
pub const XO_LABEL_TOPOLOGY_HOST_ID: &str = "topology.k8s.xenorchestra/host_id";
/// First host the node was observed on, written once
pub const XO_LABEL_TOPOLOGY_ORIGINAL_HOST_ID: &str = "topology.k8s.xenorchestra/original_host_id";
/// First pool the node was observed in, written once
pub const XO_LABEL_TOPOLOGY_ORIGINAL_POOL_ID: &str = "topology.k8s.xenorchestra/original_pool_id";

/// Kubernetes zone label
pub const LABEL_TOPOLOGY_ZONE: &str = "topology.kubernetes.io/zone";
/// Deprecated zone label still read by older schedulers
pub const LABEL_FAILURE_DOMAIN_BETA_ZONE: &str = "failure-domain.beta.kubernetes.io/zone";
/// Kubernetes region label
pub const LABEL_TOPOLOGY_REGION: &str = "topology.kubernetes.io/region";
/// Deprecated region label
pub const LABEL_FAILURE_DOMAIN_BETA_REGION: &str = "failure-domain.beta.kubernetes.io/region";
/// Kubernetes instance type label
pub const LABEL_INSTANCE_TYPE_STABLE: &str = "node.kubernetes.io/instance-type";
/// Legacy instance type label
pub const LABEL_INSTANCE_TYPE: &str = "beta.kubernetes.io/instance-type";

/// Taint carried by nodes the cloud node controller has not initialized yet
pub const TAINT_EXTERNAL_CLOUD_PROVIDER: &str = "node.cloudprovider.kubernetes.io/uninitialized";

/// Comma-separated IPs set by the kubelet with `--node-ip`
pub const ANNOTATION_PROVIDED_IP_ADDR: &str = "alpha.kubernetes.io/provided-node-ip";

/// Whether `key` lives under the reserved [`XO_LABEL_NAMESPACE`]
///
/// Matches the namespace itself and any subdomain of it
/// (`vm.k8s.xenorchestra/...`, `topology.k8s.xenorchestra/...`).
pub fn in_xo_namespace(key: &str) -> bool {
    let Some((prefix, _)) = key.split_once('/') else {
        return false;
    };
    prefix == XO_LABEL_NAMESPACE
        || prefix
            .strip_suffix(XO_LABEL_NAMESPACE)
            .is_some_and(|head| head.ends_with('.'))
}
