//! Node label synchronization
//!
//! Periodically reconciles the topology labels of every node with the VM
//! inventory: zone (host), region (pool), instance type, and the labels under
//! the `k8s.xenorchestra` namespace. Migrations are reported as Kubernetes
//! Events on the node.

#![deny(missing_docs)]

pub mod controller;
pub mod diff;
pub mod nodes;

pub use controller::{LabelSyncConfig, LabelSyncController, NodeSyncOutcome, SyncStats};
pub use diff::{compute_label_diff, LabelChange, LabelDiff};
pub use nodes::{has_uninitialized_taint, KubeNodeClient, NodeClient};
