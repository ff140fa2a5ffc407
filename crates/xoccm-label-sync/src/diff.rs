//! Label diff engine
//!
//! Compares a node's current labels with freshly resolved instance metadata
//! and stages the minimal set of label writes. Rules are applied in order and
//! independently, so one cycle can stage several categories at once:
//!
//! 1. namespaced labels from the inventory are added or overwritten
//! 2. a zone change moves both zone labels and records the original host
//! 3. a region change moves both region labels and records the original pool
//! 4. an instance type change moves both instance type labels
//!
//! The `original_*` provenance labels are write-once. They keep the first
//! known location across any number of later migrations.

use std::collections::BTreeMap;

use xoccm_common::labels::{
    in_xo_namespace, LABEL_FAILURE_DOMAIN_BETA_REGION, LABEL_FAILURE_DOMAIN_BETA_ZONE,
    LABEL_INSTANCE_TYPE, LABEL_INSTANCE_TYPE_STABLE, LABEL_TOPOLOGY_REGION, LABEL_TOPOLOGY_ZONE,
    XO_LABEL_TOPOLOGY_ORIGINAL_HOST_ID, XO_LABEL_TOPOLOGY_ORIGINAL_POOL_ID,
};
use xoccm_provider::InstanceMetadata;

/// A tracked value that moved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelChange {
    /// Value currently on the node
    pub old: String,
    /// Value reported by the inventory
    pub new: String,
}

/// Label writes staged for one node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelDiff {
    /// Every key to write with its new value
    pub labels: BTreeMap<String, String>,
    /// Set when the zone (host) changed
    pub zone: Option<LabelChange>,
    /// Set when the region (pool) changed
    pub region: Option<LabelChange>,
    /// Set when the instance type changed
    pub instance_type: Option<LabelChange>,
}

impl LabelDiff {
    /// Nothing to write
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Apply the staged writes to a label map
    pub fn apply_to(&self, labels: &mut BTreeMap<String, String>) {
        labels.extend(self.labels.clone());
    }

    fn stage(&mut self, key: &str, value: &str) {
        self.labels.insert(key.to_string(), value.to_string());
    }
}

/// Compute the label writes that bring `current` in line with `metadata`
///
/// Metadata without additional labels comes from a node we do not manage and
/// always yields an empty diff.
pub fn compute_label_diff(
    current: &BTreeMap<String, String>,
    metadata: &InstanceMetadata,
) -> LabelDiff {
    let mut diff = LabelDiff::default();
    if metadata.additional_labels.is_empty() {
        return diff;
    }

    for (key, value) in &metadata.additional_labels {
        if in_xo_namespace(key) && current.get(key) != Some(value) {
            diff.stage(key, value);
        }
    }

    if let Some(change) = moved(current, LABEL_TOPOLOGY_ZONE, &metadata.zone) {
        if !current.contains_key(XO_LABEL_TOPOLOGY_ORIGINAL_HOST_ID) {
            diff.stage(XO_LABEL_TOPOLOGY_ORIGINAL_HOST_ID, &change.old);
        }
        diff.stage(LABEL_TOPOLOGY_ZONE, &change.new);
        diff.stage(LABEL_FAILURE_DOMAIN_BETA_ZONE, &change.new);
        diff.zone = Some(change);
    }

    if let Some(change) = moved(current, LABEL_TOPOLOGY_REGION, &metadata.region) {
        if !current.contains_key(XO_LABEL_TOPOLOGY_ORIGINAL_POOL_ID) {
            diff.stage(XO_LABEL_TOPOLOGY_ORIGINAL_POOL_ID, &change.old);
        }
        diff.stage(LABEL_TOPOLOGY_REGION, &change.new);
        diff.stage(LABEL_FAILURE_DOMAIN_BETA_REGION, &change.new);
        diff.region = Some(change);
    }

    if let Some(change) = moved(current, LABEL_INSTANCE_TYPE_STABLE, &metadata.instance_type) {
        diff.stage(LABEL_INSTANCE_TYPE_STABLE, &change.new);
        diff.stage(LABEL_INSTANCE_TYPE, &change.new);
        diff.instance_type = Some(change);
    }

    diff
}

/// A label that is already set and differs from a non-empty fresh value
fn moved(current: &BTreeMap<String, String>, key: &str, fresh: &str) -> Option<LabelChange> {
    let old = current.get(key).filter(|v| !v.is_empty())?;
    (!fresh.is_empty() && old != fresh).then(|| LabelChange {
        old: old.clone(),
        new: fresh.to_string(),
    })
}
