//! Node label sync controller
//!
//! Every period the controller takes a snapshot of all nodes and reconciles
//! them against the inventory with bounded parallelism. A failing node is
//! logged and retried on the next tick; it never holds up the others.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use k8s_openapi::api::core::v1::Node;
use kube::runtime::events::EventType;
use kube::ResourceExt;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use xoccm_common::events::{actions, node_reference, reasons, EventPublisher};
use xoccm_common::Error;
use xoccm_provider::Instances;

use crate::diff::{compute_label_diff, LabelChange, LabelDiff};
use crate::nodes::{has_uninitialized_taint, NodeClient};

/// Default reconciliation period
pub const DEFAULT_SYNC_PERIOD: Duration = Duration::from_secs(300);

/// Loop settings, validated by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelSyncConfig {
    /// Time between ticks
    pub period: Duration,
    /// Nodes reconciled concurrently within a tick
    pub workers: usize,
}

impl Default for LabelSyncConfig {
    fn default() -> Self {
        Self {
            period: DEFAULT_SYNC_PERIOD,
            workers: 1,
        }
    }
}

/// What happened to one node during a tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeSyncOutcome {
    /// Still carries the uninitialized taint
    SkippedUninitialized,
    /// Provider ID belongs to another provider
    Unmanaged,
    /// Labels already match the inventory
    Unchanged,
    /// Labels were patched
    Updated(LabelDiff),
}

/// Per-tick tally
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Nodes whose labels were patched
    pub updated: usize,
    /// Nodes already in sync
    pub unchanged: usize,
    /// Tainted or unmanaged nodes
    pub skipped: usize,
    /// Nodes that failed and will be retried next tick
    pub failed: usize,
}

/// Keeps node topology labels in line with the VM inventory
pub struct LabelSyncController {
    nodes: Arc<dyn NodeClient>,
    instances: Instances,
    events: Arc<dyn EventPublisher>,
    config: LabelSyncConfig,
}

impl LabelSyncController {
    /// Create a controller from its collaborators
    pub fn new(
        nodes: Arc<dyn NodeClient>,
        instances: Instances,
        events: Arc<dyn EventPublisher>,
        config: LabelSyncConfig,
    ) -> Self {
        Self {
            nodes,
            instances,
            events,
            config,
        }
    }

    /// Run ticks until `shutdown` is cancelled
    ///
    /// Ticks never overlap. On shutdown the in-flight tick is left to finish
    /// on its own and this returns immediately.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        info!(
            period_secs = self.config.period.as_secs(),
            workers = self.config.workers,
            "Starting node label sync controller"
        );

        let mut ticker = tokio::time::interval(self.config.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let controller = Arc::clone(&self);
            let tick = tokio::spawn(async move { controller.sync_all().await });

            tokio::select! {
                _ = shutdown.cancelled() => break,
                result = tick => {
                    if let Err(e) = result {
                        error!(error = %e, "Node label sync tick panicked");
                    }
                }
            }
        }

        info!("Node label sync controller stopped");
    }

    /// Reconcile every known node once
    pub async fn sync_all(&self) -> SyncStats {
        let started = Instant::now();
        let nodes = match self.nodes.list_nodes().await {
            Ok(nodes) => nodes,
            Err(e) => {
                error!(error = %e, "Failed to list nodes");
                return SyncStats::default();
            }
        };
        let total = nodes.len();

        let outcomes: Vec<Result<NodeSyncOutcome, Error>> = stream::iter(nodes)
            .map(|node| async move { self.sync_node_logged(&node).await })
            .buffer_unordered(self.config.workers.max(1))
            .collect()
            .await;

        let mut stats = SyncStats::default();
        for outcome in outcomes {
            match outcome {
                Ok(NodeSyncOutcome::Updated(_)) => stats.updated += 1,
                Ok(NodeSyncOutcome::Unchanged) => stats.unchanged += 1,
                Ok(NodeSyncOutcome::SkippedUninitialized | NodeSyncOutcome::Unmanaged) => {
                    stats.skipped += 1
                }
                Err(_) => stats.failed += 1,
            }
        }

        debug!(
            nodes = total,
            updated = stats.updated,
            unchanged = stats.unchanged,
            skipped = stats.skipped,
            failed = stats.failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Node label sync tick finished"
        );
        stats
    }

    async fn sync_node_logged(&self, node: &Node) -> Result<NodeSyncOutcome, Error> {
        let result = self.sync_node(node).await;
        if let Err(e) = &result {
            let name = node.name_any();
            if e.is_not_found() {
                info!(node = %name, error = %e, "VM not found, node is likely being deleted");
            } else if e.is_retryable() {
                warn!(node = %name, error = %e, "Node label sync failed, retrying next tick");
            } else {
                error!(node = %name, error = %e, "Node label sync failed");
            }
        }
        result
    }

    /// Reconcile a single node
    ///
    /// Events are only published once the patch is reported as persisted.
    pub async fn sync_node(&self, node: &Node) -> Result<NodeSyncOutcome, Error> {
        let name = node.name_any();

        if has_uninitialized_taint(node) {
            debug!(node = %name, "Node is still tainted, skipping");
            return Ok(NodeSyncOutcome::SkippedUninitialized);
        }

        let metadata = self.instances.instance_metadata(node).await?;
        if metadata.is_empty() {
            debug!(node = %name, "Node is not managed by this provider, skipping");
            return Ok(NodeSyncOutcome::Unmanaged);
        }

        let diff = compute_label_diff(node.labels(), &metadata);
        if diff.is_empty() {
            debug!(node = %name, "Node labels are up to date");
            return Ok(NodeSyncOutcome::Unchanged);
        }

        debug!(node = %name, labels = ?diff.labels, "Updating node labels");
        if !self.nodes.patch_labels(node, &diff.labels).await? {
            return Err(Error::external_update(
                &name,
                "label update was not persisted",
            ));
        }
        info!(node = %name, count = diff.labels.len(), "Updated node labels");

        self.publish_changes(node, &diff).await;
        Ok(NodeSyncOutcome::Updated(diff))
    }

    async fn publish_changes(&self, node: &Node, diff: &LabelDiff) {
        let reference = node_reference(node);
        let name = node.name_any();

        if let Some(change) = &diff.zone {
            self.events
                .publish(
                    &reference,
                    EventType::Warning,
                    reasons::NODE_ZONE_CHANGED,
                    actions::SYNC_LABELS,
                    Some(note(&name, "zone changed (node VM host changed)", change)),
                )
                .await;
        }

        if let Some(change) = &diff.region {
            self.events
                .publish(
                    &reference,
                    EventType::Warning,
                    reasons::NODE_REGION_CHANGED,
                    actions::SYNC_LABELS,
                    Some(note(&name, "region changed (node VM pool changed)", change)),
                )
                .await;
        }

        if let Some(change) = &diff.instance_type {
            self.events
                .publish(
                    &reference,
                    EventType::Normal,
                    reasons::NODE_INSTANCE_TYPE_CHANGED,
                    actions::SYNC_LABELS,
                    Some(note(
                        &name,
                        "instance type has changed (node VM memory and/or CPUs changed)",
                        change,
                    )),
                )
                .await;
        }
    }
}

fn note(node: &str, what: &str, change: &LabelChange) -> String {
    format!("Node {node} {what}: old={}, new={}", change.old, change.new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::MockNodeClient;
    use async_trait::async_trait;
    use k8s_openapi::api::core::v1::{NodeSpec, ObjectReference, Taint};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use mockall::mock;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::Notify;
    use uuid::Uuid;
    use xoccm_common::labels::{
        LABEL_FAILURE_DOMAIN_BETA_ZONE, LABEL_INSTANCE_TYPE_STABLE, LABEL_TOPOLOGY_REGION,
        LABEL_TOPOLOGY_ZONE, TAINT_EXTERNAL_CLOUD_PROVIDER, XO_LABEL_TOPOLOGY_HOST_ID,
        XO_LABEL_TOPOLOGY_ORIGINAL_HOST_ID, XO_LABEL_TOPOLOGY_POOL_ID, XO_LABEL_VM_NAME_LABEL,
    };
    use xoccm_provider::inventory::{VmCpus, VmMemory};
    use xoccm_provider::{PowerState, VmInventory, VmRecord};

    const POOL: &str = "a3c8f86b-9c2f-4c3d-8a7b-2d44e6f77f1d";
    const VM: &str = "550e8400-e29b-41d4-a716-446655440001";
    const GIB: u64 = 1024 * 1024 * 1024;

    mock! {
        Inventory {}

        #[async_trait]
        impl VmInventory for Inventory {
            async fn get_by_id(&self, id: Uuid) -> Result<Option<VmRecord>, Error>;
            async fn list(&self, filter: &str, limit: Option<usize>) -> Result<Vec<VmRecord>, Error>;
        }
    }

    #[derive(Default)]
    struct RecordingPublisher {
        events: Mutex<Vec<(EventType, String, Option<String>)>>,
    }

    #[async_trait]
    impl EventPublisher for RecordingPublisher {
        async fn publish(
            &self,
            _resource_ref: &ObjectReference,
            type_: EventType,
            reason: &str,
            _action: &str,
            note: Option<String>,
        ) {
            self.events
                .lock()
                .unwrap()
                .push((type_, reason.to_string(), note));
        }
    }

    // =========================================================================
    // Test Helpers
    // =========================================================================

    fn vm_on(host: &str) -> VmRecord {
        VmRecord {
            id: Uuid::parse_str(VM).unwrap(),
            pool_id: Uuid::parse_str(POOL).unwrap(),
            name_label: "worker-1".to_string(),
            container: host.to_string(),
            cpus: VmCpus { max: 2, number: 2 },
            memory: VmMemory { size: 2 * GIB },
            power_state: PowerState::Running,
        }
    }

    fn tracked_node() -> Node {
        let labels = [
            (LABEL_TOPOLOGY_ZONE, "host-1"),
            (LABEL_FAILURE_DOMAIN_BETA_ZONE, "host-1"),
            (LABEL_TOPOLOGY_REGION, POOL),
            (LABEL_INSTANCE_TYPE_STABLE, "2vCPU-2GB"),
            (XO_LABEL_VM_NAME_LABEL, "worker-1"),
            (XO_LABEL_TOPOLOGY_POOL_ID, POOL),
            (XO_LABEL_TOPOLOGY_HOST_ID, "host-1"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect::<BTreeMap<_, _>>();

        Node {
            metadata: ObjectMeta {
                name: Some("worker-1".to_string()),
                labels: Some(labels),
                ..Default::default()
            },
            spec: Some(NodeSpec {
                provider_id: Some(format!("xenorchestra://{POOL}/{VM}")),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn inventory_on(host: &'static str) -> MockInventory {
        let mut inventory = MockInventory::new();
        inventory
            .expect_get_by_id()
            .returning(move |_| Ok(Some(vm_on(host))));
        inventory
    }

    fn controller(
        nodes: MockNodeClient,
        inventory: MockInventory,
        events: Arc<RecordingPublisher>,
    ) -> LabelSyncController {
        LabelSyncController::new(
            Arc::new(nodes),
            Instances::new(Arc::new(inventory)),
            events,
            LabelSyncConfig::default(),
        )
    }

    // =========================================================================
    // sync_node
    // =========================================================================

    #[tokio::test]
    async fn in_sync_node_is_not_patched() {
        let mut nodes = MockNodeClient::new();
        nodes.expect_patch_labels().never();
        let events = Arc::new(RecordingPublisher::default());

        let outcome = controller(nodes, inventory_on("host-1"), events.clone())
            .sync_node(&tracked_node())
            .await
            .unwrap();

        assert_eq!(outcome, NodeSyncOutcome::Unchanged);
        assert!(events.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn migration_patches_and_emits_one_warning() {
        let mut nodes = MockNodeClient::new();
        nodes
            .expect_patch_labels()
            .withf(|_, labels| {
                labels.get(LABEL_TOPOLOGY_ZONE).map(String::as_str) == Some("host-2")
                    && labels.get(XO_LABEL_TOPOLOGY_ORIGINAL_HOST_ID).map(String::as_str)
                        == Some("host-1")
            })
            .times(1)
            .returning(|_, _| Ok(true));
        let events = Arc::new(RecordingPublisher::default());

        let outcome = controller(nodes, inventory_on("host-2"), events.clone())
            .sync_node(&tracked_node())
            .await
            .unwrap();
        assert!(matches!(outcome, NodeSyncOutcome::Updated(ref d) if d.zone.is_some()));

        let recorded = events.events.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        let (type_, reason, note) = &recorded[0];
        assert_eq!(*type_, EventType::Warning);
        assert_eq!(reason, reasons::NODE_ZONE_CHANGED);
        let note = note.as_deref().unwrap();
        assert!(note.contains("old=host-1"));
        assert!(note.contains("new=host-2"));
    }

    #[tokio::test]
    async fn unpersisted_patch_is_an_error_without_events() {
        let mut nodes = MockNodeClient::new();
        nodes.expect_patch_labels().returning(|_, _| Ok(false));
        let events = Arc::new(RecordingPublisher::default());

        let err = controller(nodes, inventory_on("host-2"), events.clone())
            .sync_node(&tracked_node())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ExternalUpdate { .. }));
        assert!(err.is_retryable());
        assert!(events.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn tainted_node_is_skipped_before_lookup() {
        let mut inventory = MockInventory::new();
        inventory.expect_get_by_id().never();
        let mut nodes = MockNodeClient::new();
        nodes.expect_patch_labels().never();

        let mut node = tracked_node();
        if let Some(spec) = node.spec.as_mut() {
            spec.taints = Some(vec![Taint {
                key: TAINT_EXTERNAL_CLOUD_PROVIDER.to_string(),
                effect: "NoSchedule".to_string(),
                ..Default::default()
            }]);
        }

        let outcome = controller(nodes, inventory, Arc::default())
            .sync_node(&node)
            .await
            .unwrap();
        assert_eq!(outcome, NodeSyncOutcome::SkippedUninitialized);
    }

    #[tokio::test]
    async fn foreign_node_is_unmanaged() {
        let mut inventory = MockInventory::new();
        inventory.expect_get_by_id().never();

        let mut node = tracked_node();
        if let Some(spec) = node.spec.as_mut() {
            spec.provider_id = Some("foreign://x/y".to_string());
        }

        let outcome = controller(MockNodeClient::new(), inventory, Arc::default())
            .sync_node(&node)
            .await
            .unwrap();
        assert_eq!(outcome, NodeSyncOutcome::Unmanaged);
    }

    #[tokio::test]
    async fn instance_type_event_reports_previous_type() {
        let mut inventory = MockInventory::new();
        inventory.expect_get_by_id().returning(|_| {
            Ok(Some(VmRecord {
                cpus: VmCpus { max: 4, number: 4 },
                memory: VmMemory { size: 8 * GIB },
                ..vm_on("host-1")
            }))
        });
        let mut nodes = MockNodeClient::new();
        nodes.expect_patch_labels().returning(|_, _| Ok(true));
        let events = Arc::new(RecordingPublisher::default());

        controller(nodes, inventory, events.clone())
            .sync_node(&tracked_node())
            .await
            .unwrap();

        let recorded = events.events.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].0, EventType::Normal);
        assert_eq!(recorded[0].1, reasons::NODE_INSTANCE_TYPE_CHANGED);
        let note = recorded[0].2.as_deref().unwrap();
        assert!(note.contains("old=2vCPU-2GB"));
        assert!(note.contains("new=4vCPU-8GB"));
    }

    // =========================================================================
    // sync_all
    // =========================================================================

    #[tokio::test]
    async fn failing_node_does_not_abort_the_tick() {
        let mut healthy = tracked_node();
        healthy.metadata.name = Some("healthy".to_string());
        let mut broken = tracked_node();
        broken.metadata.name = Some("broken".to_string());
        if let Some(spec) = broken.spec.as_mut() {
            spec.provider_id = Some("xenorchestra://not-a-pool/vm".to_string());
        }

        let mut nodes = MockNodeClient::new();
        nodes
            .expect_list_nodes()
            .returning(move || Ok(vec![broken.clone(), healthy.clone()]));
        nodes.expect_patch_labels().returning(|_, _| Ok(true));

        let ctrl = LabelSyncController::new(
            Arc::new(nodes),
            Instances::new(Arc::new(inventory_on("host-2"))),
            Arc::new(RecordingPublisher::default()),
            LabelSyncConfig {
                period: Duration::from_secs(1),
                workers: 4,
            },
        );

        let stats = ctrl.sync_all().await;
        assert_eq!(stats.updated, 1);
        assert_eq!(stats.failed, 1);
    }

    #[tokio::test]
    async fn list_failure_yields_empty_tick() {
        let mut nodes = MockNodeClient::new();
        nodes
            .expect_list_nodes()
            .returning(|| Err(Error::transport("cache unavailable")));

        let stats = controller(nodes, MockInventory::new(), Arc::default())
            .sync_all()
            .await;
        assert_eq!(stats, SyncStats::default());
    }

    #[tokio::test]
    async fn rejected_patch_is_not_retried_and_emits_nothing() {
        let mut nodes = MockNodeClient::new();
        nodes.expect_patch_labels().returning(|_, _| {
            Err(Error::from(kube::Error::Api(kube::error::ErrorResponse {
                status: "Failure".to_string(),
                message: "nodes \"worker-1\" not found".to_string(),
                reason: "NotFound".to_string(),
                code: 404,
            })))
        });
        let events = Arc::new(RecordingPublisher::default());

        let err = controller(nodes, inventory_on("host-2"), events.clone())
            .sync_node(&tracked_node())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Kube { .. }));
        assert!(!err.is_retryable());
        assert!(events.events.lock().unwrap().is_empty());
    }

    /// Inventory that records how many lookups run at once
    #[derive(Default)]
    struct CountingInventory {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl VmInventory for CountingInventory {
        async fn get_by_id(&self, _id: Uuid) -> Result<Option<VmRecord>, Error> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(Some(vm_on("host-1")))
        }

        async fn list(&self, _filter: &str, _limit: Option<usize>) -> Result<Vec<VmRecord>, Error> {
            Ok(vec![])
        }
    }

    /// Inventory whose lookups never complete
    #[derive(Default)]
    struct StuckInventory {
        started: Notify,
    }

    #[async_trait]
    impl VmInventory for StuckInventory {
        async fn get_by_id(&self, _id: Uuid) -> Result<Option<VmRecord>, Error> {
            self.started.notify_one();
            std::future::pending().await
        }

        async fn list(&self, _filter: &str, _limit: Option<usize>) -> Result<Vec<VmRecord>, Error> {
            Ok(vec![])
        }
    }

    fn named_nodes(count: usize) -> Vec<Node> {
        (0..count)
            .map(|i| {
                let mut node = tracked_node();
                node.metadata.name = Some(format!("worker-{i}"));
                node
            })
            .collect()
    }

    #[tokio::test]
    async fn concurrency_never_exceeds_worker_count() {
        let all = named_nodes(8);
        let mut nodes = MockNodeClient::new();
        nodes
            .expect_list_nodes()
            .returning(move || Ok(all.clone()));

        let inventory = Arc::new(CountingInventory::default());
        let ctrl = LabelSyncController::new(
            Arc::new(nodes),
            Instances::new(inventory.clone()),
            Arc::new(RecordingPublisher::default()),
            LabelSyncConfig {
                period: Duration::from_secs(60),
                workers: 3,
            },
        );

        let stats = ctrl.sync_all().await;
        assert_eq!(stats.unchanged, 8);

        let peak = inventory.peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak concurrency {peak} exceeds 3 workers");
        assert!(peak > 1, "nodes were not processed in parallel");
    }

    #[tokio::test]
    async fn single_worker_processes_nodes_one_at_a_time() {
        let all = named_nodes(4);
        let mut nodes = MockNodeClient::new();
        nodes
            .expect_list_nodes()
            .returning(move || Ok(all.clone()));

        let inventory = Arc::new(CountingInventory::default());
        let ctrl = LabelSyncController::new(
            Arc::new(nodes),
            Instances::new(inventory.clone()),
            Arc::new(RecordingPublisher::default()),
            LabelSyncConfig::default(),
        );

        ctrl.sync_all().await;
        assert_eq!(inventory.peak.load(Ordering::SeqCst), 1);
    }

    // =========================================================================
    // run
    // =========================================================================

    #[tokio::test]
    async fn shutdown_does_not_wait_for_in_flight_tick() {
        let mut nodes = MockNodeClient::new();
        nodes
            .expect_list_nodes()
            .returning(|| Ok(vec![tracked_node()]));

        let inventory = Arc::new(StuckInventory::default());
        let ctrl = Arc::new(LabelSyncController::new(
            Arc::new(nodes),
            Instances::new(inventory.clone()),
            Arc::new(RecordingPublisher::default()),
            LabelSyncConfig::default(),
        ));
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(ctrl.run(shutdown.clone()));

        // The first tick fires immediately and parks in the inventory
        inventory.started.notified().await;
        shutdown.cancel();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("controller waited for the in-flight tick")
            .unwrap();
    }

    #[tokio::test]
    async fn slow_tick_is_not_overlapped_by_the_next() {
        let listings = Arc::new(AtomicUsize::new(0));
        let counter = listings.clone();
        let mut nodes = MockNodeClient::new();
        nodes.expect_list_nodes().returning(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(vec![tracked_node()])
        });

        let ctrl = Arc::new(LabelSyncController::new(
            Arc::new(nodes),
            Instances::new(Arc::new(StuckInventory::default())),
            Arc::new(RecordingPublisher::default()),
            LabelSyncConfig {
                period: Duration::from_millis(10),
                workers: 1,
            },
        ));
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(ctrl.run(shutdown.clone()));

        // Many periods elapse while the first tick is stuck
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(listings.load(Ordering::SeqCst), 1);

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("controller did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let mut nodes = MockNodeClient::new();
        nodes.expect_list_nodes().returning(|| Ok(vec![]));

        let ctrl = Arc::new(controller(nodes, MockInventory::new(), Arc::default()));
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(ctrl.run(shutdown.clone()));

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("controller did not stop")
            .unwrap();
    }
}
