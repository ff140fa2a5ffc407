//! Kubernetes Event recording for node label sync.
//!
//! Provides a trait-based abstraction over `kube::runtime::events::Recorder`
//! so the reconciliation loop can emit standard Kubernetes Events visible via
//! `kubectl describe node`.
//!
//! Events are **fire-and-forget**: many workers publish concurrently, the
//! production sink only enqueues, and a single background task owns the
//! recorder. Failures are logged as warnings and never reach the caller.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, ObjectReference};
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::{Client, ResourceExt};
use tokio::sync::mpsc;
use tracing::warn;

/// Trait for publishing Kubernetes Events.
///
/// Implementations must be safe to call from many workers at once and must
/// not block on the API server.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a Kubernetes Event on the given resource.
    ///
    /// # Arguments
    ///
    /// * `resource_ref` - The Kubernetes object this event is about
    /// * `type_` - Normal or Warning
    /// * `reason` - Machine-readable reason string (e.g. "NodeZoneChanged")
    /// * `action` - What action was taken (e.g. "SyncLabels")
    /// * `note` - Optional human-readable message
    async fn publish(
        &self,
        resource_ref: &ObjectReference,
        type_: EventType,
        reason: &str,
        action: &str,
        note: Option<String>,
    );
}

struct QueuedEvent {
    reference: ObjectReference,
    event: Event,
}

/// Production implementation backed by `kube::runtime::events::Recorder`.
///
/// `publish()` pushes onto an unbounded queue; a drain task spawned by
/// [`KubeEventPublisher::new`] writes events to the API server in order of
/// arrival.
pub struct KubeEventPublisher {
    tx: mpsc::UnboundedSender<QueuedEvent>,
}

impl KubeEventPublisher {
    /// Create a new publisher for the given controller name.
    ///
    /// The controller name appears as the "reportingComponent" on Events.
    /// Must be called from within a Tokio runtime.
    pub fn new(client: Client, controller_name: &str) -> Self {
        let reporter = Reporter {
            controller: controller_name.to_string(),
            instance: std::env::var("POD_NAME").ok(),
        };
        let recorder = Recorder::new(client, reporter);
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(drain_events(recorder, rx));
        Self { tx }
    }
}

async fn drain_events(recorder: Recorder, mut rx: mpsc::UnboundedReceiver<QueuedEvent>) {
    while let Some(queued) = rx.recv().await {
        if let Err(e) = recorder.publish(&queued.event, &queued.reference).await {
            warn!(
                reason = %queued.event.reason,
                object = ?queued.reference.name,
                error = %e,
                "Failed to publish Kubernetes event"
            );
        }
    }
}

#[async_trait]
impl EventPublisher for KubeEventPublisher {
    async fn publish(
        &self,
        resource_ref: &ObjectReference,
        type_: EventType,
        reason: &str,
        action: &str,
        note: Option<String>,
    ) {
        let queued = QueuedEvent {
            reference: resource_ref.clone(),
            event: Event {
                type_,
                reason: reason.to_string(),
                note,
                action: action.to_string(),
                secondary: None,
            },
        };
        if self.tx.send(queued).is_err() {
            warn!(reason, action, "Event queue closed, dropping event");
        }
    }
}

/// No-op implementation for tests.
pub struct NoopEventPublisher;

#[async_trait]
impl EventPublisher for NoopEventPublisher {
    async fn publish(
        &self,
        _resource_ref: &ObjectReference,
        _type_: EventType,
        _reason: &str,
        _action: &str,
        _note: Option<String>,
    ) {
    }
}

/// Build the event target reference for a node
pub fn node_reference(node: &Node) -> ObjectReference {
    ObjectReference {
        api_version: Some("v1".to_string()),
        kind: Some("Node".to_string()),
        name: Some(node.name_any()),
        uid: node.metadata.uid.clone(),
        ..Default::default()
    }
}

/// Well-known event reason strings.
///
/// These appear in `kubectl get events` under the REASON column.
pub mod reasons {
    /// The VM backing the node moved to another host
    pub const NODE_ZONE_CHANGED: &str = "NodeZoneChanged";
    /// The VM backing the node moved to another pool
    pub const NODE_REGION_CHANGED: &str = "NodeRegionChanged";
    /// The VM backing the node changed CPU count or memory size
    pub const NODE_INSTANCE_TYPE_CHANGED: &str = "NodeInstanceTypeHasChanged";
}

/// Well-known event action strings.
pub mod actions {
    /// Node labels synchronized from the inventory
    pub const SYNC_LABELS: &str = "SyncLabels";
}
