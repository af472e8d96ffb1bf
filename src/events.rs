//! Kubernetes Events attached to StreamlineCluster objects
//!
//! Events are the human-visible log of why a reconcile pass paused or what
//! one-time action it took. Publishing is best effort: a failure is logged
//! and never fails the pass.

use crate::crd::StreamlineCluster;
use async_trait::async_trait;
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::{Client, Resource, ResourceExt};
use tracing::warn;

/// Severity of a published event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Normal,
    Warning,
}

// Event reasons
pub const REASON_WAITING: &str = "Waiting";
pub const REASON_NOT_READY: &str = "NotReady";
pub const REASON_CONFLICT: &str = "Conflict";
pub const REASON_RECONCILE_FAILED: &str = "ReconcileFailed";
pub const REASON_STORAGE_BOOTSTRAPPED: &str = "StorageBootstrapped";
pub const REASON_COMPUTE_INITIALIZED: &str = "ComputeInitialized";
pub const REASON_METADATA_READY: &str = "MetadataReady";
pub const REASON_SCALING: &str = "Scaling";
pub const REASON_SCALE_REJECTED: &str = "ScaleRejected";
pub const REASON_DRAINED: &str = "Drained";

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, cluster: &StreamlineCluster, kind: EventKind, reason: &str, note: &str);
}

/// Publishes events through the Kubernetes events API.
#[derive(Clone)]
pub struct KubeEventPublisher {
    client: Client,
    reporter: Reporter,
}

impl KubeEventPublisher {
    pub fn new(client: Client, controller: impl Into<String>) -> Self {
        Self {
            client,
            reporter: Reporter {
                controller: controller.into(),
                instance: std::env::var("POD_NAME").ok(),
            },
        }
    }
}

#[async_trait]
impl EventPublisher for KubeEventPublisher {
    async fn publish(&self, cluster: &StreamlineCluster, kind: EventKind, reason: &str, note: &str) {
        let recorder = Recorder::new(
            self.client.clone(),
            self.reporter.clone(),
            cluster.object_ref(&()),
        );
        let event = Event {
            type_: match kind {
                EventKind::Normal => EventType::Normal,
                EventKind::Warning => EventType::Warning,
            },
            reason: reason.to_string(),
            note: Some(truncate_note(note)),
            action: "Reconcile".to_string(),
            secondary: None,
        };
        if let Err(err) = recorder.publish(event).await {
            warn!(
                cluster = %cluster.name_any(),
                reason,
                error = %err,
                "Failed to publish event"
            );
        }
    }
}

// The events API rejects notes longer than 1KiB.
const MAX_NOTE_LEN: usize = 1024;

fn truncate_note(note: &str) -> String {
    if note.len() <= MAX_NOTE_LEN {
        return note.to_string();
    }
    let mut end = MAX_NOTE_LEN;
    while !note.is_char_boundary(end) {
        end -= 1;
    }
    note[..end].to_string()
}
