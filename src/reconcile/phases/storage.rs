//! Storage tier StatefulSet and the replica-change policy.

use super::{ClusterState, Context, Outcome, Phase};
use crate::conditions::{
    CONDITION_STORAGE_UPDATING, REASON_SCALING_DOWN, REASON_SCALING_UP,
};
use crate::config::Component;
use crate::crd::ConditionStatus;
use crate::error::Result;
use crate::events::{self, EventKind};
use crate::resources::{self, ANNOTATION_NEW_REPLICAS, ANNOTATION_OLD_REPLICAS};
use crate::sync;
use async_trait::async_trait;
use kube::ResourceExt;
use tracing::{error, info};

/// Metadata replication factor used to bootstrap a storage tier of `replicas` nodes.
///
/// A requested factor is honored when it fits the tier; otherwise the factor
/// is the replica count capped at `max`.
pub fn recommended_replication_factor(requested: Option<i32>, replicas: i32, max: i32) -> i32 {
    match requested {
        Some(factor) if factor >= 1 && factor <= replicas => factor,
        _ => replicas.min(max).max(1),
    }
}

/// Reason a storage replica change must not be applied, if any.
pub fn validate_scale(requested: Option<i32>, new_replicas: i32) -> Option<String> {
    if new_replicas < 1 {
        return Some(format!(
            "storage tier needs at least one replica, got {}",
            new_replicas
        ));
    }
    match requested {
        Some(factor) if factor > new_replicas => Some(format!(
            "metadata replication factor {} exceeds {} storage replicas",
            factor, new_replicas
        )),
        _ => None,
    }
}

/// Storage tier StatefulSet, including the replica-change policy.
///
/// A replica change is recorded on the StatefulSet (old/new annotations) and
/// in the `StorageUpdating` condition before it is applied, so the scale
/// controller can drain removed nodes even if this pass is interrupted.
pub struct StorageTier;

#[async_trait]
impl Phase for StorageTier {
    fn name(&self) -> &'static str {
        "storage"
    }

    async fn reconcile(&self, ctx: &Context, state: &mut ClusterState) -> Result<Outcome> {
        let mut desired = resources::build_statefulset(
            &state.cluster,
            Component::Storage,
            &ctx.config,
            &state.config_hash,
        )?;
        let new_replicas = resources::replicas(&state.cluster, Component::Storage, &ctx.config);

        let client = ctx.client.as_ref();
        let existing = match sync::sync_with_diff(client, &state.cluster, &desired).await? {
            Some(existing) => existing,
            None => {
                state.status.storage.replicas = new_replicas;
                return Ok(Outcome::Continue);
            }
        };

        for key in [ANNOTATION_OLD_REPLICAS, ANNOTATION_NEW_REPLICAS] {
            if let Some(value) = existing.annotations().get(key) {
                desired.annotations_mut().insert(key.to_string(), value.clone());
            }
        }

        let (live_replicas, ready, _) = resources::statefulset_counts(&existing);
        if live_replicas != new_replicas {
            if let Some(reason) = validate_scale(state.cluster.spec.config.metadata_replication_factor, new_replicas) {
                error!(
                    cluster = %state.name(),
                    namespace = %state.namespace(),
                    from = live_replicas,
                    to = new_replicas,
                    "Rejected storage scale: {}",
                    reason
                );
                ctx.events
                    .publish(&state.cluster, EventKind::Warning, events::REASON_SCALE_REJECTED, &reason)
                    .await;
                state.status.storage.replicas = live_replicas;
                state.status.storage.ready_replicas = ready;
                return Ok(Outcome::Continue);
            }

            // A scale-down that has not been drained yet keeps its original size.
            // Live annotations may still describe an earlier resize.
            let old_replicas = match state.status.storage.scaling_from {
                Some(from)
                    if state
                        .conditions
                        .is_true_with_reason(CONDITION_STORAGE_UPDATING, REASON_SCALING_DOWN) =>
                {
                    from.max(live_replicas)
                }
                _ => live_replicas,
            };

            desired
                .annotations_mut()
                .insert(ANNOTATION_OLD_REPLICAS.to_string(), old_replicas.to_string());
            desired
                .annotations_mut()
                .insert(ANNOTATION_NEW_REPLICAS.to_string(), new_replicas.to_string());

            let reason = if new_replicas > old_replicas {
                REASON_SCALING_UP
            } else {
                REASON_SCALING_DOWN
            };
            let message = format!(
                "scaling storage from {} to {} replicas",
                old_replicas, new_replicas
            );
            state.status.storage.scaling_from = Some(old_replicas);
            state.set_condition(CONDITION_STORAGE_UPDATING, ConditionStatus::True, reason, &message);
            state.persist_status(ctx).await?;
            info!(cluster = %state.name(), from = old_replicas, to = new_replicas, "Scaling storage tier");
            ctx.events
                .publish(&state.cluster, EventKind::Normal, events::REASON_SCALING, &message)
                .await;
        }

        sync::sync(client, &state.cluster, &desired).await?;
        state.status.storage.replicas = new_replicas;
        state.status.storage.ready_replicas = ready;
        Ok(Outcome::Continue)
    }
}
