//! Completion of storage resizes, draining removed nodes on scale-down.

use super::{live_statefulset, ClusterState, Context, Outcome, Phase};
use crate::admin::{self, MaintenanceAction};
use crate::conditions::{
    CONDITION_STORAGE_READY, CONDITION_STORAGE_UPDATING, REASON_SCALING_COMPLETE,
    REASON_SCALING_DOWN, REASON_SCALING_UP,
};
use crate::config::Component;
use crate::crd::ConditionStatus;
use crate::error::{OperatorError, Result};
use crate::events::{self, EventKind};
use crate::resources::{self, ANNOTATION_NEW_REPLICAS, ANNOTATION_OLD_REPLICAS};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::StatefulSet;
use kube::ResourceExt;
use tracing::{info, warn};

/// Ordinals of the storage nodes removed when shrinking from `old` to `new`.
pub fn drain_indexes(old: i32, new: i32) -> Vec<i32> {
    (new.max(0)..old).collect()
}

/// The old/new replica annotations, if they describe the StatefulSet's current size.
fn scaling_record(sts: &StatefulSet) -> Option<(i32, i32)> {
    let annotations = sts.annotations();
    let old = annotations.get(ANNOTATION_OLD_REPLICAS)?.parse().ok()?;
    let new = annotations.get(ANNOTATION_NEW_REPLICAS)?.parse().ok()?;
    let (replicas, _, _) = resources::statefulset_counts(sts);
    (new == replicas).then_some((old, new))
}

/// Drives an in-flight storage scale to completion.
///
/// Scale-down drains the removed nodes exactly once; scale-up only waits for
/// the rollout. A failed drain is a hard error.
pub struct ScaleController;

impl ScaleController {
    fn complete(state: &mut ClusterState, message: &str) {
        state.status.storage.scaling_from = None;
        state.set_condition(
            CONDITION_STORAGE_UPDATING,
            ConditionStatus::False,
            REASON_SCALING_COMPLETE,
            message,
        );
    }
}

#[async_trait]
impl Phase for ScaleController {
    fn name(&self) -> &'static str {
        "scale"
    }

    async fn reconcile(&self, ctx: &Context, state: &mut ClusterState) -> Result<Outcome> {
        let scaling_down = state
            .conditions
            .is_true_with_reason(CONDITION_STORAGE_UPDATING, REASON_SCALING_DOWN);
        let scaling_up = state
            .conditions
            .is_true_with_reason(CONDITION_STORAGE_UPDATING, REASON_SCALING_UP);
        if !scaling_down && !scaling_up {
            return Ok(Outcome::Continue);
        }

        let live = live_statefulset(ctx, state, Component::Storage).await?;

        if scaling_up {
            if resources::statefulset_ready(&live) {
                let (replicas, _, _) = resources::statefulset_counts(&live);
                Self::complete(state, &format!("storage scaled to {} replicas", replicas));
                state.persist_status(ctx).await?;
                info!(cluster = %state.name(), replicas, "Storage scale-up complete");
            }
            return Ok(Outcome::Continue);
        }

        let Some((old, new)) = scaling_record(&live) else {
            warn!(cluster = %state.name(), "Storage scale-down has no current scaling record, nothing to drain");
            Self::complete(state, "scaling record missing, nothing to drain");
            state.persist_status(ctx).await?;
            return Ok(Outcome::Continue);
        };

        let indexes = drain_indexes(old, new);
        if indexes.is_empty() || !state.is_true(CONDITION_STORAGE_READY) {
            Self::complete(state, &format!("storage scaled to {} replicas", new));
            state.persist_status(ctx).await?;
            return Ok(Outcome::Continue);
        }

        let target = state.admin_target(ctx);
        ctx.admin
            .maintenance_storage(&target, MaintenanceAction::Apply, &admin::drain_args(&indexes))
            .await
            .map_err(|err| {
                OperatorError::Reconciliation(format!(
                    "draining storage nodes {:?} failed: {}",
                    indexes, err
                ))
            })?;

        let listed = indexes
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let message = format!("drained storage nodes {} after scaling to {} replicas", listed, new);
        Self::complete(state, &message);
        state.persist_status(ctx).await?;
        info!(cluster = %state.name(), from = old, to = new, "Drained removed storage nodes");
        ctx.events
            .publish(&state.cluster, EventKind::Normal, events::REASON_DRAINED, &message)
            .await;
        Ok(Outcome::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::apps::v1::StatefulSetSpec;

    #[test]
    fn test_drain_indexes() {
        assert_eq!(drain_indexes(5, 3), vec![3, 4]);
        assert_eq!(drain_indexes(4, 3), vec![3]);
        assert!(drain_indexes(3, 5).is_empty());
        assert!(drain_indexes(3, 3).is_empty());
    }

    fn annotated(replicas: i32, old: &str, new: &str) -> StatefulSet {
        let mut sts = StatefulSet {
            spec: Some(StatefulSetSpec {
                replicas: Some(replicas),
                ..Default::default()
            }),
            ..Default::default()
        };
        sts.annotations_mut().insert(ANNOTATION_OLD_REPLICAS.to_string(), old.to_string());
        sts.annotations_mut().insert(ANNOTATION_NEW_REPLICAS.to_string(), new.to_string());
        sts
    }

    #[test]
    fn test_scaling_record_ignores_earlier_resize() {
        assert_eq!(scaling_record(&annotated(3, "5", "3")), Some((5, 3)));
        assert_eq!(scaling_record(&annotated(5, "7", "5")), Some((7, 5)));
        assert_eq!(scaling_record(&annotated(3, "7", "5")), None);
        assert_eq!(scaling_record(&annotated(3, "x", "3")), None);
    }
}
