//! Top-level readiness aggregation.

use super::{live_deployment, ClusterState, Context, Outcome, Phase};
use crate::conditions::{
    ready_condition_for, CONDITION_COMPUTE_READY, CONDITION_METADATA_READY, CONDITION_READY,
    CONDITION_STORAGE_READY, REASON_ALL_COMPONENTS_NOT_READY, REASON_ALL_COMPONENTS_READY,
    REASON_PODS_NOT_READY, REASON_PODS_READY,
};
use crate::crd::ConditionStatus;
use crate::error::Result;
use crate::resources;
use async_trait::async_trait;

/// Derives the top-level `Ready` condition.
///
/// Optional components get their own `<Component>Ready` from their
/// Deployment first. While `Ready` is false the pass is deferred, so it is
/// re-run immediately rather than after a timed wait.
pub struct Readiness;

#[async_trait]
impl Phase for Readiness {
    fn name(&self) -> &'static str {
        "readiness"
    }

    async fn reconcile(&self, ctx: &Context, state: &mut ClusterState) -> Result<Outcome> {
        let optional = resources::optional_components(&state.cluster);
        for component in &optional {
            let live = live_deployment(ctx, state, *component).await?;
            let (desired, ready, _) = resources::deployment_counts(&live);
            let message = format!("{}/{} pods ready", ready, desired);
            let condition = ready_condition_for(*component);
            let ready = resources::deployment_ready(&live);
            let reason = if ready { REASON_PODS_READY } else { REASON_PODS_NOT_READY };
            state.set_condition(condition, ConditionStatus::from(ready), reason, &message);
        }

        let mut required = vec![
            CONDITION_METADATA_READY,
            CONDITION_STORAGE_READY,
            CONDITION_COMPUTE_READY,
        ];
        required.extend(optional.iter().map(|c| ready_condition_for(*c)));

        let ready = match required.iter().find(|c| !state.is_true(c)) {
            None => {
                state.set_condition(
                    CONDITION_READY,
                    ConditionStatus::True,
                    REASON_ALL_COMPONENTS_READY,
                    "all components ready",
                );
                true
            }
            Some(missing) => {
                state.set_condition(
                    CONDITION_READY,
                    ConditionStatus::False,
                    REASON_ALL_COMPONENTS_NOT_READY,
                    &format!("{} is not True", missing),
                );
                false
            }
        };

        state.persist_status(ctx).await?;
        if ready {
            Ok(Outcome::Continue)
        } else {
            Ok(Outcome::Deferred)
        }
    }
}
