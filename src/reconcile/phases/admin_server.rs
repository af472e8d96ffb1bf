//! Admin server Deployment.

use super::{live_deployment, ClusterState, Context, Outcome, Phase};
use crate::conditions::{CONDITION_ADMIN_SERVER_READY, REASON_PODS_NOT_READY, REASON_PODS_READY};
use crate::config::Component;
use crate::crd::ConditionStatus;
use crate::error::Result;
use crate::resources;
use crate::sync;
use async_trait::async_trait;

/// Admin server Deployment. Its readiness is recorded, and the bootstrap
/// phases that need the admin CLI wait on it.
pub struct AdminServerPhase;

#[async_trait]
impl Phase for AdminServerPhase {
    fn name(&self) -> &'static str {
        "admin-server"
    }

    async fn reconcile(&self, ctx: &Context, state: &mut ClusterState) -> Result<Outcome> {
        let deployment = resources::build_deployment(
            &state.cluster,
            Component::AdminServer,
            &ctx.config,
            &state.config_hash,
        )?;
        sync::sync(ctx.client.as_ref(), &state.cluster, &deployment).await?;

        let live = live_deployment(ctx, state, Component::AdminServer).await?;
        let (desired, ready, _) = resources::deployment_counts(&live);
        let message = format!("{}/{} pods ready", ready, desired);
        let ready = resources::deployment_ready(&live);
        let reason = if ready { REASON_PODS_READY } else { REASON_PODS_NOT_READY };
        state.set_condition(CONDITION_ADMIN_SERVER_READY, ConditionStatus::from(ready), reason, &message);
        Ok(Outcome::Continue)
    }
}
